//! 依赖图（DependencyGraph）
//!
//! 以模块名称为节点的邻接集合，不持有模块本身，避免图结构内出现引用环。
//! 新增边时先临时写入，再从起点做 DFS：若访问到当前活动路径上的节点即判定成环，
//! 并在返回前回滚临时边。
//!
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        self.edges.get(from).is_some_and(|set| set.contains(to))
    }

    /// 某节点的直接后继
    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(node)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// 并入另一张图的全部边（用于汇总依赖模块已知的传递边）
    pub fn merge(&mut self, other: &DependencyGraph) {
        for (from, tos) in &other.edges {
            self.edges
                .entry(from.clone())
                .or_default()
                .extend(tos.iter().cloned());
        }
    }

    /// 尝试新增 `from -> to`。
    ///
    /// `known` 为外部已知的边（例如依赖模块自身的依赖关系），仅参与环检测，不会被写入。
    /// 成环时回滚临时边并返回 `false`，图保持不变。
    pub fn try_add_edge(&mut self, from: &str, to: &str, known: &DependencyGraph) -> bool {
        let inserted = self
            .edges
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());

        if self.has_cycle_from(from, known) {
            if inserted {
                self.remove_edge(from, to);
            }
            return false;
        }

        true
    }

    pub fn remove_edge(&mut self, from: &str, to: &str) {
        if let Some(set) = self.edges.get_mut(from) {
            set.remove(to);
            if set.is_empty() {
                self.edges.remove(from);
            }
        }
    }

    /// 从 `start` 出发的 DFS；邻接关系取自身与 `known` 的并集
    pub fn has_cycle_from(&self, start: &str, known: &DependencyGraph) -> bool {
        let mut on_path = HashSet::new();
        let mut finished = HashSet::new();
        self.visit(start, known, &mut on_path, &mut finished)
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        known: &'a DependencyGraph,
        on_path: &mut HashSet<&'a str>,
        finished: &mut HashSet<&'a str>,
    ) -> bool {
        if on_path.contains(node) {
            return true;
        }
        if finished.contains(node) {
            return false;
        }

        on_path.insert(node);
        let next: Vec<&'a str> = self.neighbors(node).chain(known.neighbors(node)).collect();
        for n in next {
            if self.visit(n, known, on_path, finished) {
                return true;
            }
        }
        on_path.remove(node);
        finished.insert(node);

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acyclic_edges_are_accepted() {
        let mut g = DependencyGraph::new();
        let known = DependencyGraph::new();
        assert!(g.try_add_edge("a", "b", &known));
        assert!(g.try_add_edge("b", "c", &known));
        assert!(g.try_add_edge("a", "c", &known));
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn back_edge_is_rejected_and_rolled_back() {
        let mut g = DependencyGraph::new();
        let known = DependencyGraph::new();
        g.try_add_edge("a", "b", &known);
        g.try_add_edge("b", "c", &known);

        let before = g.clone();
        assert!(!g.try_add_edge("c", "a", &known));
        assert_eq!(g, before);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn self_edge_is_a_cycle() {
        let mut g = DependencyGraph::new();
        assert!(!g.try_add_edge("a", "a", &DependencyGraph::new()));
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn known_edges_participate_in_detection() {
        // 外部已知 b -> a，此时 a -> b 会成环
        let mut known = DependencyGraph::new();
        known.try_add_edge("b", "a", &DependencyGraph::new());

        let mut g = DependencyGraph::new();
        assert!(!g.try_add_edge("a", "b", &known));
        assert!(!g.contains_edge("a", "b"));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut g = DependencyGraph::new();
        let known = DependencyGraph::new();
        assert!(g.try_add_edge("app", "db", &known));
        assert!(g.try_add_edge("app", "cache", &known));
        assert!(g.try_add_edge("db", "log", &known));
        assert!(g.try_add_edge("cache", "log", &known));
        assert!(!g.has_cycle_from("app", &known));
    }
}
