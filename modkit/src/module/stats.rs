use super::ModuleState;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// 模块统计快照（所有模块共有的部分）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleStats {
    pub name: String,
    pub enabled: bool,
    pub state: ModuleState,
    pub initialized: bool,
    pub has_error: bool,
    pub error_message: Option<String>,
    pub metadata: Map<String, Value>,
    pub dependencies: BTreeMap<String, DependencyStats>,
    pub hooks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyStats {
    /// 依赖目标的模块名称
    pub module: String,
    pub optional: bool,
    pub lazy: bool,
    pub initialized: bool,
}
