use crate::error::{ModkitError, ModkitResult};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 模块配置：名称、启用标记与自由元数据
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[builder(into)]
    name: String,
    #[builder(default = true)]
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[builder(default)]
    #[serde(default)]
    metadata: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl ModuleConfig {
    /// 以默认值创建并校验
    pub fn new(name: impl Into<String>) -> ModkitResult<Self> {
        let config = Self::builder().name(name).build();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModkitResult<()> {
        if self.name.trim().is_empty() {
            return Err(ModkitError::config("module name must not be empty"));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.metadata.insert(key.into(), value)
    }

    pub fn remove_metadata(&mut self, key: &str) -> Option<Value> {
        self.metadata.remove(key)
    }
}
