use serde::{Deserialize, Serialize};

/// 调度器配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// 调度器名称，仅用于日志区分多个实例
    pub label: String,
    /// `subscribe_default` 使用的优先级
    pub default_priority: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            label: "herald".to_string(),
            default_priority: 0,
        }
    }
}
