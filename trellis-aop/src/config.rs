//! AOP 配置
//!
//! 从 TOML 文档的 `[aop]` 表读取：
//!
//! ```toml
//! [aop]
//! enabled = true
//! proxy_target_class = false
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use trellis_core::ConfigError;

/// 自动代理配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AopConfig {
    /// 是否启用自动代理（默认：true）
    pub enabled: bool,

    /// 是否总是使用类代理（默认：false，有接口时使用接口代理）
    pub proxy_target_class: bool,
}

impl Default for AopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            proxy_target_class: false,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AopSection {
    aop: AopConfig,
}

impl AopConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn proxy_target_class(mut self, proxy_target_class: bool) -> Self {
        self.proxy_target_class = proxy_target_class;
        self
    }

    /// 从完整的 TOML 文档中读取 `[aop]` 表，其它表被忽略
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let section: AopSection = toml::from_str(content)?;
        Ok(section.aop)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
