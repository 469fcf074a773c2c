//! 容器配置
//!
//! 配置来自 TOML 文档：
//!
//! ```toml
//! [factory]
//! allow_bean_definition_overriding = false
//!
//! [logging]
//! level = "debug"
//! format = "pretty"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::logging::LoggingConfig;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for '{key}'")]
    InvalidValue { key: String, value: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// Bean 工厂配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// 同名定义是否允许覆盖（默认：true）
    pub allow_bean_definition_overriding: bool,

    /// 类型扫描时是否允许为延迟初始化的定义解析类（默认：true）
    pub allow_eager_class_loading: bool,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            allow_bean_definition_overriding: true,
            allow_eager_class_loading: true,
        }
    }
}

impl FactoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_bean_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_bean_definition_overriding = allow;
        self
    }

    pub fn allow_eager_class_loading(mut self, allow: bool) -> Self {
        self.allow_eager_class_loading = allow;
        self
    }
}

/// 核心配置的全部内容
///
/// 未知的表（例如 `[aop]`）会被忽略，由各自的模块单独读取。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub factory: FactoryConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Loading settings from '{}'", path.display());
        Self::from_toml_str(&content)
    }
}
