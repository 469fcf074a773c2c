//! 日志初始化
//!
//! 容器内部通过 `tracing` 输出日志，应用在启动时用 [`LoggingConfig::init`]
//! 安装订阅者。配置可以来自 TOML 的 `[logging]` 表，也可以来自环境变量。

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing_subscriber::{fmt as subscriber_fmt, EnvFilter};

use crate::config::ConfigError;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 紧凑格式（默认）
    #[default]
    Compact,
    /// 完整格式（带时间、级别、目标）
    Full,
    /// JSON 格式
    Json,
    /// 美化格式（适合开发）
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别（默认：info）
    pub level: LogLevel,

    /// 日志格式（默认：compact）
    pub format: LogFormat,

    /// 是否显示目标（模块路径）
    pub show_target: bool,

    pub show_thread_ids: bool,

    pub show_thread_names: bool,

    /// 额外的过滤指令，例如 "trellis_core=debug,trellis_aop=trace"
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_thread_names: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从环境变量读取配置（RUST_LOG / LOG_LEVEL / LOG_FORMAT），无效值被忽略
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.filter = Some(rust_log);
        }
        if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// 构建过滤器：级别作为默认指令，额外指令追加在后面
    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        let directives = match &self.filter {
            Some(extra) if !extra.trim().is_empty() => format!("{},{}", self.level, extra),
            _ => self.level.to_string(),
        };
        EnvFilter::try_new(&directives).map_err(|e| ConfigError::Logging(e.to_string()))
    }

    /// 初始化全局日志订阅者
    pub fn init(&self) -> Result<(), ConfigError> {
        let filter = self.env_filter()?;
        let builder = subscriber_fmt()
            .with_env_filter(filter)
            .with_target(self.show_target)
            .with_thread_ids(self.show_thread_ids)
            .with_thread_names(self.show_thread_names);

        let result = match self.format {
            LogFormat::Compact => builder.compact().try_init(),
            LogFormat::Full => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        };
        result.map_err(|e| ConfigError::Logging(e.to_string()))
    }
}
