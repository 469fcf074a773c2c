//! AOP 模块的错误类型
//!
//! 切点构造失败用 [`AopError`] 表达；通知和目标方法的失败仍然是 `anyhow::Error`，
//! 经过代理时原样返回。

use thiserror::Error;

/// AOP 配置错误
#[derive(Debug, Error)]
pub enum AopError {
    #[error("Invalid pointcut pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid pointcut expression '{0}': expected \"execution(<return> <Type>.<method>(..))\"")]
    InvalidExpression(String),
}

/// AOP 配置操作的结果类型
pub type AopResult<T> = std::result::Result<T, AopError>;
