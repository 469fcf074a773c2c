/// 统一的错误处理类型
///
/// 容器自身的失败用 [`BeansError`] 表达，调用方可以按变体匹配；
/// 用户代码（构造函数、setter、方法体、通知）返回 `anyhow::Result`，
/// 在容器边界上被包装进 [`BeansError::CallbackFailed`]。
///
/// # 示例
///
/// ```rust,ignore
/// match factory.get_bean("userService") {
///     Err(e) if e.is_currently_in_creation() => { /* 循环依赖 */ }
///     Err(e) => return Err(e.into()),
///     Ok(bean) => { /* ... */ }
/// }
/// ```
pub use anyhow::Result;

use thiserror::Error;

/// 容器操作的结果类型
pub type BeansResult<T> = std::result::Result<T, BeansError>;

/// Bean 容器错误
#[derive(Debug, Error)]
pub enum BeansError {
    #[error("No bean named '{0}' is defined")]
    NoSuchBeanDefinition(String),

    #[error("No qualifying bean of type [{type_name}] is defined")]
    NoSuchBeanOfType { type_name: String },

    #[error(
        "No unique bean of type [{type_name}] is defined: expected single matching bean but found {}: {}",
        .candidates.len(),
        .candidates.join(",")
    )]
    NoUniqueBeanDefinition {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("Cannot register bean definition for bean '{name}': there is already a definition bound and overriding is disabled")]
    BeanDefinitionOverride { name: String },

    #[error("Invalid bean definition for bean '{name}': {message}")]
    InvalidBeanDefinition { name: String, message: String },

    #[error("Cannot register alias '{alias}' for name '{name}': {message}")]
    IllegalAlias {
        alias: String,
        name: String,
        message: String,
    },

    #[error("Cannot find class [{class_name}] for bean with name '{name}'")]
    ClassNotFound { name: String, class_name: String },

    #[error("Error creating bean with name '{name}': Bean definition is abstract")]
    BeanIsAbstract { name: String },

    #[error("Error creating bean with name '{name}': Requested bean is currently in creation: Is there an unresolvable circular reference? ({chain})")]
    BeanCurrentlyInCreation { name: String, chain: String },

    #[error("Error creating bean with name '{name}': Singleton bean creation not allowed while the singletons of this factory are in destruction")]
    BeanCreationNotAllowed { name: String },

    #[error("Error creating bean with name '{name}': Unsatisfied dependency expressed through {target}: {message}")]
    UnsatisfiedDependency {
        name: String,
        target: String,
        message: String,
    },

    #[error("Error creating bean with name '{name}': {message}")]
    BeanCreation {
        name: String,
        message: String,
        #[source]
        source: Option<Box<BeansError>>,
    },

    #[error("Error creating bean with name '{name}': {phase} failed: {source}")]
    CallbackFailed {
        name: String,
        phase: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to convert value of type [{value_type}] to required type [{required_type}]: {message}")]
    TypeMismatch {
        value_type: String,
        required_type: String,
        message: String,
    },

    #[error("Invalid property '{property}' of bean class [{class_name}]: {message}")]
    InvalidProperty {
        class_name: String,
        property: String,
        message: String,
    },

    #[error("Bean named '{name}' must be of type [{required_type}], but was actually of type [{actual_type}]")]
    BeanNotOfRequiredType {
        name: String,
        required_type: String,
        actual_type: String,
    },

    #[error("Bean named '{0}' is not a factory bean")]
    BeanIsNotAFactory(String),

    #[error("No Scope registered for scope name '{scope}' (bean '{name}')")]
    IllegalScope { name: String, scope: String },

    #[error("No method '{method}' accepting {arity} argument(s) on class [{class_name}]")]
    NoSuchMethod {
        class_name: String,
        method: String,
        arity: usize,
    },

    #[error("Bean factory configuration has been frozen: cannot {0}")]
    ConfigurationFrozen(String),

    #[error("{0}")]
    IllegalState(String),
}

impl BeansError {
    /// 创建不带原因的 Bean 创建错误
    pub fn creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        BeansError::BeanCreation {
            name: name.into(),
            message: message.into(),
            source: None,
        }
    }

    /// 用 Bean 创建错误包装一个下层错误
    pub fn wrap(name: impl Into<String>, message: impl Into<String>, source: BeansError) -> Self {
        BeansError::BeanCreation {
            name: name.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 沿 `BeanCreation` 原因链找到最内层的容器错误
    pub fn most_specific_cause(&self) -> &BeansError {
        let mut current = self;
        while let BeansError::BeanCreation {
            source: Some(source),
            ..
        } = current
        {
            current = source;
        }
        current
    }

    /// 最内层原因是否为“正在创建中”错误
    pub fn is_currently_in_creation(&self) -> bool {
        matches!(
            self.most_specific_cause(),
            BeansError::BeanCurrentlyInCreation { .. }
        )
    }

    /// 若最内层原因是“正在创建中”错误，返回处于创建中的 Bean 名称
    pub fn currently_in_creation_bean(&self) -> Option<&str> {
        match self.most_specific_cause() {
            BeansError::BeanCurrentlyInCreation { name, .. } => Some(name),
            _ => None,
        }
    }

    /// 错误涉及的 Bean 名称（如果有）
    pub fn bean_name(&self) -> Option<&str> {
        match self {
            BeansError::NoSuchBeanDefinition(name)
            | BeansError::BeanIsNotAFactory(name) => Some(name),
            BeansError::BeanDefinitionOverride { name }
            | BeansError::InvalidBeanDefinition { name, .. }
            | BeansError::ClassNotFound { name, .. }
            | BeansError::BeanIsAbstract { name }
            | BeansError::BeanCurrentlyInCreation { name, .. }
            | BeansError::BeanCreationNotAllowed { name }
            | BeansError::UnsatisfiedDependency { name, .. }
            | BeansError::BeanCreation { name, .. }
            | BeansError::CallbackFailed { name, .. }
            | BeansError::BeanNotOfRequiredType { name, .. }
            | BeansError::IllegalScope { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cause_chain_detects_in_creation() {
        let root = BeansError::BeanCurrentlyInCreation {
            name: "a".to_string(),
            chain: "a -> b -> a".to_string(),
        };
        let err = BeansError::wrap(
            "a",
            "Cannot resolve reference to bean 'b'",
            BeansError::wrap("b", "Cannot resolve reference to bean 'a'", root),
        );

        assert!(err.is_currently_in_creation());
        assert_eq!(err.currently_in_creation_bean(), Some("a"));
        assert_eq!(err.bean_name(), Some("a"));
    }

    #[test]
    fn test_plain_creation_error_is_not_in_creation() {
        let err = BeansError::creation("x", "boom");
        assert!(!err.is_currently_in_creation());
        assert_eq!(err.to_string(), "Error creating bean with name 'x': boom");
    }

    #[test]
    fn test_no_unique_message_lists_candidates() {
        let err = BeansError::NoUniqueBeanDefinition {
            type_name: "Repository".to_string(),
            candidates: vec!["a".to_string(), "b".to_string()],
        };
        assert!(err.to_string().ends_with("found 2: a,b"));
    }
}
