// trellis-core: 类似 Spring 的 Bean 容器核心
//
// 提供运行时类型元数据驱动的依赖注入功能，支持：
// - 单例、原型和自定义作用域
// - 构造函数 / 工厂方法解析与按类型自动装配
// - 父子 Bean 定义、别名和 FactoryBean
// - 生命周期管理（init/destroy 回调、BeanPostProcessor）

pub mod bean_factory;
pub mod bean_post_processor;
pub mod class;
pub mod config;
pub mod constants;
pub mod constructor_resolver;
pub mod convert;
pub mod definition;
pub mod error;
pub mod logging;
pub mod scope;
pub mod singleton;
pub mod value;

#[cfg(test)]
mod fixtures;

// 重新导出常用类型
pub use bean_factory::{
    BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
};
pub use bean_post_processor::BeanPostProcessor;
pub use class::{types, ClassBuilder, ClassInfo, ClassRegistration, ClassRegistry, MethodInfo};
pub use config::{ConfigError, FactoryConfig, Settings};
pub use constants::*;
pub use convert::{SimpleTypeConverter, TypeConverter};
pub use definition::{AutowireMode, BeanDefinition, BeanValue, RootBeanDefinition};
pub use error::{BeansError, BeansResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use scope::{CustomScope, Scope, ThreadScope};
pub use value::{Args, BeanInstance, Value};

// 导出 inventory 和 Lazy，供类注册使用
pub use inventory;
pub use once_cell::sync::Lazy;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::bean_factory::{
        BeanDefinitionRegistry, BeanFactory, BeanFactoryExt, ConfigurableBeanFactory,
        ConfigurableListableBeanFactory, DefaultListableBeanFactory, ListableBeanFactory,
    };
    pub use crate::bean_post_processor::BeanPostProcessor;
    pub use crate::class::{types, ClassInfo, ClassRegistration};
    pub use crate::config::{FactoryConfig, Settings};
    pub use crate::definition::{AutowireMode, BeanDefinition, BeanValue};
    pub use crate::error::{BeansError, BeansResult, Result};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::scope::{CustomScope, Scope};
    pub use crate::value::{Args, BeanInstance, Value};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
