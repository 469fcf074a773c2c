//! Trellis AOP - 面向切面编程支持
//!
//! 在 trellis-core 的 Bean 容器之上提供类似 Spring 的 AOP 功能，支持：
//! - 可组合的切点（类过滤器 + 方法匹配器，支持并集 / 交集）
//! - 多种通知类型（Before、After、Around、AfterReturning、AfterThrowing、引入）
//! - 基于元数据的接口代理与类代理
//! - 通过 BeanPostProcessor 自动为容器中的 Bean 应用通知器

pub mod advice;
pub mod advisor;
pub mod auto_proxy;
pub mod config;
pub mod error;
pub mod joinpoint;
pub mod pointcut;
pub mod proxy;
pub mod support;

#[cfg(test)]
mod fixtures;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceType, AfterAdvice, AfterReturningAdvice, DelegatingIntroductionInterceptor,
    MethodBeforeAdvice, MethodInterceptor, ThrowsAdvice,
};
pub use advisor::{
    advisor_definition, sort_advisors, Advisor, DefaultIntroductionAdvisor, DefaultPointcutAdvisor,
    IntroductionAdvisor, PointcutAdvisor,
};
pub use auto_proxy::AdvisorAutoProxyCreator;
pub use config::AopConfig;
pub use error::{AopError, AopResult};
pub use joinpoint::{JoinPoint, MethodInvocation};
pub use pointcut::{ClassFilter, ComposablePointcut, MethodMatcher, Pointcut};
pub use proxy::{advised, is_aop_proxy, AopProxy, ProxyFactory};
pub use support::{can_apply, find_advisors_that_can_apply};

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::advisor::{
        advisor_definition, Advisor, DefaultIntroductionAdvisor, DefaultPointcutAdvisor,
    };
    pub use crate::auto_proxy::AdvisorAutoProxyCreator;
    pub use crate::config::AopConfig;
    pub use crate::joinpoint::{JoinPoint, MethodInvocation};
    pub use crate::pointcut::*;
    pub use crate::proxy::{advised, is_aop_proxy, ProxyFactory};
}
