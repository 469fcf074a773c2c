//! BeanPostProcessor - Bean 工厂扩展机制
//!
//! 提供在 Bean 初始化前后进行自定义处理的钩子，AOP 自动代理就是通过
//! `post_process_after_initialization` 接入容器的

use std::sync::Arc;

use crate::error::BeansResult;
use crate::value::BeanInstance;

/// BeanPostProcessor trait
///
/// 在 Bean 初始化的不同阶段提供钩子，允许替换或包装 Bean 实例
///
/// # 示例
///
/// ```ignore
/// struct LoggingBeanPostProcessor;
///
/// impl BeanPostProcessor for LoggingBeanPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         bean: BeanInstance,
///         bean_name: &str,
///     ) -> BeansResult<BeanInstance> {
///         tracing::info!("After initialization: {}", bean_name);
///         Ok(bean)
///     }
/// }
/// ```
pub trait BeanPostProcessor: Send + Sync {
    /// 在 Bean 初始化回调（init）之前调用
    ///
    /// 返回的实例如果与传入的不是同一个对象，后续的 init 回调作用在新实例上。
    fn post_process_before_initialization(
        &self,
        bean: BeanInstance,
        _bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        Ok(bean)
    }

    /// 在 Bean 初始化回调（init）之后调用
    ///
    /// # 典型用途
    /// - 创建 AOP 代理
    /// - 包装 Bean
    fn post_process_after_initialization(
        &self,
        bean: BeanInstance,
        _bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        Ok(bean)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "BeanPostProcessor"
    }

    /// 获取处理器的优先级（数字越小优先级越高）
    ///
    /// 默认为 1000，可以通过重写此方法来调整优先级
    fn order(&self) -> i32 {
        1000
    }
}

/// 按优先级排序（稳定排序，相同优先级保持注册顺序）
pub fn sort_post_processors(processors: &mut [Arc<dyn BeanPostProcessor>]) {
    processors.sort_by_key(|p| p.order());
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, i32);

    impl BeanPostProcessor for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn order(&self) -> i32 {
            self.1
        }
    }

    #[test]
    fn test_sort_is_stable_by_order() {
        let mut processors: Vec<Arc<dyn BeanPostProcessor>> = vec![
            Arc::new(Named("late", 2000)),
            Arc::new(Named("first-default", 1000)),
            Arc::new(Named("early", 10)),
            Arc::new(Named("second-default", 1000)),
        ];
        sort_post_processors(&mut processors);

        let names: Vec<&str> = processors.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["early", "first-default", "second-default", "late"]);
    }
}
