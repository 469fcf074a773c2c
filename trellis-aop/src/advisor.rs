//! 通知器（Advisor）
//!
//! 通知器把一个通知和它的适用范围绑定在一起：
//! - [`PointcutAdvisor`]：切点决定作用于哪些方法
//! - [`IntroductionAdvisor`]：类过滤器决定为哪些类引入接口
//!
//! 通知器可以注册为容器中的 Bean（见 [`advisor_definition`]），由自动代理创建器按类型收集。

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use trellis_core::{BeanDefinition, BeanInstance, ClassInfo};

use crate::advice::{Advice, DelegatingIntroductionInterceptor};
use crate::pointcut::{ClassFilter, ComposablePointcut, Pointcut, TrueClassFilter};

/// 通知器
pub trait Advisor: Send + Sync {
    fn advice(&self) -> &Advice;

    /// 排序值（越小越靠前）；`None` 排在所有有序通知器之后
    fn order(&self) -> Option<i32> {
        None
    }

    /// 用于日志的名称
    fn name(&self) -> &str {
        "Advisor"
    }

    fn as_pointcut_advisor(&self) -> Option<&dyn PointcutAdvisor> {
        None
    }

    fn as_introduction_advisor(&self) -> Option<&dyn IntroductionAdvisor> {
        None
    }
}

/// 由切点驱动的通知器
pub trait PointcutAdvisor: Advisor {
    fn pointcut(&self) -> &dyn Pointcut;
}

/// 引入通知器
pub trait IntroductionAdvisor: Advisor {
    fn class_filter(&self) -> &dyn ClassFilter;

    /// 引入的接口
    fn interfaces(&self) -> &[Arc<ClassInfo>];
}

/// 默认的切点通知器
pub struct DefaultPointcutAdvisor {
    name: String,
    pointcut: Arc<dyn Pointcut>,
    advice: Advice,
    order: Option<i32>,
}

impl DefaultPointcutAdvisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        Self {
            name: "DefaultPointcutAdvisor".to_string(),
            pointcut,
            advice,
            order: None,
        }
    }

    /// 作用于所有方法的通知器
    pub fn for_advice(advice: Advice) -> Self {
        Self::new(Arc::new(ComposablePointcut::new()), advice)
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Advisor for DefaultPointcutAdvisor {
    fn advice(&self) -> &Advice {
        &self.advice
    }

    fn order(&self) -> Option<i32> {
        self.order
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_pointcut_advisor(&self) -> Option<&dyn PointcutAdvisor> {
        Some(self)
    }
}

impl PointcutAdvisor for DefaultPointcutAdvisor {
    fn pointcut(&self) -> &dyn Pointcut {
        self.pointcut.as_ref()
    }
}

impl fmt::Debug for DefaultPointcutAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultPointcutAdvisor")
            .field("name", &self.name)
            .field("advice", &self.advice)
            .field("order", &self.order)
            .finish()
    }
}

/// 默认的引入通知器
pub struct DefaultIntroductionAdvisor {
    name: String,
    advice: Advice,
    interfaces: Vec<Arc<ClassInfo>>,
    class_filter: Arc<dyn ClassFilter>,
    order: Option<i32>,
}

impl DefaultIntroductionAdvisor {
    /// 为所有类引入拦截器声明的接口
    pub fn new(interceptor: DelegatingIntroductionInterceptor) -> Self {
        Self::from_shared(Arc::new(interceptor))
    }

    pub fn from_shared(interceptor: Arc<DelegatingIntroductionInterceptor>) -> Self {
        let interfaces = interceptor.interfaces().to_vec();
        Self {
            name: "DefaultIntroductionAdvisor".to_string(),
            advice: Advice::Introduction(interceptor),
            interfaces,
            class_filter: TrueClassFilter::shared(),
            order: None,
        }
    }

    pub fn with_class_filter(mut self, class_filter: Arc<dyn ClassFilter>) -> Self {
        self.class_filter = class_filter;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Advisor for DefaultIntroductionAdvisor {
    fn advice(&self) -> &Advice {
        &self.advice
    }

    fn order(&self) -> Option<i32> {
        self.order
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn as_introduction_advisor(&self) -> Option<&dyn IntroductionAdvisor> {
        Some(self)
    }
}

impl IntroductionAdvisor for DefaultIntroductionAdvisor {
    fn class_filter(&self) -> &dyn ClassFilter {
        self.class_filter.as_ref()
    }

    fn interfaces(&self) -> &[Arc<ClassInfo>] {
        &self.interfaces
    }
}

impl fmt::Debug for DefaultIntroductionAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interfaces: Vec<&str> = self.interfaces.iter().map(|i| i.name()).collect();
        f.debug_struct("DefaultIntroductionAdvisor")
            .field("name", &self.name)
            .field("interfaces", &interfaces)
            .field("order", &self.order)
            .finish()
    }
}

// ============================================================================
// 作为 Bean 的通知器
// ============================================================================

static ADVISOR_INTERFACE: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassInfo::interface("Advisor").build());

static ADVISOR_BEAN_CLASS: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("AdvisorBean")
        .implements(&ADVISOR_INTERFACE)
        .build()
});

/// 所有通知器 Bean 都实现的接口，自动代理创建器按它收集通知器
pub fn advisor_interface() -> Arc<ClassInfo> {
    Arc::clone(&ADVISOR_INTERFACE)
}

/// 包装通知器的 Bean 类型
pub fn advisor_bean_class() -> Arc<ClassInfo> {
    Arc::clone(&ADVISOR_BEAN_CLASS)
}

/// 把通知器包装成 Bean 实例
pub fn advisor_bean(advisor: Arc<dyn Advisor>) -> BeanInstance {
    BeanInstance::new(advisor_bean_class(), advisor)
}

/// 从 Bean 实例中取出通知器
pub fn as_advisor(bean: &BeanInstance) -> Option<Arc<dyn Advisor>> {
    bean.downcast_ref::<Arc<dyn Advisor>>().cloned()
}

/// 生成注册通知器单例用的 Bean 定义
///
/// ```ignore
/// factory.register_bean_definition(
///     "auditAdvisor",
///     advisor_definition(Arc::new(DefaultPointcutAdvisor::for_advice(advice))),
/// )?;
/// ```
pub fn advisor_definition(advisor: Arc<dyn Advisor>) -> BeanDefinition {
    BeanDefinition::from_supplier(&advisor_bean_class(), move || Ok(advisor_bean(Arc::clone(&advisor))))
}

/// 按排序值稳定排序，未排序的通知器保持注册顺序排在最后
pub fn sort_advisors(advisors: &mut [Arc<dyn Advisor>]) {
    advisors.sort_by_key(|advisor| match advisor.order() {
        Some(order) => (0, order),
        None => (1, 0),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    fn ordered(name: &str, order: Option<i32>) -> Arc<dyn Advisor> {
        let advisor = DefaultPointcutAdvisor::for_advice(Advice::before(|_| Ok(()))).with_name(name);
        Arc::new(match order {
            Some(order) => advisor.with_order(order),
            None => advisor,
        })
    }

    fn names(advisors: &[Arc<dyn Advisor>]) -> Vec<String> {
        advisors.iter().map(|a| a.name().to_string()).collect()
    }

    #[test]
    fn test_sort_unordered_last() {
        let mut advisors = vec![
            ordered("five", Some(5)),
            ordered("unordered", None),
            ordered("one", Some(1)),
        ];
        sort_advisors(&mut advisors);
        assert_eq!(names(&advisors), vec!["one", "five", "unordered"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut advisors = vec![
            ordered("u1", None),
            ordered("a", Some(3)),
            ordered("u2", None),
            ordered("b", Some(3)),
            ordered("c", Some(-1)),
        ];
        sort_advisors(&mut advisors);
        assert_eq!(names(&advisors), vec!["c", "a", "b", "u1", "u2"]);
    }

    #[test]
    fn test_advisor_kinds() {
        let pointcut = DefaultPointcutAdvisor::for_advice(Advice::around(|inv| inv.proceed()));
        assert!(pointcut.as_pointcut_advisor().is_some());
        assert!(pointcut.as_introduction_advisor().is_none());

        let introduction = DefaultIntroductionAdvisor::new(DelegatingIntroductionInterceptor::new(
            vec![auditable_interface()],
            auditable_delegate("ops"),
        ));
        let ia = introduction.as_introduction_advisor().unwrap();
        assert_eq!(ia.interfaces()[0].name(), "Auditable");
        assert!(ia.class_filter().matches(&report_generator_class()));
    }

    #[test]
    fn test_advisor_bean_round_trip() {
        let advisor = ordered("audit", Some(7));
        let bean = advisor_bean(Arc::clone(&advisor));

        assert!(advisor_interface().is_assignable_from(bean.class()));
        let extracted = as_advisor(&bean).unwrap();
        assert!(Arc::ptr_eq(&extracted, &advisor));
        assert_eq!(extracted.order(), Some(7));

        let plain = account_service(event_log());
        assert!(as_advisor(&plain).is_none());
    }
}
