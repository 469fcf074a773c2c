//! AOP 工具函数
//!
//! 判断通知器能否作用于某个类，并从候选通知器中筛选、排序出适用的通知器。

use std::sync::Arc;

use trellis_core::{ClassInfo, MethodInfo};

use crate::advisor::{sort_advisors, Advisor};
use crate::pointcut::Pointcut;

/// 类自身、父类链以及全部接口上声明的方法
fn candidate_methods(class: &ClassInfo) -> Vec<MethodInfo> {
    let mut methods: Vec<MethodInfo> = class.all_methods().into_iter().cloned().collect();
    for interface in class.all_interfaces() {
        methods.extend(interface.methods().iter().cloned());
    }
    methods
}

/// 切点能否作用于目标类的某个方法
///
/// 先检查类过滤器，再逐个检查类及其接口上的方法。
pub fn can_apply_pointcut(pointcut: &dyn Pointcut, target_class: &ClassInfo, has_introductions: bool) -> bool {
    if !pointcut.class_filter().matches(target_class) {
        return false;
    }
    let matcher = pointcut.method_matcher();
    if matcher.matches_everything() {
        return true;
    }
    candidate_methods(target_class)
        .iter()
        .any(|method| matcher.matches_with_introductions(method, target_class, has_introductions))
}

/// 通知器能否作用于目标类
pub fn can_apply(advisor: &dyn Advisor, target_class: &ClassInfo, has_introductions: bool) -> bool {
    if let Some(introduction) = advisor.as_introduction_advisor() {
        return introduction.class_filter().matches(target_class);
    }
    if let Some(pointcut_advisor) = advisor.as_pointcut_advisor() {
        return can_apply_pointcut(pointcut_advisor.pointcut(), target_class, has_introductions);
    }
    // 没有切点的通知器作用于所有类
    true
}

/// 从候选通知器中筛选出适用于目标类的通知器，并按排序值排序
///
/// 引入通知器先参与判断，结果决定其它通知器匹配时的 `has_introductions`。
pub fn find_advisors_that_can_apply(
    candidates: &[Arc<dyn Advisor>],
    target_class: &ClassInfo,
) -> Vec<Arc<dyn Advisor>> {
    let mut eligible: Vec<Arc<dyn Advisor>> = candidates
        .iter()
        .filter(|a| a.as_introduction_advisor().is_some() && can_apply(a.as_ref(), target_class, false))
        .cloned()
        .collect();
    let has_introductions = !eligible.is_empty();

    eligible.extend(
        candidates
            .iter()
            .filter(|a| a.as_introduction_advisor().is_none())
            .filter(|a| can_apply(a.as_ref(), target_class, has_introductions))
            .cloned(),
    );
    sort_advisors(&mut eligible);
    eligible
}
