//! 切点（Pointcut）定义
//!
//! 切点由类过滤器（[`ClassFilter`]）和方法匹配器（[`MethodMatcher`]）组成，
//! 决定通知作用在哪些类的哪些方法上。切点是不可变的，组合操作总是产生新的切点。

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use trellis_core::{ClassInfo, MethodInfo, Value};

use crate::error::{AopError, AopResult};

/// 类过滤器
pub trait ClassFilter: Send + Sync {
    fn matches(&self, class: &ClassInfo) -> bool;
}

/// 方法匹配器
///
/// 静态匹配在生成拦截链时执行一次并缓存；`is_runtime()` 为 true 的匹配器
/// 在每次调用时还会用实际参数执行 [`matches_runtime`](MethodMatcher::matches_runtime)。
pub trait MethodMatcher: Send + Sync {
    /// 静态匹配：方法和目标类
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool;

    /// 考虑引入（introduction）的静态匹配
    ///
    /// `has_introductions` 表示目标类上已有引入通知生效。默认忽略该标志。
    fn matches_with_introductions(
        &self,
        method: &MethodInfo,
        target_class: &ClassInfo,
        _has_introductions: bool,
    ) -> bool {
        self.matches(method, target_class)
    }

    /// 是否需要在调用时用实际参数再次匹配
    fn is_runtime(&self) -> bool {
        false
    }

    /// 运行时匹配，只在静态匹配成功且 `is_runtime()` 为 true 时调用
    fn matches_runtime(&self, method: &MethodInfo, target_class: &ClassInfo, _args: &[Value]) -> bool {
        self.matches(method, target_class)
    }

    /// 是否匹配所有方法（用于跳过逐个方法的检查）
    fn matches_everything(&self) -> bool {
        false
    }
}

/// 切点
pub trait Pointcut: Send + Sync {
    fn class_filter(&self) -> Arc<dyn ClassFilter>;

    fn method_matcher(&self) -> Arc<dyn MethodMatcher>;
}

// ============================================================================
// 通配符
// ============================================================================

/// 支持 `*` 通配符的名称模式
///
/// `*` 匹配任意字符序列，例如 `get*`、`*Service`、`find*By*`。
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    raw: String,
    regex: Option<Regex>,
}

impl WildcardPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let regex = if raw.contains('*') && raw != "*" {
            let segments: Vec<String> = raw.split('*').map(regex::escape).collect();
            Regex::new(&format!("^{}$", segments.join(".*"))).ok()
        } else {
            None
        };
        Self { raw, regex }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, text: &str) -> bool {
        if self.raw == "*" {
            return true;
        }
        match &self.regex {
            Some(regex) => regex.is_match(text),
            None => self.raw == text,
        }
    }
}

impl fmt::Display for WildcardPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// TRUE
// ============================================================================

/// 匹配所有类
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueClassFilter;

impl ClassFilter for TrueClassFilter {
    fn matches(&self, _class: &ClassInfo) -> bool {
        true
    }
}

/// 匹配所有方法
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueMethodMatcher;

impl MethodMatcher for TrueMethodMatcher {
    fn matches(&self, _method: &MethodInfo, _target_class: &ClassInfo) -> bool {
        true
    }

    fn matches_everything(&self) -> bool {
        true
    }
}

static TRUE_CLASS_FILTER: Lazy<Arc<dyn ClassFilter>> = Lazy::new(|| Arc::new(TrueClassFilter));
static TRUE_METHOD_MATCHER: Lazy<Arc<dyn MethodMatcher>> = Lazy::new(|| Arc::new(TrueMethodMatcher));

impl TrueClassFilter {
    /// 共享实例
    pub fn shared() -> Arc<dyn ClassFilter> {
        Arc::clone(&TRUE_CLASS_FILTER)
    }
}

impl TrueMethodMatcher {
    /// 共享实例
    pub fn shared() -> Arc<dyn MethodMatcher> {
        Arc::clone(&TRUE_METHOD_MATCHER)
    }
}

// ============================================================================
// 类过滤器
// ============================================================================

/// 匹配给定根类型及其所有子类型（包括实现类）
#[derive(Clone)]
pub struct RootClassFilter {
    root: Arc<ClassInfo>,
}

impl RootClassFilter {
    pub fn new(root: &Arc<ClassInfo>) -> Self {
        Self {
            root: Arc::clone(root),
        }
    }
}

impl ClassFilter for RootClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.root.is_assignable_from(class)
    }
}

/// 按名称模式匹配类本身或其任一父类、接口
#[derive(Debug, Clone)]
pub struct TypePatternClassFilter {
    pattern: WildcardPattern,
}

impl TypePatternClassFilter {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: WildcardPattern::new(pattern),
        }
    }
}

impl ClassFilter for TypePatternClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        if self.pattern.matches(class.name()) {
            return true;
        }
        let mut current = class.superclass().cloned();
        while let Some(superclass) = current {
            if self.pattern.matches(superclass.name()) {
                return true;
            }
            current = superclass.superclass().cloned();
        }
        class
            .all_interfaces()
            .iter()
            .any(|i| self.pattern.matches(i.name()))
    }
}

type ClassPredicate = Box<dyn Fn(&ClassInfo) -> bool + Send + Sync>;

/// 闭包类过滤器
pub struct FnClassFilter {
    predicate: ClassPredicate,
}

impl FnClassFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&ClassInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl ClassFilter for FnClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        (self.predicate)(class)
    }
}

struct UnionClassFilter {
    filters: Vec<Arc<dyn ClassFilter>>,
}

impl ClassFilter for UnionClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.filters.iter().any(|f| f.matches(class))
    }
}

struct IntersectionClassFilter {
    filters: Vec<Arc<dyn ClassFilter>>,
}

impl ClassFilter for IntersectionClassFilter {
    fn matches(&self, class: &ClassInfo) -> bool {
        self.filters.iter().all(|f| f.matches(class))
    }
}

/// 任一过滤器匹配即匹配
pub fn class_filter_union(a: Arc<dyn ClassFilter>, b: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
    Arc::new(UnionClassFilter { filters: vec![a, b] })
}

/// 所有过滤器都匹配才匹配
pub fn class_filter_intersection(a: Arc<dyn ClassFilter>, b: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
    Arc::new(IntersectionClassFilter { filters: vec![a, b] })
}

// ============================================================================
// 方法匹配器
// ============================================================================

/// 按方法名匹配，名称支持 `*` 通配符
#[derive(Debug, Clone, Default)]
pub struct NameMatchMethodMatcher {
    mapped_names: Vec<WildcardPattern>,
}

impl NameMatchMethodMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mapped_names: names.into_iter().map(WildcardPattern::new).collect(),
        }
    }

    pub fn add_method_name(mut self, name: impl Into<String>) -> Self {
        self.mapped_names.push(WildcardPattern::new(name));
        self
    }
}

impl MethodMatcher for NameMatchMethodMatcher {
    fn matches(&self, method: &MethodInfo, _target_class: &ClassInfo) -> bool {
        self.mapped_names.iter().any(|p| p.matches(method.name()))
    }
}

/// 按正则表达式匹配 `类名.方法名`
///
/// 目标类名和方法的声明类名都会参与匹配；命中任一排除模式则不匹配。
/// 模式必须匹配整个字符串。
#[derive(Debug, Clone)]
pub struct RegexpMethodMatcher {
    patterns: Vec<Regex>,
    excluded_patterns: Vec<Regex>,
}

fn compile_full_match(pattern: &str) -> AopResult<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| AopError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

impl RegexpMethodMatcher {
    pub fn new(patterns: &[&str]) -> AopResult<Self> {
        Ok(Self {
            patterns: patterns
                .iter()
                .map(|p| compile_full_match(p))
                .collect::<AopResult<_>>()?,
            excluded_patterns: Vec::new(),
        })
    }

    pub fn with_excluded_patterns(mut self, patterns: &[&str]) -> AopResult<Self> {
        for pattern in patterns {
            self.excluded_patterns.push(compile_full_match(pattern)?);
        }
        Ok(self)
    }

    fn matches_candidate(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(candidate))
            && !self.excluded_patterns.iter().any(|p| p.is_match(candidate))
    }
}

impl MethodMatcher for RegexpMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        let on_target = format!("{}.{}", target_class.name(), method.name());
        if self.matches_candidate(&on_target) {
            return true;
        }
        method.declaring_class() != target_class.name()
            && self.matches_candidate(&format!("{}.{}", method.declaring_class(), method.name()))
    }
}

type MethodPredicate = Box<dyn Fn(&MethodInfo, &ClassInfo) -> bool + Send + Sync>;
type IntroductionPredicate = Box<dyn Fn(&MethodInfo, &ClassInfo, bool) -> bool + Send + Sync>;
type RuntimePredicate = Box<dyn Fn(&MethodInfo, &ClassInfo, &[Value]) -> bool + Send + Sync>;

/// 闭包方法匹配器（静态）
pub struct FnMethodMatcher {
    predicate: MethodPredicate,
}

impl FnMethodMatcher {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&MethodInfo, &ClassInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl MethodMatcher for FnMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        (self.predicate)(method, target_class)
    }
}

/// 能感知引入的闭包方法匹配器
///
/// 闭包的第三个参数为目标类上是否已有引入通知。
pub struct IntroductionAwareMethodMatcher {
    predicate: IntroductionPredicate,
}

impl IntroductionAwareMethodMatcher {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&MethodInfo, &ClassInfo, bool) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl MethodMatcher for IntroductionAwareMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        (self.predicate)(method, target_class, false)
    }

    fn matches_with_introductions(
        &self,
        method: &MethodInfo,
        target_class: &ClassInfo,
        has_introductions: bool,
    ) -> bool {
        (self.predicate)(method, target_class, has_introductions)
    }
}

/// 动态方法匹配器：每次调用都检查实际参数
pub struct DynamicMethodMatcher {
    static_check: Option<MethodPredicate>,
    runtime_check: RuntimePredicate,
}

impl DynamicMethodMatcher {
    pub fn new<F>(runtime_check: F) -> Self
    where
        F: Fn(&MethodInfo, &ClassInfo, &[Value]) -> bool + Send + Sync + 'static,
    {
        Self {
            static_check: None,
            runtime_check: Box::new(runtime_check),
        }
    }

    /// 加上静态预检查，不满足的方法不会进入拦截链
    pub fn with_static_check<F>(mut self, static_check: F) -> Self
    where
        F: Fn(&MethodInfo, &ClassInfo) -> bool + Send + Sync + 'static,
    {
        self.static_check = Some(Box::new(static_check));
        self
    }
}

impl MethodMatcher for DynamicMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        self.static_check
            .as_ref()
            .map_or(true, |check| check(method, target_class))
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_runtime(&self, method: &MethodInfo, target_class: &ClassInfo, args: &[Value]) -> bool {
        self.matches(method, target_class) && (self.runtime_check)(method, target_class, args)
    }
}

struct UnionMethodMatcher {
    first: Arc<dyn MethodMatcher>,
    second: Arc<dyn MethodMatcher>,
}

impl MethodMatcher for UnionMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        self.first.matches(method, target_class) || self.second.matches(method, target_class)
    }

    fn matches_with_introductions(
        &self,
        method: &MethodInfo,
        target_class: &ClassInfo,
        has_introductions: bool,
    ) -> bool {
        self.first
            .matches_with_introductions(method, target_class, has_introductions)
            || self
                .second
                .matches_with_introductions(method, target_class, has_introductions)
    }

    fn is_runtime(&self) -> bool {
        self.first.is_runtime() || self.second.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodInfo, target_class: &ClassInfo, args: &[Value]) -> bool {
        self.first.matches_runtime(method, target_class, args)
            || self.second.matches_runtime(method, target_class, args)
    }

    fn matches_everything(&self) -> bool {
        self.first.matches_everything() || self.second.matches_everything()
    }
}

struct IntersectionMethodMatcher {
    first: Arc<dyn MethodMatcher>,
    second: Arc<dyn MethodMatcher>,
}

impl MethodMatcher for IntersectionMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        self.first.matches(method, target_class) && self.second.matches(method, target_class)
    }

    fn matches_with_introductions(
        &self,
        method: &MethodInfo,
        target_class: &ClassInfo,
        has_introductions: bool,
    ) -> bool {
        self.first
            .matches_with_introductions(method, target_class, has_introductions)
            && self
                .second
                .matches_with_introductions(method, target_class, has_introductions)
    }

    fn is_runtime(&self) -> bool {
        self.first.is_runtime() || self.second.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodInfo, target_class: &ClassInfo, args: &[Value]) -> bool {
        self.first.matches_runtime(method, target_class, args)
            && self.second.matches_runtime(method, target_class, args)
    }

    fn matches_everything(&self) -> bool {
        self.first.matches_everything() && self.second.matches_everything()
    }
}

/// 切点并集使用的方法匹配器：每个方法匹配器只在其类过滤器接受目标类时生效
struct ClassFilterAwareUnionMethodMatcher {
    first: Arc<dyn MethodMatcher>,
    first_filter: Arc<dyn ClassFilter>,
    second: Arc<dyn MethodMatcher>,
    second_filter: Arc<dyn ClassFilter>,
}

impl MethodMatcher for ClassFilterAwareUnionMethodMatcher {
    fn matches(&self, method: &MethodInfo, target_class: &ClassInfo) -> bool {
        (self.first_filter.matches(target_class) && self.first.matches(method, target_class))
            || (self.second_filter.matches(target_class) && self.second.matches(method, target_class))
    }

    fn matches_with_introductions(
        &self,
        method: &MethodInfo,
        target_class: &ClassInfo,
        has_introductions: bool,
    ) -> bool {
        (self.first_filter.matches(target_class)
            && self
                .first
                .matches_with_introductions(method, target_class, has_introductions))
            || (self.second_filter.matches(target_class)
                && self
                    .second
                    .matches_with_introductions(method, target_class, has_introductions))
    }

    fn is_runtime(&self) -> bool {
        self.first.is_runtime() || self.second.is_runtime()
    }

    fn matches_runtime(&self, method: &MethodInfo, target_class: &ClassInfo, args: &[Value]) -> bool {
        (self.first_filter.matches(target_class) && self.first.matches_runtime(method, target_class, args))
            || (self.second_filter.matches(target_class)
                && self.second.matches_runtime(method, target_class, args))
    }
}

/// 任一匹配器匹配即匹配
pub fn method_matcher_union(a: Arc<dyn MethodMatcher>, b: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
    Arc::new(UnionMethodMatcher { first: a, second: b })
}

/// 所有匹配器都匹配才匹配
pub fn method_matcher_intersection(
    a: Arc<dyn MethodMatcher>,
    b: Arc<dyn MethodMatcher>,
) -> Arc<dyn MethodMatcher> {
    Arc::new(IntersectionMethodMatcher { first: a, second: b })
}

// ============================================================================
// 可组合切点
// ============================================================================

/// 可组合的切点
///
/// 每个组合方法都返回新的切点，原切点保持不变。
///
/// # 示例
///
/// ```ignore
/// let pointcut = ComposablePointcut::new()
///     .intersection_class_filter(Arc::new(RootClassFilter::new(&service_interface)))
///     .intersection_method_matcher(Arc::new(NameMatchMethodMatcher::new(["save*"])));
/// ```
#[derive(Clone)]
pub struct ComposablePointcut {
    class_filter: Arc<dyn ClassFilter>,
    method_matcher: Arc<dyn MethodMatcher>,
}

impl Default for ComposablePointcut {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposablePointcut {
    /// 匹配所有类的所有方法
    pub fn new() -> Self {
        Self::from_parts(TrueClassFilter::shared(), TrueMethodMatcher::shared())
    }

    pub fn from_parts(class_filter: Arc<dyn ClassFilter>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self {
            class_filter,
            method_matcher,
        }
    }

    pub fn from_class_filter(class_filter: Arc<dyn ClassFilter>) -> Self {
        Self::from_parts(class_filter, TrueMethodMatcher::shared())
    }

    pub fn from_method_matcher(method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self::from_parts(TrueClassFilter::shared(), method_matcher)
    }

    pub fn from_pointcut(pointcut: &dyn Pointcut) -> Self {
        Self::from_parts(pointcut.class_filter(), pointcut.method_matcher())
    }

    /// 按方法名匹配所有类
    pub fn method_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_method_matcher(Arc::new(NameMatchMethodMatcher::new(names)))
    }

    /// 解析 execution 表达式
    ///
    /// 例如：`execution(* UserService.get*(..))`
    /// 格式：返回类型 类型名.方法名(参数)
    ///
    /// 简化版本，只支持类型和方法名匹配；类型名同时匹配父类和接口。
    pub fn execution(expression: &str) -> AopResult<Self> {
        let trimmed = expression.trim();
        let body = trimmed
            .strip_prefix("execution(")
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(trimmed);

        let parts: Vec<&str> = body.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(AopError::InvalidExpression(expression.to_string()));
        }

        let method_part = parts[1].split('(').next().unwrap_or_default();
        let (type_pattern, method_pattern) = match method_part.rsplit_once('.') {
            Some((type_pattern, method_pattern)) => (type_pattern, method_pattern),
            None => ("*", method_part),
        };
        if type_pattern.is_empty() || method_pattern.is_empty() {
            return Err(AopError::InvalidExpression(expression.to_string()));
        }

        Ok(Self::from_parts(
            Arc::new(TypePatternClassFilter::new(type_pattern)),
            Arc::new(NameMatchMethodMatcher::new([method_pattern])),
        ))
    }

    pub fn union_class_filter(&self, other: Arc<dyn ClassFilter>) -> Self {
        Self::from_parts(
            class_filter_union(Arc::clone(&self.class_filter), other),
            Arc::clone(&self.method_matcher),
        )
    }

    pub fn intersection_class_filter(&self, other: Arc<dyn ClassFilter>) -> Self {
        Self::from_parts(
            class_filter_intersection(Arc::clone(&self.class_filter), other),
            Arc::clone(&self.method_matcher),
        )
    }

    pub fn union_method_matcher(&self, other: Arc<dyn MethodMatcher>) -> Self {
        Self::from_parts(
            Arc::clone(&self.class_filter),
            method_matcher_union(Arc::clone(&self.method_matcher), other),
        )
    }

    pub fn intersection_method_matcher(&self, other: Arc<dyn MethodMatcher>) -> Self {
        Self::from_parts(
            Arc::clone(&self.class_filter),
            method_matcher_intersection(Arc::clone(&self.method_matcher), other),
        )
    }

    /// 切点并集：各自的方法匹配器只在各自的类过滤器接受目标类时生效
    pub fn union(&self, other: &dyn Pointcut) -> Self {
        let other_filter = other.class_filter();
        let method_matcher = Arc::new(ClassFilterAwareUnionMethodMatcher {
            first: Arc::clone(&self.method_matcher),
            first_filter: Arc::clone(&self.class_filter),
            second: other.method_matcher(),
            second_filter: Arc::clone(&other_filter),
        });
        Self::from_parts(
            class_filter_union(Arc::clone(&self.class_filter), other_filter),
            method_matcher,
        )
    }

    /// 切点交集
    pub fn intersection(&self, other: &dyn Pointcut) -> Self {
        Self::from_parts(
            class_filter_intersection(Arc::clone(&self.class_filter), other.class_filter()),
            method_matcher_intersection(Arc::clone(&self.method_matcher), other.method_matcher()),
        )
    }
}

impl Pointcut for ComposablePointcut {
    fn class_filter(&self) -> Arc<dyn ClassFilter> {
        Arc::clone(&self.class_filter)
    }

    fn method_matcher(&self) -> Arc<dyn MethodMatcher> {
        Arc::clone(&self.method_matcher)
    }
}

impl fmt::Debug for ComposablePointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposablePointcut")
            .field("runtime", &self.method_matcher.is_runtime())
            .finish_non_exhaustive()
    }
}
