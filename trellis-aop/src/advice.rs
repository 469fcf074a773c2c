//! 通知（Advice）类型定义
//!
//! 所有通知最终都被适配为 [`MethodInterceptor`]，由代理按拦截链依次执行：
//! - 前置通知：返回错误时不再调用目标方法
//! - 返回后通知：只在正常返回时调用
//! - 异常通知：只处理匹配的错误类型，可以替换错误
//! - 后置通知：无论成功失败都会调用（finally）
//! - 环绕通知：直接控制 `proceed()`

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use trellis_core::{BeanInstance, ClassInfo, Value};

use crate::joinpoint::{JoinPoint, MethodInvocation};

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceType {
    /// 前置通知：在方法执行前
    Before,

    /// 后置通知：在方法执行后（无论成功或失败）
    After,

    /// 返回后通知：在方法成功返回后
    AfterReturning,

    /// 异常通知：在方法返回错误后
    AfterThrowing,

    /// 环绕通知：包围方法执行
    Around,

    /// 引入：为目标对象增加接口
    Introduction,
}

/// 方法拦截器
///
/// 所有通知的统一执行契约
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value>;
}

/// 前置通知
pub trait MethodBeforeAdvice: Send + Sync {
    /// 返回错误会阻止目标方法执行，错误直接返回给调用方
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 返回后通知
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, join_point: &JoinPoint<'_>, result: &Value) -> anyhow::Result<()>;
}

/// 异常通知
pub trait ThrowsAdvice: Send + Sync {
    /// 是否处理此错误
    fn handles(&self, _error: &anyhow::Error) -> bool {
        true
    }

    /// 返回最终传给调用方的错误（可以是原错误）
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: anyhow::Error) -> anyhow::Error;
}

/// 后置通知（finally）
pub trait AfterAdvice: Send + Sync {
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 通知
#[derive(Clone)]
pub enum Advice {
    Before(Arc<dyn MethodBeforeAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn ThrowsAdvice>),
    After(Arc<dyn AfterAdvice>),
    Around(Arc<dyn MethodInterceptor>),
    Introduction(Arc<DelegatingIntroductionInterceptor>),
}

impl Advice {
    pub fn advice_type(&self) -> AdviceType {
        match self {
            Advice::Before(_) => AdviceType::Before,
            Advice::AfterReturning(_) => AdviceType::AfterReturning,
            Advice::AfterThrowing(_) => AdviceType::AfterThrowing,
            Advice::After(_) => AdviceType::After,
            Advice::Around(_) => AdviceType::Around,
            Advice::Introduction(_) => AdviceType::Introduction,
        }
    }

    /// 闭包前置通知
    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(FnBefore(f)))
    }

    /// 闭包返回后通知
    pub fn after_returning<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::AfterReturning(Arc::new(FnAfterReturning(f)))
    }

    /// 处理所有错误的异常通知
    pub fn after_throwing<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, anyhow::Error) -> anyhow::Error + Send + Sync + 'static,
    {
        Advice::AfterThrowing(Arc::new(FnThrows {
            f,
            _error: PhantomData::<fn() -> anyhow::Error>,
            any_error: true,
        }))
    }

    /// 只处理错误链中含有 `E` 的异常通知
    pub fn after_throwing_of<E, F>(f: F) -> Self
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
        F: Fn(&JoinPoint<'_>, anyhow::Error) -> anyhow::Error + Send + Sync + 'static,
    {
        Advice::AfterThrowing(Arc::new(FnThrows {
            f,
            _error: PhantomData::<fn() -> E>,
            any_error: false,
        }))
    }

    /// 闭包后置通知
    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::After(Arc::new(FnAfter(f)))
    }

    /// 闭包环绕通知
    pub fn around<F>(f: F) -> Self
    where
        F: Fn(&mut MethodInvocation<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(FnAround(f)))
    }

    /// 适配为拦截器
    pub fn to_interceptor(&self) -> Arc<dyn MethodInterceptor> {
        match self {
            Advice::Before(advice) => Arc::new(MethodBeforeAdviceInterceptor(Arc::clone(advice))),
            Advice::AfterReturning(advice) => {
                Arc::new(AfterReturningAdviceInterceptor(Arc::clone(advice)))
            }
            Advice::AfterThrowing(advice) => Arc::new(ThrowsAdviceInterceptor(Arc::clone(advice))),
            Advice::After(advice) => Arc::new(AfterAdviceInterceptor(Arc::clone(advice))),
            Advice::Around(interceptor) => Arc::clone(interceptor),
            Advice::Introduction(interceptor) => Arc::clone(interceptor) as Arc<dyn MethodInterceptor>,
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice::{:?}", self.advice_type())
    }
}

// ============================================================================
// 闭包实现
// ============================================================================

struct FnBefore<F>(F);

impl<F> MethodBeforeAdvice for FnBefore<F>
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        (self.0)(join_point)
    }
}

struct FnAfterReturning<F>(F);

impl<F> AfterReturningAdvice for FnAfterReturning<F>
where
    F: Fn(&JoinPoint<'_>, &Value) -> anyhow::Result<()> + Send + Sync,
{
    fn after_returning(&self, join_point: &JoinPoint<'_>, result: &Value) -> anyhow::Result<()> {
        (self.0)(join_point, result)
    }
}

struct FnThrows<F, E> {
    f: F,
    _error: PhantomData<fn() -> E>,
    any_error: bool,
}

impl<F, E> ThrowsAdvice for FnThrows<F, E>
where
    E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    F: Fn(&JoinPoint<'_>, anyhow::Error) -> anyhow::Error + Send + Sync,
{
    fn handles(&self, error: &anyhow::Error) -> bool {
        self.any_error || error.downcast_ref::<E>().is_some()
    }

    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: anyhow::Error) -> anyhow::Error {
        (self.f)(join_point, error)
    }
}

struct FnAfter<F>(F);

impl<F> AfterAdvice for FnAfter<F>
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        (self.0)(join_point)
    }
}

struct FnAround<F>(F);

impl<F> MethodInterceptor for FnAround<F>
where
    F: Fn(&mut MethodInvocation<'_>) -> anyhow::Result<Value> + Send + Sync,
{
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        (self.0)(invocation)
    }
}

// ============================================================================
// 拦截器适配
// ============================================================================

struct MethodBeforeAdviceInterceptor(Arc<dyn MethodBeforeAdvice>);

impl MethodInterceptor for MethodBeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        self.0.before(&invocation.join_point())?;
        invocation.proceed()
    }
}

struct AfterReturningAdviceInterceptor(Arc<dyn AfterReturningAdvice>);

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        let result = invocation.proceed()?;
        self.0.after_returning(&invocation.join_point(), &result)?;
        Ok(result)
    }
}

struct ThrowsAdviceInterceptor(Arc<dyn ThrowsAdvice>);

impl MethodInterceptor for ThrowsAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        match invocation.proceed() {
            Err(error) if self.0.handles(&error) => {
                Err(self.0.after_throwing(&invocation.join_point(), error))
            }
            other => other,
        }
    }
}

struct AfterAdviceInterceptor(Arc<dyn AfterAdvice>);

impl MethodInterceptor for AfterAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        let result = invocation.proceed();
        let after = self.0.after(&invocation.join_point());
        match (result, after) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(advice_error)) => Err(advice_error),
            (Err(error), Ok(())) => Err(error),
            (Err(error), Err(advice_error)) => {
                tracing::warn!(
                    "After advice on {} failed after the method had already failed: {}",
                    invocation.signature(),
                    advice_error
                );
                Err(error)
            }
        }
    }
}

// ============================================================================
// 引入
// ============================================================================

/// 引入拦截器：把引入接口上的方法委托给一个实现对象，其它方法继续执行拦截链
pub struct DelegatingIntroductionInterceptor {
    interfaces: Vec<Arc<ClassInfo>>,
    delegate: BeanInstance,
}

impl DelegatingIntroductionInterceptor {
    /// `delegate` 的类型必须实现 `interfaces` 中的方法
    pub fn new(interfaces: Vec<Arc<ClassInfo>>, delegate: BeanInstance) -> Self {
        Self {
            interfaces,
            delegate,
        }
    }

    pub fn interfaces(&self) -> &[Arc<ClassInfo>] {
        &self.interfaces
    }

    pub fn delegate(&self) -> &BeanInstance {
        &self.delegate
    }

    /// 是否引入了该接口（或其子接口）
    pub fn implements_interface(&self, interface: &ClassInfo) -> bool {
        self.interfaces.iter().any(|i| interface.is_assignable_from(i))
    }

    fn introduces_method(&self, invocation: &MethodInvocation<'_>) -> bool {
        let method = invocation.method();
        self.interfaces.iter().any(|interface| {
            std::iter::once(Arc::clone(interface))
                .chain(interface.all_interfaces())
                .any(|i| i.methods().iter().any(|m| m.same_signature(method)))
        })
    }
}

impl MethodInterceptor for DelegatingIntroductionInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> anyhow::Result<Value> {
        if !self.introduces_method(invocation) {
            return invocation.proceed();
        }
        let method = invocation.method();
        let delegate_method = self
            .delegate
            .class()
            .methods()
            .iter()
            .find(|m| !m.is_abstract() && m.same_signature(method));
        match delegate_method {
            Some(delegate_method) => self.delegate.invoke_method(delegate_method, invocation.args()),
            None => invocation.proceed(),
        }
    }
}
