//! 连接点（JoinPoint）定义
//!
//! 连接点表示一次经过代理的方法调用。[`MethodInvocation`] 持有拦截链的执行位置，
//! 环绕通知通过 [`MethodInvocation::proceed`] 继续执行后续拦截器和目标方法。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use trellis_core::{Args, BeanInstance, ClassInfo, MethodInfo, Value};

use crate::advice::MethodInterceptor;
use crate::pointcut::MethodMatcher;

/// 连接点信息
///
/// 包含方法调用时的上下文信息，提供给前置、后置等通知
#[derive(Clone, Copy)]
pub struct JoinPoint<'a> {
    target: &'a BeanInstance,
    method: &'a MethodInfo,
    args: &'a [Value],
    timestamp: Instant,
}

impl<'a> JoinPoint<'a> {
    /// 被代理的目标对象
    pub fn target(&self) -> &'a BeanInstance {
        self.target
    }

    /// 目标类型
    pub fn target_class(&self) -> &'a Arc<ClassInfo> {
        self.target.class()
    }

    pub fn method(&self) -> &'a MethodInfo {
        self.method
    }

    pub fn method_name(&self) -> &'a str {
        self.method.name()
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// 获取调用时间戳
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        format!("{}::{}", self.target.class_name(), self.method.name())
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature())
            .field("args", &self.args)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 拦截链中的一环
///
/// 动态匹配器在每次调用时用实际参数决定是否执行拦截器。
#[derive(Clone)]
pub enum ChainLink {
    Static(Arc<dyn MethodInterceptor>),
    Dynamic {
        interceptor: Arc<dyn MethodInterceptor>,
        matcher: Arc<dyn MethodMatcher>,
    },
}

impl fmt::Debug for ChainLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainLink::Static(_) => write!(f, "Static"),
            ChainLink::Dynamic { .. } => write!(f, "Dynamic"),
        }
    }
}

/// 一次方法调用的执行链
///
/// 允许切面控制是否继续执行目标方法，也可以在继续之前修改参数
pub struct MethodInvocation<'a> {
    proxy: &'a BeanInstance,
    target: &'a BeanInstance,
    method: &'a MethodInfo,
    target_method: Option<&'a MethodInfo>,
    args: Args,
    chain: &'a [ChainLink],
    index: usize,
    timestamp: Instant,
}

impl<'a> MethodInvocation<'a> {
    pub(crate) fn new(
        proxy: &'a BeanInstance,
        target: &'a BeanInstance,
        method: &'a MethodInfo,
        target_method: Option<&'a MethodInfo>,
        args: Args,
        chain: &'a [ChainLink],
    ) -> Self {
        Self {
            proxy,
            target,
            method,
            target_method,
            args,
            chain,
            index: 0,
            timestamp: Instant::now(),
        }
    }

    /// 继续执行拦截链；链走完后调用目标方法
    ///
    /// 目标方法返回的错误原样返回。
    pub fn proceed(&mut self) -> anyhow::Result<Value> {
        let chain = self.chain;
        let Some(link) = chain.get(self.index) else {
            return self.invoke_join_point();
        };
        self.index += 1;

        match link {
            ChainLink::Static(interceptor) => interceptor.invoke(self),
            ChainLink::Dynamic {
                interceptor,
                matcher,
            } => {
                if matcher.matches_runtime(self.method, self.target.class(), self.args.values()) {
                    interceptor.invoke(self)
                } else {
                    self.proceed()
                }
            }
        }
    }

    fn invoke_join_point(&self) -> anyhow::Result<Value> {
        match self.target_method {
            Some(method) => self.target.invoke_method(method, &self.args),
            None => Err(anyhow!(
                "No implementation of {} on target [{}]",
                self.method.name(),
                self.target.class_name()
            )),
        }
    }

    /// 代理对象
    pub fn proxy(&self) -> &'a BeanInstance {
        self.proxy
    }

    pub fn target(&self) -> &'a BeanInstance {
        self.target
    }

    pub fn method(&self) -> &'a MethodInfo {
        self.method
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// 可变参数，修改会传递给后续拦截器和目标方法
    pub fn args_mut(&mut self) -> &mut Args {
        &mut self.args
    }

    pub fn join_point(&self) -> JoinPoint<'_> {
        JoinPoint {
            target: self.target,
            method: self.method,
            args: self.args.values(),
            timestamp: self.timestamp,
        }
    }

    pub fn signature(&self) -> String {
        self.join_point().signature()
    }
}

impl fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("signature", &self.signature())
            .field("args", &self.args)
            .field("index", &self.index)
            .field("chain_length", &self.chain.len())
            .finish()
    }
}
