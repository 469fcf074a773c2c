//! 运行时代理
//!
//! 代理是一个合成的 [`ClassInfo`]：
//! - 接口代理：实现目标的全部接口，只暴露接口方法
//! - 类代理：继承目标类，暴露目标类的全部方法（`proxy_target_class` 或目标没有接口时使用）
//!
//! 引入的接口同时加到代理类型上。每个代理方法的方法体都委托给 [`AopProxy`]，
//! 后者按方法缓存拦截链，再经由 [`MethodInvocation`] 执行通知和目标方法。

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use once_cell::sync::OnceCell;
use trellis_core::class::{Executable, MethodFn};
use trellis_core::{Args, BeanInstance, ClassInfo, MethodInfo, Value};

use crate::advice::Advice;
use crate::advisor::{Advisor, DefaultIntroductionAdvisor, DefaultPointcutAdvisor};
use crate::joinpoint::{ChainLink, MethodInvocation};

/// 代理类名的后缀
pub const PROXY_CLASS_SUFFIX: &str = "$$Proxy";

struct ProxyMethod {
    /// 代理上暴露的方法签名
    exposed: MethodInfo,
    /// 目标上的实现（引入的方法没有）
    target_method: Option<MethodInfo>,
    chain: OnceCell<Vec<ChainLink>>,
}

impl ProxyMethod {
    /// 参与切点匹配的方法：优先使用目标上的实现
    fn matching_method(&self) -> &MethodInfo {
        self.target_method.as_ref().unwrap_or(&self.exposed)
    }
}

/// 代理对象持有的状态
pub struct AopProxy {
    target: BeanInstance,
    advisors: Vec<Arc<dyn Advisor>>,
    methods: Vec<ProxyMethod>,
    class_proxy: bool,
}

impl AopProxy {
    /// 被代理的目标对象
    pub fn target(&self) -> &BeanInstance {
        &self.target
    }

    /// 代理使用的通知器（已排好顺序）
    pub fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    /// 是否为类代理
    pub fn is_class_proxy(&self) -> bool {
        self.class_proxy
    }

    fn invoke(&self, proxy: &BeanInstance, index: usize, args: &Args) -> anyhow::Result<Value> {
        let entry = self
            .methods
            .get(index)
            .ok_or_else(|| anyhow!("Proxy method index {} out of range", index))?;
        let chain = entry.chain.get_or_init(|| self.build_chain(entry.matching_method()));

        if chain.is_empty() {
            if let Some(method) = &entry.target_method {
                return self.target.invoke_method(method, args);
            }
        }

        MethodInvocation::new(
            proxy,
            &self.target,
            entry.matching_method(),
            entry.target_method.as_ref(),
            args.clone(),
            chain,
        )
        .proceed()
    }

    fn build_chain(&self, method: &MethodInfo) -> Vec<ChainLink> {
        let target_class = self.target.class();
        let has_introductions = self.advisors.iter().any(|advisor| {
            advisor
                .as_introduction_advisor()
                .is_some_and(|ia| ia.class_filter().matches(target_class))
        });

        let mut chain = Vec::new();
        for advisor in &self.advisors {
            if let Some(pointcut_advisor) = advisor.as_pointcut_advisor() {
                let pointcut = pointcut_advisor.pointcut();
                if !pointcut.class_filter().matches(target_class) {
                    continue;
                }
                let matcher = pointcut.method_matcher();
                if !matcher.matches_with_introductions(method, target_class, has_introductions) {
                    continue;
                }
                let interceptor = advisor.advice().to_interceptor();
                if matcher.is_runtime() {
                    chain.push(ChainLink::Dynamic {
                        interceptor,
                        matcher,
                    });
                } else {
                    chain.push(ChainLink::Static(interceptor));
                }
            } else if let Some(introduction) = advisor.as_introduction_advisor() {
                if introduction.class_filter().matches(target_class) {
                    chain.push(ChainLink::Static(advisor.advice().to_interceptor()));
                }
            } else {
                chain.push(ChainLink::Static(advisor.advice().to_interceptor()));
            }
        }

        tracing::trace!(
            "Interceptor chain for {} on [{}]: {} link(s)",
            method.name(),
            target_class.name(),
            chain.len()
        );
        chain
    }
}

impl fmt::Debug for AopProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AopProxy")
            .field("target", &self.target)
            .field("advisors", &self.advisors.len())
            .field("methods", &self.methods.len())
            .field("class_proxy", &self.class_proxy)
            .finish()
    }
}

/// Bean 实例是否为代理
pub fn is_aop_proxy(bean: &BeanInstance) -> bool {
    bean.downcast_ref::<AopProxy>().is_some()
}

/// 取出代理的内部状态
pub fn advised(bean: &BeanInstance) -> Option<&AopProxy> {
    bean.downcast_ref::<AopProxy>()
}

/// 编程式代理工厂
///
/// # 示例
///
/// ```ignore
/// let proxy = ProxyFactory::new(target)
///     .with_advice(Advice::before(|jp| {
///         tracing::info!("calling {}", jp);
///         Ok(())
///     }))
///     .get_proxy();
/// proxy.invoke("save", vec![Value::from("alice")])?;
/// ```
pub struct ProxyFactory {
    target: BeanInstance,
    advisors: Vec<Arc<dyn Advisor>>,
    interfaces: Vec<Arc<ClassInfo>>,
    proxy_target_class: bool,
}

impl ProxyFactory {
    pub fn new(target: BeanInstance) -> Self {
        Self {
            target,
            advisors: Vec::new(),
            interfaces: Vec::new(),
            proxy_target_class: false,
        }
    }

    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisors.push(advisor);
        self
    }

    pub fn with_advisors(mut self, advisors: impl IntoIterator<Item = Arc<dyn Advisor>>) -> Self {
        self.advisors.extend(advisors);
        self
    }

    /// 添加作用于所有方法的通知；引入通知包装成引入通知器
    pub fn with_advice(self, advice: Advice) -> Self {
        let advisor: Arc<dyn Advisor> = match advice {
            Advice::Introduction(interceptor) => Arc::new(DefaultIntroductionAdvisor::from_shared(interceptor)),
            advice => Arc::new(DefaultPointcutAdvisor::for_advice(advice)),
        };
        self.with_advisor(advisor)
    }

    /// 指定接口代理暴露的接口（默认为目标的全部接口）
    pub fn with_interface(mut self, interface: &Arc<ClassInfo>) -> Self {
        self.interfaces.push(Arc::clone(interface));
        self
    }

    /// 强制使用类代理
    pub fn proxy_target_class(mut self, proxy_target_class: bool) -> Self {
        self.proxy_target_class = proxy_target_class;
        self
    }

    pub fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    /// 创建代理
    pub fn get_proxy(&self) -> BeanInstance {
        let target_class = Arc::clone(self.target.class());

        let mut introduced: Vec<Arc<ClassInfo>> = Vec::new();
        for advisor in &self.advisors {
            let Some(introduction) = advisor.as_introduction_advisor() else {
                continue;
            };
            if !introduction.class_filter().matches(&target_class) {
                continue;
            }
            for interface in introduction.interfaces() {
                if !introduced.iter().any(|i| i.name() == interface.name()) {
                    introduced.push(Arc::clone(interface));
                }
            }
        }

        let proxied_interfaces = if self.interfaces.is_empty() {
            target_class.all_interfaces()
        } else {
            self.interfaces.clone()
        };
        let class_proxy = self.proxy_target_class || proxied_interfaces.is_empty();

        let mut methods: Vec<ProxyMethod> = Vec::new();
        if class_proxy {
            for method in target_class.all_methods() {
                add_proxy_method(&mut methods, method, &target_class);
            }
        }
        let implemented: Vec<Arc<ClassInfo>> = if class_proxy {
            self.interfaces.iter().chain(&introduced).cloned().collect()
        } else {
            proxied_interfaces.iter().chain(&introduced).cloned().collect()
        };
        for interface in &implemented {
            for declared in std::iter::once(Arc::clone(interface)).chain(interface.all_interfaces()) {
                for method in declared.methods() {
                    add_proxy_method(&mut methods, method, &target_class);
                }
            }
        }

        let proxy_class_name = format!("{}{}", target_class.name(), PROXY_CLASS_SUFFIX);
        let mut builder = ClassInfo::builder(proxy_class_name.clone());
        if class_proxy {
            builder = builder.extends(&target_class);
        }
        for interface in &implemented {
            builder = builder.implements(interface);
        }
        for (index, method) in methods.iter().enumerate() {
            let body: MethodFn = Arc::new(move |proxy: &BeanInstance, args: &Args| {
                let state = proxy
                    .downcast_ref::<AopProxy>()
                    .ok_or_else(|| anyhow!("[{}] is not an AOP proxy", proxy.class_name()))?;
                state.invoke(proxy, index, args)
            });
            builder = builder.method_info(method.exposed.with_body(proxy_class_name.clone(), body));
        }
        let proxy_class = builder.build();

        tracing::debug!(
            "Creating {} proxy for [{}] with {} advisor(s), {} method(s)",
            if class_proxy { "class" } else { "interface" },
            target_class.name(),
            self.advisors.len(),
            methods.len()
        );

        BeanInstance::new(
            proxy_class,
            AopProxy {
                target: self.target.clone(),
                advisors: self.advisors.clone(),
                methods,
                class_proxy,
            },
        )
    }
}

fn add_proxy_method(methods: &mut Vec<ProxyMethod>, method: &MethodInfo, target_class: &ClassInfo) {
    if methods.iter().any(|m| m.exposed.same_signature(method)) {
        return;
    }
    let target_method = if !method.is_abstract() && method.declaring_class() == target_class.name() {
        Some(method.clone())
    } else {
        target_class
            .all_methods()
            .into_iter()
            .find(|m| !m.is_abstract() && m.same_signature(method))
            .cloned()
    };
    if target_method.is_none() {
        tracing::trace!("No target implementation for {}", method.signature());
    }
    methods.push(ProxyMethod {
        exposed: method.clone(),
        target_method,
        chain: OnceCell::new(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::DelegatingIntroductionInterceptor;
    use crate::fixtures::*;
    use crate::pointcut::{ComposablePointcut, DynamicMethodMatcher};
    use crate::support::find_advisors_that_can_apply;
    use parking_lot::Mutex;

    fn recording(log: &EventLog, label: &'static str) -> Advice {
        let log = Arc::clone(log);
        Advice::before(move |jp| {
            log.lock().push(format!("{}:{}", label, jp.method_name()));
            Ok(())
        })
    }

    #[test]
    fn test_interface_proxy_exposes_interface_methods_only() {
        let log = event_log();
        let proxy = ProxyFactory::new(account_service(log.clone()))
            .with_advice(recording(&log, "before"))
            .get_proxy();

        assert!(is_aop_proxy(&proxy));
        assert!(!advised(&proxy).unwrap().is_class_proxy());
        assert!(account_service_interface().is_assignable_from(proxy.class()));
        assert!(!account_service_class().is_assignable_from(proxy.class()));

        assert_eq!(proxy.invoke("save", vec![Value::from("alice")]).unwrap(), Value::from("saved:alice"));
        assert_eq!(*log.lock(), vec!["before:save", "save:alice"]);

        // audit 不在接口上
        assert!(proxy.invoke("audit", ()).is_err());
    }

    #[test]
    fn test_class_proxy_exposes_all_target_methods() {
        let log = event_log();
        let proxy = ProxyFactory::new(account_service(log.clone()))
            .with_advice(recording(&log, "before"))
            .proxy_target_class(true)
            .get_proxy();

        assert!(advised(&proxy).unwrap().is_class_proxy());
        assert_eq!(proxy.class_name(), "AccountServiceImpl$$Proxy");
        assert!(account_service_class().is_assignable_from(proxy.class()));
        assert!(account_service_interface().is_assignable_from(proxy.class()));
        assert_eq!(proxy.invoke("audit", ()).unwrap(), Value::from("audited"));
        assert_eq!(*log.lock(), vec!["before:audit"]);
    }

    #[test]
    fn test_class_without_interfaces_gets_class_proxy() {
        let proxy = ProxyFactory::new(report_generator())
            .with_advice(Advice::around(|inv| {
                let value = inv.proceed()?;
                Ok(Value::from(format!("[{}]", value.as_str().unwrap_or_default())))
            }))
            .get_proxy();

        assert!(advised(&proxy).unwrap().is_class_proxy());
        assert!(report_generator_class().is_assignable_from(proxy.class()));
        assert_eq!(proxy.invoke("load", vec![Value::from("q1")]).unwrap(), Value::from("[report:q1]"));
    }

    #[test]
    fn test_target_error_returned_unchanged() {
        let proxy = ProxyFactory::new(account_service(event_log()))
            .with_advice(Advice::around(|inv| inv.proceed()))
            .get_proxy();

        let err = proxy.invoke("load", vec![Value::from("missing")]).unwrap_err();
        let not_found = err.downcast_ref::<AccountNotFound>().unwrap();
        assert_eq!(not_found.0, "missing");
    }

    #[test]
    fn test_pointcut_limits_advised_methods() {
        let log = event_log();
        let advisor = DefaultPointcutAdvisor::new(
            Arc::new(ComposablePointcut::method_names(["save"])),
            recording(&log, "advised"),
        );
        let proxy = ProxyFactory::new(account_service(log.clone()))
            .with_advisor(Arc::new(advisor))
            .get_proxy();

        proxy.invoke("load", vec![Value::from("a")]).unwrap();
        proxy.invoke("save", vec![Value::from("b")]).unwrap();
        assert_eq!(*log.lock(), vec!["load:a", "advised:save", "save:b"]);
    }

    #[test]
    fn test_dynamic_matcher_sees_actual_arguments() {
        let log = event_log();
        let advisor = DefaultPointcutAdvisor::new(
            Arc::new(ComposablePointcut::from_method_matcher(Arc::new(DynamicMethodMatcher::new(
                |_, _, args| args.first().and_then(Value::as_str) == Some("vip"),
            )))),
            recording(&log, "vip"),
        );
        let proxy = ProxyFactory::new(account_service(log.clone()))
            .with_advisor(Arc::new(advisor))
            .get_proxy();

        proxy.invoke("save", vec![Value::from("guest")]).unwrap();
        proxy.invoke("save", vec![Value::from("vip")]).unwrap();
        assert_eq!(*log.lock(), vec!["save:guest", "vip:save", "save:vip"]);
    }

    #[test]
    fn test_advisor_order_is_registration_order() {
        let log = event_log();
        let proxy = ProxyFactory::new(account_service(log.clone()))
            .with_advice(recording(&log, "first"))
            .with_advice(recording(&log, "second"))
            .get_proxy();

        proxy.invoke("load", vec![Value::from("x")]).unwrap();
        assert_eq!(*log.lock(), vec!["first:load", "second:load", "load:x"]);
    }

    #[test]
    fn test_introduced_interface() {
        let proxy = ProxyFactory::new(account_service(event_log()))
            .with_advice(Advice::Introduction(Arc::new(DelegatingIntroductionInterceptor::new(
                vec![auditable_interface()],
                auditable_delegate("ops"),
            ))))
            .get_proxy();

        assert!(auditable_interface().is_assignable_from(proxy.class()));
        assert!(account_service_interface().is_assignable_from(proxy.class()));
        assert_eq!(proxy.invoke("lastModifiedBy", ()).unwrap(), Value::from("ops"));
        assert_eq!(proxy.invoke("load", vec![Value::from("a")]).unwrap(), Value::from("loaded:a"));
    }

    #[test]
    fn test_chain_cached_per_method() {
        let built = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&built);
        let advisor = DefaultPointcutAdvisor::new(
            Arc::new(ComposablePointcut::from_method_matcher(Arc::new(
                crate::pointcut::FnMethodMatcher::new(move |_, _| {
                    *counter.lock() += 1;
                    true
                }),
            ))),
            Advice::around(|inv| inv.proceed()),
        );
        let proxy = ProxyFactory::new(account_service(event_log()))
            .with_advisor(Arc::new(advisor))
            .get_proxy();

        for _ in 0..3 {
            proxy.invoke("load", vec![Value::from("a")]).unwrap();
        }
        assert_eq!(*built.lock(), 1);
    }

    #[test]
    fn test_inherited_method_is_advised_and_callable() {
        let log = event_log();
        let advisor: Arc<dyn Advisor> = Arc::new(DefaultPointcutAdvisor::new(
            Arc::new(ComposablePointcut::method_names(["save"])),
            recording(&log, "advised"),
        ));
        let eligible = find_advisors_that_can_apply(std::slice::from_ref(&advisor), &tape_archive_class());
        assert_eq!(eligible.len(), 1);

        let target = tape_archive();
        assert_eq!(target.invoke("save", vec![Value::from("a")]).unwrap(), Value::from("archived:a"));

        let proxy = ProxyFactory::new(target).with_advisors(eligible).get_proxy();
        assert!(advised(&proxy).unwrap().is_class_proxy());
        assert_eq!(proxy.invoke("save", vec![Value::from("b")]).unwrap(), Value::from("archived:b"));
        assert_eq!(proxy.invoke("rewind", ()).unwrap(), Value::from("rewound"));
        assert_eq!(*log.lock(), vec!["advised:save"]);
    }

    #[test]
    fn test_proxy_without_advisors_delegates() {
        let proxy = ProxyFactory::new(account_service(event_log())).get_proxy();
        assert_eq!(advised(&proxy).unwrap().advisors().len(), 0);
        assert_eq!(proxy.invoke("load", vec![Value::from("a")]).unwrap(), Value::from("loaded:a"));
    }
}
