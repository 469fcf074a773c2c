use std::sync::Arc;
use std::time::Instant;

use once_cell::sync::Lazy;
use trellis_aop::prelude::*;
use trellis_core::prelude::*;

// ==================== 配置 ====================

const APP_CONFIG: &str = r#"
[factory]
allow_bean_definition_overriding = false

[logging]
level = "info"
format = "compact"
filter = "trellis_aop=debug"

[aop]
enabled = true
proxy_target_class = false
"#;

// ==================== 类型元数据 ====================

/// 问候服务接口
static GREETING_SERVICE: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::interface("GreetingService")
        .abstract_method("greet", vec![types::string()], &types::string())
        .build()
});

#[derive(Debug, Default)]
struct GreetingServiceImpl {
    prefix: String,
}

impl GreetingServiceImpl {
    fn greet(&self, name: &str) -> anyhow::Result<String> {
        if name.trim().is_empty() {
            anyhow::bail!("name must not be blank");
        }
        Ok(format!("{}, {}!", self.prefix, name))
    }
}

static GREETING_SERVICE_IMPL: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("GreetingServiceImpl")
        .implements(&GREETING_SERVICE)
        .default_constructor::<GreetingServiceImpl>()
        .property("prefix", &types::string(), |this: &mut GreetingServiceImpl, value| {
            this.prefix = value
                .as_str()
                .ok_or_else(|| anyhow!("prefix must be a string"))?
                .to_string();
            Ok(())
        })
        .method("greet", vec![types::string()], &types::string(), |this: &GreetingServiceImpl, args| {
            Ok(Value::from(this.greet(args.str(0)?)?))
        })
        .on_destroy(|this: &GreetingServiceImpl| {
            tracing::info!("GreetingServiceImpl ('{}') shutting down", this.prefix);
            Ok(())
        })
        .build()
});

/// 通过接口依赖问候服务，注入的是代理
struct WelcomeController {
    greeting_service: BeanInstance,
}

impl WelcomeController {
    fn welcome(&self, name: &str) -> anyhow::Result<Value> {
        self.greeting_service.invoke("greet", vec![Value::from(name)])
    }
}

static WELCOME_CONTROLLER: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("WelcomeController")
        .constructor(vec![Arc::clone(&GREETING_SERVICE)], |args| {
            Ok(WelcomeController {
                greeting_service: args.instance(0)?,
            })
        })
        .method("welcome", vec![types::string()], &types::string(), |this: &WelcomeController, args| {
            this.welcome(args.str(0)?)
        })
        .build()
});

inventory::submit! {
    ClassRegistration::new(|| Arc::clone(&GREETING_SERVICE))
}

inventory::submit! {
    ClassRegistration::new(|| Arc::clone(&GREETING_SERVICE_IMPL))
}

inventory::submit! {
    ClassRegistration::new(|| Arc::clone(&WELCOME_CONTROLLER))
}

// ==================== 切面 ====================

/// 记录每次问候调用的耗时
fn timing_advisor() -> anyhow::Result<Arc<dyn Advisor>> {
    let pointcut = ComposablePointcut::execution("execution(* GreetingService.greet(..))")?;
    let advice = Advice::around(|invocation| {
        let started = Instant::now();
        let result = invocation.proceed();
        tracing::info!("{} took {:?}", invocation.signature(), started.elapsed());
        result
    });
    Ok(Arc::new(
        DefaultPointcutAdvisor::new(Arc::new(pointcut), advice)
            .with_order(1)
            .with_name("timingAdvisor"),
    ))
}

/// 问候名字统一去掉首尾空白
fn trimming_advisor() -> Arc<dyn Advisor> {
    let advice = Advice::around(|invocation| {
        if let Some(name) = invocation.args().get(0).and_then(Value::as_str) {
            let trimmed = name.trim().to_string();
            invocation.args_mut().set(0, Value::from(trimmed))?;
        }
        invocation.proceed()
    });
    Arc::new(
        DefaultPointcutAdvisor::new(Arc::new(ComposablePointcut::method_names(["greet"])), advice)
            .with_order(2)
            .with_name("trimmingAdvisor"),
    )
}

/// 失败的调用记录警告日志，错误原样向上传递
fn failure_advisor() -> Arc<dyn Advisor> {
    let advice = Advice::after_throwing(|join_point, error| {
        tracing::warn!("{} failed: {}", join_point, error);
        error
    });
    Arc::new(DefaultPointcutAdvisor::for_advice(advice).with_name("failureAdvisor"))
}

// ==================== 主程序 ====================

fn main() -> anyhow::Result<()> {
    let settings = Settings::from_toml_str(APP_CONFIG)?;
    settings.logging.init()?;
    let aop_config = AopConfig::from_toml_str(APP_CONFIG)?;

    tracing::info!("Starting app-demo");

    let factory = Arc::new(DefaultListableBeanFactory::with_config(settings.factory.clone()));
    let auto_proxy = AdvisorAutoProxyCreator::install(&factory, aop_config);

    factory.register_bean_definition(
        "greetingService",
        BeanDefinition::for_class_name("GreetingServiceImpl").with_property("prefix", "Hello"),
    )?;
    factory.register_bean_definition(
        "welcomeController",
        BeanDefinition::for_class_name("WelcomeController").with_arg(BeanValue::reference("greetingService")),
    )?;
    factory.register_bean_definition("timingAdvisor", advisor_definition(timing_advisor()?))?;
    factory.register_bean_definition("trimmingAdvisor", advisor_definition(trimming_advisor()))?;
    factory.register_bean_definition("failureAdvisor", advisor_definition(failure_advisor()))?;

    factory.pre_instantiate_singletons()?;

    let greeting_service = factory.get_bean("greetingService")?;
    tracing::info!(
        "greetingService is [{}] (proxied: {})",
        greeting_service.class_name(),
        is_aop_proxy(&greeting_service)
    );
    if let Some(proxy) = advised(&greeting_service) {
        for advisor in proxy.advisors() {
            tracing::info!("  advisor '{}' (order: {:?})", advisor.name(), advisor.order());
        }
    }

    let controller = factory.get_bean("welcomeController")?;
    tracing::info!(
        "welcomeController is [{}] (proxied: {:?})",
        controller.class_name(),
        auto_proxy.is_advised("welcomeController")
    );

    let greeting = controller.invoke("welcome", vec![Value::from("  Trellis  ")])?;
    tracing::info!("welcome -> {:?}", greeting);

    if let Err(e) = controller.invoke("welcome", vec![Value::from("   ")]) {
        tracing::info!("Blank name rejected: {}", e);
    }

    factory.destroy_singletons();
    tracing::info!("app-demo finished");
    Ok(())
}
