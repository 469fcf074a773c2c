//! 自动代理 - 通过 BeanPostProcessor 为 Bean 应用通知器
//!
//! 在 Bean 初始化后，从容器中按类型收集所有通知器 Bean，筛选出适用于当前 Bean 的通知器，
//! 有适用的通知器时返回代理，否则原样返回 Bean 实例。

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use trellis_core::{
    BeanFactory, BeanInstance, BeanPostProcessor, BeansResult, ClassInfo, ConfigurableBeanFactory,
    ConfigurableListableBeanFactory, ListableBeanFactory, INNER_BEAN_PREFIX,
};

use crate::advisor::{advisor_interface, as_advisor, Advisor};
use crate::config::AopConfig;
use crate::proxy::ProxyFactory;
use crate::support::find_advisors_that_can_apply;

/// 已判断过的 Bean（按 Bean 名称和实例类型）
struct AdvisedDecision {
    class_name: String,
    advised: bool,
}

/// 通知器自动代理创建器
///
/// ## 工作原理
///
/// 1. 跳过基础设施 Bean（通知器本身）
/// 2. 按类型收集通知器 Bean，不触发延迟 Bean 的初始化；正在创建中的通知器被跳过
/// 3. 筛选适用于 Bean 类型的通知器并排序
/// 4. 没有适用的通知器时返回原实例，否则创建代理
///
/// ## 使用示例
///
/// ```ignore
/// let factory = Arc::new(DefaultListableBeanFactory::new());
/// AdvisorAutoProxyCreator::install(&factory, AopConfig::default());
/// factory.register_bean_definition("auditAdvisor", advisor_definition(advisor))?;
/// ```
pub struct AdvisorAutoProxyCreator {
    factory: Weak<dyn ConfigurableListableBeanFactory>,
    config: AopConfig,
    advised_beans: RwLock<HashMap<String, AdvisedDecision>>,
}

impl AdvisorAutoProxyCreator {
    pub fn new(factory: Weak<dyn ConfigurableListableBeanFactory>, config: AopConfig) -> Self {
        Self {
            factory,
            config,
            advised_beans: RwLock::new(HashMap::new()),
        }
    }

    /// 创建并注册到容器
    pub fn install<F>(factory: &Arc<F>, config: AopConfig) -> Arc<Self>
    where
        F: ConfigurableListableBeanFactory + 'static,
    {
        let weak = Arc::downgrade(factory);
        let weak: Weak<dyn ConfigurableListableBeanFactory> = weak;
        let creator = Arc::new(Self::new(weak, config));
        factory.add_bean_post_processor(Arc::clone(&creator) as Arc<dyn BeanPostProcessor>);
        tracing::debug!(
            "Auto-proxy creator installed (proxy_target_class: {}, enabled: {})",
            creator.config.proxy_target_class,
            creator.config.enabled
        );
        creator
    }

    pub fn config(&self) -> &AopConfig {
        &self.config
    }

    /// 之前对该 Bean 的判断结果：是否被代理
    pub fn is_advised(&self, bean_name: &str) -> Option<bool> {
        self.advised_beans.read().get(bean_name).map(|d| d.advised)
    }

    fn cached_decision(&self, bean_name: &str, class_name: &str) -> Option<bool> {
        self.advised_beans
            .read()
            .get(bean_name)
            .filter(|d| d.class_name == class_name)
            .map(|d| d.advised)
    }

    fn remember(&self, bean_name: &str, class_name: &str, advised: bool) {
        // 内部 Bean 每次创建都生成新名称，不缓存
        if bean_name.starts_with(INNER_BEAN_PREFIX) {
            return;
        }
        self.advised_beans.write().insert(
            bean_name.to_string(),
            AdvisedDecision {
                class_name: class_name.to_string(),
                advised,
            },
        );
    }

    /// 通知器 Bean 属于基础设施，不被代理
    fn is_infrastructure_class(class: &ClassInfo) -> bool {
        advisor_interface().is_assignable_from(class)
    }

    /// 容器中所有可用的通知器
    ///
    /// 正在创建中的通知器被跳过；通知器因依赖正在创建中的 Bean 而创建失败时也被跳过，
    /// 其它创建错误直接返回。
    pub fn find_candidate_advisors(&self) -> BeansResult<Vec<Arc<dyn Advisor>>> {
        let Some(factory) = self.factory.upgrade() else {
            tracing::warn!("Bean factory already dropped, no advisors available");
            return Ok(Vec::new());
        };

        let advisor_names = factory.get_bean_names_for_type(&advisor_interface(), true, false)?;
        let mut advisors = Vec::with_capacity(advisor_names.len());
        for name in advisor_names {
            if factory.is_currently_in_creation(&name) {
                tracing::trace!("Skipping currently created advisor '{}'", name);
                continue;
            }
            match factory.get_bean(&name) {
                Ok(bean) => match as_advisor(&bean) {
                    Some(advisor) => advisors.push(advisor),
                    None => tracing::warn!(
                        "Bean '{}' of type [{}] does not hold an advisor, ignoring",
                        name,
                        bean.class_name()
                    ),
                },
                Err(e) => {
                    if let Some(in_creation) = e.currently_in_creation_bean() {
                        if factory.is_currently_in_creation(in_creation) {
                            tracing::debug!(
                                "Skipping advisor '{}' with dependency on currently created bean: {}",
                                name,
                                e
                            );
                            continue;
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(advisors)
    }

    /// 适用于给定类型的通知器（已排序）
    pub fn find_eligible_advisors(&self, target_class: &ClassInfo) -> BeansResult<Vec<Arc<dyn Advisor>>> {
        let candidates = self.find_candidate_advisors()?;
        Ok(find_advisors_that_can_apply(&candidates, target_class))
    }

    fn wrap_if_necessary(&self, bean: BeanInstance, bean_name: &str) -> BeansResult<BeanInstance> {
        let class_name = bean.class_name().to_string();
        if self.cached_decision(bean_name, &class_name) == Some(false) {
            tracing::trace!("Bean '{}' known to need no proxy", bean_name);
            return Ok(bean);
        }
        if Self::is_infrastructure_class(bean.class()) {
            self.remember(bean_name, &class_name, false);
            return Ok(bean);
        }

        let advisors = self.find_eligible_advisors(bean.class())?;
        if advisors.is_empty() {
            tracing::trace!("No advisors apply to bean '{}'", bean_name);
            self.remember(bean_name, &class_name, false);
            return Ok(bean);
        }

        self.remember(bean_name, &class_name, true);
        tracing::debug!(
            "Creating implicit proxy for bean '{}' with {} advisor(s)",
            bean_name,
            advisors.len()
        );
        Ok(ProxyFactory::new(bean)
            .with_advisors(advisors)
            .proxy_target_class(self.config.proxy_target_class)
            .get_proxy())
    }
}

impl BeanPostProcessor for AdvisorAutoProxyCreator {
    fn name(&self) -> &str {
        "AdvisorAutoProxyCreator"
    }

    fn order(&self) -> i32 {
        // 在其它处理器之后执行，代理包装的是完全初始化的 Bean
        2000
    }

    fn post_process_after_initialization(&self, bean: BeanInstance, bean_name: &str) -> BeansResult<BeanInstance> {
        if !self.config.enabled {
            return Ok(bean);
        }
        self.wrap_if_necessary(bean, bean_name)
    }
}
