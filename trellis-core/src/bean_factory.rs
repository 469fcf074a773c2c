//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计：定义注册表、单例缓存、
//! 构造函数解析、属性注入与生命周期回调都在这里汇合。

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean_post_processor::{sort_post_processors, BeanPostProcessor};
use crate::class::{ClassInfo, ClassRegistry, Executable, FactoryBeanInfo, PropertyInfo};
use crate::config::FactoryConfig;
use crate::constants::{
    is_factory_dereference, is_simple_type_name, strip_factory_prefix, ANY_TYPE, FACTORY_BEAN_PREFIX,
    GENERATED_BEAN_NAME_SEPARATOR, INNER_BEAN_PREFIX, SCOPE_PROTOTYPE, SCOPE_SINGLETON,
};
use crate::constructor_resolver::{
    AutowireCandidateResolver, ConstructorResolver, ResolvedArguments, ResolvedValueHolder,
};
use crate::convert::{SimpleTypeConverter, TypeConverter};
use crate::definition::{AutowireMode, BeanDefinition, BeanValue, RootBeanDefinition};
use crate::error::{BeansError, BeansResult};
use crate::scope::CustomScope;
use crate::singleton::{DefaultSingletonBeanRegistry, DisposableBean};
use crate::value::{Args, BeanInstance, Value};

/// BeanFactory - 最基础的容器接口
///
/// 提供基本的 Bean 访问功能，类似 Spring 的 BeanFactory
///
/// 注意：此 trait 不包含泛型方法，因此可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称获取 Bean，`&` 前缀返回 FactoryBean 本身
    fn get_bean(&self, name: &str) -> BeansResult<BeanInstance>;

    /// 使用显式构造参数获取 Bean（通常用于原型 Bean）
    fn get_bean_with_args(&self, name: &str, args: Vec<Value>) -> BeansResult<BeanInstance>;

    /// 获取 Bean 并检查类型
    fn get_bean_of_class(&self, name: &str, required: &ClassInfo) -> BeansResult<BeanInstance> {
        let bean = self.get_bean(name)?;
        if required.is_assignable_from(bean.class()) {
            Ok(bean)
        } else {
            Err(BeansError::BeanNotOfRequiredType {
                name: name.to_string(),
                required_type: required.name().to_string(),
                actual_type: bean.class_name().to_string(),
            })
        }
    }

    /// 检查是否包含指定名称的 Bean（定义或手动注册的单例）
    fn contains_bean(&self, name: &str) -> bool;

    fn is_singleton(&self, name: &str) -> BeansResult<bool>;

    fn is_prototype(&self, name: &str) -> BeansResult<bool>;

    /// 判断 Bean 的类型是否可以赋值给 `class`，不会创建 Bean
    fn is_type_match(&self, name: &str, class: &ClassInfo) -> BeansResult<bool> {
        Ok(self
            .get_type(name)?
            .is_some_and(|bean_type| class.is_assignable_from(&bean_type)))
    }

    /// 预测 Bean 的类型，无法确定时返回 None
    fn get_type(&self, name: &str) -> BeansResult<Option<Arc<ClassInfo>>>;

    /// 获取名称的所有别名
    fn get_aliases(&self, name: &str) -> Vec<String>;
}

/// BeanFactoryExt - BeanFactory 的扩展 trait
///
/// 提供泛型方法，不能作为 trait object 使用
pub trait BeanFactoryExt: BeanFactory {
    /// 获取 Bean 并向下转型为具体类型
    fn get_bean_typed<T: Any + Send + Sync>(&self, name: &str) -> BeansResult<Arc<T>> {
        let bean = self.get_bean(name)?;
        bean.downcast::<T>()
            .ok_or_else(|| BeansError::BeanNotOfRequiredType {
                name: name.to_string(),
                required_type: std::any::type_name::<T>().to_string(),
                actual_type: bean.class_name().to_string(),
            })
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// ListableBeanFactory - 可列举的 Bean 工厂
///
/// 扩展 BeanFactory，提供列举所有 Bean 的能力
pub trait ListableBeanFactory: BeanFactory {
    fn contains_bean_definition(&self, name: &str) -> bool;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;

    /// 获取所有 Bean 定义名称（注册顺序）
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 获取与类型匹配的 Bean 名称
    ///
    /// 匹配的是 FactoryBean 本身时返回 `&name`。`allow_eager_init` 为 false 时
    /// 不会为判断类型而创建 FactoryBean，类解析失败的定义被跳过。
    fn get_bean_names_for_type(
        &self,
        class: &ClassInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> BeansResult<Vec<String>>;

    /// 获取与类型匹配的所有 Bean 实例
    ///
    /// 因为当前线程正在创建某个 Bean 而无法创建的候选会被跳过。
    fn get_beans_of_type(
        &self,
        class: &ClassInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> BeansResult<Vec<(String, BeanInstance)>>;

    /// 获取唯一的（或 primary）类型匹配的 Bean
    fn get_bean_of_type(&self, class: &ClassInfo) -> BeansResult<BeanInstance>;
}

/// BeanDefinitionRegistry - Bean 定义与别名的注册表
pub trait BeanDefinitionRegistry: Send + Sync {
    /// 注册 Bean 定义
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()>;

    /// 移除 Bean 定义
    fn remove_bean_definition(&self, name: &str) -> BeansResult<()>;

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> BeansResult<BeanDefinition>;

    /// 名称是否已被定义或别名占用
    fn is_bean_name_in_use(&self, name: &str) -> bool;

    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()>;

    fn remove_alias(&self, alias: &str) -> BeansResult<()>;

    fn is_alias(&self, name: &str) -> bool;

    /// 沿别名链解析到规范名称
    fn canonical_name(&self, name: &str) -> String;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
///
/// 提供配置和管理 Bean 工厂的能力
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 设置父工厂（只能设置一次）
    fn set_parent_bean_factory(&self, parent: Arc<dyn BeanFactory>) -> BeansResult<()>;

    fn get_parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>>;

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>);

    fn get_type_converter(&self) -> Arc<dyn TypeConverter>;

    /// 添加 BeanPostProcessor，按 order 稳定排序
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;

    /// 注册自定义作用域，`singleton` 和 `prototype` 不能被替换
    fn register_scope(&self, name: &str, scope: Arc<dyn CustomScope>) -> BeansResult<()>;

    fn get_registered_scope(&self, name: &str) -> Option<Arc<dyn CustomScope>>;

    /// 注册已经创建好的单例
    fn register_singleton(&self, name: &str, instance: BeanInstance) -> BeansResult<()>;

    fn contains_singleton(&self, name: &str) -> bool;

    /// 获取合并了父定义的 Bean 定义
    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<RootBeanDefinition>>;

    /// 判断 Bean 是否是 FactoryBean
    fn is_factory_bean(&self, name: &str) -> BeansResult<bool>;

    /// 当前线程是否正在创建该 Bean
    fn is_currently_in_creation(&self, name: &str) -> bool;

    fn register_dependent_bean(&self, bean: &str, dependent: &str);

    /// 依赖于 `name` 的 Bean
    fn get_dependent_beans(&self, name: &str) -> Vec<String>;

    /// `name` 依赖的 Bean
    fn get_dependencies_for_bean(&self, name: &str) -> Vec<String>;

    /// 按 Bean 定义对给定实例执行销毁回调
    fn destroy_bean(&self, name: &str, instance: BeanInstance) -> BeansResult<()>;

    /// 从自定义作用域中移除 Bean 并执行销毁回调
    fn destroy_scoped_bean(&self, name: &str) -> BeansResult<()>;

    /// 销毁单个单例及依赖它的 Bean
    fn destroy_singleton(&self, name: &str);

    /// 销毁所有单例 Bean（调用 destroy 回调）
    fn destroy_singletons(&self);
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
///
/// 结合了 ListableBeanFactory、ConfigurableBeanFactory 和定义注册表的功能
pub trait ConfigurableListableBeanFactory:
    ListableBeanFactory + ConfigurableBeanFactory + BeanDefinitionRegistry
{
    /// 预实例化所有非延迟的单例 Bean，失败时销毁本次创建的单例
    fn pre_instantiate_singletons(&self) -> BeansResult<()>;

    /// 冻结配置（不再允许修改 Bean 定义）
    fn freeze_configuration(&self);

    /// 检查配置是否已冻结
    fn is_configuration_frozen(&self) -> bool;
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
///
/// 这是实际的 Bean 容器实现，类似 Spring 的 DefaultListableBeanFactory
pub struct DefaultListableBeanFactory {
    config: RwLock<FactoryConfig>,

    /// 类名到类型元数据的映射
    class_registry: Arc<ClassRegistry>,

    type_converter: RwLock<Arc<dyn TypeConverter>>,

    parent: RwLock<Option<Arc<dyn BeanFactory>>>,

    /// Bean 定义存储
    bean_definitions: RwLock<HashMap<String, BeanDefinition>>,

    /// 定义名称（注册顺序）
    bean_definition_names: RwLock<Vec<String>>,

    /// 别名 -> 名称
    aliases: RwLock<HashMap<String, String>>,

    merged_definitions: RwLock<HashMap<String, Arc<RootBeanDefinition>>>,

    singletons: DefaultSingletonBeanRegistry,

    /// 单例 FactoryBean 生产的对象
    factory_bean_objects: RwLock<HashMap<String, BeanInstance>>,

    /// Bean 后置处理器列表（按优先级排序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,

    scopes: RwLock<HashMap<String, Arc<dyn CustomScope>>>,

    /// 配置是否已冻结
    configuration_frozen: AtomicBool,

    inner_bean_counter: AtomicUsize,
}

impl Default for DefaultListableBeanFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new() -> Self {
        Self::with_config(FactoryConfig::default())
    }

    pub fn with_config(config: FactoryConfig) -> Self {
        Self::with_class_registry(config, Arc::new(ClassRegistry::new()))
    }

    /// 使用共享的类注册表创建工厂
    pub fn with_class_registry(config: FactoryConfig, class_registry: Arc<ClassRegistry>) -> Self {
        Self {
            config: RwLock::new(config),
            class_registry,
            type_converter: RwLock::new(Arc::new(SimpleTypeConverter::new())),
            parent: RwLock::new(None),
            bean_definitions: RwLock::new(HashMap::new()),
            bean_definition_names: RwLock::new(Vec::new()),
            aliases: RwLock::new(HashMap::new()),
            merged_definitions: RwLock::new(HashMap::new()),
            singletons: DefaultSingletonBeanRegistry::new(),
            factory_bean_objects: RwLock::new(HashMap::new()),
            bean_post_processors: RwLock::new(Vec::new()),
            scopes: RwLock::new(HashMap::new()),
            configuration_frozen: AtomicBool::new(false),
            inner_bean_counter: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> FactoryConfig {
        self.config.read().clone()
    }

    pub fn set_allow_bean_definition_overriding(&self, allow: bool) {
        self.config.write().allow_bean_definition_overriding = allow;
    }

    pub fn set_allow_eager_class_loading(&self, allow: bool) {
        self.config.write().allow_eager_class_loading = allow;
    }

    pub fn class_registry(&self) -> &Arc<ClassRegistry> {
        &self.class_registry
    }

    /// 注册类型元数据，供按类名解析的定义使用
    pub fn register_class(&self, class: Arc<ClassInfo>) {
        self.class_registry.register(class);
    }

    fn resolve_alias(&self, name: &str) -> String {
        let aliases = self.aliases.read();
        let mut canonical = name;
        while let Some(target) = aliases.get(canonical) {
            canonical = target;
        }
        canonical.to_string()
    }

    /// 去掉 `&` 前缀并解析别名
    fn transformed_bean_name(&self, name: &str) -> String {
        self.resolve_alias(strip_factory_prefix(name))
    }

    fn original_bean_name(name: &str, bean_name: &str) -> String {
        if is_factory_dereference(name) {
            format!("{}{}", FACTORY_BEAN_PREFIX, bean_name)
        } else {
            bean_name.to_string()
        }
    }

    fn has_bean_definition(&self, bean_name: &str) -> bool {
        self.bean_definitions.read().contains_key(bean_name)
    }

    fn parent(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent.read().clone()
    }

    fn check_frozen(&self, action: impl FnOnce() -> String) -> BeansResult<()> {
        if self.configuration_frozen.load(Ordering::SeqCst) {
            return Err(BeansError::ConfigurationFrozen(action()));
        }
        Ok(())
    }

    // ========== 获取 Bean ==========

    fn do_get_bean(&self, name: &str, explicit_args: Option<&[Value]>) -> BeansResult<BeanInstance> {
        let bean_name = self.transformed_bean_name(name);
        tracing::trace!("Requesting bean '{}'", bean_name);

        if explicit_args.is_none() {
            if let Some(shared) = self.singletons.get_singleton(&bean_name) {
                tracing::debug!("Returning cached instance of singleton bean '{}'", bean_name);
                return self.get_object_for_bean_instance(shared, name, &bean_name);
            }
        }

        if !self.has_bean_definition(&bean_name) {
            if let Some(parent) = self.parent() {
                let original = Self::original_bean_name(name, &bean_name);
                tracing::trace!("Delegating lookup of bean '{}' to parent factory", original);
                return match explicit_args {
                    Some(args) => parent.get_bean_with_args(&original, args.to_vec()),
                    None => parent.get_bean(&original),
                };
            }
        }

        let mbd = self.merged_bean_definition(&bean_name)?;
        if mbd.is_abstract() {
            return Err(BeansError::BeanIsAbstract { name: bean_name });
        }

        self.create_depends_on_beans(&bean_name, &mbd)?;

        let instance = if mbd.is_singleton() {
            self.singletons.get_or_create_singleton(&bean_name, || {
                self.create_bean(&bean_name, &mbd, explicit_args).map_err(|e| {
                    // 清理创建过程中已经登记的依赖和销毁回调
                    self.destroy_singleton_internal(&bean_name);
                    e
                })
            })?
        } else if mbd.is_prototype() {
            tracing::debug!("Creating new instance of prototype bean '{}'", bean_name);
            let _creation = self.singletons.creation_tracker().enter(&bean_name)?;
            self.create_bean(&bean_name, &mbd, explicit_args)?
        } else {
            let scope_name = mbd.scope().name();
            let scope = self
                .get_registered_scope(scope_name)
                .ok_or_else(|| BeansError::IllegalScope {
                    name: bean_name.clone(),
                    scope: scope_name.to_string(),
                })?;
            scope.get(&bean_name, &|| {
                tracing::debug!("Creating instance of bean '{}' in scope '{}'", bean_name, scope_name);
                let _creation = self.singletons.creation_tracker().enter(&bean_name)?;
                self.create_bean(&bean_name, &mbd, explicit_args)
            })?
        };

        self.get_object_for_bean_instance(instance, name, &bean_name)
    }

    fn create_depends_on_beans(&self, bean_name: &str, mbd: &RootBeanDefinition) -> BeansResult<()> {
        for dependency in mbd.depends_on() {
            let dependency_name = self.transformed_bean_name(dependency);
            if self.singletons.is_dependent(bean_name, &dependency_name) {
                return Err(BeansError::creation(
                    bean_name,
                    format!(
                        "Circular depends-on relationship between '{}' and '{}'",
                        bean_name, dependency
                    ),
                ));
            }
            self.singletons.register_dependent_bean(&dependency_name, bean_name);
            self.get_bean(dependency).map_err(|e| {
                BeansError::wrap(
                    bean_name,
                    format!("Failed to initialize dependency '{}' of bean '{}'", dependency, bean_name),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// 普通 Bean 原样返回，FactoryBean 返回它生产的对象（`&` 前缀除外）
    fn get_object_for_bean_instance(
        &self,
        instance: BeanInstance,
        name: &str,
        bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        let factory = instance.class().factory_bean().cloned();
        if is_factory_dereference(name) {
            return match factory {
                Some(_) => Ok(instance),
                None => Err(BeansError::BeanIsNotAFactory(bean_name.to_string())),
            };
        }
        let Some(factory) = factory else {
            return Ok(instance);
        };

        if !(factory.is_singleton() && self.singletons.contains_singleton(bean_name)) {
            return self.get_object_from_factory_bean(&factory, &instance, bean_name);
        }

        let cached = self.factory_bean_objects.read().get(bean_name).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let _guard = self.singletons.lock();
        let cached = self.factory_bean_objects.read().get(bean_name).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        let product = self.get_object_from_factory_bean(&factory, &instance, bean_name)?;
        self.factory_bean_objects
            .write()
            .insert(bean_name.to_string(), product.clone());
        Ok(product)
    }

    fn get_object_from_factory_bean(
        &self,
        factory: &FactoryBeanInfo,
        instance: &BeanInstance,
        bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        tracing::trace!("Obtaining object from FactoryBean '{}'", bean_name);
        let product = factory
            .get_object(instance)
            .map_err(|source| BeansError::CallbackFailed {
                name: bean_name.to_string(),
                phase: "FactoryBean object creation".to_string(),
                source,
            })?
            .into_instance()
            .ok_or_else(|| BeansError::creation(bean_name, "FactoryBean returned null object"))?;
        self.apply_bean_post_processors_after_initialization(product, bean_name)
    }

    // ========== 创建 Bean ==========

    /// 创建 Bean 实例并调用生命周期回调
    fn create_bean(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        explicit_args: Option<&[Value]>,
    ) -> BeansResult<BeanInstance> {
        tracing::trace!("Creating instance of bean '{}'", bean_name);
        let mut instance = self.create_bean_instance(bean_name, mbd, explicit_args)?;
        self.populate_bean(bean_name, mbd, &mut instance)?;
        let (raw, exposed) = self.initialize_bean(bean_name, mbd, instance)?;
        self.register_disposable_bean_if_necessary(bean_name, mbd, raw);
        tracing::trace!("Finished creating instance of bean '{}'", bean_name);
        Ok(exposed)
    }

    fn create_bean_instance(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        explicit_args: Option<&[Value]>,
    ) -> BeansResult<BeanInstance> {
        if let Some(supplier) = mbd.instance_supplier() {
            return supplier().map_err(|source| BeansError::CallbackFailed {
                name: bean_name.to_string(),
                phase: "Instance supplier".to_string(),
                source,
            });
        }
        if let Some(method_name) = mbd.factory_method_name() {
            return self.instantiate_using_factory_method(bean_name, mbd, method_name, explicit_args);
        }

        let class = self
            .resolve_bean_class(bean_name, mbd)?
            .ok_or_else(|| BeansError::creation(bean_name, "No bean class specified on bean definition"))?;
        if class.is_interface() {
            return Err(BeansError::creation(
                bean_name,
                format!("Specified class [{}] is an interface", class.name()),
            ));
        }
        if class.constructors().is_empty() {
            return Err(BeansError::creation(
                bean_name,
                format!("No constructors declared on class [{}]", class.name()),
            ));
        }

        let args = self.resolve_arguments(bean_name, mbd, explicit_args)?;
        let converter = self.get_type_converter();
        let resolver = ConstructorResolver::new(converter.as_ref(), self);
        let resolution = resolver.resolve(
            bean_name,
            class.constructors().iter().collect(),
            &args,
            mbd.autowire_mode() == AutowireMode::Constructor,
            "constructor",
        )?;
        self.register_autowired_beans(bean_name, &resolution.autowired_bean_names);

        let object = resolution
            .executable
            .new_instance(&Args::new(resolution.args))
            .map_err(|source| BeansError::CallbackFailed {
                name: bean_name.to_string(),
                phase: format!("Instantiation via constructor {}", resolution.executable.signature()),
                source,
            })?;
        Ok(BeanInstance::from_parts(Arc::clone(&class), Arc::from(object)))
    }

    fn instantiate_using_factory_method(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        method_name: &str,
        explicit_args: Option<&[Value]>,
    ) -> BeansResult<BeanInstance> {
        let args = self.resolve_arguments(bean_name, mbd, explicit_args)?;
        let converter = self.get_type_converter();
        let resolver = ConstructorResolver::new(converter.as_ref(), self);
        let autowiring = mbd.autowire_mode() == AutowireMode::Constructor;

        let (result, signature) = match mbd.factory_bean_name() {
            Some(factory_bean_name) => {
                if factory_bean_name == bean_name {
                    return Err(BeansError::InvalidBeanDefinition {
                        name: bean_name.to_string(),
                        message: "factory-bean reference points back to the same bean definition".to_string(),
                    });
                }
                let factory = self.get_bean(factory_bean_name).map_err(|e| {
                    BeansError::wrap(
                        bean_name,
                        format!("Cannot obtain factory bean '{}'", factory_bean_name),
                        e,
                    )
                })?;
                self.singletons
                    .register_dependent_bean(&self.transformed_bean_name(factory_bean_name), bean_name);
                let candidates = factory
                    .class()
                    .methods_named(method_name)
                    .filter(|m| !m.is_abstract())
                    .collect::<Vec<_>>();
                if candidates.is_empty() {
                    return Err(BeansError::creation(
                        bean_name,
                        format!(
                            "No factory method '{}' found on factory bean '{}' of class [{}]",
                            method_name,
                            factory_bean_name,
                            factory.class_name()
                        ),
                    ));
                }
                let resolution = resolver.resolve(bean_name, candidates, &args, autowiring, "factory method")?;
                self.register_autowired_beans(bean_name, &resolution.autowired_bean_names);
                let signature = resolution.executable.signature();
                let result = factory.invoke_method(resolution.executable, &Args::new(resolution.args));
                (result, signature)
            }
            None => {
                let class = self
                    .resolve_bean_class(bean_name, mbd)?
                    .ok_or_else(|| BeansError::creation(bean_name, "No bean class specified for static factory method"))?;
                let candidates = class.factory_methods_named(method_name).collect::<Vec<_>>();
                if candidates.is_empty() {
                    return Err(BeansError::creation(
                        bean_name,
                        format!("No static factory method '{}' found on class [{}]", method_name, class.name()),
                    ));
                }
                let resolution = resolver.resolve(bean_name, candidates, &args, autowiring, "factory method")?;
                self.register_autowired_beans(bean_name, &resolution.autowired_bean_names);
                let signature = resolution.executable.signature();
                let result = resolution.executable.invoke(&Args::new(resolution.args));
                (result, signature)
            }
        };

        result
            .map_err(|source| BeansError::CallbackFailed {
                name: bean_name.to_string(),
                phase: format!("Factory method {}", signature),
                source,
            })?
            .into_instance()
            .ok_or_else(|| {
                BeansError::creation(bean_name, format!("Factory method {} returned null", signature))
            })
    }

    /// 求值构造参数，显式参数优先于定义中的参数
    fn resolve_arguments(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        explicit_args: Option<&[Value]>,
    ) -> BeansResult<ResolvedArguments> {
        if let Some(explicit) = explicit_args {
            return Ok(ResolvedArguments::explicit(explicit.to_vec()));
        }
        let constructor_args = mbd.constructor_args();
        let mut indexed = BTreeMap::new();
        for (index, holder) in constructor_args.indexed() {
            let value = self.resolve_value_if_necessary(
                bean_name,
                mbd,
                &format!("constructor argument with index {}", index),
                &holder.value,
            )?;
            indexed.insert(*index, ResolvedValueHolder::new(value, holder.type_name.clone()));
        }
        let mut generic = Vec::with_capacity(constructor_args.generic().len());
        for holder in constructor_args.generic() {
            let value = self.resolve_value_if_necessary(bean_name, mbd, "constructor argument", &holder.value)?;
            generic.push(ResolvedValueHolder::new(value, holder.type_name.clone()));
        }
        Ok(ResolvedArguments::new(indexed, generic))
    }

    fn register_autowired_beans(&self, bean_name: &str, autowired: &[String]) {
        for autowired_name in autowired {
            self.singletons.register_dependent_bean(autowired_name, bean_name);
            tracing::debug!(
                "Autowiring by type from bean name '{}' to bean named '{}'",
                bean_name,
                autowired_name
            );
        }
    }

    fn resolve_bean_class(&self, bean_name: &str, mbd: &RootBeanDefinition) -> BeansResult<Option<Arc<ClassInfo>>> {
        mbd.resolve_class(|class_name| self.class_registry.resolve(bean_name, class_name))
    }

    /// 把定义中的值求值为运行时值
    fn resolve_value_if_necessary(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        arg_name: &str,
        value: &BeanValue,
    ) -> BeansResult<Value> {
        match value {
            BeanValue::Null => Ok(Value::Null),
            BeanValue::Literal(literal) => Ok(literal.clone()),
            BeanValue::TypedString { value, target_type } => match target_type {
                None => Ok(Value::Str(value.clone())),
                Some(target_type) => {
                    let target = self.class_registry.resolve(bean_name, target_type)?;
                    self.get_type_converter()
                        .convert_if_necessary(&Value::Str(value.clone()), &target)
                        .map_err(|e| {
                            BeansError::wrap(
                                bean_name,
                                format!("Error converting typed string value for {}", arg_name),
                                e,
                            )
                        })
                }
            },
            BeanValue::Ref(reference) => self.resolve_reference(bean_name, arg_name, reference),
            BeanValue::Inner(definition) => self.resolve_inner_bean(bean_name, mbd, arg_name, definition),
            BeanValue::List(items) => items
                .iter()
                .map(|item| self.resolve_value_if_necessary(bean_name, mbd, arg_name, item))
                .collect::<BeansResult<Vec<_>>>()
                .map(Value::List),
        }
    }

    fn resolve_reference(&self, bean_name: &str, arg_name: &str, reference: &str) -> BeansResult<Value> {
        let bean = self.get_bean(reference).map_err(|e| {
            BeansError::wrap(
                bean_name,
                format!("Cannot resolve reference to bean '{}' while setting {}", reference, arg_name),
                e,
            )
        })?;
        self.singletons
            .register_dependent_bean(&self.transformed_bean_name(reference), bean_name);
        Ok(Value::from_instance(bean))
    }

    fn resolve_inner_bean(
        &self,
        bean_name: &str,
        outer: &RootBeanDefinition,
        arg_name: &str,
        definition: &BeanDefinition,
    ) -> BeansResult<Value> {
        let id = self.inner_bean_counter.fetch_add(1, Ordering::Relaxed);
        let inner_name = format!("{}{}{}", INNER_BEAN_PREFIX, GENERATED_BEAN_NAME_SEPARATOR, id);

        let create = || -> BeansResult<BeanInstance> {
            definition.validate(&inner_name)?;
            let mut mbd = match &definition.parent_name {
                Some(parent_name) => {
                    let parent = self.merged_bean_definition(parent_name)?;
                    RootBeanDefinition::merge(&parent, definition)
                }
                None => RootBeanDefinition::from_definition(definition),
            };
            mbd.inherit_containing_scope(outer.scope());
            self.create_depends_on_beans(&inner_name, &mbd)?;
            let _creation = self.singletons.creation_tracker().enter(&inner_name)?;
            let instance = self.create_bean(&inner_name, &mbd, None)?;
            self.get_object_for_bean_instance(instance, &inner_name, &inner_name)
        };

        let instance = create().map_err(|e| {
            BeansError::wrap(
                bean_name,
                format!("Cannot create inner bean '{}' while setting {}", inner_name, arg_name),
                e,
            )
        })?;
        // 原型 Bean 不会被销毁，记录依赖只会让依赖表无限增长
        if !outer.is_prototype() {
            self.singletons.register_dependent_bean(&inner_name, bean_name);
        }
        Ok(Value::from_instance(instance))
    }

    // ========== 属性注入 ==========

    fn populate_bean(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        instance: &mut BeanInstance,
    ) -> BeansResult<()> {
        let mut property_values = Vec::with_capacity(mbd.property_values().len());
        for (property, value) in mbd.property_values().iter() {
            let resolved =
                self.resolve_value_if_necessary(bean_name, mbd, &format!("bean property '{}'", property), value)?;
            property_values.push((property.to_string(), resolved));
        }

        match mbd.autowire_mode() {
            AutowireMode::ByName => self.autowire_by_name(bean_name, mbd, instance.class(), &mut property_values)?,
            AutowireMode::ByType => self.autowire_by_type(bean_name, mbd, instance.class(), &mut property_values)?,
            AutowireMode::No | AutowireMode::Constructor => {}
        }

        if property_values.is_empty() {
            return Ok(());
        }
        self.apply_property_values(bean_name, instance, property_values)
    }

    /// 定义中未设置、且类型不是简单类型的属性
    fn unsatisfied_non_simple_properties<'c>(
        mbd: &RootBeanDefinition,
        class: &'c ClassInfo,
    ) -> Vec<&'c PropertyInfo> {
        class
            .properties()
            .iter()
            .filter(|p| !mbd.property_values().contains(p.name()))
            .filter(|p| !is_simple_type_name(p.property_type().name()))
            .collect()
    }

    fn autowire_by_name(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        class: &ClassInfo,
        property_values: &mut Vec<(String, Value)>,
    ) -> BeansResult<()> {
        for property in Self::unsatisfied_non_simple_properties(mbd, class) {
            let property_name = property.name();
            if property_name == bean_name || !self.contains_bean(property_name) {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by name: no matching bean found",
                    property_name,
                    bean_name
                );
                continue;
            }
            let bean = self.get_bean(property_name).map_err(|e| {
                BeansError::wrap(bean_name, format!("Cannot autowire property '{}' by name", property_name), e)
            })?;
            self.singletons
                .register_dependent_bean(&self.transformed_bean_name(property_name), bean_name);
            tracing::debug!(
                "Added autowiring by name from bean name '{}' via property '{}' to bean named '{}'",
                bean_name,
                property_name,
                property_name
            );
            property_values.push((property_name.to_string(), Value::from_instance(bean)));
        }
        Ok(())
    }

    fn autowire_by_type(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        class: &ClassInfo,
        property_values: &mut Vec<(String, Value)>,
    ) -> BeansResult<()> {
        for property in Self::unsatisfied_non_simple_properties(mbd, class) {
            let property_type = property.property_type();
            if property_type.name() == ANY_TYPE {
                continue;
            }
            let candidates = self.find_autowire_candidates(property_type, bean_name)?;
            if candidates.is_empty() {
                tracing::trace!(
                    "Not autowiring property '{}' of bean '{}' by type: no matching bean found",
                    property.name(),
                    bean_name
                );
                continue;
            }
            let candidate = self
                .determine_unique_candidate(property_type, candidates)
                .map_err(|e| BeansError::UnsatisfiedDependency {
                    name: bean_name.to_string(),
                    target: format!("bean property '{}'", property.name()),
                    message: e.to_string(),
                })?;
            let bean = self.get_bean(&candidate).map_err(|e| {
                BeansError::wrap(bean_name, format!("Cannot autowire property '{}' by type", property.name()), e)
            })?;
            let candidate_name = self.transformed_bean_name(&candidate);
            self.singletons.register_dependent_bean(&candidate_name, bean_name);
            tracing::debug!(
                "Autowiring by type from bean name '{}' via property '{}' to bean named '{}'",
                bean_name,
                property.name(),
                candidate_name
            );
            property_values.push((property.name().to_string(), Value::from_instance(bean)));
        }
        Ok(())
    }

    fn apply_property_values(
        &self,
        bean_name: &str,
        instance: &mut BeanInstance,
        property_values: Vec<(String, Value)>,
    ) -> BeansResult<()> {
        let class = Arc::clone(instance.class());
        let converter = self.get_type_converter();
        let object = instance.object_mut().ok_or_else(|| {
            BeansError::creation(bean_name, "Cannot apply property values: bean instance is already shared")
        })?;

        for (property_name, value) in property_values {
            let property = class
                .find_property(&property_name)
                .ok_or_else(|| BeansError::InvalidProperty {
                    class_name: class.name().to_string(),
                    property: property_name.clone(),
                    message: "Bean property is not writable or has no setter".to_string(),
                })?;
            let converted = converter
                .convert_if_necessary(&value, property.property_type())
                .map_err(|e| {
                    BeansError::wrap(
                        bean_name,
                        format!("Failed to convert property value for property '{}'", property_name),
                        e,
                    )
                })?;
            property
                .set(&mut *object, converted)
                .map_err(|source| BeansError::CallbackFailed {
                    name: bean_name.to_string(),
                    phase: format!("Setting property '{}'", property_name),
                    source,
                })?;
        }
        Ok(())
    }

    // ========== 初始化与销毁 ==========

    /// 返回（原始实例，暴露给调用方的实例）
    fn initialize_bean(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        instance: BeanInstance,
    ) -> BeansResult<(BeanInstance, BeanInstance)> {
        let mut current = self.apply_bean_post_processors_before_initialization(instance, bean_name)?;

        if let Some(init) = current.class().init_callback().cloned() {
            match current.object_mut() {
                Some(object) => init(object).map_err(|source| BeansError::CallbackFailed {
                    name: bean_name.to_string(),
                    phase: "Initialization callback".to_string(),
                    source,
                })?,
                None => {
                    return Err(BeansError::creation(
                        bean_name,
                        "Cannot call init callback: bean instance is already shared",
                    ))
                }
            }
        }

        if let Some(init_method) = mbd.init_method_name() {
            tracing::trace!("Invoking init method '{}' on bean '{}'", init_method, bean_name);
            current
                .invoke(init_method, ())
                .map_err(|source| BeansError::CallbackFailed {
                    name: bean_name.to_string(),
                    phase: format!("Init method '{}'", init_method),
                    source,
                })?;
        }

        let exposed = self.apply_bean_post_processors_after_initialization(current.clone(), bean_name)?;
        Ok((current, exposed))
    }

    fn apply_bean_post_processors_before_initialization(
        &self,
        bean: BeanInstance,
        bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        let mut current = bean;
        for processor in self.get_bean_post_processors() {
            current = processor.post_process_before_initialization(current, bean_name)?;
        }
        Ok(current)
    }

    fn apply_bean_post_processors_after_initialization(
        &self,
        bean: BeanInstance,
        bean_name: &str,
    ) -> BeansResult<BeanInstance> {
        let mut current = bean;
        for processor in self.get_bean_post_processors() {
            current = processor.post_process_after_initialization(current, bean_name)?;
        }
        Ok(current)
    }

    fn register_disposable_bean_if_necessary(&self, bean_name: &str, mbd: &RootBeanDefinition, raw: BeanInstance) {
        if mbd.is_prototype() {
            return;
        }
        let disposable = DisposableBean::new(raw, mbd.destroy_method_name().map(str::to_string));
        if !disposable.has_destroy_logic() {
            return;
        }
        if mbd.is_singleton() {
            self.singletons.register_disposable_bean(bean_name, disposable);
            return;
        }
        match self.get_registered_scope(mbd.scope().name()) {
            Some(scope) => {
                let name = bean_name.to_string();
                scope.register_destruction_callback(
                    bean_name,
                    Box::new(move || {
                        if let Err(e) = disposable.destroy() {
                            tracing::warn!("Failed to destroy scoped bean '{}': {}", name, e);
                        }
                    }),
                );
            }
            None => tracing::warn!(
                "Scope '{}' of bean '{}' is not registered, destroy callback dropped",
                mbd.scope().name(),
                bean_name
            ),
        }
    }

    fn destroy_singleton_internal(&self, bean_name: &str) {
        self.singletons.destroy_singleton(bean_name);
        self.factory_bean_objects
            .write()
            .retain(|name, _| self.singletons.contains_singleton(name));
    }

    // ========== 定义合并与重置 ==========

    fn merged_bean_definition(&self, name: &str) -> BeansResult<Arc<RootBeanDefinition>> {
        let bean_name = self.transformed_bean_name(name);
        self.merged_definition_with_parents(&bean_name, &mut Vec::new())
    }

    fn merged_definition_with_parents(
        &self,
        bean_name: &str,
        visiting: &mut Vec<String>,
    ) -> BeansResult<Arc<RootBeanDefinition>> {
        let cached = self.merged_definitions.read().get(bean_name).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }
        if visiting.iter().any(|n| n == bean_name) {
            visiting.push(bean_name.to_string());
            return Err(BeansError::InvalidBeanDefinition {
                name: visiting[0].clone(),
                message: format!("Circular parent relationship: {}", visiting.join(" -> ")),
            });
        }
        visiting.push(bean_name.to_string());

        let definition = self
            .bean_definitions
            .read()
            .get(bean_name)
            .cloned()
            .ok_or_else(|| BeansError::NoSuchBeanDefinition(bean_name.to_string()))?;
        let merged = match &definition.parent_name {
            None => RootBeanDefinition::from_definition(&definition),
            Some(parent_name) => {
                let parent_name = self.resolve_alias(parent_name);
                let parent = self
                    .merged_definition_with_parents(&parent_name, visiting)
                    .map_err(|e| match e {
                        BeansError::NoSuchBeanDefinition(_) => BeansError::InvalidBeanDefinition {
                            name: bean_name.to_string(),
                            message: format!("Could not resolve parent bean definition '{}'", parent_name),
                        },
                        other => other,
                    })?;
                RootBeanDefinition::merge(&parent, &definition)
            }
        };

        let mut merged_definitions = self.merged_definitions.write();
        let merged = merged_definitions
            .entry(bean_name.to_string())
            .or_insert_with(|| Arc::new(merged));
        Ok(Arc::clone(merged))
    }

    /// 清除合并定义和单例，并级联到子定义
    fn reset_bean_definition(&self, bean_name: &str, visited: &mut HashSet<String>) {
        if !visited.insert(bean_name.to_string()) {
            return;
        }
        self.merged_definitions.write().remove(bean_name);
        self.destroy_singleton_internal(bean_name);

        let children: Vec<String> = {
            let definitions = self.bean_definitions.read();
            definitions
                .iter()
                .filter(|(_, definition)| {
                    definition
                        .parent_name
                        .as_deref()
                        .is_some_and(|parent| self.resolve_alias(parent) == bean_name)
                })
                .map(|(name, _)| name.clone())
                .collect()
        };
        for child in children {
            self.reset_bean_definition(&child, visited);
        }
    }

    fn alias_resolves_through(&self, name: &str, target: &str) -> bool {
        let aliases = self.aliases.read();
        let mut current = name;
        loop {
            if current == target {
                return true;
            }
            match aliases.get(current) {
                Some(next) => current = next,
                None => return false,
            }
        }
    }

    // ========== 类型匹配 ==========

    /// 不创建 Bean 的情况下预测原始类型（FactoryBean 返回工厂本身的类）
    fn predict_bean_type(&self, bean_name: &str, mbd: &RootBeanDefinition) -> BeansResult<Option<Arc<ClassInfo>>> {
        match mbd.factory_method_name() {
            Some(method_name) => self.factory_method_return_type(bean_name, mbd, method_name),
            None => self.resolve_bean_class(bean_name, mbd),
        }
    }

    /// 所有同名工厂方法声明相同返回类型时才能确定
    fn factory_method_return_type(
        &self,
        bean_name: &str,
        mbd: &RootBeanDefinition,
        method_name: &str,
    ) -> BeansResult<Option<Arc<ClassInfo>>> {
        let return_types: Vec<Arc<ClassInfo>> = match mbd.factory_bean_name() {
            Some(factory_bean_name) => {
                let Some(factory_class) = self.get_type(factory_bean_name)? else {
                    return Ok(None);
                };
                factory_class
                    .methods_named(method_name)
                    .map(|m| Arc::clone(m.return_type()))
                    .collect()
            }
            None => {
                let Some(class) = self.resolve_bean_class(bean_name, mbd)? else {
                    return Ok(None);
                };
                class
                    .factory_methods_named(method_name)
                    .map(|m| Arc::clone(m.return_type()))
                    .collect()
            }
        };
        let mut iter = return_types.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        if iter.all(|t| t.name() == first.name()) {
            Ok(Some(first))
        } else {
            Ok(None)
        }
    }

    /// FactoryBean 产品的类型，未声明时仅在允许提前初始化时创建产品来确定
    fn factory_product_type(
        &self,
        bean_name: &str,
        factory: &FactoryBeanInfo,
        allow_eager_init: bool,
    ) -> Option<Arc<ClassInfo>> {
        if let Some(object_type) = factory.object_type() {
            return Some(Arc::clone(object_type));
        }
        if !allow_eager_init {
            return None;
        }
        match self.get_bean(bean_name) {
            Ok(product) => Some(Arc::clone(product.class())),
            Err(e) => {
                tracing::trace!("FactoryBean '{}' could not provide its object type: {}", bean_name, e);
                None
            }
        }
    }

    /// 返回匹配的名称：FactoryBean 产品匹配为 `name`，工厂本身匹配为 `&name`
    fn match_bean_type(
        &self,
        bean_name: &str,
        bean_type: &ClassInfo,
        singleton: bool,
        class: &ClassInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> Option<String> {
        let scope_ok = include_non_singletons || singleton;
        let Some(factory) = bean_type.factory_bean() else {
            return (scope_ok && class.is_assignable_from(bean_type)).then(|| bean_name.to_string());
        };

        if include_non_singletons || (singleton && factory.is_singleton()) {
            let product_matches = self
                .factory_product_type(bean_name, factory, allow_eager_init)
                .is_some_and(|product_type| class.is_assignable_from(&product_type));
            if product_matches {
                return Some(bean_name.to_string());
            }
        }
        (scope_ok && class.is_assignable_from(bean_type))
            .then(|| format!("{}{}", FACTORY_BEAN_PREFIX, bean_name))
    }

    /// 没有 Bean 定义的手动单例不是 primary；合并定义失败时返回错误
    fn is_primary(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if !self.has_bean_definition(&bean_name) {
            return Ok(false);
        }
        Ok(self.merged_bean_definition(&bean_name)?.is_primary())
    }

    fn is_autowire_candidate(&self, bean_name: &str) -> BeansResult<bool> {
        if !self.has_bean_definition(bean_name) {
            return Ok(true);
        }
        Ok(self.merged_bean_definition(bean_name)?.is_autowire_candidate())
    }

    fn find_autowire_candidates(&self, required: &ClassInfo, requesting_bean: &str) -> BeansResult<Vec<String>> {
        let names = self.get_bean_names_for_type(required, true, true)?;
        let mut candidates = Vec::with_capacity(names.len());
        for candidate in names {
            let candidate_name = self.transformed_bean_name(&candidate);
            if candidate_name != requesting_bean && self.is_autowire_candidate(&candidate_name)? {
                candidates.push(candidate);
            }
        }
        Ok(candidates)
    }

    /// 唯一候选直接返回，多个候选时取唯一的 primary
    fn determine_unique_candidate(&self, required: &ClassInfo, mut candidates: Vec<String>) -> BeansResult<String> {
        match candidates.len() {
            0 => Err(BeansError::NoSuchBeanOfType {
                type_name: required.name().to_string(),
            }),
            1 => Ok(candidates.swap_remove(0)),
            _ => {
                let mut primaries = Vec::new();
                for candidate in &candidates {
                    if self.is_primary(candidate)? {
                        primaries.push(candidate.clone());
                    }
                }
                if primaries.len() == 1 {
                    return Ok(primaries.swap_remove(0));
                }
                Err(BeansError::NoUniqueBeanDefinition {
                    type_name: required.name().to_string(),
                    candidates,
                })
            }
        }
    }

    fn pre_instantiate(&self, bean_name: &str) -> BeansResult<()> {
        let mbd = self.merged_bean_definition(bean_name)?;
        if mbd.is_abstract() || !mbd.is_singleton() || mbd.is_lazy_init() {
            return Ok(());
        }
        if self.is_factory_bean(bean_name)? {
            self.get_bean(&format!("{}{}", FACTORY_BEAN_PREFIX, bean_name))?;
        } else {
            self.get_bean(bean_name)?;
        }
        Ok(())
    }
}

impl AutowireCandidateResolver for DefaultListableBeanFactory {
    fn resolve_autowired_argument(
        &self,
        required: &Arc<ClassInfo>,
        requesting_bean: &str,
    ) -> BeansResult<(String, Value)> {
        let candidates = self.find_autowire_candidates(required, requesting_bean)?;
        let candidate = self.determine_unique_candidate(required, candidates)?;
        let bean = self.get_bean(&candidate)?;
        Ok((self.transformed_bean_name(&candidate), Value::from_instance(bean)))
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> BeansResult<BeanInstance> {
        self.do_get_bean(name, None)
    }

    fn get_bean_with_args(&self, name: &str, args: Vec<Value>) -> BeansResult<BeanInstance> {
        self.do_get_bean(name, Some(&args))
    }

    fn contains_bean(&self, name: &str) -> bool {
        let bean_name = self.transformed_bean_name(name);
        if self.singletons.contains_singleton(&bean_name) || self.has_bean_definition(&bean_name) {
            return !is_factory_dereference(name) || self.is_factory_bean(name).unwrap_or(false);
        }
        self.parent()
            .is_some_and(|parent| parent.contains_bean(&Self::original_bean_name(name, &bean_name)))
    }

    fn is_singleton(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if let Some(instance) = self.singletons.get_singleton(&bean_name) {
            return Ok(match instance.class().factory_bean() {
                Some(factory) if !is_factory_dereference(name) => factory.is_singleton(),
                _ => true,
            });
        }
        if !self.has_bean_definition(&bean_name) {
            if let Some(parent) = self.parent() {
                return parent.is_singleton(&Self::original_bean_name(name, &bean_name));
            }
        }

        let mbd = self.merged_bean_definition(&bean_name)?;
        if !mbd.is_singleton() {
            return Ok(false);
        }
        if is_factory_dereference(name) {
            return Ok(true);
        }
        let product_singleton = self
            .predict_bean_type(&bean_name, &mbd)?
            .and_then(|bean_type| bean_type.factory_bean().map(FactoryBeanInfo::is_singleton));
        Ok(product_singleton.unwrap_or(true))
    }

    fn is_prototype(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if !self.has_bean_definition(&bean_name) {
            if self.singletons.contains_singleton(&bean_name) {
                return Ok(false);
            }
            if let Some(parent) = self.parent() {
                return parent.is_prototype(&Self::original_bean_name(name, &bean_name));
            }
        }

        let mbd = self.merged_bean_definition(&bean_name)?;
        if mbd.is_prototype() {
            return Ok(!is_factory_dereference(name) || self.is_factory_bean(&bean_name)?);
        }
        if is_factory_dereference(name) {
            return Ok(false);
        }
        let product_singleton = self
            .predict_bean_type(&bean_name, &mbd)?
            .and_then(|bean_type| bean_type.factory_bean().map(FactoryBeanInfo::is_singleton));
        Ok(product_singleton == Some(false))
    }

    fn get_type(&self, name: &str) -> BeansResult<Option<Arc<ClassInfo>>> {
        let bean_name = self.transformed_bean_name(name);
        let bean_type = match self.singletons.get_singleton(&bean_name) {
            Some(instance) => Some(Arc::clone(instance.class())),
            None => {
                if !self.has_bean_definition(&bean_name) {
                    if let Some(parent) = self.parent() {
                        return parent.get_type(&Self::original_bean_name(name, &bean_name));
                    }
                }
                let mbd = self.merged_bean_definition(&bean_name)?;
                self.predict_bean_type(&bean_name, &mbd)?
            }
        };

        let Some(bean_type) = bean_type else {
            return Ok(None);
        };
        match bean_type.factory_bean() {
            Some(factory) if !is_factory_dereference(name) => {
                Ok(self.factory_product_type(&bean_name, factory, false))
            }
            None if is_factory_dereference(name) => Ok(None),
            _ => Ok(Some(Arc::clone(&bean_type))),
        }
    }

    fn get_aliases(&self, name: &str) -> Vec<String> {
        let prefix = if is_factory_dereference(name) { FACTORY_BEAN_PREFIX } else { "" };
        let bare = strip_factory_prefix(name);
        let canonical = self.resolve_alias(bare);
        let alias_names: Vec<String> = self.aliases.read().keys().cloned().collect();

        let mut result: Vec<String> = alias_names
            .into_iter()
            .filter(|alias| alias != bare && self.resolve_alias(alias) == canonical)
            .map(|alias| format!("{}{}", prefix, alias))
            .collect();
        if canonical != bare {
            result.push(format!("{}{}", prefix, canonical));
        }
        result.sort();
        result
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn contains_bean_definition(&self, name: &str) -> bool {
        self.has_bean_definition(name)
    }

    fn get_bean_definition_count(&self) -> usize {
        self.bean_definitions.read().len()
    }

    fn get_bean_definition_names(&self) -> Vec<String> {
        self.bean_definition_names.read().clone()
    }

    fn get_bean_names_for_type(
        &self,
        class: &ClassInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> BeansResult<Vec<String>> {
        let allow_eager_class_loading = self.config.read().allow_eager_class_loading;
        let mut result = Vec::new();

        for bean_name in self.get_bean_definition_names() {
            let mbd = match self.merged_bean_definition(&bean_name) {
                Ok(mbd) => mbd,
                Err(e) if !allow_eager_init => {
                    tracing::trace!("Ignoring bean definition '{}' during type matching: {}", bean_name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if mbd.is_abstract() {
                continue;
            }
            let instance = self.singletons.get_singleton(&bean_name);
            if instance.is_none()
                && mbd.is_lazy_init()
                && !allow_eager_class_loading
                && mbd.resolved_class().is_none()
            {
                continue;
            }

            let bean_type = match instance {
                Some(instance) => Some(Arc::clone(instance.class())),
                None => match self.predict_bean_type(&bean_name, &mbd) {
                    Ok(bean_type) => bean_type,
                    Err(e) if !allow_eager_init => {
                        tracing::trace!("Ignoring bean class loading failure for bean '{}': {}", bean_name, e);
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };
            let Some(bean_type) = bean_type else {
                continue;
            };
            if let Some(matched) = self.match_bean_type(
                &bean_name,
                &bean_type,
                mbd.is_singleton(),
                class,
                include_non_singletons,
                allow_eager_init,
            ) {
                result.push(matched);
            }
        }

        // 手动注册的单例
        for bean_name in self.singletons.singleton_names() {
            if self.has_bean_definition(&bean_name) {
                continue;
            }
            let Some(instance) = self.singletons.get_singleton(&bean_name) else {
                continue;
            };
            if let Some(matched) = self.match_bean_type(
                &bean_name,
                instance.class(),
                true,
                class,
                include_non_singletons,
                allow_eager_init,
            ) {
                result.push(matched);
            }
        }

        Ok(result)
    }

    fn get_beans_of_type(
        &self,
        class: &ClassInfo,
        include_non_singletons: bool,
        allow_eager_init: bool,
    ) -> BeansResult<Vec<(String, BeanInstance)>> {
        let names = self.get_bean_names_for_type(class, include_non_singletons, allow_eager_init)?;
        let mut result = Vec::with_capacity(names.len());
        for name in names {
            match self.get_bean(&name) {
                Ok(bean) => result.push((name, bean)),
                Err(e) => match e.currently_in_creation_bean() {
                    Some(in_creation) if self.is_currently_in_creation(in_creation) => {
                        tracing::debug!(
                            "Ignoring match to currently created bean '{}': {}",
                            in_creation,
                            e
                        );
                    }
                    _ => return Err(e),
                },
            }
        }
        Ok(result)
    }

    fn get_bean_of_type(&self, class: &ClassInfo) -> BeansResult<BeanInstance> {
        let candidates = self.get_bean_names_for_type(class, true, true)?;
        let candidate = self.determine_unique_candidate(class, candidates)?;
        self.get_bean(&candidate)
    }
}

impl BeanDefinitionRegistry for DefaultListableBeanFactory {
    fn register_bean_definition(&self, name: &str, definition: BeanDefinition) -> BeansResult<()> {
        self.check_frozen(|| format!("register bean definition '{}'", name))?;
        if name.is_empty() || is_factory_dereference(name) {
            return Err(BeansError::InvalidBeanDefinition {
                name: name.to_string(),
                message: format!("bean name must not be empty or start with '{}'", FACTORY_BEAN_PREFIX),
            });
        }
        definition.validate(name)?;

        let allow_overriding = self.config.read().allow_bean_definition_overriding;
        // 检查、插入和名称登记在同一把写锁内完成，并发注册同名定义时只有一个成功
        let replaced = {
            let mut definitions = self.bean_definitions.write();
            match definitions.get(name) {
                Some(existing) => {
                    if !allow_overriding {
                        return Err(BeansError::BeanDefinitionOverride {
                            name: name.to_string(),
                        });
                    }
                    if *existing != definition {
                        tracing::warn!("Overriding bean definition for bean '{}' with a different definition", name);
                    } else {
                        tracing::debug!("Overriding bean definition for bean '{}' with an equivalent definition", name);
                    }
                }
                None => {
                    let mut aliases = self.aliases.write();
                    if let Some(target) = aliases.get(name) {
                        if !allow_overriding {
                            return Err(BeansError::BeanDefinitionOverride {
                                name: name.to_string(),
                            });
                        }
                        tracing::debug!(
                            "Removing alias '{}' for bean '{}' due to registration of bean definition",
                            name,
                            target
                        );
                        aliases.remove(name);
                    }
                }
            }
            let replaced = definitions.insert(name.to_string(), definition).is_some();
            if !replaced {
                self.bean_definition_names.write().push(name.to_string());
            }
            replaced
        };
        if replaced || self.singletons.contains_singleton(name) {
            self.reset_bean_definition(name, &mut HashSet::new());
        }

        tracing::debug!("Bean definition registered successfully: '{}'", name);
        Ok(())
    }

    fn remove_bean_definition(&self, name: &str) -> BeansResult<()> {
        self.check_frozen(|| format!("remove bean definition '{}'", name))?;
        {
            let mut definitions = self.bean_definitions.write();
            if definitions.remove(name).is_none() {
                return Err(BeansError::NoSuchBeanDefinition(name.to_string()));
            }
            self.bean_definition_names.write().retain(|n| n != name);
        }
        self.reset_bean_definition(name, &mut HashSet::new());
        tracing::debug!("Bean definition removed: '{}'", name);
        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> BeansResult<BeanDefinition> {
        let bean_name = self.resolve_alias(name);
        let definition = self.bean_definitions.read().get(&bean_name).cloned();
        definition.ok_or(BeansError::NoSuchBeanDefinition(bean_name))
    }

    fn is_bean_name_in_use(&self, name: &str) -> bool {
        self.is_alias(name) || self.has_bean_definition(name)
    }

    fn register_alias(&self, name: &str, alias: &str) -> BeansResult<()> {
        let illegal = |message: String| BeansError::IllegalAlias {
            alias: alias.to_string(),
            name: name.to_string(),
            message,
        };
        if name.is_empty() || alias.is_empty() {
            return Err(illegal("name and alias must not be empty".to_string()));
        }
        if alias == name {
            self.aliases.write().remove(alias);
            tracing::debug!("Alias definition '{}' ignored since it points to same name", alias);
            return Ok(());
        }

        let existing = self.aliases.read().get(alias).cloned();
        if let Some(existing) = existing {
            if existing == name {
                return Ok(());
            }
            if !self.config.read().allow_bean_definition_overriding {
                return Err(illegal(format!("it is already registered for name '{}'", existing)));
            }
            tracing::debug!(
                "Overriding alias '{}' definition for registered name '{}' with new target name '{}'",
                alias,
                existing,
                name
            );
        }
        if self.alias_resolves_through(name, alias) {
            return Err(illegal(format!(
                "Circular reference - '{}' is a direct or indirect alias for '{}' already",
                name, alias
            )));
        }

        self.aliases.write().insert(alias.to_string(), name.to_string());
        tracing::debug!("Alias definition '{}' registered for name '{}'", alias, name);
        Ok(())
    }

    fn remove_alias(&self, alias: &str) -> BeansResult<()> {
        match self.aliases.write().remove(alias) {
            Some(_) => Ok(()),
            None => Err(BeansError::IllegalState(format!("No alias '{}' registered", alias))),
        }
    }

    fn is_alias(&self, name: &str) -> bool {
        self.aliases.read().contains_key(name)
    }

    fn canonical_name(&self, name: &str) -> String {
        self.resolve_alias(name)
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn set_parent_bean_factory(&self, parent: Arc<dyn BeanFactory>) -> BeansResult<()> {
        let mut current = self.parent.write();
        if current.is_some() {
            return Err(BeansError::IllegalState(
                "Already associated with parent BeanFactory".to_string(),
            ));
        }
        *current = Some(parent);
        Ok(())
    }

    fn get_parent_bean_factory(&self) -> Option<Arc<dyn BeanFactory>> {
        self.parent()
    }

    fn set_type_converter(&self, converter: Arc<dyn TypeConverter>) {
        *self.type_converter.write() = converter;
    }

    fn get_type_converter(&self) -> Arc<dyn TypeConverter> {
        Arc::clone(&self.type_converter.read())
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        let mut processors = self.bean_post_processors.write();
        processors.retain(|p| !Arc::ptr_eq(p, &processor));
        tracing::debug!(
            "Adding BeanPostProcessor '{}' with order {}",
            processor.name(),
            processor.order()
        );
        processors.push(processor);
        sort_post_processors(&mut processors);
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }

    fn register_scope(&self, name: &str, scope: Arc<dyn CustomScope>) -> BeansResult<()> {
        if name == SCOPE_SINGLETON || name == SCOPE_PROTOTYPE {
            return Err(BeansError::IllegalState(format!(
                "Cannot replace existing scopes 'singleton' and 'prototype' (got '{}')",
                name
            )));
        }
        if self.scopes.write().insert(name.to_string(), scope).is_some() {
            tracing::debug!("Replacing scope '{}'", name);
        } else {
            tracing::debug!("Registered scope '{}'", name);
        }
        Ok(())
    }

    fn get_registered_scope(&self, name: &str) -> Option<Arc<dyn CustomScope>> {
        self.scopes.read().get(name).cloned()
    }

    fn register_singleton(&self, name: &str, instance: BeanInstance) -> BeansResult<()> {
        self.singletons.register_singleton(name, instance)
    }

    fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.contains_singleton(name)
    }

    fn get_merged_bean_definition(&self, name: &str) -> BeansResult<Arc<RootBeanDefinition>> {
        self.merged_bean_definition(name)
    }

    fn is_factory_bean(&self, name: &str) -> BeansResult<bool> {
        let bean_name = self.transformed_bean_name(name);
        if let Some(instance) = self.singletons.get_singleton(&bean_name) {
            return Ok(instance.class().factory_bean().is_some());
        }
        let mbd = self.merged_bean_definition(&bean_name)?;
        Ok(self
            .predict_bean_type(&bean_name, &mbd)?
            .is_some_and(|bean_type| bean_type.factory_bean().is_some()))
    }

    fn is_currently_in_creation(&self, name: &str) -> bool {
        self.singletons
            .is_currently_in_creation(&self.transformed_bean_name(name))
    }

    fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        self.singletons
            .register_dependent_bean(&self.transformed_bean_name(bean), dependent);
    }

    fn get_dependent_beans(&self, name: &str) -> Vec<String> {
        self.singletons.get_dependent_beans(&self.transformed_bean_name(name))
    }

    fn get_dependencies_for_bean(&self, name: &str) -> Vec<String> {
        self.singletons
            .get_dependencies_for_bean(&self.transformed_bean_name(name))
    }

    fn destroy_bean(&self, name: &str, instance: BeanInstance) -> BeansResult<()> {
        let mbd = self.merged_bean_definition(name)?;
        DisposableBean::new(instance, mbd.destroy_method_name().map(str::to_string))
            .destroy()
            .map_err(|source| BeansError::CallbackFailed {
                name: name.to_string(),
                phase: "Destroy".to_string(),
                source,
            })
    }

    fn destroy_scoped_bean(&self, name: &str) -> BeansResult<()> {
        let bean_name = self.transformed_bean_name(name);
        let mbd = self.merged_bean_definition(&bean_name)?;
        if mbd.is_singleton() || mbd.is_prototype() {
            return Err(BeansError::IllegalState(format!(
                "Bean name '{}' does not correspond to an object in a mutable scope",
                bean_name
            )));
        }
        let scope_name = mbd.scope().name();
        let scope = self
            .get_registered_scope(scope_name)
            .ok_or_else(|| BeansError::IllegalScope {
                name: bean_name.clone(),
                scope: scope_name.to_string(),
            })?;
        if scope.remove(&bean_name).is_some() {
            tracing::debug!("Destroyed scoped bean '{}' in scope '{}'", bean_name, scope_name);
        }
        Ok(())
    }

    fn destroy_singleton(&self, name: &str) {
        let bean_name = self.transformed_bean_name(name);
        self.destroy_singleton_internal(&bean_name);
    }

    fn destroy_singletons(&self) {
        tracing::info!("Destroying singleton beans");
        self.singletons.destroy_singletons();
        self.factory_bean_objects.write().clear();
        tracing::info!("Singleton beans destruction completed");
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn pre_instantiate_singletons(&self) -> BeansResult<()> {
        let bean_names = self.get_bean_definition_names();
        tracing::debug!("Pre-instantiating singletons in {} bean definitions", bean_names.len());
        let existing: HashSet<String> = self.singletons.singleton_names().into_iter().collect();

        if let Err(e) = bean_names.iter().try_for_each(|name| self.pre_instantiate(name)) {
            tracing::warn!(
                "Exception encountered during singleton pre-instantiation - cancelling: {}",
                e
            );
            let created: Vec<String> = self
                .singletons
                .singleton_names()
                .into_iter()
                .filter(|name| !existing.contains(name))
                .collect();
            for name in created.iter().rev() {
                self.destroy_singleton_internal(name);
            }
            return Err(e);
        }
        Ok(())
    }

    fn freeze_configuration(&self) {
        self.configuration_frozen.store(true, Ordering::SeqCst);
        tracing::debug!("Bean factory configuration frozen");
    }

    fn is_configuration_frozen(&self) -> bool {
        self.configuration_frozen.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::types;
    use crate::fixtures::{self, EventLog, Greeter, JdbcRepository, UserService};
    use crate::scope::{Scope, ThreadScope};
    use parking_lot::Mutex;
    use std::sync::{Barrier, Weak};
    use std::thread;

    fn factory() -> DefaultListableBeanFactory {
        let factory = DefaultListableBeanFactory::new();
        factory.register_class(fixtures::greeter_class());
        factory.register_class(fixtures::node_class());
        factory.register_class(fixtures::user_service_class());
        factory.register_class(fixtures::greeter_maker_class());
        factory.register_class(fixtures::greeter_factory_class());
        factory
    }

    fn factory_with_repository(log: &EventLog) -> DefaultListableBeanFactory {
        let factory = factory();
        factory.register_class(fixtures::jdbc_repository_class(Arc::clone(log)));
        factory
    }

    fn repository(table: &str) -> BeanDefinition {
        BeanDefinition::for_class_name("JdbcRepository").with_property("table", table)
    }

    fn greet(bean: &BeanInstance) -> Value {
        bean.invoke("greet", ()).unwrap()
    }

    #[test]
    fn test_definition_round_trip() {
        let factory = factory();
        let definition = BeanDefinition::for_class_name("Greeter")
            .with_scope(Scope::Prototype)
            .with_lazy(true)
            .with_arg("Hello")
            .with_typed_arg("3", "i64")
            .with_property("suffix", "!")
            .with_depends_on(["other"])
            .with_description("greets people");
        factory.register_bean_definition("greeter", definition.clone()).unwrap();

        assert_eq!(factory.get_bean_definition("greeter").unwrap(), definition);
        assert!(factory.contains_bean_definition("greeter"));
        assert_eq!(factory.get_bean_definition_names(), vec!["greeter".to_string()]);
        assert_eq!(factory.get_bean_definition_count(), 1);
        assert!(matches!(
            factory.get_bean_definition("missing"),
            Err(BeansError::NoSuchBeanDefinition(_))
        ));
    }

    #[test]
    fn test_singleton_and_prototype_identity() {
        let factory = factory();
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("Hello"))
            .unwrap();
        factory
            .register_bean_definition(
                "proto",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("Hey")
                    .with_scope(Scope::Prototype),
            )
            .unwrap();

        let a = factory.get_bean("greeter").unwrap();
        let b = factory.get_bean("greeter").unwrap();
        assert!(a.ptr_eq(&b));
        assert_eq!(greet(&a), Value::from("Hello"));

        let p1 = factory.get_bean("proto").unwrap();
        let p2 = factory.get_bean("proto").unwrap();
        assert!(!p1.ptr_eq(&p2));
        assert!(factory.is_singleton("greeter").unwrap());
        assert!(factory.is_prototype("proto").unwrap());
        assert!(!factory.contains_singleton("proto"));
    }

    #[test]
    fn test_concurrent_singleton_creation_happens_once() {
        let created = Arc::new(AtomicUsize::new(0));
        let factory = Arc::new(DefaultListableBeanFactory::new());
        factory
            .register_bean_definition(
                "counted",
                BeanDefinition::for_class(&fixtures::counted_class(Arc::clone(&created))),
            )
            .unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = Arc::clone(&factory);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    factory.get_bean("counted").unwrap()
                })
            })
            .collect();
        let beans: Vec<BeanInstance> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(beans.iter().all(|b| b.ptr_eq(&beans[0])));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_constructor_cycle_is_reported() {
        let factory = factory();
        factory
            .register_bean_definition("a", BeanDefinition::for_class_name("Node").with_arg(BeanValue::reference("b")))
            .unwrap();
        factory
            .register_bean_definition("b", BeanDefinition::for_class_name("Node").with_arg(BeanValue::reference("a")))
            .unwrap();

        let err = factory.get_bean("a").unwrap_err();
        assert!(err.is_currently_in_creation());
        assert_eq!(err.currently_in_creation_bean(), Some("a"));
        match err.most_specific_cause() {
            BeansError::BeanCurrentlyInCreation { chain, .. } => assert_eq!(chain, "a -> b -> a"),
            other => panic!("unexpected cause: {}", other),
        }
        assert!(!factory.contains_singleton("a"));
        assert!(!factory.contains_singleton("b"));
        assert!(!factory.is_currently_in_creation("a"));
    }

    #[test]
    fn test_setter_cycle_is_an_error() {
        let factory = factory();
        factory
            .register_bean_definition(
                "a",
                BeanDefinition::for_class_name("Node").with_property("peer", BeanValue::reference("b")),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "b",
                BeanDefinition::for_class_name("Node").with_property("peer", BeanValue::reference("a")),
            )
            .unwrap();

        let err = factory.get_bean("a").unwrap_err();
        assert!(err.is_currently_in_creation());
        assert!(!factory.contains_singleton("a"));
    }

    #[test]
    fn test_depends_on_creates_dependency_first() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repo", repository("users")).unwrap();
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService")
                    .with_depends_on(["repo"])
                    .with_property("name", "svc"),
            )
            .unwrap();

        factory.get_bean("service").unwrap();
        assert!(factory.contains_singleton("repo"));
        assert_eq!(factory.get_dependent_beans("repo"), vec!["service".to_string()]);

        factory.destroy_singletons();
        assert_eq!(*log.lock(), vec!["init:users".to_string(), "destroy:users".to_string()]);
    }

    #[test]
    fn test_destroy_singleton_destroys_dependents_first() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("users", repository("users")).unwrap();
        factory
            .register_bean_definition("audit", repository("audit").with_depends_on(["users"]))
            .unwrap();
        factory.register_bean_definition("orders", repository("orders")).unwrap();
        factory.register_alias("users", "people").unwrap();
        factory.pre_instantiate_singletons().unwrap();

        factory.destroy_singleton("people");
        assert!(!factory.contains_singleton("users"));
        assert!(!factory.contains_singleton("audit"));
        assert!(factory.contains_singleton("orders"));
        assert_eq!(
            log.lock()[3..].to_vec(),
            vec!["destroy:audit".to_string(), "destroy:users".to_string()]
        );
    }

    #[test]
    fn test_circular_depends_on_fails() {
        let factory = factory();
        factory
            .register_bean_definition(
                "x",
                BeanDefinition::for_class_name("Greeter").with_arg("x").with_depends_on(["y"]),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "y",
                BeanDefinition::for_class_name("Greeter").with_arg("y").with_depends_on(["x"]),
            )
            .unwrap();

        let err = factory.get_bean("x").unwrap_err();
        assert!(err
            .most_specific_cause()
            .to_string()
            .contains("Circular depends-on relationship"));
    }

    #[test]
    fn test_property_references_and_conversion() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repo", repository("users")).unwrap();
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService")
                    .with_property("repository", BeanValue::reference("repo"))
                    .with_property("name", "users-service"),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "greeter",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("Hi")
                    .with_property("times", BeanValue::untyped("5")),
            )
            .unwrap();

        let service = factory.get_bean("service").unwrap();
        assert_eq!(
            service.invoke("findUser", vec![Value::from("7")]).unwrap(),
            Value::from("users#7")
        );
        assert_eq!(factory.get_bean_typed::<UserService>("service").unwrap().name, "users-service");
        assert_eq!(factory.get_bean_typed::<Greeter>("greeter").unwrap().times, 5);
        assert!(log.lock().contains(&"init:users".to_string()));
        assert_eq!(factory.get_dependent_beans("repo"), vec!["service".to_string()]);
    }

    #[test]
    fn test_unknown_property_is_invalid() {
        let factory = factory();
        factory
            .register_bean_definition(
                "greeter",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("Hi")
                    .with_property("volume", "loud"),
            )
            .unwrap();

        let err = factory.get_bean("greeter").unwrap_err();
        assert!(matches!(err, BeansError::InvalidProperty { ref property, .. } if property == "volume"));
    }

    #[test]
    fn test_inner_bean() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService")
                    .with_property("repository", BeanValue::inner(repository("inner"))),
            )
            .unwrap();

        let service = factory.get_bean("service").unwrap();
        assert_eq!(
            service.invoke("findUser", vec![Value::from("1")]).unwrap(),
            Value::from("inner#1")
        );
        assert_eq!(factory.get_bean_definition_count(), 1);

        factory.destroy_singletons();
        assert!(log.lock().contains(&"destroy:inner".to_string()));
    }

    #[test]
    fn test_prototype_inner_beans_leave_no_dependencies() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService")
                    .with_scope(Scope::Prototype)
                    .with_property("repository", BeanValue::inner(repository("inner"))),
            )
            .unwrap();

        for _ in 0..3 {
            let service = factory.get_bean("service").unwrap();
            assert_eq!(
                service.invoke("findUser", vec![Value::from("1")]).unwrap(),
                Value::from("inner#1")
            );
        }
        assert!(factory.get_dependencies_for_bean("service").is_empty());
        assert_eq!(log.lock().iter().filter(|e| *e == "init:inner").count(), 3);
    }

    #[test]
    fn test_child_definition_inherits_from_parent() {
        let factory = factory();
        factory
            .register_bean_definition(
                "base",
                BeanDefinition::for_class_name("Greeter")
                    .with_abstract(true)
                    .with_arg("Hello")
                    .with_property("suffix", "!"),
            )
            .unwrap();
        factory
            .register_bean_definition("child", BeanDefinition::child_of("base").with_property("suffix", "?"))
            .unwrap();

        assert!(matches!(factory.get_bean("base"), Err(BeansError::BeanIsAbstract { .. })));
        assert_eq!(greet(&factory.get_bean("child").unwrap()), Value::from("Hello?"));
        let merged = factory.get_merged_bean_definition("child").unwrap();
        assert_eq!(merged.bean_class().map(|c| c.name().to_string()), Some("Greeter".to_string()));
    }

    #[test]
    fn test_circular_parent_relationship() {
        let factory = factory();
        factory.register_bean_definition("p1", BeanDefinition::child_of("p2")).unwrap();
        factory.register_bean_definition("p2", BeanDefinition::child_of("p1")).unwrap();

        let err = factory.get_bean("p1").unwrap_err();
        assert!(matches!(err, BeansError::InvalidBeanDefinition { ref message, .. }
            if message.contains("Circular parent relationship")));
    }

    #[test]
    fn test_overriding_replaces_definition_and_evicts_dependents() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repo", repository("old")).unwrap();
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService")
                    .with_property("repository", BeanValue::reference("repo")),
            )
            .unwrap();
        factory.get_bean("service").unwrap();

        factory.register_bean_definition("repo", repository("new")).unwrap();
        assert!(!factory.contains_singleton("repo"));
        assert!(!factory.contains_singleton("service"));
        assert!(log.lock().contains(&"destroy:old".to_string()));

        let service = factory.get_bean("service").unwrap();
        assert_eq!(
            service.invoke("findUser", vec![Value::from("2")]).unwrap(),
            Value::from("new#2")
        );
        assert_eq!(factory.get_bean_definition_names(), vec!["repo".to_string(), "service".to_string()]);
    }

    #[test]
    fn test_overriding_disabled() {
        let factory = DefaultListableBeanFactory::with_config(
            FactoryConfig::new().allow_bean_definition_overriding(false),
        );
        factory.register_class(fixtures::greeter_class());
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("a"))
            .unwrap();

        let err = factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("b"))
            .unwrap_err();
        assert!(matches!(err, BeansError::BeanDefinitionOverride { .. }));
    }

    #[test]
    fn test_concurrent_registration_of_same_name() {
        let factory = Arc::new(DefaultListableBeanFactory::with_config(
            FactoryConfig::new().allow_bean_definition_overriding(false),
        ));
        factory.register_class(fixtures::greeter_class());

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["a", "b"]
            .into_iter()
            .map(|greeting| {
                let factory = Arc::clone(&factory);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    factory.register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg(greeting))
                })
            })
            .collect();
        let results: Vec<BeansResult<()>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(BeansError::BeanDefinitionOverride { .. }))));
        assert_eq!(factory.get_bean_definition_names(), vec!["greeter".to_string()]);
        assert_eq!(factory.get_bean_definition_count(), 1);
    }

    #[test]
    fn test_failed_bean_recovers_after_reregistration() {
        let factory = factory();
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("MissingGreeter"))
            .unwrap();

        let err = factory.get_bean("greeter").unwrap_err();
        assert!(matches!(err, BeansError::ClassNotFound { .. }));
        assert!(!factory.contains_singleton("greeter"));
        assert!(!factory.is_currently_in_creation("greeter"));

        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("Recovered"))
            .unwrap();
        let bean = factory.get_bean("greeter").unwrap();
        assert_eq!(greet(&bean), Value::from("Recovered"));
        assert!(factory.get_bean("greeter").unwrap().ptr_eq(&bean));
        assert_eq!(factory.get_bean_definition_names(), vec!["greeter".to_string()]);
    }

    #[test]
    fn test_aliases() {
        let factory = factory();
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("Hi"))
            .unwrap();
        factory.register_alias("greeter", "hello").unwrap();
        factory.register_alias("hello", "hi").unwrap();

        let bean = factory.get_bean("hi").unwrap();
        assert!(bean.ptr_eq(&factory.get_bean("greeter").unwrap()));
        assert_eq!(factory.canonical_name("hi"), "greeter");
        assert_eq!(factory.get_aliases("greeter"), vec!["hello".to_string(), "hi".to_string()]);
        assert!(factory.is_bean_name_in_use("hello"));

        let err = factory.register_alias("hi", "greeter").unwrap_err();
        assert!(matches!(err, BeansError::IllegalAlias { .. }));

        factory.remove_alias("hi").unwrap();
        assert!(!factory.is_alias("hi"));
        assert!(!factory.contains_bean("hi"));
    }

    #[test]
    fn test_factory_bean_product_and_dereference() {
        let factory = factory();
        factory
            .register_bean_definition(
                "greeterFactory",
                BeanDefinition::for_class_name("GreeterFactory").with_property("greeting", "Howdy"),
            )
            .unwrap();
        factory
            .register_bean_definition("plain", BeanDefinition::for_class_name("Greeter").with_arg("Hi"))
            .unwrap();

        let product = factory.get_bean("greeterFactory").unwrap();
        assert_eq!(product.class_name(), "Greeter");
        assert_eq!(greet(&product), Value::from("Howdy"));
        assert!(product.ptr_eq(&factory.get_bean("greeterFactory").unwrap()));

        let raw = factory.get_bean("&greeterFactory").unwrap();
        assert_eq!(raw.class_name(), "GreeterFactory");
        assert!(factory.is_factory_bean("greeterFactory").unwrap());
        assert!(matches!(factory.get_bean("&plain"), Err(BeansError::BeanIsNotAFactory(_))));

        assert_eq!(factory.get_type("greeterFactory").unwrap().unwrap().name(), "Greeter");
        assert_eq!(factory.get_type("&greeterFactory").unwrap().unwrap().name(), "GreeterFactory");

        let greeters = factory
            .get_bean_names_for_type(&fixtures::greeter_class(), true, false)
            .unwrap();
        assert_eq!(greeters, vec!["greeterFactory".to_string(), "plain".to_string()]);
        let factories = factory
            .get_bean_names_for_type(&fixtures::greeter_factory_class(), true, false)
            .unwrap();
        assert_eq!(factories, vec!["&greeterFactory".to_string()]);
    }

    #[test]
    fn test_factory_methods() {
        let factory = factory();
        factory
            .register_bean_definition("maker", BeanDefinition::for_class_name("GreeterMaker"))
            .unwrap();
        factory
            .register_bean_definition(
                "static",
                BeanDefinition::for_class_name("GreeterMaker").with_factory_method("defaultGreeter"),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "staticWithArg",
                BeanDefinition::for_class_name("GreeterMaker")
                    .with_factory_method("defaultGreeter")
                    .with_arg("Yo"),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "instance",
                BeanDefinition::new().with_factory_bean("maker", "create").with_arg("Hey"),
            )
            .unwrap();

        assert_eq!(greet(&factory.get_bean("static").unwrap()), Value::from("Hi"));
        assert_eq!(greet(&factory.get_bean("staticWithArg").unwrap()), Value::from("Yo"));
        assert_eq!(greet(&factory.get_bean("instance").unwrap()), Value::from("Hey"));
        assert_eq!(factory.get_bean_typed::<Greeter>("instance").unwrap().times, 2);

        assert_eq!(factory.get_type("static").unwrap().unwrap().name(), "Greeter");
        assert_eq!(factory.get_type("instance").unwrap().unwrap().name(), "Greeter");
        assert!(factory.get_dependent_beans("maker").contains(&"instance".to_string()));
    }

    #[test]
    fn test_constructor_autowiring_prefers_primary() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repoA", repository("a")).unwrap();
        factory
            .register_bean_definition("repoB", repository("b").with_primary(true))
            .unwrap();
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService").with_autowire(AutowireMode::Constructor),
            )
            .unwrap();

        let service = factory.get_bean("service").unwrap();
        assert_eq!(
            service.invoke("findUser", vec![Value::from("1")]).unwrap(),
            Value::from("b#1")
        );
        assert_eq!(factory.get_dependencies_for_bean("service"), vec!["repoB".to_string()]);
        assert!(factory
            .get_bean_of_type(&fixtures::repository_interface())
            .unwrap()
            .ptr_eq(&factory.get_bean("repoB").unwrap()));
    }

    #[test]
    fn test_candidate_checks_report_broken_definitions() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repoA", repository("a")).unwrap();
        factory
            .register_bean_definition("orphan", BeanDefinition::child_of("missing"))
            .unwrap();
        factory
            .register_singleton("manual", BeanInstance::new(fixtures::greeter_class(), Greeter::new("Manual", 1)))
            .unwrap();

        assert!(matches!(factory.is_primary("orphan"), Err(BeansError::InvalidBeanDefinition { .. })));
        assert!(matches!(
            factory.is_autowire_candidate("orphan"),
            Err(BeansError::InvalidBeanDefinition { .. })
        ));
        assert!(!factory.is_primary("repoA").unwrap());
        assert!(factory.is_autowire_candidate("repoA").unwrap());
        assert!(!factory.is_primary("manual").unwrap());
        assert!(factory.is_autowire_candidate("manual").unwrap());
    }

    #[test]
    fn test_ambiguous_constructor_autowiring_falls_back() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repoA", repository("a")).unwrap();
        factory.register_bean_definition("repoB", repository("b")).unwrap();
        factory
            .register_bean_definition(
                "service",
                BeanDefinition::for_class_name("UserService").with_autowire(AutowireMode::Constructor),
            )
            .unwrap();

        let service = factory.get_bean_typed::<UserService>("service").unwrap();
        assert!(service.repository.is_none());

        let err = factory
            .get_bean_of_type(&fixtures::repository_interface())
            .unwrap_err();
        assert!(matches!(err, BeansError::NoUniqueBeanDefinition { ref candidates, .. } if candidates.len() == 2));
    }

    #[test]
    fn test_autowire_properties_by_type_and_name() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repository", repository("t")).unwrap();
        factory
            .register_bean_definition(
                "byType",
                BeanDefinition::for_class_name("UserService").with_autowire(AutowireMode::ByType),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "byName",
                BeanDefinition::for_class_name("UserService").with_autowire(AutowireMode::ByName),
            )
            .unwrap();

        for name in ["byType", "byName"] {
            let service = factory.get_bean_typed::<UserService>(name).unwrap();
            assert!(service.repository.is_some(), "{} was not autowired", name);
            assert!(service.name.is_empty());
        }
        let mut dependents = factory.get_dependent_beans("repository");
        dependents.sort();
        assert_eq!(dependents, vec!["byName".to_string(), "byType".to_string()]);
    }

    struct ScanningProcessor {
        factory: Weak<DefaultListableBeanFactory>,
        found: Mutex<Vec<String>>,
    }

    impl BeanPostProcessor for ScanningProcessor {
        fn post_process_after_initialization(&self, bean: BeanInstance, bean_name: &str) -> BeansResult<BeanInstance> {
            if bean_name == "service" {
                if let Some(factory) = self.factory.upgrade() {
                    let beans = factory.get_beans_of_type(&fixtures::repository_interface(), true, false)?;
                    self.found.lock().extend(beans.into_iter().map(|(name, _)| name));
                }
            }
            Ok(bean)
        }
    }

    #[test]
    fn test_get_beans_of_type_skips_beans_blocked_by_current_creation() {
        let log = fixtures::event_log();
        let factory = Arc::new(factory_with_repository(&log));
        factory
            .register_bean_definition("service", BeanDefinition::for_class_name("UserService"))
            .unwrap();
        factory.register_bean_definition("repo", repository("r")).unwrap();
        factory
            .register_bean_definition("needy", repository("n").with_depends_on(["service"]))
            .unwrap();

        let processor = Arc::new(ScanningProcessor {
            factory: Arc::downgrade(&factory),
            found: Mutex::new(Vec::new()),
        });
        factory.add_bean_post_processor(processor.clone());

        factory.get_bean("service").unwrap();
        assert_eq!(*processor.found.lock(), vec!["repo".to_string()]);
        assert!(factory.get_bean("needy").is_ok());
    }

    #[test]
    fn test_get_beans_of_type_propagates_other_errors() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory
            .register_bean_definition("broken", repository("b").with_init_method("missing"))
            .unwrap();

        let err = factory
            .get_beans_of_type(&fixtures::repository_interface(), true, false)
            .unwrap_err();
        assert!(matches!(err, BeansError::CallbackFailed { .. }));
    }

    #[test]
    fn test_lazy_definition_with_unknown_class() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory
            .register_bean_definition("ghost", BeanDefinition::for_class_name("NoSuchClass").with_lazy(true))
            .unwrap();
        factory.register_bean_definition("repo", repository("r")).unwrap();

        let names = factory
            .get_bean_names_for_type(&fixtures::repository_interface(), true, false)
            .unwrap();
        assert_eq!(names, vec!["repo".to_string()]);
        assert!(factory
            .get_bean_names_for_type(&fixtures::repository_interface(), true, true)
            .is_err());

        factory.pre_instantiate_singletons().unwrap();
        assert!(matches!(factory.get_bean("ghost"), Err(BeansError::ClassNotFound { .. })));
    }

    #[test]
    fn test_pre_instantiation_failure_destroys_created_singletons() {
        let log = fixtures::event_log();
        let factory = factory_with_repository(&log);
        factory.register_bean_definition("repo", repository("first")).unwrap();
        factory
            .register_bean_definition("lazy", repository("lazy").with_lazy(true))
            .unwrap();
        factory
            .register_bean_definition("broken", BeanDefinition::for_class_name("NoSuchClass"))
            .unwrap();

        let err = factory.pre_instantiate_singletons().unwrap_err();
        assert!(matches!(err, BeansError::ClassNotFound { .. }));
        assert!(!factory.contains_singleton("repo"));
        assert!(!factory.contains_singleton("lazy"));
        assert_eq!(*log.lock(), vec!["init:first".to_string(), "destroy:first".to_string()]);
    }

    #[test]
    fn test_thread_scope() {
        let log = fixtures::event_log();
        let factory = Arc::new(factory_with_repository(&log));
        factory.register_scope("thread", Arc::new(ThreadScope::new())).unwrap();
        factory
            .register_bean_definition(
                "perThread",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("x")
                    .with_scope(Scope::Custom("thread".to_string())),
            )
            .unwrap();
        factory
            .register_bean_definition(
                "scopedRepo",
                repository("scoped").with_scope(Scope::Custom("thread".to_string())),
            )
            .unwrap();

        let a = factory.get_bean("perThread").unwrap();
        assert!(a.ptr_eq(&factory.get_bean("perThread").unwrap()));
        let other = {
            let factory = Arc::clone(&factory);
            thread::spawn(move || factory.get_bean("perThread").unwrap())
                .join()
                .unwrap()
        };
        assert!(!a.ptr_eq(&other));

        factory.get_bean("scopedRepo").unwrap();
        factory.destroy_scoped_bean("scopedRepo").unwrap();
        assert!(log.lock().contains(&"destroy:scoped".to_string()));
        assert!(matches!(
            factory.destroy_scoped_bean("perThreadMissing"),
            Err(BeansError::NoSuchBeanDefinition(_))
        ));
    }

    #[test]
    fn test_unknown_and_reserved_scopes() {
        let factory = factory();
        factory
            .register_bean_definition(
                "session",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("x")
                    .with_scope(Scope::Custom("session".to_string())),
            )
            .unwrap();

        assert!(matches!(factory.get_bean("session"), Err(BeansError::IllegalScope { .. })));
        assert!(factory.register_scope("singleton", Arc::new(ThreadScope::new())).is_err());
    }

    #[test]
    fn test_frozen_configuration_rejects_changes() {
        let factory = factory();
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("x"))
            .unwrap();
        factory.freeze_configuration();

        assert!(factory.is_configuration_frozen());
        assert!(matches!(
            factory.register_bean_definition("other", BeanDefinition::for_class_name("Greeter").with_arg("y")),
            Err(BeansError::ConfigurationFrozen(_))
        ));
        assert!(matches!(
            factory.remove_bean_definition("greeter"),
            Err(BeansError::ConfigurationFrozen(_))
        ));
    }

    struct RecordingProcessor {
        label: &'static str,
        order: i32,
        log: EventLog,
    }

    impl BeanPostProcessor for RecordingProcessor {
        fn post_process_before_initialization(&self, bean: BeanInstance, bean_name: &str) -> BeansResult<BeanInstance> {
            self.log.lock().push(format!("{}:before:{}", self.label, bean_name));
            Ok(bean)
        }

        fn post_process_after_initialization(&self, bean: BeanInstance, bean_name: &str) -> BeansResult<BeanInstance> {
            self.log.lock().push(format!("{}:after:{}", self.label, bean_name));
            Ok(bean)
        }

        fn order(&self) -> i32 {
            self.order
        }
    }

    struct ReplacingProcessor;

    impl BeanPostProcessor for ReplacingProcessor {
        fn post_process_after_initialization(&self, _bean: BeanInstance, _bean_name: &str) -> BeansResult<BeanInstance> {
            Ok(BeanInstance::new(fixtures::greeter_class(), Greeter::new("Replaced", 1)))
        }
    }

    #[test]
    fn test_post_processors_run_in_order() {
        let log = fixtures::event_log();
        let factory = factory();
        factory.add_bean_post_processor(Arc::new(RecordingProcessor {
            label: "late",
            order: 2000,
            log: Arc::clone(&log),
        }));
        factory.add_bean_post_processor(Arc::new(RecordingProcessor {
            label: "early",
            order: 10,
            log: Arc::clone(&log),
        }));
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("x"))
            .unwrap();

        factory.get_bean("greeter").unwrap();
        assert_eq!(
            *log.lock(),
            vec![
                "early:before:greeter".to_string(),
                "late:before:greeter".to_string(),
                "early:after:greeter".to_string(),
                "late:after:greeter".to_string(),
            ]
        );
    }

    #[test]
    fn test_post_processor_can_replace_bean() {
        let factory = factory();
        factory.add_bean_post_processor(Arc::new(ReplacingProcessor));
        factory
            .register_bean_definition("greeter", BeanDefinition::for_class_name("Greeter").with_arg("Original"))
            .unwrap();

        let bean = factory.get_bean("greeter").unwrap();
        assert_eq!(greet(&bean), Value::from("Replaced"));
        assert!(bean.ptr_eq(&factory.get_bean("greeter").unwrap()));
    }

    #[test]
    fn test_parent_factory_fallback() {
        let parent = Arc::new(factory());
        parent
            .register_bean_definition("shared", BeanDefinition::for_class_name("Greeter").with_arg("FromParent"))
            .unwrap();
        let child = factory();
        child.set_parent_bean_factory(parent.clone()).unwrap();

        let bean = child.get_bean("shared").unwrap();
        assert_eq!(greet(&bean), Value::from("FromParent"));
        assert!(bean.ptr_eq(&parent.get_bean("shared").unwrap()));
        assert!(child.contains_bean("shared"));
        assert!(!child.contains_bean_definition("shared"));
        assert!(child.set_parent_bean_factory(parent).is_err());
    }

    #[test]
    fn test_explicit_arguments() {
        let factory = factory();
        factory
            .register_bean_definition(
                "proto",
                BeanDefinition::for_class_name("Greeter")
                    .with_arg("Default")
                    .with_scope(Scope::Prototype),
            )
            .unwrap();

        let bean = factory
            .get_bean_with_args("proto", vec![Value::from("Custom"), Value::Int(3)])
            .unwrap();
        let greeter = bean.downcast::<Greeter>().unwrap();
        assert_eq!(greeter.greeting, "Custom");
        assert_eq!(greeter.times, 3);
    }

    #[test]
    fn test_init_callback_on_shared_instance_fails() {
        let log = fixtures::event_log();
        let class = fixtures::jdbc_repository_class(log.clone());
        let shared = BeanInstance::new(
            Arc::clone(&class),
            JdbcRepository {
                table: "users".to_string(),
                initialized: false,
            },
        );
        let kept = shared.clone();
        let factory = factory();
        factory
            .register_bean_definition(
                "repo",
                BeanDefinition::from_supplier(&class, move || Ok(shared.clone())),
            )
            .unwrap();

        let err = factory.get_bean("repo").unwrap_err();
        assert!(err
            .most_specific_cause()
            .to_string()
            .contains("Cannot call init callback: bean instance is already shared"));
        assert!(log.lock().is_empty());
        assert!(!factory.contains_singleton("repo"));
        assert!(!kept.downcast_ref::<JdbcRepository>().unwrap().initialized);
    }

    #[test]
    fn test_manual_singleton_and_supplier() {
        let factory = factory();
        factory
            .register_singleton("manual", BeanInstance::new(fixtures::greeter_class(), Greeter::new("Manual", 1)))
            .unwrap();
        factory
            .register_bean_definition(
                "supplied",
                BeanDefinition::from_supplier(&fixtures::greeter_class(), || {
                    Ok(BeanInstance::new(fixtures::greeter_class(), Greeter::new("Supplied", 1)))
                })
                .with_property("suffix", "!"),
            )
            .unwrap();

        assert!(factory.contains_bean("manual"));
        assert_eq!(greet(&factory.get_bean("manual").unwrap()), Value::from("Manual"));
        assert_eq!(greet(&factory.get_bean("supplied").unwrap()), Value::from("Supplied!"));

        let names = factory
            .get_bean_names_for_type(&fixtures::greeter_class(), true, false)
            .unwrap();
        assert_eq!(names, vec!["supplied".to_string(), "manual".to_string()]);
        assert!(matches!(
            factory.get_bean_of_class("manual", &types::string()),
            Err(BeansError::BeanNotOfRequiredType { .. })
        ));
    }
}
