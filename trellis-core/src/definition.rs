//! Bean 定义与合并后的根定义

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::class::ClassInfo;
use crate::error::{BeansError, BeansResult};
use crate::scope::Scope;
use crate::value::{BeanInstance, Value};

/// 配置期的值（在创建 Bean 时才解析）
#[derive(Clone, Debug, PartialEq)]
pub enum BeanValue {
    Null,
    /// 已经是运行时值的字面量
    Literal(Value),
    /// 字符串形式的值，可选地声明目标类型
    TypedString {
        value: String,
        target_type: Option<String>,
    },
    /// 对其他 Bean 的引用
    Ref(String),
    /// 内部 Bean
    Inner(Box<BeanDefinition>),
    List(Vec<BeanValue>),
}

impl BeanValue {
    pub fn reference(name: impl Into<String>) -> Self {
        BeanValue::Ref(name.into())
    }

    pub fn typed(value: impl Into<String>, target_type: impl Into<String>) -> Self {
        BeanValue::TypedString {
            value: value.into(),
            target_type: Some(target_type.into()),
        }
    }

    pub fn untyped(value: impl Into<String>) -> Self {
        BeanValue::TypedString {
            value: value.into(),
            target_type: None,
        }
    }

    pub fn inner(definition: BeanDefinition) -> Self {
        BeanValue::Inner(Box::new(definition))
    }
}

impl From<Value> for BeanValue {
    fn from(value: Value) -> Self {
        BeanValue::Literal(value)
    }
}

macro_rules! literal_bean_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BeanValue {
                fn from(value: $ty) -> Self {
                    BeanValue::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_bean_value!(&str, String, i64, i32, f64, bool, BeanInstance);

/// 构造参数值，可选地声明参数类型名
#[derive(Clone, Debug, PartialEq)]
pub struct ValueHolder {
    pub value: BeanValue,
    pub type_name: Option<String>,
}

impl ValueHolder {
    pub fn new(value: impl Into<BeanValue>) -> Self {
        Self {
            value: value.into(),
            type_name: None,
        }
    }

    pub fn typed(value: impl Into<BeanValue>, type_name: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            type_name: Some(type_name.into()),
        }
    }
}

/// 构造参数：按位置的参数和不指定位置的通用参数
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstructorArgumentValues {
    indexed: BTreeMap<usize, ValueHolder>,
    generic: Vec<ValueHolder>,
}

impl ConstructorArgumentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_indexed(&mut self, index: usize, holder: ValueHolder) {
        self.indexed.insert(index, holder);
    }

    pub fn add_generic(&mut self, holder: ValueHolder) {
        self.generic.push(holder);
    }

    pub fn indexed(&self) -> &BTreeMap<usize, ValueHolder> {
        &self.indexed
    }

    pub fn generic(&self) -> &[ValueHolder] {
        &self.generic
    }

    pub fn get_indexed(&self, index: usize) -> Option<&ValueHolder> {
        self.indexed.get(&index)
    }

    pub fn argument_count(&self) -> usize {
        self.indexed.len() + self.generic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexed.is_empty() && self.generic.is_empty()
    }

    /// 合并子定义的参数：按位置覆盖，通用参数追加（去重）
    pub fn merge_from(&mut self, other: &ConstructorArgumentValues) {
        for (index, holder) in &other.indexed {
            self.indexed.insert(*index, holder.clone());
        }
        for holder in &other.generic {
            if !self.generic.contains(holder) {
                self.generic.push(holder.clone());
            }
        }
    }
}

/// 属性值（保持声明顺序，名称唯一）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyValues {
    values: Vec<(String, BeanValue)>,
}

impl PropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加属性，同名属性被替换
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<BeanValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&BeanValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BeanValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn merge_from(&mut self, other: &PropertyValues) {
        for (name, value) in &other.values {
            self.add(name.clone(), value.clone());
        }
    }
}

/// 自动装配模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutowireMode {
    #[default]
    No,
    ByName,
    ByType,
    Constructor,
}

/// Bean 的类：类名（延迟解析）或已解析的元数据
#[derive(Clone)]
pub enum BeanClass {
    Name(String),
    Resolved(Arc<ClassInfo>),
}

impl BeanClass {
    pub fn name(&self) -> &str {
        match self {
            BeanClass::Name(name) => name,
            BeanClass::Resolved(class) => class.name(),
        }
    }
}

impl fmt::Debug for BeanClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PartialEq for BeanClass {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

/// 实例供应函数
pub type InstanceSupplier = Arc<dyn Fn() -> anyhow::Result<BeanInstance> + Send + Sync>;

/// Bean 定义 - 描述如何创建和管理 Bean
///
/// 未设置的可选字段在合并时从父定义继承。
#[derive(Clone)]
pub struct BeanDefinition {
    /// Bean 的类
    pub bean_class: Option<BeanClass>,

    /// 父定义名称
    pub parent_name: Option<String>,

    /// 作用域（None 表示继承或默认单例）
    pub scope: Option<Scope>,

    /// 抽象定义只作为模板，不能实例化
    pub abstract_definition: bool,

    /// 是否延迟初始化（仅对单例有效）
    pub lazy_init: Option<bool>,

    pub autowire_mode: Option<AutowireMode>,

    /// 按类型自动装配出现多个候选时优先选择
    pub primary: bool,

    /// 是否参与按类型自动装配
    pub autowire_candidate: bool,

    /// 必须先于本 Bean 创建的 Bean
    pub depends_on: Vec<String>,

    pub constructor_args: ConstructorArgumentValues,

    pub property_values: PropertyValues,

    /// 实例工厂方法所在的 Bean
    pub factory_bean_name: Option<String>,

    /// 工厂方法名（静态或实例）
    pub factory_method_name: Option<String>,

    pub init_method_name: Option<String>,

    pub destroy_method_name: Option<String>,

    pub instance_supplier: Option<InstanceSupplier>,

    pub description: Option<String>,
}

impl Default for BeanDefinition {
    fn default() -> Self {
        Self {
            bean_class: None,
            parent_name: None,
            scope: None,
            abstract_definition: false,
            lazy_init: None,
            autowire_mode: None,
            primary: false,
            autowire_candidate: true,
            depends_on: Vec::new(),
            constructor_args: ConstructorArgumentValues::default(),
            property_values: PropertyValues::default(),
            factory_bean_name: None,
            factory_method_name: None,
            init_method_name: None,
            destroy_method_name: None,
            instance_supplier: None,
            description: None,
        }
    }
}

impl BeanDefinition {
    /// 创建空定义
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已解析的类创建定义
    pub fn for_class(class: &Arc<ClassInfo>) -> Self {
        Self {
            bean_class: Some(BeanClass::Resolved(Arc::clone(class))),
            ..Self::default()
        }
    }

    /// 使用类名创建定义，类在首次使用时解析
    pub fn for_class_name(class_name: impl Into<String>) -> Self {
        Self {
            bean_class: Some(BeanClass::Name(class_name.into())),
            ..Self::default()
        }
    }

    /// 创建继承父定义的子定义
    pub fn child_of(parent_name: impl Into<String>) -> Self {
        Self {
            parent_name: Some(parent_name.into()),
            ..Self::default()
        }
    }

    /// 使用实例供应函数创建定义，`class` 用于类型匹配
    pub fn from_supplier<F>(class: &Arc<ClassInfo>, supplier: F) -> Self
    where
        F: Fn() -> anyhow::Result<BeanInstance> + Send + Sync + 'static,
    {
        Self {
            bean_class: Some(BeanClass::Resolved(Arc::clone(class))),
            instance_supplier: Some(Arc::new(supplier)),
            ..Self::default()
        }
    }

    /// 设置作用域
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    pub fn with_abstract(mut self, abstract_definition: bool) -> Self {
        self.abstract_definition = abstract_definition;
        self
    }

    pub fn with_autowire(mut self, mode: AutowireMode) -> Self {
        self.autowire_mode = Some(mode);
        self
    }

    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    pub fn with_autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    /// 设置依赖列表
    pub fn with_depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on = names.into_iter().map(Into::into).collect();
        self
    }

    /// 追加一个通用构造参数
    pub fn with_arg(mut self, value: impl Into<BeanValue>) -> Self {
        self.constructor_args.add_generic(ValueHolder::new(value));
        self
    }

    /// 追加一个声明了类型的通用构造参数
    pub fn with_typed_arg(mut self, value: impl Into<BeanValue>, type_name: impl Into<String>) -> Self {
        self.constructor_args.add_generic(ValueHolder::typed(value, type_name));
        self
    }

    /// 设置按位置的构造参数
    pub fn with_indexed_arg(mut self, index: usize, value: impl Into<BeanValue>) -> Self {
        self.constructor_args.add_indexed(index, ValueHolder::new(value));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<BeanValue>) -> Self {
        self.property_values.add(name, value);
        self
    }

    /// 设置静态工厂方法
    pub fn with_factory_method(mut self, method_name: impl Into<String>) -> Self {
        self.factory_method_name = Some(method_name.into());
        self
    }

    /// 设置实例工厂方法
    pub fn with_factory_bean(mut self, bean_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        self.factory_bean_name = Some(bean_name.into());
        self.factory_method_name = Some(method_name.into());
        self
    }

    pub fn with_init_method(mut self, method_name: impl Into<String>) -> Self {
        self.init_method_name = Some(method_name.into());
        self
    }

    pub fn with_destroy_method(mut self, method_name: impl Into<String>) -> Self {
        self.destroy_method_name = Some(method_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 类名（如果设置）
    pub fn bean_class_name(&self) -> Option<&str> {
        self.bean_class.as_ref().map(BeanClass::name)
    }

    /// 注册前的校验
    pub fn validate(&self, bean_name: &str) -> BeansResult<()> {
        let invalid = |message: &str| BeansError::InvalidBeanDefinition {
            name: bean_name.to_string(),
            message: message.to_string(),
        };

        if !self.abstract_definition
            && self.bean_class.is_none()
            && self.parent_name.is_none()
            && self.factory_bean_name.is_none()
            && self.instance_supplier.is_none()
        {
            return Err(invalid(
                "either a bean class, a parent, a factory bean or an instance supplier must be specified",
            ));
        }
        if self.factory_method_name.is_some() && self.instance_supplier.is_some() {
            return Err(invalid(
                "cannot combine a factory method with an instance supplier",
            ));
        }
        if self.factory_bean_name.is_some() && self.factory_method_name.is_none() {
            return Err(invalid("a factory bean requires a factory method name"));
        }
        Ok(())
    }
}

impl fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("class", &self.bean_class)
            .field("parent", &self.parent_name)
            .field("scope", &self.scope)
            .field("abstract", &self.abstract_definition)
            .field("lazy_init", &self.lazy_init)
            .field("autowire", &self.autowire_mode)
            .field("primary", &self.primary)
            .field("depends_on", &self.depends_on)
            .field("constructor_args", &self.constructor_args)
            .field("properties", &self.property_values)
            .field("factory_bean", &self.factory_bean_name)
            .field("factory_method", &self.factory_method_name)
            .field("supplier", &self.instance_supplier.is_some())
            .finish()
    }
}

impl PartialEq for BeanDefinition {
    fn eq(&self, other: &Self) -> bool {
        let same_supplier = match (&self.instance_supplier, &other.instance_supplier) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        same_supplier
            && self.bean_class == other.bean_class
            && self.parent_name == other.parent_name
            && self.scope == other.scope
            && self.abstract_definition == other.abstract_definition
            && self.lazy_init == other.lazy_init
            && self.autowire_mode == other.autowire_mode
            && self.primary == other.primary
            && self.autowire_candidate == other.autowire_candidate
            && self.depends_on == other.depends_on
            && self.constructor_args == other.constructor_args
            && self.property_values == other.property_values
            && self.factory_bean_name == other.factory_bean_name
            && self.factory_method_name == other.factory_method_name
            && self.init_method_name == other.init_method_name
            && self.destroy_method_name == other.destroy_method_name
            && self.description == other.description
    }
}

/// 合并了父定义链的根定义，容器创建 Bean 时使用
#[derive(Clone)]
pub struct RootBeanDefinition {
    bean_class: Option<BeanClass>,
    scope: Scope,
    abstract_definition: bool,
    lazy_init: bool,
    autowire_mode: AutowireMode,
    primary: bool,
    autowire_candidate: bool,
    depends_on: Vec<String>,
    constructor_args: ConstructorArgumentValues,
    property_values: PropertyValues,
    factory_bean_name: Option<String>,
    factory_method_name: Option<String>,
    init_method_name: Option<String>,
    destroy_method_name: Option<String>,
    instance_supplier: Option<InstanceSupplier>,
    resolved_class: OnceCell<Arc<ClassInfo>>,
}

impl RootBeanDefinition {
    /// 从没有父定义的定义创建
    pub fn from_definition(definition: &BeanDefinition) -> Self {
        let resolved_class = OnceCell::new();
        if let Some(BeanClass::Resolved(class)) = &definition.bean_class {
            let _ = resolved_class.set(Arc::clone(class));
        }
        Self {
            bean_class: definition.bean_class.clone(),
            scope: definition.scope.clone().unwrap_or_default(),
            abstract_definition: definition.abstract_definition,
            lazy_init: definition.lazy_init.unwrap_or(false),
            autowire_mode: definition.autowire_mode.unwrap_or_default(),
            primary: definition.primary,
            autowire_candidate: definition.autowire_candidate,
            depends_on: definition.depends_on.clone(),
            constructor_args: definition.constructor_args.clone(),
            property_values: definition.property_values.clone(),
            factory_bean_name: definition.factory_bean_name.clone(),
            factory_method_name: definition.factory_method_name.clone(),
            init_method_name: definition.init_method_name.clone(),
            destroy_method_name: definition.destroy_method_name.clone(),
            instance_supplier: definition.instance_supplier.clone(),
            resolved_class,
        }
    }

    /// 用子定义覆盖父定义：子定义设置的字段优先，构造参数和属性逐项合并
    pub fn merge(parent: &RootBeanDefinition, child: &BeanDefinition) -> Self {
        let mut merged = parent.clone();

        if let Some(class) = &child.bean_class {
            merged.bean_class = Some(class.clone());
            merged.resolved_class = OnceCell::new();
            if let BeanClass::Resolved(resolved) = class {
                let _ = merged.resolved_class.set(Arc::clone(resolved));
            }
        }
        if let Some(scope) = &child.scope {
            merged.scope = scope.clone();
        }
        merged.abstract_definition = child.abstract_definition;
        if let Some(lazy) = child.lazy_init {
            merged.lazy_init = lazy;
        }
        if let Some(mode) = child.autowire_mode {
            merged.autowire_mode = mode;
        }
        merged.primary = child.primary;
        merged.autowire_candidate = child.autowire_candidate;
        if !child.depends_on.is_empty() {
            merged.depends_on = child.depends_on.clone();
        }
        merged.constructor_args.merge_from(&child.constructor_args);
        merged.property_values.merge_from(&child.property_values);
        if child.factory_bean_name.is_some() {
            merged.factory_bean_name = child.factory_bean_name.clone();
        }
        if child.factory_method_name.is_some() {
            merged.factory_method_name = child.factory_method_name.clone();
        }
        if child.init_method_name.is_some() {
            merged.init_method_name = child.init_method_name.clone();
        }
        if child.destroy_method_name.is_some() {
            merged.destroy_method_name = child.destroy_method_name.clone();
        }
        if child.instance_supplier.is_some() {
            merged.instance_supplier = child.instance_supplier.clone();
        }
        merged
    }

    /// 内部 Bean 随外部 Bean 的非单例作用域
    pub(crate) fn inherit_containing_scope(&mut self, containing: &Scope) {
        if self.scope.is_singleton() && !containing.is_singleton() {
            self.scope = containing.clone();
        }
    }

    pub fn bean_class(&self) -> Option<&BeanClass> {
        self.bean_class.as_ref()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_singleton(&self) -> bool {
        self.scope.is_singleton()
    }

    pub fn is_prototype(&self) -> bool {
        self.scope.is_prototype()
    }

    pub fn is_abstract(&self) -> bool {
        self.abstract_definition
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn autowire_mode(&self) -> AutowireMode {
        self.autowire_mode
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_autowire_candidate(&self) -> bool {
        self.autowire_candidate
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn constructor_args(&self) -> &ConstructorArgumentValues {
        &self.constructor_args
    }

    pub fn property_values(&self) -> &PropertyValues {
        &self.property_values
    }

    pub fn factory_bean_name(&self) -> Option<&str> {
        self.factory_bean_name.as_deref()
    }

    pub fn factory_method_name(&self) -> Option<&str> {
        self.factory_method_name.as_deref()
    }

    pub fn init_method_name(&self) -> Option<&str> {
        self.init_method_name.as_deref()
    }

    pub fn destroy_method_name(&self) -> Option<&str> {
        self.destroy_method_name.as_deref()
    }

    pub fn instance_supplier(&self) -> Option<&InstanceSupplier> {
        self.instance_supplier.as_ref()
    }

    /// 已解析的类（如果已经解析过）
    pub fn resolved_class(&self) -> Option<&Arc<ClassInfo>> {
        self.resolved_class.get()
    }

    /// 解析并缓存类
    pub fn resolve_class<F>(&self, resolve: F) -> BeansResult<Option<Arc<ClassInfo>>>
    where
        F: FnOnce(&str) -> BeansResult<Arc<ClassInfo>>,
    {
        match &self.bean_class {
            None => Ok(None),
            Some(class) => self
                .resolved_class
                .get_or_try_init(|| resolve(class.name()))
                .map(|c| Some(Arc::clone(c))),
        }
    }
}

impl fmt::Debug for RootBeanDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootBeanDefinition")
            .field("class", &self.bean_class)
            .field("scope", &self.scope)
            .field("abstract", &self.abstract_definition)
            .field("lazy_init", &self.lazy_init)
            .field("autowire", &self.autowire_mode)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}
