//! 类型元数据
//!
//! Rust 没有运行时反射，容器需要的构造函数、工厂方法、实例方法、可写属性以及
//! 生命周期回调都通过 [`ClassInfo`] 显式描述。`ClassInfo` 通常在
//! `once_cell::sync::Lazy` 静态变量中构建一次，再用 `inventory::submit!` 提交到
//! [`ClassRegistry`]，这样 Bean 定义就可以只写类名。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use parking_lot::RwLock;

use crate::constants::ANY_TYPE;
use crate::error::{BeansError, BeansResult};
use crate::value::{Args, BeanInstance, Value};

/// 构造函数体：由参数创建新对象
pub type ConstructorFn =
    Arc<dyn Fn(&Args) -> anyhow::Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 静态工厂方法体
pub type StaticMethodFn = Arc<dyn Fn(&Args) -> anyhow::Result<Value> + Send + Sync>;

/// 实例方法体
pub type MethodFn = Arc<dyn Fn(&BeanInstance, &Args) -> anyhow::Result<Value> + Send + Sync>;

/// 属性 setter
pub type SetterFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> anyhow::Result<()> + Send + Sync>;

/// 初始化回调（在实例共享之前调用，可修改对象）
pub type InitFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

/// 销毁回调
pub type DestroyFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> anyhow::Result<()> + Send + Sync>;

/// FactoryBean 的产品创建函数
pub type ProductFn = Arc<dyn Fn(&BeanInstance) -> anyhow::Result<Value> + Send + Sync>;

/// 可被构造器解析器选择的可执行体（构造函数或工厂方法）
pub trait Executable {
    /// 参数类型列表
    fn param_types(&self) -> &[Arc<ClassInfo>];

    /// 用于日志和错误信息的签名
    fn signature(&self) -> String;
}

fn format_params(param_types: &[Arc<ClassInfo>]) -> String {
    param_types
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// 构造函数描述
#[derive(Clone)]
pub struct ConstructorInfo {
    declaring_class: String,
    param_types: Vec<Arc<ClassInfo>>,
    body: ConstructorFn,
}

impl ConstructorInfo {
    /// 调用构造函数创建新对象
    pub fn new_instance(&self, args: &Args) -> anyhow::Result<Box<dyn Any + Send + Sync>> {
        (self.body)(args)
    }
}

impl Executable for ConstructorInfo {
    fn param_types(&self) -> &[Arc<ClassInfo>] {
        &self.param_types
    }

    fn signature(&self) -> String {
        format!("{}({})", self.declaring_class, format_params(&self.param_types))
    }
}

/// 静态工厂方法描述
#[derive(Clone)]
pub struct FactoryMethodInfo {
    declaring_class: String,
    name: String,
    param_types: Vec<Arc<ClassInfo>>,
    return_type: Arc<ClassInfo>,
    body: StaticMethodFn,
}

impl FactoryMethodInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &Arc<ClassInfo> {
        &self.return_type
    }

    pub fn invoke(&self, args: &Args) -> anyhow::Result<Value> {
        (self.body)(args)
    }
}

impl Executable for FactoryMethodInfo {
    fn param_types(&self) -> &[Arc<ClassInfo>] {
        &self.param_types
    }

    fn signature(&self) -> String {
        format!(
            "{}::{}({})",
            self.declaring_class,
            self.name,
            format_params(&self.param_types)
        )
    }
}

/// 实例方法描述
///
/// `body` 为 `None` 表示接口上的抽象方法签名。
#[derive(Clone)]
pub struct MethodInfo {
    declaring_class: String,
    name: String,
    param_types: Vec<Arc<ClassInfo>>,
    return_type: Arc<ClassInfo>,
    body: Option<MethodFn>,
}

impl MethodInfo {
    pub fn new(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        param_types: Vec<Arc<ClassInfo>>,
        return_type: Arc<ClassInfo>,
        body: Option<MethodFn>,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            param_types,
            return_type,
            body,
        }
    }

    pub fn declaring_class(&self) -> &str {
        &self.declaring_class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &Arc<ClassInfo> {
        &self.return_type
    }

    pub fn body(&self) -> Option<&MethodFn> {
        self.body.as_ref()
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// 参数个数相同且每个参数都可赋值
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.param_types.len() == args.len()
            && self
                .param_types
                .iter()
                .zip(args)
                .all(|(param, arg)| param.is_instance(arg))
    }

    /// 名称与参数类型列表都相同
    pub fn same_signature(&self, other: &MethodInfo) -> bool {
        self.name == other.name
            && self.param_types.len() == other.param_types.len()
            && self
                .param_types
                .iter()
                .zip(&other.param_types)
                .all(|(a, b)| a.name() == b.name())
    }

    /// 返回替换了方法体和声明类的副本（代理类使用）
    pub fn with_body(&self, declaring_class: impl Into<String>, body: MethodFn) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: self.name.clone(),
            param_types: self.param_types.clone(),
            return_type: Arc::clone(&self.return_type),
            body: Some(body),
        }
    }
}

impl Executable for MethodInfo {
    fn param_types(&self) -> &[Arc<ClassInfo>] {
        &self.param_types
    }

    fn signature(&self) -> String {
        format!(
            "{}::{}({})",
            self.declaring_class,
            self.name,
            format_params(&self.param_types)
        )
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 可写属性描述
#[derive(Clone)]
pub struct PropertyInfo {
    name: String,
    property_type: Arc<ClassInfo>,
    setter: SetterFn,
}

impl PropertyInfo {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> &Arc<ClassInfo> {
        &self.property_type
    }

    pub fn set(&self, target: &mut (dyn Any + Send + Sync), value: Value) -> anyhow::Result<()> {
        (self.setter)(target, value)
    }
}

/// FactoryBean 能力：实例本身是生产其他对象的工厂
#[derive(Clone)]
pub struct FactoryBeanInfo {
    object_type: Option<Arc<ClassInfo>>,
    singleton: bool,
    get_object: ProductFn,
}

impl FactoryBeanInfo {
    /// 静态声明的产品类型（未知时为 None）
    pub fn object_type(&self) -> Option<&Arc<ClassInfo>> {
        self.object_type.as_ref()
    }

    /// 产品是否为单例
    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn get_object(&self, factory: &BeanInstance) -> anyhow::Result<Value> {
        (self.get_object)(factory)
    }
}

/// 类型元数据
pub struct ClassInfo {
    name: String,
    superclass: Option<Arc<ClassInfo>>,
    interfaces: Vec<Arc<ClassInfo>>,
    is_interface: bool,
    is_primitive: bool,
    constructors: Vec<ConstructorInfo>,
    factory_methods: Vec<FactoryMethodInfo>,
    methods: Vec<MethodInfo>,
    properties: Vec<PropertyInfo>,
    init_callback: Option<InitFn>,
    destroy_callback: Option<DestroyFn>,
    factory_bean: Option<FactoryBeanInfo>,
}

impl ClassInfo {
    /// 开始构建一个普通类
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    /// 开始构建一个接口
    pub fn interface(name: impl Into<String>) -> ClassBuilder {
        let mut builder = ClassBuilder::new(name);
        builder.info.is_interface = true;
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 显式声明的父类
    pub fn superclass(&self) -> Option<&Arc<ClassInfo>> {
        self.superclass.as_ref()
    }

    /// 直接实现的接口
    pub fn interfaces(&self) -> &[Arc<ClassInfo>] {
        &self.interfaces
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    pub fn is_primitive(&self) -> bool {
        self.is_primitive
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn factory_methods(&self) -> &[FactoryMethodInfo] {
        &self.factory_methods
    }

    pub fn methods(&self) -> &[MethodInfo] {
        &self.methods
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn init_callback(&self) -> Option<&InitFn> {
        self.init_callback.as_ref()
    }

    pub fn destroy_callback(&self) -> Option<&DestroyFn> {
        self.destroy_callback.as_ref()
    }

    pub fn factory_bean(&self) -> Option<&FactoryBeanInfo> {
        self.factory_bean.as_ref()
    }

    /// 父类链上的下一个类型；未声明父类的普通类隐式继承 `Any`
    pub fn effective_superclass(&self) -> Option<Arc<ClassInfo>> {
        if let Some(superclass) = &self.superclass {
            return Some(Arc::clone(superclass));
        }
        if self.is_interface || self.is_primitive || self.name == ANY_TYPE {
            return None;
        }
        Some(types::any())
    }

    /// 父类链和接口层次中出现的全部接口（不含自身，按发现顺序去重）
    pub fn all_interfaces(&self) -> Vec<Arc<ClassInfo>> {
        let mut result: Vec<Arc<ClassInfo>> = Vec::new();
        self.collect_interfaces(&mut result);
        result
    }

    fn collect_interfaces(&self, result: &mut Vec<Arc<ClassInfo>>) {
        for interface in &self.interfaces {
            if !result.iter().any(|i| i.name == interface.name) {
                result.push(Arc::clone(interface));
                interface.collect_interfaces(result);
            }
        }
        if let Some(superclass) = &self.superclass {
            superclass.collect_interfaces(result);
        }
    }

    /// 是否可以把 `other` 类型的值赋给本类型
    pub fn is_assignable_from(&self, other: &ClassInfo) -> bool {
        if self.name == other.name {
            return true;
        }
        if self.is_primitive || other.is_primitive {
            return false;
        }
        if self.name == ANY_TYPE {
            return true;
        }
        other.has_ancestor(&self.name)
    }

    fn has_ancestor(&self, name: &str) -> bool {
        if let Some(superclass) = &self.superclass {
            if superclass.name == name || superclass.has_ancestor(name) {
                return true;
            }
        }
        self.interfaces
            .iter()
            .any(|i| i.name == name || i.has_ancestor(name))
    }

    /// 值是否为本类型的实例（null 可赋给所有非原始类型）
    pub fn is_instance(&self, value: &Value) -> bool {
        match value.class() {
            Some(class) => self.is_assignable_from(&class),
            None => !self.is_primitive,
        }
    }

    /// 按名称查找所有重载
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// 按名称、参数个数和参数可赋值性选择重载，具体方法优先于抽象签名
    ///
    /// 类自身没有具体实现时沿父类链继续查找。
    pub fn find_method(&self, name: &str, args: &[Value]) -> Option<&MethodInfo> {
        let mut fallback = None;
        for method in self
            .methods
            .iter()
            .filter(|m| m.name == name && m.accepts(args))
        {
            if !method.is_abstract() {
                return Some(method);
            }
            fallback.get_or_insert(method);
        }
        match self.superclass.as_ref().and_then(|s| s.find_method(name, args)) {
            Some(inherited) if !inherited.is_abstract() => Some(inherited),
            inherited => fallback.or(inherited),
        }
    }

    /// 类自身及父类链上的全部方法，子类的同签名方法覆盖父类方法
    pub fn all_methods(&self) -> Vec<&MethodInfo> {
        let mut methods: Vec<&MethodInfo> = self.methods.iter().collect();
        let mut current = self.superclass.as_ref();
        while let Some(superclass) = current {
            for method in &superclass.methods {
                if !methods.iter().any(|m| m.same_signature(method)) {
                    methods.push(method);
                }
            }
            current = superclass.superclass.as_ref();
        }
        methods
    }

    /// 按名称和参数类型名查找方法
    pub fn find_method_by_signature(&self, name: &str, param_types: &[&str]) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| {
            m.name == name
                && m.param_types.len() == param_types.len()
                && m.param_types
                    .iter()
                    .zip(param_types)
                    .all(|(a, b)| a.name() == *b)
        })
    }

    /// 按名称查找静态工厂方法
    pub fn factory_methods_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a FactoryMethodInfo> + 'a {
        self.factory_methods.iter().filter(move |m| m.name == name)
    }

    pub fn find_property(&self, name: &str) -> Option<&PropertyInfo> {
        self.properties.iter().find(|p| p.name == name)
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("name", &self.name)
            .field("interface", &self.is_interface)
            .finish()
    }
}

impl fmt::Display for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl PartialEq for ClassInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ClassInfo {}

/// ClassInfo 构建器
pub struct ClassBuilder {
    info: ClassInfo,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: ClassInfo {
                name: name.into(),
                superclass: None,
                interfaces: Vec::new(),
                is_interface: false,
                is_primitive: false,
                constructors: Vec::new(),
                factory_methods: Vec::new(),
                methods: Vec::new(),
                properties: Vec::new(),
                init_callback: None,
                destroy_callback: None,
                factory_bean: None,
            },
        }
    }

    pub fn extends(mut self, superclass: &Arc<ClassInfo>) -> Self {
        self.info.superclass = Some(Arc::clone(superclass));
        self
    }

    pub fn implements(mut self, interface: &Arc<ClassInfo>) -> Self {
        self.info.interfaces.push(Arc::clone(interface));
        self
    }

    pub(crate) fn primitive(mut self) -> Self {
        self.info.is_primitive = true;
        self
    }

    /// 注册构造函数
    pub fn constructor<T, F>(mut self, param_types: Vec<Arc<ClassInfo>>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let body: ConstructorFn = Arc::new(move |args: &Args| {
            let object = f(args)?;
            Ok(Box::new(object) as Box<dyn Any + Send + Sync>)
        });
        self.info.constructors.push(ConstructorInfo {
            declaring_class: self.info.name.clone(),
            param_types,
            body,
        });
        self
    }

    /// 注册使用 `Default` 的无参构造函数
    pub fn default_constructor<T>(self) -> Self
    where
        T: Any + Send + Sync + Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// 注册静态工厂方法
    pub fn factory_method<F>(
        mut self,
        name: impl Into<String>,
        param_types: Vec<Arc<ClassInfo>>,
        return_type: &Arc<ClassInfo>,
        f: F,
    ) -> Self
    where
        F: Fn(&Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.info.factory_methods.push(FactoryMethodInfo {
            declaring_class: self.info.name.clone(),
            name: name.into(),
            param_types,
            return_type: Arc::clone(return_type),
            body: Arc::new(f),
        });
        self
    }

    /// 注册实例方法，方法体收到向下转型后的 `&T`
    pub fn method<T, F>(
        mut self,
        name: impl Into<String>,
        param_types: Vec<Arc<ClassInfo>>,
        return_type: &Arc<ClassInfo>,
        f: F,
    ) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T, &Args) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        let method_name = name.clone();
        let body: MethodFn = Arc::new(move |this: &BeanInstance, args: &Args| {
            let target = this.downcast_ref::<T>().ok_or_else(|| {
                anyhow!(
                    "method '{}' invoked on incompatible instance of [{}]",
                    method_name,
                    this.class_name()
                )
            })?;
            f(target, args)
        });
        self.info.methods.push(MethodInfo::new(
            self.info.name.clone(),
            name,
            param_types,
            Arc::clone(return_type),
            Some(body),
        ));
        self
    }

    /// 注册抽象方法签名（接口）
    pub fn abstract_method(
        mut self,
        name: impl Into<String>,
        param_types: Vec<Arc<ClassInfo>>,
        return_type: &Arc<ClassInfo>,
    ) -> Self {
        self.info.methods.push(MethodInfo::new(
            self.info.name.clone(),
            name,
            param_types,
            Arc::clone(return_type),
            None,
        ));
        self
    }

    /// 直接加入一个已构建好的方法
    pub fn method_info(mut self, method: MethodInfo) -> Self {
        self.info.methods.push(method);
        self
    }

    /// 注册可写属性
    pub fn property<T, F>(mut self, name: impl Into<String>, property_type: &Arc<ClassInfo>, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let property_name = name.clone();
        let setter: SetterFn = Arc::new(move |target: &mut (dyn Any + Send + Sync), value: Value| {
            let target = target.downcast_mut::<T>().ok_or_else(|| {
                anyhow!("property '{}' set on incompatible instance", property_name)
            })?;
            f(target, value)
        });
        self.info.properties.push(PropertyInfo {
            name,
            property_type: Arc::clone(property_type),
            setter,
        });
        self
    }

    /// 注册初始化回调
    pub fn on_init<T, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let class_name = self.info.name.clone();
        let init: InitFn = Arc::new(move |target: &mut (dyn Any + Send + Sync)| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| anyhow!("init callback of [{}] got an incompatible instance", class_name))?;
            f(target)
        });
        self.info.init_callback = Some(init);
        self
    }

    /// 注册销毁回调
    pub fn on_destroy<T, F>(mut self, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let class_name = self.info.name.clone();
        let destroy: DestroyFn = Arc::new(move |target: &(dyn Any + Send + Sync)| {
            let target = target
                .downcast_ref::<T>()
                .ok_or_else(|| anyhow!("destroy callback of [{}] got an incompatible instance", class_name))?;
            f(target)
        });
        self.info.destroy_callback = Some(destroy);
        self
    }

    /// 声明 FactoryBean 能力
    pub fn factory_bean<T, F>(mut self, object_type: Option<&Arc<ClassInfo>>, singleton: bool, f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let get_object: ProductFn = Arc::new(move |factory: &BeanInstance| {
            let target = factory.downcast_ref::<T>().ok_or_else(|| {
                anyhow!("factory bean [{}] has an incompatible instance", factory.class_name())
            })?;
            f(target)
        });
        self.info.factory_bean = Some(FactoryBeanInfo {
            object_type: object_type.cloned(),
            singleton,
            get_object,
        });
        self
    }

    pub fn build(self) -> Arc<ClassInfo> {
        Arc::new(self.info)
    }
}

/// 内置类型
pub mod types {
    use std::sync::Arc;

    use once_cell::sync::Lazy;

    use super::{ClassBuilder, ClassInfo};
    use crate::constants::*;

    static ANY: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(ANY_TYPE).build());
    static BOOL: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(BOOL_TYPE).primitive().build());
    static INT: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(INT_TYPE).primitive().build());
    static FLOAT: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(FLOAT_TYPE).primitive().build());
    static STRING: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(STRING_TYPE).build());
    static LIST: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(LIST_TYPE).build());
    static VOID: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassBuilder::new(VOID_TYPE).build());

    pub fn any() -> Arc<ClassInfo> {
        Arc::clone(&ANY)
    }

    pub fn boolean() -> Arc<ClassInfo> {
        Arc::clone(&BOOL)
    }

    pub fn int() -> Arc<ClassInfo> {
        Arc::clone(&INT)
    }

    pub fn float() -> Arc<ClassInfo> {
        Arc::clone(&FLOAT)
    }

    pub fn string() -> Arc<ClassInfo> {
        Arc::clone(&STRING)
    }

    pub fn list() -> Arc<ClassInfo> {
        Arc::clone(&LIST)
    }

    pub fn void() -> Arc<ClassInfo> {
        Arc::clone(&VOID)
    }

    pub fn builtins() -> Vec<Arc<ClassInfo>> {
        vec![any(), boolean(), int(), float(), string(), list(), void()]
    }
}

/// 编译期提交的类注册项
///
/// ```rust,ignore
/// static USER_SERVICE: Lazy<Arc<ClassInfo>> = Lazy::new(|| ClassInfo::builder("UserService").build());
///
/// inventory::submit! {
///     ClassRegistration::new(|| Arc::clone(&USER_SERVICE))
/// }
/// ```
pub struct ClassRegistration {
    pub create: fn() -> Arc<ClassInfo>,
}

impl ClassRegistration {
    pub const fn new(create: fn() -> Arc<ClassInfo>) -> Self {
        Self { create }
    }
}

inventory::collect!(ClassRegistration);

/// 类名到类型元数据的注册表
pub struct ClassRegistry {
    classes: RwLock<HashMap<String, Arc<ClassInfo>>>,
}

impl ClassRegistry {
    /// 创建注册表，包含内置类型和所有通过 inventory 提交的类
    pub fn new() -> Self {
        let registry = Self::with_builtins();
        let mut submitted = 0;
        for registration in inventory::iter::<ClassRegistration> {
            registry.register((registration.create)());
            submitted += 1;
        }
        tracing::debug!("Class registry initialized with {} submitted class(es)", submitted);
        registry
    }

    /// 只包含内置类型的注册表
    pub fn with_builtins() -> Self {
        let classes = types::builtins()
            .into_iter()
            .map(|class| (class.name().to_string(), class))
            .collect();
        Self {
            classes: RwLock::new(classes),
        }
    }

    /// 注册（或替换）一个类
    pub fn register(&self, class: Arc<ClassInfo>) {
        tracing::trace!("Registering class [{}]", class.name());
        self.classes.write().insert(class.name().to_string(), class);
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<ClassInfo>> {
        self.classes.read().get(class_name).cloned()
    }

    /// 为指定 Bean 解析类名
    pub fn resolve(&self, bean_name: &str, class_name: &str) -> BeansResult<Arc<ClassInfo>> {
        self.get(class_name).ok_or_else(|| BeansError::ClassNotFound {
            name: bean_name.to_string(),
            class_name: class_name.to_string(),
        })
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.read().contains_key(class_name)
    }

    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// 参数列表与参数类型之间的类型差异权重（越小越匹配）
///
/// 不可赋值时为 `i32::MAX`；每向上走一级仍可赋值的父类加 2；参数类型是接口时加 1。
pub fn type_difference_weight(param_types: &[Arc<ClassInfo>], args: &[Value]) -> i32 {
    let mut result: i32 = 0;
    for (param, arg) in param_types.iter().zip(args) {
        if !param.is_instance(arg) {
            return i32::MAX;
        }
        let Some(arg_class) = arg.class() else {
            continue;
        };
        let mut superclass = arg_class.effective_superclass();
        while let Some(current) = superclass {
            if current.name() == param.name() {
                result = result.saturating_add(2);
                superclass = None;
            } else if param.is_assignable_from(&current) {
                result = result.saturating_add(2);
                superclass = current.effective_superclass();
            } else {
                superclass = None;
            }
        }
        if param.is_interface() {
            result = result.saturating_add(1);
        }
    }
    result
}
