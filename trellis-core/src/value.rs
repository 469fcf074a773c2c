//! 运行时值与 Bean 实例

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, bail};

use crate::class::{types, ClassInfo, MethodInfo};
use crate::constants::{BOOL_TYPE, FLOAT_TYPE, INT_TYPE, STRING_TYPE};
use crate::error::BeansError;

/// 共享的 Bean 对象
pub type BeanObject = Arc<dyn Any + Send + Sync>;

/// 一个受管对象：类型元数据加上共享的对象本体
///
/// 克隆只复制引用，`ptr_eq` 比较的是对象本体的地址。
#[derive(Clone)]
pub struct BeanInstance {
    class: Arc<ClassInfo>,
    object: BeanObject,
}

impl BeanInstance {
    /// 用具体值创建实例
    pub fn new<T: Any + Send + Sync>(class: Arc<ClassInfo>, value: T) -> Self {
        Self {
            class,
            object: Arc::new(value),
        }
    }

    pub fn from_parts(class: Arc<ClassInfo>, object: BeanObject) -> Self {
        Self { class, object }
    }

    pub fn class(&self) -> &Arc<ClassInfo> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn object(&self) -> &BeanObject {
        &self.object
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// 两个实例是否指向同一个对象
    pub fn ptr_eq(&self, other: &BeanInstance) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.object) as *const (),
            Arc::as_ptr(&other.object) as *const (),
        )
    }

    /// 在对象尚未共享时获取可变引用
    pub(crate) fn object_mut(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        Arc::get_mut(&mut self.object)
    }

    /// 按名称调用方法，根据参数个数和类型选择重载
    pub fn invoke(&self, method: &str, args: impl Into<Args>) -> anyhow::Result<Value> {
        let args = args.into();
        let target = self
            .class
            .find_method(method, args.values())
            .ok_or_else(|| BeansError::NoSuchMethod {
                class_name: self.class.name().to_string(),
                method: method.to_string(),
                arity: args.len(),
            })?;
        self.invoke_method(target, &args)
    }

    /// 调用一个已确定的方法；方法体返回的错误原样返回
    pub fn invoke_method(&self, method: &MethodInfo, args: &Args) -> anyhow::Result<Value> {
        match method.body() {
            Some(body) => body(self, args),
            None => Err(anyhow!(
                "cannot invoke abstract method {:?} on [{}]",
                method,
                self.class.name()
            )),
        }
    }
}

impl fmt::Debug for BeanInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BeanInstance({}@{:p})",
            self.class.name(),
            Arc::as_ptr(&self.object) as *const ()
        )
    }
}

/// 运行时值
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(BeanInstance),
}

impl Value {
    /// 值的运行时类型（null 没有类型）
    pub fn class(&self) -> Option<Arc<ClassInfo>> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(types::boolean()),
            Value::Int(_) => Some(types::int()),
            Value::Float(_) => Some(types::float()),
            Value::Str(_) => Some(types::string()),
            Value::List(_) => Some(types::list()),
            Value::Object(instance) => Some(Arc::clone(instance.class())),
        }
    }

    /// 用于错误信息的类型名
    pub fn type_name(&self) -> String {
        match self.class() {
            Some(class) => class.name().to_string(),
            None => "null".to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&BeanInstance> {
        match self {
            Value::Object(instance) => Some(instance),
            _ => None,
        }
    }

    /// 把 Bean 实例转成值，内置标量类型会还原为对应的标量
    pub fn from_instance(instance: BeanInstance) -> Value {
        let scalar = match instance.class_name() {
            STRING_TYPE => instance
                .downcast_ref::<String>()
                .map(|s| Value::Str(s.clone())),
            INT_TYPE => instance.downcast_ref::<i64>().map(|i| Value::Int(*i)),
            FLOAT_TYPE => instance.downcast_ref::<f64>().map(|f| Value::Float(*f)),
            BOOL_TYPE => instance.downcast_ref::<bool>().map(|b| Value::Bool(*b)),
            _ => None,
        };
        scalar.unwrap_or(Value::Object(instance))
    }

    /// 把值包装成 Bean 实例（工厂方法和 FactoryBean 的返回值）
    pub fn into_instance(self) -> Option<BeanInstance> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(BeanInstance::new(types::boolean(), b)),
            Value::Int(i) => Some(BeanInstance::new(types::int(), i)),
            Value::Float(f) => Some(BeanInstance::new(types::float(), f)),
            Value::Str(s) => Some(BeanInstance::new(types::string(), s)),
            Value::List(items) => Some(BeanInstance::new(types::list(), items)),
            Value::Object(instance) => Some(instance),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Object(instance) => write!(f, "{:?}", instance),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BeanInstance> for Value {
    fn from(instance: BeanInstance) -> Self {
        Value::Object(instance)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// 方法、构造函数的位置参数
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// 替换某个位置的参数（通知可以在调用目标之前改写参数）
    pub fn set(&mut self, index: usize, value: Value) -> anyhow::Result<()> {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => bail!("argument index {} out of range ({} argument(s))", index, self.0.len()),
        }
    }

    pub fn value(&self, index: usize) -> anyhow::Result<&Value> {
        self.0
            .get(index)
            .ok_or_else(|| anyhow!("missing argument {} ({} argument(s) given)", index, self.0.len()))
    }

    pub fn str(&self, index: usize) -> anyhow::Result<&str> {
        match self.value(index)? {
            Value::Str(s) => Ok(s),
            other => bail!("argument {} is not a String: {:?}", index, other),
        }
    }

    pub fn string(&self, index: usize) -> anyhow::Result<String> {
        self.str(index).map(str::to_string)
    }

    /// 可为 null 的字符串参数
    pub fn opt_string(&self, index: usize) -> anyhow::Result<Option<String>> {
        match self.value(index)? {
            Value::Null => Ok(None),
            Value::Str(s) => Ok(Some(s.clone())),
            other => bail!("argument {} is not a String: {:?}", index, other),
        }
    }

    pub fn int(&self, index: usize) -> anyhow::Result<i64> {
        match self.value(index)? {
            Value::Int(i) => Ok(*i),
            other => bail!("argument {} is not an i64: {:?}", index, other),
        }
    }

    pub fn float(&self, index: usize) -> anyhow::Result<f64> {
        self.value(index)?
            .as_f64()
            .ok_or_else(|| anyhow!("argument {} is not an f64", index))
    }

    pub fn bool(&self, index: usize) -> anyhow::Result<bool> {
        match self.value(index)? {
            Value::Bool(b) => Ok(*b),
            other => bail!("argument {} is not a bool: {:?}", index, other),
        }
    }

    pub fn list(&self, index: usize) -> anyhow::Result<&[Value]> {
        self.value(index)?
            .as_list()
            .ok_or_else(|| anyhow!("argument {} is not a List", index))
    }

    pub fn instance(&self, index: usize) -> anyhow::Result<BeanInstance> {
        match self.value(index)? {
            Value::Object(instance) => Ok(instance.clone()),
            other => bail!("argument {} is not an object: {:?}", index, other),
        }
    }

    /// 取对象参数并向下转型
    pub fn bean<T: Any + Send + Sync>(&self, index: usize) -> anyhow::Result<Arc<T>> {
        let instance = self.instance(index)?;
        instance.downcast::<T>().ok_or_else(|| {
            anyhow!(
                "argument {} of type [{}] is not a {}",
                index,
                instance.class_name(),
                std::any::type_name::<T>()
            )
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl From<Vec<Value>> for Args {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<&[Value]> for Args {
    fn from(values: &[Value]) -> Self {
        Self(values.to_vec())
    }
}

impl From<()> for Args {
    fn from(_: ()) -> Self {
        Self::empty()
    }
}
