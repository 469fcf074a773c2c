//! Bean 作用域

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::constants::{SCOPE_PROTOTYPE, SCOPE_SINGLETON};
use crate::error::BeansResult;
use crate::value::BeanInstance;

/// Bean 的作用域
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// 单例模式 - 容器中只有一个实例
    #[default]
    Singleton,

    /// 原型模式 - 每次请求都创建新实例
    Prototype,

    /// 自定义作用域 - 由注册的 [`CustomScope`] 管理
    Custom(String),
}

impl Scope {
    pub fn name(&self) -> &str {
        match self {
            Scope::Singleton => SCOPE_SINGLETON,
            Scope::Prototype => SCOPE_PROTOTYPE,
            Scope::Custom(name) => name,
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }

    pub fn is_prototype(&self) -> bool {
        matches!(self, Scope::Prototype)
    }
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "" | SCOPE_SINGLETON => Scope::Singleton,
            SCOPE_PROTOTYPE => Scope::Prototype,
            other => Scope::Custom(other.to_string()),
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 自定义作用域
///
/// 容器把“如何创建”交给 `object_factory`，作用域决定“何时复用”。
pub trait CustomScope: Send + Sync {
    /// 返回作用域内的对象，不存在时通过 `object_factory` 创建
    fn get(
        &self,
        name: &str,
        object_factory: &dyn Fn() -> BeansResult<BeanInstance>,
    ) -> BeansResult<BeanInstance>;

    /// 从作用域中移除对象，并执行已注册的销毁回调
    fn remove(&self, name: &str) -> Option<BeanInstance>;

    /// 注册对象被移出作用域时执行的回调
    fn register_destruction_callback(&self, _name: &str, _callback: Box<dyn FnOnce() + Send>) {}

    /// 作用域会话标识
    fn conversation_id(&self) -> Option<String> {
        None
    }
}

#[derive(Default)]
struct ThreadBeans {
    beans: HashMap<String, BeanInstance>,
    callbacks: HashMap<String, Box<dyn FnOnce() + Send>>,
}

/// 线程作用域：每个线程持有自己的实例
#[derive(Default)]
pub struct ThreadScope {
    threads: Mutex<HashMap<ThreadId, ThreadBeans>>,
}

impl ThreadScope {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CustomScope for ThreadScope {
    fn get(
        &self,
        name: &str,
        object_factory: &dyn Fn() -> BeansResult<BeanInstance>,
    ) -> BeansResult<BeanInstance> {
        let thread_id = thread::current().id();
        if let Some(existing) = self
            .threads
            .lock()
            .get(&thread_id)
            .and_then(|t| t.beans.get(name))
        {
            return Ok(existing.clone());
        }

        // 创建期间不持锁，对象工厂可能递归进入本作用域
        let created = object_factory()?;
        let mut threads = self.threads.lock();
        let entry = threads
            .entry(thread_id)
            .or_default()
            .beans
            .entry(name.to_string())
            .or_insert(created);
        Ok(entry.clone())
    }

    fn remove(&self, name: &str) -> Option<BeanInstance> {
        let thread_id = thread::current().id();
        let (removed, callback) = {
            let mut threads = self.threads.lock();
            let beans = threads.get_mut(&thread_id)?;
            (beans.beans.remove(name), beans.callbacks.remove(name))
        };
        if let Some(callback) = callback {
            callback();
        }
        removed
    }

    fn register_destruction_callback(&self, name: &str, callback: Box<dyn FnOnce() + Send>) {
        let thread_id = thread::current().id();
        self.threads
            .lock()
            .entry(thread_id)
            .or_default()
            .callbacks
            .insert(name.to_string(), callback);
    }

    fn conversation_id(&self) -> Option<String> {
        Some(format!("{:?}", thread::current().id()))
    }
}
