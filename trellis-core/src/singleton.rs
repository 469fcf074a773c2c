//! 单例注册表
//!
//! 保存共享实例、创建中标记、依赖关系和可销毁 Bean。单例的创建与销毁共用一把
//! 可重入锁，创建过程中对其他 Bean 的递归获取不会死锁；同一线程第二次进入
//! 同一个 Bean 的创建则报告循环依赖。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::class::DestroyFn;
use crate::error::{BeansError, BeansResult};
use crate::value::BeanInstance;

/// 跟踪正在创建的 Bean，用于检测循环依赖
///
/// 每个线程维护自己的创建链，链的顺序就是递归创建的顺序。
#[derive(Debug, Default)]
pub struct CreationTracker {
    creating: Mutex<HashMap<ThreadId, Vec<String>>>,
}

impl CreationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前线程是否正在创建该 Bean
    pub fn is_creating(&self, name: &str) -> bool {
        self.creating
            .lock()
            .get(&thread::current().id())
            .is_some_and(|chain| chain.iter().any(|n| n == name))
    }

    /// 标记开始创建；已经在当前线程的创建链中时返回 `false`
    pub fn start_creating(&self, name: &str) -> bool {
        let mut creating = self.creating.lock();
        let chain = creating.entry(thread::current().id()).or_default();
        if chain.iter().any(|n| n == name) {
            return false;
        }
        chain.push(name.to_string());
        true
    }

    /// 标记创建完成
    pub fn finish_creating(&self, name: &str) {
        let thread_id = thread::current().id();
        let mut creating = self.creating.lock();
        if let Some(chain) = creating.get_mut(&thread_id) {
            if let Some(pos) = chain.iter().rposition(|n| n == name) {
                chain.remove(pos);
            }
            if chain.is_empty() {
                creating.remove(&thread_id);
            }
        }
    }

    /// 当前线程的创建链
    pub fn current_chain(&self) -> Vec<String> {
        self.creating
            .lock()
            .get(&thread::current().id())
            .cloned()
            .unwrap_or_default()
    }

    /// 进入创建；循环时返回 `BeanCurrentlyInCreation`，链形如 `a -> b -> a`
    pub fn enter<'a>(&'a self, name: &str) -> BeansResult<CreationGuard<'a>> {
        if !self.start_creating(name) {
            let mut chain = self.current_chain();
            if let Some(start) = chain.iter().position(|n| n == name) {
                chain.drain(..start);
            }
            chain.push(name.to_string());
            return Err(BeansError::BeanCurrentlyInCreation {
                name: name.to_string(),
                chain: chain.join(" -> "),
            });
        }
        Ok(CreationGuard {
            tracker: self,
            name: name.to_string(),
        })
    }
}

/// 离开作用域时清除创建中标记
pub struct CreationGuard<'a> {
    tracker: &'a CreationTracker,
    name: String,
}

impl Drop for CreationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish_creating(&self.name);
    }
}

/// 销毁时需要执行的回调
#[derive(Clone)]
pub struct DisposableBean {
    instance: BeanInstance,
    destroy_callback: Option<DestroyFn>,
    destroy_method: Option<String>,
}

impl DisposableBean {
    pub fn new(instance: BeanInstance, destroy_method: Option<String>) -> Self {
        let destroy_callback = instance.class().destroy_callback().cloned();
        Self {
            instance,
            destroy_callback,
            destroy_method,
        }
    }

    /// 是否有需要执行的销毁逻辑
    pub fn has_destroy_logic(&self) -> bool {
        self.destroy_callback.is_some() || self.destroy_method.is_some()
    }

    /// 先执行类上的销毁回调，再执行自定义销毁方法
    pub fn destroy(&self) -> anyhow::Result<()> {
        if let Some(callback) = &self.destroy_callback {
            callback(self.instance.object().as_ref())?;
        }
        if let Some(method) = &self.destroy_method {
            self.instance.invoke(method, ())?;
        }
        Ok(())
    }
}

/// 默认的单例注册表
#[derive(Default)]
pub struct DefaultSingletonBeanRegistry {
    singleton_objects: RwLock<HashMap<String, BeanInstance>>,

    /// 单例注册顺序
    registered_singletons: RwLock<Vec<String>>,

    /// 创建与销毁共用的可重入锁
    singleton_lock: ReentrantMutex<()>,

    creation_tracker: CreationTracker,

    in_destruction: AtomicBool,

    /// 可销毁 Bean（注册顺序）
    disposable_beans: Mutex<Vec<(String, DisposableBean)>>,

    /// bean -> 依赖它的 Bean
    dependent_bean_map: RwLock<HashMap<String, Vec<String>>>,

    /// bean -> 它依赖的 Bean
    dependencies_for_bean_map: RwLock<HashMap<String, Vec<String>>>,
}

impl DefaultSingletonBeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取创建/销毁锁（可重入）
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.singleton_lock.lock()
    }

    pub fn creation_tracker(&self) -> &CreationTracker {
        &self.creation_tracker
    }

    /// 手动注册一个已存在的单例
    pub fn register_singleton(&self, name: &str, instance: BeanInstance) -> BeansResult<()> {
        let _guard = self.lock();
        if self.singleton_objects.read().contains_key(name) {
            return Err(BeansError::IllegalState(format!(
                "Could not register object [{}] under bean name '{}': there is already an object bound",
                instance.class_name(),
                name
            )));
        }
        self.add_singleton(name, instance);
        Ok(())
    }

    pub(crate) fn add_singleton(&self, name: &str, instance: BeanInstance) {
        self.singleton_objects
            .write()
            .insert(name.to_string(), instance);
        let mut registered = self.registered_singletons.write();
        if !registered.iter().any(|n| n == name) {
            registered.push(name.to_string());
        }
    }

    pub fn get_singleton(&self, name: &str) -> Option<BeanInstance> {
        self.singleton_objects.read().get(name).cloned()
    }

    /// 获取单例，不存在时在锁内调用 `factory` 创建并缓存
    pub fn get_or_create_singleton<F>(&self, name: &str, factory: F) -> BeansResult<BeanInstance>
    where
        F: FnOnce() -> BeansResult<BeanInstance>,
    {
        let _guard = self.lock();
        if let Some(existing) = self.get_singleton(name) {
            return Ok(existing);
        }
        if self.in_destruction.load(Ordering::SeqCst) {
            return Err(BeansError::BeanCreationNotAllowed {
                name: name.to_string(),
            });
        }

        tracing::info!("Creating shared instance of singleton bean '{}'", name);
        let instance = {
            let _creation = self.creation_tracker.enter(name)?;
            factory()?
        };
        self.add_singleton(name, instance.clone());
        Ok(instance)
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singleton_objects.read().contains_key(name)
    }

    /// 单例名称（注册顺序）
    pub fn singleton_names(&self) -> Vec<String> {
        self.registered_singletons.read().clone()
    }

    pub fn singleton_count(&self) -> usize {
        self.registered_singletons.read().len()
    }

    /// 当前线程是否正在创建该 Bean
    pub fn is_currently_in_creation(&self, name: &str) -> bool {
        self.creation_tracker.is_creating(name)
    }

    pub fn is_in_destruction(&self) -> bool {
        self.in_destruction.load(Ordering::SeqCst)
    }

    pub fn register_disposable_bean(&self, name: &str, bean: DisposableBean) {
        let mut disposables = self.disposable_beans.lock();
        disposables.retain(|(n, _)| n != name);
        disposables.push((name.to_string(), bean));
    }

    /// 记录 `dependent` 依赖于 `bean`
    pub fn register_dependent_bean(&self, bean: &str, dependent: &str) {
        {
            let mut map = self.dependent_bean_map.write();
            let dependents = map.entry(bean.to_string()).or_default();
            if dependents.iter().any(|d| d == dependent) {
                return;
            }
            dependents.push(dependent.to_string());
        }
        let mut map = self.dependencies_for_bean_map.write();
        let dependencies = map.entry(dependent.to_string()).or_default();
        if !dependencies.iter().any(|d| d == bean) {
            dependencies.push(bean.to_string());
        }
    }

    /// `dependent` 是否（直接或传递地）依赖于 `bean`
    pub fn is_dependent(&self, bean: &str, dependent: &str) -> bool {
        let map = self.dependent_bean_map.read();
        let mut seen = HashSet::new();
        let mut stack = vec![bean.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(dependents) = map.get(&current) {
                if dependents.iter().any(|d| d == dependent) {
                    return true;
                }
                stack.extend(dependents.iter().cloned());
            }
        }
        false
    }

    pub fn get_dependent_beans(&self, bean: &str) -> Vec<String> {
        self.dependent_bean_map
            .read()
            .get(bean)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_dependencies_for_bean(&self, bean: &str) -> Vec<String> {
        self.dependencies_for_bean_map
            .read()
            .get(bean)
            .cloned()
            .unwrap_or_default()
    }

    /// 从缓存中移除单例（不执行销毁回调）
    pub(crate) fn remove_singleton(&self, name: &str) -> Option<BeanInstance> {
        let removed = self.singleton_objects.write().remove(name);
        self.registered_singletons.write().retain(|n| n != name);
        removed
    }

    /// 销毁所有单例：按注册的逆序销毁，依赖方先于被依赖方
    pub fn destroy_singletons(&self) {
        let _guard = self.lock();
        tracing::info!("Destroying singletons in registry");
        self.in_destruction.store(true, Ordering::SeqCst);

        let names: Vec<String> = self
            .disposable_beans
            .lock()
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        for name in names.iter().rev() {
            self.destroy_singleton(name);
        }

        self.singleton_objects.write().clear();
        self.registered_singletons.write().clear();
        self.disposable_beans.lock().clear();
        self.dependent_bean_map.write().clear();
        self.dependencies_for_bean_map.write().clear();
        self.in_destruction.store(false, Ordering::SeqCst);
        tracing::info!("Singleton destruction completed");
    }

    /// 销毁单个单例，先销毁依赖它的 Bean
    pub fn destroy_singleton(&self, name: &str) {
        let _guard = self.lock();
        self.remove_singleton(name);
        let disposable = {
            let mut disposables = self.disposable_beans.lock();
            disposables
                .iter()
                .position(|(n, _)| n == name)
                .map(|pos| disposables.remove(pos).1)
        };
        self.destroy_bean(name, disposable);
    }

    fn destroy_bean(&self, name: &str, disposable: Option<DisposableBean>) {
        let dependents = self.dependent_bean_map.write().remove(name);
        if let Some(dependents) = dependents {
            tracing::debug!(
                "Retrieved dependent beans for bean '{}': {:?}",
                name,
                dependents
            );
            for dependent in dependents {
                self.destroy_singleton(&dependent);
            }
        }

        if let Some(disposable) = disposable {
            tracing::debug!("Invoking destroy callbacks on bean '{}'", name);
            if let Err(e) = disposable.destroy() {
                tracing::warn!("Destroy method on bean with name '{}' threw an exception: {:#}", name, e);
            }
        }

        for dependents in self.dependent_bean_map.write().values_mut() {
            dependents.retain(|d| d != name);
        }
        self.dependencies_for_bean_map.write().remove(name);
    }
}
