//! 测试共用的类型元数据

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::class::{types, ClassInfo};
use crate::value::{BeanInstance, Value};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

static REPOSITORY: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::interface("Repository")
        .abstract_method("find", vec![types::string()], &types::string())
        .build()
});

pub fn repository_interface() -> Arc<ClassInfo> {
    Arc::clone(&REPOSITORY)
}

#[derive(Debug, Default)]
pub struct JdbcRepository {
    pub table: String,
    pub initialized: bool,
}

pub fn jdbc_repository_class(log: EventLog) -> Arc<ClassInfo> {
    let init_log = Arc::clone(&log);
    ClassInfo::builder("JdbcRepository")
        .implements(&repository_interface())
        .default_constructor::<JdbcRepository>()
        .property("table", &types::string(), |repo: &mut JdbcRepository, value| {
            repo.table = value.as_str().unwrap_or_default().to_string();
            Ok(())
        })
        .method("find", vec![types::string()], &types::string(), |repo: &JdbcRepository, args| {
            Ok(Value::from(format!("{}#{}", repo.table, args.str(0)?)))
        })
        .method("close", vec![], &types::void(), |_: &JdbcRepository, _| Ok(Value::Null))
        .on_init(move |repo: &mut JdbcRepository| {
            repo.initialized = true;
            init_log.lock().push(format!("init:{}", repo.table));
            Ok(())
        })
        .on_destroy(move |repo: &JdbcRepository| {
            log.lock().push(format!("destroy:{}", repo.table));
            Ok(())
        })
        .build()
}

#[derive(Debug, Clone)]
pub struct Greeter {
    pub greeting: String,
    pub times: i64,
    pub suffix: String,
}

impl Greeter {
    pub fn new(greeting: &str, times: i64) -> Self {
        Self {
            greeting: greeting.to_string(),
            times,
            suffix: String::new(),
        }
    }
}

static GREETER: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("Greeter")
        .constructor(vec![types::string(), types::int()], |args| {
            Ok(Greeter::new(args.str(0)?, args.int(1)?))
        })
        .constructor(vec![types::string()], |args| Ok(Greeter::new(args.str(0)?, 1)))
        .method("greet", vec![], &types::string(), |g: &Greeter, _| {
            Ok(Value::from(format!("{}{}", g.greeting, g.suffix)))
        })
        .method("greet", vec![types::string()], &types::string(), |g: &Greeter, args| {
            Ok(Value::from(format!("{}, {}{}", g.greeting, args.str(0)?, g.suffix)))
        })
        .property("suffix", &types::string(), |g: &mut Greeter, value| {
            g.suffix = value.as_str().unwrap_or_default().to_string();
            Ok(())
        })
        .property("times", &types::int(), |g: &mut Greeter, value| {
            g.times = value.as_i64().ok_or_else(|| anyhow!("times must be an i64"))?;
            Ok(())
        })
        .build()
});

pub fn greeter_class() -> Arc<ClassInfo> {
    Arc::clone(&GREETER)
}

fn new_greeter(greeting: &str, times: i64) -> Value {
    Value::from(BeanInstance::new(greeter_class(), Greeter::new(greeting, times)))
}

#[derive(Default)]
pub struct UserService {
    pub repository: Option<BeanInstance>,
    pub name: String,
}

pub fn user_service_class() -> Arc<ClassInfo> {
    ClassInfo::builder("UserService")
        .default_constructor::<UserService>()
        .constructor(vec![repository_interface()], |args| {
            Ok(UserService {
                repository: Some(args.instance(0)?),
                name: String::new(),
            })
        })
        .property("repository", &repository_interface(), |s: &mut UserService, value| {
            s.repository = value.into_instance();
            Ok(())
        })
        .property("name", &types::string(), |s: &mut UserService, value| {
            s.name = value.as_str().unwrap_or_default().to_string();
            Ok(())
        })
        .method("findUser", vec![types::string()], &types::string(), |s: &UserService, args| {
            let repository = s
                .repository
                .as_ref()
                .ok_or_else(|| anyhow!("no repository"))?;
            repository.invoke("find", vec![args.value(0)?.clone()])
        })
        .build()
}

/// 可以互相引用的节点，用于循环依赖测试
#[derive(Default)]
pub struct Node {
    pub peer: Option<BeanInstance>,
}

pub fn node_class() -> Arc<ClassInfo> {
    ClassInfo::builder("Node")
        .default_constructor::<Node>()
        .constructor(vec![types::any()], |args| {
            Ok(Node {
                peer: args.value(0)?.clone().into_instance(),
            })
        })
        .property("peer", &types::any(), |node: &mut Node, value| {
            node.peer = value.into_instance();
            Ok(())
        })
        .build()
}

pub struct Counted;

/// 构造函数较慢并记录创建次数
pub fn counted_class(created: Arc<AtomicUsize>) -> Arc<ClassInfo> {
    ClassInfo::builder("Counted")
        .constructor(vec![], move |_| {
            created.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Counted)
        })
        .build()
}

#[derive(Default)]
pub struct GreeterFactory {
    pub greeting: String,
}

/// 生产 Greeter 的 FactoryBean
pub fn greeter_factory_class() -> Arc<ClassInfo> {
    ClassInfo::builder("GreeterFactory")
        .default_constructor::<GreeterFactory>()
        .property("greeting", &types::string(), |f: &mut GreeterFactory, value| {
            f.greeting = value.as_str().unwrap_or_default().to_string();
            Ok(())
        })
        .factory_bean(Some(&greeter_class()), true, |f: &GreeterFactory| {
            Ok(new_greeter(&f.greeting, 1))
        })
        .build()
}

#[derive(Default)]
pub struct GreeterMaker;

/// 带静态工厂方法和实例工厂方法的类
pub fn greeter_maker_class() -> Arc<ClassInfo> {
    ClassInfo::builder("GreeterMaker")
        .default_constructor::<GreeterMaker>()
        .factory_method("defaultGreeter", vec![], &greeter_class(), |_| Ok(new_greeter("Hi", 1)))
        .factory_method(
            "defaultGreeter",
            vec![types::string()],
            &greeter_class(),
            |args| Ok(new_greeter(args.str(0)?, 1)),
        )
        .method("create", vec![types::string()], &greeter_class(), |_: &GreeterMaker, args| {
            Ok(new_greeter(args.str(0)?, 2))
        })
        .build()
}
