//! 测试共用的类型元数据

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use thiserror::Error;
use trellis_core::{types, BeanInstance, ClassInfo, Value};

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[derive(Debug, Error)]
#[error("account '{0}' not found")]
pub struct AccountNotFound(pub String);

static ACCOUNT_SERVICE: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::interface("AccountService")
        .abstract_method("save", vec![types::string()], &types::string())
        .abstract_method("load", vec![types::string()], &types::string())
        .build()
});

pub fn account_service_interface() -> Arc<ClassInfo> {
    Arc::clone(&ACCOUNT_SERVICE)
}

pub struct AccountServiceImpl {
    log: EventLog,
}

static ACCOUNT_SERVICE_IMPL: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("AccountServiceImpl")
        .implements(&ACCOUNT_SERVICE)
        .method("save", vec![types::string()], &types::string(), |s: &AccountServiceImpl, args| {
            let name = args.str(0)?;
            s.log.lock().push(format!("save:{}", name));
            Ok(Value::from(format!("saved:{}", name)))
        })
        .method("load", vec![types::string()], &types::string(), |s: &AccountServiceImpl, args| {
            let name = args.str(0)?;
            if name == "missing" {
                return Err(AccountNotFound(name.to_string()).into());
            }
            s.log.lock().push(format!("load:{}", name));
            Ok(Value::from(format!("loaded:{}", name)))
        })
        .method("audit", vec![], &types::string(), |_: &AccountServiceImpl, _| {
            Ok(Value::from("audited"))
        })
        .build()
});

pub fn account_service_class() -> Arc<ClassInfo> {
    Arc::clone(&ACCOUNT_SERVICE_IMPL)
}

pub fn account_service(log: EventLog) -> BeanInstance {
    BeanInstance::new(account_service_class(), AccountServiceImpl { log })
}

pub struct ReportGenerator;

static REPORT_GENERATOR: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("ReportGenerator")
        .method("load", vec![types::string()], &types::string(), |_: &ReportGenerator, args| {
            Ok(Value::from(format!("report:{}", args.str(0)?)))
        })
        .build()
});

/// 没有接口、只有 load 方法的类
pub fn report_generator_class() -> Arc<ClassInfo> {
    Arc::clone(&REPORT_GENERATOR)
}

pub fn report_generator() -> BeanInstance {
    BeanInstance::new(report_generator_class(), ReportGenerator)
}

static AUDITABLE: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::interface("Auditable")
        .abstract_method("lastModifiedBy", vec![], &types::string())
        .build()
});

/// 用于引入的接口
pub fn auditable_interface() -> Arc<ClassInfo> {
    Arc::clone(&AUDITABLE)
}

pub struct AuditableSupport {
    user: String,
}

static AUDITABLE_SUPPORT: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("AuditableSupport")
        .implements(&AUDITABLE)
        .method("lastModifiedBy", vec![], &types::string(), |a: &AuditableSupport, _| {
            Ok(Value::from(a.user.clone()))
        })
        .build()
});

pub fn auditable_delegate(user: &str) -> BeanInstance {
    BeanInstance::new(
        Arc::clone(&AUDITABLE_SUPPORT),
        AuditableSupport {
            user: user.to_string(),
        },
    )
}

pub struct AuditedReport;

static AUDITED_REPORT: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("AuditedReport")
        .implements(&AUDITABLE)
        .method("generate", vec![], &types::string(), |_: &AuditedReport, _| {
            Ok(Value::from("generated"))
        })
        .build()
});

/// 声明实现 Auditable 但自身没有实现方法的类
pub fn audited_report_class() -> Arc<ClassInfo> {
    Arc::clone(&AUDITED_REPORT)
}

pub struct Archive;

static BASE_ARCHIVE: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("BaseArchive")
        .method("save", vec![types::string()], &types::string(), |_: &Archive, args| {
            Ok(Value::from(format!("archived:{}", args.str(0)?)))
        })
        .build()
});

static TAPE_ARCHIVE: Lazy<Arc<ClassInfo>> = Lazy::new(|| {
    ClassInfo::builder("TapeArchive")
        .extends(&BASE_ARCHIVE)
        .method("rewind", vec![], &types::string(), |_: &Archive, _| Ok(Value::from("rewound")))
        .build()
});

/// 只从父类继承 save 的类
pub fn tape_archive_class() -> Arc<ClassInfo> {
    Arc::clone(&TAPE_ARCHIVE)
}

pub fn tape_archive() -> BeanInstance {
    BeanInstance::new(tape_archive_class(), Archive)
}
