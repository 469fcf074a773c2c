//! 类型转换

use std::collections::HashMap;
use std::sync::Arc;

use crate::class::ClassInfo;
use crate::constants::{BOOL_TYPE, FLOAT_TYPE, INT_TYPE, LIST_TYPE, STRING_TYPE};
use crate::error::{BeansError, BeansResult};
use crate::value::Value;

/// 把配置值转换为参数或属性需要的类型
pub trait TypeConverter: Send + Sync {
    fn convert_if_necessary(&self, value: &Value, required: &ClassInfo) -> BeansResult<Value>;
}

/// 自定义转换函数
pub type ConversionFn = Arc<dyn Fn(&Value) -> anyhow::Result<Value> + Send + Sync>;

/// 默认的类型转换器
///
/// 支持字符串到标量的解析、整数到浮点、标量到字符串、单值到列表，
/// 以及按目标类型名注册的自定义转换。
#[derive(Clone, Default)]
pub struct SimpleTypeConverter {
    custom: HashMap<String, ConversionFn>,
}

impl SimpleTypeConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为目标类型注册转换函数，仅在值不能直接赋值时使用
    pub fn register_converter<F>(&mut self, target_type: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.custom.insert(target_type.into(), Arc::new(f));
    }

    fn mismatch(value: &Value, required: &ClassInfo, message: impl Into<String>) -> BeansError {
        BeansError::TypeMismatch {
            value_type: value.type_name(),
            required_type: required.name().to_string(),
            message: message.into(),
        }
    }
}

impl TypeConverter for SimpleTypeConverter {
    fn convert_if_necessary(&self, value: &Value, required: &ClassInfo) -> BeansResult<Value> {
        if required.is_instance(value) {
            return Ok(value.clone());
        }

        if let Some(custom) = self.custom.get(required.name()) {
            let converted = custom(value).map_err(|e| Self::mismatch(value, required, e.to_string()))?;
            if !required.is_instance(&converted) {
                return Err(Self::mismatch(
                    value,
                    required,
                    format!("custom converter produced a value of type [{}]", converted.type_name()),
                ));
            }
            return Ok(converted);
        }

        match (value, required.name()) {
            (Value::Str(s), INT_TYPE) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| Self::mismatch(value, required, e.to_string())),
            (Value::Str(s), FLOAT_TYPE) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| Self::mismatch(value, required, e.to_string())),
            (Value::Str(s), BOOL_TYPE) => parse_bool(s)
                .map(Value::Bool)
                .ok_or_else(|| Self::mismatch(value, required, format!("invalid boolean value '{}'", s))),
            (Value::Int(i), FLOAT_TYPE) => Ok(Value::Float(*i as f64)),
            (Value::Int(i), STRING_TYPE) => Ok(Value::Str(i.to_string())),
            (Value::Float(f), STRING_TYPE) => Ok(Value::Str(f.to_string())),
            (Value::Bool(b), STRING_TYPE) => Ok(Value::Str(b.to_string())),
            (Value::Null, _) => Err(Self::mismatch(
                value,
                required,
                "null cannot be assigned to a primitive type",
            )),
            (single, LIST_TYPE) => Ok(Value::List(vec![single.clone()])),
            _ => Err(Self::mismatch(value, required, "no matching conversion found")),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}
