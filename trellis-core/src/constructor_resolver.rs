//! 构造函数与工厂方法解析
//!
//! 在多个候选中选出与构造参数最匹配的一个，并生成转换后的实参列表。

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::class::{type_difference_weight, ClassInfo, Executable};
use crate::constants::RAW_ARGUMENT_WEIGHT_BONUS;
use crate::convert::TypeConverter;
use crate::error::{BeansError, BeansResult};
use crate::value::Value;

/// 已解析（引用、内部 Bean 已经求值）的参数值
#[derive(Clone, Debug)]
pub struct ResolvedValueHolder {
    pub value: Value,
    pub type_name: Option<String>,
}

impl ResolvedValueHolder {
    pub fn new(value: Value, type_name: Option<String>) -> Self {
        Self { value, type_name }
    }

    fn matches_type(&self, required: &ClassInfo) -> bool {
        match &self.type_name {
            Some(type_name) => type_name == required.name(),
            None => required.is_instance(&self.value),
        }
    }
}

/// 一次解析使用的参数集合
#[derive(Clone, Debug, Default)]
pub struct ResolvedArguments {
    indexed: BTreeMap<usize, ResolvedValueHolder>,
    generic: Vec<ResolvedValueHolder>,
    min_args: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum HolderId {
    Indexed(usize),
    Generic(usize),
}

impl ResolvedArguments {
    pub fn new(
        indexed: BTreeMap<usize, ResolvedValueHolder>,
        generic: Vec<ResolvedValueHolder>,
    ) -> Self {
        let mut min_args = indexed.len() + generic.len();
        if let Some(max_index) = indexed.keys().next_back() {
            min_args = min_args.max(max_index + 1);
        }
        Self {
            indexed,
            generic,
            min_args,
        }
    }

    /// 调用方显式传入的参数：按位置使用
    pub fn explicit(values: Vec<Value>) -> Self {
        let indexed = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i, ResolvedValueHolder::new(v, None)))
            .collect();
        Self::new(indexed, Vec::new())
    }

    /// 候选至少需要的参数个数
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    fn indexed_value(
        &self,
        index: usize,
        required: &ClassInfo,
        used: &HashSet<HolderId>,
    ) -> Option<(HolderId, &ResolvedValueHolder)> {
        let id = HolderId::Indexed(index);
        if used.contains(&id) {
            return None;
        }
        let holder = self.indexed.get(&index)?;
        match &holder.type_name {
            Some(type_name) if type_name != required.name() => None,
            _ => Some((id, holder)),
        }
    }

    fn generic_value(
        &self,
        required: Option<&ClassInfo>,
        used: &HashSet<HolderId>,
    ) -> Option<(HolderId, &ResolvedValueHolder)> {
        self.generic.iter().enumerate().find_map(|(i, holder)| {
            let id = HolderId::Generic(i);
            if used.contains(&id) {
                return None;
            }
            match required {
                Some(required) if !holder.matches_type(required) => None,
                // 无类型回退只使用未声明类型的参数
                None if holder.type_name.is_some() => None,
                _ => Some((id, holder)),
            }
        })
    }
}

/// 按类型查找唯一的自动装配候选
pub trait AutowireCandidateResolver {
    /// 返回候选 Bean 的名称和解析后的值
    ///
    /// 找不到或有多个候选时返回 `NoSuchBeanOfType` / `NoUniqueBeanDefinition`，
    /// 候选本身创建失败时返回其他错误。
    fn resolve_autowired_argument(
        &self,
        required: &Arc<ClassInfo>,
        requesting_bean: &str,
    ) -> BeansResult<(String, Value)>;
}

/// 原始参数与转换后参数
#[derive(Clone, Debug)]
pub struct ArgumentsHolder {
    pub raw: Vec<Value>,
    pub converted: Vec<Value>,
}

impl ArgumentsHolder {
    /// 类型差异权重，未转换的原始参数有额外的优惠
    pub fn type_difference_weight(&self, param_types: &[Arc<ClassInfo>]) -> i32 {
        let converted = type_difference_weight(param_types, &self.converted);
        let raw = type_difference_weight(param_types, &self.raw).saturating_sub(RAW_ARGUMENT_WEIGHT_BONUS);
        raw.min(converted)
    }
}

/// 解析结果
pub struct Resolution<'e, E> {
    pub executable: &'e E,
    pub args: Vec<Value>,
    pub autowired_bean_names: Vec<String>,
}

enum CandidateError {
    /// 候选不可行，继续尝试下一个
    Unsatisfied(BeansError),
    /// 依赖创建失败等，立即终止
    Fatal(BeansError),
}

pub struct ConstructorResolver<'a> {
    converter: &'a dyn TypeConverter,
    autowirer: &'a dyn AutowireCandidateResolver,
}

impl<'a> ConstructorResolver<'a> {
    pub fn new(converter: &'a dyn TypeConverter, autowirer: &'a dyn AutowireCandidateResolver) -> Self {
        Self {
            converter,
            autowirer,
        }
    }

    /// 在候选中选择最匹配的构造函数或工厂方法
    ///
    /// `kind` 用于错误信息（"constructor" 或 "factory method"）。
    pub fn resolve<'e, E: Executable>(
        &self,
        bean_name: &str,
        mut candidates: Vec<&'e E>,
        args: &ResolvedArguments,
        autowiring: bool,
        kind: &str,
    ) -> BeansResult<Resolution<'e, E>> {
        candidates.sort_by(|a, b| b.param_types().len().cmp(&a.param_types().len()));
        let min_args = args.min_args();

        let mut chosen: Option<(&'e E, ArgumentsHolder, Vec<String>)> = None;
        let mut min_weight = i32::MAX;
        let mut last_cause: Option<BeansError> = None;

        for candidate in candidates {
            let param_count = candidate.param_types().len();
            if let Some((_, holder, _)) = &chosen {
                if holder.converted.len() > param_count {
                    // 已经找到更贪婪的可行候选
                    break;
                }
            }
            if param_count < min_args {
                return Err(BeansError::creation(
                    bean_name,
                    format!(
                        "{} {} arguments specified but no matching {} found (hint: specify index and/or type arguments for simple parameters to avoid type ambiguities)",
                        min_args, kind, kind
                    ),
                ));
            }

            match self.create_argument_array(bean_name, candidate, args, autowiring) {
                Ok((holder, autowired)) => {
                    let weight = holder.type_difference_weight(candidate.param_types());
                    tracing::trace!(
                        "Candidate {} for bean '{}' has type difference weight {}",
                        candidate.signature(),
                        bean_name,
                        weight
                    );
                    if weight < min_weight {
                        chosen = Some((candidate, holder, autowired));
                        min_weight = weight;
                    }
                }
                Err(CandidateError::Unsatisfied(cause)) => {
                    tracing::trace!(
                        "Ignoring {} for bean '{}': {}",
                        candidate.signature(),
                        bean_name,
                        cause
                    );
                    last_cause = Some(cause);
                }
                Err(CandidateError::Fatal(cause)) => return Err(cause),
            }
        }

        match chosen {
            Some((executable, holder, autowired_bean_names)) => {
                tracing::debug!(
                    "Resolved {} {} for bean '{}'",
                    kind,
                    executable.signature(),
                    bean_name
                );
                Ok(Resolution {
                    executable,
                    args: holder.converted,
                    autowired_bean_names,
                })
            }
            None => Err(BeansError::BeanCreation {
                name: bean_name.to_string(),
                message: format!(
                    "Could not resolve matching {} (hint: specify index/type/name arguments for simple parameters to avoid type ambiguities)",
                    kind
                ),
                source: last_cause.map(Box::new),
            }),
        }
    }

    fn create_argument_array<E: Executable>(
        &self,
        bean_name: &str,
        candidate: &E,
        args: &ResolvedArguments,
        autowiring: bool,
    ) -> Result<(ArgumentsHolder, Vec<String>), CandidateError> {
        let param_types = candidate.param_types();
        let mut used: HashSet<HolderId> = HashSet::new();
        let mut raw = Vec::with_capacity(param_types.len());
        let mut converted = Vec::with_capacity(param_types.len());
        let mut autowired = Vec::new();

        for (index, param) in param_types.iter().enumerate() {
            let target = || format!("{} parameter {} of type [{}]", candidate.signature(), index, param.name());

            let mut holder = args
                .indexed_value(index, param, &used)
                .or_else(|| args.generic_value(Some(param), &used));
            if holder.is_none() && !autowiring {
                holder = args.generic_value(None, &used);
            }

            match holder {
                Some((id, holder)) => {
                    used.insert(id);
                    let value = self
                        .converter
                        .convert_if_necessary(&holder.value, param)
                        .map_err(|e| {
                            CandidateError::Unsatisfied(BeansError::UnsatisfiedDependency {
                                name: bean_name.to_string(),
                                target: target(),
                                message: e.to_string(),
                            })
                        })?;
                    raw.push(holder.value.clone());
                    converted.push(value);
                }
                None if !autowiring => {
                    return Err(CandidateError::Unsatisfied(BeansError::UnsatisfiedDependency {
                        name: bean_name.to_string(),
                        target: target(),
                        message: "Ambiguous argument values for parameter - did you specify the correct bean references as arguments?".to_string(),
                    }));
                }
                None => {
                    let (autowired_name, value) = self
                        .autowirer
                        .resolve_autowired_argument(param, bean_name)
                        .map_err(|e| match e {
                            BeansError::NoSuchBeanOfType { .. }
                            | BeansError::NoUniqueBeanDefinition { .. } => {
                                CandidateError::Unsatisfied(BeansError::UnsatisfiedDependency {
                                    name: bean_name.to_string(),
                                    target: target(),
                                    message: e.to_string(),
                                })
                            }
                            other => CandidateError::Fatal(other),
                        })?;
                    raw.push(value.clone());
                    converted.push(value);
                    autowired.push(autowired_name);
                }
            }
        }

        Ok((ArgumentsHolder { raw, converted }, autowired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{types, ConstructorInfo};
    use crate::convert::SimpleTypeConverter;
    use crate::fixtures;

    struct NoAutowire;

    impl AutowireCandidateResolver for NoAutowire {
        fn resolve_autowired_argument(
            &self,
            required: &Arc<ClassInfo>,
            _requesting_bean: &str,
        ) -> BeansResult<(String, Value)> {
            Err(BeansError::NoSuchBeanOfType {
                type_name: required.name().to_string(),
            })
        }
    }

    fn generic(values: Vec<Value>) -> ResolvedArguments {
        ResolvedArguments::new(
            BTreeMap::new(),
            values
                .into_iter()
                .map(|v| ResolvedValueHolder::new(v, None))
                .collect(),
        )
    }

    fn resolve_greeter(args: &ResolvedArguments) -> BeansResult<(String, Vec<Value>)> {
        let class = fixtures::greeter_class();
        let converter = SimpleTypeConverter::new();
        let resolver = ConstructorResolver::new(&converter, &NoAutowire);
        let candidates: Vec<&ConstructorInfo> = class.constructors().iter().collect();
        resolver
            .resolve("greeter", candidates, args, false, "constructor")
            .map(|r| (r.executable.signature(), r.args))
    }

    #[test]
    fn test_single_string_picks_one_arg_constructor() {
        let (signature, args) = resolve_greeter(&generic(vec![Value::from("Hello")])).unwrap();
        assert_eq!(signature, "Greeter(String)");
        assert_eq!(args, vec![Value::from("Hello")]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let args = generic(vec![Value::from("Hello"), Value::from("3")]);
        let first = resolve_greeter(&args).unwrap();
        for _ in 0..10 {
            assert_eq!(resolve_greeter(&args).unwrap(), first);
        }
        assert_eq!(first.0, "Greeter(String, i64)");
        assert_eq!(first.1, vec![Value::from("Hello"), Value::Int(3)]);
    }

    #[test]
    fn test_typed_generic_matched_by_declared_type() {
        let args = ResolvedArguments::new(
            BTreeMap::new(),
            vec![
                ResolvedValueHolder::new(Value::from("7"), Some("i64".to_string())),
                ResolvedValueHolder::new(Value::from("Hi"), None),
            ],
        );
        let (signature, values) = resolve_greeter(&args).unwrap();
        assert_eq!(signature, "Greeter(String, i64)");
        assert_eq!(values, vec![Value::from("Hi"), Value::Int(7)]);
    }

    #[test]
    fn test_too_many_arguments_fails_fast() {
        let args = generic(vec![Value::from("a"), Value::Int(1), Value::Int(2)]);
        let err = resolve_greeter(&args).unwrap_err();
        assert!(err
            .to_string()
            .contains("3 constructor arguments specified but no matching constructor found"));
    }

    #[test]
    fn test_unconvertible_arguments_report_last_cause() {
        let args = generic(vec![Value::List(Vec::new())]);
        let err = resolve_greeter(&args).unwrap_err();
        match err {
            BeansError::BeanCreation {
                message, source, ..
            } => {
                assert!(message.starts_with("Could not resolve matching constructor"));
                assert!(matches!(
                    source.as_deref(),
                    Some(BeansError::UnsatisfiedDependency { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_explicit_arguments_are_positional() {
        let args = ResolvedArguments::explicit(vec![Value::from("Hey"), Value::from("5")]);
        let (signature, values) = resolve_greeter(&args).unwrap();
        assert_eq!(signature, "Greeter(String, i64)");
        assert_eq!(values, vec![Value::from("Hey"), Value::Int(5)]);

        let bad = ResolvedArguments::explicit(vec![Value::Int(1), Value::from("not-a-number")]);
        assert!(resolve_greeter(&bad)
            .unwrap_err()
            .to_string()
            .contains("2 constructor arguments specified"));
    }

    #[test]
    fn test_raw_weight_prefers_unconverted_match() {
        let holder = ArgumentsHolder {
            raw: vec![Value::from("1")],
            converted: vec![Value::from("1")],
        };
        assert_eq!(holder.type_difference_weight(&[types::string()]), -RAW_ARGUMENT_WEIGHT_BONUS);
        assert_eq!(holder.type_difference_weight(&[types::any()]), 2 - RAW_ARGUMENT_WEIGHT_BONUS);
    }
}
