/// 核心常量定义
///
/// 容器、类型元数据和构造器解析共用的名称与数值，集中在这里避免硬编码

/// 解引用 FactoryBean 本身（而不是它生产的对象）时使用的名称前缀
pub const FACTORY_BEAN_PREFIX: &str = "&";

/// 内部 Bean 自动生成名称的前缀
pub const INNER_BEAN_PREFIX: &str = "(inner bean)";

/// 自动生成的 Bean 名称中的分隔符
pub const GENERATED_BEAN_NAME_SEPARATOR: &str = "#";

/// 作用域名称
pub const SCOPE_SINGLETON: &str = "singleton";
pub const SCOPE_PROTOTYPE: &str = "prototype";

/// 排序常量（数值越小优先级越高）
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// 构造器解析时，未经转换的原始参数相对转换后参数的权重优惠
pub const RAW_ARGUMENT_WEIGHT_BONUS: i32 = 1024;

/// 内置类型名称
pub const ANY_TYPE: &str = "Any";
pub const BOOL_TYPE: &str = "bool";
pub const INT_TYPE: &str = "i64";
pub const FLOAT_TYPE: &str = "f64";
pub const STRING_TYPE: &str = "String";
pub const LIST_TYPE: &str = "List";
pub const VOID_TYPE: &str = "Void";

/// 所有内置类型名称
pub const BUILTIN_TYPE_NAMES: &[&str] = &[
    ANY_TYPE,
    BOOL_TYPE,
    INT_TYPE,
    FLOAT_TYPE,
    STRING_TYPE,
    LIST_TYPE,
    VOID_TYPE,
];

/// 检查名称是否为 FactoryBean 解引用（以 `&` 开头）
pub fn is_factory_dereference(name: &str) -> bool {
    name.starts_with(FACTORY_BEAN_PREFIX)
}

/// 去掉所有 FactoryBean 解引用前缀
pub fn strip_factory_prefix(name: &str) -> &str {
    name.trim_start_matches(FACTORY_BEAN_PREFIX)
}

/// 内置的“简单”类型：自动装配时不会被当作 Bean 依赖
pub fn is_simple_type_name(type_name: &str) -> bool {
    BUILTIN_TYPE_NAMES.contains(&type_name) && type_name != ANY_TYPE
}
