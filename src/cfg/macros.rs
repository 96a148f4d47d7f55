//! 配置管理相关的宏定义
//!
//! 提供简化 From trait 实现的宏

/// 为配置类型自动实现 From trait
///
/// 支持两种模式：
/// 1. `impl_from!(ConfigType => Type)` - 调用 Type::new(config)
/// 2. `impl_from!(ConfigType => Type, field: config)` - 使用 Self { config }
#[macro_export]
macro_rules! impl_from {
    ($config_type:ty => $target_type:ty) => {
        impl From<$config_type> for $target_type {
            fn from(config: $config_type) -> Self {
                <$target_type>::new(config)
            }
        }
    };

    ($config_type:ty => $target_type:ty, field: $field:ident) => {
        impl From<$config_type> for $target_type {
            fn from(config: $config_type) -> Self {
                Self { $field: config }
            }
        }
    };
}

/// 为可能失败的构造函数实现 TryFrom trait
///
/// 用法：`impl_try_from!(ConfigType => Type)`，调用 `Type::new(config)`，
/// 其返回值需为 `Result<Type, E>`
#[macro_export]
macro_rules! impl_try_from {
    ($config_type:ty => $target_type:ty, error: $error:ty) => {
        impl TryFrom<$config_type> for $target_type {
            type Error = $error;

            fn try_from(config: $config_type) -> ::core::result::Result<Self, Self::Error> {
                <$target_type>::new(config)
            }
        }
    };
}

/// 为 Box<T> 类型自动实现到 Box<dyn Trait> 的转换
///
/// 用法：`impl_box_from!(Type => dyn TraitName)`
#[macro_export]
macro_rules! impl_box_from {
    ($source_type:ty => dyn $trait_name:path) => {
        impl From<Box<$source_type>> for Box<dyn $trait_name> {
            fn from(source: Box<$source_type>) -> Self {
                source as Box<dyn $trait_name>
            }
        }
    };
}
