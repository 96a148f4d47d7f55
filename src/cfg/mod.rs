//! cfg 模块 - 配置管理
//!
//! 基于 `TypeOptions` 的零耦合构造：通过类型名在注册表中查找构造函数，
//! 由 options 反序列化出具体配置，再创建 trait object。

pub mod macros;
pub mod registry;
pub mod type_options;

pub use registry::{create_trait_from_type_options, is_registered, register_trait};
pub use type_options::{parse_by_extension, TypeOptions};
