// 类型注册表和工厂函数

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use super::type_options::TypeOptions;

// 返回 Box<dyn Any>，实际包含的是 Box<dyn Trait>
type TraitConstructor =
    Box<dyn Fn(JsonValue) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

// Trait 注册表：外层 key 为 Trait 的 TypeId，内层 key 为类型名称
static TRAIT_REGISTRY: Lazy<RwLock<HashMap<TypeId, HashMap<String, TraitConstructor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 为实现特定 Trait 的类型注册构造函数
///
/// 构造通过 `TryFrom<Config>` 完成，因此既支持 `From<Config>`（永不失败），
/// 也支持在构造时校验配置（例如凭证文件不存在）的类型。
///
/// # 示例
/// ```ignore
/// register_trait::<FileChannel, dyn LogChannel, FileChannelConfig>("FileChannel")?;
///
/// let channel: Box<dyn LogChannel> = create_trait_from_type_options(&type_options)?;
/// ```
pub fn register_trait<T, Trait, Config>(type_name: &str) -> Result<()>
where
    T: Send + Sync + 'static,
    Trait: ?Sized + Send + Sync + 'static,
    Config: DeserializeOwned + Send + Sync + 'static,
    T: TryFrom<Config>,
    <T as TryFrom<Config>>::Error: Into<anyhow::Error>,
    Box<T>: Into<Box<Trait>>,
{
    let type_name = type_name.to_string();
    let trait_id = TypeId::of::<Trait>();

    let constructor: TraitConstructor = Box::new(move |value| {
        // options 缺省时按空对象处理，让 #[serde(default)] 生效
        let value = if value.is_null() {
            JsonValue::Object(Default::default())
        } else {
            value
        };
        let config: Config = serde_json::from_value(value)?;
        let instance = T::try_from(config).map_err(Into::into)?;
        let trait_object: Box<Trait> = Box::new(instance).into();
        Ok(Box::new(trait_object) as Box<dyn Any + Send + Sync>)
    });

    let mut registry = TRAIT_REGISTRY
        .write()
        .map_err(|_| anyhow!("Failed to acquire write lock"))?;
    registry
        .entry(trait_id)
        .or_insert_with(HashMap::new)
        .insert(type_name, constructor);

    Ok(())
}

/// 检查某个类型名是否已为 Trait 注册
pub fn is_registered<Trait>(type_name: &str) -> bool
where
    Trait: ?Sized + 'static,
{
    TRAIT_REGISTRY
        .read()
        .map(|registry| {
            registry
                .get(&TypeId::of::<Trait>())
                .is_some_and(|types| types.contains_key(type_name))
        })
        .unwrap_or(false)
}

/// 根据 TypeOptions 创建 trait object
pub fn create_trait_from_type_options<Trait>(type_options: &TypeOptions) -> Result<Box<Trait>>
where
    Trait: ?Sized + Send + Sync + 'static,
{
    let trait_id = TypeId::of::<Trait>();
    let registry = TRAIT_REGISTRY
        .read()
        .map_err(|_| anyhow!("Failed to acquire read lock"))?;

    let trait_registry = registry
        .get(&trait_id)
        .ok_or_else(|| anyhow!("No implementations registered for trait"))?;

    let constructor = trait_registry.get(&type_options.type_name).ok_or_else(|| {
        anyhow!(
            "Type '{}' not registered for this trait",
            type_options.type_name
        )
    })?;

    let any_box = constructor(type_options.options.clone())?;

    any_box
        .downcast::<Box<Trait>>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("Failed to downcast to target trait type"))
}
