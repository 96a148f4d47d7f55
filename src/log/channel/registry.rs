use anyhow::Result;

use crate::cfg::{create_trait_from_type_options, register_trait, TypeOptions};
use crate::log::channel::{
    AggregationChannel, AggregationChannelConfig, ConsoleChannel, ConsoleChannelConfig, FileChannel,
    FileChannelConfig, LogChannel, NotifierChannel, NotifierChannelConfig, StorageChannel,
    StorageChannelConfig,
};

/// 注册所有 Channel 实现
pub fn register_channels() -> Result<()> {
    register_trait::<ConsoleChannel, dyn LogChannel, ConsoleChannelConfig>("ConsoleChannel")?;
    register_trait::<FileChannel, dyn LogChannel, FileChannelConfig>("FileChannel")?;
    register_trait::<StorageChannel, dyn LogChannel, StorageChannelConfig>("StorageChannel")?;
    register_trait::<AggregationChannel, dyn LogChannel, AggregationChannelConfig>("AggregationChannel")?;
    register_trait::<NotifierChannel, dyn LogChannel, NotifierChannelConfig>("NotifierChannel")?;
    Ok(())
}

/// 从 TypeOptions 创建 Channel
pub fn create_channel_from_options(options: &TypeOptions) -> Result<Box<dyn LogChannel>> {
    create_trait_from_type_options(options)
}
