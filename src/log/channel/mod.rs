mod aggregation_channel;
mod cloud_logging_client;
mod console_channel;
mod file_channel;
mod notifier_channel;
mod registry;
mod storage_channel;
mod trait_;

pub use aggregation_channel::{AggregationChannel, AggregationChannelConfig, SubLogger};
pub use cloud_logging_client::{
    CloudLoggingClient, CloudLoggingService, EntryPayload, LogEntry, MonitoredResource,
    SinkDestination, SinkRequest,
};
pub use console_channel::{ConsoleChannel, ConsoleChannelConfig};
pub use file_channel::{FileChannel, FileChannelConfig};
pub use notifier_channel::{NotifierChannel, NotifierChannelConfig};
pub use registry::{create_channel_from_options, register_channels};
pub use storage_channel::{StorageChannel, StorageChannelConfig};
pub use trait_::{LinkProvider, LogChannel};

#[cfg(test)]
pub(crate) use aggregation_channel::tests::RecordingService;
#[cfg(test)]
pub(crate) use console_channel::tests::SharedBuffer;
