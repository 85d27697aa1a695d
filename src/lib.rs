pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::SentinelConfig;

pub use adapters::{
    DeepProxyCheck, JsonlSink, MediaWikiClient, QuickProxyCheck, SorbsDnsbl, SseChangeStream,
};
pub use core::controller::Sentinel;
pub use domain::model::Finding;
pub use utils::error::{Result, SentinelError};
