pub mod blocklog;
pub mod controller;
pub mod reports;
pub mod revert;

pub use crate::domain::model::{Finding, RecentChange};
pub use crate::domain::ports::{ChangeStream, DnsblLookup, FindingSink, ProxyChecker, WikiClient};
pub use crate::utils::error::Result;
