pub mod dnsbl;
pub mod mediawiki;
pub mod proxy;
pub mod sink;
pub mod stream;

pub use dnsbl::SorbsDnsbl;
pub use mediawiki::MediaWikiClient;
pub use proxy::{DeepProxyCheck, QuickProxyCheck};
pub use sink::JsonlSink;
pub use stream::SseChangeStream;
