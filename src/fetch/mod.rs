use async_trait::async_trait;

use crate::error::LookupError;
use crate::records::StreamerRecord;

pub mod client;
pub mod decode;

pub use client::KickClient;
pub use decode::normalize_channel;

pub type LookupResult = std::result::Result<StreamerRecord, LookupError>;

/// One lookup per identifier. Implementations must not retry; retry policy
/// belongs to the acquirer.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_record(&self, identifier: &str) -> LookupResult;
}
