use async_trait::async_trait;

use crate::error::LicenseError;
use crate::record::LicenseRecord;

mod hybrid;
mod local;
mod memory;
mod remote;

pub use hybrid::HybridBackend;
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use remote::RemoteBackend;

/// Storage for license records
///
/// The gate holds all validation rules; backends only persist records.
#[async_trait]
pub trait LicenseBackend: Send + Sync {
    /// Fetch a record by key
    async fn get(&self, key: &str) -> Result<Option<LicenseRecord>, LicenseError>;

    /// Insert or replace a record
    async fn put(&self, record: &LicenseRecord) -> Result<(), LicenseError>;

    /// Remove a record; `false` when it did not exist
    async fn delete(&self, key: &str) -> Result<bool, LicenseError>;

    /// Every record
    async fn list(&self) -> Result<Vec<LicenseRecord>, LicenseError>;

    /// Short name for logs and status output
    fn name(&self) -> &'static str;
}
