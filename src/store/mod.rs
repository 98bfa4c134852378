mod error;
mod memory;
mod postgres;

pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;


/// Persistence for the version cursor.
///
/// `current_version` returns 0 when nothing has ever been applied; it never
/// reports an empty store as an error.
#[async_trait::async_trait]
pub trait VersionStore: Send {
    async fn current_version(&mut self) -> Result<i64, StoreError>;
    async fn set_current_version(&mut self, version: i64) -> Result<(), StoreError>;
}
