pub mod cli;
pub mod executor;
pub mod migration;
pub mod receiver;
pub mod registry;
pub mod sample;
pub mod store;

#[cfg(test)]
mod testing;

pub use cli::error::SwellowError;
pub use executor::{CancelSignal, Executor, Run};
pub use migration::{MethodFuture, MethodResult, MigrationDirection, MigrationError, MigrationSet, Plan, Target};
pub use receiver::{MethodTable, Receiver};
pub use registry::{Registration, Registry};
pub use store::{MemoryStore, PostgresStore, StoreError, VersionStore};
