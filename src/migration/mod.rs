mod direction;
mod error;
mod set;

pub use direction::MigrationDirection;
pub use error::{MigrationError, MigrationErrorKind};
pub use set::{MigrationSet, Plan, Target};

use futures_util::future::BoxFuture;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;


/// What every migration body resolves to: success, or the cause of failure.
pub type MethodResult = anyhow::Result<()>;

/// The future returned by a conforming migration method.
pub type MethodFuture<'a> = BoxFuture<'a, MethodResult>;


/// A zero-argument migration body, already bound to whatever it operates on.
pub trait UnitBody: Send + Sync {
    fn invoke(&self) -> MethodFuture<'_>;
}

struct FnBody<F>(F);

impl<F> UnitBody for FnBody<F>
where
    F: Fn() -> MethodFuture<'static> + Send + Sync,
{
    fn invoke(&self) -> MethodFuture<'_> {
        (self.0)()
    }
}


/// Identity of a migration unit inside a [`MigrationSet`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitKey {
    pub version: i64,
    pub description: String,
    pub direction: MigrationDirection,
}

impl UnitKey {
    pub fn new(version: i64, description: impl Into<String>, direction: MigrationDirection) -> Self {
        UnitKey { version, description: description.into(), direction }
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}_{}_{}", self.version, self.description, self.direction)
    }
}


/// One direction of one schema/data change.
#[derive(Clone)]
pub struct MigrationUnit {
    key: UnitKey,
    /// Name the unit was registered under, e.g. `V001_init_users_up`.
    name: String,
    body: Arc<dyn UnitBody>,
}

impl MigrationUnit {
    pub fn new(key: UnitKey, name: impl Into<String>, body: Arc<dyn UnitBody>) -> Self {
        MigrationUnit { key, name: name.into(), body }
    }

    /// Builds a unit from a plain closure. The name is derived from the key.
    pub fn from_fn<F>(version: i64, description: &str, direction: MigrationDirection, f: F) -> Self
    where
        F: Fn() -> MethodFuture<'static> + Send + Sync + 'static,
    {
        let key = UnitKey::new(version, description, direction);
        let name = key.to_string();
        MigrationUnit::new(key, name, Arc::new(FnBody(f)))
    }

    pub fn key(&self) -> &UnitKey {
        &self.key
    }

    pub fn version(&self) -> i64 {
        self.key.version
    }

    pub fn description(&self) -> &str {
        &self.key.description
    }

    pub fn direction(&self) -> MigrationDirection {
        self.key.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the unit body once.
    pub async fn apply(&self) -> MethodResult {
        self.body.invoke().await
    }
}

impl fmt::Debug for MigrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationUnit")
            .field("key", &self.key)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
