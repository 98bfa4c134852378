//! Driver name to receiver association.
//!
//! A [`Registry`] is built once at startup and handed by reference to whatever
//! resolves drivers; tests build their own.
use crate::executor::{CancelSignal, Executor, Run};
use crate::migration::{MigrationError, MigrationErrorKind, MigrationSet, Plan, Target};
use crate::receiver::{self, InvalidCandidate, Receiver};
use crate::store::VersionStore;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;


/// A registered receiver together with the set derived from it.
pub struct Registration {
    driver: String,
    receiver: Arc<dyn Any + Send + Sync>,
    migrations: MigrationSet,
    diagnostics: Vec<InvalidCandidate>,
    run_lock: Mutex<()>,
}

impl Registration {
    fn new<R: Receiver>(driver: &str, receiver: Arc<R>) -> Result<Self, MigrationError> {
        let scan = receiver::scan(Arc::clone(&receiver));
        let migrations = MigrationSet::build(scan.units)?;

        tracing::info!(
            "Registered receiver for driver '{driver}': {} unit(s), {} invalid candidate(s)",
            migrations.len(),
            scan.diagnostics.len(),
        );

        Ok(Registration {
            driver: driver.to_string(),
            receiver,
            migrations,
            diagnostics: scan.diagnostics,
            run_lock: Mutex::new(()),
        })
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// The receiver itself, if it is an `R`.
    pub fn receiver<R: Receiver>(&self) -> Option<Arc<R>> {
        Arc::clone(&self.receiver).downcast::<R>().ok()
    }

    pub fn migrations(&self) -> &MigrationSet {
        &self.migrations
    }

    pub fn diagnostics(&self) -> &[InvalidCandidate] {
        &self.diagnostics
    }

    /// Plan a run towards `target` from the cursor currently in `store`.
    pub async fn plan<S>(&self, store: &mut S, target: Target) -> Result<Plan, MigrationError>
    where
        S: VersionStore + ?Sized,
    {
        let current = store.current_version().await?;
        tracing::info!("Current version resolved: {current}");
        self.migrations.pending(current, self.migrations.resolve(current, target))
    }

    /// Read the cursor, plan towards `target` and run the plan.
    ///
    /// Runs against the same registration are serialized.
    pub async fn migrate<S>(&self, store: &mut S, target: Target, cancel: &CancelSignal) -> Result<Run, MigrationError>
    where
        S: VersionStore + ?Sized,
    {
        let _guard = self.run_lock.lock().await;
        self.migrate_locked(store, target, cancel).await
    }

    /// Roll back the most recent version, then apply it again.
    pub async fn redo<S>(&self, store: &mut S, cancel: &CancelSignal) -> Result<Vec<Run>, MigrationError>
    where
        S: VersionStore + ?Sized,
    {
        let _guard = self.run_lock.lock().await;
        let current = store.current_version().await?;
        if current == 0 {
            tracing::info!("Nothing applied yet - nothing to redo");
            return Ok(Vec::new());
        }

        let down = self.migrate_locked(store, Target::Steps(-1), cancel).await?;
        let up = self.migrate_locked(store, Target::Version(current), cancel).await?;
        Ok(vec![down, up])
    }

    /// Roll everything back, then apply everything.
    pub async fn reset<S>(&self, store: &mut S, cancel: &CancelSignal) -> Result<Vec<Run>, MigrationError>
    where
        S: VersionStore + ?Sized,
    {
        let _guard = self.run_lock.lock().await;
        let down = self.migrate_locked(store, Target::Version(0), cancel).await?;
        let up = self.migrate_locked(store, Target::Latest, cancel).await?;
        Ok(vec![down, up])
    }

    async fn migrate_locked<S>(&self, store: &mut S, target: Target, cancel: &CancelSignal) -> Result<Run, MigrationError>
    where
        S: VersionStore + ?Sized,
    {
        let plan = self.plan(store, target).await?;
        Executor::new(store).with_cancel(cancel.clone()).run(&plan).await
    }
}


#[derive(Default)]
pub struct Registry {
    registrations: HashMap<String, Arc<Registration>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `receiver` with `driver`, scanning it once.
    ///
    /// Fails on a second registration for the same driver, or when the
    /// receiver exposes the same unit twice.
    pub fn register<R: Receiver>(&mut self, driver: &str, receiver: R) -> Result<Arc<Registration>, MigrationError> {
        if self.registrations.contains_key(driver) {
            return Err(MigrationError::new(MigrationErrorKind::DuplicateReceiver(driver.to_string())));
        }

        let registration = Arc::new(Registration::new(driver, Arc::new(receiver))?);
        self.registrations.insert(driver.to_string(), Arc::clone(&registration));
        Ok(registration)
    }

    pub fn resolve(&self, driver: &str) -> Result<Arc<Registration>, MigrationError> {
        self.registrations
            .get(driver)
            .cloned()
            .ok_or_else(|| MigrationError::new(MigrationErrorKind::UnknownDriver(driver.to_string())))
    }

    /// Registered driver names, sorted.
    pub fn drivers(&self) -> Vec<&str> {
        let mut drivers: Vec<&str> = self.registrations.keys().map(String::as_str).collect();
        drivers.sort_unstable();
        drivers
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{MethodFuture, MigrationDirection};
    use crate::receiver::MethodTable;
    use crate::store::MemoryStore;
    use crate::testing::{Documents, SampleDocumentMigrator};
    use futures_util::FutureExt;

    fn registry_with_sample(docs: &Documents) -> (Registry, Arc<Registration>) {
        let mut registry = Registry::new();
        let registration = registry
            .register("generic", SampleDocumentMigrator::new(docs.clone()))
            .unwrap();
        (registry, registration)
    }

    #[test]
    fn duplicate_driver_is_rejected() {
        let (mut registry, _) = registry_with_sample(&Documents::default());
        let err = registry
            .register("generic", SampleDocumentMigrator::new(Documents::default()))
            .err()
            .unwrap();
        assert!(matches!(err.kind, MigrationErrorKind::DuplicateReceiver(ref d) if d == "generic"));
    }

    #[test]
    fn unknown_driver_is_reported() {
        let (registry, _) = registry_with_sample(&Documents::default());
        let err = registry.resolve("mongodb").err().unwrap();
        assert!(matches!(err.kind, MigrationErrorKind::UnknownDriver(ref d) if d == "mongodb"));
        assert_eq!(registry.drivers(), ["generic"]);
    }

    #[test]
    fn registration_keeps_set_diagnostics_and_receiver() {
        let (registry, registration) = registry_with_sample(&Documents::default());
        let resolved = registry.resolve("generic").unwrap();
        assert!(Arc::ptr_eq(&registration, &resolved));
        assert_eq!(resolved.driver(), "generic");
        assert_eq!(resolved.migrations().len(), 8);
        assert_eq!(resolved.diagnostics().len(), 2);
        assert!(resolved.receiver::<SampleDocumentMigrator>().is_some());
    }

    struct Padded;

    #[allow(non_snake_case)]
    impl Padded {
        fn V1_seed_up(&self) -> MethodFuture<'_> {
            async { Ok(()) }.boxed()
        }
        fn V001_seed_up(&self) -> MethodFuture<'_> {
            async { Ok(()) }.boxed()
        }
    }

    impl Receiver for Padded {
        fn methods() -> MethodTable<Self> {
            crate::methods!(Padded => [V1_seed_up, V001_seed_up])
        }
    }

    #[test]
    fn same_unit_under_two_spellings_fails_registration() {
        let mut registry = Registry::new();
        let err = registry.register("padded", Padded).err().unwrap();
        assert!(matches!(err.kind, MigrationErrorKind::DuplicateUnit(ref key) if key.to_string() == "V1_seed_up"));
        assert!(registry.resolve("padded").is_err());
    }

    #[tokio::test]
    async fn up_then_down_restores_the_store() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let mut store = MemoryStore::new();
        let cancel = CancelSignal::new();
        let before = docs.snapshot();

        let run = registration.migrate(&mut store, Target::Latest, &cancel).await.unwrap();
        assert_eq!(run.applied_version, 2);
        let applied = docs.snapshot();
        assert!(applied["users"].iter().any(|u| u["name"] == "Cleopatra"));
        assert!(applied["organizations"].iter().all(|o| o.contains_key("headquarters")));

        let run = registration.migrate(&mut store, Target::Version(0), &cancel).await.unwrap();
        assert_eq!(run.direction, MigrationDirection::Down);
        assert_eq!(run.applied_version, 0);
        assert_eq!(docs.snapshot(), before);
        assert_eq!(store.current_version().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn init_users_round_trip() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let up = registration.migrations().pending(0, 1).unwrap();
        let users_up = up.iter().find(|u| u.name() == "V001_init_users_up").unwrap();
        users_up.apply().await.unwrap();
        assert_eq!(docs.snapshot()["users"].len(), 3);

        let down = registration.migrations().pending(1, 0).unwrap();
        let users_down = down.iter().find(|u| u.name() == "V001_init_users_down").unwrap();
        users_down.apply().await.unwrap();
        assert!(!docs.snapshot().contains_key("users"));
    }

    #[tokio::test]
    async fn failing_unit_leaves_cursor_at_last_success() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let mut store = MemoryStore::new();
        let cancel = CancelSignal::new();

        // Version 1 applied twice: the second insert hits duplicate keys.
        registration.migrate(&mut store, Target::Version(1), &cancel).await.unwrap();
        let mut stale = MemoryStore::new();
        let err = registration.migrate(&mut stale, Target::Latest, &cancel).await.unwrap_err();

        assert!(matches!(err.kind, MigrationErrorKind::UnitExecution { ref unit, .. } if unit.to_string() == "V1_init_organizations_up"));
        assert_eq!(err.applied_version(), Some(0));
        assert!(stale.history().await.is_empty());
    }

    #[tokio::test]
    async fn steps_redo_and_reset() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let mut store = MemoryStore::new();
        let cancel = CancelSignal::new();

        let run = registration.migrate(&mut store, Target::Steps(1), &cancel).await.unwrap();
        assert_eq!(run.applied_version, 1);
        assert_eq!(run.applied.len(), 2);

        let runs = registration.redo(&mut store, &cancel).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].applied_version, 0);
        assert_eq!(runs[1].applied_version, 1);

        let runs = registration.reset(&mut store, &cancel).await.unwrap();
        assert_eq!(runs[0].applied_version, 0);
        assert_eq!(runs[1].applied_version, 2);
        assert_eq!(store.current_version().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn negative_target_leaves_the_cursor_alone() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let mut store = MemoryStore::new();
        let cancel = CancelSignal::new();

        registration.migrate(&mut store, Target::Latest, &cancel).await.unwrap();
        let applied = docs.snapshot();

        let err = registration.migrate(&mut store, Target::Version(-7), &cancel).await.unwrap_err();
        assert!(matches!(err.kind, MigrationErrorKind::NegativeTarget(-7)));
        assert_eq!(store.current_version().await.unwrap(), 2);
        assert_eq!(docs.snapshot(), applied);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_runs_on_one_registration_are_serialized() {
        let docs = Documents::default();
        let (_, registration) = registry_with_sample(&docs);
        let store = MemoryStore::new();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let registration = Arc::clone(&registration);
                let mut store = store.clone();
                tokio::spawn(async move {
                    let cancel = CancelSignal::new();
                    registration.migrate(&mut store, Target::Latest, &cancel).await
                })
            })
            .collect();

        let mut applied = Vec::new();
        for task in tasks {
            applied.push(task.await.unwrap().unwrap().applied.len());
        }
        applied.sort();

        // The second run sees the first one's cursor and has nothing left to do.
        assert_eq!(applied, [0, 4]);
        assert_eq!(store.history().await, [1, 1, 2, 2]);
        let collections = docs.snapshot();
        assert_eq!(collections["users"].len(), 3);
        assert_eq!(collections["organizations"].len(), 3);
    }

    #[tokio::test]
    async fn redo_on_empty_store_does_nothing() {
        let (_, registration) = registry_with_sample(&Documents::default());
        let mut store = MemoryStore::new();
        let runs = registration.redo(&mut store, &CancelSignal::new()).await.unwrap();
        assert!(runs.is_empty());
    }
}
