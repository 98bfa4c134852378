use crate::cli::error::{SwellowError, SwellowErrorKind};
use crate::cli::{Cli, Commands, RunArgs, ux};
use crate::executor::{CancelSignal, Run};
use crate::migration::{Plan, Target};
use crate::registry::{Registration, Registry};
use crate::sample::SampleMigrator;
use crate::store::{PostgresStore, StoreError, VersionStore};

use serde_json::{Value, json};
use sqlx::PgPool;


/// What a mutating command asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Up(Option<i64>),
    Down(Option<i64>),
    Goto(i64),
    Step(i64),
    Redo,
    Reset,
}


/// Every receiver this binary knows, keyed by driver name.
pub fn registry(pool: &PgPool) -> Result<Registry, SwellowError> {
    let mut registry = Registry::new();
    registry.register("generic", SampleMigrator::new(pool.clone()))?;
    Ok(registry)
}

/// Ensures the database is reachable and the version table exists.
pub async fn peck(store: &PostgresStore) -> Result<(), SwellowError> {
    tracing::info!("Pecking database...");
    store.ensure_table().await?;
    tracing::info!("Pecking successful 🐦");

    Ok(())
}

pub async fn version<S: VersionStore + ?Sized>(store: &mut S) -> Result<i64, SwellowError> {
    let version = store.current_version().await?;
    tracing::info!("Current version: {version}");
    Ok(version)
}

pub fn methods(registration: &Registration) -> Value {
    ux::show_methods(registration);
    json!({
        "driver": registration.driver(),
        "units": registration.migrations().iter().map(|u| u.key()).collect::<Vec<_>>(),
        "rejected": registration.diagnostics(),
    })
}

/// Cursor targets for `action`, one per leg; redo and reset have two legs.
pub fn targets(current: i64, action: Action) -> Result<Vec<Target>, SwellowError> {
    let targets = match action {
        Action::Up(Some(target)) if target < current => {
            return Err(SwellowError { kind: SwellowErrorKind::InvalidVersionInterval(current, target) });
        }
        Action::Up(target) => vec![target.map_or(Target::Latest, Target::Version)],
        Action::Down(target) => {
            let target = target.unwrap_or(0);
            if target > current || target < 0 {
                return Err(SwellowError { kind: SwellowErrorKind::InvalidVersionInterval(current, target) });
            }
            vec![Target::Version(target)]
        }
        Action::Goto(version) if version < 0 => {
            return Err(SwellowError { kind: SwellowErrorKind::InvalidVersionInterval(current, version) });
        }
        Action::Goto(version) => vec![Target::Version(version)],
        Action::Step(steps) => vec![Target::Steps(steps)],
        Action::Redo if current == 0 => Vec::new(),
        Action::Redo => vec![Target::Steps(-1), Target::Version(current)],
        Action::Reset => vec![Target::Version(0), Target::Latest],
    };
    Ok(targets)
}

/// Plans for every leg of `action`, chained from `current`.
pub fn plan(registration: &Registration, current: i64, action: Action) -> Result<Vec<Plan>, SwellowError> {
    let migrations = registration.migrations();
    let mut from = current;
    let mut plans = Vec::new();

    for target in targets(current, action)? {
        let to = migrations.resolve(from, target);
        plans.push(migrations.pending(from, to)?);
        from = to;
    }
    Ok(plans)
}

/// Shows the plan for `action`, then executes it unless `--plan` was given.
pub async fn migrate<S: VersionStore + ?Sized>(
    store: &mut S,
    registration: &Registration,
    action: Action,
    args: RunArgs,
    cancel: &CancelSignal,
) -> Result<Vec<Run>, SwellowError> {
    let current = store.current_version().await?;
    tracing::info!("Current version resolved: {current}");

    let plans = plan(registration, current, action)?;
    for plan in &plans {
        ux::show_plan(plan);
    }

    if args.plan {
        tracing::info!("Planning complete - no migrations executed 🐦");
        return Ok(Vec::new());
    }

    let runs = match action {
        Action::Redo => registration.redo(store, cancel).await?,
        Action::Reset => registration.reset(store, cancel).await?,
        _ => {
            let mut runs = Vec::new();
            for target in targets(current, action)? {
                runs.push(registration.migrate(store, target, cancel).await?);
            }
            runs
        }
    };

    for run in &runs {
        tracing::info!(
            "{} complete: {} unit(s), now at version {}",
            run.direction.noun(),
            run.applied.len(),
            run.applied_version
        );
    }
    Ok(runs)
}

async fn migrate_locked(
    store: &mut PostgresStore,
    registration: &Registration,
    action: Action,
    args: RunArgs,
    cancel: &CancelSignal,
) -> Result<Vec<Run>, SwellowError> {
    peck(store).await?;

    // Guard the cursor against other processes migrating the same database.
    if args.ignore_locks || args.plan {
        if args.ignore_locks {
            tracing::warn!("⚠️ Ignoring locks: sequential execution of migrations is not guaranteed.");
        }
        return migrate(store, registration, action, args, cancel).await;
    }

    tracing::info!("Acquiring version lock...");
    store.acquire_lock().await?;
    let result = migrate(store, registration, action, args, cancel).await;
    let released = store.release_lock().await;
    keep_run_error(result, released)
}

/// A failed run's error wins over a failure to release the lock afterwards.
fn keep_run_error<T>(result: Result<T, SwellowError>, released: Result<(), StoreError>) -> Result<T, SwellowError> {
    match (result, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e.into()),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release_error)) => {
            tracing::error!("Failed to release version lock: {release_error}");
            Err(e)
        }
    }
}

/// Entry point behind `main`: resolves the driver and dispatches.
///
/// The pool connects on first use, so `methods` never touches the database.
pub async fn run(args: Cli, cancel: CancelSignal) -> Result<Value, SwellowError> {
    let mut store = PostgresStore::connect_lazy(&args.db_connection_string)?;
    let registry = registry(store.pool())?;
    let registration = registry.resolve(&args.driver)?;

    let (action, run_args) = match args.command {
        Commands::Peck {} => {
            peck(&store).await?;
            return Ok(Value::Null);
        }
        Commands::Version {} => {
            peck(&store).await?;
            return Ok(json!(version(&mut store).await?));
        }
        Commands::Methods {} => return Ok(methods(&registration)),
        Commands::Up { target_version_id, args } => (Action::Up(target_version_id), args),
        Commands::Down { target_version_id, args } => (Action::Down(target_version_id), args),
        Commands::Goto { version, args } => (Action::Goto(version), args),
        Commands::Step { steps, args } => (Action::Step(steps), args),
        Commands::Redo { args } => (Action::Redo, args),
        Commands::Reset { args } => (Action::Reset, args),
    };

    let runs = migrate_locked(&mut store, &registration, action, run_args, &cancel).await?;
    Ok(serde_json::to_value(runs)?)
}
