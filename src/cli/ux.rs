use crate::cli::error::SwellowError;
use crate::migration::{MigrationDirection, Plan};
use crate::registry::Registration;
use std::fmt::Write;


pub fn setup_logging(verbose: u8, quiet: bool, json: bool) -> Result<(), SwellowError> {
    if json {
        // Mute all logging if JSON output is enabled
        tracing::subscriber::set_global_default(tracing::subscriber::NoSubscriber::default())?;
        return Ok(());
    }

    let level = if quiet {
        tracing::Level::ERROR
    } else { match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    }};

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}


/// Render a plan as the text block logged before a run.
pub fn format_plan(plan: &Plan) -> String {
    let direction = plan.direction();
    let mut output = format!(
        "Generating {} plan...\n--- {} plan: {} -> {} ---",
        direction.noun().to_lowercase(),
        direction.noun(),
        plan.from_version(),
        plan.to_version(),
    );

    if plan.is_empty() {
        output.push_str("\n(nothing to do)");
    }
    for unit in plan {
        // Writing to a String cannot fail.
        let _ = write!(&mut output, "\n-> {} {}: '{}'", direction.noun(), unit.version(), unit.name());
    }
    output.push_str("\n--- End of plan ---");
    output
}

pub fn show_plan(plan: &Plan) {
    if plan.direction() == MigrationDirection::Down && !plan.is_empty() {
        tracing::warn!(
            "Rollback from version {} to {} undoes {} unit(s)!",
            plan.from_version(),
            plan.to_version(),
            plan.len()
        );
    }
    tracing::info!("{}", format_plan(plan));
}

pub fn show_methods(registration: &Registration) {
    let mut output = format!("--- Migration methods for driver '{}' ---", registration.driver());
    for unit in registration.migrations().iter() {
        let _ = write!(&mut output, "\n-> {} (version {}, {})", unit.name(), unit.version(), unit.direction());
    }
    for candidate in registration.diagnostics() {
        let _ = write!(&mut output, "\n-> REJECTED {candidate}");
    }
    tracing::info!("{output}\n--- End of migration methods ---");
}

pub fn render_human_output(command: &str, error: Option<&SwellowError>) {
    match error {
        None => tracing::info!("'{command}' completed 🐦"),
        Some(error) => tracing::error!("'{command}' failed: {error}"),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{MigrationSet, MigrationUnit};
    use futures_util::FutureExt;

    fn set() -> MigrationSet {
        MigrationSet::build(
            [MigrationDirection::Up, MigrationDirection::Down].into_iter().map(|direction| {
                MigrationUnit::from_fn(1, "init_users", direction, || async { Ok::<_, anyhow::Error>(()) }.boxed())
            }),
        )
        .unwrap()
    }

    #[test]
    fn plan_lists_units_in_order() {
        let text = format_plan(&set().pending(0, 1).unwrap());
        assert!(text.contains("--- Migration plan: 0 -> 1 ---"));
        assert!(text.contains("-> Migration 1: 'V1_init_users_up'"));
    }

    #[test]
    fn empty_plan_says_so() {
        let text = format_plan(&set().pending(1, 1).unwrap());
        assert!(text.contains("(nothing to do)"));
    }
}
