use swellow_methods::cli::{self, Parser, commands, output, ux};
use swellow_methods::CancelSignal;


/// Entry point for the swellow-methods CLI.
///
/// Every subcommand resolves the receiver registered under `--driver` and
/// works against the version table of the database given by `--db`.
#[tokio::main]
async fn main() {
    let args: cli::Cli = cli::Cli::parse();

    if let Err(e) = ux::setup_logging(args.verbose, args.quiet, args.json) {
        eprintln!("{e}");
        std::process::exit(1);
    }

    // Ctrl-C stops the run between units.
    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted - stopping after the current unit.");
            on_interrupt.cancel();
        }
    });

    let json = args.json;
    let command_name = args.command.to_string();
    let result = commands::run(args, cancel).await;
    let (output, error) = output::SwellowOutput::from_result(command_name.clone(), result);

    if json {
        match serde_json::to_string_pretty(&output) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                eprintln!("{e}");
                std::process::exit(1);
            }
        }
    } else {
        ux::render_human_output(&command_name, error.as_ref());
    }

    if error.is_some() {
        std::process::exit(1);
    }
}
