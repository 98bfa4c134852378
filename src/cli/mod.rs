pub mod commands;
pub mod error;
pub mod output;
pub mod ux;

pub use clap::{Parser, Subcommand};


#[derive(Parser)]
#[command(name = "swellow-methods", version, about = "Run migrations written as plain async methods, discovered by name.")]
pub struct Cli {
    #[arg(
        long = "db",
        help = "Database connection string holding the version cursor, e.g.:
    postgresql://<username>:<password>@<host>:<port>/<database>\n",
        env = "DB_CONNECTION_STRING",
        hide_env_values = true
    )]
    pub db_connection_string: String,

    #[arg(
        long,
        help = "Name of the driver whose receiver holds the migration methods.",
        default_value = "generic",
        env = "DRIVER",
    )]
    pub driver: String,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Set level of verbosity. [default: INFO]\n\t-v: DEBUG\n\t-vv: TRACE\n--quiet takes precedence over --verbose."
    )]
    pub verbose: u8,

    #[arg(
        short,
        long,
        action = clap::ArgAction::SetTrue,
        help = "Disable all information logs (only ERROR level logs are shown).\n--quiet takes precedence over --verbose."
    )]
    pub quiet: bool,

    #[arg(
        long,
        action = clap::ArgAction::SetTrue,
        help = "Enable JSON output format. Human readable output is disabled when this flag is set."
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Parser, Clone, Copy, Debug, Default)]
pub struct RunArgs {
    #[arg(
        long,
        help = "Generate the plan and skip execution.",
    )]
    pub plan: bool,

    #[arg(
        long,
        help = "Ignore acquiring locks. ⚠️ Warning: sequential execution of migrations is not guaranteed when this flag is set.",
    )]
    pub ignore_locks: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Test connection to the database and create the version table.")]
    Peck {},

    #[command(about = "Print the current version.")]
    Version {},

    #[command(about = "List discovered migration units and rejected candidates.")]
    Methods {},

    #[command(about = "Apply migrations up to the target version (default: latest).")]
    Up {
        #[arg(long, help = "Migrate up to the specified version ID.")]
        target_version_id: Option<i64>,
        #[command(flatten)]
        args: RunArgs,
    },

    #[command(about = "Roll back migrations down to the target version (default: 0).")]
    Down {
        #[arg(long, help = "Roll back down to the specified version ID.")]
        target_version_id: Option<i64>,
        #[command(flatten)]
        args: RunArgs,
    },

    #[command(about = "Migrate up or down to exactly the given version.")]
    Goto {
        version: i64,
        #[command(flatten)]
        args: RunArgs,
    },

    #[command(about = "Apply (+n) or roll back (-n) n versions relative to the current one.")]
    Step {
        #[arg(allow_hyphen_values = true)]
        steps: i64,
        #[command(flatten)]
        args: RunArgs,
    },

    #[command(about = "Roll back the most recent version and apply it again.")]
    Redo {
        #[command(flatten)]
        args: RunArgs,
    },

    #[command(about = "Roll back every version, then apply them all again.")]
    Reset {
        #[command(flatten)]
        args: RunArgs,
    },
}

impl std::fmt::Display for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Commands::Peck { .. } => "peck",
            Commands::Version { .. } => "version",
            Commands::Methods { .. } => "methods",
            Commands::Up { .. } => "up",
            Commands::Down { .. } => "down",
            Commands::Goto { .. } => "goto",
            Commands::Step { .. } => "step",
            Commands::Redo { .. } => "redo",
            Commands::Reset { .. } => "reset",
        };
        write!(f, "{name}")
    }
}
