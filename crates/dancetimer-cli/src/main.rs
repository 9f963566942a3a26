use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "dancetimer", version, about = "Dance Timer CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bill an elapsed time against a pricing rule
    Quote(commands::quote::QuoteArgs),
    /// Song midpoints and the cumulative cost at each
    Marks(commands::quote::MarksArgs),
    /// Pricing rule management
    Rule {
        #[command(subcommand)]
        action: commands::rule::RuleAction,
    },
    /// Dance history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Trigger gesture tools
    Gesture {
        #[command(subcommand)]
        action: commands::gesture::GestureAction,
    },
    /// Interactive timer session driven from stdin
    Run(commands::run::RunArgs),
}

fn main() {
    // RUST_LOG overrides; logs go to stderr so stdout stays JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Quote(args) => commands::quote::run_quote(args),
        Commands::Marks(args) => commands::quote::run_marks(args),
        Commands::Rule { action } => commands::rule::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Gesture { action } => commands::gesture::run(action),
        Commands::Run(args) => commands::run::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
