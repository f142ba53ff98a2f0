mod cmd;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "relay",
    about = "Deployment reconciliation agent — polls the control center and drives GitOps rollouts",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reconciliation agent until interrupted
    Run(cmd::run::RunArgs),

    /// Run the startup pre-flight checks and exit
    Check(cmd::check::CheckArgs),

    /// Seed a deployment request on the control center (testing helper)
    Trigger(cmd::admin::TriggerArgs),

    /// Show the control center's pending update and report history
    AdminStatus(cmd::admin::AdminStatusArgs),
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Run(args) => cmd::run::run(args),
        Commands::Check(args) => cmd::check::run(args),
        Commands::Trigger(args) => cmd::admin::trigger(args),
        Commands::AdminStatus(args) => cmd::admin::status(args),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
