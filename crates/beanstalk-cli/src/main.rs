mod cmd;
mod logging;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "beanstalk",
    about = "Complete daily creator tasks and claim their rewards for every configured account",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "BEANSTALK_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// Verbose logging (also enabled by `debug: true` in the config)
    #[arg(short = 'd', long, global = true)]
    debug: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process all accounts now, or on the cron schedule when it is enabled
    Run {
        /// Run once even when the cron schedule is enabled
        #[arg(long)]
        once: bool,
    },

    /// Validate the config for common mistakes
    Check,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Run { once } => cmd::run::run(&cli.config, cli.debug, once),
        Commands::Check => cmd::check::run(&cli.config, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
