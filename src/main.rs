use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use customui::commands;
use customui::config::{self, CONFIG_FILE};
use customui::logging::{init_logging, LoggingConfig};

#[derive(Parser)]
#[command(name = "customui")]
#[command(about = "Compile HTML-like UI markup into UI command strings", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a template and print its command string
    Compile {
        /// Path to the template
        file: PathBuf,
        /// Override a script variable (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
        /// Write the command string to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile every template in a directory without writing output
    Check {
        /// Directory or template to check (defaults to current directory)
        #[arg(default_value = ".")]
        target: PathBuf,
    },
    /// Recompile a template whenever it changes
    Watch {
        /// Path to the template
        file: PathBuf,
        /// Override a script variable (repeatable)
        #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

fn parse_var(arg: &str) -> Result<(String, String), String> {
    commands::parse_var(arg).map_err(|e| e.to_string())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load_config(&cli.config)?;
    init_logging(LoggingConfig {
        filter: config.logging.filter.clone(),
        ..LoggingConfig::default()
    });

    match cli.command {
        Commands::Compile { file, vars, output } => {
            commands::compile::execute(&file, &vars, output.as_deref(), &config)
        }
        Commands::Check { target } => commands::check::execute(&target, &config),
        Commands::Watch { file, vars } => commands::watch::execute(&file, &vars, &config),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
