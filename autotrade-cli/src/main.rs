//! autotrade CLI
//!
//! Runs and authors the macros that drive a desktop trading application.
//!
//! Usage:
//!   autotrade execute buy                   # Run the `buy` action
//!   autotrade create buy                    # Author a new action interactively
//!   autotrade modify buy                    # Edit an existing action
//!   autotrade edit-option General positioning_keys
//!   autotrade update-prices                 # Refetch closing prices when stale
//!   autotrade startup-script buy            # Run `buy` at login

use anyhow::{bail, Context, Result};
use autotrade::config::{ConfigStore, ACTIONS_SECTION};
use autotrade::platforms::input::RdevInput;
use autotrade::{
    edit_tuple_list, run_action, ActionOutcome, Desktop, HttpDataSource, Settings, StdinPrompter,
    TupleListEditor,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

mod process;
mod startup;

#[derive(Parser)]
#[command(name = "autotrade")]
#[command(about = "Macro engine for a desktop trading application")]
struct Cli {
    /// Configuration file (default: <config dir>/autotrade/config.ini)
    #[clap(long, global = true, env = "AUTOTRADE_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[clap(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
struct ExecuteArgs {
    /// Action to run
    action: String,

    /// Wait until a process with this name is running first
    #[clap(long)]
    wait_for_process: Option<String>,
}

#[derive(Parser, Debug)]
struct StartupScriptArgs {
    /// Action the script runs
    action: String,

    /// Where to write the script (default: the login startup folder)
    #[clap(long, short)]
    output: Option<PathBuf>,

    /// Passed through to `execute --wait-for-process`
    #[clap(long)]
    wait_for_process: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an action
    Execute(ExecuteArgs),
    /// Author a new action
    Create { action: String },
    /// Edit an existing action
    Modify { action: String },
    /// Delete an action
    Delete { action: String },
    /// List actions
    List,
    /// Edit any tuple-list option
    EditOption { section: String, option: String },
    /// Refetch closing prices if they are stale
    UpdatePrices,
    /// Write a script that runs an action at login
    StartupScript(StartupScriptArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn config_path(cli_path: Option<PathBuf>) -> Result<PathBuf> {
    match cli_path {
        Some(path) => Ok(path),
        None => Ok(dirs::config_dir()
            .context("No configuration directory for this user")?
            .join("autotrade")
            .join("config.ini")),
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = config_path(cli.config)?;
    let mut store = ConfigStore::load(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    match cli.command {
        Commands::Execute(args) => execute(&mut store, args),
        Commands::Create { action } => {
            if store.contains(ACTIONS_SECTION, &action) {
                bail!("Action '{action}' already exists; use `modify`");
            }
            edit(&mut store, ACTIONS_SECTION, &action)
        }
        Commands::Modify { action } => {
            if !store.contains(ACTIONS_SECTION, &action) {
                bail!("Action '{action}' does not exist; use `create`");
            }
            edit(&mut store, ACTIONS_SECTION, &action)
        }
        Commands::Delete { action } => {
            if !store.delete_action(&action)? {
                bail!("Action '{action}' does not exist");
            }
            println!("Deleted {}", action.bold());
            Ok(())
        }
        Commands::List => {
            for name in store.action_names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::EditOption { section, option } => edit(&mut store, &section, &option),
        Commands::UpdatePrices => {
            let source = HttpDataSource::new()?;
            if autotrade::market_data::update_closing_prices(&store, &source)? {
                println!("{}", "Closing prices updated".green());
            } else {
                println!("Closing prices are current");
            }
            Ok(())
        }
        Commands::StartupScript(args) => {
            let output = match args.output {
                Some(output) => output,
                None => startup::default_script_path(&args.action)?,
            };
            let executable =
                std::env::current_exe().context("Failed to locate the autotrade executable")?;
            let config = std::path::absolute(store.path()).unwrap_or_else(|_| path.clone());
            startup::write_startup_script(
                &output,
                &startup::StartupTarget {
                    executable: &executable,
                    config: &config,
                    action: &args.action,
                    wait_for_process: args.wait_for_process.as_deref(),
                },
            )?;
            println!("Wrote {}", output.display());
            Ok(())
        }
    }
}

fn execute(store: &mut ConfigStore, args: ExecuteArgs) -> Result<()> {
    let settings = Settings::from_store(store)?;
    if let Some(process) = &args.wait_for_process {
        process::wait_for_process(process, settings.retry.interval.max(Duration::from_millis(500)));
    }

    let desktop = Desktop::native().context("Failed to initialize desktop backends")?;
    match run_action(&desktop, store, &settings, &args.action)? {
        ActionOutcome::Completed => info!("Finished '{}'", args.action),
        ActionOutcome::Aborted {
            command_index,
            reason,
        } => warn!(
            "'{}' stopped at command {}: {}",
            args.action, command_index, reason
        ),
    }
    Ok(())
}

fn edit(store: &mut ConfigStore, section: &str, option: &str) -> Result<()> {
    let settings = Settings::from_store(store)?;
    let input = RdevInput::new();
    let mut prompter = StdinPrompter;
    let mut editor = TupleListEditor::new(
        &mut prompter,
        &input,
        settings.retry,
        &settings.positioning_keys,
    );
    edit_tuple_list(store, section, option, &mut editor)?;
    println!("Saved [{}] {}", section, option.bold());
    Ok(())
}
