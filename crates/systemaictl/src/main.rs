//! SystemAI - natural-language Linux system assistant
//!
//! Turns requests into validated action plans and runs them with approval.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io;
use systemai_common::exec::{SystemFiles, SystemRunner};
use systemai_common::{ActionJournal, OllamaPlanner, SystemAiConfig};
use systemaictl::approval_ui::TerminalDecider;
use systemaictl::errors::*;
use systemaictl::pipeline::{RequestResult, Session};
use systemaictl::repl::{format_config, run_repl};
use systemaictl::wizard::{run_wizard, setup_base, WizardDefaults};

// Version is embedded at build time
const VERSION: &str = env!("SYSTEMAI_VERSION");

#[derive(Parser)]
#[command(name = "systemai")]
#[command(about = "SystemAI - natural-language Linux system assistant", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Execute plans without asking first (root retries still ask)
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and run a single request
    Ask {
        /// The request, e.g. "install htop"
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },

    /// Update the whole system with the configured package manager
    Update,

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run the setup wizard again
    Setup,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current configuration and its location
    Show,
}

fn exit_code(result: &RequestResult) -> i32 {
    match result {
        RequestResult::PlanningFailed(_) => EXIT_PLANNING_ERROR,
        RequestResult::Rejected(_) => EXIT_PLAN_REJECTED,
        RequestResult::NothingToDo | RequestResult::Cancelled => EXIT_SUCCESS,
        RequestResult::Unsupported => EXIT_GENERAL_ERROR,
        RequestResult::Executed { summary, .. } => {
            if summary.failed == 0 {
                EXIT_SUCCESS
            } else {
                EXIT_GENERAL_ERROR
            }
        }
    }
}

/// Run the wizard on the terminal and save the result
fn setup(base: SystemAiConfig) -> Result<SystemAiConfig> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    let mut config = run_wizard(&mut input, &mut out, &WizardDefaults::detect(), base)
        .context("setup wizard failed")?;
    let path = config.save().context("failed to save configuration")?;
    println!("✓ Configuration saved to {}\n", path.display());
    Ok(config)
}

/// Load the config, running the wizard on first use
fn load_or_setup() -> Result<SystemAiConfig> {
    match SystemAiConfig::load().context("failed to load configuration")? {
        Some(config) if config.first_run_completed => Ok(config),
        Some(config) => setup(config),
        None => setup(SystemAiConfig::default()),
    }
}

fn build_session(config: SystemAiConfig, assume_yes: bool) -> Result<Session> {
    if config.ai_backend != "ollama" {
        tracing::warn!(backend = %config.ai_backend, "unknown AI backend, using ollama");
    }
    let planner = OllamaPlanner::new(config.ai_model.clone(), config.ai_endpoint.clone())
        .context("failed to create planner")?;

    Ok(Session::new(
        config,
        Box::new(planner),
        Box::new(SystemRunner::default()),
        Box::new(SystemFiles),
        Box::new(TerminalDecider),
        Box::new(io::stdout()),
    )
    .with_journal(ActionJournal::discover())
    .with_assume_yes(assume_yes))
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Some(Commands::Config {
            action: ConfigAction::Show,
        }) => {
            let path = SystemAiConfig::default_path()?;
            match SystemAiConfig::load_from(&path)? {
                Some(config) => {
                    println!("Configuration ({}):", path.display());
                    println!("{}", format_config(&config));
                }
                None => println!("No configuration at {}; run `systemai setup`.", path.display()),
            }
            Ok(EXIT_SUCCESS)
        }

        Some(Commands::Setup) => {
            let base = setup_base(SystemAiConfig::load());
            setup(base)?;
            Ok(EXIT_SUCCESS)
        }

        Some(Commands::Ask { query }) => {
            let mut session = build_session(load_or_setup()?, cli.yes)?;
            let result = session.handle_query(&query.join(" "));
            Ok(exit_code(&result))
        }

        Some(Commands::Update) => {
            let mut session = build_session(load_or_setup()?, cli.yes)?;
            let result = session.run_update();
            Ok(exit_code(&result))
        }

        None => {
            let mut session = build_session(load_or_setup()?, cli.yes)?;
            run_repl(&mut session, &mut io::stdin()).context("terminal I/O failed")?;
            Ok(EXIT_SUCCESS)
        }
    }
}

fn main() {
    systemaictl::logging::init();
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let is_config = e
                .chain()
                .any(|cause| cause.downcast_ref::<systemai_common::ConfigError>().is_some());
            if is_config {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_GENERAL_ERROR
            }
        }
    };

    std::process::exit(code);
}
