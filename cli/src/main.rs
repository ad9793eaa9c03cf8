//! sp-oncall binary: ask a network on-call question from the command line.
//!
//! `sp-oncall "why is R1 dropping BGP sessions"` runs one investigation and prints the
//! report. Subcommands: `repl` (session history kept across questions), `tools`
//! (list MCP tools), `loggers` (logging targets and levels).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cli::{
    format_loggers, format_tools, list_tools, query_from_args, run_query, run_repl, CliOverrides,
    RunError,
};
use config::logging::LoggingSettings;
use oncall::workflow::connect_tools;
use oncall::{OncallRuntime, Settings};
use tokio::io::BufReader;

#[derive(Parser, Debug)]
#[command(name = "sp-oncall")]
#[command(about = "sp-oncall: multi-device network on-call assistant over MCP tools")]
struct Args {
    #[command(subcommand)]
    cmd: Option<Command>,

    /// Model as provider/name (overrides SP_ONCALL_MODEL)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// MCP server config file (overrides SP_ONCALL_MCP_CONFIG)
    #[arg(long, value_name = "PATH")]
    mcp_config: Option<PathBuf>,

    /// Directory of *.json investigation plans (overrides SP_ONCALL_PLANS_DIR)
    #[arg(long, value_name = "DIR")]
    plans_dir: Option<PathBuf>,

    /// Assessment retries before the report is forced (overrides SP_ONCALL_MAX_RETRIES)
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Debug logging for sp-oncall targets (ignored when RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,

    /// Print the final workflow state as JSON (query) or full tool specs (tools)
    #[arg(long)]
    json: bool,

    /// The question to investigate
    #[arg(trailing_var_arg = true, value_name = "QUERY")]
    query: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// List the tools exposed by the configured MCP servers
    Tools,
    /// Show logging targets and their effective levels
    Loggers,
    /// Interactive session; each answer sees the earlier reports
    Repl,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            model: self.model.clone(),
            mcp_config: self.mcp_config.clone(),
            plans_dir: self.plans_dir.clone(),
            max_retries: self.max_retries,
        }
    }
}

async fn run(args: Args, log_settings: &LoggingSettings) -> Result<(), RunError> {
    if let Some(Command::Loggers) = args.cmd {
        println!("{}", format_loggers(log_settings));
        return Ok(());
    }

    let settings = args.overrides().apply(Settings::from_env()?);
    match args.cmd {
        Some(Command::Tools) => {
            let cwd = std::env::current_dir()?;
            let source = connect_tools(&settings, &cwd).await?;
            let tools = list_tools(&source).await?;
            println!("{}", format_tools(&tools, args.json)?);
        }
        Some(Command::Repl) => {
            let runtime = OncallRuntime::connect(settings).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            run_repl(&runtime, stdin, &mut std::io::stdout()).await?;
        }
        Some(Command::Loggers) => {}
        None => {
            let query = query_from_args(&args.query)?;
            let runtime = OncallRuntime::connect(settings).await?;
            let output = run_query(&runtime, &query, args.json).await?;
            println!("{}", output.as_str());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    config::load_and_apply(config::APP_NAME, None).ok();
    let args = Args::parse();

    let log_settings = LoggingSettings::from_env();
    if let Err(e) = cli::logging::init(&log_settings, args.verbose) {
        eprintln!("sp-oncall: logging: {}", e);
    }

    match run(args, &log_settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ RunError::MissingQuery) => {
            eprintln!("sp-oncall: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "sp-oncall failed");
            eprintln!("sp-oncall: {}", e);
            ExitCode::FAILURE
        }
    }
}
