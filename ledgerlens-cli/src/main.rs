use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ledgerlens_core::{build_chunks, Pipeline, PromptedAnalyst, Stage};
use ledgerlens_ingest::normalize_path;
use std::path::{Path, PathBuf};

mod auth;
mod config;
mod llm;
mod render;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "ledgerlens",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERLENS_BUILD_SHA"), ")"),
    about = "Chunked, context-carrying LLM analysis of bank statement exports"
)]
struct Cli {
    /// Log filter when RUST_LOG is unset (e.g. info, debug, ledgerlens_core=debug)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a `;`-separated statement export (date;description;type;amount)
    Analyze {
        csv: PathBuf,

        /// Transactions per chunk (default: analysis.window_size, 75)
        #[arg(long)]
        window: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how a statement would be chunked, without contacting the model
    Chunks {
        csv: PathBuf,

        #[arg(long)]
        window: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.ledgerlens/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Manage the stored API key
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config (file + environment)
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Store an Azure OpenAI / OpenAI API key in ~/.ledgerlens/auth.json
    PasteApiKey,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Analyze { csv, window, json } => analyze(&csv, window, json).await?,
        Command::Chunks { csv, window, json } => chunks(&csv, window, json)?,
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => config::show_config()?,
        },
        Command::Auth { command } => match command {
            AuthCommand::PasteApiKey => auth::paste_api_key()?,
        },
    }

    Ok(())
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn effective_config(window: Option<usize>) -> Result<config::Config> {
    let mut cfg = config::load_config()?;
    cfg.apply_env(|k| std::env::var(k).ok());
    if let Some(w) = window {
        cfg.analysis.window_size = w;
    }
    Ok(cfg)
}

fn require_file(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("CSV not found: {}", path.display());
    }
    Ok(())
}

fn report_stage(stage: Stage) {
    match stage {
        Stage::Summarizing { index, total } => eprintln!("Analyzing chunk {index}/{total}…"),
        Stage::Aggregating => eprintln!("Generating final analysis…"),
        _ => {}
    }
}

async fn analyze(csv: &Path, window: Option<usize>, json: bool) -> Result<()> {
    require_file(csv)?;
    let cfg = effective_config(window)?;
    let pipeline_cfg = cfg.pipeline_config()?;

    let stored = auth::load_auth()?;
    let api_key = auth::resolve_api_key(cfg.llm.provider, |k| std::env::var(k).ok(), &stored)?;
    let chat = llm::HttpChat::from_config(&cfg.llm, &api_key)?;
    let analyst = PromptedAnalyst::new(chat)
        .with_prompts(cfg.prompt_builder()?)
        .with_params(cfg.generation_params());
    let pipeline = Pipeline::with_config(analyst, pipeline_cfg);

    let result = match pipeline.analyze_with_progress(csv, report_stage).await {
        Ok(r) => r,
        Err(e) => {
            let hint = if e.is_transient() {
                "transient failure; re-run to retry"
            } else {
                "permanent failure"
            };
            return Err(e).with_context(|| format!("analyzing {} ({hint})", csv.display()));
        }
    };

    if result.is_empty() {
        eprintln!("{}", render::render_empty_notice(&csv.display().to_string(), &result));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&result).context("serialize result")?);
    } else if !result.is_empty() {
        print!("{}", render::render_analysis(&result));
    }
    Ok(())
}

fn chunks(csv: &Path, window: Option<usize>, json: bool) -> Result<()> {
    require_file(csv)?;
    let cfg = effective_config(window)?;
    let pipeline_cfg = cfg.pipeline_config()?;

    let report = normalize_path(csv, &pipeline_cfg.normalize)
        .with_context(|| format!("parsing {}", csv.display()))?;
    eprintln!(
        "Parsed {} transactions from {} ({} rows skipped, {} with an unrecognized date)",
        report.records.len(),
        csv.display(),
        report.skipped_rows,
        report.unparsed_dates
    );

    let chunks = build_chunks(report.records, pipeline_cfg.window);
    if json {
        println!("{}", serde_json::to_string_pretty(&chunks).context("serialize chunks")?);
    } else {
        print!("{}", render::render_chunk_plan(&chunks));
    }
    Ok(())
}
