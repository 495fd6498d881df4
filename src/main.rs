//! RagBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use ragbuddy::{
    bootstrap::{build_pipeline, show_setup_instructions, EXIT_CODE_SETUP_NEEDED},
    cli::{print_outcome, Args, Commands, PromptInput, QuestionPrompt, Verbosity},
    config::{Config, CONFIG_DIR},
    doctor::Doctor,
    rag::RAGPipeline,
    telemetry::init_tracing,
    RagError,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity(), args.log_json);

    if args.command.is_some() && args.query.is_some() {
        if let Err(message) = args.validate() {
            eprintln!("{} {}", "❌".red(), message);
            std::process::exit(1);
        }
    }

    match &args.command {
        Some(Commands::Start) => run_repl(&args).await?,
        Some(Commands::Doctor) => run_doctor(&args).await?,
        Some(Commands::Config { init }) => show_config(&args, *init)?,
        None => match &args.query {
            Some(query) => {
                let pipeline = load_pipeline(&args)?;
                if !ask(&pipeline, query, &args).await? {
                    std::process::exit(1);
                }
            }
            None => print_usage(),
        },
    }

    Ok(())
}

fn print_usage() {
    println!("RagBuddy v{} - grounded answers from your documents", env!("CARGO_PKG_VERSION"));
    println!("\nUsage:");
    println!("  ragbuddy \"<question>\"        Answer one question");
    println!("  ragbuddy --json \"<question>\" Full response as JSON");
    println!("  ragbuddy start               Interactive prompt");
    println!("  ragbuddy doctor              Backend health checks");
    println!("  ragbuddy config [--init]     Show or create configuration");
    println!("\nExample:");
    println!("  ragbuddy \"Is version 2.8 still supported?\"");
    println!();
}

/// Load configuration and build the pipeline, exiting with setup help when
/// the configuration is incomplete
fn load_pipeline(args: &Args) -> Result<RAGPipeline> {
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    match build_pipeline(&config) {
        Ok(pipeline) => Ok(pipeline),
        Err(RagError::Config(reason)) => {
            show_setup_instructions(&reason);
            std::process::exit(EXIT_CODE_SETUP_NEEDED);
        }
        Err(e) => Err(e).context("Failed to initialise services"),
    }
}

fn spinner(verbosity: Verbosity, json: bool) -> Option<ProgressBar> {
    if json || !verbosity.show_progress() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("Searching, answering and evaluating...");
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Answer one question; returns false when the outcome was an error
async fn ask(pipeline: &RAGPipeline, query: &str, args: &Args) -> Result<bool> {
    let verbosity = args.verbosity();
    let pb = spinner(verbosity, args.json);

    let (outcome, timings) = pipeline.handle_timed(query).await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    print_outcome(&outcome, verbosity, args.json)?;
    if let Some(timings) = timings {
        if verbosity.show_timings() && !args.json {
            timings.display_summary();
        }
    }

    Ok(!outcome.is_failure())
}

/// Interactive question loop
async fn run_repl(args: &Args) -> Result<()> {
    let pipeline = load_pipeline(args)?;
    let history = dirs::home_dir().map(|home| home.join(CONFIG_DIR).join("history"));
    let mut prompt = QuestionPrompt::with_history(history)?;

    println!("{}", "RagBuddy interactive mode".bold());
    println!("Ask a question, or type 'exit' to quit.\n");

    loop {
        match prompt.read()? {
            PromptInput::Exit => break,
            PromptInput::Empty => continue,
            PromptInput::Question(question) => {
                ask(&pipeline, &question, args).await?;
            }
        }
    }

    prompt.save_history()?;
    println!("Goodbye!");
    Ok(())
}

async fn run_doctor(args: &Args) -> Result<()> {
    let config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    let checks = Doctor::new(config).run_diagnostics().await;

    Doctor::display_results(&checks);
    if Doctor::overall_status(&checks) {
        println!("{}", "✅ All critical checks passed".green());
        Ok(())
    } else {
        println!("{}", "❌ Some checks failed".red());
        std::process::exit(1);
    }
}

fn show_config(args: &Args, init: bool) -> Result<()> {
    if init {
        let path = match &args.config {
            Some(path) => path.clone(),
            None => Config::default_path().context("Could not determine home directory")?,
        };
        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }
        Config::default().save(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    for key in [&mut config.azure_openai.api_key, &mut config.search.api_key] {
        if !key.is_empty() {
            *key = "********".to_string();
        }
    }
    println!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);

    if let Err(e) = config.validate() {
        eprintln!("{} {}", "⚠️ ".yellow(), e);
    }
    Ok(())
}
