//! kinq CLI - Command-line interface
//!
//! Usage:
//!   kinq predict <query>
//!   kinq samples export <path>
//!   kinq samples evaluate

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kinq_core::config::{AppConfig, ModelBackend};
use kinq_extractor::{build_examples, default_samples, evaluate, QueryInterpreter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kinq")]
#[command(about = "Family-tree query understanding CLI")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to $KINQ_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Query model backend: lexicon or remote
    #[arg(long, global = true)]
    backend: Option<ModelBackend>,

    /// Remote model server endpoint
    #[arg(long, global = true)]
    model_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret a query and print the result as JSON
    Predict {
        /// Query to interpret
        query: String,
        /// Conversation context as a JSON value
        #[arg(long)]
        context: Option<String>,
    },
    /// Work with the labeled training samples
    Samples {
        #[command(subcommand)]
        action: SamplesAction,
    },
}

#[derive(Subcommand)]
enum SamplesAction {
    /// Write aligned training examples as JSON
    Export { path: PathBuf },
    /// Score the configured model against the samples
    Evaluate {
        /// Print every mismatched sample
        #[arg(long)]
        verbose: bool,
    },
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?.with_env_override()?,
            None => AppConfig::load()?,
        };

        if let Some(backend) = self.backend {
            config.model.backend = backend;
        }
        if let Some(url) = &self.model_url {
            config.model.remote_url = url.clone();
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        backend = ?config.model.backend,
        remote_url = %config.model.remote_url,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Predict { query, context } => {
            let context = context
                .map(|raw| serde_json::from_str::<serde_json::Value>(&raw))
                .transpose()
                .context("--context must be valid JSON")?;

            let interpreter = QueryInterpreter::from_config(&config)?;
            tracing::info!("Using '{}' model", interpreter.model_name());
            let result = interpreter.interpret(&query, context.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Samples { action } => match action {
            SamplesAction::Export { path } => {
                let report = build_examples(&default_samples());
                tracing::info!(
                    "Writing {} training examples to {}",
                    report.examples.len(),
                    path.display()
                );
                let json = serde_json::to_string_pretty(&report.examples)?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?;

                println!(
                    "Wrote {} examples to {} ({} phrases could not be aligned)",
                    report.examples.len(),
                    path.display(),
                    report.unaligned.len()
                );
                for phrase in &report.unaligned {
                    println!("  {} '{}' in: {}", phrase.label, phrase.phrase, phrase.text);
                }
            }
            SamplesAction::Evaluate { verbose } => {
                let interpreter = QueryInterpreter::from_config(&config)?;
                tracing::info!("Evaluating '{}' model", interpreter.model_name());
                let report = evaluate(&interpreter, &default_samples()).await?;

                println!("Model:            {}", interpreter.model_name());
                println!("Samples:          {}", report.total);
                println!("Intent accuracy:  {:.3}", report.intent_accuracy());
                println!("Entity precision: {:.3}", report.entities.precision());
                println!("Entity recall:    {:.3}", report.entities.recall());
                println!("Entity F1:        {:.3}", report.entities.f1_score());
                println!("Ambiguous:        {}", report.ambiguous);
                println!("Mismatches:       {}", report.mismatches.len());

                if verbose {
                    for mismatch in &report.mismatches {
                        println!();
                        println!("  {}", mismatch.text);
                        println!("    expected: {}", serde_json::to_string(&mismatch.expected)?);
                        println!("    actual:   {}", serde_json::to_string(&mismatch.actual)?);
                    }
                }
            }
        },
    }

    Ok(())
}
