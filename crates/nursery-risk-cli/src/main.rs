use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use nursery_risk_core::{
    render_assessment, risk_level, ActivityRequest, AgeGroup, AssessmentError, HazardIdentifier,
    Likelihood, LlmFileConfig, LlmSettings, OutputFormat, Severity,
};
use serde::Deserialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "nursery-risk",
    author,
    version,
    about = "Generate nursery activity risk assessments with a language model"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON) with an `[llm]` section
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Identify hazards for an activity and write the assessment document
    Assess(AssessArgs),
    /// List the age groups that can be passed to `--age-group`
    AgeGroups,
    /// Print the severity × likelihood risk matrix
    Matrix,
}

#[derive(Args, Debug)]
struct AssessArgs {
    /// Short name of the activity, e.g. "Water Play"
    #[arg(long)]
    name: String,

    /// What the children will be doing
    #[arg(long)]
    description: String,

    /// Where the activity takes place
    #[arg(long, default_value = "Nursery")]
    location: String,

    /// Age group taking part; repeat for several (label or alias, e.g. `toddler`, `pre-k`)
    #[arg(long = "age-group", value_name = "GROUP")]
    age_groups: Vec<AgeGroup>,

    /// Name of the person signing off the assessment
    #[arg(long)]
    assessor: Option<String>,

    /// Review date (YYYY-MM-DD); defaults to one year after the assessment
    #[arg(long, value_name = "DATE", value_parser = parse_date)]
    review_date: Option<NaiveDate>,

    /// Output format: text, markdown, json or yaml
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Write the document to this file, or into this directory using a generated name
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    #[serde(default)]
    llm: LlmFileConfig,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Assess(args) => assess(cli.config.as_deref(), args).await?,
        Commands::AgeGroups => list_age_groups(),
        Commands::Matrix => print_matrix(),
    }
    Ok(())
}

async fn assess(config_path: Option<&Path>, args: AssessArgs) -> Result<()> {
    let app_config = load_app_config(config_path)?;
    let settings = LlmSettings::from_env_and_file(app_config.llm).map_err(report_failure)?;
    info!(provider = %settings.provider, "using language model provider");
    let identifier = HazardIdentifier::from_settings(&settings).map_err(report_failure)?;

    let request = ActivityRequest::new(args.name, args.description)
        .location(args.location)
        .age_groups(args.age_groups);
    let mut assessment = identifier
        .identify_hazards(&request)
        .await
        .map_err(report_failure)?;

    if let Some(assessor) = args.assessor {
        assessment.set_assessor_name(assessor);
    }
    let review_date = args
        .review_date
        .unwrap_or_else(|| assessment.default_review_date());
    assessment.set_review_date(Some(review_date));

    let document = render_assessment(&assessment, args.format)?;
    match args.output {
        Some(path) => {
            let path = if path.is_dir() {
                path.join(assessment.suggested_file_name(args.format.extension()))
            } else {
                path
            };
            fs::write(&path, &document)
                .with_context(|| format!("failed to write assessment to {}", path.display()))?;
            info!(
                reference = %assessment.reference_id(Local::now().time()),
                path = %path.display(),
                "assessment saved"
            );
            println!("Saved risk assessment to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(document.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Log the technical cause and hand back a message fit for the person at the keyboard.
fn report_failure(err: AssessmentError) -> anyhow::Error {
    error!(error = %err, "risk assessment failed");
    match err {
        AssessmentError::Configuration(_) => anyhow::Error::new(err),
        other => anyhow::anyhow!("{} ({})", other.user_message(), other),
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    settings
        .try_deserialize()
        .with_context(|| format!("invalid configuration in {}", path.display()))
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("expected a date like 2025-09-01: {err}"))
}

fn list_age_groups() {
    for group in AgeGroup::ALL {
        println!(
            "- {label:<12} (alias: {aliases})",
            label = group.label(),
            aliases = group.aliases().join(", ")
        );
    }
}

fn print_matrix() {
    print!("{:<10}", "Severity");
    for likelihood in Likelihood::ALL {
        print!("{:>10}", likelihood.label());
    }
    println!();
    for severity in Severity::ALL {
        print!("{:<10}", severity.label());
        for likelihood in Likelihood::ALL {
            print!("{:>10}", risk_level(severity, likelihood).label());
        }
        println!();
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
