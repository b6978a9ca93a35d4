use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use apollo_peptides::apollo::ApolloHttpClient;
use apollo_peptides::app::{App, RunOptions};
use apollo_peptides::config::ConfigLoader;
use apollo_peptides::domain::OrganismName;
use apollo_peptides::error::ApolloError;
use apollo_peptides::output::{JsonOutput, OutputMode, TextOutput};
use apollo_peptides::store::Store;

#[derive(Parser)]
#[command(name = "apollo-pep")]
#[command(about = "Retrieve peptide fasta for finished genes from an Apollo server")]
#[command(version, author)]
struct Cli {
    /// Apollo organism to retrieve
    #[arg(long)]
    organism: String,

    /// Path of the organism GFF3 file (reused if it already exists)
    #[arg(long)]
    gff: Utf8PathBuf,

    /// Output path of the peptide fasta
    #[arg(long)]
    pep: Utf8PathBuf,

    /// Path for logfile output (defaults to stderr)
    #[arg(long)]
    logfile: Option<Utf8PathBuf>,

    /// Feature graph snapshot, reused if present
    #[arg(long = "db")]
    snapshot: Option<Utf8PathBuf>,

    /// YAML file with Apollo connection details
    #[arg(long)]
    config: Option<String>,

    /// Download the annotation even if a local copy exists
    #[arg(long)]
    refresh: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(apollo) = report.downcast_ref::<ApolloError>() {
            return ExitCode::from(map_exit_code(apollo));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ApolloError) -> u8 {
    match error {
        ApolloError::MissingConfig
        | ApolloError::ConfigRead(_)
        | ApolloError::ConfigParse(_)
        | ApolloError::InvalidConfig(_)
        | ApolloError::MissingPassword
        | ApolloError::InvalidLogPath(_)
        | ApolloError::InvalidOrganism(_) => 2,
        ApolloError::AnnotationUnavailable(_) | ApolloError::HttpClient(_) => 3,
        _ => 1,
    }
}

fn init_logging(logfile: Option<&Utf8PathBuf>) -> Result<(), ApolloError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match logfile {
        Some(path) => {
            let parent = path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .map(|parent| parent.as_std_path())
                .unwrap_or(Path::new("."));
            if !parent.is_dir() {
                return Err(ApolloError::InvalidLogPath(parent.to_path_buf()));
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path.as_std_path())
                .map_err(|err| ApolloError::Filesystem(format!("open {path}: {err}")))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.logfile.as_ref())?;

    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let organism: OrganismName = cli.organism.parse()?;
    let connection = ConfigLoader::resolve(cli.config.as_deref())?;
    let client = ApolloHttpClient::new(connection)?;
    let store = Store::new(cli.gff, cli.pep, cli.snapshot);
    let app = App::new(store, client);
    let options = RunOptions {
        organism,
        refresh: cli.refresh,
    };

    match output_mode {
        OutputMode::Json => {
            let summary = app.run(options, &JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()
        }
        OutputMode::Text => {
            let summary = app.run(options, &TextOutput)?;
            TextOutput::print_summary(&summary).into_diagnostic()
        }
    }
}
