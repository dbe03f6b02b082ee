//! gazecheck CLI - Command-line interface for gaze coding reconciliation
//!
//! Commands:
//! - run: Reconcile every annotation file in the automated directory (batch mode)
//! - subject: Reconcile a single annotation file
//! - pairs: Show which human-coding files each annotation file pairs with
//! - doctor: Diagnose directories and external tools

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use gazecheck::config::{PairingMode, ReconcileConfig};
use gazecheck::frame_time::FfprobeResolver;
use gazecheck::logging::init_logging;
use gazecheck::pairing::{list_file_names, subject_id_from_annotation, SubjectIndex};
use gazecheck::pipeline::ReconcileProcessor;
use gazecheck::report::{render_batch, render_subject, ReportFormat};
use gazecheck::{ReconcileError, PRODUCER_NAME, VERSION};

/// gazecheck - Validate automated infant gaze coding against human coding
#[derive(Parser)]
#[command(name = "gazecheck")]
#[command(version = VERSION)]
#[command(about = "Compare automated gaze annotations with human looking-time coding", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile every annotation file in the automated directory (batch mode)
    Run {
        #[command(flatten)]
        dirs: DirArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Exit with an error when any subject fails
        #[arg(long)]
        strict: bool,
    },

    /// Reconcile a single annotation file
    Subject {
        /// Automated annotation file (`<subject_id>_annotation.txt`)
        annotation: PathBuf,

        #[command(flatten)]
        dirs: DirArgs,

        /// Output format
        #[arg(long, default_value = "text")]
        output_format: OutputFormat,
    },

    /// Show the human-coding files each annotation file pairs with
    Pairs {
        #[command(flatten)]
        dirs: DirArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose directories and external tools
    Doctor {
        #[command(flatten)]
        dirs: DirArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct DirArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Automated annotation directory
    #[arg(long)]
    automated_dir: Option<PathBuf>,

    /// Human trial-definition directory
    #[arg(long)]
    human_input_dir: Option<PathBuf>,

    /// Human looking-time output directory
    #[arg(long)]
    human_output_dir: Option<PathBuf>,

    /// Session video directory
    #[arg(long)]
    video_dir: Option<PathBuf>,

    /// Video container extension
    #[arg(long)]
    video_extension: Option<String>,

    /// Pairing mode
    #[arg(long)]
    pairing: Option<PairingArg>,
}

impl DirArgs {
    fn load(&self) -> Result<ReconcileConfig, CliFailure> {
        let mut config = match &self.config {
            Some(path) => ReconcileConfig::from_json_file(path)?,
            None => ReconcileConfig::default(),
        };
        if let Some(dir) = &self.automated_dir {
            config.automated_dir = dir.clone();
        }
        if let Some(dir) = &self.human_input_dir {
            config.human_input_dir = dir.clone();
        }
        if let Some(dir) = &self.human_output_dir {
            config.human_output_dir = dir.clone();
        }
        if let Some(dir) = &self.video_dir {
            config.video_dir = dir.clone();
        }
        if let Some(ext) = &self.video_extension {
            config.video_extension = ext.clone();
        }
        if let Some(mode) = &self.pairing {
            config.pairing = match mode {
                PairingArg::Strict => PairingMode::Strict,
                PairingArg::Permissive => PairingMode::Permissive,
            };
        }
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable listing
    Text,
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::JsonPretty => ReportFormat::JsonPretty,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum PairingArg {
    /// Reject subject ids matching several files
    Strict,
    /// Take the first match in name order
    Permissive,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Run {
            dirs,
            output_format,
            output,
            strict,
        } => cmd_run(&dirs, output_format, &output, strict),

        Commands::Subject {
            annotation,
            dirs,
            output_format,
        } => cmd_subject(&annotation, &dirs, output_format),

        Commands::Pairs { dirs, json } => cmd_pairs(&dirs, json),

        Commands::Doctor { dirs, json } => cmd_doctor(&dirs, json),
    }
}

fn processor(config: ReconcileConfig) -> Result<ReconcileProcessor, CliFailure> {
    init_logging(&config.logging)?;
    let resolver = FfprobeResolver::new()?;
    Ok(ReconcileProcessor::new(config, Box::new(resolver)))
}

fn cmd_run(
    dirs: &DirArgs,
    output_format: OutputFormat,
    output: &Path,
    strict: bool,
) -> Result<(), CliFailure> {
    let config = dirs.load()?;
    config.validate()?;
    let processor = processor(config)?;

    let report = processor.run_batch()?;
    let rendered = render_batch(&report, output_format.into())?;

    if output.to_string_lossy() == "-" {
        print!("{}", rendered);
    } else {
        fs::write(output, rendered)?;
    }

    if strict && report.has_failures() {
        Err(CliFailure::SubjectsFailed(report.failed.len()))
    } else {
        Ok(())
    }
}

fn cmd_subject(
    annotation: &Path,
    dirs: &DirArgs,
    output_format: OutputFormat,
) -> Result<(), CliFailure> {
    let config = dirs.load()?;
    let processor = processor(config)?;

    let report = processor.run_subject(annotation)?;
    print!("{}", render_subject(&report, output_format.into())?);
    Ok(())
}

fn cmd_pairs(dirs: &DirArgs, json: bool) -> Result<(), CliFailure> {
    let config = dirs.load()?;
    let index = SubjectIndex::build(&config)?;

    let mut rows: Vec<PairRow> = Vec::new();
    let entries: Vec<PathBuf> = list_file_names(&config.automated_dir)?
        .into_iter()
        .map(|name| config.automated_dir.join(name))
        .collect();

    for path in entries {
        let row = match index.pair(&path) {
            Ok(files) => PairRow {
                annotation: path.display().to_string(),
                subject_id: files.subject_id,
                trial_definitions: Some(files.trial_definitions.display().to_string()),
                human_totals: Some(files.human_totals.display().to_string()),
                video: Some(files.video.display().to_string()),
                error: None,
            },
            Err(e) => PairRow {
                annotation: path.display().to_string(),
                subject_id: path
                    .file_name()
                    .map(|n| subject_id_from_annotation(&n.to_string_lossy()).to_string())
                    .unwrap_or_default(),
                trial_definitions: None,
                human_totals: None,
                video: None,
                error: Some(e.to_string()),
            },
        };
        rows.push(row);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Subject Pairing ({:?} mode)", config.pairing);
        println!("=======================");
        for row in &rows {
            match &row.error {
                None => {
                    println!("  [OK]  {}", row.subject_id);
                    println!("        trials: {}", row.trial_definitions.as_deref().unwrap_or("-"));
                    println!("        looks:  {}", row.human_totals.as_deref().unwrap_or("-"));
                    println!("        video:  {}", row.video.as_deref().unwrap_or("-"));
                }
                Some(error) => println!("  [ERR] {}: {}", row.subject_id, error),
            }
        }
    }

    Ok(())
}

fn cmd_doctor(dirs: &DirArgs, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} version {}", PRODUCER_NAME, VERSION),
    });

    let config = match dirs.load() {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "pairing mode {:?}, video extension .{}",
                    config.pairing,
                    config.video_extension.trim_start_matches('.')
                ),
            });
            Some(config)
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Cannot load configuration: {}", CliError::from(e).message),
            });
            None
        }
    };

    if let Some(config) = &config {
        for (name, dir) in config.directories() {
            let check = match fs::read_dir(dir) {
                Ok(entries) => {
                    let count = entries.filter_map(|e| e.ok()).count();
                    DoctorCheck {
                        name: name.to_string(),
                        status: if count == 0 { CheckStatus::Warning } else { CheckStatus::Ok },
                        message: format!("{} ({} entries)", dir.display(), count),
                    }
                }
                Err(e) => DoctorCheck {
                    name: name.to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read {}: {}", dir.display(), e),
                },
            };
            checks.push(check);
        }
    }

    checks.push(match FfprobeResolver::new() {
        Ok(resolver) => DoctorCheck {
            name: "ffprobe".to_string(),
            status: CheckStatus::Ok,
            message: format!("found at {}", resolver.ffprobe_path().display()),
        },
        Err(e) => DoctorCheck {
            name: "ffprobe".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.to_text());
    }

    match report.worst() {
        CheckStatus::Error => Err(CliFailure::DoctorFailed),
        CheckStatus::Ok | CheckStatus::Warning => Ok(()),
    }
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Reconcile(ReconcileError),
    Json(serde_json::Error),
    SubjectsFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ReconcileError> for CliFailure {
    fn from(e: ReconcileError) -> Self {
        CliFailure::Reconcile(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Reconcile(e) => {
                let hint = match &e {
                    ReconcileError::MissingPair { .. } | ReconcileError::AmbiguousPair { .. } => {
                        Some("Run 'gazecheck pairs' to inspect subject pairing".to_string())
                    }
                    ReconcileError::FrameTime(_) => {
                        Some("Run 'gazecheck doctor' to check ffprobe and the video directory".to_string())
                    }
                    ReconcileError::Io(_) => Some("Check the configured directories".to_string()),
                    _ => None,
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::SubjectsFailed(count) => CliError {
                code: "SUBJECTS_FAILED".to_string(),
                message: format!("{} subjects failed", count),
                hint: Some("Review the batch report for per-subject errors".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct PairRow {
    annotation: String,
    subject_id: String,
    trial_definitions: Option<String>,
    human_totals: Option<String>,
    video: Option<String>,
    error: Option<String>,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckStatus {
    fn tag(self) -> &'static str {
        match self {
            CheckStatus::Ok => "[OK]  ",
            CheckStatus::Warning => "[WARN]",
            CheckStatus::Error => "[ERR] ",
        }
    }
}

impl DoctorReport {
    /// Most severe status across all checks
    fn worst(&self) -> CheckStatus {
        self.checks
            .iter()
            .map(|check| check.status)
            .max()
            .unwrap_or(CheckStatus::Ok)
    }

    fn to_text(&self) -> String {
        let mut out = format!("{} {} environment\n", self.producer, self.version);
        for check in &self.checks {
            out.push_str(&format!("  {} {:<16} {}\n", check.status.tag(), check.name, check.message));
        }
        let verdict = match self.worst() {
            CheckStatus::Ok => "ready",
            CheckStatus::Warning => "ready, with warnings",
            CheckStatus::Error => "not ready",
        };
        out.push_str(&format!("Result: {}\n", verdict));
        out
    }
}
