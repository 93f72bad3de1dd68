use std::{
    io::Read,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::{
    ArtifactError, Classification, Detection, Detector, LabelConvention, LogisticModel, Model,
    model::Label,
};

/// Below this many whitespace-separated words a text is not classified.
pub const DEFAULT_MIN_WORDS: usize = 20;

#[derive(Parser, Debug)]
#[command(name = "prose-detector", version)]
#[command(about = "Detect AI-generated text from linguistic features", long_about = None)]
pub struct Cli {
    /// Text to analyze (if not provided, reads from stdin)
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Read text from file
    #[arg(short, long, value_name = "PATH", conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Batch process texts (one per line)
    #[arg(short, long, value_name = "PATH", conflicts_with_all = ["text", "file"])]
    pub batch: Option<PathBuf>,

    /// Batch process from JSON array
    #[arg(long, value_name = "PATH", conflicts_with_all = ["text", "file", "batch"])]
    pub batch_json: Option<PathBuf>,

    /// Model artifact (logistic JSON, or ONNX manifest with `--backend onnx`)
    #[arg(short, long, value_name = "PATH", env = "PROSE_DETECTOR_MODEL")]
    pub model: PathBuf,

    /// Model backend
    #[arg(long, value_enum, default_value = "logistic", env = "PROSE_DETECTOR_BACKEND")]
    pub backend: Backend,

    /// Model label meaning human-written (overrides the artifact)
    #[arg(long, value_name = "LABEL", env = "PROSE_DETECTOR_HUMAN_LABEL", allow_negative_numbers = true)]
    pub human_label: Option<Label>,

    /// Minimum number of words required before classifying (0 disables)
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MIN_WORDS, env = "PROSE_DETECTOR_MIN_WORDS")]
    pub min_words: usize,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "human")]
    pub format: OutputFormat,

    /// Custom class labels (comma-separated: human,ai)
    #[arg(long, value_delimiter = ',', num_args = 2, default_values = ["human", "ai"])]
    pub labels: Vec<String>,

    /// Quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (detailed output)
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Logistic regression stored as JSON
    Logistic,
    /// ONNX graph described by a JSON manifest (needs the `onnx` feature)
    Onnx,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Output just the class label
    Label,
    /// Output as JSON
    Json,
    /// Human-readable result followed by the extracted features
    Human,
    /// Only the extracted features, one per line
    Features,
}

#[derive(Clone, Copy)]
enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

enum InputSource {
    Single(String),
    Batch(Vec<String>),
}

/// What happened to one input text.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Report {
    /// Rejected by the minimum-words guard.
    TooShort { word_count: usize, min_words: usize },
    Classified {
        class_label: Option<String>,
        #[serde(flatten)]
        detection: Detection,
    },
}

impl Report {
    fn failed(&self) -> bool {
        matches!(self, Self::Classified { detection, .. } if !detection.is_ok())
    }
}

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let verbosity = match (cli.quiet, cli.verbose) {
        (true, _) => Verbosity::Quiet,
        (_, true) => Verbosity::Verbose,
        _ => Verbosity::Normal,
    };
    init_tracing(verbosity);

    let detector = load_detector(cli)?;
    debug!(?detector, "Detector ready");

    let reports = match determine_input_source(cli)? {
        InputSource::Single(text) => {
            let report = process_single(&detector, &text, cli, verbosity);
            output_report(&report, cli)?;
            vec![report]
        }
        InputSource::Batch(texts) => {
            let reports = process_batch(&detector, &texts, cli, verbosity);
            output_batch_reports(&reports, cli)?;
            reports
        }
    };

    Ok(if reports.iter().any(Report::failed) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn init_tracing(verbosity: Verbosity) {
    let default_directive = match verbosity {
        Verbosity::Quiet => "error",
        Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    // a subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Load the model artifact and apply the label override.
pub fn load_detector(cli: &Cli) -> Result<Detector> {
    let model = load_model(cli.backend, &cli.model).map_err(|err| match err {
        ArtifactError::NotFound(path) => anyhow::anyhow!(
            "model artifact not found: {} (pass --model or set PROSE_DETECTOR_MODEL)",
            path.display()
        ),
        other => anyhow::Error::new(other)
            .context(format!("Failed to load model from {}", cli.model.display())),
    })?;

    let detector = Detector::new(model);
    Ok(match cli.human_label {
        Some(label) => detector.with_label_convention(LabelConvention::new(label)),
        None => detector,
    })
}

fn load_model(backend: Backend, path: &Path) -> Result<Arc<dyn Model>, ArtifactError> {
    match backend {
        Backend::Logistic => Ok(Arc::new(LogisticModel::from_file(path)?)),
        #[cfg(feature = "onnx")]
        Backend::Onnx => Ok(Arc::new(crate::model::OnnxModel::from_manifest(path)?)),
        #[cfg(not(feature = "onnx"))]
        Backend::Onnx => Err(ArtifactError::Onnx(
            "this build does not include the `onnx` feature".into(),
        )),
    }
}

/// Determine input source from CLI args
fn determine_input_source(cli: &Cli) -> Result<InputSource> {
    // Priority: text arg > file > batch > batch_json > stdin
    if let Some(text) = &cli.text {
        return Ok(InputSource::Single(text.clone()));
    }

    if let Some(path) = &cli.file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        return Ok(InputSource::Single(text));
    }

    if let Some(path) = &cli.batch {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch file: {}", path.display()))?;
        let texts = contents.lines().map(String::from).collect();
        return Ok(InputSource::Batch(texts));
    }

    if let Some(path) = &cli.batch_json {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON batch file: {}", path.display()))?;
        let texts: Vec<String> =
            serde_json::from_str(&contents).with_context(|| "Failed to parse JSON array")?;
        return Ok(InputSource::Batch(texts));
    }

    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    if buffer.trim().is_empty() {
        bail!("No input text: pass TEXT, --file, --batch, --batch-json or pipe text on stdin");
    }
    Ok(InputSource::Single(buffer))
}

fn class_label(classification: Classification, labels: &[String]) -> String {
    let idx = match classification {
        Classification::Human => 0,
        Classification::AI => 1,
    };
    labels
        .get(idx)
        .cloned()
        .unwrap_or_else(|| classification.to_string())
}

fn process_single(detector: &Detector, text: &str, cli: &Cli, verbosity: Verbosity) -> Report {
    let word_count = text.split_whitespace().count();
    if word_count < cli.min_words {
        return Report::TooShort {
            word_count,
            min_words: cli.min_words,
        };
    }

    let start = matches!(verbosity, Verbosity::Verbose).then(Instant::now);
    let detection = detector.classify_text(text);
    if let Some(start_time) = start {
        info!(elapsed = ?start_time.elapsed(), "Classified text");
    }

    Report::Classified {
        class_label: detection
            .classification
            .map(|class| class_label(class, &cli.labels)),
        detection,
    }
}

/// Process multiple texts
fn process_batch(
    detector: &Detector,
    texts: &[String],
    cli: &Cli,
    verbosity: Verbosity,
) -> Vec<Report> {
    let show_progress = matches!(verbosity, Verbosity::Normal | Verbosity::Verbose)
        && texts.len() > 10
        && !matches!(cli.format, OutputFormat::Json);

    let mut reports = Vec::with_capacity(texts.len());
    for (i, text) in texts.iter().enumerate() {
        if show_progress && i % 10 == 0 {
            eprintln!("Processing {}/{}", i + 1, texts.len());
        }
        reports.push(process_single(detector, text, cli, verbosity));
    }

    if show_progress {
        eprintln!("Completed processing {} texts", texts.len());
    }
    reports
}

fn render_features(detection: &Detection) -> String {
    let width = detection
        .features
        .names()
        .map(str::len)
        .max()
        .unwrap_or_default();
    detection
        .features
        .iter()
        .map(|(name, value)| format!("  {name:<width$}  {value:.4}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a single report based on format
fn render_report(report: &Report, cli: &Cli) -> Result<String> {
    let rendered = match (cli.format, report) {
        (OutputFormat::Json, report) => serde_json::to_string(report)?,
        (_, Report::TooShort {
            word_count,
            min_words,
        }) => format!("Too short: {word_count} words, at least {min_words} required"),
        (
            OutputFormat::Label,
            Report::Classified {
                class_label,
                detection,
            },
        ) => match (class_label, &detection.error) {
            (Some(label), _) => label.clone(),
            (None, error) => format!("error: {}", error.as_deref().unwrap_or("unknown")),
        },
        (OutputFormat::Features, Report::Classified { detection, .. }) => {
            render_features(detection)
        }
        (
            OutputFormat::Human,
            Report::Classified {
                class_label,
                detection,
            },
        ) => {
            let headline = match (detection.classification, class_label) {
                (Some(Classification::Human), Some(label)) => {
                    format!("Result: {label} (human-written)")
                }
                (Some(Classification::AI), Some(label)) => {
                    format!("Result: {label} (AI-generated)")
                }
                _ => format!(
                    "Prediction failed: {}",
                    detection.error.as_deref().unwrap_or("unknown error")
                ),
            };
            if cli.quiet {
                headline
            } else {
                format!("{headline}\nExtracted features:\n{}", render_features(detection))
            }
        }
    };
    Ok(rendered)
}

fn output_report(report: &Report, cli: &Cli) -> Result<()> {
    println!("{}", render_report(report, cli)?);
    Ok(())
}

/// Output batch results
fn output_batch_reports(reports: &[Report], cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            // Output as JSON array for batch mode
            println!("{}", serde_json::to_string(reports)?);
        }
        _ => {
            for report in reports {
                output_report(report, cli)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const MODEL_JSON: &str = r#"{
        "feature_names_in": ["burstiness", "made_up_feature"],
        "coef": [10.0, 1.0],
        "intercept": -2.0
    }"#;

    const LONG_HUMAN_TEXT: &str = "I went out. The rain had stopped, finally, after what felt like a week of grey skies and wet shoes, and the street smelled of leaves! Home.";

    fn model_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MODEL_JSON.as_bytes()).unwrap();
        file
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("prose-detector").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults() {
        let cli = cli(&["--model", "model.json", "some text"]);
        assert_eq!(cli.text.as_deref(), Some("some text"));
        assert_eq!(cli.backend, Backend::Logistic);
        assert_eq!(cli.min_words, DEFAULT_MIN_WORDS);
        assert_eq!(cli.format, OutputFormat::Human);
        assert_eq!(cli.labels, vec!["human", "ai"]);
        assert_eq!(cli.human_label, None);
    }

    #[test]
    fn test_cli_rejects_conflicting_inputs() {
        let result = Cli::try_parse_from([
            "prose-detector",
            "--model",
            "m.json",
            "--file",
            "a.txt",
            "--batch",
            "b.txt",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_detector_reports_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Pipeline.json");
        let cli = cli(&["--model", path.to_str().unwrap(), "text"]);
        let err = load_detector(&cli).unwrap_err();
        assert!(err.to_string().contains("model artifact not found"));
    }

    #[test]
    fn test_load_detector_applies_label_override() {
        let file = model_file();
        let cli = cli(&[
            "--model",
            file.path().to_str().unwrap(),
            "--human-label",
            "0",
            "text",
        ]);
        let detector = load_detector(&cli).unwrap();
        assert_eq!(detector.label_convention(), LabelConvention::new(0));
    }

    #[test]
    fn test_short_text_is_not_classified() {
        let file = model_file();
        let cli = cli(&["--model", file.path().to_str().unwrap(), "too short"]);
        let detector = load_detector(&cli).unwrap();
        let report = process_single(&detector, "too short", &cli, Verbosity::Normal);
        assert!(matches!(
            report,
            Report::TooShort {
                word_count: 2,
                min_words: DEFAULT_MIN_WORDS
            }
        ));
        assert!(!report.failed());
        assert!(render_report(&report, &cli).unwrap().starts_with("Too short"));
    }

    #[test]
    fn test_min_words_zero_classifies_everything() {
        let file = model_file();
        let cli = cli(&["--model", file.path().to_str().unwrap(), "--min-words", "0", "x"]);
        let detector = load_detector(&cli).unwrap();
        let report = process_single(&detector, "", &cli, Verbosity::Normal);
        assert!(matches!(report, Report::Classified { .. }));
    }

    #[test]
    fn test_human_output_lists_features() {
        let file = model_file();
        let cli = cli(&["--model", file.path().to_str().unwrap(), LONG_HUMAN_TEXT]);
        let detector = load_detector(&cli).unwrap();
        let report = process_single(&detector, LONG_HUMAN_TEXT, &cli, Verbosity::Normal);

        let rendered = render_report(&report, &cli).unwrap();
        assert!(rendered.starts_with("Result: human (human-written)"));
        assert!(rendered.contains("Extracted features:"));
        assert!(rendered.contains("burstiness"));
        assert!(rendered.contains("predictability_score"));
    }

    #[test]
    fn test_json_output_includes_model_input() {
        let file = model_file();
        let cli = cli(&[
            "--model",
            file.path().to_str().unwrap(),
            "-o",
            "json",
            LONG_HUMAN_TEXT,
        ]);
        let detector = load_detector(&cli).unwrap();
        let report = process_single(&detector, LONG_HUMAN_TEXT, &cli, Verbosity::Normal);

        let json: serde_json::Value =
            serde_json::from_str(&render_report(&report, &cli).unwrap()).unwrap();
        assert_eq!(json["status"], "classified");
        assert_eq!(json["class_label"], "human");
        assert_eq!(json["classification"], "Human");
        assert_eq!(
            json["model_input"]["names"],
            serde_json::json!(["burstiness", "made_up_feature"])
        );
        assert_eq!(json["model_input"]["values"][1], 0.0);
        assert_eq!(json["features"].as_object().unwrap().len(), 13);
    }

    #[test]
    fn test_label_output_uses_custom_labels() {
        let file = model_file();
        let cli = cli(&[
            "--model",
            file.path().to_str().unwrap(),
            "-o",
            "label",
            "--labels",
            "person,machine",
            LONG_HUMAN_TEXT,
        ]);
        let detector = load_detector(&cli).unwrap();
        let report = process_single(&detector, LONG_HUMAN_TEXT, &cli, Verbosity::Normal);
        assert_eq!(render_report(&report, &cli).unwrap(), "person");
    }

    #[test]
    fn test_onnx_backend_rejects_logistic_artifact() {
        let file = model_file();
        let cli = cli(&["--model", file.path().to_str().unwrap(), "--backend", "onnx", "x"]);
        assert!(load_detector(&cli).is_err());
    }
}
