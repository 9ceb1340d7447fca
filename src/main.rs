// Command-line front end for payment-proof extraction.

#[cfg(feature = "tesseract")]
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use log::info;
use payproof::models::{PaymentProofReport, ReaderConfig, ValidationIssueType};
use payproof::processing::ImageProcessor;
use payproof::utils::{PaymentProofError, Result};
use payproof::PaymentProofReader;
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "payproof",
    version,
    about = "Extract reference numbers and amounts from GCash, Maya and bank screenshots"
)]
struct Cli {
    /// Log intermediate pipeline stages
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the full OCR pipeline on a screenshot
    Extract {
        image: PathBuf,

        /// Amount the payer claims to have sent
        #[arg(long, value_name = "AMOUNT")]
        expected_amount: Option<f64>,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Include the preprocessed bitmap as a base64 PNG data URL
        #[arg(long)]
        preview: bool,
    },
    /// Extract payment fields from already-recognized text ("-" reads stdin)
    Parse {
        input: String,

        /// Confidence reported by whatever recognized the text
        #[arg(long, default_value_t = 80.0)]
        native_confidence: f64,

        #[arg(long, value_name = "AMOUNT")]
        expected_amount: Option<f64>,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },
    /// Write the bitmap the recognition engine would see
    Preprocess { image: PathBuf, output: PathBuf },
}

#[derive(Serialize)]
struct ExtractOutput<'a> {
    #[serde(flatten)]
    report: &'a PaymentProofReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    preview: Option<String>,
}

fn print_detailed_report(report: &PaymentProofReport, preview: Option<&str>) {
    let result = &report.result;

    println!("\n===============================================");
    println!("      PAYMENT PROOF EXTRACTION REPORT");
    println!("===============================================\n");

    println!("PAYMENT INFORMATION:");
    println!("  Method: {}", result.method);
    println!(
        "  Reference Number: {}",
        result.reference_number.as_deref().unwrap_or("(not detected)")
    );
    match result.amount {
        Some(amount) => println!("  Amount: ₱{:.2}", amount),
        None => println!("  Amount: (not detected)"),
    }
    println!("  Confidence: {:.0}%", result.confidence);

    println!("\nRECOGNIZED TEXT:");
    if result.raw_text.trim().is_empty() {
        println!("  (none)");
    }
    for line in result.raw_text.lines().filter(|l| !l.trim().is_empty()) {
        println!("  | {}", line);
    }

    if !report.warnings.is_empty() {
        println!("\nWARNINGS:");
        for warning in &report.warnings {
            println!(
                "  - [{}] {}",
                match warning.issue_type {
                    ValidationIssueType::MissingReference => "REFERENCE",
                    ValidationIssueType::ShortReference => "REFERENCE",
                    ValidationIssueType::MissingAmount => "AMOUNT",
                    ValidationIssueType::AmountMismatch => "AMOUNT",
                    ValidationIssueType::LowConfidence => "CONFIDENCE",
                },
                warning.message
            );
        }
    }

    if let Some(preview) = preview {
        println!("\nPREVIEW:\n  {}", preview);
    }

    println!(
        "\nReview status: {}",
        if report.needs_review() {
            "NEEDS REVIEW"
        } else {
            "OK"
        }
    );
}

fn emit(report: &PaymentProofReport, preview: Option<String>, json: bool) -> Result<()> {
    if json {
        let output = ExtractOutput { report, preview };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_detailed_report(report, preview.as_deref());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ReaderConfig::from_file(path)
        }
        None => Ok(ReaderConfig::default()),
    }
}

fn read_text_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

#[cfg(feature = "tesseract")]
fn run_extract(
    image: &Path,
    expected_amount: Option<f64>,
    config: Option<&Path>,
    json: bool,
    preview: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let bytes = std::fs::read(image)?;
    let mut reader = PaymentProofReader::with_tesseract(config);

    let preview = if preview {
        let png = ImageProcessor::encode_png(&reader.prepare(&bytes))?;
        Some(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    } else {
        None
    };

    let report = reader.read_with_expected(&bytes, expected_amount);
    reader.terminate();
    emit(&report, preview, json)
}

#[cfg(not(feature = "tesseract"))]
fn run_extract(
    _image: &Path,
    _expected_amount: Option<f64>,
    _config: Option<&Path>,
    _json: bool,
    _preview: bool,
) -> Result<()> {
    Err(PaymentProofError::EngineInit(
        "payproof was built without the tesseract feature".to_string(),
    ))
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Extract {
            image,
            expected_amount,
            config,
            json,
            preview,
        } => run_extract(&image, expected_amount, config.as_deref(), json, preview),
        Command::Parse {
            input,
            native_confidence,
            expected_amount,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let text = read_text_input(&input)?;
            let reader = PaymentProofReader::text_only(config);
            let result = reader.extract_text(&text, native_confidence);
            let report = reader.review(result, expected_amount);
            emit(&report, None, json)
        }
        Command::Preprocess { image, output } => {
            let bytes = std::fs::read(&image)?;
            let reader = PaymentProofReader::text_only(ReaderConfig::default());
            let bitmap = reader.prepare(&bytes);
            if bitmap.width() == 0 || bitmap.height() == 0 {
                return Err(PaymentProofError::ImageProcessing(format!(
                    "Could not decode {}",
                    image.display()
                )));
            }
            std::fs::write(&output, ImageProcessor::encode_png(&bitmap)?)?;
            info!(
                "Wrote {}x{} bitmap to {}",
                bitmap.width(),
                bitmap.height(),
                output.display()
            );
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
