//! Extract command - text, images and profile photo from a single PDF.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use pdfprobe_core::{Extraction, ExtractionResult, Extractor, PdfInput, ProbeConfig};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF file (`-` reads standard input)
    #[arg(required = true)]
    input: String,

    /// The input holds base64 text rather than PDF bytes
    #[arg(long)]
    base64: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Also write every extracted image into this directory
    #[arg(long)]
    images_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON result record
    Json,
    /// Plain text listing
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    let config = ProbeConfig::load(config_path.map(Path::new))?;
    let extractor = Extractor::with_config(config.pdf);

    // Input problems are reported in the result shape, with a failing exit code
    let data = match read_input(&args) {
        Ok(data) => data,
        Err(message) => {
            let result = ExtractionResult::failure(message);
            write_output(&args, &format_result(&result, None, args.format, args.pretty)?)?;
            return Ok(ExitCode::FAILURE);
        }
    };

    info!("Extracting {} bytes from {}", data.len(), args.input);

    let (result, extraction) = match extractor.extract_guarded(&data) {
        Ok(extraction) => (ExtractionResult::from_extraction(&extraction), Some(extraction)),
        Err(message) => (ExtractionResult::failure(message), None),
    };

    if let (Some(dir), Some(extraction)) = (&args.images_dir, &extraction) {
        let written = write_images(dir, extraction)?;
        eprintln!(
            "{} Wrote {} images to {}",
            style("✓").green(),
            written,
            dir.display()
        );
    }

    let output = format_result(&result, extraction.as_ref(), args.format, args.pretty)?;
    write_output(&args, &output)?;

    debug!("Total processing time: {:?}", start.elapsed());

    // Extraction failures are data, not process errors: callers parse stdout
    Ok(ExitCode::SUCCESS)
}

fn read_input(args: &ExtractArgs) -> Result<Vec<u8>, String> {
    let input = if args.input == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Failed to read standard input: {}", e))?;
        if args.base64 {
            PdfInput::Base64(String::from_utf8_lossy(&buf).into_owned())
        } else {
            PdfInput::Bytes(buf)
        }
    } else {
        let path = PdfInput::Path(PathBuf::from(&args.input));
        if args.base64 {
            let text = path.into_bytes().map_err(|e| e.to_string())?;
            PdfInput::Base64(String::from_utf8_lossy(&text).into_owned())
        } else {
            path
        }
    };

    input.into_bytes().map_err(|e| e.to_string())
}

fn write_images(dir: &Path, extraction: &Extraction) -> anyhow::Result<usize> {
    fs::create_dir_all(dir)?;

    for image in &extraction.images {
        let path = dir.join(image.file_name());
        fs::write(&path, &image.data)?;
        debug!("Wrote {} ({} bytes)", path.display(), image.data.len());
    }

    Ok(extraction.images.len())
}

fn write_output(args: &ExtractArgs, output: &str) -> anyhow::Result<()> {
    if let Some(output_path) = &args.output {
        fs::write(output_path, output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }
    Ok(())
}

fn format_result(
    result: &ExtractionResult,
    extraction: Option<&Extraction>,
    format: OutputFormat,
    pretty: bool,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json if pretty => Ok(result.to_json_pretty()?),
        OutputFormat::Json => Ok(result.to_json()?),
        OutputFormat::Text => Ok(format_text(result, extraction)),
    }
}

fn format_text(result: &ExtractionResult, extraction: Option<&Extraction>) -> String {
    if let Some(error) = result.error() {
        return format!("Extraction failed: {}\n", error);
    }

    let mut output = String::new();

    output.push_str("=== EXTRACTING TEXT ===\n");
    output.push_str(result.text());
    output.push_str(&format!("\n\n=== TOTAL: {} chars ===\n", result.text_length()));

    output.push_str("\n=== EXTRACTING IMAGES ===\n");
    for info in result.images() {
        let name = format!("p{}_img{}.{}", info.page, info.index, info.ext);
        let marker = if info.is_profile_candidate { "  [profile]" } else { "" };
        output.push_str(&format!(
            "  - {} ({} bytes, {}x{}){}\n",
            name, info.size, info.width, info.height, marker
        ));
    }

    let profile = extraction
        .and_then(Extraction::profile_image)
        .map(|img| img.file_name())
        .unwrap_or_else(|| "none".to_string());
    output.push_str(&format!("\nProfile photo: {}\n", profile));

    output
}
