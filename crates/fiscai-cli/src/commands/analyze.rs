//! Analyze command - classify a single NF-e XML file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use fiscai_core::invoice::{DocumentAnalyzer, DocumentReport, NfeAnalyzer};

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input NF-e XML file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Also write the canonical JSON tree to this path
    #[arg(long)]
    export_json: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text report
    Text,
}

pub async fn run(args: AnalyzeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let name = display_name(&args.input);
    let xml = fs::read_to_string(&args.input)?;

    let analyzer = NfeAnalyzer::from_config(&config);
    let analysis = analyzer
        .analyze(&name, &xml)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", name, e))?;

    if let Some(export_path) = &args.export_json {
        fs::write(export_path, analysis.export_json(config.output.pretty_json)?)?;
        println!(
            "{} Canonical JSON written to {}",
            style("✓").green(),
            export_path.display()
        );
    }

    let document = analysis.into_document();
    let output = format_document(&document, args.format)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// File name used as the document's display name.
pub fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn format_document(document: &DocumentReport, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(document)?),
        OutputFormat::Csv => format_csv(document),
        OutputFormat::Text => Ok(format_text(document)),
    }
}

fn format_csv(document: &DocumentReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    // Write header
    wtr.write_record([
        "filename",
        "id",
        "cnpj",
        "number",
        "series",
        "cfop",
        "ind_pres",
        "classification",
        "status",
    ])?;

    let fields = &document.fields;
    let classification = &document.classification;

    // Write data
    wtr.write_record(&[
        document.name.clone(),
        fields.id.to_string(),
        fields.cnpj.to_string(),
        fields.number.to_string(),
        fields.series.to_string(),
        fields.cfop.to_string(),
        fields.ind_pres.to_string(),
        classification.presence.label().to_string(),
        classification.status.label().to_string(),
    ])?;

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(document: &DocumentReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Document: {}\n\n", document.name));
    output.push_str(&document.classification.report);
    output.push('\n');

    let status = document.classification.status.label().to_uppercase();
    if document.classification.is_correct {
        output.push_str(&format!("Status: {}\n", style(status).green()));
    } else {
        output.push_str(&format!("Status: {}\n", style(status).red()));
    }

    output
}
