//! Batch processing command for multiple NF-e XML files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error};

use fiscai_core::batch::{paginate, BatchReport, ReviewFilter};
use fiscai_core::invoice::{Classifier, DocumentAnalyzer, NfeAnalyzer};
use fiscai_core::models::config::FiscaiConfig;
use fiscai_core::StatusColor;

use super::analyze::display_name;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Directory for canonical JSON exports
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Which documents to list
    #[arg(long, value_enum, default_value = "all")]
    filter: FilterArg,

    /// Page of the document list to show
    #[arg(long, default_value = "1")]
    page: usize,

    /// Documents per page (default from config)
    #[arg(long)]
    page_size: Option<usize>,

    /// Stop at the first file that fails to parse
    #[arg(long)]
    fail_fast: bool,

    /// Print the full batch report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum FilterArg {
    /// Every document
    All,
    /// Documents marked correct
    Correct,
    /// Documents that must be reviewed
    Incorrect,
}

impl From<FilterArg> for ReviewFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => ReviewFilter::All,
            FilterArg::Correct => ReviewFilter::Correct,
            FilterArg::Incorrect => ReviewFilter::Incorrect,
        }
    }
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = super::load_config(config_path)?;

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("xml")
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    if !args.json {
        println!(
            "{} Found {} files to process",
            style("ℹ").blue(),
            files.len()
        );
    }

    // Create output directory if specified
    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("=>-"),
    );

    let analyzer = NfeAnalyzer::from_config(&config);
    let mut report = BatchReport::new();

    for path in &files {
        let name = display_name(path);
        progress.set_message(name.clone());

        match analyze_file(path, &name, &analyzer) {
            Ok(analysis) => {
                if let Some(output_dir) = &args.output_dir {
                    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("nfe");
                    let output_path = output_dir.join(format!("{}.json", stem));
                    fs::write(&output_path, analysis.export_json(config.output.pretty_json)?)?;
                    debug!("Wrote canonical JSON to {}", output_path.display());
                }
                report.record_analysis(analysis);
            }
            Err(e) => {
                if args.fail_fast {
                    error!("Failed to process {}: {}", path.display(), e);
                    anyhow::bail!("Processing failed: {}", e);
                }
                report.record_failure(&name, &e);
            }
        }

        progress.inc(1);
    }

    progress.finish_and_clear();

    // Generate summary if requested
    if args.summary {
        let summary_path = args.output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &report)?;
        if !args.json {
            println!(
                "{} Summary written to {}",
                style("✓").green(),
                summary_path.display()
            );
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_documents(&report, &args, &config);
    print_counts(&report, analyzer.classifier(), &config);

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.total(),
        start.elapsed()
    );
    println!(
        "   {} correct, {} must be reviewed, {} failed",
        style(report.processed() - report.incorrect_count()).green(),
        style(report.incorrect_count()).red(),
        style(report.failures.len()).red()
    );

    if !report.failures.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for failure in &report.failures {
            println!("  - {}: {}", failure.name, failure.error);
        }
    }

    Ok(())
}

fn analyze_file(
    path: &Path,
    name: &str,
    analyzer: &NfeAnalyzer,
) -> anyhow::Result<fiscai_core::Analysis> {
    let xml = fs::read_to_string(path)?;
    Ok(analyzer.analyze(name, &xml)?)
}

fn print_documents(report: &BatchReport, args: &BatchArgs, config: &FiscaiConfig) {
    let filter = ReviewFilter::from(args.filter);
    let documents = report.filter(filter);
    let per_page = args.page_size.unwrap_or(config.report.items_per_page);
    let page = paginate(&documents, args.page, per_page);

    println!();
    println!("{}", style("Documents:").bold());

    if page.is_empty() {
        println!("  No documents match the selected filter.");
        return;
    }

    for document in page.items {
        let classification = &document.classification;
        let line = format!("{} ({})", document.name, classification.status);
        if classification.color.is_affirmative() {
            println!("  {} {}", style("✓").green(), line);
        } else {
            println!("  {} {}", style("✗").red(), style(line).red());
        }
    }

    println!(
        "  Showing documents {} to {} of {} (page {}/{})",
        page.start(),
        page.end(),
        page.total,
        page.number,
        page.total_pages
    );
}

fn print_counts(report: &BatchReport, classifier: &Classifier, config: &FiscaiConfig) {
    println!();
    println!("{}", style("CFOP counts:").bold());
    let prefix_len = config.report.cfop_group_len;
    for (cfop, count) in report.grouped_cfop_counts(prefix_len) {
        let line = format!("CFOP {}: {}", cfop, count);
        match report.cfop_highlight(&cfop, prefix_len, classifier) {
            StatusColor::Green => println!("  - {}", style(line).green()),
            StatusColor::Red => println!("  - {}", style(line).red()),
        }
    }

    println!();
    println!("{}", style("Classification counts:").bold());
    for (label, count) in &report.classification_counts {
        println!("  - {}: {}", label, count);
    }
}

fn write_summary(path: &Path, report: &BatchReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "id",
        "cnpj",
        "number",
        "series",
        "cfop",
        "ind_pres",
        "classification",
        "review_status",
        "processing_time_ms",
        "error",
    ])?;

    for document in &report.documents {
        let fields = &document.fields;
        wtr.write_record(&[
            document.name.clone(),
            "success".to_string(),
            fields.id.to_string(),
            fields.cnpj.to_string(),
            fields.number.to_string(),
            fields.series.to_string(),
            fields.cfop.to_string(),
            fields.ind_pres.to_string(),
            document.classification.presence.label().to_string(),
            document.classification.status.label().to_string(),
            document.processing_time_ms.to_string(),
            String::new(),
        ])?;
    }

    for failure in &report.failures {
        wtr.write_record([
            failure.name.as_str(),
            "error",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            "",
            failure.error.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
