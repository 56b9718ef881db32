use anyhow::{bail, Context, Result};
use clap::Parser;
use fenceweave::concat::concatenate;
use fenceweave::config::load_config;
use fenceweave::scanner::ScanOptions;
use fenceweave::slicer::slice_documents;
use fenceweave::writer::write_reconstructed;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fenceweave")]
#[command(version)]
#[command(about = "Concatenate a project tree into one LLM-pasteable markdown document, or slice a model reply back into files")]
struct Cli {
    /// Output file (concatenate mode) or output directory (slice mode)
    output: PathBuf,

    /// Files/folders to concatenate, or response documents to slice apart
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Overwrite the output file / already-existing sliced files
    #[arg(short, long)]
    force: bool,

    /// Slice a concatenated document (or model reply) back into files
    #[arg(short, long)]
    slice: bool,

    /// Exclude files or folders matching this glob (repeatable; concatenate mode)
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Include only files or folders matching this glob (repeatable; concatenate mode)
    #[arg(short = 'i', long = "include", value_name = "PATTERN")]
    include: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to get current dir")?;
    let cfg = load_config(&cwd);

    if cli.slice {
        run_slice(&cli, &cfg)
    } else {
        run_concat(&cli, &cfg)
    }
}

fn run_concat(cli: &Cli, cfg: &fenceweave::config::Config) -> Result<()> {
    let opts = ScanOptions::from_patterns(&cli.include, &cli.exclude, cfg.scan.max_file_bytes)?;
    let report = concatenate(&cli.output, &cli.paths, &opts, cli.force)?;

    for rel in &report.processed {
        println!("  Adding: {rel}");
    }
    for rel in &report.skipped_non_text {
        println!("  Skipped non-text file: {rel}");
    }
    for missing in &report.missing_inputs {
        eprintln!("Warning: '{missing}' does not exist, skipping.");
    }
    for rel in &report.lossy_converted {
        eprintln!("Warning: '{rel}' is not valid UTF-8; invalid bytes were replaced.");
    }

    println!("\nConcatenation complete.");
    println!("  Output file: {}", cli.output.display());
    println!("  Processed files: {}", report.processed.len());
    if !report.skipped_non_text.is_empty() {
        println!("  Skipped non-text files: {}", report.skipped_non_text.len());
    }
    if !report.lossy_converted.is_empty() {
        println!("  Lossy UTF-8 conversions: {}", report.lossy_converted.len());
    }

    if report.processed.is_empty() {
        bail!("no files were added to the output document");
    }
    Ok(())
}

fn run_slice(cli: &Cli, cfg: &fenceweave::config::Config) -> Result<()> {
    // Multiple response documents are scanned separately and merged, so
    // part numbering spans documents while a truncated fence at the end of
    // one document cannot swallow the next.
    let mut docs = Vec::with_capacity(cli.paths.len());
    for path in &cli.paths {
        let doc = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input document: {}", path.display()))?;
        docs.push(doc);
    }
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();

    let outcome = slice_documents(&docs, cfg)?;

    for warning in &outcome.report.warnings {
        eprintln!("Warning: {warning}");
    }
    for skipped in &outcome.report.skipped {
        eprintln!("Error: {skipped} (file skipped)");
    }

    std::fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output folder: {}", cli.output.display()))?;

    let mut written = 0usize;
    let mut conflicts = 0usize;
    for file in &outcome.files {
        match write_reconstructed(&cli.output, file, cli.force) {
            Ok(target) => {
                written += 1;
                if file.parts_merged > 1 {
                    println!(
                        "  Creating file: {} ({} parts, {} overlap bytes removed)",
                        target.display(),
                        file.parts_merged,
                        file.overlap_bytes_removed
                    );
                } else {
                    println!("  Creating file: {}", target.display());
                }
            }
            Err(e) => {
                conflicts += 1;
                eprintln!("Error: {e}");
            }
        }
    }

    println!("\nSlicing complete.");
    println!("  Files written: {written}");
    if conflicts > 0 {
        println!("  Files refused: {conflicts}");
    }
    if !outcome.report.skipped.is_empty() {
        println!("  Files skipped: {}", outcome.report.skipped.len());
    }

    if written == 0 {
        bail!("no files were written (all targets conflicted or were skipped)");
    }
    Ok(())
}
