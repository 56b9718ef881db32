//! Slice pipeline: raw response text -> fence scanner -> part grouper ->
//! overlap aligner -> reassembled files.
//!
//! The pipeline is a single pass over one in-memory document. All run state
//! (counts, warnings, skipped files) lives in the returned [`SliceReport`],
//! so multiple runs can execute in the same process without interference.

use crate::config::Config;
use crate::error::SliceError;
use crate::grouper::group_blocks;
use crate::overlap::align_parts;
use crate::parser::scan_blocks;
use anyhow::{bail, Result};

/// One fully reassembled output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructedFile {
    /// Base path, normalized to forward-slash separators.
    pub path: String,
    pub content: String,
    /// How many sections were merged to produce this file (1 for plain files).
    pub parts_merged: usize,
    /// Total bytes dropped as duplicated overlap between adjacent parts.
    pub overlap_bytes_removed: usize,
}

/// Diagnostics for one slicing run.
#[derive(Debug, Clone, Default)]
pub struct SliceReport {
    pub blocks_parsed: usize,
    pub files_reconstructed: usize,
    pub total_overlap_bytes_removed: usize,
    /// Non-fatal oddities (duplicate parts, discarded sections).
    pub warnings: Vec<String>,
    /// Per-file structural failures; these files were skipped while the
    /// rest of the response continued processing.
    pub skipped: Vec<SliceError>,
}

#[derive(Debug, Clone)]
pub struct SliceOutcome {
    pub files: Vec<ReconstructedFile>,
    pub report: SliceReport,
}

/// Reassemble one response document into files.
pub fn slice_document(text: &str, cfg: &Config) -> Result<SliceOutcome> {
    slice_documents(&[text], cfg)
}

/// Reassemble a sequence of response documents into files.
///
/// Each document is scanned on its own, so a truncated final fence in one
/// document ends at that document's boundary instead of swallowing the
/// next document's headers as body text. The resulting block streams are
/// then merged, renumbered in document order, and grouped once: part
/// numbering and duplicate-part resolution span all documents.
///
/// Fails at the top level only when nothing could be reconstructed at all:
/// input with zero recognizable header+fence pairs, or input where every
/// file was structurally broken. Silently producing zero files would look
/// like success.
pub fn slice_documents(docs: &[&str], cfg: &Config) -> Result<SliceOutcome> {
    let mut blocks = Vec::new();
    let mut scan_errors = Vec::new();
    for doc in docs {
        let scan = scan_blocks(doc);
        for mut block in scan.blocks {
            block.sequence_index = blocks.len();
            blocks.push(block);
        }
        scan_errors.extend(scan.errors);
    }

    if blocks.is_empty() && scan_errors.is_empty() {
        bail!("no recognizable file sections in input (expected markdown headers with fenced code blocks)");
    }

    let mut report = SliceReport {
        blocks_parsed: blocks.len(),
        ..Default::default()
    };
    report.skipped.extend(scan_errors);

    let grouped = group_blocks(blocks);
    report.warnings.extend(grouped.warnings);
    report.skipped.extend(grouped.errors);

    let mut files = Vec::with_capacity(grouped.targets.len());
    for target in grouped.targets {
        let parts: Vec<&str> = target.parts.iter().map(|p| p.content.as_str()).collect();
        let aligned = align_parts(&parts, &cfg.overlap);

        let mut content = String::new();
        let mut overlap_removed = 0usize;
        for (part, plan) in parts.iter().zip(&aligned) {
            content.push_str(&part[plan.trim_prefix_len..]);
            overlap_removed += plan.trim_prefix_len;
        }

        files.push(ReconstructedFile {
            path: target.base_path.replace('\\', "/"),
            content,
            parts_merged: parts.len(),
            overlap_bytes_removed: overlap_removed,
        });
    }

    report.files_reconstructed = files.len();
    report.total_overlap_bytes_removed = files.iter().map(|f| f.overlap_bytes_removed).sum();

    if files.is_empty() {
        let detail: Vec<String> = report.skipped.iter().map(|e| e.to_string()).collect();
        bail!(
            "no file could be reconstructed from the input: {}",
            detail.join("; ")
        );
    }

    Ok(SliceOutcome { files, report })
}
