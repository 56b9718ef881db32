//! Concatenator: emits the header+fence document the slicer consumes.
//!
//! The two stay bit-compatible by construction: every section written here
//! parses back through the fence scanner into the identical byte stream,
//! so `slice(concatenate(tree)) == tree` for newline-terminated text files.
//! (The fence format cannot represent a missing final newline; one is
//! appended when needed, which is the sole normalization performed.)

use crate::scanner::{is_text_file, scan_single_file, scan_tree, FileEntry, ScanOptions};
use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Code-fence language tag for a file extension. Unknown extensions get an
/// untagged fence.
pub fn fence_language(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return "";
    };
    match ext.to_ascii_lowercase().as_str() {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "html" => "html",
        "css" => "css",
        "sh" => "bash",
        "java" => "java",
        "cpp" | "cc" | "hpp" => "c++",
        "c" | "h" => "c",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "rb" => "ruby",
        "rs" => "rust",
        "go" => "go",
        "md" => "md",
        "sql" => "sql",
        _ => "",
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConcatReport {
    /// Relative paths written into the document, in order.
    pub processed: Vec<String>,
    pub skipped_non_text: Vec<String>,
    pub missing_inputs: Vec<String>,
    /// Files that were not valid UTF-8 and had invalid bytes replaced.
    /// These break the byte-identical round trip and must be disclosed.
    pub lossy_converted: Vec<String>,
}

/// Write one file section: blank separator, bold backticked path header,
/// then the content in a fence. The exact shape here is what the fence
/// scanner's primary header variant recognizes.
///
/// The fence grows beyond three backticks when the content itself contains
/// a bare backtick-run line (markdown files embedding fences), so the
/// slicer's close detection cannot fire early.
pub fn write_section<W: Write>(out: &mut W, rel_path: &str, language: &str, content: &str) -> Result<()> {
    let fence = "`".repeat(fence_len_for(content));
    write!(out, "\n### **`{rel_path}`**\n\n{fence}{language}\n")?;
    out.write_all(content.as_bytes())?;
    if !content.is_empty() && !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    writeln!(out, "{fence}")?;
    Ok(())
}

fn fence_len_for(content: &str) -> usize {
    let mut longest = 0usize;
    for line in content.lines() {
        let t = line.trim();
        if !t.is_empty() && t.bytes().all(|b| b == b'`') {
            longest = longest.max(t.len());
        }
    }
    (longest + 1).max(3)
}

fn emit_entry<W: Write>(out: &mut W, entry: &FileEntry, report: &mut ConcatReport) -> Result<()> {
    let rel = entry.rel_path.to_string_lossy().replace('\\', "/");

    if !is_text_file(&entry.abs_path) {
        report.skipped_non_text.push(rel);
        return Ok(());
    }

    let (content, lossy) = read_text(&entry.abs_path)
        .with_context(|| format!("Failed to read file: {}", entry.abs_path.display()))?;
    write_section(out, &rel, fence_language(&entry.rel_path), &content)?;
    if lossy {
        report.lossy_converted.push(rel.clone());
    }
    report.processed.push(rel);
    Ok(())
}

/// Read file content as text, tolerating non-UTF-8 sources by lossy
/// conversion (latin-1 comments in old codebases are common and not worth
/// failing the whole run for). The flag reports whether any bytes were
/// replaced, since such files no longer round-trip byte-identically.
fn read_text(path: &Path) -> Result<(String, bool)> {
    let bytes = std::fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok((text, false)),
        Err(e) => Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), true)),
    }
}

/// Concatenate files and directory trees into a single markdown document at
/// `output`. Refuses to clobber an existing output unless `force` is set.
pub fn concatenate(
    output: &Path,
    inputs: &[PathBuf],
    opts: &ScanOptions,
    force: bool,
) -> Result<ConcatReport> {
    if output.exists() && !force {
        bail!(
            "output file '{}' already exists (pass --force to overwrite)",
            output.display()
        );
    }

    let mut report = ConcatReport::default();
    let file = std::fs::File::create(output)
        .with_context(|| format!("Failed to create output: {}", output.display()))?;
    let mut out = std::io::BufWriter::new(file);

    for input in inputs {
        let meta = match std::fs::metadata(input) {
            Ok(m) => m,
            Err(_) => {
                report.missing_inputs.push(input.to_string_lossy().to_string());
                continue;
            }
        };

        if meta.is_file() {
            if let Some(entry) = scan_single_file(input, opts)? {
                emit_entry(&mut out, &entry, &mut report)?;
            }
        } else if meta.is_dir() {
            for entry in scan_tree(input, opts)? {
                emit_entry(&mut out, &entry, &mut report)?;
            }
        } else {
            report.missing_inputs.push(input.to_string_lossy().to_string());
        }
    }

    out.flush().context("Failed to flush output document")?;
    Ok(report)
}
