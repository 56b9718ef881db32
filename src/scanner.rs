//! Workspace scanning for the concatenation side: walk a directory tree,
//! apply include/exclude glob patterns, and classify files as text or
//! binary. The concatenator decides what to do with binaries.

use anyhow::{Context, Result};
use glob::Pattern;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileEntry {
    pub abs_path: PathBuf,
    /// Path relative to the parent of the scanned root, so the root folder
    /// name itself appears in the emitted document and survives the round
    /// trip.
    pub rel_path: PathBuf,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Basename glob patterns; when non-empty, only matching files (or
    /// files under a matching directory) are taken.
    pub include: Vec<Pattern>,
    /// Basename glob patterns; a match on any path component skips the
    /// file. Applied after includes.
    pub exclude: Vec<Pattern>,
    pub max_file_bytes: u64,
}

impl ScanOptions {
    pub fn from_patterns(include: &[String], exclude: &[String], max_file_bytes: u64) -> Result<Self> {
        let compile = |pats: &[String]| -> Result<Vec<Pattern>> {
            pats.iter()
                .map(|p| Pattern::new(p).with_context(|| format!("Invalid glob pattern: {p}")))
                .collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            max_file_bytes,
        })
    }
}

/// Extensions that are binary regardless of content.
const BINARY_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "ico", "svg", // images
    "mp3", "wav", "ogg", "flac", // audio
    "mp4", "avi", "mov", "mkv", // video
    "zip", "rar", "7z", "tar", "gz", // archives
    "exe", "dll", "so", "o", "pyc", "class", "wasm", // executables / objects
    "pdf", "woff", "woff2", "ttf", "eot",
];

/// Content probe: read the first KiB and look for null bytes or control
/// characters outside tab/newline/carriage-return. Cheap and good enough;
/// the alternative (full UTF-8 validation) misclassifies latin-1 sources.
pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
            return false;
        }
    }

    let Ok(bytes) = read_head(path, 1024) else {
        return false;
    };
    !bytes
        .iter()
        .any(|&b| b == 0 || (b < 32 && b != 9 && b != 10 && b != 13))
}

fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    use std::io::Read;
    let mut f = std::fs::File::open(path)?;
    let mut buf = vec![0u8; limit];
    let n = f.read(&mut buf)?;
    buf.truncate(n);
    Ok(buf)
}

fn matches_any(patterns: &[Pattern], name: &str) -> bool {
    patterns.iter().any(|p| p.matches(name))
}

/// True when the relative path passes the include/exclude filters.
///
/// Includes match the file's basename or any ancestor directory name (a
/// directory included explicitly brings its whole subtree). Excludes match
/// any path component and win over includes, mirroring how the emitted
/// document's consumer expects filtering to behave.
pub fn path_selected(rel: &Path, opts: &ScanOptions) -> bool {
    let components: Vec<&str> = rel
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    if components
        .iter()
        .any(|name| matches_any(&opts.exclude, name))
    {
        return false;
    }
    if opts.include.is_empty() {
        return true;
    }
    components
        .iter()
        .any(|name| matches_any(&opts.include, name))
}

/// Walk `root` (a directory) and return selected text files in sorted,
/// deterministic order. `.gitignore` and hidden files are respected via the
/// standard filters.
pub fn scan_tree(root: &Path, opts: &ScanOptions) -> Result<Vec<FileEntry>> {
    let base = root
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    let mut entries = Vec::new();
    let walker = WalkBuilder::new(root)
        .standard_filters(true) // .gitignore, .ignore, hidden, etc.
        .build();

    for item in walker {
        let dent = match item {
            Ok(d) => d,
            Err(_) => continue,
        };
        if !dent.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }

        let abs_path = dent.into_path();
        let rel_path = abs_path
            .strip_prefix(&base)
            .with_context(|| format!("{} is not under {}", abs_path.display(), base.display()))?
            .to_path_buf();

        if !path_selected(&rel_path, opts) {
            continue;
        }

        let bytes = match std::fs::metadata(&abs_path).map(|m| m.len()) {
            Ok(b) => b,
            Err(_) => continue,
        };
        if opts.max_file_bytes > 0 && bytes > opts.max_file_bytes {
            debug_log!(
                "fenceweave: skipping oversized file {} ({bytes} bytes)",
                rel_path.display()
            );
            continue;
        }

        entries.push(FileEntry {
            abs_path,
            rel_path,
            bytes,
        });
    }

    entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(entries)
}

/// Scan a single explicitly-listed file. Explicit files bypass include
/// patterns (naming a file on the command line is the strongest include)
/// but still honor excludes.
pub fn scan_single_file(path: &Path, opts: &ScanOptions) -> Result<Option<FileEntry>> {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    if matches_any(&opts.exclude, name) {
        return Ok(None);
    }

    let bytes = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat: {}", path.display()))?
        .len();
    if opts.max_file_bytes > 0 && bytes > opts.max_file_bytes {
        return Ok(None);
    }

    Ok(Some(FileEntry {
        abs_path: path.to_path_buf(),
        rel_path: PathBuf::from(name),
        bytes,
    }))
}
