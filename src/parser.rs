//! Fence scanner: tokenizes a raw model response into ordered
//! (declared path, fence body) blocks, ignoring surrounding prose.
//!
//! The input is semi-structured free text with no guaranteed format
//! discipline, so header recognition is a small ladder of explicit pattern
//! variants matched in priority order, and fence tracking is a line-based
//! state machine (no regex over block bodies).

use crate::error::SliceError;
use regex::Regex;
use std::sync::OnceLock;

/// One parsed header+fence unit, in response order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Path exactly as written in the header, possibly carrying a `.N`
    /// part suffix.
    pub declared_path: String,
    /// Fence body, verbatim. Each interior line keeps its trailing newline.
    pub content: String,
    /// Ordinal of this block's header among recognized header lines,
    /// rejected ones included; used as a tie-break and for diagnostics.
    pub sequence_index: usize,
}

/// Which header pattern variant matched. Kept for diagnostics; the ladder
/// is ordered strictest-first so the canonical concatenator output always
/// reports `HeadingBold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// `### **`path`**` (the format the concatenator emits).
    HeadingBold,
    /// `### `path``
    HeadingCode,
    /// `**`path`**` or `__`path`__`
    BoldCode,
    /// A lone `` `path` `` line. Weakest variant; only accepted when the
    /// span is path-shaped (contains `/` or an extension-like suffix).
    BareCode,
}

pub struct ScanResult {
    pub blocks: Vec<Block>,
    pub errors: Vec<SliceError>,
}

fn header_regexes() -> &'static [(HeaderStyle, Regex)] {
    static RES: OnceLock<Vec<(HeaderStyle, Regex)>> = OnceLock::new();
    RES.get_or_init(|| {
        // Emphasis pairs are matched tolerantly (`**` open / `__` close is
        // accepted); the regex crate has no backreferences and a model that
        // mismatches markers still clearly meant a header.
        vec![
            (
                HeaderStyle::HeadingBold,
                Regex::new(r"^\s*#{1,6}\s*(?:\*\*|__)\s*`([^`]+)`\s*(?:\*\*|__)\s*:?\s*$").unwrap(),
            ),
            (
                HeaderStyle::HeadingCode,
                Regex::new(r"^\s*#{1,6}\s*`([^`]+)`\s*:?\s*$").unwrap(),
            ),
            (
                HeaderStyle::BoldCode,
                Regex::new(r"^\s*(?:\*\*|__)\s*`([^`]+)`\s*(?:\*\*|__)\s*:?\s*$").unwrap(),
            ),
            (
                HeaderStyle::BareCode,
                Regex::new(r"^\s*`([^`]+)`\s*:?\s*$").unwrap(),
            ),
        ]
    })
}

fn extension_like() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\.\w{1,8}(\.\d+)?$").unwrap())
}

/// Try to read `line` as a file header. Returns the declared path and the
/// variant that matched.
pub fn match_header(line: &str) -> Option<(HeaderStyle, String)> {
    for (style, re) in header_regexes() {
        if let Some(caps) = re.captures(line) {
            let path = caps[1].trim().to_string();
            if path.is_empty() {
                continue;
            }
            if *style == HeaderStyle::BareCode && !looks_like_path(&path) {
                // A lone inline-code span is usually prose (`foo`), not a
                // file header. Only accept clearly path-shaped spans.
                continue;
            }
            return Some((*style, path));
        }
    }
    None
}

fn looks_like_path(span: &str) -> bool {
    span.contains('/') || extension_like().is_match(span)
}

/// A declared path must stay inside the output root. `..` segments and
/// absolute paths are structural errors, never silently sanitized: altering
/// them could write somewhere the author did not intend.
pub fn validate_declared_path(path: &str) -> Result<(), SliceError> {
    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return Err(SliceError::PathTraversal(path.to_string()));
    }
    if normalized.split('/').any(|seg| seg == "..") {
        return Err(SliceError::PathTraversal(path.to_string()));
    }
    Ok(())
}

fn has_drive_prefix(p: &str) -> bool {
    let bytes = p.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Returns Some(backtick_count) if `line` opens a code fence. A language
/// tag after the backticks is allowed; further backticks are not.
fn fence_open(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with("```") {
        return None;
    }
    let count = trimmed.bytes().take_while(|&b| b == b'`').count();
    let after = &trimmed[count..];
    if after.contains('`') {
        return None;
    }
    Some(count)
}

/// A closing fence has at least as many backticks as the opener and nothing
/// else on the line.
fn fence_close(line: &str, open_count: usize) -> bool {
    let trimmed = line.trim();
    if !trimmed.starts_with("```") {
        return false;
    }
    let count = trimmed.bytes().take_while(|&b| b == b'`').count();
    count >= open_count && trimmed.len() == count
}

enum State {
    Prose,
    InFence {
        backticks: usize,
        /// Declared path and section ordinal this fence belongs to; None
        /// means the fence had no preceding recognized header and is
        /// discarded on close.
        owner: Option<(String, usize)>,
        body: String,
    },
}

/// Scan the full response text into ordered blocks.
///
/// - Prose between a header and its fence is skipped.
/// - A fence with no preceding header is ignored, never attributed.
/// - A header directly followed by another header yields an empty block
///   (an intentionally emptied file is a legitimate edit).
/// - A header with no fence before end of document is a structural error.
/// - A fence still open at end of document is closed there; truncated
///   replies routinely end mid-fence.
pub fn scan_blocks(text: &str) -> ScanResult {
    let mut blocks: Vec<Block> = Vec::new();
    let mut errors: Vec<SliceError> = Vec::new();
    let mut pending: Option<(String, usize)> = None;
    // Ordinal among recognized header lines, including rejected ones, so
    // diagnostics point at the section's actual position in the document.
    let mut sections = 0usize;
    let mut state = State::Prose;

    fn emit(blocks: &mut Vec<Block>, path: String, content: String, sequence_index: usize) {
        blocks.push(Block {
            declared_path: path,
            content,
            sequence_index,
        });
    }

    for line in text.lines() {
        state = match state {
            State::Prose => {
                if let Some((_style, path)) = match_header(line) {
                    let ordinal = sections;
                    sections += 1;
                    if let Some((prev, prev_ordinal)) = pending.take() {
                        // Header directly after header: the earlier file is empty.
                        emit(&mut blocks, prev, String::new(), prev_ordinal);
                    }
                    match validate_declared_path(&path) {
                        Ok(()) => pending = Some((path, ordinal)),
                        Err(e) => {
                            errors.push(e);
                            // The next fence still belongs to the rejected
                            // header; leave pending empty so it is discarded.
                        }
                    }
                    State::Prose
                } else if let Some(backticks) = fence_open(line) {
                    State::InFence {
                        backticks,
                        owner: pending.take(),
                        body: String::new(),
                    }
                } else {
                    // Anything else is prose; ignore.
                    State::Prose
                }
            }
            State::InFence {
                backticks,
                mut owner,
                mut body,
            } => {
                if fence_close(line, backticks) {
                    if let Some((path, ordinal)) = owner.take() {
                        emit(&mut blocks, path, body, ordinal);
                    } else {
                        debug_log!(
                            "fenceweave: discarding fence with no header ({} bytes)",
                            body.len()
                        );
                    }
                    State::Prose
                } else {
                    body.push_str(line);
                    body.push('\n');
                    State::InFence {
                        backticks,
                        owner,
                        body,
                    }
                }
            }
        };
    }

    // End of document. Truncated replies routinely end mid-fence; an owned
    // open fence keeps its accumulated content.
    match state {
        State::InFence {
            owner: Some((path, ordinal)),
            body,
            ..
        } => emit(&mut blocks, path, body, ordinal),
        State::InFence { owner: None, .. } => {}
        State::Prose => {
            if let Some((path, ordinal)) = pending {
                errors.push(SliceError::MissingFence {
                    path,
                    sequence_index: ordinal,
                });
            }
        }
    }

    ScanResult { blocks, errors }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_header_and_fence() {
        let doc = "\n### **`src/main.rs`**\n\n```rust\nfn main() {}\n```\n";
        let res = scan_blocks(doc);
        assert!(res.errors.is_empty());
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].declared_path, "src/main.rs");
        assert_eq!(res.blocks[0].content, "fn main() {}\n");
        assert_eq!(res.blocks[0].sequence_index, 0);
    }

    #[test]
    fn header_variants_ladder() {
        assert_eq!(
            match_header("### **`a/b.py`**"),
            Some((HeaderStyle::HeadingBold, "a/b.py".to_string()))
        );
        assert_eq!(
            match_header("## `a/b.py`"),
            Some((HeaderStyle::HeadingCode, "a/b.py".to_string()))
        );
        assert_eq!(
            match_header("__`a/b.py`__"),
            Some((HeaderStyle::BoldCode, "a/b.py".to_string()))
        );
        assert_eq!(
            match_header("`a/b.py`"),
            Some((HeaderStyle::BareCode, "a/b.py".to_string()))
        );
        // Mismatched emphasis pairs are tolerated.
        assert_eq!(
            match_header("**`a/b.py`__"),
            Some((HeaderStyle::BoldCode, "a/b.py".to_string()))
        );
        // Trailing colon after the header is tolerated.
        assert_eq!(
            match_header("### **`a/b.py`**:"),
            Some((HeaderStyle::HeadingBold, "a/b.py".to_string()))
        );
    }

    #[test]
    fn bare_code_span_must_be_path_shaped() {
        assert!(match_header("`variable_name`").is_none());
        assert!(match_header("`config.toml`").is_some());
        assert!(match_header("`dir/file`").is_some());
        // Part-suffixed paths still look like paths.
        assert!(match_header("`big_module.py.2`").is_some());
    }

    #[test]
    fn prose_between_header_and_fence_is_skipped() {
        let doc = "\
### **`a.txt`**

Here is the updated file, with the fix applied:

```
hello
```
";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].content, "hello\n");
    }

    #[test]
    fn unrelated_fence_not_captured() {
        let doc = "\
Some explanation:

```python
print('just an example, not a file')
```

### **`real.py`**

```python
x = 1
```
";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].declared_path, "real.py");
    }

    #[test]
    fn header_then_header_yields_empty_file() {
        let doc = "\
### **`emptied.py`**
### **`kept.py`**

```python
pass
```
";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 2);
        assert_eq!(res.blocks[0].declared_path, "emptied.py");
        assert_eq!(res.blocks[0].content, "");
        assert_eq!(res.blocks[1].declared_path, "kept.py");
    }

    #[test]
    fn header_without_fence_is_structural_error() {
        let doc = "### **`lost.py`**\n\nThe model forgot the code here.\n";
        let res = scan_blocks(doc);
        assert!(res.blocks.is_empty());
        assert_eq!(
            res.errors,
            vec![SliceError::MissingFence {
                path: "lost.py".to_string(),
                sequence_index: 0,
            }]
        );
    }

    #[test]
    fn missing_fence_reports_section_position() {
        // A rejected header and a headerless fence come first; the missing
        // fence diagnostic must still point at the header's own position
        // among recognized sections, not at the count of surviving blocks.
        let doc = "\
### **`../evil`**

```
discarded
```

### **`lost.py`**

No code followed.
";
        let res = scan_blocks(doc);
        assert!(res.blocks.is_empty());
        assert!(res.errors.contains(&SliceError::MissingFence {
            path: "lost.py".to_string(),
            sequence_index: 1,
        }));
    }

    #[test]
    fn traversal_rejected_sibling_survives() {
        let doc = "\
### **`../../etc/passwd`**

```
root:x:0:0
```

### **`safe.txt`**

```
fine
```
";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].declared_path, "safe.txt");
        assert_eq!(
            res.errors,
            vec![SliceError::PathTraversal("../../etc/passwd".to_string())]
        );
    }

    #[test]
    fn absolute_and_drive_paths_rejected() {
        assert!(validate_declared_path("/etc/passwd").is_err());
        assert!(validate_declared_path("C:\\windows\\evil.dll").is_err());
        assert!(validate_declared_path("a/../b").is_err());
        assert!(validate_declared_path("a/b..c/d.txt").is_ok());
        assert!(validate_declared_path("dir with space/file.txt").is_ok());
    }

    #[test]
    fn unclosed_fence_at_eof_keeps_content() {
        let doc = "### **`cut.rs`**\n\n```rust\nfn truncated() {\n";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].content, "fn truncated() {\n");
    }

    #[test]
    fn longer_fence_can_contain_backtick_runs() {
        let doc = "\
### **`doc.md`**

````md
example:
```sh
ls
```
````
";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].content, "example:\n```sh\nls\n```\n");
    }

    #[test]
    fn indented_fence_tolerated() {
        let doc = "### **`a.txt`**\n\n  ```\n  content\n  ```\n";
        let res = scan_blocks(doc);
        assert_eq!(res.blocks.len(), 1);
        assert_eq!(res.blocks[0].content, "  content\n");
    }

    #[test]
    fn empty_input_no_blocks() {
        let res = scan_blocks("");
        assert!(res.blocks.is_empty());
        assert!(res.errors.is_empty());
    }
}
