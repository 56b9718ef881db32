//! Part grouper: folds the ordered block stream into per-file part lists.
//!
//! A declared path ending in `.N` (positive integer) is a part suffix; the
//! remainder is the base path. Whether a lone `.1` means "part one" or a
//! file genuinely named `foo.1` cannot be decided from the text alone, so
//! the whole heuristic lives in [`split_part_suffix`] plus the sibling
//! check in [`group_blocks`], where it can be tightened without touching
//! the rest of the pipeline.

use crate::error::SliceError;
use crate::parser::Block;
use std::collections::HashMap;

/// The logical output file that one or more ordered parts reconstruct.
#[derive(Debug, Clone)]
pub struct FileTarget {
    /// Declared path with any part suffix stripped, as written.
    pub base_path: String,
    /// Parts in ascending part-number order. A single element for
    /// unsuffixed files.
    pub parts: Vec<Block>,
}

pub struct GroupResult {
    pub targets: Vec<FileTarget>,
    pub warnings: Vec<String>,
    pub errors: Vec<SliceError>,
}

/// Split a `.N` part suffix off a declared path.
///
/// Returns `(base_path, part_number)` when the path ends in a dot followed
/// by a positive integer. This only *proposes* the multi-part reading; the
/// caller still requires a sibling before committing to it.
pub fn split_part_suffix(declared: &str) -> Option<(&str, usize)> {
    let (base, digits) = declared.rsplit_once('.')?;
    if base.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = digits.parse().ok()?;
    if n == 0 {
        return None;
    }
    Some((base, n))
}

/// Part number 0 is reserved for an unsuffixed block that leads a group of
/// suffixed siblings (`a.py` followed by `a.py.1`, `a.py.2`, ...).
const LEAD_PART: usize = 0;

/// Group blocks by base path, resolving the numeric-suffix ambiguity and
/// duplicate parts.
///
/// A suffixed path is only treated as a part when at least one other block
/// proposes the same base with a different trailing integer, or an
/// unsuffixed block with that exact base exists in the same response. A
/// lone `report.2` with no siblings is a literal filename.
pub fn group_blocks(blocks: Vec<Block>) -> GroupResult {
    let mut warnings: Vec<String> = Vec::new();
    let mut errors: Vec<SliceError> = Vec::new();

    // First pass: for every proposed base, which distinct suffix numbers
    // appear, and which exact declared paths exist unsuffixed.
    let mut proposed: HashMap<String, Vec<usize>> = HashMap::new();
    let mut literal_paths: HashMap<String, usize> = HashMap::new();
    for b in &blocks {
        match split_part_suffix(&b.declared_path) {
            Some((base, n)) => {
                let nums = proposed.entry(base.to_string()).or_default();
                if !nums.contains(&n) {
                    nums.push(n);
                }
            }
            None => {
                *literal_paths.entry(b.declared_path.clone()).or_insert(0) += 1;
            }
        }
    }

    // Second pass: assign each block to (base, part_number).
    // keyed by base path -> (part_number -> Block), first-seen order kept
    // separately for deterministic output.
    let mut groups: HashMap<String, HashMap<usize, Block>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for block in blocks {
        let (base, part_no) = match split_part_suffix(&block.declared_path) {
            Some((base, n)) => {
                let siblings = proposed.get(base).map(Vec::as_slice).unwrap_or(&[]);
                let has_other_suffix = siblings.iter().any(|&m| m != n);
                let has_lead = literal_paths.contains_key(base);
                if has_other_suffix || has_lead {
                    (base.to_string(), n)
                } else {
                    // No sibling: literal filename, not a truncated part.
                    (block.declared_path.clone(), LEAD_PART)
                }
            }
            None => (block.declared_path.clone(), LEAD_PART),
        };

        let group = match groups.entry(base.clone()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(v) => {
                order.push(base.clone());
                v.insert(HashMap::new())
            }
        };

        match group.get(&part_no).map(|b| b.sequence_index) {
            // Later block supersedes an earlier attempt at the same part.
            Some(prev_seq) if prev_seq < block.sequence_index => {
                warnings.push(format!(
                    "duplicate part {part_no} for '{base}': discarding earlier section #{prev_seq}"
                ));
                group.insert(part_no, block);
            }
            Some(_) => {
                warnings.push(format!(
                    "duplicate part {part_no} for '{base}': discarding section #{}",
                    block.sequence_index
                ));
            }
            None => {
                group.insert(part_no, block);
            }
        }
    }

    // Final pass: order parts and enforce suffix contiguity from 1.
    let mut targets: Vec<FileTarget> = Vec::new();
    'groups: for base in order {
        let group = groups.remove(&base).unwrap_or_default();
        let mut numbered: Vec<(usize, Block)> = group.into_iter().collect();
        numbered.sort_by_key(|(n, _)| *n);

        let mut expected = if numbered.first().map(|(n, _)| *n) == Some(LEAD_PART) {
            LEAD_PART
        } else {
            1
        };
        for (n, _) in &numbered {
            if *n != expected {
                errors.push(SliceError::PartGap {
                    base_path: base.clone(),
                    expected,
                });
                continue 'groups;
            }
            expected = n + 1;
        }

        targets.push(FileTarget {
            base_path: base,
            parts: numbered.into_iter().map(|(_, b)| b).collect(),
        });
    }

    GroupResult {
        targets,
        warnings,
        errors,
    }
}
