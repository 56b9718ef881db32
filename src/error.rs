use thiserror::Error;

/// Problems detected while turning a response document back into files.
///
/// These are per-file failures: the affected file is skipped and recorded in
/// the slice report while the rest of the response keeps processing. Only
/// "nothing could be reconstructed at all" is surfaced as a top-level error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    #[error("declared path '{0}' attempts to escape the output root")]
    PathTraversal(String),

    #[error("header '{path}' (section #{sequence_index}) has no code fence before end of document")]
    MissingFence { path: String, sequence_index: usize },

    #[error("file '{base_path}' is missing part {expected}; part numbers must be contiguous from 1")]
    PartGap { base_path: String, expected: usize },

    #[error("refusing to overwrite existing file '{0}' (pass --force to allow)")]
    WriteConflict(String),
}
