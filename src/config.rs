use serde::{Deserialize, Serialize};
use std::path::Path;

/// Controls overlap detection between adjacent parts of a split file.
///
/// The window bound is a policy constant, not a property of the format:
/// models rarely repeat more than a couple hundred characters of trailing
/// context when resuming a truncated file, and scanning further only costs
/// time. Both knobs can be overridden via `.fenceweave.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlapConfig {
    /// Maximum candidate overlap length in bytes.
    pub max_window: usize,
    /// Smallest overlap worth trimming. Matches of 1-2 characters are
    /// coincidence, and trimming them would corrupt real content.
    pub min_len: usize,
}

impl Default for OverlapConfig {
    fn default() -> Self {
        Self {
            max_window: 256,
            min_len: 3,
        }
    }
}

/// Controls file discovery on the concatenation side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Files larger than this are skipped during concatenation.
    pub max_file_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            // 512 KB — enough for any real source file, blocks log/generated bloat.
            max_file_bytes: 512 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub overlap: OverlapConfig,
    pub scan: ScanConfig,
}

pub fn load_config(dir: &Path) -> Config {
    let primary = dir.join(".fenceweave.json");

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else {
        return Config::default();
    };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|_| Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.overlap.max_window, 256);
        assert_eq!(cfg.overlap.min_len, 3);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(".fenceweave.json"),
            r#"{ "overlap": { "max_window": 1024 } }"#,
        )
        .unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.overlap.max_window, 1024);
        assert_eq!(cfg.overlap.min_len, 3);
        assert_eq!(cfg.scan.max_file_bytes, 512 * 1024);
    }

    #[test]
    fn malformed_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".fenceweave.json"), "{ not json").unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.overlap.max_window, 256);
    }
}
