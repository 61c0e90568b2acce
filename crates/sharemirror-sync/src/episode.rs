//! Episode ordinal extraction
//!
//! Derives a sortable episode number from a file name. A task may supply its
//! own pattern (one capturing group holding the number); otherwise a fixed
//! chain of common release-naming patterns is tried in order and the first
//! capture wins.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use sharemirror_core::domain::Task;

/// Fallback patterns, highest priority first
const DEFAULT_PATTERNS: [&str; 5] = [
    // S01E02: the episode part only
    r"[Ss]\d+[Ee](\d+)",
    // EP02 / E02
    r"(?i)[Ee][Pp]?(\d+)",
    // 第02集 / 第02话
    r"第(\d+)[集话]",
    // .E02.
    r"(?i)\.E(\d+)\.",
    // [02] / (02)
    r"[\[\(](\d+)[\]\)]",
];

fn default_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DEFAULT_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

fn capture_ordinal(re: &Regex, name: &str) -> Option<u32> {
    re.captures(name)?.get(1)?.as_str().parse().ok()
}

/// Extracts the episode ordinal from `filename`
///
/// Returns `None` when `use_heuristics` is false or nothing matches. A
/// custom pattern that fails to compile is logged and skipped.
pub fn extract(filename: &str, custom_pattern: Option<&str>, use_heuristics: bool) -> Option<u32> {
    if !use_heuristics {
        return None;
    }

    if let Some(pattern) = custom_pattern.filter(|p| !p.is_empty()) {
        match Regex::new(pattern) {
            Ok(re) => {
                if let Some(n) = capture_ordinal(&re, filename) {
                    return Some(n);
                }
            }
            Err(e) => warn!(pattern, error = %e, "Custom episode pattern does not compile"),
        }
    }

    for re in default_patterns() {
        if let Some(n) = capture_ordinal(re, filename) {
            debug!(filename, pattern = re.as_str(), episode = n, "Episode extracted");
            return Some(n);
        }
    }
    None
}

/// Extracts using the task's own pattern and heuristics flag
pub fn extract_for_task(filename: &str, task: &Task) -> Option<u32> {
    extract(filename, task.episode_regex(), task.episode_use_regex())
}
