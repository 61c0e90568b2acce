//! Per-file eligibility
//!
//! Evaluation order, short-circuiting:
//!
//! 1. whitelist: when non-empty, the name must contain one keyword
//! 2. blacklist: any contained keyword rejects, even after a whitelist pass
//! 3. no episode threshold: accept
//! 4. ordinal not extractable: accept
//! 5. accept only ordinals strictly above the threshold
//!
//! Keyword matching is case-insensitive substring matching.

use sharemirror_core::domain::Task;

use crate::episode;

/// Why a file was accepted or rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The file should be transferred
    Accepted,
    /// A whitelist exists and no keyword matched
    NotWhitelisted,
    /// A blacklisted keyword matched
    Blacklisted(String),
    /// The episode ordinal is at or below the task's threshold
    AlreadySynced {
        /// Extracted ordinal
        episode: u32,
        /// Task threshold
        threshold: u32,
    },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Evaluates `filename` against the task's keywords and episode threshold
pub fn evaluate(filename: &str, task: &Task) -> Verdict {
    let lowered = filename.to_lowercase();

    let whitelist = task.whitelist();
    if !whitelist.is_empty() && !whitelist.iter().any(|k| lowered.contains(k.as_str())) {
        return Verdict::NotWhitelisted;
    }

    if let Some(hit) = task
        .blacklist()
        .into_iter()
        .find(|k| lowered.contains(k.as_str()))
    {
        return Verdict::Blacklisted(hit);
    }

    let threshold = task.episode_threshold();
    if threshold == 0 {
        return Verdict::Accepted;
    }

    match episode::extract_for_task(filename, task) {
        Some(n) if n <= threshold => Verdict::AlreadySynced {
            episode: n,
            threshold,
        },
        _ => Verdict::Accepted,
    }
}

/// Returns true if `filename` should be transferred for `task`
pub fn is_eligible(filename: &str, task: &Task) -> bool {
    evaluate(filename, task).is_accepted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_task as task;

    #[test]
    fn test_no_rules_accepts_everything() {
        assert!(is_eligible("anything.mkv", &task()));
    }

    #[test]
    fn test_whitelist_required() {
        let mut t = task();
        t.set_whitelist_keywords(Some("1080p, 4K".into()));
        assert!(is_eligible("Show.E01.1080P.mkv", &t));
        assert!(is_eligible("Show.E01.4k.mkv", &t));
        assert_eq!(evaluate("Show.E01.720p.mkv", &t), Verdict::NotWhitelisted);
    }

    #[test]
    fn test_blacklist_overrides_whitelist() {
        let mut t = task();
        t.set_keywords(Some("1080p".into()), Some("trailer".into()));
        assert_eq!(
            evaluate("Show.1080p.trailer.mp4", &t),
            Verdict::Blacklisted("trailer".into())
        );
        assert!(is_eligible("Show.1080p.mp4", &t));
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut t = task();
        t.set_episode_threshold(2);
        assert!(!is_eligible("Show S01E01.mp4", &t));
        assert_eq!(
            evaluate("Show S01E02.mp4", &t),
            Verdict::AlreadySynced {
                episode: 2,
                threshold: 2
            }
        );
        assert!(is_eligible("Show S01E03.mp4", &t));
    }

    #[test]
    fn test_unparseable_name_fails_open() {
        let mut t = task();
        t.set_episode_threshold(10);
        assert!(is_eligible("bonus-featurette.mkv", &t));
    }

    #[test]
    fn test_heuristics_off_disables_gating() {
        let mut t = task();
        t.set_episode_threshold(10);
        t.set_episode_use_regex(false);
        assert!(is_eligible("Show S01E01.mp4", &t));
    }

    #[test]
    fn test_task_pattern_is_used() {
        let mut t = task();
        t.set_episode_threshold(5);
        t.set_episode_regex(Some(r"Vol\.(\d+)".into())).unwrap();
        assert!(!is_eligible("Comic Vol.4 [09].zip", &t));
        assert!(is_eligible("Comic Vol.6 [01].zip", &t));
    }
}
