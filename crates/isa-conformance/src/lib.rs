//! Test-vector conformance runner for the `isa-semantics` instruction model.
//!
//! Suites of fixed vectors are evaluated in declaration order against the model, stopping at the
//! first mismatch. Optionally every deterministic vector is also executed natively on the host
//! (`x86_64` only) and the two results must agree bit for bit.
//!
//! ## Environment variables
//!
//! When running via [`run_from_env`], the following environment variables are recognised:
//!
//! - `ISA_CONFORMANCE_FILTER` (optional): only run suites whose name, or one of whose
//!   instruction mnemonics, contains one of the filter terms (case-insensitive).
//! - `ISA_CONFORMANCE_REPORT_PATH` (optional): write a JSON conformance report to this path
//!   (on first failure and again at the end of the run).
//! - `ISA_CONFORMANCE_RDTSC_MAX_SPINS` (default: `1_000_000`): how many times RDTSC is re-read
//!   before a counter that has not advanced is reported as stalled.
//! - `ISA_CONFORMANCE_REFERENCE` (optional): `1` cross-checks results against the host CPU.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod reference;
pub mod report;
pub mod runner;
pub mod suites;
pub mod vector;
pub mod vector_file;

pub use config::RunConfig;
pub use error::{ConformanceError, Result};
pub use reference::ReferenceBackend;
pub use report::{ConformanceReport, CoverageSummary, SuiteSummary, UndefinedObservation, UsageSink};
pub use runner::Runner;
pub use vector::{Expected, Inputs, Suite, TestVector};

use std::collections::BTreeSet;

pub fn run_from_env() -> Result<ConformanceReport> {
    run(&RunConfig::from_env())
}

/// Runs the built-in suites selected by `config` on the host TSC.
pub fn run(config: &RunConfig) -> Result<ConformanceReport> {
    run_suites(suites::all_suites(), config)
}

/// Runs the suites selected by `config` out of `suites`, in order.
pub fn run_suites(suites: Vec<Suite>, config: &RunConfig) -> Result<ConformanceReport> {
    let suites = suites_for_run(suites, config.filter.as_deref())?;

    let mut runner = Runner::new(config.clone());
    if config.reference {
        let backend =
            ReferenceBackend::new().map_err(|e| ConformanceError::ReferenceUnavailable(e.into()))?;
        runner.attach_reference(backend);
    }

    let report = runner.run_all(&suites)?;
    report.print_summary();
    Ok(report)
}

/// Narrows `suites` to those matching `filter`; no filter (or an empty one) keeps everything.
pub fn suites_for_run(suites: Vec<Suite>, filter: Option<&str>) -> Result<Vec<Suite>> {
    let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) else {
        return Ok(suites);
    };

    let terms = parse_filter_terms(filter);
    if terms.is_empty() {
        return Ok(suites);
    }

    let names = suites
        .iter()
        .map(|s| s.name.to_ascii_lowercase())
        .collect::<BTreeSet<_>>();

    let filtered: Vec<Suite> = suites
        .into_iter()
        .filter(|s| suite_matches_filter(s, &terms))
        .collect();

    if filtered.is_empty() {
        let names = names.into_iter().collect::<Vec<_>>().join("\n  - ");
        return Err(ConformanceError::Filter(format!(
            "{}={filter:?} matched 0 suites.\n\
known suites:\n  - {names}\n\
hint: filter terms match substrings in suite names or instruction mnemonics.\n\
      use `suite:<name>` to match a suite exactly, or `insn:<substring>` to match mnemonics only.",
            config::ENV_FILTER
        )));
    }

    Ok(filtered)
}

fn parse_filter_terms(filter: &str) -> Vec<String> {
    filter
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

fn suite_matches_filter(suite: &Suite, terms: &[String]) -> bool {
    let name = suite.name.to_ascii_lowercase();
    let mnemonics = suite.mnemonics();
    // Suite names may contain spaces ("lock cmpxchg"), which split into separate terms; `suite:`
    // therefore also accepts `_` in place of a space.
    terms.iter().any(|term| {
        let (mode, term) = if let Some(term) = term.strip_prefix("suite:") {
            ("suite", term)
        } else if let Some(term) = term.strip_prefix("insn:") {
            ("insn", term)
        } else {
            ("auto", term.as_str())
        };

        if term.is_empty() {
            return false;
        }

        let insn_match = || mnemonics.iter().any(|m| m.contains(term));
        match mode {
            "suite" => name == term || name.replace(' ', "_") == term,
            "insn" => insn_match(),
            _ => name.contains(term) || insn_match(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    struct EnvGuard {
        key: &'static str,
        prev: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let prev = std::env::var_os(key);
            std::env::set_var(key, val);
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(prev) = self.prev.take() {
                std::env::set_var(self.key, prev);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn names(suites: &[Suite]) -> Vec<&str> {
        suites.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn filter_matches_names_and_mnemonics() {
        let all = suites::all_suites();
        let filtered = suites_for_run(all.clone(), Some("bsr")).unwrap();
        assert_eq!(names(&filtered), vec!["bsr", "bsrq", "bsrl"]);

        // Matches through the mnemonic only.
        let filtered = suites_for_run(all, Some("cmpxchgl")).unwrap();
        assert_eq!(names(&filtered), vec!["lock cmpxchg"]);
    }

    #[test]
    fn filter_prefixes_disambiguate() {
        let all = suites::all_suites();
        let filtered = suites_for_run(all.clone(), Some("suite:crc32")).unwrap();
        assert_eq!(names(&filtered), vec!["crc32"]);

        let filtered = suites_for_run(all.clone(), Some("suite:lock_cmpxchg")).unwrap();
        assert_eq!(names(&filtered), vec!["lock cmpxchg"]);

        let filtered = suites_for_run(all, Some("insn:crc32q")).unwrap();
        assert_eq!(names(&filtered), vec!["crc32", "crc32q"]);
    }

    #[test]
    fn filter_accepts_multiple_terms() {
        let filtered = suites_for_run(suites::all_suites(), Some("rdtsc, suite:bsfq")).unwrap();
        assert_eq!(names(&filtered), vec!["bsfq", "rdtsc"]);
    }

    #[test]
    fn filter_with_no_match_lists_suites() {
        let err = suites_for_run(suites::all_suites(), Some("popcnt")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("matched 0 suites"), "{msg}");
        assert!(msg.contains("  - lock cmpxchg"), "{msg}");
    }

    #[test]
    fn blank_filter_keeps_everything() {
        let all = suites::all_suites();
        assert_eq!(suites_for_run(all.clone(), Some("  ")).unwrap(), all);
        assert_eq!(suites_for_run(all.clone(), Some(",;")).unwrap(), all);
        assert_eq!(suites_for_run(all.clone(), None).unwrap(), all);
    }

    #[test]
    fn config_reads_environment() {
        let _lock = env_lock();
        let _filter = EnvGuard::set(config::ENV_FILTER, " crc32 ");
        let _spins = EnvGuard::set(config::ENV_RDTSC_MAX_SPINS, "2_000");
        let _reference = EnvGuard::set(config::ENV_REFERENCE, "0");
        let _report = EnvGuard::set(config::ENV_REPORT_PATH, "");

        let config = RunConfig::from_env();
        assert_eq!(config.filter.as_deref(), Some("crc32"));
        assert_eq!(config.rdtsc_max_spins, 2_000);
        assert!(!config.reference);
        assert_eq!(config.report_path, None);
    }

    #[test]
    fn run_from_env_honours_filter() {
        let _lock = env_lock();
        let _filter = EnvGuard::set(config::ENV_FILTER, "suite:crc32b");
        let _reference = EnvGuard::set(config::ENV_REFERENCE, "0");
        let report = run_from_env().unwrap();
        assert_eq!(report.total_vectors, 4);
        assert_eq!(report.failures, 0);
        assert_eq!(report.coverage.counts.get("crc32b"), Some(&4));
    }
}
