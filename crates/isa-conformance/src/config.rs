use std::path::PathBuf;

pub const ENV_FILTER: &str = "ISA_CONFORMANCE_FILTER";
pub const ENV_REPORT_PATH: &str = "ISA_CONFORMANCE_REPORT_PATH";
pub const ENV_RDTSC_MAX_SPINS: &str = "ISA_CONFORMANCE_RDTSC_MAX_SPINS";
pub const ENV_REFERENCE: &str = "ISA_CONFORMANCE_REFERENCE";

pub const DEFAULT_RDTSC_MAX_SPINS: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Filter expression; `None` runs every suite.
    pub filter: Option<String>,
    /// Where to write the JSON report (on first failure and again at the end of the run).
    pub report_path: Option<PathBuf>,
    /// How many times RDTSC is re-read while the counter has not moved.
    pub rdtsc_max_spins: u64,
    /// Cross-check every deterministic vector against native execution.
    pub reference: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            filter: None,
            report_path: None,
            rdtsc_max_spins: DEFAULT_RDTSC_MAX_SPINS,
            reference: false,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        let filter = std::env::var(ENV_FILTER)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let report_path = std::env::var_os(ENV_REPORT_PATH)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let rdtsc_max_spins = std::env::var(ENV_RDTSC_MAX_SPINS)
            .ok()
            .and_then(|v| parse_count(&v))
            .unwrap_or(DEFAULT_RDTSC_MAX_SPINS);
        let reference = std::env::var(ENV_REFERENCE)
            .map(|v| parse_bool(&v))
            .unwrap_or(false);

        Self {
            filter,
            report_path,
            rdtsc_max_spins,
            reference,
        }
    }
}

/// Parses a count, allowing `_` separators and `0x` notation.
pub fn parse_count(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed.chars().filter(|c| *c != '_').collect();
    let cleaned = cleaned.as_str();
    let (radix, digits) = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(rest) => (16, rest),
        None => (10, cleaned),
    };
    if digits.is_empty() {
        return None;
    }

    u64::from_str_radix(digits, radix).ok()
}

fn parse_bool(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
