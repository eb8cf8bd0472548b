//! CLI module for rate-gate commands.
//!
//! ## Usage
//!
//! ```bash
//! rate-gate-cli simulate --requests 200   # Drive a scheduler with synthetic load
//! rate-gate-cli config show               # Effective configuration
//! rate-gate-cli config validate --file gate.toml
//! ```

pub mod config_cmd;
pub mod simulate;

pub use simulate::{run_simulation, SimulationReport, WeightClass};

/// Default number of synthetic requests for `simulate`.
pub const DEFAULT_SIMULATED_REQUESTS: usize = 100;

/// Value following `flag` in `args`, if present.
pub fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flag_value_finds_following_arg() {
        let a = args(&["rate-gate-cli", "simulate", "--requests", "50"]);
        assert_eq!(flag_value(&a, "--requests"), Some("50"));
        assert_eq!(flag_value(&a, "--file"), None);
    }

    #[test]
    fn flag_value_at_end_is_none() {
        let a = args(&["rate-gate-cli", "config", "validate", "--file"]);
        assert_eq!(flag_value(&a, "--file"), None);
    }
}
