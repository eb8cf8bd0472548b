//! Config CLI subcommands: show, defaults, validate.
//!
//! These commands read configuration from environment variables, or from a
//! TOML file when `--file` is given.

use crate::config::{self, EffectiveConfig, EnvConfig};

/// Print effective config as key-value pairs to stdout.
pub fn run_show(file: Option<&str>) -> i32 {
    match load(file) {
        Ok(env) => {
            print_config(&env.effective_config());
            0
        }
        Err(msg) => {
            eprintln!("{msg}");
            1
        }
    }
}

/// Print default config values (no env overrides) to stdout.
pub fn run_defaults() {
    println!("RATE_GATE_MAX_TOKENS=1200");
    println!("RATE_GATE_REFILL_RATE=20");
    println!("RATE_GATE_REFILL_INTERVAL_MS=1000");
    println!("RATE_GATE_MAX_QUEUE_SIZE=1000");
    println!("RATE_GATE_REQUEST_TIMEOUT_MS=");
    println!("RATE_GATE_LOG_LEVEL=info");
    println!("RATE_GATE_LOG_FORMAT=json");
}

/// Validate configuration for obvious misconfigurations.
///
/// Returns 0 if valid, 1 if any warnings are found.
pub fn run_validate(file: Option<&str>) -> i32 {
    let env = match load(file) {
        Ok(env) => env,
        Err(msg) => {
            eprintln!("ERROR: {msg}");
            return 1;
        }
    };
    let warnings = validation_warnings(&env);
    for warning in &warnings {
        eprintln!("WARNING: {warning}");
    }

    if warnings.is_empty() {
        println!("Configuration is valid.");
        0
    } else {
        1
    }
}

fn load(file: Option<&str>) -> Result<EnvConfig, String> {
    let mut env = config::load();
    if let Some(path) = file {
        env.scheduler = config::load_file(path).map_err(|e| format!("{path}: {e}"))?;
    }
    Ok(env)
}

pub(crate) fn validation_warnings(env: &EnvConfig) -> Vec<String> {
    let s = &env.scheduler;
    let mut warnings = Vec::new();
    if let Err(e) = s.validate() {
        warnings.push(e);
    }
    if s.bucket.refill_rate == 0 {
        warnings.push("refill_rate is 0; the bucket never refills after the first burst".into());
    }
    if let Some(timeout) = s.queue.default_timeout_ms {
        if timeout < s.bucket.refill_interval_ms {
            warnings.push(format!(
                "request timeout ({timeout}ms) is shorter than one refill interval ({}ms)",
                s.bucket.refill_interval_ms
            ));
        }
    }
    warnings
}

fn print_config(cfg: &EffectiveConfig) {
    println!("RATE_GATE_MAX_TOKENS={}", cfg.max_tokens);
    println!("RATE_GATE_REFILL_RATE={}", cfg.refill_rate);
    println!("RATE_GATE_REFILL_INTERVAL_MS={}", cfg.refill_interval_ms);
    println!("RATE_GATE_MAX_QUEUE_SIZE={}", cfg.max_queue_size);
    println!(
        "RATE_GATE_REQUEST_TIMEOUT_MS={}",
        cfg.request_timeout_ms.map(|t| t.to_string()).unwrap_or_default()
    );
    println!("RATE_GATE_LOG_LEVEL={}", cfg.log_level);
    println!(
        "RATE_GATE_LOG_FILE={}",
        cfg.log_file.as_ref().map(|p| p.display().to_string()).unwrap_or_default()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;
    use crate::telemetry::LogConfig;

    fn env(scheduler: SchedulerConfig) -> EnvConfig {
        EnvConfig { scheduler, log: LogConfig::default() }
    }

    #[test]
    fn defaults_produce_no_warnings() {
        assert!(validation_warnings(&env(SchedulerConfig::default())).is_empty());
    }

    #[test]
    fn zero_refill_and_short_timeout_are_flagged() {
        let mut cfg = SchedulerConfig::default();
        cfg.bucket.refill_rate = 0;
        cfg.queue.default_timeout_ms = Some(10);
        assert_eq!(validation_warnings(&env(cfg)).len(), 2);
    }
}
