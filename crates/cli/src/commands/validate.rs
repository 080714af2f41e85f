//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::FanoutConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    version: String,
    service_name: String,
    interval_ms: u64,
    timeout_ms: u64,
    metric_sink_count: usize,
    span_sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    service_name: config.service_name.clone(),
                    interval_ms: config.flush.interval_ms,
                    timeout_ms: config.flush.timeout().as_millis() as u64,
                    metric_sink_count: config.metric_sinks.len(),
                    span_sink_count: config.span_sinks.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &FanoutConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.metric_sinks.is_empty() {
        warnings.push("No metric sinks configured - flushed metrics will be dropped".to_string());
    }
    if config.span_sinks.is_empty() {
        warnings.push("No span sinks configured - spans will be dropped".to_string());
    }
    if config.flush.timeout_ms.is_none() {
        warnings.push(
            "flush.timeout_ms not set - a slow sink may hold a cycle for the full interval"
                .to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Service: {}", summary.service_name);
            println!(
                "  Flush: {} ms (timeout {} ms)",
                summary.interval_ms, summary.timeout_ms
            );
            println!("  Metric sinks: {}", summary.metric_sink_count);
            println!("  Span sinks: {}", summary.span_sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn args_for(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: true,
        }
    }

    #[test]
    fn test_missing_file_reports_invalid() {
        let result = validate_config(&args_for(PathBuf::from("/nonexistent/fanout.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_valid_file_has_summary_and_warnings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[flush]\ninterval_ms = 500\n\n[[metric_sinks]]\nname = \"void\"\nsink_type = \"blackhole\"\n"
        )
        .unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid, "{:?}", result.error);

        let summary = result.summary.unwrap();
        assert_eq!(summary.interval_ms, 500);
        assert_eq!(summary.timeout_ms, 500);
        assert_eq!(summary.metric_sink_count, 1);

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("span sinks")));
        assert!(warnings.iter().any(|w| w.contains("timeout_ms")));
    }

    #[test]
    fn test_invalid_file_carries_error() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[[span_sinks]]\nname = \"a\"\nsink_type = \"log\"\n\n[[span_sinks]]\nname = \"a\"\nsink_type = \"log\"\n"
        )
        .unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("duplicate"));
    }
}
