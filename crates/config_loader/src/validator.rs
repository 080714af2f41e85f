//! 配置校验模块
//!
//! 校验规则：
//! - flush.interval_ms > 0
//! - flush.timeout_ms 在 (0, interval_ms] 之间
//! - 同类 sink 名称非空且唯一
//! - file sink 必须提供 params.path

use std::collections::HashSet;

use contracts::{ContractError, FanoutConfig, SinkConfig, SinkType};

/// 校验 FanoutConfig
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &FanoutConfig) -> Result<(), ContractError> {
    validate_flush(config)?;
    validate_sinks("metric_sinks", &config.metric_sinks)?;
    validate_sinks("span_sinks", &config.span_sinks)?;
    Ok(())
}

fn validate_flush(config: &FanoutConfig) -> Result<(), ContractError> {
    let flush = &config.flush;
    if flush.interval_ms == 0 {
        return Err(ContractError::config_validation(
            "flush.interval_ms",
            "interval_ms must be > 0",
        ));
    }

    if let Some(timeout_ms) = flush.timeout_ms {
        if timeout_ms == 0 || timeout_ms > flush.interval_ms {
            return Err(ContractError::config_validation(
                "flush.timeout_ms",
                format!(
                    "timeout_ms ({timeout_ms}) must be > 0 and <= interval_ms ({})",
                    flush.interval_ms
                ),
            ));
        }
    }
    Ok(())
}

/// 名称在同一 dispatcher 内唯一；metric 与 span 之间可以重名
fn validate_sinks(section: &str, sinks: &[SinkConfig]) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("{section}[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("{section}[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("{section}[{}].params.path", sink.name),
                "file sink requires a path",
            ));
        }
    }
    Ok(())
}
