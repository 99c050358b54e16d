use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::{
    bridge::BridgeConfig, dispatch::DispatchPolicy, evaluator::EvaluationConfig,
    scheduler::TriggerPolicy, supervisor::ArbitrationPolicy,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config values are out of range: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("{field}: {message}")]
    Rule { field: &'static str, message: String },
}

fn rule(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Rule {
        field,
        message: message.into(),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[serde(default)]
    #[validate(nested)]
    pub logging: LoggingConfig,
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: TriggerPolicy,
    #[serde(default)]
    #[validate(nested)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    #[validate(nested)]
    pub arbitration: ArbitrationPolicy,
    #[serde(default)]
    #[validate(nested)]
    pub dispatch: DispatchPolicy,
    #[serde(default)]
    #[validate(nested)]
    pub bridge: BridgeConfig,
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs/huddle")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    #[validate(length(min = 1))]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    #[validate(range(min = 1))]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize huddle config")?;
        config.validate_values()?;

        if !config.bridge.socket_path.is_absolute() {
            config.bridge.socket_path = config_base.join(&config.bridge.socket_path);
        }

        Ok(config)
    }

    /// Range checks on every section plus the rules that span fields.
    pub fn validate_values(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.logging.filter.trim().is_empty() {
            return Err(rule("logging.filter", "cannot be blank"));
        }
        if self.evaluation.member_timeout_ms > self.evaluation.cycle_deadline_ms {
            return Err(rule(
                "evaluation.member_timeout_ms",
                format!(
                    "{} exceeds evaluation.cycle_deadline_ms {}",
                    self.evaluation.member_timeout_ms, self.evaluation.cycle_deadline_ms
                ),
            ));
        }

        let mut seen = BTreeSet::new();
        for perspective in &self.evaluation.perspectives {
            if !seen.insert(*perspective) {
                return Err(rule(
                    "evaluation.perspectives",
                    format!("'{perspective}' is listed more than once"),
                ));
            }
        }

        if self.arbitration.max_responses_per_agent == 0 {
            tracing::warn!(
                target: "config",
                "arbitration.max_responses_per_agent is 0; no advice will ever be emitted"
            );
        }

        Ok(())
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join("huddle.schema.json");
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or huddle.schema.json next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
