//! `miru-config`: Miru runtime configuration.
//!
//! Provides:
//! - Typed config schema (capture, popup, bus, logging)
//! - YAML read/write with backup rotation
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{BusConfig, CaptureConfig, LoggingConfig, MiruConfig, PopupConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load a config file, apply env substitution and defaults, and validate
/// it. Problems are returned in the report, not logged.
pub async fn load_with_report(path: &Path) -> Result<(MiruConfig, ValidationReport)> {
    let raw_config = load_config(path).await?;

    let value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: MiruConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);
    let report = validate(&config);
    Ok((config, report))
}

/// Log every warning and error in `report`, then fail if it has errors.
pub fn check_report(report: &ValidationReport, path: &Path) -> Result<()> {
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!(
            "{} invalid config value(s) in {}",
            report.errors.len(),
            path.display()
        );
    }
    Ok(())
}

/// Load, apply env substitution and defaults, and validate a config file.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<MiruConfig> {
    let (config, report) = load_with_report(path).await?;
    check_report(&report, path)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_file(name: &str, yaml: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("miru-config-lib-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = config_file_path(&dir);
        std::fs::write(&path, yaml).unwrap();
        path
    }

    #[tokio::test]
    async fn report_is_returned_without_failing() {
        let path = scratch_file("report", "capture:\n  previewLength: 0\n");
        let (config, report) = load_with_report(&path).await.unwrap();

        assert_eq!(config.capture.unwrap().preview_length, Some(0));
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "capture.previewLength");
        assert!(check_report(&report, &path).is_err());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn invalid_config_fails_prepare() {
        let path = scratch_file("invalid", "bus:\n  bufferSize: 0\n");
        let err = load_and_prepare(&path).await.unwrap_err();
        assert!(err.to_string().contains("1 invalid config value(s)"));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[tokio::test]
    async fn valid_config_gets_defaults() {
        let path = scratch_file("valid", "popup:\n  staleOutcomes: discard\n");
        let config = load_and_prepare(&path).await.unwrap();

        assert_eq!(
            config.popup.unwrap().stale_outcomes,
            Some(miru_core::StaleOutcomePolicy::Discard)
        );
        assert_eq!(config.bus.unwrap().buffer_size, Some(defaults::DEFAULT_BUS_BUFFER));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
