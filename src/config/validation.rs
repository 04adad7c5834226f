//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntactic)
//! - Check TLS material is complete for the requested mode
//! - Validate value ranges (ports, log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<SettingsError>>
//! - Runs before any subsystem is started

use tracing_subscriber::EnvFilter;

use crate::config::schema::ServerConfig;

/// A single semantic problem with the process configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("TLS is enabled but no certificate path is set")]
    MissingCertificate,

    #[error("TLS is enabled but no key path is set")]
    MissingKey,

    #[error("client verification requires a CA bundle")]
    MissingClientCa,

    #[error("port must be non-zero")]
    InvalidPort,

    #[error("invalid log level {0:?}")]
    InvalidLogLevel(String),
}

pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<SettingsError>> {
    let mut errors = Vec::new();

    if config.tls.enabled {
        if config.tls.certificate.is_none() {
            errors.push(SettingsError::MissingCertificate);
        }
        if config.tls.key.is_none() {
            errors.push(SettingsError::MissingKey);
        }
        if config.tls.verify_client && config.tls.ca.is_none() {
            errors.push(SettingsError::MissingClientCa);
        }
    }

    if config.listener.port == 0 {
        errors.push(SettingsError::InvalidPort);
    }

    if EnvFilter::try_new(&config.observability.log_level).is_err() {
        errors.push(SettingsError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::config::schema::Cli;

    fn config(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["static-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().into()
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_config(&config(&[])), Ok(()));
    }

    #[test]
    fn test_all_errors_reported() {
        let errors = validate_config(&config(&[
            "--tls-enabled",
            "--tls-verify-client",
            "--port",
            "0",
        ]))
        .unwrap_err();

        assert_eq!(
            errors,
            vec![
                SettingsError::MissingCertificate,
                SettingsError::MissingKey,
                SettingsError::MissingClientCa,
                SettingsError::InvalidPort,
            ]
        );
    }

    #[test]
    fn test_tls_complete() {
        let args = ["--tls-enabled", "--tls-certificate", "c.pem", "--tls-key", "k.pem"];
        assert_eq!(validate_config(&config(&args)), Ok(()));
    }

    #[test]
    fn test_bad_log_level() {
        let errors = validate_config(&config(&["--log-level", "very=loud=please"])).unwrap_err();
        assert!(matches!(errors[0], SettingsError::InvalidLogLevel(_)));
    }
}
