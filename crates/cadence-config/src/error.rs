//! Configuration errors.

use cadence_core::ScheduleValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config format: {0}")]
    InvalidFormat(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid schedule: {0}")]
    Schedule(#[from] ScheduleValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let err = ConfigError::NotFound("cadence.toml".to_string());
        assert!(err.to_string().contains("cadence.toml"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_invalid_value_error() {
        let err = ConfigError::invalid_value("jobs.backup.exclude_holidays", "bad date '2025-13-01'");
        let display = err.to_string();
        assert!(display.contains("jobs.backup.exclude_holidays"));
        assert!(display.contains("2025-13-01"));
    }

    #[test]
    fn test_env_var_not_set_error() {
        let err = ConfigError::EnvVarNotSet("BACKUP_TARGET".to_string());
        assert!(err.to_string().contains("BACKUP_TARGET"));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_schedule_error_from() {
        let err = ConfigError::from(ScheduleValidationError::MonthOutOfRange(13));
        assert!(matches!(err, ConfigError::Schedule(_)));
        assert!(err.to_string().starts_with("Invalid schedule"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::from(io_err);
        assert!(err.to_string().contains("denied"));
    }
}
