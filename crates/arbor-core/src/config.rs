//! Reconciler configuration
//!
//! Loaded from TOML (or built in code) and validated before a reconciler is
//! constructed.
//!
//! ```toml
//! diagnostics = "production"
//! diagnostics_capacity = 128
//!
//! [yield_policy]
//! kind = "budget"
//! units = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ReconcileError, Result};

/// Environment variable overriding [`ReconcilerConfig::diagnostics`]
pub const DIAGNOSTICS_ENV: &str = "ARBOR_DIAGNOSTICS";

/// How a time-sliced render decides to hand control back to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YieldPolicy {
    /// Yield after a fixed number of units of work per slice.
    /// The scheduler clock advances one tick per unit.
    Budget { units: u32 },
    /// Yield once a slice has run for `slice_ms` of wall-clock time.
    /// The scheduler clock is wall-clock milliseconds.
    Deadline { slice_ms: u64 },
}

impl Default for YieldPolicy {
    fn default() -> Self {
        YieldPolicy::Deadline { slice_ms: 5 }
    }
}

/// How structural invariant violations are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticsMode {
    /// Record every diagnostic and log invariant violations at error level
    #[default]
    Development,
    /// Invariant violations become silent best-effort no-ops (debug log only)
    Production,
}

impl DiagnosticsMode {
    /// Parse the mode name used in TOML and the environment override
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(DiagnosticsMode::Development),
            "production" | "prod" => Some(DiagnosticsMode::Production),
            _ => None,
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Time-slicing policy for non-sync lanes
    pub yield_policy: YieldPolicy,
    /// Invariant-violation reporting mode
    pub diagnostics: DiagnosticsMode,
    /// Maximum number of retained diagnostics; oldest are dropped first
    pub diagnostics_capacity: usize,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            yield_policy: YieldPolicy::default(),
            diagnostics: DiagnosticsMode::default(),
            diagnostics_capacity: 256,
        }
    }
}

impl ReconcilerConfig {
    /// Config with a unit-budget yield policy, convenient for deterministic hosts
    pub fn with_budget(units: u32) -> Self {
        Self {
            yield_policy: YieldPolicy::Budget { units },
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed TOML and `InvalidConfig` when
    /// validation fails.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: ReconcilerConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise as [`Self::from_toml_str`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Apply the `ARBOR_DIAGNOSTICS` environment override, if set
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the variable is set to an unknown mode.
    pub fn with_env_overrides(self) -> Result<Self> {
        match std::env::var(DIAGNOSTICS_ENV) {
            Ok(value) => self.with_diagnostics_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_diagnostics_override(mut self, value: &str) -> Result<Self> {
        self.diagnostics =
            DiagnosticsMode::from_name(value).ok_or_else(|| ReconcileError::InvalidConfig {
                reason: format!("{} must be development or production, got {:?}", DIAGNOSTICS_ENV, value),
            })?;
        Ok(self)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a zero budget, zero slice, or zero capacity.
    pub fn validate(&self) -> Result<()> {
        match self.yield_policy {
            YieldPolicy::Budget { units: 0 } => {
                return Err(ReconcileError::InvalidConfig {
                    reason: "yield_policy.units must be at least 1".to_string(),
                })
            }
            YieldPolicy::Deadline { slice_ms: 0 } => {
                return Err(ReconcileError::InvalidConfig {
                    reason: "yield_policy.slice_ms must be at least 1".to_string(),
                })
            }
            _ => {}
        }
        if self.diagnostics_capacity == 0 {
            return Err(ReconcileError::InvalidConfig {
                reason: "diagnostics_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ReconcilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.diagnostics, DiagnosticsMode::Development);
    }

    #[test]
    fn test_parse_budget_policy() {
        let config = ReconcilerConfig::from_toml_str(
            r#"
            diagnostics = "production"

            [yield_policy]
            kind = "budget"
            units = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.yield_policy, YieldPolicy::Budget { units: 8 });
        assert_eq!(config.diagnostics, DiagnosticsMode::Production);
        assert_eq!(config.diagnostics_capacity, 256);
    }

    #[test]
    fn test_parse_deadline_policy() {
        let config = ReconcilerConfig::from_toml_str(
            r#"
            [yield_policy]
            kind = "deadline"
            slice_ms = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.yield_policy, YieldPolicy::Deadline { slice_ms: 16 });
    }

    #[test]
    fn test_zero_budget_rejected() {
        let result = ReconcilerConfig::from_toml_str(
            r#"
            [yield_policy]
            kind = "budget"
            units = 0
            "#,
        );
        assert!(matches!(result, Err(ReconcileError::InvalidConfig { .. })));
    }

    #[test]
    fn test_malformed_toml_is_serialization_error() {
        let result = ReconcilerConfig::from_toml_str("diagnostics = [");
        assert!(matches!(result, Err(ReconcileError::Serialization { .. })));
    }

    #[test]
    fn test_diagnostics_override() {
        let config = ReconcilerConfig::default()
            .with_diagnostics_override("prod")
            .unwrap();
        assert_eq!(config.diagnostics, DiagnosticsMode::Production);

        let bad = ReconcilerConfig::default().with_diagnostics_override("loud");
        assert!(matches!(bad, Err(ReconcileError::InvalidConfig { .. })));
    }
}
