//! DispatchConfig - source groups and retry policy as loaded from disk
//!
//! Values are signed in the file so that negative input is reported instead
//! of failing to parse; conversion to [`DispatchOptions`] rejects it.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{DispatchError, DispatchOptions, Round, DEFAULT_FAIL_RETRIES};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchConfig {
    /// Retry policy shared by every group unless overridden
    #[serde(default)]
    #[validate(nested)]
    pub options: OptionsConfig,

    /// Named source groups, one dispatcher each
    #[validate(length(min = 1, message = "at least one group is required"))]
    pub groups: Vec<GroupConfig>,
}

/// Retry policy as written in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OptionsConfig {
    #[serde(default = "default_fail_retries")]
    #[validate(range(min = 0, message = "must be >= 0"))]
    pub fail_retries: i64,

    #[serde(default = "default_fail_retry_interval_ms")]
    #[validate(range(min = 0, message = "must be >= 0"))]
    pub fail_retry_interval_ms: i64,
}

fn default_fail_retries() -> i64 {
    i64::from(DEFAULT_FAIL_RETRIES)
}

fn default_fail_retry_interval_ms() -> i64 {
    3_000
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            fail_retries: default_fail_retries(),
            fail_retry_interval_ms: default_fail_retry_interval_ms(),
        }
    }
}

impl TryFrom<OptionsConfig> for DispatchOptions {
    type Error = DispatchError;

    fn try_from(config: OptionsConfig) -> Result<Self, Self::Error> {
        DispatchOptions::try_from_signed(config.fail_retries, config.fail_retry_interval_ms)
    }
}

impl From<DispatchOptions> for OptionsConfig {
    fn from(options: DispatchOptions) -> Self {
        Self {
            fail_retries: i64::from(options.fail_retries),
            fail_retry_interval_ms: i64::try_from(options.fail_retry_interval.as_millis())
                .unwrap_or(i64::MAX),
        }
    }
}

/// One routing group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroupConfig {
    #[validate(length(min = 1, message = "group name cannot be empty"))]
    pub name: String,

    /// Interchangeable targets, tried in order
    #[validate(length(min = 1, message = "at least one source is required"))]
    pub sources: Vec<String>,

    /// Per-group override of the shared policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub options: Option<OptionsConfig>,

    /// Keep dispatching after the first pass
    #[serde(default = "default_continuous")]
    pub continuous: bool,

    /// Optional pass cap for one-shot callers; omit for no cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "must be >= 1 (omit for no cap)"))]
    pub max_passes: Option<u64>,
}

fn default_continuous() -> bool {
    true
}

impl GroupConfig {
    /// Round policy described by this group
    pub fn round<S>(&self) -> Round<S> {
        let round = Round::continuous().with_continuous(self.continuous);
        match self.max_passes {
            Some(cap) => round.max_passes(cap),
            None => round,
        }
    }
}

impl DispatchConfig {
    /// Look a group up by name
    pub fn group(&self, name: &str) -> Result<&GroupConfig, DispatchError> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| DispatchError::unknown_group(name))
    }

    /// Effective retry policy of `group`
    pub fn options_for(&self, group: &GroupConfig) -> Result<DispatchOptions, DispatchError> {
        group.options.unwrap_or(self.options).try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn group(name: &str, sources: &[&str]) -> GroupConfig {
        GroupConfig {
            name: name.into(),
            sources: sources.iter().map(|s| s.to_string()).collect(),
            options: None,
            continuous: true,
            max_passes: None,
        }
    }

    #[test]
    fn test_group_override_wins() {
        let mut primary = group("primary", &["a", "b"]);
        primary.options = Some(OptionsConfig {
            fail_retries: 1,
            fail_retry_interval_ms: 50,
        });
        let config = DispatchConfig {
            options: OptionsConfig::default(),
            groups: vec![primary, group("backup", &["c"])],
        };

        let options = config.options_for(config.group("primary").unwrap()).unwrap();
        assert_eq!(options, DispatchOptions::new(1, Duration::from_millis(50)));

        let options = config.options_for(config.group("backup").unwrap()).unwrap();
        assert_eq!(options, DispatchOptions::default());

        assert!(matches!(
            config.group("missing"),
            Err(DispatchError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_derive_validation() {
        let config = DispatchConfig {
            options: OptionsConfig {
                fail_retries: -1,
                fail_retry_interval_ms: 0,
            },
            groups: vec![group("g", &[])],
        };
        assert!(config.validate().is_err());
        assert!(group("g", &["a"]).validate().is_ok());

        let mut capped = group("g", &["a"]);
        capped.max_passes = Some(0);
        assert!(capped.validate().is_err());
        capped.max_passes = Some(1);
        assert!(capped.validate().is_ok());
    }

    #[test]
    fn test_group_round() {
        let mut g = group("g", &["a"]);
        g.continuous = false;
        g.max_passes = Some(5);
        let round: Round<String> = g.round();
        assert!(!round.is_continuous());
        assert_eq!(round.pass_cap(), Some(5));
    }

    #[test]
    fn test_options_config_round_trip() {
        let options = DispatchOptions::new(4, Duration::from_millis(1_500));
        let config = OptionsConfig::from(options);
        assert_eq!(config.fail_retry_interval_ms, 1_500);
        assert_eq!(DispatchOptions::try_from(config).unwrap(), options);
    }
}
