//! Oracle module parameters

use crate::constants::BASE_DENOM;
use crate::decimal::Dec;
use crate::error::{OracleError, Result};
use crate::types::{validate_denom, Denom};
use serde::{Deserialize, Serialize};

/// Tunable oracle parameters, persisted in module state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Blocks per voting period
    #[serde(default = "default_vote_period")]
    pub vote_period: u64,

    /// Fraction of bonded power a ballot needs to pass
    #[serde(default = "default_vote_threshold")]
    pub vote_threshold: Dec,

    /// Width of the winning band around the median
    #[serde(default = "default_reward_band")]
    pub reward_band: Dec,

    /// Denoms eligible for voting
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<Denom>,

    /// Fraction of stake slashed on a failed window
    #[serde(default = "default_slash_fraction")]
    pub slash_fraction: Dec,

    /// Blocks per slash window (a multiple of `vote_period`)
    #[serde(default = "default_slash_window")]
    pub slash_window: u64,

    /// Minimum valid-vote rate over a window
    #[serde(default = "default_min_valid_per_window")]
    pub min_valid_per_window: Dec,

    /// Seconds of snapshot history kept for TWAP
    #[serde(default = "default_lookback_duration")]
    pub lookback_duration: u64,
}

fn default_vote_period() -> u64 {
    10
}

fn default_vote_threshold() -> Dec {
    Dec::with_prec(5, 1) // 50%
}

fn default_reward_band() -> Dec {
    Dec::with_prec(2, 2) // 2%
}

fn default_whitelist() -> Vec<Denom> {
    vec!["uatom".to_string(), "ueth".to_string()]
}

fn default_slash_fraction() -> Dec {
    Dec::with_prec(1, 4) // 0.01%
}

fn default_slash_window() -> u64 {
    100_800 // ~1 week at 6s blocks
}

fn default_min_valid_per_window() -> Dec {
    Dec::with_prec(5, 2) // 5%
}

fn default_lookback_duration() -> u64 {
    3600
}

impl Default for Params {
    fn default() -> Self {
        Self {
            vote_period: default_vote_period(),
            vote_threshold: default_vote_threshold(),
            reward_band: default_reward_band(),
            whitelist: default_whitelist(),
            slash_fraction: default_slash_fraction(),
            slash_window: default_slash_window(),
            min_valid_per_window: default_min_valid_per_window(),
            lookback_duration: default_lookback_duration(),
        }
    }
}

impl Params {
    /// Reject inconsistent parameter sets
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: Dec| {
            if value.is_negative() || value > Dec::ONE {
                Err(OracleError::InvalidParams(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )))
            } else {
                Ok(())
            }
        };

        if self.vote_period == 0 {
            return Err(OracleError::InvalidParams("vote_period must be positive".into()));
        }
        if self.vote_threshold <= Dec::with_prec(33, 2) || self.vote_threshold > Dec::ONE {
            return Err(OracleError::InvalidParams(format!(
                "vote_threshold must be within (0.33, 1], got {}",
                self.vote_threshold
            )));
        }
        unit("reward_band", self.reward_band)?;
        unit("slash_fraction", self.slash_fraction)?;
        unit("min_valid_per_window", self.min_valid_per_window)?;

        if self.slash_window == 0 || self.slash_window % self.vote_period != 0 {
            return Err(OracleError::InvalidParams(format!(
                "slash_window {} must be a positive multiple of vote_period {}",
                self.slash_window, self.vote_period
            )));
        }
        if self.lookback_duration == 0 {
            return Err(OracleError::InvalidParams(
                "lookback_duration must be positive".into(),
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for denom in &self.whitelist {
            validate_denom(denom)?;
            if denom == BASE_DENOM {
                return Err(OracleError::InvalidParams(format!(
                    "base denom {} cannot be whitelisted",
                    BASE_DENOM
                )));
            }
            if !seen.insert(denom.as_str()) {
                return Err(OracleError::InvalidParams(format!(
                    "duplicate whitelist denom {}",
                    denom
                )));
            }
        }

        Ok(())
    }

    /// Voting periods in one slash window
    pub fn vote_periods_per_window(&self) -> u64 {
        self.slash_window / self.vote_period.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_valid() {
        let params = Params::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.vote_periods_per_window(), 10_080);
    }

    #[test]
    fn test_threshold_bounds() {
        let mut params = Params::default();
        params.vote_threshold = Dec::with_prec(33, 2);
        assert!(params.validate().is_err());
        params.vote_threshold = Dec::with_prec(34, 2);
        assert!(params.validate().is_ok());
        params.vote_threshold = Dec::ONE;
        assert!(params.validate().is_ok());
        params.vote_threshold = Dec::with_prec(101, 2);
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_slash_window_multiple() {
        let params = Params {
            slash_window: 95,
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(OracleError::InvalidParams(_))));
    }

    #[test]
    fn test_whitelist_denoms_checked() {
        let params = Params {
            whitelist: vec!["x".into()],
            ..Params::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_whitelist_rejects_base_denom() {
        let params = Params {
            whitelist: vec!["uatom".into(), BASE_DENOM.into()],
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(OracleError::InvalidParams(_))));
    }

    #[test]
    fn test_whitelist_rejects_duplicates() {
        let params = Params {
            whitelist: vec!["uatom".into(), "ueth".into(), "uatom".into()],
            ..Params::default()
        };
        assert!(matches!(params.validate(), Err(OracleError::InvalidParams(_))));
    }

    #[test]
    fn test_serde_defaults() {
        let params: Params = serde_json::from_str(r#"{"vote_period": 5, "slash_window": 50}"#).unwrap();
        assert_eq!(params.vote_period, 5);
        assert_eq!(params.vote_threshold, Dec::with_prec(5, 1));
        assert_eq!(params.whitelist, vec!["uatom", "ueth"]);
    }
}
