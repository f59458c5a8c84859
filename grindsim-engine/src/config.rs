//! Validated parameter bundles for the two trial families.
//!
//! Raw parameters arrive as plain `*Params` structs (serde-friendly, no
//! invariants). They only reach a simulator after passing through
//! [`FightingConfig::new`] or [`ThievingConfig::new`], so trials never
//! observe an invalid bound.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::SimTime;

/// Errors raised when simulation parameters violate their invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} minimum {min} exceeds maximum {max}")]
    MinExceedsMax {
        field: &'static str,
        min: i64,
        max: i64,
    },
    #[error("{field} must be greater than zero")]
    NonPositiveInterval { field: &'static str },
    #[error("{field} must be between 0 and 1 (got {value})")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    #[error("{field} must be at least 1 (got {value})")]
    NonPositivePool { field: &'static str, value: i64 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
}

/// Which simulator a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialFamily {
    Fighting,
    Thieving,
}

impl TrialFamily {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fighting => "fighting",
            Self::Thieving => "thieving",
        }
    }
}

impl fmt::Display for TrialFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrialFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fighting" | "fight" => Ok(Self::Fighting),
            "thieving" | "thieve" | "theft" => Ok(Self::Thieving),
            other => Err(format!("unknown trial family: {other}")),
        }
    }
}

/// Unvalidated fighting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FightingParams {
    pub player_health: i64,
    pub player_health_regen: i64,
    pub player_regen_interval: SimTime,
    pub player_damage_min: i64,
    pub player_damage_max: i64,
    pub player_hit_chance: f64,
    pub player_attack_interval: SimTime,
    pub enemy_health: i64,
    pub enemy_damage_min: i64,
    pub enemy_damage_max: i64,
    pub enemy_hit_chance: f64,
    /// Informational only; the battle clock advances by the player's interval.
    pub enemy_attack_interval: SimTime,
}

impl Default for FightingParams {
    fn default() -> Self {
        Self {
            player_health: 720,
            player_health_regen: 8,
            player_regen_interval: SimTime::from_secs(8),
            player_damage_min: 1,
            player_damage_max: 111,
            player_hit_chance: 0.76,
            player_attack_interval: SimTime::from_secs(3),
            enemy_health: 300,
            enemy_damage_min: 0,
            enemy_damage_max: 116,
            enemy_hit_chance: 0.35,
            enemy_attack_interval: SimTime::from_millis(2_400),
        }
    }
}

/// Unvalidated thieving parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThievingParams {
    pub health_regeneration_interval: SimTime,
    pub health_regeneration_amount: i64,
    pub max_health: i64,
    pub steal_interval: SimTime,
    pub steal_success_chance: f64,
    pub min_damage: i64,
    pub max_damage: i64,
    pub min_gold: i64,
    pub max_gold: i64,
}

impl Default for ThievingParams {
    fn default() -> Self {
        Self {
            health_regeneration_interval: SimTime::from_secs(8),
            health_regeneration_amount: 8,
            max_health: 720,
            steal_interval: SimTime::from_millis(2_600),
            steal_success_chance: 0.57,
            min_damage: 0,
            max_damage: 157,
            min_gold: 50,
            max_gold: 1_100,
        }
    }
}

/// Fighting parameters that passed validation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FightingConfig {
    params: FightingParams,
}

impl FightingConfig {
    /// Validate raw parameters.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: non-positive health pools or
    /// intervals, negative damage or regen, inverted damage bounds, or hit
    /// chances outside `[0, 1]`.
    pub fn new(params: FightingParams) -> Result<Self, ConfigError> {
        ensure_pool("player_health", params.player_health)?;
        ensure_pool("enemy_health", params.enemy_health)?;
        ensure_non_negative("player_health_regen", params.player_health_regen)?;
        ensure_interval("player_regen_interval", params.player_regen_interval)?;
        ensure_interval("player_attack_interval", params.player_attack_interval)?;
        ensure_interval("enemy_attack_interval", params.enemy_attack_interval)?;
        ensure_bounds(
            "player_damage",
            params.player_damage_min,
            params.player_damage_max,
        )?;
        ensure_bounds(
            "enemy_damage",
            params.enemy_damage_min,
            params.enemy_damage_max,
        )?;
        ensure_probability("player_hit_chance", params.player_hit_chance)?;
        ensure_probability("enemy_hit_chance", params.enemy_hit_chance)?;
        Ok(Self { params })
    }

    #[must_use]
    pub const fn params(&self) -> &FightingParams {
        &self.params
    }
}

impl TryFrom<FightingParams> for FightingConfig {
    type Error = ConfigError;

    fn try_from(params: FightingParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

impl Default for FightingConfig {
    fn default() -> Self {
        Self {
            params: FightingParams::default(),
        }
    }
}

/// Thieving parameters that passed validation. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThievingConfig {
    params: ThievingParams,
}

impl ThievingConfig {
    /// Validate raw parameters.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant: non-positive health or
    /// intervals, negative damage, regen or gold, inverted bounds, or a
    /// success chance outside `[0, 1]`.
    pub fn new(params: ThievingParams) -> Result<Self, ConfigError> {
        ensure_pool("max_health", params.max_health)?;
        ensure_non_negative(
            "health_regeneration_amount",
            params.health_regeneration_amount,
        )?;
        ensure_interval(
            "health_regeneration_interval",
            params.health_regeneration_interval,
        )?;
        ensure_interval("steal_interval", params.steal_interval)?;
        ensure_bounds("damage", params.min_damage, params.max_damage)?;
        ensure_bounds("gold", params.min_gold, params.max_gold)?;
        ensure_probability("steal_success_chance", params.steal_success_chance)?;
        Ok(Self { params })
    }

    #[must_use]
    pub const fn params(&self) -> &ThievingParams {
        &self.params
    }
}

impl TryFrom<ThievingParams> for ThievingConfig {
    type Error = ConfigError;

    fn try_from(params: ThievingParams) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

impl Default for ThievingConfig {
    fn default() -> Self {
        Self {
            params: ThievingParams::default(),
        }
    }
}

/// A validated configuration for either family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum SimConfig {
    Fighting(FightingConfig),
    Thieving(ThievingConfig),
}

impl SimConfig {
    #[must_use]
    pub const fn family(&self) -> TrialFamily {
        match self {
            Self::Fighting(_) => TrialFamily::Fighting,
            Self::Thieving(_) => TrialFamily::Thieving,
        }
    }
}

fn ensure_pool(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value < 1 {
        return Err(ConfigError::NonPositivePool { field, value });
    }
    Ok(())
}

fn ensure_non_negative(field: &'static str, value: i64) -> Result<(), ConfigError> {
    if value < 0 {
        return Err(ConfigError::Negative { field, value });
    }
    Ok(())
}

fn ensure_interval(field: &'static str, value: SimTime) -> Result<(), ConfigError> {
    if value == SimTime::ZERO {
        return Err(ConfigError::NonPositiveInterval { field });
    }
    Ok(())
}

fn ensure_bounds(field: &'static str, min: i64, max: i64) -> Result<(), ConfigError> {
    ensure_non_negative(field, min)?;
    if min > max {
        return Err(ConfigError::MinExceedsMax { field, min, max });
    }
    Ok(())
}

fn ensure_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::ProbabilityOutOfRange { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(FightingConfig::new(FightingParams::default()).is_ok());
        assert!(ThievingConfig::new(ThievingParams::default()).is_ok());
        assert_eq!(
            FightingConfig::default(),
            FightingConfig::new(FightingParams::default()).unwrap()
        );
    }

    #[test]
    fn rejects_inverted_damage_bounds() {
        let params = FightingParams {
            player_damage_min: 50,
            player_damage_max: 10,
            ..FightingParams::default()
        };
        assert_eq!(
            FightingConfig::new(params),
            Err(ConfigError::MinExceedsMax {
                field: "player_damage",
                min: 50,
                max: 10
            })
        );
    }

    #[test]
    fn rejects_zero_intervals() {
        let params = ThievingParams {
            steal_interval: SimTime::ZERO,
            ..ThievingParams::default()
        };
        assert_eq!(
            ThievingConfig::new(params),
            Err(ConfigError::NonPositiveInterval {
                field: "steal_interval"
            })
        );

        let params = FightingParams {
            player_attack_interval: SimTime::ZERO,
            ..FightingParams::default()
        };
        assert!(matches!(
            FightingConfig::new(params),
            Err(ConfigError::NonPositiveInterval { .. })
        ));
    }

    #[test]
    fn rejects_probabilities_outside_unit_range() {
        for value in [-0.01, 1.01, f64::NAN] {
            let params = ThievingParams {
                steal_success_chance: value,
                ..ThievingParams::default()
            };
            assert!(matches!(
                ThievingConfig::new(params),
                Err(ConfigError::ProbabilityOutOfRange { .. })
            ));
        }
        let edge = FightingParams {
            player_hit_chance: 1.0,
            enemy_hit_chance: 0.0,
            ..FightingParams::default()
        };
        assert!(FightingConfig::new(edge).is_ok());
    }

    #[test]
    fn rejects_empty_pools_and_negative_gold() {
        let params = FightingParams {
            enemy_health: 0,
            ..FightingParams::default()
        };
        assert_eq!(
            FightingConfig::new(params),
            Err(ConfigError::NonPositivePool {
                field: "enemy_health",
                value: 0
            })
        );

        let params = ThievingParams {
            min_gold: -5,
            ..ThievingParams::default()
        };
        assert_eq!(
            ThievingConfig::new(params),
            Err(ConfigError::Negative {
                field: "gold",
                value: -5
            })
        );
    }

    #[test]
    fn family_parses_and_displays() {
        assert_eq!(
            "Fighting".parse::<TrialFamily>().unwrap(),
            TrialFamily::Fighting
        );
        assert_eq!("theft".parse::<TrialFamily>().unwrap(), TrialFamily::Thieving);
        assert!("fishing".parse::<TrialFamily>().is_err());
        assert_eq!(TrialFamily::Thieving.to_string(), "thieving");
        assert_eq!(
            SimConfig::Thieving(ThievingConfig::default()).family(),
            TrialFamily::Thieving
        );
    }
}
