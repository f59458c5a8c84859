//! Parameter sheets: flat label to value maps persisted as JSON.
//!
//! A sheet stores every value as text, exactly as a user would type it
//! into a form. Chances are whole percentages and intervals are decimal
//! seconds. Nothing is interpreted until [`ParamSheet::to_config`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use grindsim_engine::constants::DEFAULT_TRIALS;
use grindsim_engine::{
    FightingConfig, FightingParams, SimConfig, SimTime, ThievingConfig, ThievingParams,
    TrialFamily,
};
use log::debug;

pub const ITERATIONS: &str = "Iterations";

const FIGHTING_DEFAULTS: &[(&str, &str)] = &[
    ("Player Health", "720"),
    ("Player Health Regen", "8"),
    ("Player Regen Interval", "8"),
    ("Player Damage Min", "1"),
    ("Player Damage Max", "111"),
    ("Player Hit Chance", "76"),
    ("Player Attack Interval", "3.0"),
    ("Enemy Health", "300"),
    ("Enemy Damage Min", "0"),
    ("Enemy Damage Max", "116"),
    ("Enemy Hit Chance", "35"),
    ("Enemy Attack Interval", "2.4"),
];

const THIEVING_DEFAULTS: &[(&str, &str)] = &[
    ("Health Regeneration Interval", "8"),
    ("Health Regeneration Amount", "8"),
    ("Max Health", "720"),
    ("Steal Interval", "2.6"),
    ("Steal Success Chance", "57"),
    ("Min Damage", "0"),
    ("Max Damage", "157"),
    ("Min Gold", "50"),
    ("Max Gold", "1100"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSheet {
    family: TrialFamily,
    values: BTreeMap<String, String>,
}

impl ParamSheet {
    /// The sheet a fresh user starts from.
    pub fn defaults(family: TrialFamily) -> Self {
        let fields = match family {
            TrialFamily::Fighting => FIGHTING_DEFAULTS,
            TrialFamily::Thieving => THIEVING_DEFAULTS,
        };
        let mut values: BTreeMap<String, String> = fields
            .iter()
            .map(|(label, value)| ((*label).to_string(), (*value).to_string()))
            .collect();
        values.insert(ITERATIONS.to_string(), DEFAULT_TRIALS.to_string());
        Self { family, values }
    }

    /// Load a saved sheet, falling back to defaults when the file is absent.
    ///
    /// Labels missing from the file keep their default value.
    pub fn load(path: &Path, family: TrialFamily) -> Result<Self> {
        let mut sheet = Self::defaults(family);
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no parameter sheet at {}, using defaults", path.display());
                return Ok(sheet);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        let saved: BTreeMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        for (label, value) in saved {
            sheet
                .assign(&label, value)
                .with_context(|| format!("in {}", path.display()))?;
        }
        Ok(sheet)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Apply a `Label=Value` override.
    pub fn set(&mut self, assignment: &str) -> Result<()> {
        let (label, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("override `{assignment}` must look like \"Label=Value\""))?;
        self.assign(label, value.trim().to_string())
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.values.get(label).map(String::as_str)
    }

    pub fn trials(&self) -> Result<usize> {
        let raw = self.require(ITERATIONS)?;
        raw.trim()
            .parse()
            .with_context(|| format!("\"{ITERATIONS}\" must be a whole number, got `{raw}`"))
    }

    /// Interpret and validate the sheet.
    pub fn to_config(&self) -> Result<SimConfig> {
        match self.family {
            TrialFamily::Fighting => {
                let params = self.fighting_params()?;
                let config =
                    FightingConfig::new(params).context("invalid fighting parameters")?;
                Ok(SimConfig::Fighting(config))
            }
            TrialFamily::Thieving => {
                let params = self.thieving_params()?;
                let config =
                    ThievingConfig::new(params).context("invalid thieving parameters")?;
                Ok(SimConfig::Thieving(config))
            }
        }
    }

    fn fighting_params(&self) -> Result<FightingParams> {
        Ok(FightingParams {
            player_health: self.int("Player Health")?,
            player_health_regen: self.int("Player Health Regen")?,
            player_regen_interval: self.secs("Player Regen Interval")?,
            player_damage_min: self.int("Player Damage Min")?,
            player_damage_max: self.int("Player Damage Max")?,
            player_hit_chance: self.percent("Player Hit Chance")?,
            player_attack_interval: self.secs("Player Attack Interval")?,
            enemy_health: self.int("Enemy Health")?,
            enemy_damage_min: self.int("Enemy Damage Min")?,
            enemy_damage_max: self.int("Enemy Damage Max")?,
            enemy_hit_chance: self.percent("Enemy Hit Chance")?,
            enemy_attack_interval: self.secs("Enemy Attack Interval")?,
        })
    }

    fn thieving_params(&self) -> Result<ThievingParams> {
        Ok(ThievingParams {
            health_regeneration_interval: self.secs("Health Regeneration Interval")?,
            health_regeneration_amount: self.int("Health Regeneration Amount")?,
            max_health: self.int("Max Health")?,
            steal_interval: self.secs("Steal Interval")?,
            steal_success_chance: self.percent("Steal Success Chance")?,
            min_damage: self.int("Min Damage")?,
            max_damage: self.int("Max Damage")?,
            min_gold: self.int("Min Gold")?,
            max_gold: self.int("Max Gold")?,
        })
    }

    /// Store `value` under the canonical spelling of `label`.
    fn assign(&mut self, label: &str, value: String) -> Result<()> {
        let wanted = label.trim();
        let canonical = self
            .values
            .keys()
            .find(|known| known.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| anyhow!("unknown {} parameter \"{wanted}\"", self.family))?;
        self.values.insert(canonical, value);
        Ok(())
    }

    fn require(&self, label: &str) -> Result<&str> {
        self.get(label)
            .ok_or_else(|| anyhow!("missing parameter \"{label}\""))
    }

    fn int(&self, label: &str) -> Result<i64> {
        let raw = self.require(label)?;
        raw.trim()
            .parse()
            .with_context(|| format!("\"{label}\" must be a whole number, got `{raw}`"))
    }

    fn secs(&self, label: &str) -> Result<SimTime> {
        let raw = self.require(label)?;
        SimTime::parse_secs(raw).with_context(|| format!("\"{label}\" is not a valid duration"))
    }

    fn percent(&self, label: &str) -> Result<f64> {
        let raw = self.require(label)?;
        let value: f64 = raw
            .trim()
            .parse()
            .with_context(|| format!("\"{label}\" must be a percentage, got `{raw}`"))?;
        if !value.is_finite() {
            bail!("\"{label}\" must be a finite percentage, got `{raw}`");
        }
        Ok(value / 100.0)
    }
}
