//! Scenario document: which ships sail for which side, plus optional engagement rules.
//! YAML by default; `.json` files are read as JSON.
//!
//! ```yaml
//! rules:
//!   max_rounds: 30
//!   damage_model: naval
//! sides:
//!   A:
//!     - Battleship
//!   B:
//!     - name: Destroyer
//!       count: 4
//!       overrides: { attack: 70 }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::combat::{DamageModel, SimulationConfig};
use crate::data::ship::StatOverrides;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("unable to read scenario '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse scenario yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unable to parse scenario json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid scenario rules: {0}")]
    InvalidRules(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub rules: Rules,
    /// Side identifier -> ship references. Sorted by side identifier.
    #[serde(deserialize_with = "unique_sides")]
    pub sides: BTreeMap<String, Vec<ShipRef>>,
}

/// A side declared twice is an error rather than last-one-wins.
fn unique_sides<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<ShipRef>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SidesVisitor;

    impl<'de> Visitor<'de> for SidesVisitor {
        type Value = BTreeMap<String, Vec<ShipRef>>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map of side identifiers to ship lists")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut sides = BTreeMap::new();
            while let Some((side, ships)) = access.next_entry::<String, Vec<ShipRef>>()? {
                if sides.contains_key(&side) {
                    return Err(de::Error::custom(format!("duplicate side '{side}'")));
                }
                sides.insert(side, ships);
            }
            Ok(sides)
        }
    }

    deserializer.deserialize_map(SidesVisitor)
}

/// Optional overrides of [SimulationConfig] carried by the scenario itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_chance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_model: Option<DamageModel>,
}

/// A ship reference: either a bare name or a detailed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShipRef {
    Name(String),
    Entry(ShipEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShipEntry {
    pub name: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default, skip_serializing_if = "StatOverrides::is_empty")]
    pub overrides: StatOverrides,
}

fn default_count() -> u32 {
    1
}

impl ShipRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Entry(entry) => &entry.name,
        }
    }

    pub fn count(&self) -> u32 {
        match self {
            Self::Name(_) => 1,
            Self::Entry(entry) => entry.count,
        }
    }

    pub fn overrides(&self) -> Option<&StatOverrides> {
        match self {
            Self::Name(_) => None,
            Self::Entry(entry) if entry.overrides.is_empty() => None,
            Self::Entry(entry) => Some(&entry.overrides),
        }
    }
}

impl Scenario {
    /// Layer this scenario's rules over `base`. Rejects a hit chance outside [0, 1].
    pub fn apply_rules(&self, base: SimulationConfig) -> Result<SimulationConfig, ScenarioError> {
        let rules = &self.rules;
        let hit_chance = rules.hit_chance.unwrap_or(base.hit_chance);
        if !(0.0..=1.0).contains(&hit_chance) {
            return Err(ScenarioError::InvalidRules(format!(
                "hit_chance {hit_chance} must be within [0, 1]"
            )));
        }
        Ok(SimulationConfig {
            max_rounds: rules.max_rounds.unwrap_or(base.max_rounds),
            seed: rules.seed.unwrap_or(base.seed),
            hit_chance,
            damage_model: rules.damage_model.unwrap_or(base.damage_model),
            ..base
        })
    }
}

pub fn parse_scenario_yaml(input: &str) -> Result<Scenario, ScenarioError> {
    Ok(serde_yaml::from_str(input)?)
}

pub fn parse_scenario_json(input: &str) -> Result<Scenario, ScenarioError> {
    Ok(serde_json::from_str(input)?)
}

/// Load a scenario from disk, choosing the format by extension.
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_scenario_json(&raw)
    } else {
        parse_scenario_yaml(&raw)
    }
}
