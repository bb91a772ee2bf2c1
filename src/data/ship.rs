//! Ship stats: one immutable record per ship class, read from the reference table.
//! Column names follow the stat-builder CSV; the aliases below accept its raw headers.

use serde::{Deserialize, Serialize};

/// Reference stats for one ship class. Loaded once, shared by every unit built from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    #[serde(alias = "ship_name")]
    pub name: String,
    #[serde(alias = "heavy_attack", alias = "hg_attack")]
    pub attack: f64,
    #[serde(alias = "armor", alias = "armor_value")]
    pub defense: f64,
    #[serde(alias = "hp", alias = "max_strength")]
    pub hit_points: f64,
    #[serde(alias = "naval_speed")]
    pub speed: f64,
    /// Only read by the naval damage model.
    #[serde(default, alias = "armor_piercing", alias = "hg_armor_piercing")]
    pub piercing: f64,
    /// Only read by the naval damage model.
    #[serde(default, alias = "org")]
    pub organization: f64,
}

impl ShipStats {
    pub fn new(name: impl Into<String>, attack: f64, defense: f64, hit_points: f64, speed: f64) -> Self {
        Self {
            name: name.into(),
            attack,
            defense,
            hit_points,
            speed,
            piercing: 0.0,
            organization: 0.0,
        }
    }

    /// Field name/value pairs for every numeric stat, in table order.
    pub fn numeric_fields(&self) -> [(&'static str, f64); 6] {
        [
            ("attack", self.attack),
            ("defense", self.defense),
            ("hit_points", self.hit_points),
            ("speed", self.speed),
            ("piercing", self.piercing),
            ("organization", self.organization),
        ]
    }

    /// First numeric stat that is negative or not finite, if any.
    pub fn invalid_field(&self) -> Option<(&'static str, f64)> {
        self.numeric_fields()
            .into_iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
    }
}

/// Per-instance stat replacements declared in a scenario. Unset fields keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_points: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piercing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<f64>,
}

impl StatOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Copy `base` with these overrides applied. `base` itself is never touched.
    pub fn apply_to(&self, base: &ShipStats) -> ShipStats {
        ShipStats {
            name: base.name.clone(),
            attack: self.attack.unwrap_or(base.attack),
            defense: self.defense.unwrap_or(base.defense),
            hit_points: self.hit_points.unwrap_or(base.hit_points),
            speed: self.speed.unwrap_or(base.speed),
            piercing: self.piercing.unwrap_or(base.piercing),
            organization: self.organization.unwrap_or(base.organization),
        }
    }
}
