//! Combat units and fleets: per-run mutable state layered over shared ship stats.

use std::sync::Arc;

use serde::Serialize;

use crate::data::ship::ShipStats;

/// Unique per run; also the final tie-breaker for acting order and targeting.
pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Active,
    Sunk,
}

#[derive(Debug, Clone)]
pub struct CombatUnit {
    pub id: UnitId,
    side: String,
    pub stats: Arc<ShipStats>,
    current_hp: f64,
    current_org: f64,
    status: UnitStatus,
}

impl CombatUnit {
    pub fn new(id: UnitId, side: impl Into<String>, stats: Arc<ShipStats>) -> Self {
        let current_hp = stats.hit_points.max(0.0);
        let current_org = stats.organization.max(0.0);
        Self {
            id,
            side: side.into(),
            stats,
            current_hp,
            current_org,
            status: status_for(current_hp),
        }
    }

    pub fn name(&self) -> &str {
        &self.stats.name
    }

    pub fn side(&self) -> &str {
        &self.side
    }

    pub fn current_hp(&self) -> f64 {
        self.current_hp
    }

    pub fn current_org(&self) -> f64 {
        self.current_org
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == UnitStatus::Active
    }

    /// Remove hit points, floored at 0. Negative amounts are ignored so hp never rises.
    /// Returns the hp actually removed.
    pub fn take_damage(&mut self, amount: f64) -> f64 {
        let amount = if amount.is_finite() { amount.max(0.0) } else { 0.0 };
        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount).max(0.0);
        self.status = status_for(self.current_hp);
        before - self.current_hp
    }

    /// Remove organization, floored at 0.
    pub fn lose_org(&mut self, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            self.current_org = (self.current_org - amount).max(0.0);
        }
    }

    /// True once a unit that started organized has none left.
    pub fn is_disorganized(&self) -> bool {
        self.stats.organization > 0.0 && self.current_org <= 0.0
    }
}

fn status_for(hp: f64) -> UnitStatus {
    if hp > 0.0 {
        UnitStatus::Active
    } else {
        UnitStatus::Sunk
    }
}

/// All units of one side. Membership is fixed once built; unit state changes during combat.
#[derive(Debug, Clone)]
pub struct Fleet {
    side: String,
    units: Vec<CombatUnit>,
}

impl Fleet {
    pub fn new(side: impl Into<String>) -> Self {
        Self {
            side: side.into(),
            units: Vec::new(),
        }
    }

    /// Append a unit during setup. The unit is re-homed to this fleet's side.
    pub fn push(&mut self, mut unit: CombatUnit) {
        unit.side.clone_from(&self.side);
        self.units.push(unit);
    }

    pub fn side(&self) -> &str {
        &self.side
    }

    pub fn units(&self) -> &[CombatUnit] {
        &self.units
    }

    pub(crate) fn units_mut(&mut self) -> &mut [CombatUnit] {
        &mut self.units
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn active_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.is_active()).count()
    }
}
