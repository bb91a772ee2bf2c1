//! Combat resolver: advances an engagement round by round until one side remains,
//! every side is gone, or the round limit is hit.
//!
//! Each round, active units act in descending speed order (ties by ascending id).
//! An actor fires at the opposing active unit with the least hp (ties by ascending id).
//! A unit that sinks mid-round takes no further action and cannot be targeted again.
//! With `hit_chance == 1.0` nothing is random; otherwise each shot rolls against a seeded rng.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::combat::rng::Rng;
use crate::combat::unit::{CombatUnit, Fleet, UnitId};

pub const DEFAULT_MAX_ROUNDS: u32 = 20;
pub const DEFAULT_SEED: u64 = 7;

/// Largest share of damage armor can absorb in the naval model.
pub const NAVAL_MAX_REDUCTION: f64 = 0.9;
/// Share of naval damage applied to hull.
pub const NAVAL_HULL_SHARE: f64 = 0.6;
/// Share of naval damage applied to organization, before hp scaling.
pub const NAVAL_ORG_SHARE: f64 = 0.4;
/// Attack multiplier for a unit that has lost all organization.
pub const DISORGANIZED_ATTACK_MULTIPLIER: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageModel {
    /// `max(0, attack - defense)` straight to hull.
    #[default]
    Flat,
    /// Armor vs piercing reduction, hull/organization split, disorganization penalty.
    Naval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceMode {
    #[default]
    Off,
    Events,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub max_rounds: u32,
    pub seed: u64,
    /// Probability that a shot lands. 1.0 keeps the run fully deterministic without the rng.
    pub hit_chance: f64,
    pub damage_model: DamageModel,
    pub trace_mode: TraceMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            seed: DEFAULT_SEED,
            hit_chance: 1.0,
            damage_model: DamageModel::Flat,
            trace_mode: TraceMode::Off,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid scenario: {0}")]
    InvalidScenario(String),
}

/// Damage reduction from armor against piercing: `0.9 * (1 - piercing / armor)` when armor wins.
pub fn naval_damage_reduction(armor: f64, piercing: f64) -> f64 {
    if armor > piercing && armor > 0.0 {
        (NAVAL_MAX_REDUCTION * (1.0 - piercing.max(0.0) / armor)).clamp(0.0, NAVAL_MAX_REDUCTION)
    } else {
        0.0
    }
}

/// What an attacker brings to a single shot, captured before the target is borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strike {
    pub attack: f64,
    pub piercing: f64,
}

impl DamageModel {
    pub fn strike(self, attacker: &CombatUnit) -> Strike {
        let multiplier = match self {
            Self::Naval if attacker.is_disorganized() => DISORGANIZED_ATTACK_MULTIPLIER,
            _ => 1.0,
        };
        Strike {
            attack: attacker.stats.attack * multiplier,
            piercing: attacker.stats.piercing,
        }
    }

    /// Apply one shot to `target`. Returns the hull damage actually removed.
    pub fn apply(self, strike: Strike, target: &mut CombatUnit) -> f64 {
        match self {
            Self::Flat => target.take_damage((strike.attack - target.stats.defense).max(0.0)),
            Self::Naval => {
                let reduction = naval_damage_reduction(target.stats.defense, strike.piercing);
                let raw = strike.attack * (1.0 - reduction);
                let hp_ratio = if target.stats.hit_points > 0.0 {
                    target.current_hp() / target.stats.hit_points
                } else {
                    0.0
                };
                target.lose_org(raw * NAVAL_ORG_SHARE * (1.0 - hp_ratio));
                target.take_damage(raw * NAVAL_HULL_SHARE)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Attack,
    Miss,
    Sunk,
    RoundEnd,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CombatEvent {
    pub round_index: u32,
    pub event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attacker: Option<UnitId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<UnitId>,
    pub damage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_hp: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TraceCollector {
    enabled: bool,
    events: Vec<CombatEvent>,
}

impl TraceCollector {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            events: Vec::new(),
        }
    }

    pub fn record(&mut self, event: CombatEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn events(&self) -> &[CombatEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CombatEvent> {
        self.events
    }
}

pub fn serialize_events_json(events: &[CombatEvent]) -> Result<String, serde_json::Error> {
    serde_json::to_string(events)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    Victory { side: String },
    Draw,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementPhase {
    Setup,
    Running,
    Terminated(Termination),
}

/// Mutable state of one engagement. Owned exclusively by one run.
#[derive(Debug, Clone)]
pub struct EngagementState {
    round: u32,
    fleets: Vec<Fleet>,
    phase: EngagementPhase,
}

impl EngagementState {
    pub fn new(fleets: Vec<Fleet>) -> Self {
        Self {
            round: 0,
            fleets,
            phase: EngagementPhase::Setup,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn fleets(&self) -> &[Fleet] {
        &self.fleets
    }

    pub fn phase(&self) -> &EngagementPhase {
        &self.phase
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.phase, EngagementPhase::Terminated(_))
    }

    pub fn termination(&self) -> Option<&Termination> {
        match &self.phase {
            EngagementPhase::Terminated(termination) => Some(termination),
            _ => None,
        }
    }

    fn active_sides(&self) -> Vec<&str> {
        self.fleets
            .iter()
            .filter(|fleet| fleet.active_count() > 0)
            .map(Fleet::side)
            .collect()
    }
}

/// Check that fleets can form an engagement: two or more distinct, non-empty sides.
pub fn validate_fleets(fleets: &[Fleet]) -> Result<(), ResolveError> {
    if fleets.len() < 2 {
        return Err(ResolveError::InvalidScenario(format!(
            "at least two sides are required, found {}",
            fleets.len()
        )));
    }
    let mut seen = HashSet::new();
    for fleet in fleets {
        if fleet.is_empty() {
            return Err(ResolveError::InvalidScenario(format!(
                "side '{}' has no units",
                fleet.side()
            )));
        }
        if !seen.insert(fleet.side()) {
            return Err(ResolveError::InvalidScenario(format!(
                "side '{}' is declared more than once",
                fleet.side()
            )));
        }
    }
    Ok(())
}

/// Drives one [EngagementState]. Holds the config, the seeded rng, and the trace.
#[derive(Debug, Clone)]
pub struct CombatResolver {
    config: SimulationConfig,
    rng: Rng,
    trace: TraceCollector,
}

impl CombatResolver {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            rng: Rng::new(config.seed),
            trace: TraceCollector::new(config.trace_mode == TraceMode::Events),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn events(&self) -> &[CombatEvent] {
        self.trace.events()
    }

    pub fn into_events(self) -> Vec<CombatEvent> {
        self.trace.into_events()
    }

    /// Setup -> Running. May terminate immediately (e.g. one side starts with nothing afloat).
    /// No-op outside Setup.
    pub fn start(&self, state: &mut EngagementState) -> Result<(), ResolveError> {
        if state.phase != EngagementPhase::Setup {
            return Ok(());
        }
        validate_fleets(&state.fleets)?;
        state.phase = EngagementPhase::Running;
        self.evaluate(state);
        Ok(())
    }

    /// Execute one round if running. Returns true while more rounds remain.
    pub fn step(&mut self, state: &mut EngagementState) -> bool {
        if state.phase != EngagementPhase::Running {
            return false;
        }
        self.execute_round(state);
        self.evaluate(state);
        state.phase == EngagementPhase::Running
    }

    /// Start if needed and run to a terminal state.
    pub fn run(&mut self, state: &mut EngagementState) -> Result<(), ResolveError> {
        self.start(state)?;
        while self.step(state) {}
        Ok(())
    }

    fn evaluate(&self, state: &mut EngagementState) {
        let active = state.active_sides();
        let termination = match active.as_slice() {
            [] => Termination::Draw,
            [side] => Termination::Victory {
                side: side.to_string(),
            },
            _ if state.round >= self.config.max_rounds => Termination::Timeout,
            _ => return,
        };
        tracing::debug!(round = state.round, outcome = ?termination, "engagement terminated");
        state.phase = EngagementPhase::Terminated(termination);
    }

    fn execute_round(&mut self, state: &mut EngagementState) {
        state.round += 1;
        let round = state.round;
        let model = self.config.damage_model;

        for (fleet_idx, unit_idx) in acting_order(&state.fleets) {
            let attacker = &state.fleets[fleet_idx].units()[unit_idx];
            if !attacker.is_active() {
                continue;
            }
            let attacker_id = attacker.id;
            let strike = model.strike(attacker);

            let Some((target_fleet, target_idx)) = select_target(&state.fleets, fleet_idx) else {
                continue;
            };

            if !self.rng.roll(self.config.hit_chance) {
                let target_id = state.fleets[target_fleet].units()[target_idx].id;
                tracing::trace!(round, attacker = attacker_id, target = target_id, "miss");
                self.trace.record(CombatEvent {
                    round_index: round,
                    event_type: EventKind::Miss,
                    attacker: Some(attacker_id),
                    target: Some(target_id),
                    damage: 0.0,
                    target_hp: None,
                });
                continue;
            }

            let target = &mut state.fleets[target_fleet].units_mut()[target_idx];
            let damage = model.apply(strike, target);
            let (target_id, target_hp, sunk) = (target.id, target.current_hp(), !target.is_active());

            tracing::trace!(round, attacker = attacker_id, target = target_id, damage, target_hp, "hit");
            self.trace.record(CombatEvent {
                round_index: round,
                event_type: EventKind::Attack,
                attacker: Some(attacker_id),
                target: Some(target_id),
                damage,
                target_hp: Some(target_hp),
            });
            if sunk {
                self.trace.record(CombatEvent {
                    round_index: round,
                    event_type: EventKind::Sunk,
                    attacker: Some(attacker_id),
                    target: Some(target_id),
                    damage: 0.0,
                    target_hp: Some(0.0),
                });
            }
        }

        self.trace.record(CombatEvent {
            round_index: round,
            event_type: EventKind::RoundEnd,
            attacker: None,
            target: None,
            damage: 0.0,
            target_hp: None,
        });
        if tracing::enabled!(tracing::Level::DEBUG) {
            let afloat: Vec<(&str, usize)> = state
                .fleets
                .iter()
                .map(|fleet| (fleet.side(), fleet.active_count()))
                .collect();
            tracing::debug!(round, ?afloat, "round complete");
        }
    }
}

/// Active units across all fleets by descending speed, then ascending id.
fn acting_order(fleets: &[Fleet]) -> Vec<(usize, usize)> {
    let mut order: Vec<(usize, usize)> = fleets
        .iter()
        .enumerate()
        .flat_map(|(fleet_idx, fleet)| {
            fleet
                .units()
                .iter()
                .enumerate()
                .filter(|(_, unit)| unit.is_active())
                .map(move |(unit_idx, _)| (fleet_idx, unit_idx))
        })
        .collect();

    order.sort_by(|&(lf, lu), &(rf, ru)| {
        let left = &fleets[lf].units()[lu];
        let right = &fleets[rf].units()[ru];
        right
            .stats
            .speed
            .total_cmp(&left.stats.speed)
            .then_with(|| left.id.cmp(&right.id))
    });
    order
}

/// Opposing active unit with the least hp, ties by ascending id.
fn select_target(fleets: &[Fleet], own_fleet: usize) -> Option<(usize, usize)> {
    fleets
        .iter()
        .enumerate()
        .filter(|(fleet_idx, _)| *fleet_idx != own_fleet)
        .flat_map(|(fleet_idx, fleet)| {
            fleet
                .units()
                .iter()
                .enumerate()
                .filter(|(_, unit)| unit.is_active())
                .map(move |(unit_idx, unit)| (fleet_idx, unit_idx, unit))
        })
        .min_by(|(_, _, left), (_, _, right)| compare_targets(left, right))
        .map(|(fleet_idx, unit_idx, _)| (fleet_idx, unit_idx))
}

fn compare_targets(left: &CombatUnit, right: &CombatUnit) -> Ordering {
    left.current_hp()
        .total_cmp(&right.current_hp())
        .then_with(|| left.id.cmp(&right.id))
}

/// Outcome of [resolve]: the terminal state plus any recorded trace.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub state: EngagementState,
    pub events: Vec<CombatEvent>,
}

/// Resolve fleets to a terminal state under `config`.
pub fn resolve(fleets: Vec<Fleet>, config: SimulationConfig) -> Result<Resolution, ResolveError> {
    let mut state = EngagementState::new(fleets);
    let mut resolver = CombatResolver::new(config);
    resolver.run(&mut state)?;
    Ok(Resolution {
        state,
        events: resolver.into_events(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::ship::ShipStats;

    fn fleet(side: &str, units: &[(UnitId, f64, f64, f64, f64)]) -> Fleet {
        let mut fleet = Fleet::new(side);
        for &(id, attack, defense, hp, speed) in units {
            let stats = Arc::new(ShipStats::new(format!("ship{id}"), attack, defense, hp, speed));
            fleet.push(CombatUnit::new(id, side, stats));
        }
        fleet
    }

    #[test]
    fn acting_order_is_speed_desc_then_id_asc() {
        let fleets = vec![
            fleet("A", &[(3, 1.0, 0.0, 1.0, 5.0), (1, 1.0, 0.0, 1.0, 2.0)]),
            fleet("B", &[(2, 1.0, 0.0, 1.0, 5.0), (4, 1.0, 0.0, 1.0, 9.0)]),
        ];
        let ids: Vec<UnitId> = acting_order(&fleets)
            .into_iter()
            .map(|(f, u)| fleets[f].units()[u].id)
            .collect();
        assert_eq!(ids, vec![4, 2, 3, 1]);
    }

    #[test]
    fn target_is_weakest_opponent_with_id_tiebreak() {
        let fleets = vec![
            fleet("A", &[(1, 1.0, 0.0, 1.0, 1.0)]),
            fleet("B", &[(5, 1.0, 0.0, 8.0, 1.0), (3, 1.0, 0.0, 8.0, 1.0)]),
            fleet("C", &[(2, 1.0, 0.0, 9.0, 1.0)]),
        ];
        let (f, u) = select_target(&fleets, 0).expect("opponents exist");
        assert_eq!(fleets[f].units()[u].id, 3);
    }

    #[test]
    fn unit_never_targets_own_side() {
        let fleets = vec![
            fleet("A", &[(1, 1.0, 0.0, 1.0, 1.0), (2, 1.0, 0.0, 1.0, 1.0)]),
            fleet("B", &[(3, 1.0, 0.0, 50.0, 1.0)]),
        ];
        let (f, _) = select_target(&fleets, 0).expect("opponent exists");
        assert_eq!(fleets[f].side(), "B");
    }

    #[test]
    fn naval_reduction_only_when_armor_exceeds_piercing() {
        assert_eq!(naval_damage_reduction(100.0, 150.0), 0.0);
        assert_eq!(naval_damage_reduction(100.0, 100.0), 0.0);
        let reduction = naval_damage_reduction(500.0, 198.0);
        assert!((reduction - 0.9 * (1.0 - 198.0 / 500.0)).abs() < 1e-12);
        assert_eq!(naval_damage_reduction(0.0, 0.0), 0.0);
    }

    #[test]
    fn start_rejects_single_side() {
        let mut state = EngagementState::new(vec![fleet("A", &[(1, 1.0, 0.0, 1.0, 1.0)])]);
        let resolver = CombatResolver::new(SimulationConfig::default());
        assert!(matches!(
            resolver.start(&mut state),
            Err(ResolveError::InvalidScenario(_))
        ));
        assert_eq!(state.phase(), &EngagementPhase::Setup);
    }

    #[test]
    fn duplicate_sides_are_rejected() {
        let fleets = vec![
            fleet("A", &[(1, 1.0, 0.0, 1.0, 1.0)]),
            fleet("A", &[(2, 1.0, 0.0, 1.0, 1.0)]),
        ];
        assert!(validate_fleets(&fleets).is_err());
    }

    #[test]
    fn step_walks_state_machine() {
        let mut state = EngagementState::new(vec![
            fleet("A", &[(1, 10.0, 0.0, 20.0, 5.0)]),
            fleet("B", &[(2, 5.0, 0.0, 20.0, 1.0)]),
        ]);
        let mut resolver = CombatResolver::new(SimulationConfig::default());
        assert!(!resolver.step(&mut state), "setup state does not step");

        resolver.start(&mut state).expect("valid fleets");
        assert_eq!(state.phase(), &EngagementPhase::Running);
        assert!(resolver.step(&mut state));
        assert_eq!(state.round(), 1);
        assert!(!resolver.step(&mut state));
        assert_eq!(
            state.termination(),
            Some(&Termination::Victory {
                side: "A".to_string()
            })
        );
        assert!(!resolver.step(&mut state));
        assert_eq!(state.round(), 2);
    }

    #[test]
    fn misses_consume_rolls_but_deal_nothing() {
        let fleets = vec![
            fleet("A", &[(1, 10.0, 0.0, 20.0, 5.0)]),
            fleet("B", &[(2, 10.0, 0.0, 20.0, 1.0)]),
        ];
        let config = SimulationConfig {
            hit_chance: 0.0,
            max_rounds: 3,
            trace_mode: TraceMode::Events,
            ..SimulationConfig::default()
        };
        let resolution = resolve(fleets, config).expect("valid fleets");
        assert_eq!(resolution.state.termination(), Some(&Termination::Timeout));
        assert!(resolution
            .events
            .iter()
            .all(|e| matches!(e.event_type, EventKind::Miss | EventKind::RoundEnd)));
        assert_eq!(resolution.events.len(), 9);
    }
}
