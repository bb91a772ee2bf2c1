//! Outcome report: immutable summary of a terminated engagement.

use serde::Serialize;

use crate::combat::engine::{EngagementState, Termination};
use crate::combat::unit::{CombatUnit, UnitId};

pub const DRAW: &str = "draw";
pub const TIMEOUT: &str = "ongoing-timeout";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("engagement is not terminated (round {round})")]
    NotTerminated { round: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Victory,
    Draw,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitReport {
    pub id: UnitId,
    pub name: String,
    pub hp: f64,
    pub max_hp: f64,
}

impl From<&CombatUnit> for UnitReport {
    fn from(unit: &CombatUnit) -> Self {
        Self {
            id: unit.id,
            name: unit.name().to_string(),
            hp: unit.current_hp(),
            max_hp: unit.stats.hit_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideReport {
    pub side: String,
    pub survivors: Vec<UnitReport>,
    pub losses: Vec<UnitReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeReport {
    /// Winning side, or [DRAW] / [TIMEOUT].
    pub winner: String,
    pub outcome: OutcomeKind,
    pub rounds: u32,
    pub sides: Vec<SideReport>,
}

impl OutcomeReport {
    pub fn winning_side(&self) -> Option<&str> {
        match self.outcome {
            OutcomeKind::Victory => Some(&self.winner),
            _ => None,
        }
    }

    pub fn side(&self, side: &str) -> Option<&SideReport> {
        self.sides.iter().find(|report| report.side == side)
    }
}

/// Summarize a terminated engagement. Pure; fails if the state can still advance.
pub fn summarize(state: &EngagementState) -> Result<OutcomeReport, ReportError> {
    let termination = state.termination().ok_or(ReportError::NotTerminated {
        round: state.round(),
    })?;

    let (winner, outcome) = match termination {
        Termination::Victory { side } => (side.clone(), OutcomeKind::Victory),
        Termination::Draw => (DRAW.to_string(), OutcomeKind::Draw),
        Termination::Timeout => (TIMEOUT.to_string(), OutcomeKind::Timeout),
    };

    let sides = state
        .fleets()
        .iter()
        .map(|fleet| {
            let (survivors, losses): (Vec<&CombatUnit>, Vec<&CombatUnit>) =
                fleet.units().iter().partition(|unit| unit.is_active());
            SideReport {
                side: fleet.side().to_string(),
                survivors: survivors.into_iter().map(UnitReport::from).collect(),
                losses: losses.into_iter().map(UnitReport::from).collect(),
            }
        })
        .collect();

    Ok(OutcomeReport {
        winner,
        outcome,
        rounds: state.round(),
        sides,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::combat::engine::{resolve, SimulationConfig};
    use crate::combat::unit::Fleet;
    use crate::data::ship::ShipStats;

    fn duel(a_hp: f64, b_hp: f64) -> Vec<Fleet> {
        let mut a = Fleet::new("A");
        a.push(CombatUnit::new(1, "A", Arc::new(ShipStats::new("Ram", 10.0, 0.0, a_hp, 2.0))));
        let mut b = Fleet::new("B");
        b.push(CombatUnit::new(2, "B", Arc::new(ShipStats::new("Ram", 10.0, 0.0, b_hp, 1.0))));
        vec![a, b]
    }

    #[test]
    fn setup_state_is_not_terminated() {
        let state = EngagementState::new(duel(10.0, 10.0));
        assert_eq!(
            summarize(&state),
            Err(ReportError::NotTerminated { round: 0 })
        );
    }

    #[test]
    fn victory_partitions_survivors_and_losses() {
        let resolution = resolve(duel(30.0, 10.0), SimulationConfig::default()).expect("valid");
        let report = summarize(&resolution.state).expect("terminated");

        assert_eq!(report.winning_side(), Some("A"));
        assert_eq!(report.rounds, 1);
        let a = report.side("A").expect("side A");
        assert_eq!(a.survivors.len(), 1);
        assert_eq!(a.survivors[0].hp, 30.0);
        let b = report.side("B").expect("side B");
        assert!(b.survivors.is_empty());
        assert_eq!(b.losses[0].id, 2);
    }

    #[test]
    fn sunk_at_start_on_both_sides_is_a_draw() {
        let resolution = resolve(duel(0.0, 0.0), SimulationConfig::default()).expect("valid");
        let report = summarize(&resolution.state).expect("terminated");
        assert_eq!(report.winner, DRAW);
        assert_eq!(report.outcome, OutcomeKind::Draw);
        assert_eq!(report.rounds, 0);
    }
}
