//! Scenario -> report in one call: build fleets, resolve, summarize.

use crate::combat::builder::build_fleets;
use crate::combat::engine::{resolve, CombatEvent, SimulationConfig};
use crate::combat::report::{summarize, OutcomeReport};
use crate::data::registry::ShipRegistry;
use crate::data::scenario::Scenario;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Config after scenario rules were layered over the caller's base.
    pub config: SimulationConfig,
    pub report: OutcomeReport,
    pub events: Vec<CombatEvent>,
}

/// Run one scenario. Unknown ships and empty sides fail before any round executes.
pub fn run_scenario(
    registry: &ShipRegistry,
    scenario: &Scenario,
    base: SimulationConfig,
) -> Result<ScenarioRun> {
    let config = scenario.apply_rules(base)?;
    let fleets = build_fleets(scenario, registry)?;
    let resolution = resolve(fleets, config)?;
    let report = summarize(&resolution.state)?;
    Ok(ScenarioRun {
        config,
        report,
        events: resolution.events,
    })
}
