pub mod builder;
pub mod engine;
pub mod report;
pub mod rng;
pub mod runner;
pub mod unit;

pub use builder::{build_fleets, BuildError};
pub use engine::{
    naval_damage_reduction, resolve, serialize_events_json, validate_fleets, CombatEvent,
    CombatResolver, DamageModel, EngagementPhase, EngagementState, EventKind, ResolveError,
    Resolution, SimulationConfig, Strike, Termination, TraceCollector, TraceMode,
    DEFAULT_MAX_ROUNDS, DEFAULT_SEED, DISORGANIZED_ATTACK_MULTIPLIER, NAVAL_HULL_SHARE,
    NAVAL_MAX_REDUCTION, NAVAL_ORG_SHARE,
};
pub use report::{summarize, OutcomeKind, OutcomeReport, ReportError, SideReport, UnitReport};
pub use rng::Rng;
pub use runner::{run_scenario, ScenarioRun};
pub use unit::{CombatUnit, Fleet, UnitId, UnitStatus};
