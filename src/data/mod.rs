pub mod registry;
pub mod scenario;
pub mod ship;
pub mod validate;

pub use registry::{normalize_lookup, DataError, NotFoundError, ShipRegistry};
pub use scenario::{load_scenario, Rules, Scenario, ScenarioError, ShipEntry, ShipRef};
pub use ship::{ShipStats, StatOverrides};
pub use validate::{validate_stats_table, ValidationReport, ValidationSeverity};
