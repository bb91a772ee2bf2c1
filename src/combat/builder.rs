//! Fleet builder: scenario + registry -> fleets of combat units.
//! Names resolve to shared stats; overrides produce a private copy for that instance only.

use std::sync::Arc;

use crate::combat::unit::{CombatUnit, Fleet, UnitId};
use crate::data::registry::{NotFoundError, ShipRegistry};
use crate::data::scenario::Scenario;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("side '{side}' references an unknown ship: {source}")]
    UnknownShip {
        side: String,
        #[source]
        source: NotFoundError,
    },
    #[error("side '{side}' has no units")]
    EmptyFleet { side: String },
    #[error("side '{side}' ship '{ship}' override {field} = {value} is invalid (must be a finite number >= 0)")]
    InvalidOverride {
        side: String,
        ship: String,
        field: &'static str,
        value: f64,
    },
    #[error("side '{side}' pushes the scenario past the unit id range")]
    TooManyUnits { side: String },
}

/// Build one fleet per declared side, in side-identifier order.
/// Unit ids start at 1 and follow side, entry, then repeat order.
pub fn build_fleets(scenario: &Scenario, registry: &ShipRegistry) -> Result<Vec<Fleet>, BuildError> {
    let mut next_id: u64 = 1;
    let mut fleets = Vec::with_capacity(scenario.sides.len());

    for (side, entries) in &scenario.sides {
        let mut fleet = Fleet::new(side.as_str());

        for entry in entries {
            let base = registry
                .lookup(entry.name())
                .map_err(|source| BuildError::UnknownShip {
                    side: side.clone(),
                    source,
                })?;

            let stats = match entry.overrides() {
                Some(overrides) => {
                    let patched = overrides.apply_to(&base);
                    if let Some((field, value)) = patched.invalid_field() {
                        return Err(BuildError::InvalidOverride {
                            side: side.clone(),
                            ship: base.name.clone(),
                            field,
                            value,
                        });
                    }
                    Arc::new(patched)
                }
                None => base,
            };

            let end = next_id + u64::from(entry.count());
            if end > u64::from(UnitId::MAX) + 1 {
                return Err(BuildError::TooManyUnits { side: side.clone() });
            }
            for id in next_id..end {
                // Bounded by the check above.
                fleet.push(CombatUnit::new(id as UnitId, side.as_str(), Arc::clone(&stats)));
            }
            next_id = end;
        }

        if fleet.is_empty() {
            return Err(BuildError::EmptyFleet { side: side.clone() });
        }
        tracing::debug!(side = %side, units = fleet.len(), "fleet assembled");
        fleets.push(fleet);
    }

    Ok(fleets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scenario::parse_scenario_yaml;
    use crate::data::ship::ShipStats;

    fn registry() -> ShipRegistry {
        ShipRegistry::from_stats([
            ShipStats::new("Battleship", 40.0, 10.0, 200.0, 20.0),
            ShipStats::new("Destroyer", 10.0, 1.0, 30.0, 35.0),
        ])
        .expect("registry is valid")
    }

    #[test]
    fn assigns_sequential_ids_across_sides_and_counts() {
        let scenario = parse_scenario_yaml(
            "sides:\n  A: [Battleship]\n  B:\n    - name: destroyer\n      count: 3\n",
        )
        .expect("parses");

        let fleets = build_fleets(&scenario, &registry()).expect("builds");

        assert_eq!(fleets.len(), 2);
        assert_eq!(fleets[0].side(), "A");
        let ids: Vec<_> = fleets
            .iter()
            .flat_map(|f| f.units().iter().map(|u| u.id))
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(fleets[1].units().iter().all(|u| u.side() == "B"));
    }

    #[test]
    fn overrides_do_not_leak_into_registry_or_siblings() {
        let registry = registry();
        let scenario = parse_scenario_yaml(
            "sides:\n  A:\n    - name: Destroyer\n      overrides: { attack: 99 }\n    - Destroyer\n  B: [Battleship]\n",
        )
        .expect("parses");

        let fleets = build_fleets(&scenario, &registry).expect("builds");

        assert_eq!(fleets[0].units()[0].stats.attack, 99.0);
        assert_eq!(fleets[0].units()[1].stats.attack, 10.0);
        assert_eq!(registry.lookup("Destroyer").expect("known").attack, 10.0);
    }

    #[test]
    fn zero_count_side_is_empty_fleet() {
        let scenario = parse_scenario_yaml(
            "sides:\n  A: [Battleship]\n  B:\n    - name: Destroyer\n      count: 0\n",
        )
        .expect("parses");

        match build_fleets(&scenario, &registry()) {
            Err(BuildError::EmptyFleet { side }) => assert_eq!(side, "B"),
            other => panic!("expected empty fleet, got {other:?}"),
        }
    }

    #[test]
    fn unit_ids_past_u32_range_are_rejected_before_allocation() {
        let scenario = parse_scenario_yaml(
            "sides:\n  A:\n    - Battleship\n    - name: Destroyer\n      count: 4294967295\n  B: [Battleship]\n",
        )
        .expect("parses");

        match build_fleets(&scenario, &registry()) {
            Err(BuildError::TooManyUnits { side }) => assert_eq!(side, "A"),
            other => panic!("expected too many units, got {other:?}"),
        }
    }

    #[test]
    fn negative_override_is_rejected() {
        let scenario = parse_scenario_yaml(
            "sides:\n  A:\n    - name: Destroyer\n      overrides: { defense: -3 }\n  B: [Battleship]\n",
        )
        .expect("parses");

        assert!(matches!(
            build_fleets(&scenario, &registry()),
            Err(BuildError::InvalidOverride { field: "defense", .. })
        ));
    }
}
