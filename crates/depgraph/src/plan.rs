// SPDX-License-Identifier: MIT

use aeon_core::UnitId;

/// Output of a successful [`crate::GraphBuilder::resolve`]: units grouped
/// into waves, outermost first, such that every hard dependency of a unit
/// in wave `N` lies in some wave `< N`.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyPlan {
    pub waves: Vec<Vec<UnitId>>,
    pub warnings: Vec<ResolutionWarning>,
}

impl DependencyPlan {
    pub fn unit_count(&self) -> usize {
        self.waves.iter().map(|w| w.len()).sum()
    }

    /// The wave index containing a given unit, if present.
    pub fn wave_of(&self, id: &UnitId) -> Option<usize> {
        self.waves.iter().position(|wave| wave.contains(id))
    }

    /// Flattened load order: wave by wave, in the deterministic
    /// within-wave order produced by the resolver. This is the order used
    /// for `load`/`start`; `stop`/`unload` run the reverse.
    pub fn load_order(&self) -> Vec<UnitId> {
        self.waves.iter().flatten().cloned().collect()
    }

    pub fn unload_order(&self) -> Vec<UnitId> {
        let mut order = self.load_order();
        order.reverse();
        order
    }
}

/// Non-fatal diagnostics surfaced alongside a resolved plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionWarning {
    MissingSoftDependency { unit: UnitId, missing: UnitId },
}

impl std::fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionWarning::MissingSoftDependency { unit, missing } => write!(
                f,
                "unit '{unit}' has optional dependency '{missing}' which is not available; some features may be disabled"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unload_order_is_load_order_reversed() {
        let plan = DependencyPlan {
            waves: vec![
                vec![UnitId::parse("g/a").unwrap()],
                vec![UnitId::parse("g/b").unwrap()],
            ],
            warnings: vec![],
        };
        assert_eq!(plan.load_order(), vec![UnitId::parse("g/a").unwrap(), UnitId::parse("g/b").unwrap()]);
        assert_eq!(plan.unload_order(), vec![UnitId::parse("g/b").unwrap(), UnitId::parse("g/a").unwrap()]);
    }
}
