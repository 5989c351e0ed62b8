//! Evaluation reconciliation.
//!
//! Keeps the evaluation collection in 1:1 correspondence with the live CLO
//! sequence. The store calls this explicitly after every change to the CLO
//! set; it is a pure function so it can also repair snapshots loaded from
//! storage or received from another tab.

use std::collections::HashSet;

use crate::types::{Clo, CloId, Evaluation};

/// Repair `evaluations` against `clos`.
///
/// Records for ids no longer live are dropped, the first record per id is
/// kept in its existing position, and each live CLO without one gets a
/// zero-achievement record appended in CLO order. Running the result through
/// again returns it unchanged.
pub fn reconcile_evaluations(clos: &[Clo], evaluations: &[Evaluation]) -> Vec<Evaluation> {
    let live: HashSet<&CloId> = clos.iter().map(|c| &c.id).collect();
    let mut seen: HashSet<&CloId> = HashSet::with_capacity(clos.len());

    let mut reconciled: Vec<Evaluation> = evaluations
        .iter()
        .filter(|ev| live.contains(&ev.clo_id) && seen.insert(&ev.clo_id))
        .cloned()
        .collect();

    reconciled.extend(
        clos.iter()
            .filter(|clo| !seen.contains(&clo.id))
            .map(|clo| Evaluation::empty(clo.id.clone())),
    );

    reconciled
}

/// Whether `evaluations` already corresponds 1:1 with `clos`.
pub fn is_reconciled(clos: &[Clo], evaluations: &[Evaluation]) -> bool {
    if clos.len() != evaluations.len() {
        return false;
    }
    let live: HashSet<&CloId> = clos.iter().map(|c| &c.id).collect();
    let ids: HashSet<&CloId> = evaluations.iter().map(|ev| &ev.clo_id).collect();
    ids.len() == evaluations.len() && ids == live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Achievement, BloomLevel, SkillType};

    fn clo(id: &str) -> Clo {
        Clo {
            id: CloId::from(id),
            description: String::new(),
            bloom_level: BloomLevel::Remembering,
            skill_type: SkillType::SoftSkill,
        }
    }

    fn eval(id: &str, achievement: i64) -> Evaluation {
        Evaluation {
            clo_id: CloId::from(id),
            achievement: Achievement::from(achievement),
        }
    }

    #[test]
    fn test_fills_gaps_and_drops_orphans() {
        let clos = vec![clo("CLO1"), clo("CLO2"), clo("CLO3")];
        let evaluations = vec![eval("CLO9", 50), eval("CLO2", 80)];

        let reconciled = reconcile_evaluations(&clos, &evaluations);
        assert_eq!(
            reconciled,
            vec![eval("CLO2", 80), eval("CLO1", 0), eval("CLO3", 0)]
        );
        assert!(is_reconciled(&clos, &reconciled));
    }

    #[test]
    fn test_idempotent() {
        let clos = vec![clo("CLO1"), clo("CLO4")];
        let evaluations = vec![eval("CLO4", 70), eval("CLO4", 10), eval("CLO2", 5)];

        let once = reconcile_evaluations(&clos, &evaluations);
        let twice = reconcile_evaluations(&clos, &once);
        assert_eq!(once, twice);
        assert_eq!(once, vec![eval("CLO4", 70), eval("CLO1", 0)]);
    }

    #[test]
    fn test_empty_clos_clears_everything() {
        let reconciled = reconcile_evaluations(&[], &[eval("CLO1", 30)]);
        assert!(reconciled.is_empty());
        assert!(is_reconciled(&[], &reconciled));
    }

    #[test]
    fn test_is_reconciled_detects_duplicates() {
        let clos = vec![clo("CLO1"), clo("CLO2")];
        assert!(!is_reconciled(&clos, &[eval("CLO1", 1), eval("CLO1", 2)]));
    }
}
