//! Dashboard aggregations.
//!
//! Everything here is recomputed from a [`Snapshot`] on each read. Data sizes
//! are bounded by what one author types, so nothing is cached.

use serde::{Deserialize, Serialize};

use crate::catalog::plo_ids;
use crate::mapping::query;
use crate::persistence::Snapshot;
use crate::types::*;

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Mapped CLOs over total CLOs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
pub struct MappedRatio {
    pub mapped: usize,
    pub total: usize,
}

impl MappedRatio {
    /// Percentage mapped; 0 when there are no CLOs.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.mapped as f64 * 100.0 / self.total as f64
        }
    }
}

impl std::fmt::Display for MappedRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.mapped, self.total)
    }
}

/// One bar of the achievement chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AchievementPoint {
    pub clo_id: CloId,
    pub achievement: Achievement,
}

/// Count of CLOs at one Bloom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct BloomCount {
    pub level: BloomLevel,
    pub count: usize,
}

/// CLOs mapped to one catalog PLO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PloCoverage {
    pub plo_id: PloId,
    pub clo_ids: Vec<CloId>,
}

/// A CLO's achievement joined with its description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub clo_id: CloId,
    pub description: String,
    pub achievement: Achievement,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_clos: usize,
    pub credits: u32,
    pub mapped: MappedRatio,
    pub bloom_distribution: Vec<BloomCount>,
    pub achievements: Vec<AchievementPoint>,
    pub plo_coverage: Vec<PloCoverage>,
}

/// CLO counts per Bloom level, every level present, taxonomy order.
pub fn bloom_distribution(snapshot: &Snapshot) -> Vec<BloomCount> {
    BloomLevel::ALL
        .into_iter()
        .map(|level| BloomCount {
            level,
            count: snapshot.clos.iter().filter(|c| c.bloom_level == level).count(),
        })
        .collect()
}

/// Live CLOs with at least one mapped PLO, over all live CLOs.
pub fn mapped_ratio(snapshot: &Snapshot) -> MappedRatio {
    MappedRatio {
        mapped: snapshot
            .clos
            .iter()
            .filter(|c| snapshot.mapping.is_mapped(&c.id))
            .count(),
        total: snapshot.clos.len(),
    }
}

/// Achievement per CLO in CLO order; a CLO without a record reports 0.
pub fn achievement_series(snapshot: &Snapshot) -> Vec<AchievementPoint> {
    snapshot
        .clos
        .iter()
        .map(|clo| AchievementPoint {
            clo_id: clo.id.clone(),
            achievement: achievement_of(snapshot, &clo.id),
        })
        .collect()
}

/// For each catalog PLO, the live CLOs mapped to it in CLO order.
pub fn plo_coverage(snapshot: &Snapshot) -> Vec<PloCoverage> {
    plo_ids()
        .map(|plo_id| PloCoverage {
            clo_ids: snapshot
                .clos
                .iter()
                .filter(|c| query(&snapshot.mapping, &c.id, &plo_id))
                .map(|c| c.id.clone())
                .collect(),
            plo_id,
        })
        .collect()
}

/// Evaluation records joined with CLO descriptions, in evaluation order.
///
/// Records whose CLO is gone carry an empty description.
pub fn evaluation_records(snapshot: &Snapshot) -> Vec<EvaluationRecord> {
    snapshot
        .evaluations
        .iter()
        .map(|ev| EvaluationRecord {
            clo_id: ev.clo_id.clone(),
            description: snapshot
                .clos
                .iter()
                .find(|c| c.id == ev.clo_id)
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            achievement: ev.achievement,
        })
        .collect()
}

/// All dashboard statistics at once.
pub fn dashboard(snapshot: &Snapshot) -> DashboardStats {
    DashboardStats {
        total_clos: snapshot.clos.len(),
        credits: snapshot.course.credits,
        mapped: mapped_ratio(snapshot),
        bloom_distribution: bloom_distribution(snapshot),
        achievements: achievement_series(snapshot),
        plo_coverage: plo_coverage(snapshot),
    }
}

fn achievement_of(snapshot: &Snapshot, id: &CloId) -> Achievement {
    snapshot
        .evaluations
        .iter()
        .find(|ev| &ev.clo_id == id)
        .map(|ev| ev.achievement)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PloMapping;
    use crate::sample::SampleBundle;

    fn sample() -> Snapshot {
        SampleBundle::preset("CS101").unwrap().into_snapshot()
    }

    #[test]
    fn test_bloom_distribution_keeps_empty_levels() {
        let distribution = bloom_distribution(&sample());
        assert_eq!(distribution.len(), 6);

        let counts: Vec<usize> = distribution.iter().map(|b| b.count).collect();
        // Remembering, Understanding, Applying, Analyzing, Evaluating, Creating
        assert_eq!(counts, vec![0, 0, 3, 1, 0, 1]);
    }

    #[test]
    fn test_bloom_distribution_sums_to_total() {
        let mut snapshot = sample();
        snapshot.clos.truncate(2);
        let total: usize = bloom_distribution(&snapshot).iter().map(|b| b.count).sum();
        assert_eq!(total, snapshot.clos.len());

        let empty = Snapshot::default();
        let total: usize = bloom_distribution(&empty).iter().map(|b| b.count).sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_mapped_ratio_ignores_empty_sets_and_stale_keys() {
        let mut snapshot = sample();
        assert_eq!(mapped_ratio(&snapshot), MappedRatio { mapped: 5, total: 5 });

        // Empty set for CLO1, stale key left in the relation for CLO9
        snapshot.mapping = crate::mapping::toggle(
            &snapshot.mapping,
            &CloId::from("CLO1"),
            &PloId::from("PLO2"),
        )
        .unwrap();
        snapshot.mapping = crate::mapping::toggle(
            &snapshot.mapping,
            &CloId::from("CLO9"),
            &PloId::from("PLO2"),
        )
        .unwrap();

        let ratio = mapped_ratio(&snapshot);
        assert_eq!(ratio, MappedRatio { mapped: 4, total: 5 });
        assert_eq!(ratio.to_string(), "4 / 5");
        assert!((ratio.percent() - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mapped_ratio_without_clos() {
        let snapshot = Snapshot {
            mapping: PloMapping::new(),
            ..Default::default()
        };
        let ratio = mapped_ratio(&snapshot);
        assert_eq!(ratio, MappedRatio { mapped: 0, total: 0 });
        assert_eq!(ratio.percent(), 0.0);
    }

    #[test]
    fn test_achievement_series_fills_missing_with_zero() {
        let mut snapshot = sample();
        snapshot.evaluations.retain(|ev| ev.clo_id.as_str() != "CLO3");
        snapshot.evaluations.reverse();

        let series = achievement_series(&snapshot);
        let values: Vec<(String, u8)> = series
            .iter()
            .map(|p| (p.clo_id.to_string(), p.achievement.value()))
            .collect();
        assert_eq!(
            values,
            vec![
                ("CLO1".to_string(), 95),
                ("CLO2".to_string(), 88),
                ("CLO3".to_string(), 0),
                ("CLO4".to_string(), 75),
                ("CLO5".to_string(), 91),
            ]
        );
    }

    #[test]
    fn test_plo_coverage() {
        let coverage = plo_coverage(&sample());
        assert_eq!(coverage.len(), 7);

        let plo2: Vec<&str> = coverage[1].clo_ids.iter().map(CloId::as_str).collect();
        assert_eq!(plo2, vec!["CLO1", "CLO2", "CLO4"]);
        assert!(coverage[6].clo_ids.is_empty());
    }

    #[test]
    fn test_evaluation_records_and_dashboard() {
        let snapshot = sample();
        let records = evaluation_records(&snapshot);
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].description, snapshot.clos[0].description);

        let stats = dashboard(&snapshot);
        assert_eq!(stats.total_clos, 5);
        assert_eq!(stats.credits, 3);
        assert_eq!(stats.achievements.len(), 5);
    }
}
