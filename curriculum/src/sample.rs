//! Sample course bundles for bulk load.
//!
//! A bundle carries a complete, self-consistent course: CLOs, mapping and
//! evaluations. [`SampleBundle::validate`] checks that consistency before the
//! store swaps it in.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::mapping::{MappingError, PloMapping};
use crate::persistence::Snapshot;
use crate::types::*;

/// Course, CLOs, mapping and evaluations replaced as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleBundle {
    pub course: Course,
    pub clos: Vec<Clo>,
    pub mapping: PloMapping,
    pub evaluations: Vec<Evaluation>,
}

impl SampleBundle {
    /// Check referential integrity.
    ///
    /// CLO ids must be unique, every mapping key and evaluation must point at
    /// a bundle CLO, mapped PLOs must be catalog entries, and no CLO may have
    /// two evaluations. Returns a message naming the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        let mut live: HashSet<&CloId> = HashSet::with_capacity(self.clos.len());
        for clo in &self.clos {
            if !live.insert(&clo.id) {
                return Err(format!("duplicate CLO id {}", clo.id));
            }
            if clo.description.trim().is_empty() {
                return Err(format!("CLO {} has an empty description", clo.id));
            }
        }

        self.mapping.validate_against(&live).map_err(|e| match e {
            MappingError::UnknownClo(id) => format!("mapping references unknown CLO {}", id),
            MappingError::InvalidReference(plo) => format!("mapping references unknown PLO {}", plo),
        })?;

        let mut evaluated: HashSet<&CloId> = HashSet::with_capacity(self.evaluations.len());
        for ev in &self.evaluations {
            if !live.contains(&ev.clo_id) {
                return Err(format!("evaluation references unknown CLO {}", ev.clo_id));
            }
            if !evaluated.insert(&ev.clo_id) {
                return Err(format!("duplicate evaluation for CLO {}", ev.clo_id));
            }
        }

        Ok(())
    }

    /// The snapshot this bundle becomes once loaded.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            course: self.course,
            clos: self.clos,
            mapping: self.mapping,
            evaluations: self.evaluations,
        }
    }

    /// Built-in presets offered on the course page.
    pub fn presets() -> Vec<SampleBundle> {
        vec![web_development(), software_engineering()]
    }

    /// Look a preset up by course code, ignoring case.
    pub fn preset(code: &str) -> Option<SampleBundle> {
        Self::presets()
            .into_iter()
            .find(|bundle| bundle.course.code.eq_ignore_ascii_case(code.trim()))
    }
}

fn clo(id: &str, description: &str, bloom_level: BloomLevel, skill_type: SkillType) -> Clo {
    Clo {
        id: CloId::from(id),
        description: description.to_string(),
        bloom_level,
        skill_type,
    }
}

fn mapping(pairs: &[(&str, &str)]) -> PloMapping {
    let mut grouped: BTreeMap<CloId, BTreeSet<PloId>> = BTreeMap::new();
    for (clo, plo) in pairs {
        grouped.entry(CloId::from(*clo)).or_default().insert(PloId::from(*plo));
    }
    grouped.into_iter().collect()
}

fn evaluations(entries: &[(&str, i64)]) -> Vec<Evaluation> {
    entries
        .iter()
        .map(|(clo, achievement)| Evaluation {
            clo_id: CloId::from(*clo),
            achievement: Achievement::from(*achievement),
        })
        .collect()
}

fn web_development() -> SampleBundle {
    use BloomLevel::*;
    use SkillType::*;

    SampleBundle {
        course: Course {
            name: "Introduction to Web Development".to_string(),
            code: "CS101".to_string(),
            credits: 3,
            description: "A foundational course on modern web development, covering HTML, CSS, and JavaScript to build interactive websites.".to_string(),
        },
        clos: vec![
            clo("CLO1", "Develop and structure web pages using semantic HTML5.", Applying, TechnicalSkill),
            clo("CLO2", "Design and style responsive web layouts using CSS Flexbox and Grid.", Applying, TechnicalSkill),
            clo("CLO3", "Implement interactive user interfaces with JavaScript and DOM manipulation.", Applying, TechnicalSkill),
            clo("CLO4", "Analyze a design specification to produce a functional web application.", Analyzing, AnalyticalSkill),
            clo("CLO5", "Collaborate effectively in a small team to complete a web project.", Creating, SoftSkill),
        ],
        mapping: mapping(&[
            ("CLO1", "PLO2"),
            ("CLO2", "PLO2"),
            ("CLO3", "PLO1"),
            ("CLO3", "PLO6"),
            ("CLO4", "PLO1"),
            ("CLO4", "PLO2"),
            ("CLO5", "PLO3"),
            ("CLO5", "PLO5"),
        ]),
        evaluations: evaluations(&[
            ("CLO1", 95),
            ("CLO2", 88),
            ("CLO3", 82),
            ("CLO4", 75),
            ("CLO5", 91),
        ]),
    }
}

fn software_engineering() -> SampleBundle {
    use BloomLevel::*;
    use SkillType::*;

    SampleBundle {
        course: Course {
            name: "Software Engineering Principles".to_string(),
            code: "SE305".to_string(),
            credits: 4,
            description: "An in-depth study of software engineering principles, covering requirements, design, testing, and project management.".to_string(),
        },
        clos: vec![
            clo("CLO1", "Define software requirements and create specification documents.", Remembering, ProfessionalSkill),
            clo("CLO2", "Apply UML diagrams to model software system designs.", Applying, TechnicalSkill),
            clo("CLO3", "Evaluate different software testing strategies for a given project.", Evaluating, AnalyticalSkill),
            clo("CLO4", "Communicate technical design choices clearly to team members.", Understanding, CommunicationSkill),
            clo("CLO5", "Recognize ethical responsibilities in software development scenarios.", Understanding, SoftSkill),
        ],
        mapping: mapping(&[
            ("CLO1", "PLO1"),
            ("CLO2", "PLO2"),
            ("CLO3", "PLO6"),
            ("CLO4", "PLO3"),
            ("CLO5", "PLO4"),
        ]),
        evaluations: evaluations(&[
            ("CLO1", 92),
            ("CLO2", 85),
            ("CLO3", 78),
            ("CLO4", 90),
            ("CLO5", 94),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_consistent() {
        let presets = SampleBundle::presets();
        assert_eq!(presets.len(), 2);
        for bundle in presets {
            assert!(bundle.validate().is_ok(), "{} failed validation", bundle.course.code);
            assert_eq!(bundle.clos.len(), bundle.evaluations.len());
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(SampleBundle::preset("se305").unwrap().course.credits, 4);
        assert!(SampleBundle::preset("MATH200").is_none());
    }

    #[test]
    fn test_validate_rejects_dangling_references() {
        let mut bundle = SampleBundle::preset("CS101").unwrap();
        bundle.clos.retain(|c| c.id.as_str() != "CLO5");
        bundle.evaluations.retain(|e| e.clo_id.as_str() != "CLO5");
        let err = bundle.validate().unwrap_err();
        assert!(err.contains("CLO5"), "{}", err);

        let mut bundle = SampleBundle::preset("CS101").unwrap();
        bundle.evaluations.push(Evaluation::empty(CloId::from("CLO42")));
        assert!(bundle.validate().unwrap_err().contains("CLO42"));

        let mut bundle = SampleBundle::preset("CS101").unwrap();
        bundle.evaluations.push(Evaluation::empty(CloId::from("CLO1")));
        assert!(bundle.validate().unwrap_err().contains("duplicate evaluation"));

        let mut bundle = SampleBundle::preset("CS101").unwrap();
        bundle.clos.push(bundle.clos[0].clone());
        assert!(bundle.validate().unwrap_err().contains("duplicate CLO id"));
    }
}
