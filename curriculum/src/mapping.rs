//! CLO→PLO mapping relation.
//!
//! Each CLO id keys an unordered set of catalog PLO ids. Entries are created
//! on first toggle and only disappear when their CLO is deleted; toggling the
//! last PLO off leaves an empty set behind.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::catalog::is_catalog_plo;
use crate::types::{CloId, PloId};

#[cfg(feature = "typescript")]
use ts_rs::TS;

/// Error types for mapping operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// PLO id is not in the catalog
    #[error("Invalid PLO reference: {0}")]
    InvalidReference(PloId),

    /// Mapping key has no matching CLO
    #[error("Mapping references unknown CLO: {0}")]
    UnknownClo(CloId),
}

/// The CLO→PLO relation, serialized as `{"CLO1": ["PLO2"], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(TS))]
#[cfg_attr(feature = "typescript", ts(export))]
#[serde(transparent)]
pub struct PloMapping(BTreeMap<CloId, BTreeSet<PloId>>);

impl PloMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// PLOs mapped from `clo`, if it has an entry.
    pub fn get(&self, clo: &CloId) -> Option<&BTreeSet<PloId>> {
        self.0.get(clo)
    }

    /// Whether `clo` has a non-empty PLO set.
    pub fn is_mapped(&self, clo: &CloId) -> bool {
        self.0.get(clo).is_some_and(|plos| !plos.is_empty())
    }

    pub fn contains_key(&self, clo: &CloId) -> bool {
        self.0.contains_key(clo)
    }

    pub fn keys(&self) -> impl Iterator<Item = &CloId> + '_ {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CloId, &BTreeSet<PloId>)> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop the entry for a deleted CLO. Returns whether one existed.
    pub fn remove_clo(&mut self, clo: &CloId) -> bool {
        self.0.remove(clo).is_some()
    }

    /// Check every key against `live` CLO ids and every PLO against the catalog.
    pub fn validate_against(&self, live: &HashSet<&CloId>) -> Result<(), MappingError> {
        for (clo, plos) in &self.0 {
            if !live.contains(clo) {
                return Err(MappingError::UnknownClo(clo.clone()));
            }
            if let Some(plo) = plos.iter().find(|plo| !is_catalog_plo(plo)) {
                return Err(MappingError::InvalidReference(plo.clone()));
            }
        }
        Ok(())
    }

    fn toggle_in_place(&mut self, clo: &CloId, plo: &PloId) -> Result<bool, MappingError> {
        if !is_catalog_plo(plo) {
            return Err(MappingError::InvalidReference(plo.clone()));
        }

        let plos = self.0.entry(clo.clone()).or_default();
        if plos.remove(plo) {
            Ok(false)
        } else {
            plos.insert(plo.clone());
            Ok(true)
        }
    }
}

impl FromIterator<(CloId, BTreeSet<PloId>)> for PloMapping {
    fn from_iter<T: IntoIterator<Item = (CloId, BTreeSet<PloId>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Flip membership of `plo` in `clo`'s set, returning the new relation.
///
/// Applying the same toggle twice yields the original membership.
pub fn toggle(mapping: &PloMapping, clo: &CloId, plo: &PloId) -> Result<PloMapping, MappingError> {
    let mut next = mapping.clone();
    next.toggle_in_place(clo, plo)?;
    Ok(next)
}

/// Whether `clo` maps to `plo`. Absent keys are simply unmapped.
pub fn query(mapping: &PloMapping, clo: &CloId, plo: &PloId) -> bool {
    mapping.get(clo).is_some_and(|plos| plos.contains(plo))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(clo: &str, plo: &str) -> (CloId, PloId) {
        (CloId::from(clo), PloId::from(plo))
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let (clo, plo) = ids("CLO1", "PLO2");
        let empty = PloMapping::new();

        let once = toggle(&empty, &clo, &plo).unwrap();
        assert!(query(&once, &clo, &plo));
        assert!(once.is_mapped(&clo));

        let twice = toggle(&once, &clo, &plo).unwrap();
        assert!(!query(&twice, &clo, &plo));
        assert!(!twice.is_mapped(&clo));
        // Entry survives with an empty set
        assert_eq!(twice.get(&clo).map(BTreeSet::len), Some(0));
    }

    #[test]
    fn test_toggle_is_self_inverse_on_populated_mapping() {
        let (clo, plo1) = ids("CLO1", "PLO1");
        let plo6 = PloId::from("PLO6");
        let base = toggle(&PloMapping::new(), &clo, &plo1).unwrap();

        let back = toggle(&toggle(&base, &clo, &plo6).unwrap(), &clo, &plo6).unwrap();
        assert_eq!(back, base);

        let back = toggle(&toggle(&base, &clo, &plo1).unwrap(), &clo, &plo1).unwrap();
        assert_eq!(back.get(&clo), base.get(&clo));
    }

    #[test]
    fn test_toggle_rejects_unknown_plo() {
        let (clo, plo) = ids("CLO1", "PLO9");
        let err = toggle(&PloMapping::new(), &clo, &plo).unwrap_err();
        assert_eq!(err, MappingError::InvalidReference(plo));
    }

    #[test]
    fn test_query_absent_key() {
        let (clo, plo) = ids("CLO5", "PLO1");
        assert!(!query(&PloMapping::new(), &clo, &plo));
    }

    #[test]
    fn test_validate_against_live_ids() {
        let (clo1, plo) = ids("CLO1", "PLO3");
        let clo2 = CloId::from("CLO2");
        let mapping = toggle(&PloMapping::new(), &clo2, &plo).unwrap();

        let live: HashSet<&CloId> = [&clo1].into_iter().collect();
        assert_eq!(
            mapping.validate_against(&live),
            Err(MappingError::UnknownClo(clo2.clone()))
        );

        let live: HashSet<&CloId> = [&clo1, &clo2].into_iter().collect();
        assert!(mapping.validate_against(&live).is_ok());
    }

    #[test]
    fn test_wire_format() {
        let mapping: PloMapping =
            serde_json::from_str(r#"{"CLO3": ["PLO6", "PLO1", "PLO1"]}"#).unwrap();
        let clo = CloId::from("CLO3");
        assert_eq!(mapping.get(&clo).map(BTreeSet::len), Some(2));
        assert_eq!(
            serde_json::to_string(&mapping).unwrap(),
            r#"{"CLO3":["PLO1","PLO6"]}"#
        );
    }
}
