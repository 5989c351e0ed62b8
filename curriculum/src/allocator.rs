//! CLO identifier allocation.
//!
//! Ids are monotonic: once `CLO<n>` has been handed out, no later allocation
//! returns it again, even after the CLO is deleted. The high-water mark is
//! persisted alongside the snapshot so reuse is also avoided across sessions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{Clo, CloId};

/// Hands out `CLO<n>` ids that are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdAllocator {
    high_water: u32,
}

impl IdAllocator {
    /// Start from a persisted high-water mark.
    pub fn with_high_water(high_water: u32) -> Self {
        Self { high_water }
    }

    /// Allocator positioned after the largest numbered id in `clos`.
    pub fn from_clos(clos: &[Clo]) -> Self {
        let mut allocator = Self::default();
        allocator.observe(clos);
        allocator
    }

    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    /// Raise the high-water mark past every numbered id in `clos`.
    ///
    /// Ids written by older sessions were assigned from the live count, so
    /// the count itself is taken into account too.
    pub fn observe(&mut self, clos: &[Clo]) {
        let max_suffix = clos.iter().filter_map(|c| c.id.number()).max().unwrap_or(0);
        let count = u32::try_from(clos.len()).unwrap_or(u32::MAX);
        self.high_water = self.high_water.max(max_suffix).max(count);
    }

    /// Raise the high-water mark past ids seen outside the live sequence,
    /// such as evaluation records or mapping keys left by a CLO that could
    /// not be loaded.
    pub fn observe_ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a CloId>) {
        let max_suffix = ids.into_iter().filter_map(CloId::number).max().unwrap_or(0);
        self.high_water = self.high_water.max(max_suffix);
    }

    /// Give every repeated id after its first occurrence a fresh id.
    ///
    /// Returns the new ids in sequence order. Data written by the count-based
    /// rule can hold the same id twice after a delete followed by an add.
    pub fn rekey_duplicates(&mut self, clos: &mut [Clo]) -> Vec<CloId> {
        let mut seen: HashSet<CloId> = HashSet::with_capacity(clos.len());
        let mut rekeyed = Vec::new();
        for index in 0..clos.len() {
            if seen.insert(clos[index].id.clone()) {
                continue;
            }
            let id = self.allocate(clos);
            seen.insert(id.clone());
            clos[index].id = id.clone();
            rekeyed.push(id);
        }
        rekeyed
    }

    /// Allocate the next id for the live sequence `clos`.
    pub fn allocate(&mut self, clos: &[Clo]) -> CloId {
        self.observe(clos);
        self.high_water = self.high_water.saturating_add(1);

        let mut id = CloId::from_number(self.high_water);
        // Hand-edited snapshots can hold ids the suffix scan can't see past
        while clos.iter().any(|c| c.id == id) {
            self.high_water = self.high_water.saturating_add(1);
            id = CloId::from_number(self.high_water);
        }
        id
    }
}

/// Count-based id, `CLO<existing_count + 1>`.
///
/// This is the legacy format rule. It can repeat an id after a delete, so
/// the store never uses it; it exists for callers that need to reproduce
/// ids assigned by older exports.
pub fn allocate_count_based(existing_count: usize) -> CloId {
    CloId::from_number(u32::try_from(existing_count).unwrap_or(u32::MAX).saturating_add(1))
}
