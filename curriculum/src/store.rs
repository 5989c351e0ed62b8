//! The curriculum entity store.
//!
//! All writes go through [`CurriculumStore`]: each accepted mutation builds
//! the next snapshot, writes the changed slots, and only then swaps the
//! in-memory state and notifies subscribers. A failed write restores the
//! slots already written, so memory and storage never diverge.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::allocator::IdAllocator;
use crate::evaluation::{is_reconciled, reconcile_evaluations};
use crate::mapping::{self, MappingError, PloMapping};
use crate::persistence::*;
use crate::sample::SampleBundle;
use crate::types::*;

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Operation referenced a CLO id that does not exist
    #[error("CLO not found: {0}")]
    NotFound(CloId),

    /// Input or bundle failed validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Mapping referenced a PLO outside the catalog
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// No sample bundle with this course code
    #[error("Unknown sample course: {0}")]
    UnknownPreset(String),

    /// Slot storage rejected a write
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Handle returned by [`CurriculumStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(Uuid);

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrigin {
    /// A mutation on this store
    Local,
    /// A storage notification from another tab
    Remote,
}

/// Notification sent to subscribers after a change is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    /// Slots whose contents changed
    pub slots: Vec<&'static str>,
    pub origin: ChangeOrigin,
}

impl StoreEvent {
    pub fn touches(&self, slot: &str) -> bool {
        self.slots.iter().any(|s| *s == slot)
    }
}

type Listener = Box<dyn FnMut(&StoreEvent, &Snapshot)>;

/// Owner of the persisted curriculum state.
pub struct CurriculumStore<S: SlotStorage> {
    storage: S,
    snapshot: Snapshot,
    allocator: IdAllocator,
    listeners: Vec<(SubscriptionId, Listener)>,
    /// CLO ids were re-keyed in memory and not yet written
    rekey_pending: bool,
}

impl<S: SlotStorage> CurriculumStore<S> {
    /// Open a store over `storage`, reading whatever it already holds.
    ///
    /// Nothing is written on open. Repeated CLO ids are re-keyed in memory
    /// and written with the next commit; evaluations are repaired the next
    /// time the CLO set changes or [`reconcile`](Self::reconcile) runs.
    ///
    /// Ids that survive only in unreadable CLO entries, evaluation records or
    /// mapping keys are never handed out again.
    pub fn open(storage: S) -> Self {
        let mut snapshot = Snapshot::load(&storage);
        let mut allocator = load_allocator(&storage).unwrap_or_default();
        allocator.observe(&snapshot.clos);
        allocator.observe_ids(&stored_clo_ids(&storage));
        allocator.observe_ids(snapshot.evaluations.iter().map(|ev| &ev.clo_id));
        allocator.observe_ids(snapshot.mapping.keys());

        let rekeyed = allocator.rekey_duplicates(&mut snapshot.clos);
        if !rekeyed.is_empty() {
            warn!(rekeyed = ?rekeyed, "Re-keyed repeated CLO ids");
        }

        debug!(
            clos = snapshot.clos.len(),
            evaluations = snapshot.evaluations.len(),
            "Opened curriculum store"
        );

        Self {
            storage,
            snapshot,
            allocator,
            listeners: Vec::new(),
            rekey_pending: !rekeyed.is_empty(),
        }
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn course(&self) -> &Course {
        &self.snapshot.course
    }

    pub fn clos(&self) -> &[Clo] {
        &self.snapshot.clos
    }

    pub fn mapping(&self) -> &PloMapping {
        &self.snapshot.mapping
    }

    pub fn evaluations(&self) -> &[Evaluation] {
        &self.snapshot.evaluations
    }

    pub fn clo(&self, id: &CloId) -> Option<&Clo> {
        self.snapshot.clos.iter().find(|c| &c.id == id)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    // =========================================================================
    // Course
    // =========================================================================

    /// Replace the course details.
    pub fn set_course(&mut self, course: Course) -> Result<(), StoreError> {
        let mut next = self.snapshot.clone();
        next.course = course;
        self.commit(next, self.allocator, vec![COURSE_SLOT])
    }

    /// Apply a raw form value to one course field.
    pub fn edit_course(&mut self, field: CourseField, raw: &str) -> Result<(), StoreError> {
        let mut course = self.snapshot.course.clone();
        course.apply_edit(field, raw);
        self.set_course(course)
    }

    // =========================================================================
    // CLOs
    // =========================================================================

    /// Append a new CLO and give it an evaluation record.
    pub fn add_clo(
        &mut self,
        description: &str,
        bloom_level: BloomLevel,
        skill_type: SkillType,
    ) -> Result<Clo, StoreError> {
        let description = validate_description(description)?;

        let mut allocator = self.allocator;
        let clo = Clo {
            id: allocator.allocate(&self.snapshot.clos),
            description,
            bloom_level,
            skill_type,
        };

        let mut next = self.snapshot.clone();
        next.clos.push(clo.clone());
        next.evaluations = reconcile_evaluations(&next.clos, &next.evaluations);

        self.commit(next, allocator, vec![CLOS_SLOT, EVALUATIONS_SLOT, CLO_COUNTER_SLOT])?;
        debug!(clo_id = %clo.id, bloom_level = %clo.bloom_level, "Added CLO");
        Ok(clo)
    }

    /// Replace a CLO's description, Bloom level and skill type. The id stays.
    pub fn update_clo(&mut self, id: &CloId, update: CloUpdate) -> Result<Clo, StoreError> {
        let index = self.position(id)?;
        let description = validate_description(&update.description)?;

        let mut next = self.snapshot.clone();
        let clo = &mut next.clos[index];
        clo.description = description;
        clo.bloom_level = update.bloom_level;
        clo.skill_type = update.skill_type;
        let updated = clo.clone();

        self.commit(next, self.allocator, vec![CLOS_SLOT])?;
        debug!(clo_id = %id, "Updated CLO");
        Ok(updated)
    }

    /// Delete a CLO with its mapping entry and evaluation.
    ///
    /// Deleting an id that is not present changes nothing and returns `false`.
    pub fn delete_clo(&mut self, id: &CloId) -> Result<bool, StoreError> {
        let Ok(index) = self.position(id) else {
            debug!(clo_id = %id, "Delete of absent CLO ignored");
            return Ok(false);
        };

        let mut next = self.snapshot.clone();
        next.clos.remove(index);
        next.mapping.remove_clo(id);
        next.evaluations = reconcile_evaluations(&next.clos, &next.evaluations);

        self.commit(
            next,
            self.allocator,
            vec![CLOS_SLOT, MAPPING_SLOT, EVALUATIONS_SLOT],
        )?;
        debug!(clo_id = %id, "Deleted CLO");
        Ok(true)
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    /// Flip whether `clo` maps to `plo`. Returns the new membership.
    pub fn toggle_mapping(&mut self, clo: &CloId, plo: &PloId) -> Result<bool, StoreError> {
        self.position(clo)?;

        let mut next = self.snapshot.clone();
        next.mapping = mapping::toggle(&self.snapshot.mapping, clo, plo)?;
        let mapped = mapping::query(&next.mapping, clo, plo);

        self.commit(next, self.allocator, vec![MAPPING_SLOT])?;
        debug!(clo_id = %clo, plo_id = %plo, mapped, "Toggled mapping");
        Ok(mapped)
    }

    // =========================================================================
    // Evaluations
    // =========================================================================

    /// Bring evaluations into 1:1 correspondence with the CLOs.
    ///
    /// Also writes any re-keyed CLO ids. Returns `false` without writing when
    /// there is nothing to repair.
    pub fn reconcile(&mut self) -> Result<bool, StoreError> {
        if !self.rekey_pending && is_reconciled(&self.snapshot.clos, &self.snapshot.evaluations) {
            return Ok(false);
        }

        let mut next = self.snapshot.clone();
        next.evaluations = reconcile_evaluations(&next.clos, &next.evaluations);
        self.commit(next, self.allocator, vec![EVALUATIONS_SLOT])?;
        debug!("Reconciled evaluations");
        Ok(true)
    }

    /// Record the achievement for a CLO.
    pub fn set_achievement(&mut self, id: &CloId, achievement: Achievement) -> Result<(), StoreError> {
        self.position(id)?;

        let mut next = self.snapshot.clone();
        match next.evaluations.iter_mut().find(|ev| &ev.clo_id == id) {
            Some(ev) => ev.achievement = achievement,
            None => next.evaluations.push(Evaluation {
                clo_id: id.clone(),
                achievement,
            }),
        }

        self.commit(next, self.allocator, vec![EVALUATIONS_SLOT])
    }

    /// Record the achievement from raw form input, clamping to `0..=100`.
    pub fn set_achievement_input(&mut self, id: &CloId, raw: &str) -> Result<Achievement, StoreError> {
        let achievement = Achievement::coerce(raw);
        self.set_achievement(id, achievement)?;
        Ok(achievement)
    }

    // =========================================================================
    // Bulk load
    // =========================================================================

    /// Replace course, CLOs, mapping and evaluations with `bundle`.
    ///
    /// The bundle is validated first; on any failure the store and its slots
    /// are left exactly as they were.
    pub fn load_sample(&mut self, bundle: SampleBundle) -> Result<(), StoreError> {
        bundle.validate().map_err(StoreError::Validation)?;

        let code = bundle.course.code.clone();
        let allocator = IdAllocator::from_clos(&bundle.clos);
        let next = bundle.into_snapshot();

        let mut slots = SNAPSHOT_SLOTS.to_vec();
        slots.push(CLO_COUNTER_SLOT);
        self.commit(next, allocator, slots)?;

        info!(course = %code, clos = self.snapshot.clos.len(), "Loaded sample course");
        Ok(())
    }

    /// Load a built-in sample by course code.
    pub fn load_preset(&mut self, code: &str) -> Result<(), StoreError> {
        let bundle =
            SampleBundle::preset(code).ok_or_else(|| StoreError::UnknownPreset(code.to_string()))?;
        self.load_sample(bundle)
    }

    // =========================================================================
    // Opaque settings
    // =========================================================================

    /// Read a collaborator setting slot.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.storage.get(key)
    }

    /// Write a collaborator setting slot. Curriculum slots are refused.
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if is_curriculum_slot(key) {
            return Err(StoreError::Validation(format!(
                "{} is a curriculum slot, not a setting",
                key
            )));
        }
        self.storage.set(key, value)?;
        Ok(())
    }

    // =========================================================================
    // Subscriptions and cross-tab changes
    // =========================================================================

    /// Register a callback run after every applied change.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent, &Snapshot) + 'static) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a callback. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Apply a slot change made by another tab.
    ///
    /// The slot's state is replaced wholesale with the new value, or reset to
    /// its default when the slot was removed; nothing is merged and nothing
    /// is written back. Returns whether local state changed. Unparseable
    /// payloads and non-curriculum slots are ignored.
    pub fn apply_remote_change(&mut self, key: &str, new_value: Option<&str>) -> bool {
        let mut next = self.snapshot.clone();
        let mut allocator = self.allocator;

        let slot = match key {
            COURSE_SLOT => {
                next.course = match decode_or_default(key, new_value) {
                    Some(course) => course,
                    None => return false,
                };
                COURSE_SLOT
            }
            CLOS_SLOT => {
                next.clos = match new_value {
                    Some(raw) => match decode_list(key, raw) {
                        Some(clos) => clos,
                        None => return false,
                    },
                    None => Vec::new(),
                };
                allocator.observe(&next.clos);
                allocator.observe_ids(&listed_clo_ids(new_value.unwrap_or_default()));
                let rekeyed = allocator.rekey_duplicates(&mut next.clos);
                if !rekeyed.is_empty() {
                    warn!(rekeyed = ?rekeyed, "Re-keyed repeated CLO ids from another tab");
                    self.rekey_pending = true;
                }
                CLOS_SLOT
            }
            MAPPING_SLOT => {
                next.mapping = match decode_or_default(key, new_value) {
                    Some(mapping) => mapping,
                    None => return false,
                };
                MAPPING_SLOT
            }
            EVALUATIONS_SLOT => {
                next.evaluations = match new_value {
                    Some(raw) => match decode_list(key, raw) {
                        Some(evaluations) => evaluations,
                        None => return false,
                    },
                    None => Vec::new(),
                };
                allocator.observe_ids(next.evaluations.iter().map(|ev| &ev.clo_id));
                EVALUATIONS_SLOT
            }
            CLO_COUNTER_SLOT => {
                let remote = match decode_or_default::<IdAllocator>(key, new_value) {
                    Some(remote) => remote,
                    None => return false,
                };
                // Never lower the local high-water mark
                allocator = IdAllocator::with_high_water(remote.high_water().max(allocator.high_water()));
                allocator.observe(&next.clos);
                CLO_COUNTER_SLOT
            }
            _ => return false,
        };

        self.mirror_remote(key, new_value);

        if next == self.snapshot && allocator == self.allocator {
            return false;
        }

        self.snapshot = next;
        self.allocator = allocator;
        debug!(slot, "Applied remote change");
        self.notify(StoreEvent {
            slots: vec![slot],
            origin: ChangeOrigin::Remote,
        });
        true
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, id: &CloId) -> Result<usize, StoreError> {
        self.snapshot
            .clos
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    /// Persist `slots` from `next`, then swap it in and notify.
    fn commit(
        &mut self,
        next: Snapshot,
        allocator: IdAllocator,
        mut slots: Vec<&'static str>,
    ) -> Result<(), StoreError> {
        if self.rekey_pending {
            for slot in [CLOS_SLOT, CLO_COUNTER_SLOT] {
                if !slots.contains(&slot) {
                    slots.push(slot);
                }
            }
        }

        let mut encoded: Vec<(&'static str, String)> = next
            .encode_slots()?
            .into_iter()
            .filter(|(key, _)| slots.contains(key))
            .collect();
        if slots.contains(&CLO_COUNTER_SLOT) {
            encoded.push((CLO_COUNTER_SLOT, encode_slot(CLO_COUNTER_SLOT, &allocator)?));
        }

        let previous: Vec<(&'static str, Option<String>)> = encoded
            .iter()
            .map(|(key, _)| (*key, self.storage.get(key)))
            .collect();

        for (written, (key, value)) in encoded.iter().enumerate() {
            if let Err(e) = self.storage.set(key, value) {
                warn!(slot = key, error = %e, "Slot write failed, restoring previous values");
                self.restore(&previous[..written]);
                return Err(e.into());
            }
        }

        self.snapshot = next;
        self.allocator = allocator;
        self.rekey_pending = false;
        self.notify(StoreEvent {
            slots,
            origin: ChangeOrigin::Local,
        });
        Ok(())
    }

    fn restore(&mut self, previous: &[(&'static str, Option<String>)]) {
        for (key, value) in previous {
            let result = match value {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(e) = result {
                warn!(slot = key, error = %e, "Could not restore slot");
            }
        }
    }

    fn mirror_remote(&mut self, key: &str, new_value: Option<&str>) {
        let result = match new_value {
            Some(value) => self.storage.set(key, value),
            None => self.storage.remove(key),
        };
        if let Err(e) = result {
            warn!(slot = key, error = %e, "Could not mirror remote slot");
        }
    }

    fn notify(&mut self, event: StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event, &self.snapshot);
        }
    }
}

fn validate_description(description: &str) -> Result<String, StoreError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(
            "CLO description must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn is_curriculum_slot(key: &str) -> bool {
    SNAPSHOT_SLOTS.contains(&key) || key == CLO_COUNTER_SLOT
}

/// Decode a remote value; a removed slot decodes to the default.
fn decode_or_default<T: serde::de::DeserializeOwned + Default>(
    key: &str,
    value: Option<&str>,
) -> Option<T> {
    match value {
        Some(raw) => decode_slot(key, raw),
        None => Some(T::default()),
    }
}
