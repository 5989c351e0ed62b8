//! Slot persistence.
//!
//! The browser keeps state in named string slots holding JSON. The core only
//! needs get/set/remove over those slots; [`MemoryStorage`] backs tests and
//! the wasm facade, which mirrors slot writes into `localStorage` itself.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::allocator::IdAllocator;
use crate::mapping::PloMapping;
use crate::types::{Clo, CloId, Course, Evaluation};

/// Slot holding the [`Course`].
pub const COURSE_SLOT: &str = "courseInfo";
/// Slot holding the ordered CLO sequence.
pub const CLOS_SLOT: &str = "clos";
/// Slot holding the CLO→PLO mapping.
pub const MAPPING_SLOT: &str = "ploMapping";
/// Slot holding the evaluation records.
pub const EVALUATIONS_SLOT: &str = "evaluations";
/// Slot holding the id allocator's high-water mark.
pub const CLO_COUNTER_SLOT: &str = "cloCounter";

/// Collaborator credential slots. Opaque to the core.
pub const GEMINI_API_KEY_SLOT: &str = "gemini_api_key";
pub const OPENROUTER_API_KEY_SLOT: &str = "openrouter_api_key";
pub const OPENROUTER_MODEL_SLOT: &str = "openrouter_model";

/// The slots that make up a [`Snapshot`], in write order.
pub const SNAPSHOT_SLOTS: [&str; 4] = [COURSE_SLOT, CLOS_SLOT, MAPPING_SLOT, EVALUATIONS_SLOT];

/// Error types for slot storage.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Storage refused the write (quota, private mode, ...)
    #[error("Storage write failed for slot {slot}: {reason}")]
    WriteFailed { slot: String, reason: String },

    /// Value could not be encoded
    #[error("Serialization failed for slot {slot}: {source}")]
    Serialization {
        slot: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Named string slots with get/set/remove semantics.
pub trait SlotStorage {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;

    fn keys(&self) -> Vec<String>;
}

/// In-memory slot storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: BTreeMap<String, String>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from existing slot values.
    pub fn from_slots<I, K, V>(slots: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            slots: slots.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            read_only: false,
        }
    }

    /// Reject all writes, as a full or disabled browser store would.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// All slot values.
    pub fn slots(&self) -> &BTreeMap<String, String> {
        &self.slots
    }
}

impl SlotStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        if self.read_only {
            return Err(PersistenceError::WriteFailed {
                slot: key.to_string(),
                reason: "storage is read-only".to_string(),
            });
        }
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        if self.read_only {
            return Err(PersistenceError::WriteFailed {
                slot: key.to_string(),
                reason: "storage is read-only".to_string(),
            });
        }
        self.slots.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }
}

/// The persisted collections, read and replaced together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub course: Course,
    pub clos: Vec<Clo>,
    pub mapping: PloMapping,
    pub evaluations: Vec<Evaluation>,
}

impl Snapshot {
    /// Read every slot independently.
    ///
    /// A missing slot takes its default; an unparseable one is logged and
    /// also takes its default, so one corrupt slot never blocks the others.
    /// In the list slots a single unreadable entry is skipped on its own.
    pub fn load(storage: &impl SlotStorage) -> Self {
        Self {
            course: read_slot(storage, COURSE_SLOT).unwrap_or_default(),
            clos: read_list_slot(storage, CLOS_SLOT),
            mapping: read_slot(storage, MAPPING_SLOT).unwrap_or_default(),
            evaluations: read_list_slot(storage, EVALUATIONS_SLOT),
        }
    }

    /// Encode each snapshot slot, in [`SNAPSHOT_SLOTS`] order.
    pub fn encode_slots(&self) -> Result<Vec<(&'static str, String)>, PersistenceError> {
        Ok(vec![
            (COURSE_SLOT, encode_slot(COURSE_SLOT, &self.course)?),
            (CLOS_SLOT, encode_slot(CLOS_SLOT, &self.clos)?),
            (MAPPING_SLOT, encode_slot(MAPPING_SLOT, &self.mapping)?),
            (EVALUATIONS_SLOT, encode_slot(EVALUATIONS_SLOT, &self.evaluations)?),
        ])
    }

    /// SHA256 hex digest of the snapshot's JSON.
    pub fn fingerprint(&self) -> String {
        // Snapshot fields are plain data; encoding cannot fail
        let encoded = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&encoded))
    }
}

/// Read the persisted allocator, if the slot exists and parses.
pub fn load_allocator(storage: &impl SlotStorage) -> Option<IdAllocator> {
    read_slot(storage, CLO_COUNTER_SLOT)
}

/// Decode one slot value, logging parse failures.
pub fn read_slot<T: DeserializeOwned>(storage: &impl SlotStorage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    decode_slot(key, &raw)
}

/// Decode a raw slot value, logging parse failures.
pub fn decode_slot<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(slot = key, error = %e, "Ignoring unparseable slot");
            None
        }
    }
}

/// Decode a JSON array slot entry by entry, skipping entries that do not
/// parse. `None` when the value is not an array at all.
pub fn decode_list<T: DeserializeOwned>(key: &str, raw: &str) -> Option<Vec<T>> {
    let entries: Vec<serde_json::Value> = decode_slot(key, raw)?;
    Some(
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(slot = key, index, error = %e, "Skipping unreadable slot entry");
                    None
                }
            })
            .collect(),
    )
}

/// Read a list slot; missing or non-array slots read as empty.
pub fn read_list_slot<T: DeserializeOwned>(storage: &impl SlotStorage, key: &str) -> Vec<T> {
    storage
        .get(key)
        .and_then(|raw| decode_list(key, &raw))
        .unwrap_or_default()
}

/// Every `id` string in the stored CLO list, including entries that fail
/// to decode as a CLO.
pub fn stored_clo_ids(storage: &impl SlotStorage) -> Vec<CloId> {
    storage
        .get(CLOS_SLOT)
        .map(|raw| listed_clo_ids(&raw))
        .unwrap_or_default()
}

/// Every `id` string in a raw CLO list value.
pub fn listed_clo_ids(raw: &str) -> Vec<CloId> {
    serde_json::from_str::<Vec<serde_json::Value>>(raw)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("id")?.as_str().map(CloId::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Encode one slot value.
pub fn encode_slot<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String, PersistenceError> {
    serde_json::to_string(value).map_err(|source| PersistenceError::Serialization {
        slot: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_when_empty() {
        let snapshot = Snapshot::load(&MemoryStorage::new());
        assert_eq!(snapshot, Snapshot::default());
        assert_eq!(snapshot.course.credits, 3);
    }

    #[test]
    fn test_corrupt_slot_does_not_block_others() {
        let storage = MemoryStorage::from_slots([
            (COURSE_SLOT, r#"{"name":"Web","code":"CS101","credits":3,"description":""}"#),
            (CLOS_SLOT, "not json"),
            (EVALUATIONS_SLOT, r#"[{"cloId":"CLO1","achievement":"150"}]"#),
        ]);

        let snapshot = Snapshot::load(&storage);
        assert_eq!(snapshot.course.code, "CS101");
        assert!(snapshot.clos.is_empty());
        assert_eq!(snapshot.evaluations[0].clo_id, CloId::from("CLO1"));
        assert_eq!(snapshot.evaluations[0].achievement.value(), 100);
    }

    #[test]
    fn test_bad_clo_entry_skips_only_that_entry() {
        let storage = MemoryStorage::from_slots([(
            CLOS_SLOT,
            r#"[
                {"id":"CLO1","description":"Kept","bloomLevel":"Applying","skillType":"Soft Skill"},
                {"id":"CLO2","description":"Dropped","bloomLevel":"Synthesis","skillType":"Soft Skill"}
            ]"#,
        )]);

        let snapshot = Snapshot::load(&storage);
        assert_eq!(snapshot.clos.len(), 1);
        assert_eq!(snapshot.clos[0].id, CloId::from("CLO1"));
        assert_eq!(
            stored_clo_ids(&storage),
            vec![CloId::from("CLO1"), CloId::from("CLO2")]
        );
    }

    #[test]
    fn test_encode_then_load() {
        let mut storage = MemoryStorage::new();
        let mut snapshot = Snapshot::default();
        snapshot.course.name = "Software Engineering".to_string();

        for (key, value) in snapshot.encode_slots().unwrap() {
            storage.set(key, &value).unwrap();
        }
        assert_eq!(Snapshot::load(&storage), snapshot);
        assert_eq!(storage.keys().len(), SNAPSHOT_SLOTS.len());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut storage = MemoryStorage::new();
        storage.set_read_only(true);
        assert!(matches!(
            storage.set(CLOS_SLOT, "[]"),
            Err(PersistenceError::WriteFailed { .. })
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = Snapshot::default();
        let mut b = Snapshot::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        b.course.code = "SE305".to_string();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
