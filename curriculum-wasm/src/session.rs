//! The page's handle on one curriculum store.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use curriculum::aggregate;
use curriculum::store::ChangeOrigin;
use curriculum::{
    export_snapshot, BloomLevel, CloId, CloUpdate, CourseField, CurriculumStore, MarkdownExporter,
    MemoryStorage, PloId, SkillType, SlotStorage,
};

use crate::{js_error, log, to_json};

/// A curriculum store over an in-memory mirror of the page's slots.
#[wasm_bindgen]
pub struct CurriculumSession {
    store: CurriculumStore<MemoryStorage>,
    /// Slots written locally since the last `take_changes`
    changed: Rc<RefCell<BTreeSet<&'static str>>>,
}

#[wasm_bindgen]
impl CurriculumSession {
    /// Open a session from a JSON object of slot name → raw slot value.
    ///
    /// An empty string opens an empty session.
    #[wasm_bindgen(constructor)]
    pub fn new(slots_json: &str) -> Result<CurriculumSession, JsValue> {
        let slots: BTreeMap<String, String> = if slots_json.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(slots_json).map_err(js_error)?
        };
        Ok(Self::open(MemoryStorage::from_slots(slots)))
    }

    /// Open a session from an object such as a copy of `localStorage`.
    #[cfg(target_arch = "wasm32")]
    #[wasm_bindgen(js_name = fromEntries)]
    pub fn from_entries(entries: &js_sys::Object) -> CurriculumSession {
        let slots = js_sys::Object::entries(entries).iter().filter_map(|entry| {
            let pair = js_sys::Array::from(&entry);
            Some((pair.get(0).as_string()?, pair.get(1).as_string()?))
        });
        Self::open(MemoryStorage::from_slots(slots))
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Course, CLOs, mapping and evaluations as JSON.
    #[wasm_bindgen(js_name = snapshot)]
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        to_json(self.store.snapshot())
    }

    /// Dashboard statistics as JSON.
    #[wasm_bindgen(js_name = dashboard)]
    pub fn dashboard_json(&self) -> Result<String, JsValue> {
        to_json(&aggregate::dashboard(self.store.snapshot()))
    }

    /// Evaluation rows joined with descriptions, for the summary prompt.
    #[wasm_bindgen(js_name = evaluationRecords)]
    pub fn evaluation_records_json(&self) -> Result<String, JsValue> {
        to_json(&aggregate::evaluation_records(self.store.snapshot()))
    }

    /// Whether `clo` is mapped to `plo`.
    #[wasm_bindgen(js_name = isMapped)]
    pub fn is_mapped(&self, clo: &str, plo: &str) -> bool {
        curriculum::mapping::query(self.store.mapping(), &CloId::from(clo), &PloId::from(plo))
    }

    /// Content fingerprint of the current snapshot.
    pub fn fingerprint(&self) -> String {
        self.store.snapshot().fingerprint()
    }

    // =========================================================================
    // Course
    // =========================================================================

    /// Apply a raw form value to `name`, `code`, `credits` or `description`.
    #[wasm_bindgen(js_name = editCourse)]
    pub fn edit_course(&mut self, field: &str, raw: &str) -> Result<(), JsValue> {
        let field = match field {
            "name" => CourseField::Name,
            "code" => CourseField::Code,
            "credits" => CourseField::Credits,
            "description" => CourseField::Description,
            other => return Err(js_error(format!("Unknown course field: {}", other))),
        };
        self.store.edit_course(field, raw).map_err(js_error)
    }

    // =========================================================================
    // CLOs
    // =========================================================================

    /// Add a CLO; returns it as JSON.
    #[wasm_bindgen(js_name = addClo)]
    pub fn add_clo(
        &mut self,
        description: &str,
        bloom_level: &str,
        skill_type: &str,
    ) -> Result<String, JsValue> {
        let (bloom_level, skill_type) = parse_taxonomy(bloom_level, skill_type)?;
        let clo = self
            .store
            .add_clo(description, bloom_level, skill_type)
            .map_err(js_error)?;
        log(&format!("Added {}", clo.id));
        to_json(&clo)
    }

    /// Replace a CLO's fields; returns it as JSON.
    #[wasm_bindgen(js_name = updateClo)]
    pub fn update_clo(
        &mut self,
        id: &str,
        description: &str,
        bloom_level: &str,
        skill_type: &str,
    ) -> Result<String, JsValue> {
        let (bloom_level, skill_type) = parse_taxonomy(bloom_level, skill_type)?;
        let update = CloUpdate {
            description: description.to_string(),
            bloom_level,
            skill_type,
        };
        let clo = self
            .store
            .update_clo(&CloId::from(id), update)
            .map_err(js_error)?;
        to_json(&clo)
    }

    /// Delete a CLO; `false` when it was already gone.
    #[wasm_bindgen(js_name = deleteClo)]
    pub fn delete_clo(&mut self, id: &str) -> Result<bool, JsValue> {
        self.store.delete_clo(&CloId::from(id)).map_err(js_error)
    }

    /// Flip one mapping cell; returns whether it is now mapped.
    #[wasm_bindgen(js_name = toggleMapping)]
    pub fn toggle_mapping(&mut self, clo: &str, plo: &str) -> Result<bool, JsValue> {
        self.store
            .toggle_mapping(&CloId::from(clo), &PloId::from(plo))
            .map_err(js_error)
    }

    /// Set achievement from raw input; returns the stored percentage.
    #[wasm_bindgen(js_name = setAchievement)]
    pub fn set_achievement(&mut self, clo: &str, raw: &str) -> Result<u8, JsValue> {
        self.store
            .set_achievement_input(&CloId::from(clo), raw)
            .map(|achievement| achievement.value())
            .map_err(js_error)
    }

    /// Add missing evaluation records; `true` when anything changed.
    pub fn reconcile(&mut self) -> Result<bool, JsValue> {
        self.store.reconcile().map_err(js_error)
    }

    /// Replace everything with a sample course.
    #[wasm_bindgen(js_name = loadPreset)]
    pub fn load_preset(&mut self, code: &str) -> Result<(), JsValue> {
        self.store.load_preset(code).map_err(js_error)?;
        log(&format!("Loaded sample course {}", code));
        Ok(())
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// Raw value of a settings slot.
    pub fn setting(&self, key: &str) -> Option<String> {
        self.store.setting(key)
    }

    /// Write a settings slot.
    #[wasm_bindgen(js_name = setSetting)]
    pub fn set_setting(&mut self, key: &str, value: &str) -> Result<(), JsValue> {
        self.store.set_setting(key, value).map_err(js_error)?;
        if let Some(slot) = settings_slot(key) {
            self.changed.borrow_mut().insert(slot);
        }
        Ok(())
    }

    // =========================================================================
    // Storage sync
    // =========================================================================

    /// Slots written since the last call, as JSON `{slot: value | null}`.
    ///
    /// The page copies these into `localStorage`; `null` means remove.
    #[wasm_bindgen(js_name = takeChanges)]
    pub fn take_changes(&mut self) -> Result<String, JsValue> {
        let slots = std::mem::take(&mut *self.changed.borrow_mut());
        let changes: BTreeMap<&str, Option<String>> = slots
            .into_iter()
            .map(|slot| (slot, self.store.storage().get(slot)))
            .collect();
        to_json(&changes)
    }

    /// Apply a `storage` event from another tab; `true` when state changed.
    #[wasm_bindgen(js_name = applyStorageEvent)]
    pub fn apply_storage_event(&mut self, key: &str, new_value: Option<String>) -> bool {
        self.store.apply_remote_change(key, new_value.as_deref())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Render the Markdown report; returns JSON `{fileName, content}`.
    #[wasm_bindgen(js_name = exportMarkdown)]
    pub fn export_markdown(&self) -> Result<String, JsValue> {
        let mut out = Vec::new();
        let file_name =
            export_snapshot(&MarkdownExporter, self.store.snapshot(), &mut out).map_err(js_error)?;
        let content = String::from_utf8(out).map_err(js_error)?;
        to_json(&serde_json::json!({
            "fileName": file_name,
            "content": content,
        }))
    }
}

impl CurriculumSession {
    fn open(storage: MemoryStorage) -> Self {
        let mut store = CurriculumStore::open(storage);
        let changed: Rc<RefCell<BTreeSet<&'static str>>> = Rc::default();

        let pending = Rc::clone(&changed);
        store.subscribe(move |event, _| {
            if event.origin == ChangeOrigin::Local {
                pending.borrow_mut().extend(event.slots.iter().copied());
            }
        });

        log(&format!("Opened curriculum with {} CLOs", store.clos().len()));
        Self { store, changed }
    }
}

fn parse_taxonomy(bloom_level: &str, skill_type: &str) -> Result<(BloomLevel, SkillType), JsValue> {
    let bloom_level = bloom_level.parse::<BloomLevel>().map_err(js_error)?;
    let skill_type = skill_type.parse::<SkillType>().map_err(js_error)?;
    Ok((bloom_level, skill_type))
}

fn settings_slot(key: &str) -> Option<&'static str> {
    use curriculum::persistence::{
        GEMINI_API_KEY_SLOT, OPENROUTER_API_KEY_SLOT, OPENROUTER_MODEL_SLOT,
    };
    [GEMINI_API_KEY_SLOT, OPENROUTER_API_KEY_SLOT, OPENROUTER_MODEL_SLOT]
        .into_iter()
        .find(|slot| *slot == key)
}
