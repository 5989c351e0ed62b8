/// CLO Studio - WebAssembly bindings
///
/// Exposes the curriculum store to the authoring page. The page keeps
/// ownership of `localStorage`: it hands the current slots to
/// [`CurriculumSession`] on load, writes back whatever
/// [`CurriculumSession::take_changes`] reports after each mutation, and
/// forwards `storage` events from other tabs.
///
/// Values cross the boundary as JSON strings in the same camelCase shape the
/// slots use.

use wasm_bindgen::prelude::*;

use curriculum::{plo_catalog, BloomLevel, SampleBundle, SkillType};

mod session;

pub use session::CurriculumSession;

// Log to console.log in WASM, tracing elsewhere
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[cfg(not(target_arch = "wasm32"))]
fn log(s: &str) {
    tracing::debug!("{}", s);
}

fn js_error(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(js_error)
}

// =========================================================================
// Catalogs
// =========================================================================

/// The fixed PLO catalog as JSON `[{id, description}]`.
#[wasm_bindgen(js_name = ploCatalog)]
pub fn plo_catalog_json() -> Result<String, JsValue> {
    to_json(&plo_catalog())
}

/// Bloom levels in taxonomy order as JSON.
#[wasm_bindgen(js_name = bloomLevels)]
pub fn bloom_levels_json() -> Result<String, JsValue> {
    to_json(&BloomLevel::ALL)
}

/// Skill types as JSON display names.
#[wasm_bindgen(js_name = skillTypes)]
pub fn skill_types_json() -> Result<String, JsValue> {
    to_json(&SkillType::ALL)
}

/// Sample courses offered for bulk load as JSON `[{code, name}]`.
#[wasm_bindgen(js_name = samplePresets)]
pub fn sample_presets_json() -> Result<String, JsValue> {
    let presets: Vec<serde_json::Value> = SampleBundle::presets()
        .into_iter()
        .map(|bundle| {
            serde_json::json!({
                "code": bundle.course.code,
                "name": bundle.course.name,
            })
        })
        .collect();
    to_json(&presets)
}

/// Validate a suggested Bloom level; `None` when it is not one of the six.
#[wasm_bindgen(js_name = parseBloomLevel)]
pub fn parse_bloom_level(text: &str) -> Option<String> {
    match text.parse::<BloomLevel>() {
        Ok(level) => Some(level.as_str().to_string()),
        Err(e) => {
            log(&format!("Rejected Bloom suggestion: {}", e));
            None
        }
    }
}
