use crate::interop::to_js;
use kinship::{EngineConfig, FamilyGraph, GraphStore, PersistenceError};
use wasm_bindgen::JsValue;

/// Save hook backed by a JS callback taking `(familyId, document)`.
///
/// The callback may throw or return `false` to report a failed save. Loading
/// happens on the JS side through `from_json_res`.
pub struct JsStore {
    hook: js_sys::Function,
}

impl JsStore {
    pub fn new(hook: js_sys::Function) -> Self {
        JsStore { hook }
    }
}

impl GraphStore for JsStore {
    fn load(
        &self,
        _family_id: &str,
        _config: &EngineConfig,
    ) -> Result<Option<FamilyGraph>, PersistenceError> {
        Ok(None)
    }

    fn save(&self, family_id: &str, graph: &FamilyGraph) -> Result<(), PersistenceError> {
        let failed = |message: String| PersistenceError {
            family_id: family_id.to_string(),
            message,
        };
        let doc = to_js(&kinship::json::try_to_json(graph).map_err(|e| failed(e.to_string()))?);
        match self.hook.call2(&JsValue::NULL, &JsValue::from_str(family_id), &doc) {
            Ok(v) if v.as_bool() == Some(false) => Err(failed("save hook returned false".to_string())),
            Ok(_) => Ok(()),
            Err(e) => Err(failed(
                e.as_string().unwrap_or_else(|| "save hook threw".to_string()),
            )),
        }
    }
}
