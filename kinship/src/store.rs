use crate::config::EngineConfig;
use crate::error::PersistenceError;
use crate::graph::FamilyGraph;
use crate::json;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Persistence collaborator. Saves are best-effort: the session never rolls
/// back a mutation because a save failed.
pub trait GraphStore {
    fn load(
        &self,
        family_id: &str,
        config: &EngineConfig,
    ) -> Result<Option<FamilyGraph>, PersistenceError>;

    fn save(&self, family_id: &str, graph: &FamilyGraph) -> Result<(), PersistenceError>;
}

/// In-process store holding JSON documents. Clones share the same documents.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: Rc<RefCell<HashMap<String, Value>>>,
    failing: Rc<Cell<bool>>,
    saves: Rc<Cell<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn save_count(&self) -> u64 {
        self.saves.get()
    }

    pub fn document(&self, family_id: &str) -> Option<Value> {
        self.docs.borrow().get(family_id).cloned()
    }

    pub fn put_document(&self, family_id: &str, doc: Value) {
        self.docs.borrow_mut().insert(family_id.to_string(), doc);
    }
}

impl GraphStore for MemoryStore {
    fn load(
        &self,
        family_id: &str,
        config: &EngineConfig,
    ) -> Result<Option<FamilyGraph>, PersistenceError> {
        let Some(doc) = self.document(family_id) else {
            return Ok(None);
        };
        json::from_json(doc, &config.capacity, &config.grid)
            .map(Some)
            .map_err(|e| PersistenceError {
                family_id: family_id.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, family_id: &str, graph: &FamilyGraph) -> Result<(), PersistenceError> {
        if self.failing.get() {
            return Err(PersistenceError {
                family_id: family_id.to_string(),
                message: "store unavailable".to_string(),
            });
        }
        let doc = json::try_to_json(graph).map_err(|e| PersistenceError {
            family_id: family_id.to_string(),
            message: e.to_string(),
        })?;
        self.put_document(family_id, doc);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
