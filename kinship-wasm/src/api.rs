use crate::error;
use crate::interop::{arr_f32, arr_i8, arr_u32, arr_u8, new_obj, set_kv, to_js};
use crate::store::JsStore;
use crate::FamilyTree;
use kinship::{
    Direction, EditError, EngineConfig, Generation, NewPerson, OwnerIdentity, PersonId, Profile,
    RelationshipId, RelationshipKind, RelativeKind,
};
use wasm_bindgen::prelude::*;
type JsValue = wasm_bindgen::JsValue;

#[wasm_bindgen]
pub fn set_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn kind_code(k: RelationshipKind) -> u8 {
    match k {
        RelationshipKind::Spouse => 0,
        RelationshipKind::ParentChild => 1,
        RelationshipKind::Sibling => 2,
    }
}

fn parse_owner(owner: JsValue) -> Result<OwnerIdentity, JsValue> {
    serde_wasm_bindgen::from_value(owner).map_err(|e| error::bad_input("owner", e))
}

fn parse_generation(g: i32) -> Result<Generation, JsValue> {
    i8::try_from(g)
        .ok()
        .and_then(Generation::new)
        .ok_or_else(|| {
            error::out_of_range(
                "generation",
                Generation::MIN as i32,
                Generation::MAX as i32,
                g,
            )
        })
}

#[wasm_bindgen]
impl FamilyTree {
    /// `owner` is `{ user_id, profile }`; the owner becomes the root person.
    #[wasm_bindgen(constructor)]
    pub fn new(family_id: &str, owner: JsValue) -> Result<FamilyTree, JsValue> {
        let owner = parse_owner(owner)?;
        FamilyTree::rs_open(family_id, &owner, EngineConfig::default())
            .map_err(|e| error::open(&e))
    }
    /// Like `new`, with a partial engine configuration object.
    pub fn with_config(
        family_id: &str,
        owner: JsValue,
        config: JsValue,
    ) -> Result<FamilyTree, JsValue> {
        let owner = parse_owner(owner)?;
        let raw = serde_wasm_bindgen::from_value::<serde_json::Value>(config)
            .map_err(|e| error::bad_input("config", e))?;
        let config = EngineConfig::from_json_value(raw)
            .map_err(|m| error::err("invalid_config", m, None))?;
        FamilyTree::rs_open(family_id, &owner, config).map_err(|e| error::open(&e))
    }
    pub fn version(&self) -> u64 {
        self.rs_version()
    }
    pub fn family_id(&self) -> String {
        self.inner.family_id().to_string()
    }

    // Save hook
    pub fn set_save_hook(&mut self, hook: js_sys::Function) {
        self.inner.set_store(Box::new(JsStore::new(hook)));
    }
    /// Messages of saves that failed since the last call.
    pub fn take_save_warnings(&mut self) -> Vec<String> {
        self.drain_save_warnings();
        std::mem::take(&mut self.save_warnings)
    }

    // Read model
    pub fn person_count(&self) -> u32 {
        self.inner.graph().person_count() as u32
    }
    pub fn relationship_count(&self) -> u32 {
        self.inner.graph().relationship_count() as u32
    }
    pub fn root_id(&self) -> Option<u32> {
        self.inner.graph().root().map(|p| p.id.0)
    }
    pub fn get_person(&self, id: u32) -> JsValue {
        match self.inner.graph().person(PersonId(id)) {
            Some(p) => to_js(p),
            None => JsValue::NULL,
        }
    }
    pub fn get_person_res(&self, id: u32) -> JsValue {
        match self.inner.graph().person(PersonId(id)) {
            Some(p) => error::ok(to_js(p)),
            None => error::edit(&EditError::NotFound(kinship::Entity::Person(PersonId(id)))),
        }
    }
    pub fn persons(&self) -> JsValue {
        let all: Vec<&kinship::Person> = self.inner.graph().persons().collect();
        to_js(&all)
    }
    pub fn relationships(&self) -> JsValue {
        let all: Vec<&kinship::Relationship> = self.inner.graph().relationships().collect();
        to_js(&all)
    }
    pub fn capacities(&self) -> JsValue {
        let rows = js_sys::Array::new();
        for (g, cap) in self.inner.graph().capacities() {
            let o = new_obj();
            set_kv(&o, "generation", &JsValue::from_f64(g.value() as f64));
            set_kv(&o, "current", &JsValue::from_f64(cap.current as f64));
            set_kv(&o, "max", &JsValue::from_f64(cap.max as f64));
            rows.push(&o.into());
        }
        rows.into()
    }

    // Typed arrays for rendering
    pub fn person_data(&self) -> JsValue {
        let g = self.inner.graph();
        let mut ids = Vec::with_capacity(g.person_count());
        let mut generations = Vec::with_capacity(g.person_count());
        let mut slots = Vec::with_capacity(g.person_count());
        let mut positions = Vec::with_capacity(g.person_count() * 2);
        let mut hidden = Vec::with_capacity(g.person_count());
        for p in g.persons() {
            ids.push(p.id.0);
            generations.push(p.generation.value());
            slots.push(p.grid_slot);
            positions.push(p.position.x);
            positions.push(p.position.y);
            hidden.push(self.inner.collapsed().is_hidden(p.id) as u8);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "generations", &arr_i8(&generations).into());
        set_kv(&obj, "slots", &arr_u32(&slots).into());
        set_kv(&obj, "positions", &arr_f32(&positions).into());
        set_kv(&obj, "hidden", &arr_u8(&hidden).into());
        obj.into()
    }
    pub fn relationship_data(&self) -> JsValue {
        let g = self.inner.graph();
        let dimmed = self.inner.collapsed().dimmed_relationships(g);
        let mut ids = Vec::with_capacity(g.relationship_count());
        let mut endpoints = Vec::with_capacity(g.relationship_count() * 2);
        let mut kinds = Vec::with_capacity(g.relationship_count());
        let mut dim = Vec::with_capacity(g.relationship_count());
        for r in g.relationships() {
            ids.push(r.id.0);
            endpoints.push(r.from.0);
            endpoints.push(r.to.0);
            kinds.push(kind_code(r.kind));
            dim.push(dimmed.contains(&r.id) as u8);
        }
        let obj = new_obj();
        set_kv(&obj, "ids", &arr_u32(&ids).into());
        set_kv(&obj, "endpoints", &arr_u32(&endpoints).into());
        set_kv(&obj, "kinds", &arr_u8(&kinds).into());
        set_kv(&obj, "dimmed", &arr_u8(&dim).into());
        obj.into()
    }

    // Edits
    pub fn add_person_res(&mut self, person: JsValue) -> JsValue {
        let new: NewPerson = match serde_wasm_bindgen::from_value(person) {
            Ok(n) => n,
            Err(e) => return error::bad_input("person", e),
        };
        let r = self.inner.add_person(new);
        self.finish(r, |id| JsValue::from_f64(id.0 as f64))
    }
    pub fn add_relative_res(&mut self, anchor: u32, kind: &str, profile: JsValue) -> JsValue {
        let Some(kind) = RelativeKind::parse(kind) else {
            return error::invalid_arg("kind", kind, "parent, child, spouse, sibling");
        };
        let profile: Profile = match serde_wasm_bindgen::from_value(profile) {
            Ok(p) => p,
            Err(e) => return error::bad_input("profile", e),
        };
        let r = self.inner.add_relative(PersonId(anchor), kind, profile);
        self.finish(r, |id| JsValue::from_f64(id.0 as f64))
    }
    pub fn update_profile_res(&mut self, id: u32, profile: JsValue) -> JsValue {
        let profile: Profile = match serde_wasm_bindgen::from_value(profile) {
            Ok(p) => p,
            Err(e) => return error::bad_input("profile", e),
        };
        let r = self.inner.update_profile(PersonId(id), profile);
        self.finish(r, |_| JsValue::TRUE)
    }
    /// `direction` is "left" or "right". The value describes the plan that
    /// was applied, including every slot change.
    pub fn move_person_res(&mut self, id: u32, direction: &str) -> JsValue {
        let Some(dir) = Direction::parse(direction) else {
            return error::invalid_arg("direction", direction, "left, right");
        };
        let r = self.inner.move_person(PersonId(id), dir);
        self.finish(r, |plan| to_js(&plan))
    }
    pub fn delete_person_res(&mut self, id: u32) -> JsValue {
        let r = self.inner.delete_person(PersonId(id));
        self.finish(r, |_| JsValue::TRUE)
    }
    /// `kind` is "spouse", "parent-child" or "sibling".
    pub fn create_relationship_res(&mut self, from: u32, to: u32, kind: &str) -> JsValue {
        let Some(kind) = RelationshipKind::parse(kind) else {
            return error::invalid_arg("kind", kind, "spouse, parent-child, sibling");
        };
        let r = self
            .inner
            .create_relationship(PersonId(from), PersonId(to), kind);
        self.finish(r, |id| JsValue::from_f64(id.0 as f64))
    }
    pub fn delete_relationship_res(&mut self, id: u32) -> JsValue {
        let r = self.inner.delete_relationship(RelationshipId(id));
        self.finish(r, |_| JsValue::TRUE)
    }
    /// Dry run of the relationship rules; the value lists every issue found.
    pub fn validate_res(&self, from: u32, to: u32, kind: &str) -> JsValue {
        let Some(kind) = RelationshipKind::parse(kind) else {
            return error::invalid_arg("kind", kind, "spouse, parent-child, sibling");
        };
        let v = self.inner.validate(PersonId(from), PersonId(to), kind);
        let o = new_obj();
        set_kv(&o, "valid", &JsValue::from_bool(v.is_ok()));
        set_kv(&o, "issues", &to_js(&v.issues));
        error::ok(o.into())
    }
    pub fn next_free_slot_res(&self, generation: i32, preferred: Option<u32>) -> JsValue {
        match parse_generation(generation) {
            Ok(g) => error::ok(JsValue::from_f64(self.inner.next_free_slot(g, preferred) as f64)),
            Err(e) => e,
        }
    }

    // History
    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }
    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }
    pub fn undo_label(&self) -> Option<String> {
        self.inner.history().peek_undo().map(|a| a.label().to_string())
    }
    pub fn redo_label(&self) -> Option<String> {
        self.inner.history().peek_redo().map(|a| a.label().to_string())
    }
    pub fn undo_res(&mut self) -> JsValue {
        let r = self.inner.undo();
        self.finish(r, JsValue::from_bool)
    }
    pub fn redo_res(&mut self) -> JsValue {
        let r = self.inner.redo();
        self.finish(r, JsValue::from_bool)
    }

    // Collapse
    pub fn collapse_res(&mut self, id: u32) -> JsValue {
        match self.inner.collapse(PersonId(id)) {
            Ok(hidden) => {
                let ids: Vec<u32> = hidden.iter().map(|p| p.0).collect();
                error::ok(arr_u32(&ids).into())
            }
            Err(e) => error::edit(&e),
        }
    }
    pub fn expand(&mut self, id: u32) -> bool {
        self.inner.expand(PersonId(id))
    }
    pub fn is_collapsed(&self, id: u32) -> bool {
        self.inner.collapsed().is_collapsed(PersonId(id))
    }
    pub fn hidden_ids(&self) -> Vec<u32> {
        self.inner.hidden().into_iter().map(|p| p.0).collect()
    }

    // Documents
    pub fn to_json(&self) -> JsValue {
        to_js(&self.inner.to_json())
    }
    pub fn from_json_res(&mut self, v: JsValue) -> JsValue {
        match serde_wasm_bindgen::from_value::<serde_json::Value>(v) {
            Ok(val) => match self.inner.load_document(val) {
                Ok(()) => error::ok(JsValue::TRUE),
                Err(e) => error::load(&e),
            },
            Err(e) => error::err("json_parse", format!("{}", e), None),
        }
    }
}

impl FamilyTree {
    fn drain_save_warnings(&mut self) {
        for w in self.inner.take_save_warnings() {
            let msg = w.to_string();
            web_sys::console::warn_1(&JsValue::from_str(&msg));
            self.save_warnings.push(msg);
        }
    }

    /// Wrap an edit result and surface failed saves on the console.
    fn finish<T>(&mut self, r: Result<T, EditError>, value: impl FnOnce(T) -> JsValue) -> JsValue {
        self.drain_save_warnings();
        match r {
            Ok(v) => error::ok(value(v)),
            Err(e) => error::edit(&e),
        }
    }
}
