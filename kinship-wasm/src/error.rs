use crate::interop::{new_obj, set_kv, to_js};
use js_sys::Object;
use kinship::{EditError, Entity, LoadError, OpenError};
use wasm_bindgen::prelude::*;

pub fn ok(v: JsValue) -> JsValue {
    let o = new_obj();
    set_kv(&o, "ok", &JsValue::from_bool(true));
    set_kv(&o, "value", &v);
    o.into()
}

pub fn err(code: &'static str, message: impl Into<String>, data: Option<JsValue>) -> JsValue {
    let root = new_obj();
    set_kv(&root, "ok", &JsValue::from_bool(false));
    let e = new_obj();
    set_kv(&e, "code", &JsValue::from_str(code));
    set_kv(&e, "message", &JsValue::from_str(&message.into()));
    if let Some(d) = data { set_kv(&e, "data", &d); }
    set_kv(&root, "error", &e.into());
    root.into()
}

fn num(o: &Object, k: &str, v: f64) { set_kv(o, k, &JsValue::from_f64(v)); }

/// Engine rejections keep their stable code; `data` carries what a UI
/// needs to explain the rejection.
pub fn edit(e: &EditError) -> JsValue {
    let d = new_obj();
    match e {
        EditError::Validation(v) => set_kv(&d, "issues", &to_js(&v.issues)),
        EditError::PlacementExhausted { generation, .. } => {
            num(&d, "generation", generation.value() as f64)
        }
        EditError::CapacityReached { generation, max } => {
            num(&d, "generation", generation.value() as f64);
            num(&d, "max", *max as f64);
        }
        EditError::TreeFull { ceiling } => num(&d, "ceiling", *ceiling as f64),
        EditError::NotFound(Entity::Person(id)) => {
            set_kv(&d, "kind", &JsValue::from_str("person"));
            num(&d, "id", id.0 as f64);
        }
        EditError::NotFound(Entity::Relationship(id)) => {
            set_kv(&d, "kind", &JsValue::from_str("relationship"));
            num(&d, "id", id.0 as f64);
        }
        EditError::RootProtected | EditError::InvalidInput(_) => {
            return err(e.code(), e.to_string(), None);
        }
    }
    err(e.code(), e.to_string(), Some(d.into()))
}

pub fn load(e: &LoadError) -> JsValue { err(e.code, e.message.clone(), None) }

pub fn open(e: &OpenError) -> JsValue { err(e.code(), e.to_string(), None) }

#[inline]
pub fn invalid_arg(param: &str, got: &str, expected: &str) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    set_kv(&d, "got", &JsValue::from_str(got));
    err(
        "invalid_argument",
        format!("parameter '{}' must be one of {}", param, expected),
        Some(d.into()),
    )
}

#[inline]
pub fn out_of_range(param: &str, min: i32, max: i32, got: i32) -> JsValue {
    let d = new_obj();
    set_kv(&d, "param", &JsValue::from_str(param));
    num(&d, "min", min as f64);
    num(&d, "max", max as f64);
    num(&d, "got", got as f64);
    err("out_of_range", format!("parameter '{}' out of range", param), Some(d.into()))
}

#[inline]
pub fn bad_input(param: &str, e: impl std::fmt::Display) -> JsValue {
    let d = new_obj(); set_kv(&d, "param", &JsValue::from_str(param));
    err("invalid_input", format!("parameter '{}': {}", param, e), Some(d.into()))
}
