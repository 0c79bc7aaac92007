use wasm_bindgen::prelude::*;
mod api;
mod error;
mod interop;
mod store;

#[wasm_bindgen]
pub struct FamilyTree {
    pub(crate) inner: kinship::FamilyTree,
    pub(crate) save_warnings: Vec<String>,
}

impl FamilyTree {
    pub fn rs_open(
        family_id: &str,
        owner: &kinship::OwnerIdentity,
        config: kinship::EngineConfig,
    ) -> Result<FamilyTree, kinship::OpenError> {
        Ok(FamilyTree {
            inner: kinship::FamilyTree::new(family_id, owner, config)?,
            save_warnings: Vec::new(),
        })
    }
    pub fn rs_version(&self) -> u64 {
        self.inner.version()
    }
}
