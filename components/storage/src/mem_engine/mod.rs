use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

mod memdb;

/// MemEngine is an in-memory storage engine, mainly for testing and for
/// deployments where the physical store is managed elsewhere.
pub struct MemEngine {
    pub(crate) _db: Mutex<HashMap<&'static str, BTreeMap<Vec<u8>, Vec<u8>>>>,
}
