use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::{Base, DBColumnFamily, MemEngine, StorageError};

impl MemEngine {
    pub fn new() -> Result<MemEngine, StorageError> {
        let db = HashMap::new();
        Ok(MemEngine {
            _db: Mutex::new(db),
        })
    }
}

impl Base for MemEngine {
    // TODO lock().unwrap() need to deal with poisoning
    // https://doc.rust-lang.org/std/sync/struct.Mutex.html#poisoning

    fn set(&self, cf: DBColumnFamily, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut cfs = self._db.lock().unwrap();
        let bt = cfs.entry(cf.into()).or_insert(BTreeMap::new());
        bt.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn get(&self, cf: DBColumnFamily, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let mut cfs = self._db.lock().unwrap();
        let bt = cfs.entry(cf.into()).or_insert(BTreeMap::new());
        Ok(bt.get(key).map(|x| x.clone()))
    }

    fn delete(&self, cf: DBColumnFamily, key: &[u8]) -> Result<(), StorageError> {
        let mut cfs = self._db.lock().unwrap();
        let bt = cfs.entry(cf.into()).or_insert(BTreeMap::new());
        bt.remove(key);
        Ok(())
    }
}
