use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::DatabaseError;
use crate::storage::Database;

/// String key-value storage the recorder persists into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.kv_get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        Ok(self.kv_set(key, value)?)
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Rc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        (**self).set(key, value)
    }
}

/// Process-local store, lost on drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
