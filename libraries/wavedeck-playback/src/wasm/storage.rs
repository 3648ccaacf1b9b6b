//! `localStorage` key-value store

use crate::error::{PlayerError, Result};
use crate::persistence::KeyValueStore;
use wasm_bindgen::JsValue;
use web_sys::Storage;

pub struct WebStorage {
    storage: Storage,
}

impl WebStorage {
    /// The window's `localStorage`, if the browser exposes one
    pub fn local() -> Result<Self> {
        let window = web_sys::window()
            .ok_or_else(|| PlayerError::Storage("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(storage_error)?
            .ok_or_else(|| PlayerError::Storage("localStorage unavailable".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for WebStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(storage_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(storage_error)
    }
}

fn storage_error(error: JsValue) -> PlayerError {
    PlayerError::Storage(format!("{:?}", error))
}
