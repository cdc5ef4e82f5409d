#![cfg(target_arch = "wasm32")]

use gloo_net::http::Request;

use crate::boundary::{BoundaryCollection, BoundaryError, BoundaryKey, BoundarySource};
use crate::config::DataConfig;
use crate::progress::{StorageBackend, StorageError};

/// Fetches boundary collections as static GeoJSON over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpBoundarySource {
    config: DataConfig,
}

impl HttpBoundarySource {
    pub fn new(config: DataConfig) -> Self {
        Self { config }
    }
}

impl BoundarySource for HttpBoundarySource {
    async fn fetch(&self, key: &BoundaryKey) -> Result<BoundaryCollection, BoundaryError> {
        let url = key.url(&self.config);

        let response = Request::get(&url)
            .send()
            .await
            .map_err(|error| BoundaryError::Network(error.to_string()))?;

        if !response.ok() {
            return Err(BoundaryError::Http {
                status: response.status(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|error| BoundaryError::Network(error.to_string()))?;

        BoundaryCollection::from_geojson_str(&text)
    }
}

/// Browser `localStorage` as a progress backend.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    pub fn open() -> Result<Self, StorageError> {
        let window =
            web_sys::window().ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|error| StorageError::Unavailable(format!("{error:?}")))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;

        Ok(Self { storage })
    }
}

impl StorageBackend for LocalStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage
            .set_item(key, value)
            .map_err(|error| StorageError::Write {
                key: key.to_string(),
                message: format!("{error:?}"),
            })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|error| StorageError::Write {
                key: key.to_string(),
                message: format!("{error:?}"),
            })
    }
}
