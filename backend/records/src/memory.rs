use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    store::{Collection, DocumentStore},
};

/// In-process store with the same swap semantics as Redis.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, HashMap<String, String>>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<String>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn insert(
        &self,
        collection: Collection,
        id: &str,
        json: &str,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection).or_default();

        if documents.contains_key(id) {
            return Ok(false);
        }

        documents.insert(id.to_string(), json.to_string());
        Ok(true)
    }

    async fn swap(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
        json: &str,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;

        match collections
            .get_mut(&collection)
            .and_then(|documents| documents.get_mut(id))
        {
            Some(current) if current == expected => {
                *current = json.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        Ok(self
            .collections
            .write()
            .await
            .get_mut(&collection)
            .and_then(|documents| documents.remove(id))
            .is_some())
    }

    async fn remove_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
    ) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(&collection) else {
            return Ok(false);
        };

        if documents.get(id).map(String::as_str) != Some(expected) {
            return Ok(false);
        }

        documents.remove(id);
        Ok(true)
    }
}
