//! # Document Store
//!
//! Every record in the portal is a JSON document addressed by collection and id.
//!
//! ## Access Pattern
//! - Look up a document by id, mutate it, write it back
//! - Writes go through [`Documents::update`], which reads the current JSON, applies the
//!   mutation, and swaps the new JSON in only if the stored JSON is still the one it read
//! - A lost race retries with a fresh read, up to [`MAX_UPDATE_ATTEMPTS`] times
//!
//! ## Backends
//! - [`crate::database::RedisStore`]: one Redis hash per collection, swaps run as a Lua script
//! - [`crate::memory::MemoryStore`]: in-process maps for tests and the `memory` store URL
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::{RecordError, RecordResult, StoreError};

pub const MAX_UPDATE_ATTEMPTS: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Organizations,
    Hackathons,
    Teams,
    Sessions,
    Credentials,
}

impl Collection {
    pub fn key(self) -> &'static str {
        match self {
            Collection::Users => "portal:users",
            Collection::Organizations => "portal:organizations",
            Collection::Hackathons => "portal:hackathons",
            Collection::Teams => "portal:teams",
            Collection::Sessions => "portal:sessions",
            Collection::Credentials => "portal:credentials",
        }
    }
}

pub trait Document: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;
    const KIND: &'static str;

    fn id(&self) -> &str;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, collection: Collection, id: &str) -> Result<Option<String>, StoreError>;

    async fn fetch_all(&self, collection: Collection) -> Result<Vec<String>, StoreError>;

    /// Returns `false` without writing when the id is already taken.
    async fn insert(&self, collection: Collection, id: &str, json: &str)
    -> Result<bool, StoreError>;

    /// Replaces the document only if its stored JSON still equals `expected`.
    async fn swap(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
        json: &str,
    ) -> Result<bool, StoreError>;

    async fn remove(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;

    /// Removes the document only if its stored JSON still equals `expected`.
    async fn remove_if(
        &self,
        collection: Collection,
        id: &str,
        expected: &str,
    ) -> Result<bool, StoreError>;
}

#[derive(Clone)]
pub struct Documents {
    store: Arc<dyn DocumentStore>,
}

impl Documents {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get<T: Document>(&self, id: &str) -> RecordResult<Option<T>> {
        match self.store.fetch(T::COLLECTION, id).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub async fn require<T: Document>(&self, id: &str) -> RecordResult<T> {
        self.get(id)
            .await?
            .ok_or_else(|| RecordError::NotFound(format!("{} {id}", T::KIND)))
    }

    pub async fn all<T: Document>(&self) -> RecordResult<Vec<T>> {
        let mut documents = Vec::new();

        for json in self.store.fetch_all(T::COLLECTION).await? {
            match serde_json::from_str(&json) {
                Ok(document) => documents.push(document),
                Err(e) => warn!("Skipping malformed {} document: {e}", T::KIND),
            }
        }

        Ok(documents)
    }

    pub async fn create<T: Document>(&self, document: &T) -> RecordResult<()> {
        let json = serde_json::to_string(document)?;

        if !self
            .store
            .insert(T::COLLECTION, document.id(), &json)
            .await?
        {
            return Err(RecordError::Conflict(format!(
                "{} {} already exists",
                T::KIND,
                document.id()
            )));
        }

        Ok(())
    }

    pub async fn delete<T: Document>(&self, id: &str) -> RecordResult<bool> {
        Ok(self.store.remove(T::COLLECTION, id).await?)
    }

    /// Applies `apply` to the stored document and writes it back atomically.
    ///
    /// `apply` may run more than once when another writer wins the race, so it must only
    /// touch the document it is given. Returning an error aborts without writing.
    pub async fn update<T, R, F>(&self, id: &str, mut apply: F) -> RecordResult<(T, R)>
    where
        T: Document,
        R: Send,
        F: FnMut(&mut T) -> RecordResult<R> + Send,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current = self
                .store
                .fetch(T::COLLECTION, id)
                .await?
                .ok_or_else(|| RecordError::NotFound(format!("{} {id}", T::KIND)))?;

            let mut document: T = serde_json::from_str(&current)?;
            let outcome = apply(&mut document)?;
            let json = serde_json::to_string(&document)?;

            if json == current {
                return Ok((document, outcome));
            }

            if self.store.swap(T::COLLECTION, id, &current, &json).await? {
                return Ok((document, outcome));
            }
        }

        warn!("Gave up updating {} {id} after {MAX_UPDATE_ATTEMPTS} attempts", T::KIND);
        Err(StoreError::Contention(format!("{} {id}", T::KIND)).into())
    }

    /// Deletes the document if `condition` holds for its current contents.
    pub async fn delete_when<T, F>(&self, id: &str, condition: F) -> RecordResult<bool>
    where
        T: Document,
        F: Fn(&T) -> bool + Send,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let Some(current) = self.store.fetch(T::COLLECTION, id).await? else {
                return Ok(false);
            };

            let document: T = serde_json::from_str(&current)?;
            if !condition(&document) {
                return Ok(false);
            }

            if self.store.remove_if(T::COLLECTION, id, &current).await? {
                return Ok(true);
            }
        }

        Err(StoreError::Contention(format!("{} {id}", T::KIND)).into())
    }
}
