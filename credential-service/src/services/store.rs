use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Collection, IndexModel,
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use crate::models::AccessCredential;
use crate::services::MongoDb;

pub const CREDENTIALS_COLLECTION: &str = "access_credentials";

/// Persistence for access credentials.
///
/// Implementations rely on the backing store's per-document atomicity; no
/// operation spans more than one document write except `delete_by_dependent`,
/// which is a single bulk delete.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new record. Never upserts.
    async fn create(&self, credential: &AccessCredential) -> Result<(), anyhow::Error>;

    /// Byte-exact lookup by secret.
    async fn find_by_secret(&self, secret: &str)
        -> Result<Option<AccessCredential>, anyhow::Error>;

    /// All credentials of a dependent, newest first.
    async fn list_by_dependent(
        &self,
        dependent_id: &str,
    ) -> Result<Vec<AccessCredential>, anyhow::Error>;

    /// Remove every credential of a dependent; returns how many were removed.
    async fn delete_by_dependent(&self, dependent_id: &str) -> Result<u64, anyhow::Error>;

    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct MongoCredentialStore {
    db: MongoDb,
    collection: Collection<AccessCredential>,
}

impl MongoCredentialStore {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            db: db.clone(),
            collection: db.database().collection(CREDENTIALS_COLLECTION),
        }
    }

    pub async fn init_indexes(&self) -> Result<(), anyhow::Error> {
        let secret_index = IndexModel::builder()
            .keys(doc! { "secret": 1 })
            .options(
                IndexOptions::builder()
                    .name("secret_unique_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        // Bulk revocation and listing filter on dependent_id
        let dependent_index = IndexModel::builder()
            .keys(doc! { "dependent_id": 1, "issued_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("dependent_issued_idx".to_string())
                    .build(),
            )
            .build();

        self.collection
            .create_indexes([secret_index, dependent_index], None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create credential indexes: {}", e);
                anyhow::anyhow!("Failed to create credential indexes: {}", e)
            })?;

        tracing::info!("Credential store indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn create(&self, credential: &AccessCredential) -> Result<(), anyhow::Error> {
        self.collection.insert_one(credential, None).await?;
        Ok(())
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<AccessCredential>, anyhow::Error> {
        let credential = self
            .collection
            .find_one(doc! { "secret": secret }, None)
            .await?;
        Ok(credential)
    }

    async fn list_by_dependent(
        &self,
        dependent_id: &str,
    ) -> Result<Vec<AccessCredential>, anyhow::Error> {
        let options = FindOptions::builder()
            .sort(doc! { "issued_at": -1 })
            .build();

        let cursor = self
            .collection
            .find(doc! { "dependent_id": dependent_id }, options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn delete_by_dependent(&self, dependent_id: &str) -> Result<u64, anyhow::Error> {
        let result = self
            .collection
            .delete_many(doc! { "dependent_id": dependent_id }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.db.health_check().await
    }
}

/// In-memory store for tests. Mirrors the unique index on `secret`.
#[derive(Default)]
pub struct MockCredentialStore {
    pub credentials: Mutex<Vec<AccessCredential>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl MockCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_secret` calls served so far.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.credentials.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), anyhow::Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Mock credential store unavailable"));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<AccessCredential>>, anyhow::Error> {
        self.credentials
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock credential store mutex poisoned: {}", e))
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn create(&self, credential: &AccessCredential) -> Result<(), anyhow::Error> {
        self.check_available()?;
        let mut credentials = self.lock()?;
        if credentials.iter().any(|c| c.secret == credential.secret) {
            return Err(anyhow::anyhow!("E11000 duplicate key error: secret"));
        }
        credentials.push(credential.clone());
        Ok(())
    }

    async fn find_by_secret(
        &self,
        secret: &str,
    ) -> Result<Option<AccessCredential>, anyhow::Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.lock()?.iter().find(|c| c.secret == secret).cloned())
    }

    async fn list_by_dependent(
        &self,
        dependent_id: &str,
    ) -> Result<Vec<AccessCredential>, anyhow::Error> {
        self.check_available()?;
        let mut matching: Vec<AccessCredential> = self
            .lock()?
            .iter()
            .filter(|c| c.dependent_id == dependent_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(matching)
    }

    async fn delete_by_dependent(&self, dependent_id: &str) -> Result<u64, anyhow::Error> {
        self.check_available()?;
        let mut credentials = self.lock()?;
        let before = credentials.len();
        credentials.retain(|c| c.dependent_id != dependent_id);
        Ok((before - credentials.len()) as u64)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.check_available()
    }
}
