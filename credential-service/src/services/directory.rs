//! Read-only view over the guardian and dependent collections.

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId},
    Collection,
};
use serde::Deserialize;
use std::{collections::HashMap, sync::RwLock};

use crate::models::{Dependent, Guardian};
use crate::services::MongoDb;

pub const GUARDIANS_COLLECTION: &str = "guardians";
pub const DEPENDENTS_COLLECTION: &str = "dependents";

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_guardian(&self, guardian_id: &str) -> Result<Option<Guardian>, anyhow::Error>;

    async fn find_dependent(&self, dependent_id: &str)
        -> Result<Option<Dependent>, anyhow::Error>;
}

#[derive(Debug, Deserialize)]
struct GuardianDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    dependents: Vec<ObjectId>,
}

#[derive(Debug, Deserialize)]
struct DependentDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    name: String,
    guardian: ObjectId,
}

impl From<GuardianDocument> for Guardian {
    fn from(document: GuardianDocument) -> Self {
        Guardian::new(
            document.id.to_hex(),
            document.dependents.into_iter().map(|oid| oid.to_hex()),
        )
    }
}

impl From<DependentDocument> for Dependent {
    fn from(document: DependentDocument) -> Self {
        Dependent::new(
            document.id.to_hex(),
            document.name,
            document.guardian.to_hex(),
        )
    }
}

/// Account directory over the account service's MongoDB collections.
#[derive(Clone)]
pub struct MongoAccountDirectory {
    guardians: Collection<GuardianDocument>,
    dependents: Collection<DependentDocument>,
}

impl MongoAccountDirectory {
    pub fn new(db: &MongoDb) -> Self {
        Self {
            guardians: db.database().collection(GUARDIANS_COLLECTION),
            dependents: db.database().collection(DEPENDENTS_COLLECTION),
        }
    }
}

#[async_trait]
impl AccountDirectory for MongoAccountDirectory {
    async fn find_guardian(&self, guardian_id: &str) -> Result<Option<Guardian>, anyhow::Error> {
        // Anything that isn't an ObjectId can't name a stored account
        let Ok(oid) = ObjectId::parse_str(guardian_id) else {
            return Ok(None);
        };

        let guardian = self.guardians.find_one(doc! { "_id": oid }, None).await?;
        Ok(guardian.map(Guardian::from))
    }

    async fn find_dependent(
        &self,
        dependent_id: &str,
    ) -> Result<Option<Dependent>, anyhow::Error> {
        let Ok(oid) = ObjectId::parse_str(dependent_id) else {
            return Ok(None);
        };

        let dependent = self.dependents.find_one(doc! { "_id": oid }, None).await?;
        Ok(dependent.map(Dependent::from))
    }
}

/// In-memory directory for tests.
#[derive(Default)]
pub struct MockAccountDirectory {
    guardians: RwLock<HashMap<String, Guardian>>,
    dependents: RwLock<HashMap<String, Dependent>>,
}

impl MockAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_guardian(&self, guardian: Guardian) {
        if let Ok(mut guardians) = self.guardians.write() {
            guardians.insert(guardian.id.clone(), guardian);
        }
    }

    pub fn insert_dependent(&self, dependent: Dependent) {
        if let Ok(mut dependents) = self.dependents.write() {
            dependents.insert(dependent.id.clone(), dependent);
        }
    }

    /// Simulates the account service deleting a dependent.
    pub fn remove_dependent(&self, dependent_id: &str) {
        if let Ok(mut dependents) = self.dependents.write() {
            dependents.remove(dependent_id);
        }
    }
}

#[async_trait]
impl AccountDirectory for MockAccountDirectory {
    async fn find_guardian(&self, guardian_id: &str) -> Result<Option<Guardian>, anyhow::Error> {
        let guardians = self
            .guardians
            .read()
            .map_err(|e| anyhow::anyhow!("Mock directory lock poisoned: {}", e))?;
        Ok(guardians.get(guardian_id).cloned())
    }

    async fn find_dependent(
        &self,
        dependent_id: &str,
    ) -> Result<Option<Dependent>, anyhow::Error> {
        let dependents = self
            .dependents
            .read()
            .map_err(|e| anyhow::anyhow!("Mock directory lock poisoned: {}", e))?;
        Ok(dependents.get(dependent_id).cloned())
    }
}
