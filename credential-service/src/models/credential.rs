use chrono::{DateTime, Utc};
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permanent, reusable login secret bound to one dependent.
///
/// Records are created on issuance, read on every exchange, and removed only
/// by bulk revocation for the dependent. Nothing ever updates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessCredential {
    #[serde(rename = "_id")]
    pub id: String,
    pub secret: String,
    pub dependent_id: String,
    pub guardian_id: String,
    pub issued_at: BsonDateTime,
}

impl AccessCredential {
    pub fn new(secret: String, dependent_id: &str, guardian_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            secret,
            dependent_id: dependent_id.to_string(),
            guardian_id: guardian_id.to_string(),
            issued_at: BsonDateTime::now(),
        }
    }

    pub fn issued_at_utc(&self) -> DateTime<Utc> {
        self.issued_at.to_chrono()
    }

    /// Short, non-secret prefix guardians can use to tell credentials apart.
    pub fn secret_hint(&self) -> String {
        self.secret.chars().take(8).collect()
    }
}
