//! Guardian and dependent accounts as seen by this service.
//!
//! Both are owned by the account service; we only read them to resolve
//! identifiers and check ownership.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Guardian {
    pub id: String,
    pub dependent_ids: HashSet<String>,
}

impl Guardian {
    pub fn new<I, S>(id: impl Into<String>, dependent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            dependent_ids: dependent_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn manages(&self, dependent_id: &str) -> bool {
        self.dependent_ids.contains(dependent_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dependent {
    pub id: String,
    pub display_name: String,
    pub guardian_id: String,
}

impl Dependent {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        guardian_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            guardian_id: guardian_id.into(),
        }
    }
}
