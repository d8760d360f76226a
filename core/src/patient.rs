//! Patients referenced by tasks. The core keeps them for lookup only.

use crate::types::PatientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id:        PatientId,
    pub name:      String,
    #[serde(default)]
    pub room:      Option<String>,
    #[serde(default)]
    pub age:       Option<u32>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    /// Free-form readings keyed by label ("hr", "bp", "o2", ...).
    #[serde(default)]
    pub vitals:    BTreeMap<String, String>,
}

impl Patient {
    pub fn new(id: impl Into<PatientId>, name: impl Into<String>) -> Self {
        Self {
            id:        id.into(),
            name:      name.into(),
            room:      None,
            age:       None,
            diagnosis: None,
            vitals:    BTreeMap::new(),
        }
    }
}
