//! Audit stamps embedded in every content entity / 审计字段

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Who and when an entity was created and last modified.
///
/// Stores call [`Audit::created`] on insert and [`Audit::touch`] on update;
/// request payloads never carry these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl Audit {
    pub fn created(actor: Option<&str>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            created_at: now.clone(),
            updated_at: now,
            created_by: actor.map(str::to_string),
            updated_by: actor.map(str::to_string),
        }
    }

    pub fn touch(&mut self, actor: Option<&str>) {
        self.updated_at = Utc::now().to_rfc3339();
        self.updated_by = actor.map(str::to_string);
    }
}
