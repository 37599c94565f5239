use chrono::{DateTime, Utc};
use error_stack::Report;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pipeline::model::FieldDescriptor;
use crate::remote::constants::MODEL_FIELDS;
use crate::remote::{Record, RecordAccess, RecordId, RemoteApi};

/// Registry columns captured for manual recovery
const METADATA_FIELDS: &[&str] = &[
    "name",
    "model",
    "model_id",
    "ttype",
    "state",
    "field_description",
    "relation",
    "relation_field",
    "relation_table",
    "selection",
    "required",
    "readonly",
    "translate",
    "store",
    "index",
    "copied",
    "help",
    "domain",
    "on_delete",
    "size",
];

/// Full registry metadata of one field, as it was before deletion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackedUpField {
    pub descriptor: FieldDescriptor,
    pub metadata:   Record,
}

/// Point-in-time copy of every field a cleanup run may delete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub run_id:      Uuid,
    pub captured_at: DateTime<Utc>,
    pub fields:      Vec<BackedUpField>,
}

impl BackupRecord {
    /// Read full metadata for every candidate; any candidate missing from the
    /// result fails the whole capture
    pub fn capture(
        remote: &dyn RemoteApi,
        run_id: Uuid,
        candidates: &[FieldDescriptor],
    ) -> Result<Self> {
        let ids: Vec<RecordId> = candidates.iter().map(|field| field.id).collect();
        let records = if ids.is_empty() {
            Vec::new()
        } else {
            remote.read(MODEL_FIELDS, &ids, METADATA_FIELDS)?
        };

        let mut fields = Vec::with_capacity(candidates.len());
        for descriptor in candidates {
            let metadata = records
                .iter()
                .find(|record| record.integer("id") == Some(descriptor.id))
                .ok_or_else(|| {
                    Report::new(Error::InvalidState(format!(
                        "metadata for {} (id {}) could not be read",
                        descriptor.qualified_name(),
                        descriptor.id
                    )))
                })?;
            fields.push(BackedUpField {
                descriptor: descriptor.clone(),
                metadata:   metadata.clone(),
            });
        }

        info!("Captured metadata for {} fields in run {run_id}", fields.len());
        Ok(Self {
            run_id,
            captured_at: Utc::now(),
            fields,
        })
    }

    /// Whether this backup holds `field_id` for `run_id`
    pub fn covers(&self, run_id: Uuid, field_id: RecordId) -> bool {
        self.run_id == run_id && self.fields.iter().any(|f| f.descriptor.id == field_id)
    }
}
