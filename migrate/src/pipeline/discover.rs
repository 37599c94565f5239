//! Field Discoverer
//!
//! Finds manual fields matching the Studio naming convention and attaches each
//! owning model's display name, fetched in one batched lookup, and the module
//! that defines the model, fetched in another.

use std::collections::HashMap;

use itertools::Itertools;
use serde_json::json;
use tracing::{debug, info};

use super::model::FieldDescriptor;
use crate::config::MigrationSettings;
use crate::error::Result;
use crate::remote::constants::{MODEL_DATA, MODEL_FIELDS, MODEL_MODELS};
use crate::remote::{Domain, Operator, RecordAccess, RecordId, RemoteApi};

/// Which registry entries count as Studio fields
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    pub prefix:    String,
    pub deny_list: Vec<String>,
}

impl FieldPredicate {
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            prefix:    settings.field_prefix.clone(),
            deny_list: settings.deny_list.clone(),
        }
    }

    /// Manual fields whose name starts with the prefix and is not deny-listed
    pub fn domain(&self) -> Domain {
        let domain = Domain::all()
            .with("state", Operator::Eq, "manual")
            .with("name", Operator::EqLike, format!("{}%", self.prefix));
        if self.deny_list.is_empty() {
            domain
        } else {
            domain.with("name", Operator::NotIn, json!(self.deny_list))
        }
    }
}

/// Run discovery; no matches is an empty result, not an error
pub fn discover_fields(
    remote: &dyn RemoteApi,
    predicate: &FieldPredicate,
) -> Result<Vec<FieldDescriptor>> {
    let records = remote.search_read(
        MODEL_FIELDS,
        &predicate.domain(),
        FieldDescriptor::REGISTRY_FIELDS,
        None,
    )?;

    let mut fields = records
        .iter()
        .map(FieldDescriptor::from_record)
        .collect::<Result<Vec<_>>>()?;

    if fields.is_empty() {
        info!("No fields matched prefix '{}'", predicate.prefix);
        return Ok(fields);
    }

    fields.sort_by(|a, b| (&a.model, &a.name).cmp(&(&b.model, &b.name)));

    let models: Vec<String> = fields.iter().map(|f| f.model.clone()).unique().collect();
    let registered = registered_models(remote, &models)?;
    let ids: Vec<RecordId> = registered.values().map(|model| model.id).sorted().collect();
    let modules = defining_modules(remote, &ids)?;
    for field in &mut fields {
        if let Some(model) = registered.get(&field.model) {
            field.model_display_name.clone_from(&model.display_name);
            field.owning_module = modules.get(&model.id).cloned();
        }
    }

    info!(
        "Discovered {} fields across {} models",
        fields.len(),
        models.len()
    );
    Ok(fields)
}

struct RegisteredModel {
    id:           RecordId,
    display_name: String,
}

fn registered_models(
    remote: &dyn RemoteApi,
    models: &[String],
) -> Result<HashMap<String, RegisteredModel>> {
    let records = remote.search_read(
        MODEL_MODELS,
        &Domain::all().with("model", Operator::In, json!(models)),
        &["model", "name"],
        None,
    )?;
    debug!("Resolved {} model display names", records.len());
    Ok(records
        .iter()
        .filter_map(|record| {
            Some((record.text("model")?.to_string(), RegisteredModel {
                id:           record.integer("id")?,
                display_name: record.text("name")?.to_string(),
            }))
        })
        .collect())
}

/// Whether a module name can appear in a manifest's `depends`
fn is_dependable(module: &str) -> bool {
    !module.starts_with("__") && module != "studio_customization"
}

/// Module that first registered each model, keyed by `ir.model` id
///
/// Every module extending a model also gets an external id for it, so the
/// oldest one belongs to the defining module.
fn defining_modules(
    remote: &dyn RemoteApi,
    model_ids: &[RecordId],
) -> Result<HashMap<RecordId, String>> {
    if model_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let records = remote.search_read(
        MODEL_DATA,
        &Domain::all()
            .with("model", Operator::Eq, MODEL_MODELS)
            .with("res_id", Operator::In, json!(model_ids)),
        &["module", "res_id"],
        None,
    )?;

    let mut modules = HashMap::new();
    for (_, res_id, module) in records
        .iter()
        .filter_map(|record| {
            Some((
                record.integer("id")?,
                record.integer("res_id")?,
                record.text("module")?,
            ))
        })
        .filter(|(_, _, module)| is_dependable(module))
        .sorted_by_key(|(id, _, _)| *id)
    {
        modules.entry(res_id).or_insert_with(|| module.to_string());
    }
    debug!("Resolved defining modules for {} models", modules.len());
    Ok(modules)
}
