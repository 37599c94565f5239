//! Contact reclassification by reference code
//!
//! Partners whose reference starts with `V` are vendors and those starting with
//! `C` are customers. A partner already carrying the matching rank is left
//! alone. Nothing is written unless the operator asks for it and confirms.

use serde::Serialize;
use serde_json::Value;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::{info, warn};

use crate::confirmation::ConfirmationGate;
use crate::error::Result;
use crate::remote::{Domain, Operator, Record, RecordAccess, RecordId, RemoteApi};

const MODEL_PARTNER: &str = "res.partner";

/// Role implied by a reference prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactRole {
    Vendor,
    Customer,
}

impl ContactRole {
    const fn reference_pattern(self) -> &'static str {
        match self {
            Self::Vendor => "V%",
            Self::Customer => "C%",
        }
    }

    const fn rank_field(self) -> &'static str {
        match self {
            Self::Vendor => "supplier_rank",
            Self::Customer => "customer_rank",
        }
    }
}

/// One partner that needs its rank set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactChange {
    pub id:        RecordId,
    pub name:      String,
    pub reference: String,
    pub role:      ContactRole,
}

/// A write that failed, kept with the partner it was meant for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactFailure {
    pub change: ContactChange,
    pub error:  String,
}

/// Counts per role, plus failures when writes were attempted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub vendors_found:     usize,
    pub customers_found:   usize,
    pub vendors_updated:   usize,
    pub customers_updated: usize,
    pub errors:            Vec<ContactFailure>,
    /// False for a dry run or a declined confirmation; the `_updated` counts
    /// then say what would have changed
    pub applied:           bool,
}

impl ClassificationResult {
    const fn count_update(&mut self, role: ContactRole) {
        match role {
            ContactRole::Vendor => self.vendors_updated += 1,
            ContactRole::Customer => self.customers_updated += 1,
        }
    }
}

/// Partners found per role and the subset still missing their rank
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationPlan {
    pub vendors_found:   usize,
    pub customers_found: usize,
    pub pending:         Vec<ContactChange>,
}

impl ClassificationPlan {
    /// Query both roles; read-only
    pub fn gather(remote: &dyn RemoteApi) -> Result<Self> {
        let mut plan = Self::default();
        for role in ContactRole::iter() {
            let domain = Domain::all().with("ref", Operator::EqLike, role.reference_pattern());
            let contacts =
                remote.search_read(MODEL_PARTNER, &domain, &["name", "ref", role.rank_field()], None)?;
            match role {
                ContactRole::Vendor => plan.vendors_found = contacts.len(),
                ContactRole::Customer => plan.customers_found = contacts.len(),
            }
            info!("Found {} contacts with {role} reference pattern", contacts.len());

            plan.pending.extend(
                contacts
                    .iter()
                    .filter(|contact| contact.integer(role.rank_field()).unwrap_or(0) == 0)
                    .map(|contact| change_for(contact, role)),
            );
        }
        Ok(plan)
    }

    /// Counts as if every pending change went through
    pub fn preview(&self) -> ClassificationResult {
        let mut result = self.empty_result();
        for change in &self.pending {
            result.count_update(change.role);
        }
        result
    }

    /// Write each pending rank, recording failures and carrying on
    pub fn apply(
        &self,
        remote: &dyn RemoteApi,
        mut on_change: impl FnMut(&ContactChange, Option<&str>),
    ) -> ClassificationResult {
        let mut result = self.empty_result();
        result.applied = true;
        for change in &self.pending {
            let mut values = Record::new();
            values.insert(change.role.rank_field().to_string(), Value::from(1));
            let outcome = match remote.write(MODEL_PARTNER, change.id, &values) {
                Ok(true) => Ok(()),
                Ok(false) => Err("server rejected the update".to_string()),
                Err(error) => Err(error.current_context().to_string()),
            };
            match outcome {
                Ok(()) => {
                    result.count_update(change.role);
                    on_change(change, None);
                },
                Err(error) => {
                    warn!("Failed to classify {} ({}): {error}", change.name, change.reference);
                    on_change(change, Some(&error));
                    result.errors.push(ContactFailure {
                        change: change.clone(),
                        error,
                    });
                },
            }
        }
        result
    }

    const fn empty_result(&self) -> ClassificationResult {
        ClassificationResult {
            vendors_found:     self.vendors_found,
            customers_found:   self.customers_found,
            vendors_updated:   0,
            customers_updated: 0,
            errors:            Vec::new(),
            applied:           false,
        }
    }
}

fn change_for(contact: &Record, role: ContactRole) -> ContactChange {
    ContactChange {
        id: contact.integer("id").unwrap_or_default(),
        name: contact.text("name").unwrap_or_default().to_string(),
        reference: contact.text("ref").unwrap_or_default().to_string(),
        role,
    }
}

/// Classify contacts; writes happen only with `execute` and a confirmed prompt
pub fn classify_contacts(
    remote: &dyn RemoteApi,
    execute: bool,
    gate: &mut dyn ConfirmationGate,
    on_change: impl FnMut(&ContactChange, Option<&str>),
) -> Result<ClassificationResult> {
    let plan = ClassificationPlan::gather(remote)?;
    if !execute || plan.pending.is_empty() {
        return Ok(plan.preview());
    }
    let prompt = format!("This will update {} contacts. Continue?", plan.pending.len());
    if !gate.confirm(&prompt)? {
        info!("Operator declined contact classification");
        return Ok(plan.preview());
    }
    Ok(plan.apply(remote, on_change))
}
