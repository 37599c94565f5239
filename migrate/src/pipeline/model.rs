//! Data handed between pipeline stages
//!
//! `FieldDescriptor` is read once from the field registry and never changed.
//! `FieldAnalysis` upholds its own invariants: it cannot be built, or
//! deserialized, with a non-null count above the record total or a `has_data`
//! flag that disagrees with the count.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::customizations::Customizations;
use crate::error::{Error, Result};
use crate::remote::{Record, RecordAccess, RecordId};

/// Maximum number of sample values kept per field
pub const MAX_SAMPLES: usize = 5;

/// One custom field as registered on the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id:                 RecordId,
    pub model:              String,
    pub name:               String,
    #[serde(rename = "ttype")]
    pub field_type:         String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_description:  Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation:           Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_field:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection:          Option<String>,
    #[serde(default)]
    pub required:           bool,
    #[serde(default)]
    pub readonly:           bool,
    #[serde(default)]
    pub translate:          bool,
    #[serde(default = "default_store")]
    pub store:              bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help:               Option<String>,
    pub model_display_name: String,
    /// Module that defines the owning model, when one could be resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_module:      Option<String>,
}

const fn default_store() -> bool {
    true
}

impl FieldDescriptor {
    /// Field list read from the registry for each descriptor
    pub const REGISTRY_FIELDS: &[&str] = &[
        "name",
        "model",
        "ttype",
        "field_description",
        "relation",
        "relation_field",
        "selection",
        "required",
        "readonly",
        "translate",
        "store",
        "help",
    ];

    /// Build from a registry record; the display name is filled in later
    pub fn from_record(record: &Record) -> Result<Self> {
        let text = |field: &str| record.text(field).map(ToString::to_string);
        let require = |field: &str| {
            text(field).ok_or_else(|| {
                error_stack::Report::new(Error::invalid(
                    "field record",
                    format!("missing '{field}' in {}", Value::Object(record.clone())),
                ))
            })
        };
        let id = record.integer("id").ok_or_else(|| {
            error_stack::Report::new(Error::invalid("field record", "missing 'id'"))
        })?;
        let model = require("model")?;

        Ok(Self {
            id,
            name: require("name")?,
            field_type: require("ttype")?,
            field_description: text("field_description"),
            relation: text("relation"),
            relation_field: text("relation_field"),
            selection: text("selection"),
            required: record.flag("required"),
            readonly: record.flag("readonly"),
            translate: record.flag("translate"),
            store: record.get("store").and_then(Value::as_bool).unwrap_or(true),
            help: text("help"),
            model_display_name: model.clone(),
            owning_module: None,
            model,
        })
    }

    /// `model.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.model, self.name)
    }
}

#[cfg(test)]
impl FieldDescriptor {
    /// Plain stored field with no modifiers
    pub fn fixture(model: &str, name: &str, field_type: &str) -> Self {
        Self {
            id:                 1,
            model:              model.to_string(),
            name:               name.to_string(),
            field_type:         field_type.to_string(),
            field_description:  None,
            relation:           None,
            relation_field:     None,
            selection:          None,
            required:           false,
            readonly:           false,
            translate:          false,
            store:              true,
            help:               None,
            model_display_name: model.to_string(),
            owning_module:      None,
        }
    }
}

/// Wire form of `FieldAnalysis`, validated on the way in
#[derive(Deserialize)]
struct RawFieldAnalysis {
    total_records:   u64,
    non_null_values: u64,
    has_data:        bool,
    #[serde(default)]
    sample_values:   Vec<Value>,
}

/// Measured data footprint of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldAnalysis")]
pub struct FieldAnalysis {
    total_records:   u64,
    non_null_values: u64,
    has_data:        bool,
    sample_values:   Vec<Value>,
}

impl FieldAnalysis {
    /// Analysis of a field on a model with no records
    pub const fn empty() -> Self {
        Self {
            total_records:   0,
            non_null_values: 0,
            has_data:        false,
            sample_values:   Vec::new(),
        }
    }

    /// Build from measured counts; samples beyond the limit are dropped
    pub fn new(total_records: u64, non_null_values: u64, mut sample_values: Vec<Value>) -> Result<Self> {
        if non_null_values > total_records {
            return Err(error_stack::Report::new(Error::InvalidState(format!(
                "non-null count {non_null_values} exceeds record total {total_records}"
            ))));
        }
        sample_values.truncate(MAX_SAMPLES);
        Ok(Self {
            total_records,
            non_null_values,
            has_data: non_null_values > 0,
            sample_values,
        })
    }

    pub const fn total_records(&self) -> u64 {
        self.total_records
    }

    pub const fn non_null_values(&self) -> u64 {
        self.non_null_values
    }

    pub const fn has_data(&self) -> bool {
        self.has_data
    }

    pub fn sample_values(&self) -> &[Value] {
        &self.sample_values
    }
}

impl TryFrom<RawFieldAnalysis> for FieldAnalysis {
    type Error = Error;

    fn try_from(raw: RawFieldAnalysis) -> std::result::Result<Self, Self::Error> {
        if raw.has_data != (raw.non_null_values > 0) {
            return Err(Error::InvalidState(format!(
                "has_data={} disagrees with non_null_values={}",
                raw.has_data, raw.non_null_values
            )));
        }
        if raw.sample_values.len() > MAX_SAMPLES {
            return Err(Error::InvalidState(format!(
                "{} sample values exceed the limit of {MAX_SAMPLES}",
                raw.sample_values.len()
            )));
        }
        Self::new(raw.total_records, raw.non_null_values, raw.sample_values)
            .map_err(|report| Error::InvalidState(report.current_context().to_string()))
    }
}

/// Analysis result for one field: measured, or the error that stopped it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Measured(FieldAnalysis),
    Failed { error: String },
}

impl AnalysisOutcome {
    pub const fn has_data(&self) -> bool {
        match self {
            Self::Measured(analysis) => analysis.has_data(),
            Self::Failed { .. } => false,
        }
    }

    pub const fn measured(&self) -> Option<&FieldAnalysis> {
        match self {
            Self::Measured(analysis) => Some(analysis),
            Self::Failed { .. } => None,
        }
    }
}

/// A descriptor paired with its analysis, flattened into one JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    #[serde(flatten)]
    pub descriptor: FieldDescriptor,
    pub analysis:   AnalysisOutcome,
}

/// Report-level tallies
///
/// Fields whose analysis failed are counted separately, so
/// `fields_with_data + fields_without_data + fields_with_errors` always equals
/// `total_studio_fields`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_studio_fields: usize,
    pub fields_with_data:    usize,
    pub fields_without_data: usize,
    #[serde(default)]
    pub fields_with_errors:  usize,
}

impl ReportSummary {
    /// Add one outcome to the running tallies
    pub const fn record(&mut self, outcome: &AnalysisOutcome) {
        self.total_studio_fields += 1;
        match outcome {
            AnalysisOutcome::Measured(analysis) if analysis.has_data() => self.fields_with_data += 1,
            AnalysisOutcome::Measured(_) => self.fields_without_data += 1,
            AnalysisOutcome::Failed { .. } => self.fields_with_errors += 1,
        }
    }

    /// Tallies for a full sequence of field reports
    pub fn tally<'a>(fields: impl IntoIterator<Item = &'a FieldReport>) -> Self {
        fields.into_iter().fold(Self::default(), |mut summary, field| {
            summary.record(&field.analysis);
            summary
        })
    }
}

/// Aggregate output of the analyzer, persisted between stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub summary:        ReportSummary,
    pub fields:         Vec<FieldReport>,
    #[serde(default, skip_serializing_if = "Customizations::is_empty")]
    pub customizations: Customizations,
}

impl MigrationReport {
    /// Build a report whose summary is derived from `fields`
    pub fn new(fields: Vec<FieldReport>, customizations: Customizations) -> Self {
        Self {
            summary: ReportSummary::tally(&fields),
            fields,
            customizations,
        }
    }

    /// Reject reports whose summary disagrees with their fields
    pub fn check_consistency(&self) -> Result<()> {
        let expected = ReportSummary::tally(&self.fields);
        if expected == self.summary {
            Ok(())
        } else {
            Err(error_stack::Report::new(Error::InvalidState(
                "report summary does not match its field entries".to_string(),
            ))
            .attach(format!("recorded: {:?}, recomputed: {expected:?}", self.summary)))
        }
    }

    /// Fields the analysis found holding data
    pub fn fields_with_data(&self) -> impl Iterator<Item = &FieldReport> {
        self.fields.iter().filter(|field| field.analysis.has_data())
    }
}
