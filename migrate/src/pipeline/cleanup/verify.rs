use serde::Serialize;
use tracing::{debug, warn};

use crate::pipeline::model::MigrationReport;
use crate::storage::{StorageProbe, UnsetValue, table_name};

/// What went wrong for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    ColumnMissing,
    CountMismatch { expected: u64, actual: u64 },
    ProbeFailed { error: String },
}

/// Storage no longer matches what the analysis recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub model: String,
    pub field: String,
    #[serde(flatten)]
    pub kind:  ViolationKind,
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ViolationKind::ColumnMissing => {
                write!(f, "{}.{}: column missing", self.model, self.field)
            },
            ViolationKind::CountMismatch { expected, actual } => write!(
                f,
                "{}.{}: data mismatch, expected={expected}, actual={actual}",
                self.model, self.field
            ),
            ViolationKind::ProbeFailed { error } => {
                write!(f, "{}.{}: check failed - {error}", self.model, self.field)
            },
        }
    }
}

/// Result of a verification pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    pub checked:    usize,
    pub intact:     usize,
    pub violations: Vec<IntegrityViolation>,
}

impl VerificationReport {
    pub const fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Re-check every field the analysis found holding data
///
/// Detection only; nothing is repaired.
pub fn verify_integrity(report: &MigrationReport, probe: &dyn StorageProbe) -> VerificationReport {
    let mut result = VerificationReport::default();

    for field in report.fields_with_data() {
        let Some(analysis) = field.analysis.measured() else {
            continue;
        };
        let descriptor = &field.descriptor;
        let table = table_name(&descriptor.model);
        let unset = UnsetValue::for_field_type(&descriptor.field_type);
        result.checked += 1;

        let kind = match probe.column_exists(&table, &descriptor.name) {
            Ok(false) => Some(ViolationKind::ColumnMissing),
            Ok(true) => match probe.non_null_count(&table, &descriptor.name, unset) {
                Ok(actual) if actual == analysis.non_null_values() => None,
                Ok(actual) => Some(ViolationKind::CountMismatch {
                    expected: analysis.non_null_values(),
                    actual,
                }),
                Err(error) => Some(ViolationKind::ProbeFailed {
                    error: error.current_context().to_string(),
                }),
            },
            Err(error) => Some(ViolationKind::ProbeFailed {
                error: error.current_context().to_string(),
            }),
        };

        match kind {
            None => {
                debug!("{}: data intact", descriptor.qualified_name());
                result.intact += 1;
            },
            Some(kind) => {
                let violation = IntegrityViolation {
                    model: descriptor.model.clone(),
                    field: descriptor.name.clone(),
                    kind,
                };
                warn!("Integrity violation: {violation}");
                result.violations.push(violation);
            },
        }
    }

    result
}

#[cfg(test)]
#[allow(clippy::expect_used, reason = "tests panic on setup failure")]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::customizations::Customizations;
    use crate::error::Result;
    use crate::pipeline::model::{AnalysisOutcome, FieldAnalysis, FieldDescriptor, FieldReport};

    /// Every column exists and holds `count` values
    struct FixedProbe {
        count: u64,
        asked: RefCell<Vec<UnsetValue>>,
    }

    impl StorageProbe for FixedProbe {
        fn column_exists(&self, _table: &str, _column: &str) -> Result<bool> {
            Ok(true)
        }

        fn non_null_count(&self, _table: &str, _column: &str, unset: UnsetValue) -> Result<u64> {
            self.asked.borrow_mut().push(unset);
            Ok(self.count)
        }
    }

    fn measured(name: &str, field_type: &str, non_null: u64) -> FieldReport {
        FieldReport {
            descriptor: FieldDescriptor::fixture("res.partner", name, field_type),
            analysis:   AnalysisOutcome::Measured(
                FieldAnalysis::new(10, non_null, Vec::new()).expect("valid"),
            ),
        }
    }

    #[test]
    fn boolean_columns_count_false_as_unset() {
        let report = MigrationReport::new(
            vec![
                measured("x_studio_vip", "boolean", 3),
                measured("x_studio_note", "text", 3),
            ],
            Customizations::default(),
        );
        let probe = FixedProbe {
            count: 3,
            asked: RefCell::default(),
        };

        let result = verify_integrity(&report, &probe);

        assert!(result.is_clean());
        assert_eq!(
            *probe.asked.borrow(),
            vec![UnsetValue::NullOrFalse, UnsetValue::Null]
        );
    }
}
