//! Typed search filters
//!
//! A `Domain` is an ordered conjunction of `(field, operator, value)` conditions. It is
//! serialized to Odoo's list-of-triples form only at the transport boundary.

use serde_json::{Value, json};
use strum::{AsRefStr, Display};

/// Comparison operators supported in a condition
#[derive(AsRefStr, Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Operator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "like")]
    Like,
    #[strum(serialize = "=like")]
    EqLike,
    #[strum(serialize = "in")]
    In,
    #[strum(serialize = "not in")]
    NotIn,
}

/// A single `(field, operator, value)` condition
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field:    String,
    pub operator: Operator,
    pub value:    Value,
}

/// Conjunction of conditions; an empty domain matches every record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain {
    conditions: Vec<Condition>,
}

impl Domain {
    /// Domain matching every record
    pub const fn all() -> Self {
        Self {
            conditions: Vec::new(),
        }
    }

    /// Append a condition
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            operator,
            value: value.into(),
        });
        self
    }

    /// Records where `field` holds a value other than the platform's null/false sentinel
    pub fn is_set(field: impl Into<String>) -> Self {
        Self::all().with(field, Operator::Ne, false)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Wire form: `[[field, operator, value], ...]`
    pub fn to_wire(&self) -> Value {
        Value::Array(
            self.conditions
                .iter()
                .map(|c| json!([c.field, c.operator.as_ref(), c.value]))
                .collect(),
        )
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_domain_serializes_to_empty_list() {
        assert_eq!(Domain::all().to_wire(), json!([]));
    }

    #[test]
    fn conditions_keep_insertion_order() {
        let domain = Domain::all()
            .with("state", Operator::Eq, "manual")
            .with("name", Operator::EqLike, "x_studio_%")
            .with("name", Operator::NotIn, json!(["x_studio_code"]));

        assert_eq!(
            domain.to_wire(),
            json!([
                ["state", "=", "manual"],
                ["name", "=like", "x_studio_%"],
                ["name", "not in", ["x_studio_code"]],
            ])
        );
    }

    #[test]
    fn is_set_compares_against_false() {
        assert_eq!(
            Domain::is_set("x_studio_notes").to_wire(),
            json!([["x_studio_notes", "!=", false]])
        );
    }
}
