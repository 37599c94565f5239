//! Mapping from registry field types to native field declarations

use heck::ToTitleCase;
use strum::{AsRefStr, Display};

use crate::pipeline::model::FieldDescriptor;

/// Relation used when a relational field carries no target
const FALLBACK_RELATION: &str = "res.partner";

/// Inverse field used when a one2many field carries none
const FALLBACK_INVERSE: &str = "parent_id";

const PLACEHOLDER_SELECTION: &str = "[('option1', 'Option 1'), ('option2', 'Option 2')]";

/// Native field constructors a declaration can use
#[derive(AsRefStr, Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum NativeType {
    Char,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Many2one,
    One2many,
    Many2many,
    Selection,
}

impl NativeType {
    /// Type for a registry `ttype`; anything unrecognized is declared as `Char`
    pub fn for_source(field_type: &str) -> Self {
        match field_type {
            "text" => Self::Text,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            "many2one" => Self::Many2one,
            "one2many" => Self::One2many,
            "many2many" => Self::Many2many,
            "selection" => Self::Selection,
            _ => Self::Char,
        }
    }

    const fn translatable(self) -> bool {
        matches!(self, Self::Char | Self::Text)
    }
}

/// One `name = fields.Type(...)` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    pub name:        String,
    pub native_type: NativeType,
    arguments:       Vec<String>,
}

impl FieldDeclaration {
    /// Translate a descriptor; `prefix` is stripped when deriving the label
    pub fn from_descriptor(field: &FieldDescriptor, prefix: &str) -> Self {
        let native_type = NativeType::for_source(&field.field_type);
        let relation = || {
            python_string(
                field
                    .relation
                    .as_deref()
                    .unwrap_or(FALLBACK_RELATION),
            )
        };

        let mut arguments = match native_type {
            NativeType::Many2one | NativeType::Many2many => vec![relation()],
            NativeType::One2many => vec![
                relation(),
                python_string(field.relation_field.as_deref().unwrap_or(FALLBACK_INVERSE)),
            ],
            NativeType::Selection => vec![selection_literal(field.selection.as_deref())],
            _ => Vec::new(),
        };

        arguments.push(format!("string={}", python_string(&label(&field.name, prefix))));
        if field.required {
            arguments.push("required=True".to_string());
        }
        if field.readonly {
            arguments.push("readonly=True".to_string());
        }
        if field.translate && native_type.translatable() {
            arguments.push("translate=True".to_string());
        }
        if let Some(help) = field.help.as_deref().filter(|help| !help.trim().is_empty()) {
            arguments.push(format!("help={}", python_string(help)));
        }

        Self {
            name: field.name.clone(),
            native_type,
            arguments,
        }
    }

    /// Right-hand side of the assignment
    pub fn constructor(&self) -> String {
        format!("fields.{}({})", self.native_type, self.arguments.join(", "))
    }
}

/// Human label: prefix stripped, words title-cased
pub fn label(name: &str, prefix: &str) -> String {
    name.strip_prefix(prefix).unwrap_or(name).to_title_case()
}

/// Selection options as stored by the registry, or a placeholder to fill in by hand
fn selection_literal(stored: Option<&str>) -> String {
    stored
        .map(str::trim)
        .filter(|options| options.starts_with('[') && options.ends_with(']'))
        .map_or_else(|| PLACEHOLDER_SELECTION.to_string(), ToString::to_string)
}

/// Single-quoted Python string literal
pub fn python_string(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            other => literal.push(other),
        }
    }
    literal.push('\'');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declare(field: &FieldDescriptor) -> String {
        FieldDeclaration::from_descriptor(field, "x_studio_").constructor()
    }

    #[test]
    fn every_mapped_type_has_its_own_constructor() {
        let cases = [
            ("char", NativeType::Char),
            ("text", NativeType::Text),
            ("integer", NativeType::Integer),
            ("float", NativeType::Float),
            ("boolean", NativeType::Boolean),
            ("date", NativeType::Date),
            ("datetime", NativeType::Datetime),
            ("many2one", NativeType::Many2one),
            ("one2many", NativeType::One2many),
            ("many2many", NativeType::Many2many),
            ("selection", NativeType::Selection),
        ];
        for (source, native) in cases {
            assert_eq!(NativeType::for_source(source), native, "{source}");
        }
    }

    #[test]
    fn unknown_type_falls_back_to_char_with_flags() {
        let mut field = FieldDescriptor::fixture("res.partner", "x_studio_signature", "binary");
        field.required = true;
        field.readonly = true;

        assert_eq!(
            declare(&field),
            "fields.Char(string='Signature', required=True, readonly=True)"
        );
    }

    #[test]
    fn relational_fields_carry_their_targets() {
        let mut many2one = FieldDescriptor::fixture("product.template", "x_studio_vendor", "many2one");
        many2one.relation = Some("res.partner".to_string());
        assert_eq!(
            declare(&many2one),
            "fields.Many2one('res.partner', string='Vendor')"
        );

        let mut one2many = FieldDescriptor::fixture("sale.order", "x_studio_stops", "one2many");
        one2many.relation = Some("x_stop".to_string());
        one2many.relation_field = Some("x_order_id".to_string());
        assert_eq!(
            declare(&one2many),
            "fields.One2many('x_stop', 'x_order_id', string='Stops')"
        );

        let orphan = FieldDescriptor::fixture("sale.order", "x_studio_links", "one2many");
        assert_eq!(
            declare(&orphan),
            "fields.One2many('res.partner', 'parent_id', string='Links')"
        );
    }

    #[test]
    fn selection_keeps_stored_options() {
        let mut field = FieldDescriptor::fixture("res.partner", "x_studio_tier", "selection");
        field.selection = Some("[('gold', 'Gold'), ('silver', 'Silver')]".to_string());
        assert_eq!(
            declare(&field),
            "fields.Selection([('gold', 'Gold'), ('silver', 'Silver')], string='Tier')"
        );

        field.selection = None;
        assert!(declare(&field).starts_with("fields.Selection([('option1', 'Option 1')"));
    }

    #[test]
    fn translate_and_help_are_projected() {
        let mut field = FieldDescriptor::fixture("product.template", "x_studio_care_notes", "text");
        field.translate = true;
        field.help = Some("Shown on the customer's label".to_string());
        assert_eq!(
            declare(&field),
            "fields.Text(string='Care Notes', translate=True, help='Shown on the customer\\'s label')"
        );

        let mut number = FieldDescriptor::fixture("product.template", "x_studio_shelf_days", "integer");
        number.translate = true;
        assert_eq!(declare(&number), "fields.Integer(string='Shelf Days')");
    }

    #[test]
    fn python_strings_are_escaped() {
        assert_eq!(python_string("a\\b'c\nd"), "'a\\\\b\\'c\\nd'");
    }
}
