//! Module Generator
//!
//! Turns a `MigrationReport` into the files of an installable module that
//! re-declares every reported field natively, one model file per owning model.
//! Output depends only on the report and the options: groups and fields follow
//! the report's order and nothing time-dependent is written.

mod declarations;
mod templates;

use std::path::{Path, PathBuf};

use error_stack::ResultExt;
use heck::{ToTitleCase, ToUpperCamelCase};
use itertools::Itertools;
use minijinja::Environment;
use serde::Serialize;
use tracing::{debug, info};

pub use declarations::FieldDeclaration;

use super::model::{FieldDescriptor, MigrationReport};
use crate::config::MigrationSettings;
use crate::customizations::{Customizations, STUDIO_VIEW_PREFIX, StudioReport};
use crate::error::{Error, Result};

const VIEWS_FILE: &str = "views/studio_views.xml";
const REPORTS_FILE: &str = "reports/studio_reports.xml";

/// Parent views Studio customizations are re-attached to, by model
const BASE_VIEWS: &[(&str, &str)] = &[
    ("account.move", "account.view_move_form"),
    ("product.template", "product.product_template_only_form_view"),
    ("res.partner", "base.view_partner_form"),
    ("stock.lot", "stock.view_production_lot_form"),
];

/// Knobs that shape the generated module
#[derive(Debug, Clone)]
pub struct ModuleOptions {
    pub name:         String,
    pub version:      String,
    pub depends:      Vec<String>,
    pub field_prefix: String,
}

impl ModuleOptions {
    pub fn from_settings(settings: &MigrationSettings) -> Self {
        Self {
            name:         settings.module_name.clone(),
            version:      settings.module_version.clone(),
            depends:      settings.depends.clone(),
            field_prefix: settings.field_prefix.clone(),
        }
    }
}

/// Native declarations for every reported field of one model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDefinition {
    pub model:        String,
    pub class_name:   String,
    pub declarations: Vec<FieldDeclaration>,
}

impl GeneratedDefinition {
    fn new(model: &str, fields: &[&FieldDescriptor], prefix: &str) -> Self {
        Self {
            model:        model.to_string(),
            class_name:   model.replace('.', "_").to_upper_camel_case(),
            declarations: fields
                .iter()
                .map(|field| FieldDeclaration::from_descriptor(field, prefix))
                .collect(),
        }
    }

    /// Python module name: `sale.order` becomes `sale_order`
    pub fn file_stem(&self) -> String {
        self.model.replace('.', "_")
    }
}

/// One file of the generated module, relative to the module root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path:    PathBuf,
    pub content: String,
}

/// Complete module ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedModule {
    pub name:        String,
    pub definitions: Vec<GeneratedDefinition>,
    pub files:       Vec<GeneratedFile>,
}

impl GeneratedModule {
    /// Write every file under `output_dir/{name}` and return the module path
    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        let root = output_dir.join(&self.name);
        for file in &self.files {
            let path = root.join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .change_context(Error::io_failed("create directory", parent, "I/O error"))?;
            }
            std::fs::write(&path, &file.content)
                .change_context(Error::io_failed("write", &path, "I/O error"))?;
            debug!("Wrote {}", path.display());
        }
        info!("Module written to {}", root.display());
        Ok(root)
    }

    /// Number of field declarations across all models
    pub fn field_count(&self) -> usize {
        self.definitions.iter().map(|d| d.declarations.len()).sum()
    }
}

/// Result of a generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// No reported field holds data
    NoModuleNeeded,
    Module(GeneratedModule),
}

#[derive(Serialize)]
struct FieldContext {
    name:        String,
    constructor: String,
}

#[derive(Serialize)]
struct ViewContext {
    record_id: String,
    name:      String,
    model:     String,
    base_view: String,
    priority:  i64,
    arch:      String,
}

/// Configured dependencies followed by each owning model's module, without repeats
fn module_depends(report: &MigrationReport, options: &ModuleOptions) -> Vec<String> {
    options
        .depends
        .iter()
        .cloned()
        .chain(
            report
                .fields
                .iter()
                .filter_map(|field| field.descriptor.owning_module.clone())
                .sorted(),
        )
        .unique()
        .collect()
}

/// Group fields by owning model in first-seen order
pub fn group_by_model(report: &MigrationReport) -> Vec<(&str, Vec<&FieldDescriptor>)> {
    let mut groups: Vec<(&str, Vec<&FieldDescriptor>)> = Vec::new();
    for field in &report.fields {
        let descriptor = &field.descriptor;
        match groups.iter_mut().find(|(model, _)| *model == descriptor.model) {
            Some((_, fields)) => fields.push(descriptor),
            None => groups.push((descriptor.model.as_str(), vec![descriptor])),
        }
    }
    groups
}

/// Build the module for `report`
///
/// Every reported field is declared, with or without data; the module is only
/// skipped when no field holds data at all.
pub fn generate_module(report: &MigrationReport, options: &ModuleOptions) -> Result<Generation> {
    if report.summary.fields_with_data == 0 {
        info!("No reported field holds data - no module needed");
        return Ok(Generation::NoModuleNeeded);
    }

    let env = templates::environment();
    let definitions: Vec<GeneratedDefinition> = group_by_model(report)
        .into_iter()
        .map(|(model, fields)| GeneratedDefinition::new(model, &fields, &options.field_prefix))
        .collect();

    let mut files = Vec::new();
    let mut data = Vec::new();

    for definition in &definitions {
        let fields: Vec<FieldContext> = definition
            .declarations
            .iter()
            .map(|declaration| FieldContext {
                name:        declaration.name.clone(),
                constructor: declaration.constructor(),
            })
            .collect();
        files.push(GeneratedFile {
            path:    PathBuf::from("models").join(format!("{}.py", definition.file_stem())),
            content: render(&env, templates::MODEL_TEMPLATE, minijinja::context! {
                class_name => definition.class_name,
                model => definition.model,
                fields => fields,
            })?,
        });
    }

    let title = options.name.to_title_case();
    let customizations = &report.customizations;
    if !customizations.views.is_empty() {
        files.push(GeneratedFile {
            path:    PathBuf::from(VIEWS_FILE),
            content: render(&env, templates::VIEWS_TEMPLATE, minijinja::context! {
                views => view_contexts(customizations, &title),
            })?,
        });
        data.push(VIEWS_FILE);
    }
    if !customizations.reports.is_empty() {
        let reports: &[StudioReport] = &customizations.reports;
        files.push(GeneratedFile {
            path:    PathBuf::from(REPORTS_FILE),
            content: render(&env, templates::REPORTS_TEMPLATE, minijinja::context! { reports })?,
        });
        data.push(REPORTS_FILE);
    }

    let stems: Vec<String> = definitions.iter().map(GeneratedDefinition::file_stem).collect();
    files.push(GeneratedFile {
        path:    PathBuf::from("models/__init__.py"),
        content: render(&env, templates::MODELS_INIT_TEMPLATE, minijinja::context! { stems })?,
    });
    files.push(GeneratedFile {
        path:    PathBuf::from("__init__.py"),
        content: templates::MODULE_INIT.to_string(),
    });
    files.push(GeneratedFile {
        path:    PathBuf::from("__manifest__.py"),
        content: render(&env, templates::MANIFEST_TEMPLATE, minijinja::context! {
            title,
            version => options.version,
            depends => module_depends(report, options),
            data,
        })?,
    });
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let module = GeneratedModule {
        name: options.name.clone(),
        definitions,
        files,
    };
    info!(
        "Generated {} declarations across {} models",
        module.field_count(),
        module.definitions.len()
    );
    Ok(Generation::Module(module))
}

fn view_contexts(customizations: &Customizations, title: &str) -> Vec<ViewContext> {
    customizations
        .views
        .iter()
        .map(|view| ViewContext {
            record_id: format!("studio_view_{}", view.id),
            name:      view
                .name
                .strip_prefix(STUDIO_VIEW_PREFIX)
                .map_or_else(|| view.name.clone(), |rest| format!("{title}:{rest}")),
            model:     view.model.clone(),
            base_view: base_view(&view.model),
            priority:  view.priority,
            arch:      strip_data_wrapper(&view.arch).to_string(),
        })
        .collect()
}

fn base_view(model: &str) -> String {
    BASE_VIEWS
        .iter()
        .find(|(candidate, _)| *candidate == model)
        .map_or_else(
            || format!("base.view_{}_form", model.replace('.', "_")),
            |(_, view)| (*view).to_string(),
        )
}

/// Studio wraps inherited arch in `<data>`; the record body wants the inner nodes
fn strip_data_wrapper(arch: &str) -> &str {
    let trimmed = arch.trim();
    trimmed
        .strip_prefix("<data>")
        .and_then(|inner| inner.strip_suffix("</data>"))
        .map_or(trimmed, str::trim)
}

fn render(env: &Environment<'_>, template: &str, context: minijinja::Value) -> Result<String> {
    env.render_str(template, context)
        .change_context(Error::InvalidState("template rendering failed".to_string()))
}
