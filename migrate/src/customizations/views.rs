use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::remote::{Domain, Operator, Record, RecordAccess, RemoteApi};

const MODEL_VIEWS: &str = "ir.ui.view";

/// Name prefix Studio gives every view it creates
pub const STUDIO_VIEW_PREFIX: &str = "Odoo Studio:";

const VIEW_FIELDS: &[&str] = &[
    "name",
    "model",
    "type",
    "arch_db",
    "inherit_id",
    "priority",
    "active",
];

/// A view created by Studio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioView {
    pub id:         i64,
    pub name:       String,
    pub model:      String,
    #[serde(rename = "type")]
    pub view_type:  String,
    pub arch:       String,
    pub inherit_id: Option<i64>,
    pub priority:   i64,
    pub active:     bool,
}

impl StudioView {
    fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            id:         record.integer("id")?,
            name:       record.text("name")?.to_string(),
            model:      record.text("model").unwrap_or_default().to_string(),
            view_type:  record.text("type").unwrap_or("form").to_string(),
            arch:       record.text("arch_db").unwrap_or_default().to_string(),
            inherit_id: record.reference_id("inherit_id"),
            priority:   record.integer("priority").unwrap_or(16),
            active:     record.flag("active"),
        })
    }
}

/// Views whose name carries the Studio prefix, ordered by id
pub fn discover_views(remote: &dyn RemoteApi) -> Result<Vec<StudioView>> {
    let domain = Domain::all().with("name", Operator::EqLike, format!("{STUDIO_VIEW_PREFIX}%"));
    let mut views: Vec<StudioView> = remote
        .search_read(MODEL_VIEWS, &domain, VIEW_FIELDS, None)?
        .iter()
        .filter_map(StudioView::from_record)
        .collect();
    views.sort_by_key(|view| view.id);
    debug!("Found {} Studio views", views.len());
    Ok(views)
}
