use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::debug;

use crate::error::Result;
use crate::remote::{Domain, Operator, Record, RecordAccess, RemoteApi};

const MODEL_REPORTS: &str = "ir.actions.report";
const REPORT_FIELDS: &[&str] = &["name", "model", "report_name", "report_type", "xml_id"];
const STUDIO_MARKER: &str = "studio";
const EXPORT_XML_ID_PREFIX: &str = "__export";

/// Why a report was flagged as possibly Studio-made
#[derive(Debug, Clone, Copy, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StudioSignal {
    NameMentionsStudio,
    ReportNameMentionsStudio,
    XmlIdMentionsStudio,
    MissingXmlId,
    ExportedXmlId,
}

/// A PDF report that looks like a Studio creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioReport {
    pub id:          i64,
    pub name:        String,
    pub model:       String,
    pub report_name: String,
    pub report_type: String,
    pub xml_id:      Option<String>,
    pub signals:     Vec<StudioSignal>,
}

/// Signals raised by one report record; empty means "looks standard"
pub fn classify(name: &str, report_name: &str, xml_id: Option<&str>) -> Vec<StudioSignal> {
    let mentions = |text: &str| text.to_lowercase().contains(STUDIO_MARKER);
    let mut signals = Vec::new();
    if mentions(name) {
        signals.push(StudioSignal::NameMentionsStudio);
    }
    if mentions(report_name) {
        signals.push(StudioSignal::ReportNameMentionsStudio);
    }
    match xml_id.filter(|id| !id.is_empty()) {
        None => signals.push(StudioSignal::MissingXmlId),
        Some(id) => {
            if mentions(id) {
                signals.push(StudioSignal::XmlIdMentionsStudio);
            }
            if id.starts_with(EXPORT_XML_ID_PREFIX) {
                signals.push(StudioSignal::ExportedXmlId);
            }
        },
    }
    signals
}

impl StudioReport {
    fn from_record(record: &Record) -> Option<Self> {
        let name = record.text("name")?.to_string();
        let report_name = record.text("report_name").unwrap_or_default().to_string();
        let xml_id = record.text("xml_id").map(ToString::to_string);
        let signals = classify(&name, &report_name, xml_id.as_deref());
        if signals.is_empty() {
            return None;
        }
        Some(Self {
            id: record.integer("id")?,
            name,
            model: record.text("model").unwrap_or_default().to_string(),
            report_name,
            report_type: record.text("report_type").unwrap_or_default().to_string(),
            xml_id,
            signals,
        })
    }
}

/// QWeb PDF reports flagged by the heuristic, ordered by id
pub fn discover_reports(remote: &dyn RemoteApi) -> Result<Vec<StudioReport>> {
    let domain = Domain::all().with("report_type", Operator::Eq, "qweb-pdf");
    let mut reports: Vec<StudioReport> = remote
        .search_read(MODEL_REPORTS, &domain, REPORT_FIELDS, None)?
        .iter()
        .filter_map(StudioReport::from_record)
        .collect();
    reports.sort_by_key(|report| report.id);
    debug!("Flagged {} reports as possible Studio creations", reports.len());
    Ok(reports)
}
