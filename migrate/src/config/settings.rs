use std::path::PathBuf;

/// Default prefix Studio gives every field it creates
pub const DEFAULT_FIELD_PREFIX: &str = "x_studio_";

/// Fields known to be defined incorrectly, never migrated or removed
pub const DEFAULT_DENY_LIST: &[&str] = &["x_studio_code"];

/// Knobs for the migration pipeline that are not connection parameters
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub field_prefix:   String,
    pub deny_list:      Vec<String>,
    pub report_path:    PathBuf,
    pub backup_path:    PathBuf,
    pub module_name:    String,
    pub output_dir:     PathBuf,
    pub module_version: String,
    pub depends:        Vec<String>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            field_prefix:   DEFAULT_FIELD_PREFIX.to_string(),
            deny_list:      DEFAULT_DENY_LIST.iter().map(ToString::to_string).collect(),
            report_path:    PathBuf::from("studio_analysis_report.json"),
            backup_path:    PathBuf::from("studio_fields_backup.json"),
            module_name:    "studio_replacement".to_string(),
            output_dir:     PathBuf::from("."),
            module_version: "18.0.1.0.0".to_string(),
            depends:        vec!["base".to_string()],
        }
    }
}
