//! Studio views and reports
//!
//! Studio leaves more behind than fields. Views are easy to spot by their name
//! prefix; reports are not, so they go through a best-effort heuristic that
//! records which signal matched and makes no completeness claim.

mod reports;
mod views;

pub use reports::{StudioReport, StudioSignal, discover_reports};
use serde::{Deserialize, Serialize};
pub use views::{STUDIO_VIEW_PREFIX, StudioView, discover_views};

use crate::error::Result;
use crate::remote::RemoteApi;

/// Studio views and reports captured alongside the field analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default)]
    pub views:   Vec<StudioView>,
    #[serde(default)]
    pub reports: Vec<StudioReport>,
}

impl Customizations {
    /// Query both views and reports
    pub fn discover(remote: &dyn RemoteApi) -> Result<Self> {
        Ok(Self {
            views:   discover_views(remote)?,
            reports: discover_reports(remote)?,
        })
    }

    pub const fn is_empty(&self) -> bool {
        self.views.is_empty() && self.reports.is_empty()
    }
}
