use std::fmt;

use tracing::info;

use crate::model::UpdateTracker;
use crate::store::ThreadSafeStore;

/// Outcome of one (model, version) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
    pub model: String,
    pub version: String,
    pub updated: usize,
    pub discovered: usize,
}

impl fmt::Display for SummaryLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "For model {}-{}, updated {} out of {} components.",
            self.model, self.version, self.updated, self.discovered
        )
    }
}

/// Consolidated result of an update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub lines: Vec<SummaryLine>,
    pub models: usize,
    pub total_updated: usize,
}

impl UpdateSummary {
    /// Final line reported after the per-version lines.
    pub fn total_line(&self) -> String {
        format!(
            "For {} models updated {} components",
            self.models, self.total_updated
        )
    }

    /// Emits every line at info level.
    pub fn log(&self) {
        for line in &self.lines {
            info!("{line}");
        }
        info!("{}", self.total_line());
    }
}

/// Builds the summary from the collected trackers.
pub fn summarize(trackers: &ThreadSafeStore<Vec<UpdateTracker>>) -> UpdateSummary {
    let pairs = trackers.get_all_pairs();
    let mut summary = UpdateSummary {
        models: pairs.len(),
        ..UpdateSummary::default()
    };

    for (model, versions) in pairs {
        for tracker in versions {
            summary.total_updated += tracker.total_updated;
            summary.lines.push(SummaryLine {
                model: model.clone(),
                version: tracker.version,
                updated: tracker.total_updated,
                discovered: tracker.total_components,
            });
        }
    }

    summary
}
