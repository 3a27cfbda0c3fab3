use crate::workflow::runner::RunSummary;
use anyhow::Context;
use lotcore::DisplayState;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// One console line per display update.
pub fn render_line(state: &DisplayState) -> String {
    let snapshot = &state.snapshot;
    format!(
        "[rev {}] vehicles {} | empty {}/{} | {} ({})",
        state.revision,
        snapshot.vehicle_count(),
        snapshot.empty_slot_ids().len(),
        snapshot.total_slots(),
        state.congestion.label(),
        state.congestion.as_str()
    )
}

/// Appends the run summary as one JSON line.
pub fn append_report(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let line = serde_json::to_string(summary).context("serializing run summary")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening report {}", path.display()))?;
    writeln!(file, "{line}")?;
    Ok(())
}
