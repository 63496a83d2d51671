//! Closing checklist. The reader is the judge; nothing here is a verdict.

use std::path::Path;

use anyhow::Result;

use super::{RunReport, StepOutcome};
use crate::printer::Sink;

const CHECKLIST: &[&str] = &[
    "[ ] SMBIOS speed, size and part number match the kit's label (dmidecode type 17).",
    "[ ] Every populated slot shows the expected module; no 'Unknown' or empty entries.",
    "[ ] The maximum capacity of the controller covers the kit (dmidecode type 16).",
    "[ ] stress-ng reported no verification failures and no workers were killed.",
    "[ ] Throughput and bandwidth figures are in the range expected for the platform.",
    "[ ] No kernel messages about memory errors appeared during the run (dmesg).",
];

pub fn print(sink: &Sink, report: &RunReport, log_path: &Path) -> Result<()> {
    sink.banner("Summary")?;
    for item in CHECKLIST {
        sink.plain(item)?;
    }

    let skipped: Vec<_> = report.skipped().collect();
    let failed: Vec<_> = report.failed().collect();
    if !skipped.is_empty() || !failed.is_empty() {
        sink.blank()?;
        sink.info("Steps worth a second look:")?;
        for record in skipped {
            if let StepOutcome::Skipped { missing } = &record.outcome {
                sink.warn(&format!("  skipped  {} (missing: {})", record.title, missing.join(", ")))?;
            }
        }
        for record in failed {
            if let StepOutcome::Ran(result) = &record.outcome {
                sink.warn(&format!("  exit {:<3}  {}", result.code, record.title))?;
            }
        }
    }

    sink.blank()?;
    sink.info(&format!("Full session log: {}", log_path.display()))?;
    sink.info(&format!("Review with: less {}", log_path.display()))?;
    Ok(())
}
