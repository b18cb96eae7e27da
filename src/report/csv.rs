//! CSV report emitter
//!
//! One row per successful host plus a trailing totals row, mirroring what
//! the PDF detail table shows.

use crate::error::Result;
use crate::report::BatchReport;
use std::path::Path;
use tracing::info;

const HEADERS: &[&str] = &[
    "VM",
    "Instance Type",
    "On-Demand Monthly",
    "1-Year Reserved Monthly",
    "3-Year Reserved Monthly",
    "Storage (GiB)",
    "Storage Monthly",
    "Total On-Demand",
    "Total 1-Year",
    "Total 3-Year",
];

pub fn write_csv(path: &Path, report: &BatchReport) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;

    for est in &report.estimates {
        writer.write_record(&[
            est.host.clone(),
            est.instance_type.clone(),
            format!("{:.2}", est.compute_monthly.on_demand),
            format!("{:.2}", est.compute_monthly.reserved_1yr),
            format!("{:.2}", est.compute_monthly.reserved_3yr),
            format!("{:.1}", est.storage_gib),
            format!("{:.2}", est.storage_monthly),
            format!("{:.2}", est.total_monthly.on_demand),
            format!("{:.2}", est.total_monthly.reserved_1yr),
            format!("{:.2}", est.total_monthly.reserved_3yr),
        ])?;
    }

    let totals = report.totals();
    writer.write_record(&[
        "Total".to_string(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        String::new(),
        format!("{:.2}", report.total_storage_monthly()),
        format!("{:.2}", totals.on_demand),
        format!("{:.2}", totals.reserved_1yr),
        format!("{:.2}", totals.reserved_3yr),
    ])?;

    writer.flush()?;
    info!(
        "Wrote {} rows to {}",
        report.estimates.len() + 1,
        path.display()
    );
    Ok(())
}
