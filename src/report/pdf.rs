//! PDF quote emitter
//!
//! Letter-format quote: a summary page with aggregate totals and a pie chart
//! of cost share by instance type, followed by a detail table mirroring the
//! CSV report.

use crate::error::{MigratectlError, Result};
use crate::report::BatchReport;
use crate::utils::format_usd;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use std::f64::consts::PI;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

// US letter
const PAGE_W: f64 = 215.9;
const PAGE_H: f64 = 279.4;
const MARGIN: f64 = 16.0;

const ROW_HEIGHT: f64 = 5.5;
const ROWS_PER_PAGE: usize = 38;

/// Slice colors, cycled when there are more slices than entries.
const PALETTE: &[(f64, f64, f64)] = &[
    (0.22, 0.46, 0.70),
    (0.89, 0.47, 0.13),
    (0.30, 0.68, 0.29),
    (0.84, 0.15, 0.16),
    (0.58, 0.40, 0.74),
    (0.55, 0.34, 0.29),
    (0.89, 0.47, 0.76),
    (0.50, 0.50, 0.50),
];

pub fn write_pdf(path: &Path, report: &BatchReport, pie_threshold_pct: f64) -> Result<()> {
    let (doc, page1, layer1) = PdfDocument::new(
        "AWS Migration Quote",
        Mm(PAGE_W),
        Mm(PAGE_H),
        "Layer 1",
    );
    let font = builtin(&doc, BuiltinFont::Helvetica)?;
    let bold = builtin(&doc, BuiltinFont::HelveticaBold)?;

    let layer = doc.get_page(page1).get_layer(layer1);
    summary_page(&layer, report, pie_threshold_pct, &font, &bold);
    detail_pages(&doc, report, &font, &bold);

    let file = std::fs::File::create(path)?;
    doc.save(&mut BufWriter::new(file))
        .map_err(|e| MigratectlError::Report(format!("failed to save PDF: {}", e)))?;
    info!("Wrote PDF quote to {}", path.display());
    Ok(())
}

fn builtin(doc: &PdfDocumentReference, font: BuiltinFont) -> Result<IndirectFontRef> {
    doc.add_builtin_font(font)
        .map_err(|e| MigratectlError::Report(format!("failed to load PDF font: {}", e)))
}

fn summary_page(
    layer: &PdfLayerReference,
    report: &BatchReport,
    pie_threshold_pct: f64,
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let mut y = PAGE_H - 24.0;
    layer.set_fill_color(black());
    layer.use_text("AWS Migration Quote", 20.0, Mm(MARGIN), Mm(y), bold);
    y -= 8.0;
    layer.use_text(
        format!(
            "Region {}  |  generated {}",
            report.region,
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        9.0,
        Mm(MARGIN),
        Mm(y),
        font,
    );
    y -= 12.0;

    layer.use_text("Projected monthly costs (USD)", 12.0, Mm(MARGIN), Mm(y), bold);
    y -= 7.0;

    let totals = report.totals();
    let rows = [
        ("Hosts estimated", format!("{}", report.estimates.len())),
        ("Hosts failed", format!("{}", report.failures.len())),
        ("On-demand total", format_usd(totals.on_demand)),
        ("1-year reserved total", format_usd(totals.reserved_1yr)),
        ("3-year reserved total", format_usd(totals.reserved_3yr)),
        (
            "Storage total",
            format_usd(report.total_storage_monthly()),
        ),
    ];
    for (label, value) in rows {
        layer.use_text(label, 10.0, Mm(MARGIN), Mm(y), font);
        layer.use_text(value, 10.0, Mm(MARGIN + 60.0), Mm(y), font);
        y -= 6.0;
    }
    y -= 8.0;

    layer.use_text(
        "Cost share by instance type (3-year term)",
        12.0,
        Mm(MARGIN),
        Mm(y),
        bold,
    );

    let shares = report.cost_shares(pie_threshold_pct);
    if shares.is_empty() {
        layer.use_text("No priced hosts", 10.0, Mm(MARGIN), Mm(y - 8.0), font);
        return;
    }

    let total: f64 = shares.iter().map(|(_, c)| c).sum();
    let center_x = MARGIN + 40.0;
    let center_y = y - 55.0;
    let radius = 36.0;

    let mut start_angle = -PI / 2.0;
    for (idx, (_, cost)) in shares.iter().enumerate() {
        let sweep = cost / total * 2.0 * PI;
        let (r, g, b) = PALETTE[idx % PALETTE.len()];
        layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
        layer.set_outline_color(Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
        layer.add_shape(wedge(center_x, center_y, radius, start_angle, sweep));
        start_angle += sweep;
    }

    // Legend to the right of the chart
    let mut legend_y = y - 18.0;
    for (idx, (label, cost)) in shares.iter().enumerate() {
        let (r, g, b) = PALETTE[idx % PALETTE.len()];
        layer.set_fill_color(Color::Rgb(Rgb::new(r, g, b, None)));
        layer.add_shape(square(MARGIN + 92.0, legend_y, 3.5));
        layer.set_fill_color(black());
        layer.use_text(
            format!("{}  {:.1}%", label, cost / total * 100.0),
            9.0,
            Mm(MARGIN + 98.0),
            Mm(legend_y),
            font,
        );
        legend_y -= 6.0;
    }
}

fn detail_pages(
    doc: &PdfDocumentReference,
    report: &BatchReport,
    font: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    for (page_idx, chunk) in report.estimates.chunks(ROWS_PER_PAGE).enumerate() {
        let (page, layer_idx) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let layer = doc.get_page(page).get_layer(layer_idx);
        layer.set_fill_color(black());

        let mut y = PAGE_H - 20.0;
        layer.use_text(
            format!("Host detail ({})", page_idx + 1),
            12.0,
            Mm(MARGIN),
            Mm(y),
            bold,
        );
        y -= 8.0;
        header_row(&layer, y, bold);
        y -= 2.0;
        layer.set_outline_color(black());
        layer.set_outline_thickness(0.4);
        layer.add_shape(hline(MARGIN, PAGE_W - MARGIN, y));
        y -= ROW_HEIGHT;

        for est in chunk {
            let on_demand = format_usd(est.compute_monthly.on_demand);
            let reserved_1yr = format_usd(est.compute_monthly.reserved_1yr);
            let reserved_3yr = format_usd(est.compute_monthly.reserved_3yr);
            let total = format_usd(est.total_monthly.reserved_3yr);
            let cells = [
                est.host.as_str(),
                est.instance_type.as_str(),
                on_demand.as_str(),
                reserved_1yr.as_str(),
                reserved_3yr.as_str(),
                total.as_str(),
            ];
            text_row(&layer, y, &cells, font);
            y -= ROW_HEIGHT;
        }

        // Totals land on the last page only
        let is_last = (page_idx + 1) * ROWS_PER_PAGE >= report.estimates.len();
        if is_last {
            let totals = report.totals();
            layer.add_shape(hline(MARGIN, PAGE_W - MARGIN, y + ROW_HEIGHT - 1.5));
            let on_demand = format_usd(totals.on_demand);
            let reserved_1yr = format_usd(totals.reserved_1yr);
            let reserved_3yr = format_usd(totals.reserved_3yr);
            let cells = [
                "Total",
                "",
                on_demand.as_str(),
                reserved_1yr.as_str(),
                reserved_3yr.as_str(),
                reserved_3yr.as_str(),
            ];
            text_row(&layer, y, &cells, bold);
        }
    }
}

const COLUMNS: &[(f64, &str)] = &[
    (MARGIN, "VM"),
    (60.0, "Instance Type"),
    (95.0, "On-Demand"),
    (122.0, "1-Yr Reserved"),
    (152.0, "3-Yr Reserved"),
    (182.0, "Total (3-Yr)"),
];

fn header_row(layer: &PdfLayerReference, y: f64, bold: &IndirectFontRef) {
    for (x, title) in COLUMNS {
        layer.use_text(*title, 9.0, Mm(*x), Mm(y), bold);
    }
}

fn text_row(layer: &PdfLayerReference, y: f64, cells: &[&str; 6], font: &IndirectFontRef) {
    for ((x, _), cell) in COLUMNS.iter().zip(cells.iter()) {
        // Keep long VM names inside their column
        let text: String = cell.chars().take(26).collect();
        layer.use_text(text, 8.0, Mm(*x), Mm(y), font);
    }
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn hline(x1: f64, x2: f64, y: f64) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x1), Mm(y)), false),
            (Point::new(Mm(x2), Mm(y)), false),
        ],
        is_closed: false,
        has_fill: false,
        has_stroke: true,
        is_clipping_path: false,
    }
}

fn square(x: f64, y: f64, size: f64) -> Line {
    Line {
        points: vec![
            (Point::new(Mm(x), Mm(y)), false),
            (Point::new(Mm(x + size), Mm(y)), false),
            (Point::new(Mm(x + size), Mm(y + size)), false),
            (Point::new(Mm(x), Mm(y + size)), false),
        ],
        is_closed: true,
        has_fill: true,
        has_stroke: false,
        is_clipping_path: false,
    }
}

/// A filled pie wedge approximated with 3-degree arc segments.
fn wedge(cx: f64, cy: f64, radius: f64, start_angle: f64, sweep: f64) -> Line {
    let steps = ((sweep / (PI / 60.0)).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(steps + 2);
    points.push((Point::new(Mm(cx), Mm(cy)), false));
    for i in 0..=steps {
        let angle = start_angle + sweep * (i as f64 / steps as f64);
        points.push((
            Point::new(Mm(cx + radius * angle.cos()), Mm(cy + radius * angle.sin())),
            false,
        ));
    }
    Line {
        points,
        is_closed: true,
        has_fill: true,
        has_stroke: true,
        is_clipping_path: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostEstimate, TermCosts};
    use chrono::Utc;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn sample_report(hosts: usize) -> BatchReport {
        let estimates = (0..hosts)
            .map(|i| CostEstimate {
                host: format!("vm-{:03}", i),
                instance_type: if i % 2 == 0 { "m5.large" } else { "r5.xlarge" }.to_string(),
                compute_monthly: TermCosts {
                    on_demand: 70.0,
                    reserved_1yr: 49.0,
                    reserved_3yr: 35.0,
                },
                storage_gib: 50.0,
                storage_monthly: 4.0,
                total_monthly: TermCosts {
                    on_demand: 74.0,
                    reserved_1yr: 53.0,
                    reserved_3yr: 39.0,
                },
            })
            .collect();
        BatchReport {
            estimates,
            failures: Vec::new(),
            unpriced_types: HashMap::new(),
            region: "us-east-1".to_string(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn writes_a_nonempty_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quote.pdf");
        write_pdf(&path, &sample_report(5), 5.0).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn multi_page_reports_are_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quote.pdf");
        // Forces several detail pages
        write_pdf(&path, &sample_report(100), 5.0).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn empty_report_still_produces_a_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quote.pdf");
        write_pdf(&path, &sample_report(0), 5.0).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn wedge_points_stay_on_the_circle() {
        let w = wedge(50.0, 50.0, 10.0, 0.0, PI / 2.0);
        // First point is the center, the rest are on the arc
        assert!(w.is_closed && w.has_fill);
        assert!(w.points.len() >= 4);
    }
}
