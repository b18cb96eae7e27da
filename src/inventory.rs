//! Spreadsheet inventory ingestion
//!
//! Reads an RVTools-style workbook: the `vCPU` sheet carries one row per VM
//! (name, CPU count, RAM in MiB, guest OS), the `vDisk` sheet one row per
//! virtual disk (VM name, capacity in MiB). Header columns are located by
//! case-insensitive substring match because RVTools column titles vary
//! between releases.
//!
//! All validation happens here, before any remote call: a missing sheet or
//! required column is fatal, as is a row whose numeric cells don't parse.
//! Disk capacities are summed per VM so a host with several virtual disks is
//! charged for all of them exactly once.

use crate::catalog::InstanceCatalog;
use crate::error::{MigratectlError, Result};
use calamine::{open_workbook_auto, Reader};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const VCPU_SHEET: &str = "vCPU";
pub const VDISK_SHEET: &str = "vDisk";

const MIB_PER_GIB: f64 = 1024.0;

/// One virtual machine from the inventory. Immutable once read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostRecord {
    pub name: String,
    pub cpus: u32,
    pub ram_gib: f64,
    pub disk_gib: f64,
    pub os: String,
}

/// Load the full inventory: hosts from the vCPU sheet with per-VM disk
/// totals folded in from the vDisk sheet.
pub fn load_inventory(path: &Path) -> Result<Vec<HostRecord>> {
    let mut workbook = open_workbook_auto(path)?;

    let host_grid = sheet_grid(&mut workbook, VCPU_SHEET)?;
    let disk_grid = sheet_grid(&mut workbook, VDISK_SHEET)?;

    let mut hosts = parse_hosts(&host_grid)?;
    let disk_totals = parse_disk_totals(&disk_grid)?;

    for host in &mut hosts {
        match disk_totals.get(&host.name) {
            Some(gib) => host.disk_gib = *gib,
            None => warn!("No disk records for {}, assuming diskless", host.name),
        }
    }

    if hosts.is_empty() {
        return Err(MigratectlError::InputValidation {
            field: VCPU_SHEET.to_string(),
            reason: "no host rows found".to_string(),
        });
    }

    debug!("Loaded {} hosts from {}", hosts.len(), path.display());
    Ok(hosts)
}

/// Raise host requirements to the smallest capacity the catalog offers.
/// A 1-vCPU VM still needs the smallest instance that exists.
pub fn clamp_to_catalog(hosts: &mut [HostRecord], catalog: &InstanceCatalog) {
    let min_vcpus = catalog.min_vcpus();
    let min_ram = catalog.min_ram_gib();
    for host in hosts {
        if host.cpus < min_vcpus {
            host.cpus = min_vcpus;
        }
        if host.ram_gib < min_ram {
            host.ram_gib = min_ram;
        }
    }
}

fn sheet_grid(
    workbook: &mut calamine::Sheets<std::io::BufReader<std::fs::File>>,
    sheet: &str,
) -> Result<Vec<Vec<String>>> {
    let range = workbook.worksheet_range(sheet)?;
    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
        .collect())
}

/// Find the leftmost column whose header contains one of the given titles,
/// case-insensitively.
pub fn find_column(headers: &[String], titles: &[&str]) -> Result<usize> {
    for title in titles {
        let needle = title.to_lowercase();
        for (idx, header) in headers.iter().enumerate() {
            if header.to_lowercase().contains(&needle) {
                return Ok(idx);
            }
        }
    }
    Err(MigratectlError::InputValidation {
        field: titles.join("/"),
        reason: format!(
            "no column header found containing any of {:?}; available: {}",
            titles,
            headers.join(", ")
        ),
    })
}

/// Parse the vCPU sheet into host records (disk sizes filled in later).
pub fn parse_hosts(grid: &[Vec<String>]) -> Result<Vec<HostRecord>> {
    let Some((headers, rows)) = grid.split_first() else {
        return Err(MigratectlError::InputValidation {
            field: VCPU_SHEET.to_string(),
            reason: "sheet is empty".to_string(),
        });
    };

    let vm_col = find_column(headers, &["VM"])?;
    let cpu_col = find_column(headers, &["CPUs"])?;
    let ram_col = find_column(headers, &["Max"])?;
    let os_col = find_column(headers, &["OS according to the configuration file", "OS"])?;

    let mut hosts = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let name = cell(row, vm_col);
        if name.is_empty() {
            continue;
        }
        let cpus = parse_count(&cell(row, cpu_col)).ok_or_else(|| row_error(row_idx, "CPUs"))?;
        let ram_mib = parse_number(&cell(row, ram_col)).ok_or_else(|| row_error(row_idx, "Max"))?;

        hosts.push(HostRecord {
            name,
            cpus,
            ram_gib: ram_mib / MIB_PER_GIB,
            disk_gib: 0.0,
            os: cell(row, os_col),
        });
    }
    Ok(hosts)
}

/// Parse the vDisk sheet into per-VM capacity totals in GiB.
pub fn parse_disk_totals(grid: &[Vec<String>]) -> Result<HashMap<String, f64>> {
    let Some((headers, rows)) = grid.split_first() else {
        return Err(MigratectlError::InputValidation {
            field: VDISK_SHEET.to_string(),
            reason: "sheet is empty".to_string(),
        });
    };

    let vm_col = find_column(headers, &["VM"])?;
    let capacity_col = find_column(headers, &["Capacity MiB", "Capacity MB", "Capacity"])?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let name = cell(row, vm_col);
        if name.is_empty() {
            continue;
        }
        let capacity_mib =
            parse_number(&cell(row, capacity_col)).ok_or_else(|| row_error(row_idx, "Capacity"))?;
        *totals.entry(name).or_insert(0.0) += capacity_mib / MIB_PER_GIB;
    }
    Ok(totals)
}

fn cell(row: &[String], col: usize) -> String {
    row.get(col).cloned().unwrap_or_default()
}

/// Numeric cells may carry thousands separators ("16,384").
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| *v >= 0.0)
}

fn parse_count(raw: &str) -> Option<u32> {
    parse_number(raw).map(|v| v.round() as u32)
}

fn row_error(row_idx: usize, field: &str) -> MigratectlError {
    MigratectlError::InputValidation {
        field: field.to_string(),
        // +2: one for the header row, one for 1-based spreadsheet rows
        reason: format!("row {} has a non-numeric {} cell", row_idx + 2, field),
    }
}
