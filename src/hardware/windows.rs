//! Windows sources: PowerShell CIM queries, `wmic` and `GlobalMemoryStatusEx`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{error, warn};

use crate::hardware::collector::PlatformInventory;
use crate::hardware::command::{run_stdout, run_tool};
use crate::hardware::error::{InventoryError, Result};
use crate::hardware::types::{DiskInfo, GpuInfo, MemoryInfo, Mountpoints};
use crate::hardware::units::bytes_to_human;

const DISK_DRIVE_QUERY: &str = "Get-CimInstance Win32_DiskDrive | Select-Object Caption, DeviceID, Model, Partitions, Size | ConvertTo-Json";

const PARTITION_SCRIPT: &str = r#"
        Get-PhysicalDisk | ForEach-Object {
            $disk = $_
            $partitions = Get-Partition -DiskNumber $disk.DeviceID
            $partitions | ForEach-Object {
                [PSCustomObject]@{
                    DiskNumber = $disk.DeviceID
                    Partition = $_.PartitionNumber
                    DriveLetter = (Get-Volume -Partition $_).DriveLetter
                    MountPoint = (Get-Volume -Partition $_).DriveLetter
                }
            }
        }
        "#;

const VIDEO_CONTROLLER_ARGS: [&str; 5] = [
    "path",
    "win32_VideoController",
    "get",
    "Name,AdapterCompatibility",
    "/format:csv",
];

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*[mGKF]").expect("Invalid ANSI escape regex"));

pub struct Windows;

impl PlatformInventory for Windows {
    fn disks(&self, tool: &Path) -> Result<Vec<DiskInfo>> {
        let drives = parse_disk_drives(&run_stdout(tool, &["-Command", DISK_DRIVE_QUERY])?)?;
        let mounts = partition_mounts(tool);
        Ok(join_mountpoints(drives, &mounts))
    }

    fn cpu_name(&self, tool: &Path) -> Result<String> {
        parse_wmic_cpu(&run_stdout(tool, &["cpu", "get", "name"])?)
    }

    fn gpus(&self, tool: &Path) -> Result<Vec<GpuInfo>> {
        Ok(parse_video_controllers(&run_stdout(tool, &VIDEO_CONTROLLER_ARGS)?))
    }

    fn memory(&self, _tool: Option<&Path>) -> Result<MemoryInfo> {
        Ok(memory_from_status(&query_memory_status()?))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Debug, Deserialize)]
struct Win32DiskDrive {
    #[serde(rename = "DeviceID")]
    device_id: String,
    #[serde(rename = "Model", default)]
    model: Option<String>,
    #[serde(rename = "Size", default)]
    size: Option<u64>,
}

/// A `Win32_DiskDrive` record with the disk number used to find its volumes.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowsDrive {
    pub disk_number: String,
    pub disk: DiskInfo,
}

/// `\\.\PHYSICALDRIVE12` -> `12`.
fn disk_number(device_id: &str) -> String {
    let digits: String = device_id
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if digits.is_empty() {
        device_id.chars().last().map(String::from).unwrap_or_default()
    } else {
        digits
    }
}

/// Drives from `Win32_DiskDrive | ConvertTo-Json`, which prints a bare object
/// for a single disk and an array otherwise.
pub fn parse_disk_drives(json: &str) -> Result<Vec<WindowsDrive>> {
    let drives = match serde_json::from_str::<OneOrMany<Win32DiskDrive>>(json)? {
        OneOrMany::Many(drives) => drives,
        OneOrMany::One(drive) => vec![drive],
    };

    Ok(drives
        .into_iter()
        .map(|drive| WindowsDrive {
            disk_number: disk_number(&drive.device_id),
            disk: DiskInfo {
                name: drive.model.unwrap_or_default(),
                size: bytes_to_human(drive.size.unwrap_or(0)),
                device_id: drive.device_id.replace(['\\', '.'], ""),
                mountpoints: Mountpoints::joined(&[]),
                node: None,
            },
        })
        .collect())
}

pub fn strip_ansi(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRow {
    pub disk_number: String,
    pub partition_number: String,
    pub drive_letter: String,
}

/// Rows of the partition script's table output. Partitions without a drive
/// letter have fewer than four columns and are dropped.
pub fn parse_partition_table(text: &str) -> Vec<PartitionRow> {
    strip_ansi(text)
        .lines()
        .filter(|line| !line.starts_with("DiskNumber") && !line.starts_with('-'))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(PartitionRow {
                disk_number: parts[0].to_string(),
                partition_number: parts[1].to_string(),
                drive_letter: parts[3].to_string(),
            })
        })
        .collect()
}

/// Disk number -> `["C:\\", "D:\\"]`.
pub fn mount_map(rows: &[PartitionRow]) -> HashMap<String, Vec<String>> {
    let mut mounts: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        mounts
            .entry(row.disk_number.clone())
            .or_default()
            .push(format!("{}:\\", row.drive_letter));
    }
    mounts
}

fn partition_mounts(tool: &Path) -> HashMap<String, Vec<String>> {
    let output = match run_tool(tool, &["-Command", PARTITION_SCRIPT]) {
        Ok(output) => output,
        Err(err) => {
            error!(error = %err, "partition enumeration failed");
            return HashMap::new();
        }
    };
    if !output.stderr.trim().is_empty() {
        error!(stderr = %output.stderr.trim(), "partition enumeration reported errors");
        return HashMap::new();
    }

    let rows = parse_partition_table(&output.stdout);
    if rows.is_empty() {
        warn!("no disks or partitions found");
    }
    mount_map(&rows)
}

pub fn join_mountpoints(drives: Vec<WindowsDrive>, mounts: &HashMap<String, Vec<String>>) -> Vec<DiskInfo> {
    drives
        .into_iter()
        .map(|drive| {
            let points = mounts.get(&drive.disk_number).map(Vec::as_slice).unwrap_or(&[]);
            DiskInfo {
                mountpoints: Mountpoints::joined(points),
                ..drive.disk
            }
        })
        .collect()
}

/// `wmic cpu get name` prints a `Name` header followed by the value.
pub fn parse_wmic_cpu(text: &str) -> Result<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .map(str::to_string)
        .ok_or(InventoryError::NotFound("CPU name"))
}

/// `Node,AdapterCompatibility,Name` CSV rows from `wmic`.
pub fn parse_video_controllers(csv: &str) -> Vec<GpuInfo> {
    csv.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Node,"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 3 {
                return None;
            }
            let name = parts[2..].join(",").trim().to_string();
            if name.is_empty() {
                return None;
            }
            let vendor = Some(parts[1].trim().to_string()).filter(|v| !v.is_empty());
            Some(GpuInfo { name, vendor })
        })
        .collect()
}

/// The fields of `MEMORYSTATUSEX` the inventory reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStatus {
    pub total_phys: u64,
    pub avail_phys: u64,
    pub total_virtual: u64,
    pub avail_virtual: u64,
}

pub fn memory_from_status(status: &MemoryStatus) -> MemoryInfo {
    MemoryInfo {
        total: Some(status.total_phys),
        available: Some(status.avail_phys),
        used: Some(status.total_phys.saturating_sub(status.avail_phys)),
        virtual_total: Some(status.total_virtual),
        virtual_available: Some(status.avail_virtual),
        ..Default::default()
    }
}

#[cfg(target_os = "windows")]
fn query_memory_status() -> Result<MemoryStatus> {
    use windows_sys::Win32::System::SystemInformation::{GlobalMemoryStatusEx, MEMORYSTATUSEX};

    // SAFETY: MEMORYSTATUSEX is plain data, all-zero is a valid value.
    let mut status: MEMORYSTATUSEX = unsafe { std::mem::zeroed() };
    status.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;

    // SAFETY: `status` is a live, correctly sized MEMORYSTATUSEX.
    if unsafe { GlobalMemoryStatusEx(&mut status) } == 0 {
        return Err(InventoryError::NativeCall(
            std::io::Error::last_os_error().to_string(),
        ));
    }

    Ok(MemoryStatus {
        total_phys: status.ullTotalPhys,
        avail_phys: status.ullAvailPhys,
        total_virtual: status.ullTotalVirtual,
        avail_virtual: status.ullAvailVirtual,
    })
}

#[cfg(not(target_os = "windows"))]
fn query_memory_status() -> Result<MemoryStatus> {
    Err(InventoryError::NativeCall(
        "GlobalMemoryStatusEx is only available on Windows".to_string(),
    ))
}
