//! macOS sources: `diskutil`, `sysctl` and `system_profiler`.
//!
//! `diskutil info -all` prints one colon separated block per disk, partition
//! and volume, each closed by a `**********` line. Physical disks are picked
//! from those blocks, then every mounted volume is attributed back to the
//! physical disk it lives on. APFS volumes usually name their parent through
//! `Part of Whole`, but read-only system snapshots only reveal it through the
//! `APFS Physical Store` reference.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::hardware::collector::PlatformInventory;
use crate::hardware::command::run_stdout;
use crate::hardware::error::{InventoryError, Result};
use crate::hardware::types::{DiskInfo, GpuInfo, MemoryInfo, Mountpoints};
use crate::hardware::units::{byte_count, bytes_to_human, human_to_bytes};

const RECORD_DELIMITER: &str = "**********";
const SYSTEM_VOLUMES: &str = "/System/Volumes/";
const SYSCTL_MEMORY_KEYS: [&str; 5] = [
    "hw.memsize",
    "hw.pagesize",
    "vm.page_free_count",
    "vm.page_purgeable_count",
    "vm.swapusage",
];

static DISK_SIZE_BYTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+) Bytes\)").expect("Invalid disk size regex"));

pub type InfoBlock = HashMap<String, String>;

pub struct Darwin;

impl PlatformInventory for Darwin {
    fn disks(&self, tool: &Path) -> Result<Vec<DiskInfo>> {
        let info = run_stdout(tool, &["info", "-all"])?;
        let listing = run_stdout(tool, &["list"])?;
        Ok(parse_disks(&info, &listing))
    }

    fn cpu_name(&self, tool: &Path) -> Result<String> {
        let name = run_stdout(tool, &["-n", "machdep.cpu.brand_string"])?;
        let name = name.trim();
        if name.is_empty() {
            return Err(InventoryError::NotFound("CPU brand string"));
        }
        Ok(name.to_string())
    }

    fn gpus(&self, tool: &Path) -> Result<Vec<GpuInfo>> {
        parse_displays(&run_stdout(tool, &["SPDisplaysDataType", "-json"])?)
    }

    fn memory(&self, tool: Option<&Path>) -> Result<MemoryInfo> {
        let tool = tool.ok_or(InventoryError::NotFound("sysctl"))?;
        parse_sysctl_memory(&run_stdout(tool, &SYSCTL_MEMORY_KEYS)?)
    }
}

/// Split `diskutil info -all` output into one map per record.
///
/// A final record that is not closed by a delimiter is still returned.
pub fn parse_info_blocks(text: &str) -> Vec<InfoBlock> {
    let mut blocks = Vec::new();
    let mut current = InfoBlock::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == RECORD_DELIMITER {
            blocks.push(std::mem::take(&mut current));
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => {
                current.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => debug!(line, "ignoring diskutil line without a key"),
        }
    }

    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Device paths of the physical disks in `diskutil list` output.
pub fn physical_device_ids(listing: &str) -> impl Iterator<Item = &str> + '_ {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| line.contains("physical") && line.starts_with("/dev/disk"))
        .filter_map(|line| line.split_whitespace().next())
}

/// Byte count from a field like `"500.3 GB (500277790720 Bytes)"`, 0 if absent.
pub fn parse_disk_size(field: &str) -> u64 {
    DISK_SIZE_BYTES
        .captures(field)
        .and_then(|caps| caps.get(1))
        .and_then(|bytes| bytes.as_str().parse().ok())
        .unwrap_or(0)
}

/// Attribute every user visible mountpoint to a tracked physical disk.
pub fn update_mountpoints(blocks: &[InfoBlock], device_mounts: &mut HashMap<String, Vec<String>>) {
    for block in blocks {
        let Some(mount_point) = block.get("Mount Point").filter(|m| !m.is_empty()) else {
            continue;
        };
        if mount_point.starts_with(SYSTEM_VOLUMES) {
            continue;
        }

        if let Some(points) = block
            .get("Part of Whole")
            .and_then(|parent| device_mounts.get_mut(parent))
        {
            points.push(mount_point.clone());
            continue;
        }

        let read_only = block
            .get("Volume Read-Only")
            .map_or(false, |value| value.contains("Yes"));
        if !read_only {
            continue;
        }
        let store = block.get("APFS Physical Store").map(String::as_str).unwrap_or("");
        for (device_id, points) in device_mounts.iter_mut() {
            if store.starts_with(device_id.as_str()) {
                points.push(mount_point.clone());
            }
        }
    }
}

/// Physical disks from `diskutil info -all` and `diskutil list` output.
pub fn parse_disks(info_text: &str, listing_text: &str) -> Vec<DiskInfo> {
    let blocks = parse_info_blocks(info_text);
    let physical_ids: Vec<&str> = physical_device_ids(listing_text).collect();

    let mut disks = Vec::new();
    let mut device_mounts: HashMap<String, Vec<String>> = HashMap::new();

    for block in &blocks {
        let node = block.get("Device Node");
        let is_physical = block.get("Virtual").map(String::as_str) == Some("No")
            || node.map_or(false, |node| physical_ids.contains(&node.as_str()));
        if !is_physical {
            continue;
        }

        let Some(identifier) = block.get("Device Identifier") else {
            warn!(?node, "physical disk without a device identifier");
            continue;
        };
        if device_mounts.contains_key(identifier) {
            continue;
        }
        device_mounts.insert(identifier.clone(), Vec::new());

        let size = parse_disk_size(block.get("Disk Size").map(String::as_str).unwrap_or(""));
        disks.push(DiskInfo {
            name: block.get("Device / Media Name").cloned().unwrap_or_default(),
            size: bytes_to_human(size),
            device_id: identifier.clone(),
            mountpoints: Mountpoints::List(Vec::new()),
            node: node.cloned(),
        });
    }

    update_mountpoints(&blocks, &mut device_mounts);

    for disk in &mut disks {
        let points = device_mounts.remove(&disk.device_id).unwrap_or_default();
        disk.mountpoints = Mountpoints::List(points);
    }
    disks
}

/// `key: value` lines of a multi-key `sysctl` call.
pub fn parse_sysctl(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

fn sysctl_number(values: &HashMap<String, String>, key: &str) -> Result<u64> {
    match values.get(key) {
        Some(value) => {
            let number: i64 = value
                .parse()
                .map_err(|_| InventoryError::parse("sysctl", format!("{} = {:?}", key, value)))?;
            Ok(byte_count(number)?)
        }
        None => {
            warn!(key, "sysctl key missing, assuming 0");
            Ok(0)
        }
    }
}

/// `(total, used, free)` from `total = 2048.00M  used = 1024.50M  free = 1023.50M  (encrypted)`.
pub fn parse_swap_usage(text: &str) -> Result<(u64, u64, u64)> {
    let field = |name: &str| -> Result<u64> {
        let marker = format!("{} = ", name);
        match text.split_once(marker.as_str()) {
            Some((_, rest)) => {
                let value = rest.split_whitespace().next().unwrap_or("");
                Ok(human_to_bytes(value)?)
            }
            None => Ok(0),
        }
    };
    Ok((field("total")?, field("used")?, field("free")?))
}

pub fn parse_sysctl_memory(text: &str) -> Result<MemoryInfo> {
    let values = parse_sysctl(text);

    let total = sysctl_number(&values, "hw.memsize")?;
    let page_size = sysctl_number(&values, "hw.pagesize")?;
    let free_pages = sysctl_number(&values, "vm.page_free_count")?;
    let purgeable_pages = sysctl_number(&values, "vm.page_purgeable_count")?;

    let free = free_pages.saturating_mul(page_size);
    let available = free_pages
        .saturating_add(purgeable_pages)
        .saturating_mul(page_size);
    let (swap_total, swap_used, swap_free) = match values.get("vm.swapusage") {
        Some(line) => parse_swap_usage(line)?,
        None => (0, 0, 0),
    };

    Ok(MemoryInfo {
        total: Some(total),
        free: Some(free),
        used: Some(total.saturating_sub(free)),
        available: Some(available),
        swap_total: Some(swap_total),
        swap_used: Some(swap_used),
        swap_free: Some(swap_free),
        ..Default::default()
    })
}

#[derive(Debug, Deserialize)]
struct SystemProfiler {
    #[serde(rename = "SPDisplaysDataType", default)]
    displays: Vec<DisplayEntry>,
}

#[derive(Debug, Deserialize)]
struct DisplayEntry {
    sppci_model: Option<String>,
    sppci_vendor: Option<String>,
}

/// GPUs from `system_profiler SPDisplaysDataType -json`.
pub fn parse_displays(json: &str) -> Result<Vec<GpuInfo>> {
    let profile: SystemProfiler = serde_json::from_str(json)?;
    Ok(profile
        .displays
        .into_iter()
        .filter_map(|display| {
            let name = display.sppci_model?;
            let vendor = display
                .sppci_vendor
                .map(|vendor| vendor.trim_start_matches("sppci_vendor_").to_string());
            Some(GpuInfo { name, vendor })
        })
        .collect())
}
