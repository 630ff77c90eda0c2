//! Linux sources: `lsblk -J`, `/proc/meminfo`, `/proc/cpuinfo` and `lspci`.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::hardware::collector::PlatformInventory;
use crate::hardware::command::{read_text, run_stdout};
use crate::hardware::error::{InventoryError, Result};
use crate::hardware::types::{DiskInfo, GpuInfo, MemoryInfo, Mountpoints};

const LSBLK_ARGS: [&str; 3] = ["-o", "NAME,SIZE,TYPE,MODEL,MOUNTPOINT", "-J"];

const GPU_CLASSES: [&str; 3] = ["VGA compatible controller", "3D controller", "Display controller"];

pub struct Linux;

impl PlatformInventory for Linux {
    fn disks(&self, tool: &Path) -> Result<Vec<DiskInfo>> {
        parse_lsblk(&run_stdout(tool, &LSBLK_ARGS)?)
    }

    fn cpu_name(&self, tool: &Path) -> Result<String> {
        parse_cpu_name(read_text(tool)?.lines())
    }

    fn gpus(&self, tool: &Path) -> Result<Vec<GpuInfo>> {
        Ok(parse_lspci(&run_stdout(tool, &[])?))
    }

    fn memory(&self, tool: Option<&Path>) -> Result<MemoryInfo> {
        let tool = tool.ok_or(InventoryError::NotFound("meminfo source"))?;
        Ok(parse_meminfo(read_text(tool)?.lines()))
    }
}

#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<BlockDevice>,
}

#[derive(Debug, Deserialize)]
struct BlockDevice {
    name: String,
    #[serde(default)]
    size: Option<SizeField>,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, alias = "mountpoints")]
    mountpoint: Option<MountField>,
    #[serde(default)]
    children: Vec<BlockDevice>,
}

/// `lsblk` prints sizes as text ("500G") unless asked for bytes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeField {
    Text(String),
    Bytes(u64),
}

/// Older `lsblk` reports one mountpoint, newer releases a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MountField {
    One(String),
    Many(Vec<Option<String>>),
}

impl MountField {
    fn into_points(self) -> Vec<String> {
        let points = match self {
            MountField::One(point) => vec![point],
            MountField::Many(points) => points.into_iter().flatten().collect(),
        };
        points
            .into_iter()
            .map(|point| point.trim().to_string())
            .filter(|point| !point.is_empty())
            .collect()
    }
}

/// Physical disks from `lsblk -o NAME,SIZE,TYPE,MODEL,MOUNTPOINT -J`.
pub fn parse_lsblk(json: &str) -> Result<Vec<DiskInfo>> {
    let output: LsblkOutput = serde_json::from_str(json)?;

    let disks = output
        .blockdevices
        .into_iter()
        .filter(|device| device.kind == "disk")
        .map(|device| {
            let mut mountpoints: Vec<String> = Vec::new();
            for child in device.children {
                for point in child.mountpoint.map(MountField::into_points).unwrap_or_default() {
                    if !mountpoints.contains(&point) {
                        mountpoints.push(point);
                    }
                }
            }
            if mountpoints.is_empty() {
                mountpoints = device.mountpoint.map(MountField::into_points).unwrap_or_default();
            }

            let size = match device.size {
                Some(SizeField::Text(text)) => text,
                Some(SizeField::Bytes(bytes)) => bytes.to_string(),
                None => String::new(),
            };

            DiskInfo {
                name: device
                    .model
                    .map(|model| model.trim().to_string())
                    .filter(|model| !model.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                size,
                device_id: device.name,
                mountpoints: Mountpoints::joined(&mountpoints),
                node: None,
            }
        })
        .collect();

    Ok(disks)
}

/// Memory buckets from `/proc/meminfo` lines, KiB converted to bytes.
pub fn parse_meminfo<I, S>(lines: I) -> MemoryInfo
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut total = 0u64;
    let mut free = 0u64;
    let mut available = 0u64;
    let mut swap_total = 0u64;
    let mut swap_free = 0u64;

    for line in lines {
        let mut parts = line.as_ref().split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let slot = match key.trim_end_matches(':') {
            "MemTotal" => &mut total,
            "MemFree" => &mut free,
            "MemAvailable" => &mut available,
            "SwapTotal" => &mut swap_total,
            "SwapFree" => &mut swap_free,
            _ => continue,
        };
        match value.parse::<u64>() {
            Ok(kib) => *slot = kib.saturating_mul(1024),
            Err(_) => warn!(key, value, "skipping unparsable meminfo value"),
        }
    }

    MemoryInfo {
        total: Some(total),
        free: Some(free),
        used: Some(total.saturating_sub(free).saturating_sub(available)),
        available: Some(available),
        swap_total: Some(swap_total),
        swap_used: Some(swap_total.saturating_sub(swap_free)),
        swap_free: Some(swap_free),
        ..Default::default()
    }
}

/// Value of the first `model name` line in `/proc/cpuinfo`.
pub fn parse_cpu_name<I, S>(lines: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .find(|line| line.as_ref().contains("model name"))
        .and_then(|line| {
            line.as_ref()
                .split_once(':')
                .map(|(_, name)| name.trim().to_string())
        })
        .ok_or(InventoryError::NotFound("CPU model name"))
}

/// Display controllers from plain `lspci` output.
pub fn parse_lspci(text: &str) -> Vec<GpuInfo> {
    text.lines()
        .filter_map(|line| {
            // "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620 (rev 07)"
            let (_, rest) = line.trim().split_once(' ')?;
            let (class, name) = rest.split_once(": ")?;
            if !GPU_CLASSES.iter().any(|known| class.contains(known)) {
                return None;
            }
            let name = name.trim().to_string();
            Some(GpuInfo {
                vendor: vendor_from_name(&name),
                name,
            })
        })
        .collect()
}

fn vendor_from_name(name: &str) -> Option<String> {
    let lower = name.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    let has_word = |word: &str| words.contains(&word);

    let vendor = if has_word("nvidia") {
        "NVIDIA"
    } else if lower.contains("advanced micro devices") || has_word("amd") || has_word("ati") {
        "AMD"
    } else if has_word("intel") {
        "Intel"
    } else {
        return None;
    };
    Some(vendor.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSBLK_JSON: &str = r#"{
       "blockdevices": [
          {"name": "loop0", "size": "55.7M", "type": "loop", "model": null, "mountpoint": "/snap/core18/2128"},
          {"name": "sda", "size": "465.8G", "type": "disk", "model": "Samsung SSD 860", "mountpoint": null,
             "children": [
                {"name": "sda1", "size": "512M", "type": "part", "model": null, "mountpoint": "/boot"},
                {"name": "sda2", "size": "465.3G", "type": "part", "model": null, "mountpoint": "/"}
             ]
          },
          {"name": "sdb", "size": "1.8T", "type": "disk", "model": "WDC WD20EZRZ", "mountpoint": null,
             "children": [
                {"name": "sdb1", "size": "1.8T", "type": "part", "model": null, "mountpoint": null}
             ]
          },
          {"name": "sdc", "size": "7.5G", "type": "disk", "model": null, "mountpoint": "/media/usb"}
       ]
    }"#;

    #[test]
    fn test_lsblk_keeps_only_disks() {
        let disks = parse_lsblk(LSBLK_JSON).unwrap();
        let ids: Vec<&str> = disks.iter().map(|d| d.device_id.as_str()).collect();
        assert_eq!(ids, vec!["sda", "sdb", "sdc"]);
    }

    #[test]
    fn test_lsblk_children_mountpoints_are_joined() {
        let disks = parse_lsblk(LSBLK_JSON).unwrap();
        assert_eq!(disks[0].mountpoints, Mountpoints::Joined("/boot, /".into()));
        assert_eq!(disks[0].name, "Samsung SSD 860");
        assert_eq!(disks[0].size, "465.8G");
    }

    #[test]
    fn test_lsblk_two_children_in_order() {
        let json = r#"{"blockdevices": [{"name": "nvme0n1", "size": "500G", "type": "disk", "model": "X",
            "mountpoint": null, "children": [
                {"name": "nvme0n1p1", "size": "499G", "type": "part", "mountpoint": "/"},
                {"name": "nvme0n1p2", "size": "1G", "type": "part", "mountpoint": "/boot"}]}]}"#;
        let disks = parse_lsblk(json).unwrap();
        assert_eq!(disks[0].mountpoints, Mountpoints::Joined("/, /boot".into()));
    }

    #[test]
    fn test_lsblk_unmounted_disk_reports_sentinel() {
        let disks = parse_lsblk(LSBLK_JSON).unwrap();
        assert_eq!(disks[1].mountpoints, Mountpoints::Joined("Not Mounted".into()));
    }

    #[test]
    fn test_lsblk_falls_back_to_own_mountpoint() {
        let disks = parse_lsblk(LSBLK_JSON).unwrap();
        assert_eq!(disks[2].mountpoints, Mountpoints::Joined("/media/usb".into()));
        assert_eq!(disks[2].name, "Unknown");
    }

    #[test]
    fn test_lsblk_mountpoint_list_and_byte_sizes() {
        let json = r#"{"blockdevices": [{"name": "vda", "size": 21474836480, "type": "disk",
            "mountpoints": [null, "/srv", ""]}]}"#;
        let disks = parse_lsblk(json).unwrap();
        assert_eq!(disks[0].size, "21474836480");
        assert_eq!(disks[0].mountpoints, Mountpoints::Joined("/srv".into()));
    }

    #[test]
    fn test_lsblk_rejects_garbage() {
        assert!(matches!(parse_lsblk("not json"), Err(InventoryError::Json(_))));
    }

    #[test]
    fn test_meminfo_used_is_computed() {
        let lines = [
            "MemTotal:       16000000 kB",
            "MemFree:         2000000 kB",
            "MemAvailable:    4000000 kB",
            "Buffers:          300000 kB",
            "SwapTotal:       2000000 kB",
            "SwapFree:        1500000 kB",
        ];
        let memory = parse_meminfo(lines);
        assert_eq!(memory.total, Some(16_000_000 * 1024));
        assert_eq!(memory.free, Some(2_000_000 * 1024));
        assert_eq!(memory.available, Some(4_000_000 * 1024));
        assert_eq!(memory.used, Some((16_000_000 - 2_000_000 - 4_000_000) * 1024));
        assert_eq!(memory.swap_used, Some(500_000 * 1024));
    }

    #[test]
    fn test_meminfo_key_set_and_defaults() {
        let memory = parse_meminfo(["MemTotal: 1024 kB"]);
        assert_eq!(
            memory.keys(),
            vec!["total", "free", "used", "available", "swap_total", "swap_used", "swap_free"]
        );
        assert_eq!(memory.free, Some(0));
        assert_eq!(memory.used, Some(1024 * 1024));
    }

    #[test]
    fn test_meminfo_used_never_negative() {
        let memory = parse_meminfo(["MemTotal: 100 kB", "MemFree: 80 kB", "MemAvailable: 90 kB"]);
        assert_eq!(memory.used, Some(0));
    }

    #[test]
    fn test_meminfo_saturates_on_huge_values() {
        let memory = parse_meminfo(["MemTotal: 18446744073709551615 kB"]);
        assert_eq!(memory.total, Some(u64::MAX));
        assert_eq!(memory.used, Some(u64::MAX));
    }

    #[test]
    fn test_cpu_name() {
        let lines = [
            "processor\t: 0",
            "vendor_id\t: GenuineIntel",
            "model name\t: Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz",
            "model name\t: ignored",
        ];
        assert_eq!(parse_cpu_name(lines).unwrap(), "Intel(R) Core(TM) i7-8650U CPU @ 1.90GHz");
    }

    #[test]
    fn test_cpu_name_missing() {
        let err = parse_cpu_name(["processor : 0", "BogoMIPS : 48.00"]).unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[test]
    fn test_lspci_display_controllers() {
        let text = "\
00:00.0 Host bridge: Intel Corporation Xeon E3-1200 v6/7th Gen Core Processor Host Bridge (rev 08)
00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620 (rev 07)
01:00.0 3D controller: NVIDIA Corporation GP108M [GeForce MX150] (rev a1)
02:00.0 Network controller: Intel Corporation Wireless 8265 / 8275 (rev 78)
";
        let gpus = parse_lspci(text);
        assert_eq!(gpus.len(), 2);
        assert_eq!(gpus[0].name, "Intel Corporation UHD Graphics 620 (rev 07)");
        assert_eq!(gpus[0].vendor.as_deref(), Some("Intel"));
        assert_eq!(gpus[1].vendor.as_deref(), Some("NVIDIA"));
    }

    #[test]
    fn test_lspci_vendor_needs_whole_word() {
        let text = "\
03:00.0 VGA compatible controller: Advanced Micro Devices, Inc. [AMD/ATI] Navi 23 [Radeon RX 6600] (rev c7)
04:00.0 VGA compatible controller: Camden Graphics Adapter
05:00.0 Display controller: Matrox Electronics Systems Ltd. G200eR2 (rev 01)
";
        let gpus = parse_lspci(text);
        assert_eq!(gpus.len(), 3);
        assert_eq!(gpus[0].vendor.as_deref(), Some("AMD"));
        assert_eq!(gpus[1].vendor, None);
        assert_eq!(gpus[2].vendor, None);
    }
}
