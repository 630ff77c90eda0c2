//! Composition seam between the platform parsers and their callers.
//!
//! Each inventory kind is collected independently: a failure in one kind is
//! logged here and reported as [`Collected::Unavailable`] without affecting
//! the others.

use std::path::Path;

use sysinfo::System;
use tracing::{debug, error, info, warn};

use crate::hardware::error::{InventoryError, Result};
use crate::hardware::linux::Linux;
use crate::hardware::macos::Darwin;
use crate::hardware::platform::{InventoryConfig, Platform, ToolKind};
use crate::hardware::types::{CpuInfo, DiskInfo, GpuInfo, Inventory, MemoryInfo};
use crate::hardware::windows::Windows;

pub const ALL_KINDS: [ToolKind; 4] = [ToolKind::Disk, ToolKind::Cpu, ToolKind::Gpu, ToolKind::Memory];

/// What one platform knows how to read. `tool` is the resolved path for the
/// kind being collected.
pub trait PlatformInventory: Send + Sync {
    fn disks(&self, tool: &Path) -> Result<Vec<DiskInfo>>;
    fn cpu_name(&self, tool: &Path) -> Result<String>;
    fn gpus(&self, tool: &Path) -> Result<Vec<GpuInfo>>;
    fn memory(&self, tool: Option<&Path>) -> Result<MemoryInfo>;
}

fn backend(platform: Platform) -> &'static dyn PlatformInventory {
    match platform {
        Platform::Linux => &Linux,
        Platform::Darwin => &Darwin,
        Platform::Windows => &Windows,
    }
}

/// Outcome of one collection call. Lets callers tell "nothing there" apart
/// from "could not look".
#[derive(Debug)]
pub enum Collected<T> {
    Present(T),
    Unavailable(InventoryError),
}

impl<T> Collected<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Collected::Present(value) => Some(value),
            Collected::Unavailable(_) => None,
        }
    }
}

impl<T: Default> Collected<T> {
    pub fn unwrap_or_default(self) -> T {
        self.ok().unwrap_or_default()
    }
}

/// Fallback when the host exposes no core topology.
pub fn estimate_physical_cores(logical: usize) -> usize {
    if logical >= 2 {
        logical / 2
    } else {
        1
    }
}

pub struct Collector {
    config: InventoryConfig,
}

impl Collector {
    pub fn new(config: InventoryConfig) -> Self {
        Collector { config }
    }

    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    fn finish<T>(&self, kind: ToolKind, result: Result<T>) -> Collected<T> {
        match result {
            Ok(value) => Collected::Present(value),
            Err(err) => {
                error!(platform = %self.config.platform, %kind, error = %err, "inventory collection failed");
                Collected::Unavailable(err)
            }
        }
    }

    pub fn disks(&self) -> Collected<Vec<DiskInfo>> {
        let result = self
            .config
            .required_tool(ToolKind::Disk)
            .and_then(|tool| backend(self.config.platform).disks(&tool));
        self.finish(ToolKind::Disk, result)
    }

    pub fn cpu(&self) -> Collected<CpuInfo> {
        let result = self.read_cpu();
        self.finish(ToolKind::Cpu, result)
    }

    fn read_cpu(&self) -> Result<CpuInfo> {
        let mut sys = System::new();
        sys.refresh_cpu_all();

        // A tool that can't be resolved fails the call; only a tool that ran
        // without naming the CPU falls back to the sysinfo brand.
        let tool = self.config.required_tool(ToolKind::Cpu)?;
        let name = match backend(self.config.platform).cpu_name(&tool) {
            Ok(name) => name,
            Err(err @ (InventoryError::NotFound(_) | InventoryError::Parse { .. })) => {
                let brand = sys.cpus().first().map(|cpu| cpu.brand().trim().to_string());
                match brand.filter(|brand| !brand.is_empty()) {
                    Some(brand) => {
                        warn!(error = %err, "CPU name missing from tool output, using sysinfo brand");
                        brand
                    }
                    None => return Err(err),
                }
            }
            Err(err) => return Err(err),
        };

        let logical_cores = match sys.cpus().len() {
            0 => std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
            count => count,
        };
        let physical_cores = sys
            .physical_core_count()
            .filter(|&count| count > 0)
            .unwrap_or_else(|| estimate_physical_cores(logical_cores));

        Ok(CpuInfo {
            name,
            logical_cores,
            physical_cores,
        })
    }

    pub fn gpu(&self) -> Collected<Vec<GpuInfo>> {
        let result = self
            .config
            .required_tool(ToolKind::Gpu)
            .and_then(|tool| backend(self.config.platform).gpus(&tool));
        self.finish(ToolKind::Gpu, result)
    }

    pub fn memory(&self) -> Collected<MemoryInfo> {
        let result = self
            .config
            .tool_path(ToolKind::Memory)
            .and_then(|tool| backend(self.config.platform).memory(tool.as_deref()));
        if let Ok(memory) = &result {
            debug!(keys = ?memory.keys(), "memory collected");
        }
        self.finish(ToolKind::Memory, result)
    }

    /// Collect the requested kinds in parallel. Unrequested kinds are left
    /// out of the result; failed ones degrade to their empty value.
    pub fn collect_kinds(&self, kinds: &[ToolKind]) -> Inventory {
        let wants = |kind: ToolKind| kinds.contains(&kind);

        let ((disks, cpu), (gpu, memory)) = rayon::join(
            || {
                rayon::join(
                    || wants(ToolKind::Disk).then(|| self.disks().unwrap_or_default()),
                    || wants(ToolKind::Cpu).then(|| self.cpu().unwrap_or_default()),
                )
            },
            || {
                rayon::join(
                    || wants(ToolKind::Gpu).then(|| self.gpu().unwrap_or_default()),
                    || wants(ToolKind::Memory).then(|| self.memory().unwrap_or_default()),
                )
            },
        );

        Inventory {
            disks,
            cpu,
            gpu,
            memory,
        }
    }
}

pub fn collect_full_inventory(collector: &Collector) -> Inventory {
    info!(platform = %collector.config().platform, "collecting full inventory");
    collector.collect_kinds(&ALL_KINDS)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::hardware::types::Mountpoints;

    const LSBLK_JSON: &str = r#"{"blockdevices": [
        {"name": "sda", "size": "500G", "type": "disk", "model": "Test Disk", "mountpoint": null,
         "children": [
            {"name": "sda1", "size": "1G", "type": "part", "mountpoint": "/boot"},
            {"name": "sda2", "size": "499G", "type": "part", "mountpoint": "/"}]},
        {"name": "loop0", "size": "50M", "type": "loop", "mountpoint": "/snap/x"}
    ]}"#;

    const LSPCI: &str = "00:02.0 VGA compatible controller: Intel Corporation HD Graphics 630 (rev 04)\n";

    const CPUINFO: &str = "processor\t: 0\nmodel name\t: Test CPU @ 3.00GHz\n";

    const MEMINFO: &str = "MemTotal: 8000000 kB\nMemFree: 1000000 kB\nMemAvailable: 3000000 kB\nSwapTotal: 0 kB\nSwapFree: 0 kB\n";

    fn present<T>(collected: Collected<T>) -> T {
        match collected {
            Collected::Present(value) => value,
            Collected::Unavailable(err) => panic!("expected a value, got {err}"),
        }
    }

    fn in_order(collector: &Collector, kinds: &[ToolKind]) -> Inventory {
        let wants = |kind: ToolKind| kinds.contains(&kind);
        Inventory {
            disks: wants(ToolKind::Disk).then(|| collector.disks().unwrap_or_default()),
            cpu: wants(ToolKind::Cpu).then(|| collector.cpu().unwrap_or_default()),
            gpu: wants(ToolKind::Gpu).then(|| collector.gpu().unwrap_or_default()),
            memory: wants(ToolKind::Memory).then(|| collector.memory().unwrap_or_default()),
        }
    }

    /// Writes fake host tools into a temp dir and points a Linux config at them.
    fn fixture() -> (TempDir, InventoryConfig) {
        let dir = tempfile::tempdir().unwrap();

        let script = |name: &str, output: &str| -> PathBuf {
            let path = dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\ncat <<'END_OF_OUTPUT'\n{}\nEND_OF_OUTPUT\n", output)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path
        };
        let disk_lib = script("lsblk", LSBLK_JSON);
        let gpu_lib = script("lspci", LSPCI);

        let cpu_lib = dir.path().join("cpuinfo");
        fs::write(&cpu_lib, CPUINFO).unwrap();
        let mem_lib = dir.path().join("meminfo");
        fs::write(&mem_lib, MEMINFO).unwrap();

        let config = InventoryConfig::new(Platform::Linux)
            .with_override(ToolKind::Disk, Some(disk_lib))
            .with_override(ToolKind::Gpu, Some(gpu_lib))
            .with_override(ToolKind::Cpu, Some(cpu_lib))
            .with_override(ToolKind::Memory, Some(mem_lib));
        (dir, config)
    }

    #[test]
    fn test_physical_core_estimate() {
        assert_eq!(estimate_physical_cores(0), 1);
        assert_eq!(estimate_physical_cores(1), 1);
        assert_eq!(estimate_physical_cores(2), 1);
        assert_eq!(estimate_physical_cores(16), 8);
    }

    #[test]
    fn test_each_kind_through_fake_tools() {
        let (_dir, config) = fixture();
        let collector = Collector::new(config);

        let disks = present(collector.disks());
        assert_eq!(disks.len(), 1);
        assert_eq!(disks[0].mountpoints, Mountpoints::Joined("/boot, /".into()));

        let cpu = present(collector.cpu());
        assert_eq!(cpu.name, "Test CPU @ 3.00GHz");
        assert!(cpu.logical_cores >= 1);
        assert!(cpu.physical_cores >= 1);

        let gpus = present(collector.gpu());
        assert_eq!(gpus[0].vendor.as_deref(), Some("Intel"));

        let memory = present(collector.memory());
        assert_eq!(memory.used, Some((8_000_000 - 1_000_000 - 3_000_000) * 1024));
    }

    #[test]
    fn test_missing_tool_degrades_only_that_kind() {
        let (_dir, config) = fixture();
        let config = config.with_override(ToolKind::Disk, Some(PathBuf::from("/nonexistent/lsblk")));
        let collector = Collector::new(config);

        let disks = collector.disks();
        assert!(matches!(disks, Collected::Unavailable(InventoryError::ToolNotFound { .. })));
        assert!(disks.unwrap_or_default().is_empty());
        assert!(matches!(collector.memory(), Collected::Present(_)));
    }

    #[test]
    fn test_windows_memory_failure_is_empty_record() {
        // the native query always fails off Windows
        let collector = Collector::new(InventoryConfig::new(Platform::Windows));
        let memory = collector.memory();
        assert!(matches!(memory, Collected::Unavailable(InventoryError::NativeCall(_))));
        assert!(memory.unwrap_or_default().keys().is_empty());
    }

    #[test]
    fn test_windows_memory_ignores_memory_override() {
        let config = InventoryConfig::new(Platform::Windows)
            .with_override(ToolKind::Memory, Some(PathBuf::from("/nonexistent/meminfo")));
        let memory = Collector::new(config).memory();
        // reaches the native query instead of failing on the unused path
        assert!(matches!(memory, Collected::Unavailable(InventoryError::NativeCall(_))));
    }

    #[test]
    fn test_missing_cpu_override_is_unavailable() {
        let (_dir, config) = fixture();
        let config = config.with_override(ToolKind::Cpu, Some(PathBuf::from("/nonexistent/cpuinfo")));
        let cpu = Collector::new(config).cpu();
        assert!(matches!(cpu, Collected::Unavailable(InventoryError::ToolNotFound { kind: ToolKind::Cpu, .. })));
        assert_eq!(cpu.unwrap_or_default(), CpuInfo::default());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let (_dir, config) = fixture();
        let collector = Collector::new(config);

        let parallel = collect_full_inventory(&collector);
        let sequential = in_order(&collector, &ALL_KINDS);

        assert_eq!(parallel.disks, sequential.disks);
        assert_eq!(parallel.cpu, sequential.cpu);
        assert_eq!(parallel.gpu, sequential.gpu);
        assert_eq!(parallel.memory, sequential.memory);
    }

    #[test]
    fn test_collect_selected_kinds_only() {
        let (_dir, config) = fixture();
        let inventory = Collector::new(config).collect_kinds(&[ToolKind::Cpu, ToolKind::Memory]);
        assert!(inventory.disks.is_none());
        assert!(inventory.gpu.is_none());
        assert!(inventory.cpu.is_some());
        assert!(inventory.memory.is_some());

        let json = serde_json::to_value(&inventory).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 2);
    }
}
