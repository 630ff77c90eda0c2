//! Host platform detection and tool path resolution.
//!
//! The platform is resolved once at start-up into an [`InventoryConfig`]
//! that is handed to the collector. Each inventory kind then resolves its
//! tool path in order: explicit override, lowercase environment variable,
//! uppercase environment variable, platform default.

use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::hardware::error::{InventoryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Linux,
    Darwin,
    Windows,
}

impl Platform {
    /// The platform this binary is running on.
    pub fn current() -> Result<Self> {
        Self::from_os_name(env::consts::OS)
    }

    pub fn from_os_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "darwin" => Ok(Platform::Darwin),
            "windows" => Ok(Platform::Windows),
            other => Err(InventoryError::UnsupportedPlatform(other.to_string())),
        }
    }

    fn default_tool(self, kind: ToolKind) -> Option<DefaultTool> {
        use DefaultTool::{Binary, File};

        match (self, kind) {
            (Platform::Linux, ToolKind::Disk) => Some(Binary("lsblk", "/usr/bin/lsblk")),
            (Platform::Linux, ToolKind::Cpu) => Some(File("/proc/cpuinfo")),
            (Platform::Linux, ToolKind::Gpu) => Some(Binary("lspci", "/usr/bin/lspci")),
            (Platform::Linux, ToolKind::Memory) => Some(File("/proc/meminfo")),

            (Platform::Darwin, ToolKind::Disk) => Some(Binary("diskutil", "/usr/sbin/diskutil")),
            (Platform::Darwin, ToolKind::Cpu) => Some(Binary("sysctl", "/usr/sbin/sysctl")),
            (Platform::Darwin, ToolKind::Gpu) => {
                Some(Binary("system_profiler", "/usr/sbin/system_profiler"))
            }
            (Platform::Darwin, ToolKind::Memory) => Some(Binary("sysctl", "/usr/sbin/sysctl")),

            (Platform::Windows, ToolKind::Disk) => {
                Some(Binary("pwsh", "C:\\Program Files\\PowerShell\\7\\pwsh.exe"))
            }
            (Platform::Windows, ToolKind::Cpu) | (Platform::Windows, ToolKind::Gpu) => {
                Some(Binary("wmic", "C:\\Windows\\System32\\wbem\\wmic.exe"))
            }
            // GlobalMemoryStatusEx, no external tool
            (Platform::Windows, ToolKind::Memory) => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Linux => write!(f, "linux"),
            Platform::Darwin => write!(f, "darwin"),
            Platform::Windows => write!(f, "windows"),
        }
    }
}

/// An independently queryable hardware category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Disk,
    Cpu,
    Gpu,
    Memory,
}

impl ToolKind {
    /// Environment variables consulted for this kind, lowercase first.
    pub fn env_names(self) -> [&'static str; 2] {
        match self {
            ToolKind::Disk => ["disk_lib", "DISK_LIB"],
            ToolKind::Cpu => ["cpu_lib", "CPU_LIB"],
            ToolKind::Gpu => ["gpu_lib", "GPU_LIB"],
            ToolKind::Memory => ["mem_lib", "MEM_LIB"],
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolKind::Disk => write!(f, "Disk"),
            ToolKind::Cpu => write!(f, "CPU"),
            ToolKind::Gpu => write!(f, "GPU"),
            ToolKind::Memory => write!(f, "Memory"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DefaultTool {
    /// Looked up on PATH, else the absolute fallback.
    Binary(&'static str, &'static str),
    /// A fixed file such as `/proc/meminfo`.
    File(&'static str),
}

impl DefaultTool {
    fn resolve(self, path_var: Option<OsString>) -> PathBuf {
        match self {
            DefaultTool::File(path) => PathBuf::from(path),
            DefaultTool::Binary(name, fallback) => path_var
                .and_then(|paths| find_on_path(name, &paths))
                .unwrap_or_else(|| PathBuf::from(fallback)),
        }
    }
}

fn find_on_path(name: &str, paths: &OsString) -> Option<PathBuf> {
    let candidates: Vec<String> = if cfg!(windows) {
        vec![format!("{}.exe", name), name.to_string()]
    } else {
        vec![name.to_string()]
    };

    env::split_paths(paths).find_map(|dir| {
        candidates
            .iter()
            .map(|candidate| dir.join(candidate))
            .find(|full| full.is_file())
    })
}

/// Immutable settings shared by every collection call.
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub platform: Platform,
    pub disk_lib: Option<PathBuf>,
    pub cpu_lib: Option<PathBuf>,
    pub gpu_lib: Option<PathBuf>,
    pub mem_lib: Option<PathBuf>,
}

impl InventoryConfig {
    pub fn new(platform: Platform) -> Self {
        InventoryConfig {
            platform,
            disk_lib: None,
            cpu_lib: None,
            gpu_lib: None,
            mem_lib: None,
        }
    }

    /// Detect the host platform; the only fatal error in the crate.
    pub fn detect() -> Result<Self> {
        Ok(Self::new(Platform::current()?))
    }

    pub fn with_override(mut self, kind: ToolKind, path: Option<PathBuf>) -> Self {
        let slot = match kind {
            ToolKind::Disk => &mut self.disk_lib,
            ToolKind::Cpu => &mut self.cpu_lib,
            ToolKind::Gpu => &mut self.gpu_lib,
            ToolKind::Memory => &mut self.mem_lib,
        };
        *slot = path;
        self
    }

    pub fn override_for(&self, kind: ToolKind) -> Option<&Path> {
        match kind {
            ToolKind::Disk => self.disk_lib.as_deref(),
            ToolKind::Cpu => self.cpu_lib.as_deref(),
            ToolKind::Gpu => self.gpu_lib.as_deref(),
            ToolKind::Memory => self.mem_lib.as_deref(),
        }
    }

    /// Resolve the tool for `kind` against the process environment.
    pub fn tool_path(&self, kind: ToolKind) -> Result<Option<PathBuf>> {
        self.tool_path_with(kind, |name| env::var_os(name))
    }

    /// Resolution with an injectable environment, `Ok(None)` when the
    /// platform needs no tool for this kind.
    pub fn tool_path_with<F>(&self, kind: ToolKind, lookup: F) -> Result<Option<PathBuf>>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        // Nothing to resolve, overrides included.
        let Some(default) = self.platform.default_tool(kind) else {
            return Ok(None);
        };

        let from_env = || {
            kind.env_names()
                .into_iter()
                .filter_map(|name| lookup(name))
                .find(|value| !value.is_empty())
                .map(PathBuf::from)
        };

        let resolved = match self.override_for(kind) {
            Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
            _ => from_env().unwrap_or_else(|| default.resolve(lookup("PATH"))),
        };

        if resolved.is_file() {
            Ok(Some(resolved))
        } else {
            Err(InventoryError::ToolNotFound { kind, path: resolved })
        }
    }

    /// Like [`tool_path`](Self::tool_path) for kinds that always need a tool.
    pub fn required_tool(&self, kind: ToolKind) -> Result<PathBuf> {
        self.tool_path(kind)?.ok_or(InventoryError::NotFound("inventory tool"))
    }
}
