use serde::Serialize;

use crate::hardware::units::bytes_to_human;

/// Marker reported for a disk with no mounted filesystem.
pub const NOT_MOUNTED: &str = "Not Mounted";

#[derive(Debug, Default, Serialize)]
pub struct Inventory {
    #[serde(rename = "Disks", skip_serializing_if = "Option::is_none")]
    pub disks: Option<Vec<DiskInfo>>,
    #[serde(rename = "CPU", skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuInfo>,
    #[serde(rename = "GPU", skip_serializing_if = "Option::is_none")]
    pub gpu: Option<Vec<GpuInfo>>,
    #[serde(rename = "Memory", skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskInfo {
    pub name: String,
    pub size: String,
    pub device_id: String,
    pub mountpoints: Mountpoints,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

/// Linux and Windows report a comma separated string, macOS a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Mountpoints {
    Joined(String),
    List(Vec<String>),
}

impl Mountpoints {
    pub fn joined(points: &[String]) -> Self {
        if points.is_empty() {
            Mountpoints::Joined(NOT_MOUNTED.to_string())
        } else {
            Mountpoints::Joined(points.join(", "))
        }
    }
}

impl std::fmt::Display for Mountpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mountpoints::Joined(text) => write!(f, "{}", text),
            Mountpoints::List(points) if points.is_empty() => write!(f, "{}", NOT_MOUNTED),
            Mountpoints::List(points) => write!(f, "{}", points.join(", ")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CpuInfo {
    pub name: String,
    pub logical_cores: usize,
    pub physical_cores: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

/// Memory buckets in bytes. Which keys are present depends on the platform:
/// absent keys are skipped on output rather than written as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryInfo<V = u64> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_total: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_used: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_free: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_total: Option<V>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtual_available: Option<V>,
}

impl<V> MemoryInfo<V> {
    /// Names of the keys that carry a value, in output order.
    pub fn keys(&self) -> Vec<&'static str> {
        let fields = [
            ("total", self.total.is_some()),
            ("free", self.free.is_some()),
            ("used", self.used.is_some()),
            ("available", self.available.is_some()),
            ("swap_total", self.swap_total.is_some()),
            ("swap_used", self.swap_used.is_some()),
            ("swap_free", self.swap_free.is_some()),
            ("virtual_total", self.virtual_total.is_some()),
            ("virtual_available", self.virtual_available.is_some()),
        ];
        fields
            .into_iter()
            .filter(|(_, present)| *present)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn map<W>(&self, f: impl Fn(&V) -> W) -> MemoryInfo<W> {
        MemoryInfo {
            total: self.total.as_ref().map(&f),
            free: self.free.as_ref().map(&f),
            used: self.used.as_ref().map(&f),
            available: self.available.as_ref().map(&f),
            swap_total: self.swap_total.as_ref().map(&f),
            swap_used: self.swap_used.as_ref().map(&f),
            swap_free: self.swap_free.as_ref().map(&f),
            virtual_total: self.virtual_total.as_ref().map(&f),
            virtual_available: self.virtual_available.as_ref().map(&f),
        }
    }
}

impl MemoryInfo<u64> {
    pub fn to_human(&self) -> MemoryInfo<String> {
        self.map(|bytes| bytes_to_human(*bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mountpoints_sentinel_and_join() {
        assert_eq!(Mountpoints::joined(&[]), Mountpoints::Joined("Not Mounted".into()));
        assert_eq!(
            Mountpoints::joined(&["/".to_string(), "/boot".to_string()]),
            Mountpoints::Joined("/, /boot".into())
        );
        assert_eq!(Mountpoints::List(vec![]).to_string(), "Not Mounted");
    }

    #[test]
    fn test_memory_skips_absent_keys() {
        let memory = MemoryInfo {
            total: Some(2048),
            available: Some(1024),
            used: Some(1024),
            ..Default::default()
        };
        assert_eq!(memory.keys(), vec!["total", "used", "available"]);

        let json = serde_json::to_value(&memory).unwrap();
        assert_eq!(json, serde_json::json!({"total": 2048, "used": 1024, "available": 1024}));
    }

    #[test]
    fn test_memory_to_human() {
        let memory = MemoryInfo {
            total: Some(1536),
            ..Default::default()
        };
        assert_eq!(memory.to_human().total.as_deref(), Some("1.5 KB"));
        assert!(memory.to_human().free.is_none());
    }

    #[test]
    fn test_disk_serialization_omits_missing_node() {
        let disk = DiskInfo {
            name: "Samsung SSD".into(),
            size: "500G".into(),
            device_id: "sda".into(),
            mountpoints: Mountpoints::Joined("/".into()),
            node: None,
        };
        let json = serde_json::to_value(&disk).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys.len(), 4);
        assert!(!keys.contains(&"node"));
    }
}
