use serde::{Deserialize, Serialize};

/// Bytes per reported gigabyte (binary, 1024^3).
pub const GB_DIVISOR: f64 = 1_073_741_824.0;

/// Capacity snapshot of one volume, or of several summed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiskSpaceInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub used_bytes: u64,
    #[serde(rename = "totalSpaceGB")]
    pub total_space_gb: f64,
    #[serde(rename = "freeSpaceGB")]
    pub free_space_gb: f64,
    #[serde(rename = "usedSpaceGB")]
    pub used_space_gb: f64,
    pub usage_percent: f64,
}

impl DiskSpaceInfo {
    /// Derives every figure from raw totals. `free_bytes` is clamped to `total_bytes`.
    pub fn from_bytes(total_bytes: u64, free_bytes: u64) -> Self {
        let free_bytes = free_bytes.min(total_bytes);
        let used_bytes = total_bytes - free_bytes;
        let usage_percent = if total_bytes == 0 {
            0.0
        } else {
            (used_bytes as f64 / total_bytes as f64 * 100.0).clamp(0.0, 100.0)
        };
        Self {
            total_bytes,
            free_bytes,
            used_bytes,
            total_space_gb: total_bytes as f64 / GB_DIVISOR,
            free_space_gb: free_bytes as f64 / GB_DIVISOR,
            used_space_gb: used_bytes as f64 / GB_DIVISOR,
            usage_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_free_volume_is_75_percent_used() {
        let info = DiskSpaceInfo::from_bytes(1_000_000_000_000, 250_000_000_000);
        assert_eq!(info.used_bytes, 750_000_000_000);
        assert_eq!(info.usage_percent, 75.0);
    }

    #[test]
    fn empty_volume_reports_zero_usage() {
        let info = DiskSpaceInfo::from_bytes(0, 0);
        assert_eq!(info.usage_percent, 0.0);
        assert_eq!(info.used_bytes, 0);
    }

    #[test]
    fn free_above_total_is_clamped() {
        let info = DiskSpaceInfo::from_bytes(100, 500);
        assert_eq!(info.free_bytes, 100);
        assert_eq!(info.used_bytes + info.free_bytes, info.total_bytes);
        assert_eq!(info.usage_percent, 0.0);
    }

    #[test]
    fn gigabytes_are_binary() {
        let info = DiskSpaceInfo::from_bytes(2 * 1024 * 1024 * 1024, 1024 * 1024 * 1024);
        assert_eq!(info.total_space_gb, 2.0);
        assert_eq!(info.free_space_gb, 1.0);
        assert_eq!(info.used_space_gb, 1.0);
    }

    #[test]
    fn serializes_gb_fields_in_upper_case() {
        let json = serde_json::to_value(DiskSpaceInfo::from_bytes(10, 5)).unwrap();
        assert!(json.get("totalSpaceGB").is_some());
        assert!(json.get("usedSpaceGB").is_some());
        assert!(json.get("freeSpaceGB").is_some());
        assert_eq!(json["usagePercent"], 50.0);
    }
}
