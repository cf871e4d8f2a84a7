//! Upload validation configuration.

use serde::{Deserialize, Serialize};

/// Content rules applied to every upload before the quota check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum upload size in bytes (default 5 GiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Lower-cased extensions (without the dot) that are always rejected.
    #[serde(default = "default_blocked_extensions")]
    pub blocked_extensions: Vec<String>,
    /// Allowed content types. Entries may end in `/*`. Empty allows any type.
    #[serde(default)]
    pub allowed_content_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_size_bytes: default_max_upload(),
            blocked_extensions: default_blocked_extensions(),
            allowed_content_types: Vec::new(),
        }
    }
}

fn default_max_upload() -> u64 {
    5_368_709_120 // 5 GiB
}

fn default_blocked_extensions() -> Vec<String> {
    [
        "exe", "bat", "cmd", "com", "msi", "scr", "pif", "vbs", "js", "jar", "ps1", "sh", "dll",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}
