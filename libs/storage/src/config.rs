use serde::{Deserialize, Serialize};

/// Where the ingest server's recorder leaves finished broadcasts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Fs {
        #[serde(default = "default_fs_root")]
        root: String,
    },
    /// AWS S3 or any S3 compatible bucket
    S3 {
        bucket: String,
        #[serde(default = "default_s3_root")]
        root: String,
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key_id: Option<String>,
        #[serde(default)]
        secret_access_key: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Fs {
            root: default_fs_root(),
        }
    }
}

fn default_fs_root() -> String {
    "./recordings".to_string()
}

fn default_s3_root() -> String {
    "/".to_string()
}
