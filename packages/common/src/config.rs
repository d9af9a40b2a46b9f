use serde::Deserialize;

/// Connection settings for an S3-compatible object store.
#[derive(Debug, Deserialize, Clone)]
pub struct ObjectStoreConfig {
    /// Bucket holding the blobs.
    pub bucket: String,
    /// Region name. Default: "us-east-1".
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint (MinIO, R2, ...). When set, `region` is only a label.
    #[serde(default)]
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Key prefix inside the bucket. Default: "blobs".
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Use path-style addressing (required by most self-hosted stores). Default: true.
    #[serde(default = "default_path_style")]
    pub path_style: bool,
}

fn default_region() -> String {
    "us-east-1".into()
}
fn default_prefix() -> String {
    "blobs".into()
}
fn default_path_style() -> bool {
    true
}
