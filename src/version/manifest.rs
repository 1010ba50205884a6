// ─── Version Manifest ───
// Fetches and parses the published version manifest used by the vanilla
// install boundary.

use serde::Deserialize;
use tracing::info;

use crate::error::InstallerResult;

const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Top-level version manifest.
#[derive(Debug, Deserialize)]
pub struct VersionManifest {
    pub versions: Vec<VersionEntry>,
}

/// A single entry in the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionManifest {
    /// Fetch the manifest from the default endpoint using a shared HTTP client.
    pub async fn fetch(client: &reqwest::Client) -> InstallerResult<Self> {
        Self::fetch_from(client, VERSION_MANIFEST_URL).await
    }

    /// Fetch the manifest from an explicit endpoint.
    pub async fn fetch_from(client: &reqwest::Client, url: &str) -> InstallerResult<Self> {
        info!("Fetching version manifest from {}", url);

        let manifest: VersionManifest = client.get(url).send().await?.json().await?;

        info!("Loaded {} versions from manifest", manifest.versions.len());
        Ok(manifest)
    }

    /// Find a specific version entry by id (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}
