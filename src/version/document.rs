// ─── Version Document ───
// Parses the version metadata document shipped inside an installer package
// (or fetched from the published manifest) and writes it to the version
// store under `<root>/versions/<id>/<id>.json`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{InstallerError, InstallerResult};

/// A parsed version metadata document.
///
/// Only the fields the install pipeline consumes are modelled; the raw
/// document text is carried alongside so the version store receives a
/// byte-for-byte copy.
#[derive(Debug, Deserialize)]
pub struct VersionDocument {
    pub id: String,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
}

/// A library dependency: a Maven coordinate plus optional explicit
/// download metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub url: String,
}

impl LibraryEntry {
    /// Explicit download URL, when the entry carries one.
    ///
    /// Loader profiles use an empty `url` to mark artifacts shipped inside
    /// the installer package itself; those are treated as having none.
    pub fn explicit_url(&self) -> Option<&str> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .map(|a| a.url.as_str())
            .filter(|u| !u.is_empty())
    }

    pub fn sha1(&self) -> Option<&str> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.sha1.as_deref())
    }
}

impl VersionDocument {
    pub fn from_json(raw: &str) -> InstallerResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Write the document to the version store.
    ///
    /// The raw text is copied verbatim unless `custom_id` is given, in which
    /// case the `id` field is rewritten and the document re-serialized.
    /// Returns the effective id and the path written.
    pub async fn write_to_store(
        raw: &str,
        root: &Path,
        custom_id: Option<&str>,
    ) -> InstallerResult<(String, PathBuf)> {
        let (id, contents) = match custom_id {
            Some(custom) => {
                let mut value: serde_json::Value = serde_json::from_str(raw)?;
                value["id"] = serde_json::Value::String(custom.to_string());
                (custom.to_string(), serde_json::to_string_pretty(&value)?)
            }
            None => {
                let doc = Self::from_json(raw)?;
                (doc.id, raw.to_string())
            }
        };

        let dest = root.join("versions").join(&id).join(format!("{id}.json"));
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| InstallerError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        tokio::fs::write(&dest, contents)
            .await
            .map_err(|e| InstallerError::Io {
                path: dest.clone(),
                source: e,
            })?;

        info!("Wrote version document {} to {:?}", id, dest);
        Ok((id, dest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_document() {
        let doc = VersionDocument::from_json(r#"{"id":"test-1.20"}"#).unwrap();
        assert_eq!(doc.id, "test-1.20");
        assert!(doc.libraries.is_empty());
    }

    #[test]
    fn parse_library_with_downloads() {
        let json = r#"{
            "id": "1.20.1",
            "libraries": [
                {
                    "name": "com.google.code.gson:gson:2.10",
                    "downloads": {
                        "artifact": {
                            "path": "com/google/code/gson/gson/2.10/gson-2.10.jar",
                            "sha1": "dd9b193aef96e973d5a11ab13cd17430c2e4306b",
                            "size": 286235,
                            "url": "https://libraries.minecraft.net/com/google/code/gson/gson/2.10/gson-2.10.jar"
                        }
                    }
                },
                { "name": "net.minecraftforge:forge:1.20.1-47.2.0:universal" }
            ]
        }"#;
        let doc = VersionDocument::from_json(json).unwrap();
        assert_eq!(doc.libraries.len(), 2);
        assert!(doc.libraries[0].explicit_url().is_some());
        assert!(doc.libraries[0].sha1().is_some());
        assert!(doc.libraries[1].explicit_url().is_none());
    }

    #[tokio::test]
    async fn write_verbatim_and_with_override() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = "{\"id\":\"test-1.20\",\n  \"libraries\": []}";

        let (id, path) = VersionDocument::write_to_store(raw, tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(id, "test-1.20");
        assert_eq!(
            path,
            tmp.path().join("versions/test-1.20/test-1.20.json")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);

        let (id, path) = VersionDocument::write_to_store(raw, tmp.path(), Some("custom"))
            .await
            .unwrap();
        assert_eq!(id, "custom");
        let rewritten: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rewritten["id"], "custom");
    }
}
