// ─── Installer Package ───
// Reads the mod-loader installer archive: the two metadata documents, the
// binary patch blobs, and the loader's own packaged jars.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::{InstallerError, InstallerResult};
use crate::profile::InstallProfile;
use crate::version::VersionDocument;

const VERSION_ENTRY: &str = "version.json";
const PROFILE_ENTRY: &str = "install_profile.json";

/// An opened installer package, fully buffered in memory.
pub struct InstallerPackage {
    path: PathBuf,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl InstallerPackage {
    pub async fn open(path: &Path) -> InstallerResult<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| InstallerError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry lookup is by exact case-insensitive full name.
    fn entry_name(&self, want: &str) -> Option<String> {
        self.archive
            .file_names()
            .find(|name| name.eq_ignore_ascii_case(want))
            .map(str::to_string)
    }

    fn read_required(&mut self, want: &str) -> InstallerResult<Vec<u8>> {
        let name = self
            .entry_name(want)
            .ok_or_else(|| InstallerError::MissingPackageEntry(want.to_string()))?;
        let mut entry = self.archive.by_name(&name)?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    fn read_optional(&mut self, want: &str) -> InstallerResult<Option<Vec<u8>>> {
        match self.entry_name(want) {
            Some(name) => {
                let mut entry = self.archive.by_name(&name)?;
                let mut bytes = Vec::new();
                entry.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Parse the version metadata document, keeping the raw text so the
    /// version store receives a verbatim copy.
    pub fn read_version_document(&mut self) -> InstallerResult<(VersionDocument, String)> {
        let bytes = self.read_required(VERSION_ENTRY)?;
        let raw = String::from_utf8(bytes)
            .map_err(|e| InstallerError::Profile(format!("{VERSION_ENTRY} is not UTF-8: {e}")))?;
        let document = VersionDocument::from_json(&raw)?;
        Ok((document, raw))
    }

    pub fn read_install_profile(&mut self) -> InstallerResult<InstallProfile> {
        let bytes = self.read_required(PROFILE_ENTRY)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Write the packaged binary patch blobs to the library store at their
    /// classified coordinate paths. Missing blobs are tolerated.
    pub fn extract_patch_binaries(
        &mut self,
        profile: &InstallProfile,
        libraries_dir: &Path,
    ) -> InstallerResult<()> {
        let loader = profile.loader_artifact();
        for (entry, classifier) in [
            ("data/client.lzma", "clientdata"),
            ("data/server.lzma", "serverdata"),
        ] {
            let Some(bytes) = self.read_optional(entry)? else {
                debug!("Package carries no {}", entry);
                continue;
            };
            let artifact = loader.with_classifier(classifier).with_packaging("lzma");
            let dest = libraries_dir.join(artifact.local_path());
            write_file(&dest, &bytes)?;
            info!("Extracted {} to {:?}", entry, dest);
        }
        Ok(())
    }

    /// Write the loader's packaged distribution jars (main and `-universal`)
    /// to the library store. Missing jars are tolerated.
    pub fn extract_loader_jars(
        &mut self,
        profile: &InstallProfile,
        libraries_dir: &Path,
    ) -> InstallerResult<()> {
        let loader = profile.loader_artifact();
        for artifact in [loader.clone(), loader.with_classifier("universal")] {
            let entry = format!("maven/{}", artifact.repo_path());
            let Some(bytes) = self.read_optional(&entry)? else {
                debug!("Package carries no {}", entry);
                continue;
            };
            let dest = libraries_dir.join(artifact.local_path());
            write_file(&dest, &bytes)?;
            info!("Extracted {} to {:?}", entry, dest);
        }
        Ok(())
    }
}

fn write_file(dest: &Path, bytes: &[u8]) -> InstallerResult<()> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| InstallerError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(dest, bytes).map_err(|e| InstallerError::Io {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    pub(crate) fn build_package(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub(crate) async fn open_package(dir: &Path, bytes: &[u8]) -> InstallerPackage {
        let path = dir.join("installer.jar");
        std::fs::write(&path, bytes).unwrap();
        InstallerPackage::open(&path).await.unwrap()
    }

    const PROFILE_JSON: &[u8] = br#"{"version":"1.20.1-forge-47.2.0"}"#;

    #[tokio::test]
    async fn locates_entries_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = build_package(&[
            ("VERSION.JSON", br#"{"id":"1.20.1"}"#),
            ("Install_Profile.json", PROFILE_JSON),
        ]);
        let mut package = open_package(tmp.path(), &bytes).await;

        let (document, raw) = package.read_version_document().unwrap();
        assert_eq!(document.id, "1.20.1");
        assert_eq!(raw, r#"{"id":"1.20.1"}"#);

        let profile = package.read_install_profile().unwrap();
        assert_eq!(profile.loader_version(), "1.20.1-47.2.0");
    }

    #[tokio::test]
    async fn missing_required_entry_is_structural() {
        let tmp = tempfile::tempdir().unwrap();
        let bytes = build_package(&[("version.json", br#"{"id":"1.20.1"}"#)]);
        let mut package = open_package(tmp.path(), &bytes).await;

        let err = package.read_install_profile().unwrap_err();
        assert!(
            matches!(err, InstallerError::MissingPackageEntry(ref name) if name == "install_profile.json")
        );
    }

    #[tokio::test]
    async fn patch_binaries_land_at_classified_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let libs = tmp.path().join("libraries");
        let bytes = build_package(&[
            ("install_profile.json", PROFILE_JSON),
            ("data/client.lzma", b"client-patch"),
        ]);
        let mut package = open_package(tmp.path(), &bytes).await;
        let profile = package.read_install_profile().unwrap();

        // server.lzma absent: tolerated
        package.extract_patch_binaries(&profile, &libs).unwrap();

        let client = libs.join(
            "net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-clientdata.lzma",
        );
        assert_eq!(std::fs::read(client).unwrap(), b"client-patch");
        assert!(!libs
            .join("net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-serverdata.lzma")
            .exists());
    }

    #[tokio::test]
    async fn loader_jars_land_at_coordinate_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let libs = tmp.path().join("libraries");
        let bytes = build_package(&[
            ("install_profile.json", PROFILE_JSON),
            (
                "maven/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0.jar",
                b"loader-jar",
            ),
            (
                "maven/net/minecraftforge/forge/1.20.1-47.2.0/forge-1.20.1-47.2.0-universal.jar",
                b"universal-jar",
            ),
        ]);
        let mut package = open_package(tmp.path(), &bytes).await;
        let profile = package.read_install_profile().unwrap();

        package.extract_loader_jars(&profile, &libs).unwrap();

        let base = libs.join("net/minecraftforge/forge/1.20.1-47.2.0");
        assert_eq!(
            std::fs::read(base.join("forge-1.20.1-47.2.0.jar")).unwrap(),
            b"loader-jar"
        );
        assert_eq!(
            std::fs::read(base.join("forge-1.20.1-47.2.0-universal.jar")).unwrap(),
            b"universal-jar"
        );
    }
}
