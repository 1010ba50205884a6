use async_trait::async_trait;
use tracing::info;

use crate::downloader::LibraryScheduler;
use crate::error::{InstallerError, InstallerResult};
use crate::maven::MOJANG_LIBRARIES;
use crate::version::{VersionDocument, VersionManifest};

use super::context::InstallContext;
use super::progress::{InstallStage, ProgressEvent};
use super::{InstallResult, LoaderInstaller};

/// Vanilla "installer" — a single metadata fetch plus a bulk download,
/// with no processor chain.
pub struct VanillaInstaller {
    client: reqwest::Client,
}

impl VanillaInstaller {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LoaderInstaller for VanillaInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> InstallerResult<InstallResult> {
        info!("Installing vanilla {}", ctx.minecraft_version);

        ctx.progress.stage(InstallStage::ExtractingMetadata);
        let manifest = VersionManifest::fetch(&self.client).await?;
        let entry = manifest.find_version(ctx.minecraft_version).ok_or_else(|| {
            InstallerError::Other(format!(
                "Version {} not found in manifest",
                ctx.minecraft_version
            ))
        })?;

        let raw = self
            .client
            .get(&entry.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let document = VersionDocument::from_json(&raw)?;

        let (version_id, _) =
            VersionDocument::write_to_store(&raw, ctx.root, ctx.custom_id).await?;
        ctx.progress.emit(ProgressEvent::MetadataExtracted {
            version_id: version_id.clone(),
        });

        ctx.progress.stage(InstallStage::DownloadingLibraries);
        let libraries_dir = ctx.libraries_dir();
        let scheduler = LibraryScheduler::new(ctx.downloader, &libraries_dir)
            .with_primary_repo(MOJANG_LIBRARIES)
            .with_strict_verify(ctx.options.strict_verify);
        let report = scheduler.schedule(&[&document.libraries]).await?;
        ctx.progress.emit(ProgressEvent::LibrariesDownloaded {
            completed: report.completed,
            skipped: report.skipped,
            failed: report.failures.len(),
        });

        ctx.progress.stage(InstallStage::Done);

        let stderr: Vec<String> = report
            .failures
            .iter()
            .map(|f| format!("Failed to download {}: {}", f.coordinate, f.error))
            .collect();
        let success = report.all_succeeded();
        let message = if success {
            format!("Successfully installed {version_id}")
        } else {
            format!("Failed to install {version_id}")
        };

        Ok(InstallResult {
            success,
            message,
            stdout: Vec::new(),
            stderr,
        })
    }
}
