// ─── Mod-Loader Install Pipeline ───
// Composes package extraction, profile transformation, library downloads
// and processor execution into the end-to-end install operation.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::downloader::LibraryScheduler;
use crate::error::InstallerResult;
use crate::profile::{materialize, StaticBindings};
use crate::version::VersionDocument;

use super::context::InstallContext;
use super::package::InstallerPackage;
use super::processor::ProcessorExecutor;
use super::progress::{InstallStage, ProgressEvent};
use super::{InstallResult, LoaderInstaller};

/// Installs a mod loader from a downloaded installer package.
pub struct ModLoaderInstaller {
    package_path: PathBuf,
}

impl ModLoaderInstaller {
    pub fn new(package_path: impl Into<PathBuf>) -> Self {
        Self {
            package_path: package_path.into(),
        }
    }
}

#[async_trait]
impl LoaderInstaller for ModLoaderInstaller {
    async fn install(&self, ctx: InstallContext<'_>) -> InstallerResult<InstallResult> {
        let libraries_dir = ctx.libraries_dir();

        // Structural failures in this stage abort the whole pipeline;
        // everything after it accumulates diagnostics instead.
        ctx.progress.stage(InstallStage::ExtractingMetadata);
        let mut package = InstallerPackage::open(&self.package_path).await?;
        let (version_document, raw_version) = package.read_version_document()?;
        let mut profile = package.read_install_profile()?;
        let loader_version = profile.loader_version();

        info!(
            "Installing loader {} for {}",
            loader_version, ctx.minecraft_version
        );

        // The version document must reach the store before any processor
        // runs; processors may reference it.
        let (version_id, _) =
            VersionDocument::write_to_store(&raw_version, ctx.root, ctx.custom_id).await?;
        package.extract_patch_binaries(&profile, &libraries_dir)?;
        package.extract_loader_jars(&profile, &libraries_dir)?;
        profile.override_binpatch();
        ctx.progress.emit(ProgressEvent::MetadataExtracted { version_id });

        ctx.progress.stage(InstallStage::TransformingProfile);
        let minecraft_jar = ctx.minecraft_jar();
        let bindings = StaticBindings {
            side: ctx.side,
            minecraft_jar: &minecraft_jar,
            minecraft_version: ctx.minecraft_version,
            root: ctx.root,
            installer_package: &self.package_path,
            libraries_dir: &libraries_dir,
        };
        let processors = materialize(&profile, &bindings)?;

        ctx.progress.stage(InstallStage::DownloadingLibraries);
        let scheduler = LibraryScheduler::new(ctx.downloader, &libraries_dir)
            .with_strict_verify(ctx.options.strict_verify);
        let report = scheduler
            .schedule(&[&version_document.libraries, &profile.libraries])
            .await?;
        ctx.progress.emit(ProgressEvent::LibrariesDownloaded {
            completed: report.completed,
            skipped: report.skipped,
            failed: report.failures.len(),
        });

        let fatal_downloads = report.is_fatal_for(&processors);

        ctx.progress.stage(InstallStage::RunningProcessors);
        let executor = ProcessorExecutor::new(ctx.java_bin, libraries_dir, ctx.root)
            .with_abort_on_failure(ctx.options.abort_on_failure)
            .with_timeout(ctx.options.processor_timeout);
        let execution = executor.run_all(&processors, ctx.progress).await;

        ctx.progress.stage(InstallStage::Done);

        let mut stderr = execution.stderr;
        if fatal_downloads {
            for failure in &report.failures {
                stderr.push(format!(
                    "Failed to download {}: {}",
                    failure.coordinate, failure.error
                ));
            }
        }

        let success = !fatal_downloads && !execution.aborted && stderr.is_empty();
        let message = if success {
            format!("Successfully installed loader {loader_version}")
        } else {
            format!("Failed to install loader {loader_version}")
        };

        Ok(InstallResult {
            success,
            message,
            stdout: execution.stdout,
            stderr,
        })
    }
}
