// ─── Loadstone ───
// Mod-loader install pipeline: turns a downloaded installer package plus a
// base game version into a runnable, patched installation.
//
// Architecture:
//   maven/      — Coordinate parsing + library-store path resolution
//   version/    — Version document + published manifest models
//   profile/    — Install profile model + processor transformation
//   downloader/ — Bounded concurrent fetches + library scheduling
//   installer/  — Package extraction, processor execution, pipelines

pub mod downloader;
pub mod error;
pub mod http;
pub mod installer;
pub mod maven;
pub mod profile;
pub mod version;

pub use error::{InstallerError, InstallerResult};
pub use installer::{
    InstallContext, InstallOptions, InstallResult, InstallStage, Installer, LoaderInstaller,
    ProgressEvent, ProgressSink,
};

use tracing_subscriber::EnvFilter;

/// Initialize structured logging for binaries embedding the pipeline.
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,loadstone=debug")),
        )
        .try_init();
}
