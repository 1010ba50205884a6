pub mod context;
pub mod modloader;
pub mod package;
pub mod processor;
pub mod progress;
pub mod vanilla;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InstallerResult;

pub use context::{InstallContext, InstallOptions};
pub use modloader::ModLoaderInstaller;
pub use package::InstallerPackage;
pub use processor::{ExecutionLog, ProcessorExecutor};
pub use progress::{InstallStage, ProgressEvent, ProgressSink};
pub use vanilla::VanillaInstaller;

/// Terminal artifact of an install run. A structural failure never
/// produces one of these; it surfaces as an error instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallResult {
    pub success: bool,
    pub message: String,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn install(&self, ctx: InstallContext<'_>) -> InstallerResult<InstallResult>;
}

/// Tagged-variant dispatcher over the installer kinds.
pub enum Installer {
    Vanilla(VanillaInstaller),
    ModLoader(ModLoaderInstaller),
}

impl Installer {
    pub fn vanilla(client: reqwest::Client) -> Self {
        Self::Vanilla(VanillaInstaller::new(client))
    }

    pub fn mod_loader(package_path: impl Into<PathBuf>) -> Self {
        Self::ModLoader(ModLoaderInstaller::new(package_path))
    }

    pub async fn install(&self, ctx: InstallContext<'_>) -> InstallerResult<InstallResult> {
        match self {
            Installer::Vanilla(i) => i.install(ctx).await,
            Installer::ModLoader(i) => i.install(ctx).await,
        }
    }
}
