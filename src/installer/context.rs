use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::downloader::Downloader;
use crate::profile::Side;

use super::progress::ProgressSink;

/// Policy switches for one install run.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Re-hash already-present libraries against known checksums instead of
    /// trusting existence.
    pub strict_verify: bool,
    /// Stop the processor chain at the first failing step instead of
    /// continuing and accumulating diagnostics.
    pub abort_on_failure: bool,
    /// Kill a processor child that runs longer than this and stop the chain.
    pub processor_timeout: Option<Duration>,
}

/// Everything an installer needs about its environment.
pub struct InstallContext<'a> {
    /// Base game version string, e.g. "1.20.1".
    pub minecraft_version: &'a str,
    /// Id of the installed base version (its folder under `versions/`).
    pub minecraft_version_id: &'a str,
    /// Game root directory; an opaque configured path.
    pub root: &'a Path,
    /// Java executable used to run processor steps.
    pub java_bin: &'a Path,
    pub side: Side,
    /// Overrides the written version document's id when set.
    pub custom_id: Option<&'a str>,
    pub downloader: &'a Downloader,
    pub progress: &'a ProgressSink,
    pub options: &'a InstallOptions,
}

impl InstallContext<'_> {
    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    /// `<root>/versions/<id>/<id>.jar` for the installed base version.
    pub fn minecraft_jar(&self) -> PathBuf {
        self.versions_dir()
            .join(self.minecraft_version_id)
            .join(format!("{}.jar", self.minecraft_version_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;

    #[test]
    fn layout_paths_derive_from_root() {
        let downloader = Downloader::new(build_http_client().unwrap());
        let progress = ProgressSink::disabled();
        let options = InstallOptions::default();
        let ctx = InstallContext {
            minecraft_version: "1.20.1",
            minecraft_version_id: "1.20.1",
            root: Path::new("/games/mc"),
            java_bin: Path::new("/usr/bin/java"),
            side: Side::Client,
            custom_id: None,
            downloader: &downloader,
            progress: &progress,
            options: &options,
        };

        assert_eq!(ctx.libraries_dir(), PathBuf::from("/games/mc/libraries"));
        assert_eq!(
            ctx.minecraft_jar(),
            PathBuf::from("/games/mc/versions/1.20.1/1.20.1.jar")
        );
    }
}
