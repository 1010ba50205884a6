pub mod document;
pub mod manifest;

pub use document::{LibDownloadArtifact, LibraryDownloads, LibraryEntry, VersionDocument};
pub use manifest::{VersionEntry, VersionManifest};
