use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{InstallerError, InstallerResult};

/// Represents a fully parsed Maven coordinate.
///
/// Supported formats:
///   `groupId:artifactId:version`
///   `groupId:artifactId:version:classifier`
///   `groupId:artifactId:version:classifier@packaging`
///   `groupId:artifactId:version@packaging`
///
/// A coordinate embedded in a template string may be wrapped in square
/// brackets (`[groupId:artifactId:version]`); the brackets are stripped
/// before parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MavenArtifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub classifier: Option<String>,
    /// File extension / packaging type. Defaults to `"jar"`.
    pub packaging: String,
}

impl MavenArtifact {
    /// Parse a Maven coordinate string, bracket-wrapped or bare.
    ///
    /// # Examples
    /// ```
    /// use loadstone::maven::MavenArtifact;
    /// let a = MavenArtifact::parse("net.sf.jopt-simple:jopt-simple:5.0.4").unwrap();
    /// assert_eq!(a.group_id, "net.sf.jopt-simple");
    /// ```
    pub fn parse(coord: &str) -> InstallerResult<Self> {
        let coord = coord
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(coord);

        // Split off @packaging first so a classifier like `clientdata@lzma`
        // parses as classifier `clientdata` with packaging `lzma`.
        let (coord_part, packaging_override) = if let Some(idx) = coord.rfind('@') {
            (&coord[..idx], Some(&coord[idx + 1..]))
        } else {
            (coord, None)
        };

        let parts: Vec<&str> = coord_part.split(':').collect();

        match parts.len() {
            3 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: None,
                packaging: packaging_override.unwrap_or("jar").to_string(),
            }),
            4 => Ok(Self {
                group_id: parts[0].to_string(),
                artifact_id: parts[1].to_string(),
                version: parts[2].to_string(),
                classifier: Some(parts[3].to_string()),
                packaging: packaging_override.unwrap_or("jar").to_string(),
            }),
            _ => Err(InstallerError::InvalidMavenCoordinate(coord.to_string())),
        }
    }

    /// Construct the group path portion (`net/sf/jopt-simple`).
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }

    /// Build the artifact filename.
    ///
    /// `artifactId-version[-classifier].packaging`
    pub fn filename(&self) -> String {
        match &self.classifier {
            Some(c) => format!(
                "{}-{}-{}.{}",
                self.artifact_id, self.version, c, self.packaging
            ),
            None => format!("{}-{}.{}", self.artifact_id, self.version, self.packaging),
        }
    }

    /// Repository-relative path with forward slashes, as used in URLs and
    /// archive entry names:
    /// `<group_path>/<artifact_id>/<version>/<filename>`
    pub fn repo_path(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.group_path(),
            self.artifact_id,
            self.version,
            self.filename()
        )
    }

    /// Construct the full URL for this artifact under the given repository base.
    pub fn url(&self, repo_base: &str) -> String {
        format!("{}/{}", repo_base.trim_end_matches('/'), self.repo_path())
    }

    /// Local path relative to the libraries directory.
    ///
    /// Mirrors Maven's local repo layout:
    /// `<group_path>/<artifact_id>/<version>/<filename>`
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(self.group_path())
            .join(&self.artifact_id)
            .join(&self.version)
            .join(self.filename())
    }

    /// Return a new artifact with a different classifier.
    pub fn with_classifier(&self, classifier: &str) -> Self {
        let mut clone = self.clone();
        clone.classifier = Some(classifier.to_string());
        clone
    }

    /// Return a new artifact with packaging changed (e.g. to `"lzma"`).
    pub fn with_packaging(&self, packaging: &str) -> Self {
        let mut clone = self.clone();
        clone.packaging = packaging.to_string();
        clone
    }
}

impl fmt::Display for MavenArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.classifier {
            Some(c) => write!(
                f,
                "{}:{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, c, self.packaging
            ),
            None => write!(
                f,
                "{}:{}:{}@{}",
                self.group_id, self.artifact_id, self.version, self.packaging
            ),
        }
    }
}
