pub mod transform;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::maven::MavenArtifact;
use crate::version::LibraryEntry;

pub use transform::{materialize, ResolvedProcessor, StaticBindings};

/// Loader coordinates used for artifacts shipped inside the installer
/// package (the distribution jars and the binary patch blobs).
pub const LOADER_GROUP: &str = "net.minecraftforge";
pub const LOADER_ARTIFACT: &str = "forge";

/// Key of the data entries pointing at the binary patch blobs.
pub const BINPATCH_KEY: &str = "BINPATCH";

/// The target role a processor step applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

/// The loader-supplied install profile: library dependencies, templated
/// data entries, and the ordered post-processing chain.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallProfile {
    pub version: String,
    #[serde(default)]
    pub data: BTreeMap<String, SidedValue>,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub processors: Vec<ProcessorStep>,
}

/// A data entry value, one string per side. Either a literal or a
/// bracketed Maven coordinate.
#[derive(Debug, Clone, Deserialize)]
pub struct SidedValue {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub server: String,
}

impl SidedValue {
    pub fn for_side(&self, side: Side) -> &str {
        match side {
            Side::Client => &self.client,
            Side::Server => &self.server,
        }
    }
}

/// One step of the post-install patch chain, pre-substitution.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorStep {
    #[serde(default)]
    pub sides: Option<Vec<String>>,
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub outputs: Option<BTreeMap<String, String>>,
}

impl ProcessorStep {
    /// A step with no `sides` restriction applies everywhere.
    pub fn applies_to(&self, side: Side) -> bool {
        match &self.sides {
            None => true,
            Some(sides) => sides.iter().any(|s| s.eq_ignore_ascii_case(side.as_str())),
        }
    }
}

impl InstallProfile {
    /// Loader version encoded in the profile's version tag, e.g.
    /// `1.20.1-forge-47.2.0` → `1.20.1-47.2.0`.
    pub fn loader_version(&self) -> String {
        self.version.replace("-forge-", "-")
    }

    /// Coordinate of the loader's own distribution jar.
    pub fn loader_artifact(&self) -> MavenArtifact {
        MavenArtifact {
            group_id: LOADER_GROUP.to_string(),
            artifact_id: LOADER_ARTIFACT.to_string(),
            version: self.loader_version(),
            classifier: None,
            packaging: "jar".to_string(),
        }
    }

    /// Point the `BINPATCH` data entries at the loader's classified patch
    /// artifacts. The packaged profile may ship placeholder values, so this
    /// must run before any substitution pass.
    pub fn override_binpatch(&mut self) {
        let loader = self.loader_artifact();
        let client = loader.with_classifier("clientdata").with_packaging("lzma");
        let server = loader.with_classifier("serverdata").with_packaging("lzma");
        self.data.insert(
            BINPATCH_KEY.to_string(),
            SidedValue {
                client: format!("[{client}]"),
                server: format!("[{server}]"),
            },
        );
    }
}
