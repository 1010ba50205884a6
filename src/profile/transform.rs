// ─── Profile Transformation ───
// Turns the raw processor definitions of an install profile into a
// materialized, executable list: side filtering, static placeholder
// substitution, data-driven placeholder substitution, and coordinate
// resolution inside arguments.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::InstallerResult;
use crate::maven::MavenArtifact;

use super::{InstallProfile, Side};

/// Literal placeholder values known before the profile's `data` entries are
/// consulted.
#[derive(Debug, Clone, Copy)]
pub struct StaticBindings<'a> {
    pub side: Side,
    pub minecraft_jar: &'a Path,
    pub minecraft_version: &'a str,
    pub root: &'a Path,
    pub installer_package: &'a Path,
    pub libraries_dir: &'a Path,
}

impl StaticBindings<'_> {
    /// Ordered replacement pairs. The path-separator marker must come last
    /// so it applies to paths produced by the earlier pairs.
    fn replacement_pairs(&self) -> Vec<(String, String)> {
        vec![
            ("{SIDE}".to_string(), self.side.as_str().to_string()),
            (
                "{MINECRAFT_JAR}".to_string(),
                self.minecraft_jar.to_string_lossy().into_owned(),
            ),
            (
                "{MINECRAFT_VERSION}".to_string(),
                self.minecraft_version.to_string(),
            ),
            ("{ROOT}".to_string(), self.root.to_string_lossy().into_owned()),
            (
                "{INSTALLER}".to_string(),
                self.installer_package.to_string_lossy().into_owned(),
            ),
            (
                "{LIBRARY_DIR}".to_string(),
                self.libraries_dir.to_string_lossy().into_owned(),
            ),
            ("/".to_string(), std::path::MAIN_SEPARATOR.to_string()),
        ]
    }
}

/// A processor step ready for execution: all placeholders substituted,
/// all bracketed references resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProcessor {
    pub jar: String,
    pub classpath: Vec<String>,
    pub args: Vec<String>,
    pub outputs: BTreeMap<String, String>,
}

fn is_bracketed(s: &str) -> bool {
    s.starts_with('[') && s.ends_with(']')
}

fn apply(input: &str, pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .fold(input.to_string(), |acc, (from, to)| acc.replace(from, to))
}

fn resolve_coordinate(token: &str, libraries_dir: &Path) -> InstallerResult<String> {
    let artifact = MavenArtifact::parse(token)?;
    Ok(libraries_dir
        .join(artifact.local_path())
        .to_string_lossy()
        .into_owned())
}

/// Materialize the profile's processor chain for one side.
///
/// Pure: the profile is not mutated and equal inputs produce equal output.
/// The static pass runs strictly before the dynamic pass, so data-driven
/// placeholders appearing inside statically substituted text still resolve.
pub fn materialize(
    profile: &InstallProfile,
    bindings: &StaticBindings<'_>,
) -> InstallerResult<Vec<ResolvedProcessor>> {
    let static_pairs = bindings.replacement_pairs();

    let dynamic_pairs = profile
        .data
        .iter()
        .map(|(key, value)| {
            let raw = value.for_side(bindings.side);
            let resolved = if is_bracketed(raw) {
                resolve_coordinate(raw, bindings.libraries_dir)?
            } else {
                raw.to_string()
            };
            Ok((format!("{{{key}}}"), resolved))
        })
        .collect::<InstallerResult<Vec<_>>>()?;

    let substitute = |input: &str| -> String {
        let statically = apply(input, &static_pairs);
        apply(&statically, &dynamic_pairs)
    };

    profile
        .processors
        .iter()
        .filter(|step| step.applies_to(bindings.side))
        .map(|step| {
            let args = step
                .args
                .iter()
                .map(|arg| {
                    let substituted = substitute(arg);
                    if is_bracketed(&substituted) {
                        resolve_coordinate(&substituted, bindings.libraries_dir)
                    } else {
                        Ok(substituted)
                    }
                })
                .collect::<InstallerResult<Vec<_>>>()?;

            let outputs = step
                .outputs
                .as_ref()
                .map(|outputs| {
                    outputs
                        .iter()
                        .map(|(k, v)| (substitute(k), substitute(v)))
                        .collect()
                })
                .unwrap_or_default();

            Ok(ResolvedProcessor {
                jar: step.jar.clone(),
                classpath: step.classpath.clone(),
                args,
                outputs,
            })
        })
        .collect()
}
