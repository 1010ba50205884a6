// ─── Library Download Scheduler ───
// Deduplicates the union of the base-version and loader library sets and
// drains the resulting download queue through a bounded worker pool.
// Failures are recorded, never swallowed; the pipeline decides which of
// them are fatal.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::downloader::client::{drain_bounded, DownloadEntry, Downloader};
use crate::error::{InstallerError, InstallerResult};
use crate::maven::{MavenArtifact, FORGE_MAVEN, MOJANG_LIBRARIES};
use crate::profile::ResolvedProcessor;
use crate::version::LibraryEntry;

/// Cap on simultaneous in-flight fetches.
pub const MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// One recorded download failure.
#[derive(Debug)]
pub struct DownloadFailure {
    pub coordinate: String,
    pub url: String,
    pub error: InstallerError,
}

/// Outcome of a scheduling run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub completed: usize,
    pub skipped: usize,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// A failure is fatal when the failed coordinate is required by a
    /// processor's jar or classpath.
    pub fn is_fatal_for(&self, processors: &[ResolvedProcessor]) -> bool {
        if self.failures.is_empty() {
            return false;
        }
        let required: HashSet<String> = processors
            .iter()
            .flat_map(|p| std::iter::once(&p.jar).chain(p.classpath.iter()))
            .filter_map(|c| normalize(c))
            .collect();
        self.failures
            .iter()
            .filter_map(|f| normalize(&f.coordinate))
            .any(|c| required.contains(&c))
    }
}

/// Canonical form for coordinate comparison (classifier/packaging included).
fn normalize(coord: &str) -> Option<String> {
    MavenArtifact::parse(coord).ok().map(|a| a.to_string())
}

struct PlannedDownload {
    entry: DownloadEntry,
    /// Mirror tried when the synthesized primary URL fails.
    fallback_url: Option<String>,
}

/// Schedules the library downloads for one install.
pub struct LibraryScheduler<'a> {
    downloader: &'a Downloader,
    libraries_dir: &'a Path,
    primary_repo: String,
    strict_verify: bool,
}

impl<'a> LibraryScheduler<'a> {
    pub fn new(downloader: &'a Downloader, libraries_dir: &'a Path) -> Self {
        Self {
            downloader,
            libraries_dir,
            primary_repo: FORGE_MAVEN.to_string(),
            strict_verify: false,
        }
    }

    pub fn with_primary_repo(mut self, repo: &str) -> Self {
        self.primary_repo = repo.trim_end_matches('/').to_string();
        self
    }

    /// Re-hash files already on disk against their known SHA-1 and
    /// re-download on mismatch, instead of trusting existence.
    pub fn with_strict_verify(mut self, strict: bool) -> Self {
        self.strict_verify = strict;
        self
    }

    /// Deduplicate by coordinate identity across all sets. An entry that
    /// carries explicit download metadata wins over a bare duplicate.
    fn dedupe<'b>(sets: &[&'b [LibraryEntry]]) -> Vec<&'b LibraryEntry> {
        let mut by_coord: BTreeMap<&str, &'b LibraryEntry> = BTreeMap::new();
        for set in sets {
            for entry in *set {
                by_coord
                    .entry(entry.name.as_str())
                    .and_modify(|existing| {
                        if existing.explicit_url().is_none() && entry.explicit_url().is_some() {
                            *existing = entry;
                        }
                    })
                    .or_insert(entry);
            }
        }
        by_coord.into_values().collect()
    }

    async fn plan(&self, unique: &[&LibraryEntry]) -> InstallerResult<(Vec<PlannedDownload>, usize)> {
        let mut planned = Vec::new();
        let mut skipped = 0usize;

        for entry in unique {
            let Ok(artifact) = MavenArtifact::parse(&entry.name) else {
                // Some metadata entries are not Maven coordinates; without a
                // parseable name there is no destination to resolve.
                debug!("Skipping non-coordinate library entry {:?}", entry.name);
                continue;
            };

            let dest = self.libraries_dir.join(artifact.local_path());
            let sha1 = entry.sha1().map(str::to_string);

            if dest.exists() {
                let satisfied = if self.strict_verify {
                    match &sha1 {
                        Some(expected) => Downloader::validate_sha1(&dest, expected)
                            .await
                            .unwrap_or(false),
                        None => true,
                    }
                } else {
                    true
                };
                if satisfied {
                    skipped += 1;
                    continue;
                }
                warn!("Checksum mismatch for {:?}, re-downloading", dest);
            }

            let (url, fallback_url) = match entry.explicit_url() {
                Some(url) => (url.to_string(), None),
                None => {
                    let primary = artifact.url(&self.primary_repo);
                    let fallback = (self.primary_repo != MOJANG_LIBRARIES)
                        .then(|| artifact.url(MOJANG_LIBRARIES));
                    (primary, fallback)
                }
            };

            planned.push(PlannedDownload {
                entry: DownloadEntry {
                    url,
                    dest,
                    sha1,
                    coordinate: Some(entry.name.clone()),
                },
                fallback_url,
            });
        }

        Ok((planned, skipped))
    }

    /// Download every unique, not-yet-satisfied library. Resolves only
    /// after all tasks settle; each task is attempted exactly once.
    pub async fn schedule(&self, sets: &[&[LibraryEntry]]) -> InstallerResult<DownloadReport> {
        let unique = Self::dedupe(sets);
        let (planned, skipped) = self.plan(&unique).await?;
        let attempted = planned.len();

        info!(
            "Library downloads: {} unique, {} already satisfied, {} to fetch (concurrency={})",
            unique.len(),
            skipped,
            attempted,
            self.downloader.concurrency()
        );

        let results: Vec<Result<(), DownloadFailure>> = drain_bounded(
            planned,
            self.downloader.concurrency(),
            |task| async move {
                let PlannedDownload {
                    entry,
                    fallback_url,
                } = task;
                let primary = self
                    .downloader
                    .download_file(&entry.url, &entry.dest, entry.sha1.as_deref())
                    .await;
                let error = match primary {
                    Ok(()) => return Ok(()),
                    Err(e @ InstallerError::DownloadCancelled { .. }) => e,
                    Err(e) => match &fallback_url {
                        Some(fallback) => {
                            match self
                                .downloader
                                .download_file(fallback, &entry.dest, entry.sha1.as_deref())
                                .await
                            {
                                Ok(()) => return Ok(()),
                                Err(_) => e,
                            }
                        }
                        None => e,
                    },
                };
                Err(DownloadFailure {
                    coordinate: entry.coordinate.unwrap_or_else(|| entry.url.clone()),
                    url: entry.url,
                    error,
                })
            },
        )
        .await;

        let failures: Vec<DownloadFailure> =
            results.into_iter().filter_map(Result::err).collect();
        for failure in &failures {
            warn!(
                "Failed to download {} from {}: {}",
                failure.coordinate, failure.url, failure.error
            );
        }

        Ok(DownloadReport {
            completed: attempted - failures.len(),
            skipped,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::build_http_client;

    fn entry(name: &str) -> LibraryEntry {
        serde_json::from_str(&format!(r#"{{"name":"{name}"}}"#)).unwrap()
    }

    fn entry_with_url(name: &str, url: &str) -> LibraryEntry {
        serde_json::from_str(&format!(
            r#"{{"name":"{name}","downloads":{{"artifact":{{"url":"{url}"}}}}}}"#
        ))
        .unwrap()
    }

    #[test]
    fn dedup_schedules_union_not_sum() {
        let base = vec![
            entry("com.example:a:1.0"),
            entry("com.example:b:1.0"),
            entry("com.example:shared:1.0"),
        ];
        let loader = vec![
            entry("com.example:shared:1.0"),
            entry("com.example:c:1.0"),
        ];
        let unique = LibraryScheduler::dedupe(&[&base, &loader]);
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn dedup_prefers_entries_with_explicit_metadata() {
        let base = vec![entry("com.example:shared:1.0")];
        let loader = vec![entry_with_url(
            "com.example:shared:1.0",
            "https://example.com/shared-1.0.jar",
        )];
        let unique = LibraryScheduler::dedupe(&[&base, &loader]);
        assert_eq!(unique.len(), 1);
        assert!(unique[0].explicit_url().is_some());
    }

    #[tokio::test]
    async fn plan_skips_existing_destinations() {
        let tmp = tempfile::tempdir().unwrap();
        let libs = tmp.path().join("libraries");
        let satisfied = libs.join("com/example/a/1.0/a-1.0.jar");
        std::fs::create_dir_all(satisfied.parent().unwrap()).unwrap();
        std::fs::write(&satisfied, b"cached").unwrap();

        let downloader = Downloader::new(build_http_client().unwrap());
        let scheduler = LibraryScheduler::new(&downloader, &libs);

        let entries = [entry("com.example:a:1.0"), entry("com.example:b:1.0")];
        let refs: Vec<&LibraryEntry> = entries.iter().collect();
        let (planned, skipped) = scheduler.plan(&refs).await.unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(planned.len(), 1);
        assert_eq!(
            planned[0].entry.dest,
            libs.join("com/example/b/1.0/b-1.0.jar")
        );
    }

    #[tokio::test]
    async fn plan_synthesizes_urls_with_mirror_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let libs = tmp.path().join("libraries");
        let downloader = Downloader::new(build_http_client().unwrap());
        let scheduler = LibraryScheduler::new(&downloader, &libs);

        let entries = [
            entry("com.example:bare:1.0"),
            entry_with_url("com.example:pinned:1.0", "https://example.com/pinned.jar"),
        ];
        let refs: Vec<&LibraryEntry> = entries.iter().collect();
        let (planned, _) = scheduler.plan(&refs).await.unwrap();

        let bare = planned
            .iter()
            .find(|p| p.entry.coordinate.as_deref() == Some("com.example:bare:1.0"))
            .unwrap();
        assert_eq!(
            bare.entry.url,
            format!("{FORGE_MAVEN}/com/example/bare/1.0/bare-1.0.jar")
        );
        assert_eq!(
            bare.fallback_url.as_deref(),
            Some("https://libraries.minecraft.net/com/example/bare/1.0/bare-1.0.jar")
        );

        let pinned = planned
            .iter()
            .find(|p| p.entry.coordinate.as_deref() == Some("com.example:pinned:1.0"))
            .unwrap();
        assert_eq!(pinned.entry.url, "https://example.com/pinned.jar");
        assert!(pinned.fallback_url.is_none());
    }

    #[test]
    fn fatality_depends_on_processor_requirements() {
        let report = DownloadReport {
            completed: 0,
            skipped: 0,
            failures: vec![DownloadFailure {
                coordinate: "com.example:patcher:1.0".to_string(),
                url: "https://example.com/patcher.jar".to_string(),
                error: InstallerError::DownloadFailed {
                    url: "https://example.com/patcher.jar".to_string(),
                    status: 404,
                },
            }],
        };

        let requiring = vec![ResolvedProcessor {
            jar: "com.example:tool:2.0".to_string(),
            classpath: vec!["com.example:patcher:1.0".to_string()],
            args: vec![],
            outputs: Default::default(),
        }];
        assert!(report.is_fatal_for(&requiring));

        let unrelated = vec![ResolvedProcessor {
            jar: "com.example:tool:2.0".to_string(),
            classpath: vec!["com.example:other:1.0".to_string()],
            args: vec![],
            outputs: Default::default(),
        }];
        assert!(!report.is_fatal_for(&unrelated));
    }
}
