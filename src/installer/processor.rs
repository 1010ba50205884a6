// ─── Processor Execution ───
// Runs the materialized processor chain strictly sequentially: later steps
// consume files written by earlier ones and program order is the only
// safety guarantee.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{InstallerError, InstallerResult};
use crate::maven::MavenArtifact;
use crate::profile::ResolvedProcessor;

use super::progress::{ProgressEvent, ProgressSink};

/// Accumulated output of the whole chain.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    /// The chain stopped before running every step.
    pub aborted: bool,
}

enum StepError {
    /// This step failed; the chain may continue.
    Failed(String),
    /// The chain cannot meaningfully continue (spawn failure, timeout).
    ChainStopped(String),
}

/// Executes processor steps as external Java invocations.
pub struct ProcessorExecutor<'a> {
    java_bin: &'a Path,
    libraries_dir: PathBuf,
    working_dir: &'a Path,
    abort_on_failure: bool,
    timeout: Option<Duration>,
}

impl<'a> ProcessorExecutor<'a> {
    pub fn new(java_bin: &'a Path, libraries_dir: PathBuf, working_dir: &'a Path) -> Self {
        Self {
            java_bin,
            libraries_dir,
            working_dir,
            abort_on_failure: false,
            timeout: None,
        }
    }

    pub fn with_abort_on_failure(mut self, abort: bool) -> Self {
        self.abort_on_failure = abort;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every step in order, accumulating stdout/stderr line sets
    /// regardless of exit status. A failing step is recorded and, by
    /// default, the chain continues; `abort_on_failure` and timeouts stop
    /// it early.
    pub async fn run_all(
        &self,
        processors: &[ResolvedProcessor],
        progress: &ProgressSink,
    ) -> ExecutionLog {
        let mut log = ExecutionLog::default();
        let total = processors.len();

        for (index, step) in processors.iter().enumerate() {
            match self.run_step(step).await {
                Ok(output) => {
                    append_lines(&mut log.stdout, &output.stdout);
                    append_lines(&mut log.stderr, &output.stderr);
                    if !output.status.success() {
                        let diagnostic =
                            format!("Processor {} exited with {}", step.jar, output.status);
                        warn!("{}", diagnostic);
                        log.stderr.push(diagnostic);
                        if self.abort_on_failure {
                            log.aborted = true;
                            break;
                        }
                    }
                }
                Err(StepError::Failed(diagnostic)) => {
                    warn!("{}", diagnostic);
                    log.stderr.push(diagnostic);
                    if self.abort_on_failure {
                        log.aborted = true;
                        break;
                    }
                }
                Err(StepError::ChainStopped(diagnostic)) => {
                    warn!("{}", diagnostic);
                    log.stderr.push(diagnostic);
                    log.aborted = true;
                    break;
                }
            }

            progress.emit(ProgressEvent::ProcessorCompleted {
                index,
                total,
                jar: step.jar.clone(),
            });
        }

        log
    }

    async fn run_step(&self, step: &ResolvedProcessor) -> Result<Output, StepError> {
        let jar_path = self
            .resolve_existing(&step.jar)
            .map_err(|e| StepError::Failed(format!("Processor {}: {}", step.jar, e)))?;

        let main_class = read_main_class_from_jar(&jar_path)
            .map_err(|e| StepError::Failed(format!("Processor {}: {}", step.jar, e)))?;

        let mut classpath_entries = vec![jar_path.to_string_lossy().into_owned()];
        for coordinate in &step.classpath {
            let path = self.resolve_existing(coordinate).map_err(|e| {
                StepError::Failed(format!("Processor {} classpath: {}", step.jar, e))
            })?;
            classpath_entries.push(path.to_string_lossy().into_owned());
        }
        let classpath = classpath_entries.join(if cfg!(windows) { ";" } else { ":" });

        info!("Running processor {} ({})", step.jar, main_class);

        let mut command = tokio::process::Command::new(self.java_bin);
        command
            .arg("-cp")
            .arg(&classpath)
            .arg(&main_class)
            .args(&step.args)
            .current_dir(self.working_dir)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            StepError::ChainStopped(format!("Failed to spawn processor {}: {}", step.jar, e))
        })?;

        let waited = child.wait_with_output();
        let output = match self.timeout {
            // Dropping the timed-out future kills the child via kill_on_drop.
            Some(limit) => tokio::time::timeout(limit, waited).await.map_err(|_| {
                StepError::ChainStopped(format!(
                    "Processor {} timed out after {:?}",
                    step.jar, limit
                ))
            })?,
            None => waited.await,
        }
        .map_err(|e| {
            StepError::ChainStopped(format!("Failed to await processor {}: {}", step.jar, e))
        })?;

        Ok(output)
    }

    /// Every coordinate a step references must already be on disk
    /// (downloaded or extracted), otherwise the step fails.
    fn resolve_existing(&self, coordinate: &str) -> InstallerResult<PathBuf> {
        let artifact = MavenArtifact::parse(coordinate)?;
        let path = self.libraries_dir.join(artifact.local_path());
        if !path.exists() {
            return Err(InstallerError::Processor(format!(
                "missing artifact {} at {}",
                coordinate,
                path.display()
            )));
        }
        Ok(path)
    }
}

fn append_lines(accumulator: &mut Vec<String>, bytes: &[u8]) {
    accumulator.extend(
        String::from_utf8_lossy(bytes)
            .lines()
            .map(str::to_string),
    );
}

/// Read the `Main-Class` attribute from a jar manifest, folding the
/// 72-byte continuation lines the manifest format wraps long values with.
pub fn read_main_class_from_jar(path: &Path) -> InstallerResult<String> {
    let file = std::fs::File::open(path).map_err(|e| InstallerError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut manifest = archive.by_name("META-INF/MANIFEST.MF").map_err(|e| {
        InstallerError::Processor(format!("manifest not found in {}: {}", path.display(), e))
    })?;

    let mut text = String::new();
    manifest.read_to_string(&mut text)?;

    let mut main_class: Option<String> = None;
    let mut current_key: Option<String> = None;
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix(' ') {
            if current_key.as_deref() == Some("Main-Class") {
                if let Some(value) = &mut main_class {
                    value.push_str(rest.trim());
                }
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            current_key = Some(key.trim().to_string());
            if key.trim() == "Main-Class" {
                main_class = Some(value.trim().to_string());
            }
        }
    }

    main_class.ok_or_else(|| {
        InstallerError::Processor(format!("Main-Class missing in {}", path.display()))
    })
}
