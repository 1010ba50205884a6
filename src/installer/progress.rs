use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Pipeline stages, announced in order on the progress channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Idle,
    ExtractingMetadata,
    TransformingProfile,
    DownloadingLibraries,
    RunningProcessors,
    Done,
}

/// Progress notifications emitted at well-defined points of the pipeline.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Stage(InstallStage),
    MetadataExtracted {
        version_id: String,
    },
    LibrariesDownloaded {
        completed: usize,
        skipped: usize,
        failed: usize,
    },
    ProcessorCompleted {
        index: usize,
        total: usize,
        jar: String,
    },
}

/// Channel-backed progress reporter threaded through each stage.
/// A disabled sink (no channel) drops every event; a dropped receiver is
/// ignored rather than treated as an error.
#[derive(Debug, Default)]
pub struct ProgressSink {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn stage(&self, stage: InstallStage) {
        self.emit(ProgressEvent::Stage(stage));
    }
}
