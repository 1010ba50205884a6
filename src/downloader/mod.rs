pub mod client;
pub mod scheduler;

pub use client::{drain_bounded, DownloadEntry, Downloader};
pub use scheduler::{
    DownloadFailure, DownloadReport, LibraryScheduler, MAX_CONCURRENT_DOWNLOADS,
};
