//! Progress reporting from the conversion worker.
//!
//! The worker never touches caller state: it posts [`ProgressEvent`]s through a
//! [`ProgressSink`], typically the sending half of an unbounded channel whose
//! receiver lives on the caller's side (see [`ConversionHandle`]).

use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::error::Result;

/// What a progress event counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub enum ProgressKind {
    /// A page was placed into the current document.
    Page,
    /// A chapter of a collection is about to be converted.
    Chapter,
}

/// One progress update. `current` is 1-based and never exceeds `total`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub label: String,
    pub current: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn page(current: usize, total: usize) -> Self {
        ProgressEvent {
            kind: ProgressKind::Page,
            label: format!("Adding page {} of {}", current, total),
            current,
            total,
        }
    }

    pub fn chapter(current: usize, total: usize, chapter_name: &str) -> Self {
        ProgressEvent {
            kind: ProgressKind::Chapter,
            label: format!("Processing chapter {} of {}: {}", current, total, chapter_name),
            current,
            total,
        }
    }
}

/// Receiver of progress events. Implementations must not block the worker.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Forwards every event to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        info!("{}", event.label);
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn report(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.send(event);
    }
}

/// A conversion running on a background task.
///
/// Progress arrives through [`next_progress`](ConversionHandle::next_progress);
/// the final outcome through [`finish`](ConversionHandle::finish). There is no
/// cancellation: the job always runs to completion or failure.
pub struct ConversionHandle<T> {
    pub(crate) task: JoinHandle<Result<T>>,
    pub(crate) progress: UnboundedReceiver<ProgressEvent>,
}

impl<T> ConversionHandle<T> {
    /// Waits for the next progress event; `None` once the worker has finished.
    pub async fn next_progress(&mut self) -> Option<ProgressEvent> {
        self.progress.recv().await
    }

    /// Waits for the worker and returns its result.
    pub async fn finish(self) -> Result<T> {
        self.task.await?
    }
}
