//! Progress and completion reporting
//!
//! The scheduler reports through a `PlaybackSink`. Callers can implement
//! the trait directly, wrap closures in `FnSink`, or use `watch()` to get
//! progress as a `tokio::sync::watch` channel and completion as a future.

use tokio::sync::{oneshot, watch};

/// Receives progress and completion for one playback session
pub trait PlaybackSink: Send {
    /// Progress in percent, 0.0..=100.0, non-decreasing within a session
    fn on_progress(&mut self, _percent: f64) {}

    /// Called exactly once when a session plays to the end.
    /// Never called for a stopped session.
    fn on_finish(&mut self) {}
}

/// Ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PlaybackSink for NullSink {}

/// Adapts a pair of closures
pub struct FnSink<P, F> {
    progress: P,
    finish: Option<F>,
}

impl<P, F> FnSink<P, F>
where
    P: FnMut(f64) + Send,
    F: FnOnce() + Send,
{
    pub fn new(progress: P, finish: F) -> Self {
        Self {
            progress,
            finish: Some(finish),
        }
    }
}

impl<P, F> PlaybackSink for FnSink<P, F>
where
    P: FnMut(f64) + Send,
    F: FnOnce() + Send,
{
    fn on_progress(&mut self, percent: f64) {
        (self.progress)(percent);
    }

    fn on_finish(&mut self) {
        if let Some(finish) = self.finish.take() {
            finish();
        }
    }
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Finished,
    Stopped,
}

/// Sink half of a watch pair
pub struct ChannelSink {
    progress: watch::Sender<f64>,
    done: Option<oneshot::Sender<()>>,
}

impl PlaybackSink for ChannelSink {
    fn on_progress(&mut self, percent: f64) {
        let _ = self.progress.send(percent);
    }

    fn on_finish(&mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

/// Observer half of a watch pair
pub struct PlaybackWatch {
    progress: watch::Receiver<f64>,
    done: oneshot::Receiver<()>,
}

impl PlaybackWatch {
    /// Latest reported progress
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    /// A receiver that can be awaited for progress changes
    pub fn progress_receiver(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    /// Resolves when the session finishes or is stopped. A stopped
    /// session drops its sink, which closes the channel.
    pub async fn finished(self) -> Completion {
        match self.done.await {
            Ok(()) => Completion::Finished,
            Err(_) => Completion::Stopped,
        }
    }

    /// Non-blocking check
    pub fn try_completion(&mut self) -> Option<Completion> {
        match self.done.try_recv() {
            Ok(()) => Some(Completion::Finished),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Completion::Stopped),
        }
    }
}

/// Create a connected sink/watch pair
pub fn watch() -> (ChannelSink, PlaybackWatch) {
    let (progress_tx, progress_rx) = watch::channel(0.0);
    let (done_tx, done_rx) = oneshot::channel();
    (
        ChannelSink {
            progress: progress_tx,
            done: Some(done_tx),
        },
        PlaybackWatch {
            progress: progress_rx,
            done: done_rx,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_fn_sink_finish_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let mut sink = FnSink::new(|_| {}, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        sink.on_finish();
        sink.on_finish();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_watch_finished() {
        let (mut sink, watch) = watch();
        sink.on_progress(42.0);
        assert_eq!(watch.progress(), 42.0);

        sink.on_finish();
        assert_eq!(watch.finished().await, Completion::Finished);
    }

    #[tokio::test]
    async fn test_watch_stopped_when_sink_dropped() {
        let (sink, watch) = watch();
        drop(sink);
        assert_eq!(watch.finished().await, Completion::Stopped);
    }

    #[test]
    fn test_try_completion() {
        let (mut sink, mut watch) = watch();
        assert_eq!(watch.try_completion(), None);
        sink.on_finish();
        assert_eq!(watch.try_completion(), Some(Completion::Finished));
    }
}
