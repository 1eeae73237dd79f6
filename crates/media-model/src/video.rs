//! The video source contract.
//!
//! A video source is a decoded, seekable stream with a single "current"
//! frame. Seeking is asynchronous: [`VideoSource::seek`] updates the reported
//! position immediately and returns a [`SeekCompletion`] that resolves once
//! the frame at the new position has been decoded. Callers that need a bound
//! race it against a timeout; dropping it is always safe.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use image::RgbaImage;
use tokio::sync::oneshot;

/// Resolves when a seek has finished decoding.
#[derive(Debug)]
pub struct SeekCompletion {
    rx: oneshot::Receiver<()>,
}

/// The decoder dropped the seek without signalling completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("seek abandoned by the decoder")]
pub struct SeekAbandoned;

/// Sending half of a [`SeekCompletion`], held by whoever performs the decode.
#[derive(Debug)]
pub struct SeekNotifier {
    tx: oneshot::Sender<()>,
}

impl SeekCompletion {
    /// A linked notifier/completion pair.
    pub fn channel() -> (SeekNotifier, SeekCompletion) {
        let (tx, rx) = oneshot::channel();
        (SeekNotifier { tx }, SeekCompletion { rx })
    }

    /// A completion that is already resolved.
    pub fn ready() -> SeekCompletion {
        let (notifier, completion) = Self::channel();
        notifier.notify();
        completion
    }
}

impl SeekNotifier {
    /// Signal completion. A receiver that has already given up is ignored.
    pub fn notify(self) {
        let _ = self.tx.send(());
    }
}

impl Future for SeekCompletion {
    type Output = Result<(), SeekAbandoned>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|result| result.map_err(|_| SeekAbandoned))
    }
}

/// A decoded, seekable video stream.
pub trait VideoSource: Send {
    /// Native frame width in pixels; 0 until the first frame is known.
    fn width(&self) -> u32;

    /// Native frame height in pixels; 0 until the first frame is known.
    fn height(&self) -> u32;

    /// Stream duration in seconds.
    fn duration_secs(&self) -> f64;

    /// Playback position in seconds. Reflects the latest requested seek.
    fn current_time(&self) -> f64;

    /// Move to `secs`. The returned completion resolves once the frame there
    /// is decodable via [`VideoSource::poll`].
    fn seek(&mut self, secs: f64) -> SeekCompletion;

    /// Absorb any finished decode into the current frame.
    fn poll(&mut self);

    /// The most recently decoded frame.
    fn current_frame(&self) -> Option<&RgbaImage>;

    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Stop playback and drop decoder resources. The source must not be used
    /// for seeking afterwards.
    fn release(&mut self);
}
