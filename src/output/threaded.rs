use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Sender};

use super::OutputSink;
use crate::frame::Frame;
use crate::pipeline::FrameOutput;

enum Message {
    Frame(Arc<Frame>, Arc<FrameOutput>),
    Reset,
}

/// Runs a sink on its own thread.
///
/// Each frame and output is copied once into an `Arc` and sent over a bounded channel; the
/// pipeline blocks when the consumer falls `capacity` frames behind. A consumer error
/// surfaces on the next `consume` (or on `finish`).
pub struct ThreadedSink<S: OutputSink + Send + 'static> {
    tx: Option<Sender<Message>>,
    handle: Option<JoinHandle<Result<S>>>,
    inner: Option<S>,
}

impl<S: OutputSink + Send + 'static> ThreadedSink<S> {
    pub fn spawn(mut sink: S, capacity: usize) -> Result<Self> {
        let (tx, rx) = bounded::<Message>(capacity.max(1));
        let handle = std::thread::Builder::new()
            .name("output-sink".to_string())
            .spawn(move || -> Result<S> {
                for message in rx.iter() {
                    match message {
                        Message::Frame(frame, output) => sink.consume(&frame, &output)?,
                        Message::Reset => sink.on_reset(),
                    }
                }
                sink.finish()?;
                Ok(sink)
            })
            .context("failed to spawn output thread")?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
            inner: None,
        })
    }

    /// The wrapped sink, once `finish` succeeded.
    pub fn into_inner(mut self) -> Option<S> {
        self.inner.take()
    }

    fn join(&mut self) -> Result<()> {
        self.tx = None;
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let sink = handle
            .join()
            .map_err(|_| anyhow!("output thread panicked"))??;
        self.inner = Some(sink);
        Ok(())
    }

    fn send(&mut self, message: Message) -> Result<()> {
        let Some(tx) = &self.tx else {
            return Err(anyhow!("output thread already finished"));
        };
        if tx.send(message).is_err() {
            // Receiver gone: the consumer stopped on an error. Join to surface it.
            self.join()?;
            return Err(anyhow!("output thread exited early"));
        }
        Ok(())
    }
}

impl<S: OutputSink + Send + 'static> OutputSink for ThreadedSink<S> {
    fn consume(&mut self, frame: &Frame, output: &FrameOutput) -> Result<()> {
        self.send(Message::Frame(
            Arc::new(frame.clone()),
            Arc::new(output.clone()),
        ))
    }

    fn on_reset(&mut self) {
        if let Err(err) = self.send(Message::Reset) {
            log::warn!("failed to forward reset to output thread: {:#}", err);
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.join()
    }
}

impl<S: OutputSink + Send + 'static> Drop for ThreadedSink<S> {
    fn drop(&mut self) {
        if let Err(err) = self.join() {
            log::warn!("output thread ended with error: {:#}", err);
        }
    }
}
