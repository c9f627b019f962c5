use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

type Outcome = (u64, Result<Vec<Detection>>);

/// Bounded-wait wrapper around another backend.
///
/// The wrapped backend runs on a dedicated worker thread. `detect` waits at most
/// `deadline` for the result; a miss is reported as an error so the pipeline scores the
/// frame as "no detection". While the worker is still busy with a late frame, further
/// frames fail fast instead of queueing behind it.
pub struct DeadlineBackend {
    name: &'static str,
    deadline: Duration,
    requests: Sender<(u64, Frame)>,
    results: Receiver<Outcome>,
    next_seq: u64,
    in_flight: Option<u64>,
}

impl DeadlineBackend {
    /// Warm up `backend` on the calling thread, then move it onto a worker thread.
    pub fn spawn<B: DetectorBackend + 'static>(mut backend: B, deadline: Duration) -> Result<Self> {
        backend.warm_up()?;
        let name = backend.name();
        let (requests, request_rx) = bounded::<(u64, Frame)>(1);
        let (result_tx, results) = bounded::<Outcome>(1);

        thread::Builder::new()
            .name(format!("detector-{}", name))
            .spawn(move || {
                for (seq, frame) in request_rx.iter() {
                    let outcome = backend.detect(&frame);
                    if result_tx.send((seq, outcome)).is_err() {
                        break;
                    }
                }
            })
            .context("spawn detector worker")?;

        Ok(Self {
            name,
            deadline,
            requests,
            results,
            next_seq: 0,
            in_flight: None,
        })
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Collect a late result, if any. Returns an error while the worker is still busy.
    fn drain_late_result(&mut self) -> Result<()> {
        let Some(seq) = self.in_flight else {
            return Ok(());
        };
        match self.results.try_recv() {
            Ok((done, _)) => {
                log::debug!(
                    "detector {}: discarded late result {} (waiting on {})",
                    self.name,
                    done,
                    seq
                );
                self.in_flight = None;
                Ok(())
            }
            Err(TryRecvError::Empty) => Err(anyhow!(
                "detector {} still busy with an earlier frame",
                self.name
            )),
            Err(TryRecvError::Disconnected) => Err(anyhow!("detector {} worker exited", self.name)),
        }
    }
}

impl DetectorBackend for DeadlineBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.drain_late_result()?;

        let seq = self.next_seq;
        self.next_seq += 1;
        self.requests
            .send((seq, frame.clone()))
            .map_err(|_| anyhow!("detector {} worker exited", self.name))?;
        self.in_flight = Some(seq);

        match self.results.recv_timeout(self.deadline) {
            Ok((_, outcome)) => {
                self.in_flight = None;
                outcome
            }
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "detector {} exceeded {:?} deadline on frame {}",
                self.name,
                self.deadline,
                frame.index
            )),
            Err(RecvTimeoutError::Disconnected) => {
                self.in_flight = None;
                Err(anyhow!("detector {} worker exited", self.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowBackend {
        delay: Duration,
    }

    impl DetectorBackend for SlowBackend {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>> {
            thread::sleep(self.delay);
            Ok(vec![Detection::at(1.0, 1.0, 0.9)])
        }
    }

    #[test]
    fn fast_backend_results_pass_through() -> Result<()> {
        let mut backend = DeadlineBackend::spawn(
            SlowBackend {
                delay: Duration::from_millis(0),
            },
            Duration::from_secs(5),
        )?;
        let frame = Frame::filled(0, 2, 2, [0, 0, 0])?;
        assert_eq!(backend.detect(&frame)?.len(), 1);
        assert_eq!(backend.name(), "slow");
        Ok(())
    }

    #[test]
    fn missed_deadline_is_an_error() -> Result<()> {
        let mut backend = DeadlineBackend::spawn(
            SlowBackend {
                delay: Duration::from_millis(300),
            },
            Duration::from_millis(10),
        )?;
        let frame = Frame::filled(0, 2, 2, [0, 0, 0])?;
        assert!(backend.detect(&frame).is_err());
        // Worker is still busy with frame 0.
        assert!(backend.detect(&frame).is_err());

        thread::sleep(Duration::from_millis(400));
        backend.deadline = Duration::from_secs(5);
        assert_eq!(backend.detect(&frame)?.len(), 1);
        Ok(())
    }
}
