use crossbeam_channel::{unbounded, Receiver, Sender};

use super::state::Command;

/// Cloneable handle for steering a running pipeline from other threads
/// (signal handlers, keyboard readers, UIs).
///
/// Sends never fail: once the pipeline has finished, commands are silently dropped.
#[derive(Clone, Debug)]
pub struct Controller {
    tx: Sender<Command>,
}

/// Create a controller and the receiving end handed to `Pipeline::run`.
pub fn command_channel() -> (Controller, Receiver<Command>) {
    let (tx, rx) = unbounded();
    (Controller { tx }, rx)
}

impl Controller {
    pub fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            log::debug!("pipeline gone, dropping {:?}", command);
        }
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    pub fn resume(&self) {
        self.send(Command::Resume);
    }

    pub fn reset(&self) {
        self.send(Command::Reset);
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_arrive_in_order() {
        let (controller, rx) = command_channel();
        let other = controller.clone();
        controller.pause();
        other.reset();
        controller.stop();
        let received: Vec<Command> = rx.try_iter().collect();
        assert_eq!(received, vec![Command::Pause, Command::Reset, Command::Stop]);
    }

    #[test]
    fn sending_after_receiver_dropped_is_harmless() {
        let (controller, rx) = command_channel();
        drop(rx);
        controller.stop();
    }
}
