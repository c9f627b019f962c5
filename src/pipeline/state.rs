use serde::Serialize;

/// Lifecycle of a tracking session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Running,
    Paused,
    /// Terminal.
    Stopped,
}

/// Discrete control signals accepted by a running session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    /// Clear the trajectory and statistics; the run state is unchanged.
    Reset,
    Stop,
}

/// What applying a command did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Transition {
    /// State moved to the given value.
    Moved(PipelineState),
    /// Tracking state must be cleared; run state unchanged.
    Reset,
    /// Command does not apply in the current state.
    Ignored,
}

impl PipelineState {
    pub(crate) fn on(self, command: Command) -> Transition {
        use PipelineState::*;
        match (self, command) {
            (Running, Command::Pause) => Transition::Moved(Paused),
            (Paused, Command::Resume) => Transition::Moved(Running),
            (Running | Paused, Command::Reset) => Transition::Reset,
            (Running | Paused, Command::Stop) => Transition::Moved(Stopped),
            _ => Transition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_resume_round_trip() {
        assert_eq!(
            PipelineState::Running.on(Command::Pause),
            Transition::Moved(PipelineState::Paused)
        );
        assert_eq!(
            PipelineState::Paused.on(Command::Resume),
            Transition::Moved(PipelineState::Running)
        );
    }

    #[test]
    fn redundant_commands_are_ignored() {
        assert_eq!(PipelineState::Running.on(Command::Resume), Transition::Ignored);
        assert_eq!(PipelineState::Paused.on(Command::Pause), Transition::Ignored);
    }

    #[test]
    fn stopped_is_terminal() {
        for command in [Command::Pause, Command::Resume, Command::Reset, Command::Stop] {
            assert_eq!(PipelineState::Stopped.on(command), Transition::Ignored);
        }
    }

    #[test]
    fn reset_allowed_while_running_or_paused() {
        assert_eq!(PipelineState::Running.on(Command::Reset), Transition::Reset);
        assert_eq!(PipelineState::Paused.on(Command::Reset), Transition::Reset);
    }
}
