use std::fmt;

/// Lifecycle state of a game. Games only ever move forward:
/// `Waiting -> Playing -> Finished -> Unknown`, the last meaning closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    #[default]
    Unknown,
    Waiting,
    Playing,
    Finished,
}

impl State {
    pub fn waiting(self) -> bool {
        self == State::Waiting
    }

    pub fn playing(self) -> bool {
        self == State::Playing
    }

    pub fn finished(self) -> bool {
        self == State::Finished
    }

    pub fn unknown(self) -> bool {
        self == State::Unknown
    }

    /// Whether moving from `self` to `next` follows the lifecycle order.
    pub fn can_advance_to(self, next: State) -> bool {
        matches!(
            (self, next),
            (State::Unknown, State::Waiting)
                | (State::Waiting, State::Playing)
                | (State::Playing, State::Finished)
                | (State::Waiting | State::Playing | State::Finished, State::Unknown)
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Unknown => "unknown",
            State::Waiting => "waiting",
            State::Playing => "playing",
            State::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Membership state of a participant inside a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParticipantState {
    #[default]
    Unknown,
    Playing,
    Spectating,
}

impl ParticipantState {
    pub fn playing(self) -> bool {
        self == ParticipantState::Playing
    }

    pub fn spectating(self) -> bool {
        self == ParticipantState::Spectating
    }

    pub fn unknown(self) -> bool {
        self == ParticipantState::Unknown
    }
}
