//! The iterator state machine (states {Fresh, Iterating,
//! Exhausted, Closed}).

/// Where an iterator sits in its lifecycle. `reset` always returns to
/// `Fresh`; `close` always moves to `Closed`, from which no further
/// state transition is possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IterState {
    /// Never advanced (or just reset). The next `next` starts from the
    /// beginning of the result set.
    #[default]
    Fresh,
    /// At least one `next` has returned `true`; `result` holds a
    /// value.
    Iterating,
    /// `next` has returned `false`; no more results remain until
    /// `reset`.
    Exhausted,
    /// `close` has been called. Terminal; all further calls except a
    /// repeated `close` are errors.
    Closed,
}

impl IterState {
    /// Whether this state permits a further `next`/`contains` call.
    pub fn is_live(&self) -> bool {
        !matches!(self, IterState::Closed)
    }
}
