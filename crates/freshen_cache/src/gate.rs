//! Completion state shared by the blocking and async records.

/// Where a record's completion gate stands.
///
/// `Pending` is the only open state. Every other state is signaled and
/// never returns to `Pending`.
#[derive(Debug)]
pub(crate) enum GateState<T, E> {
    /// The refresher has not published yet.
    Pending,
    /// The producer finished; its outcome is immutable from here on.
    Ready(Result<T, E>),
    /// A completed outcome was discarded by `clear`.
    Cleared,
    /// The refresher panicked or was dropped before publishing.
    Abandoned,
}

impl<T, E> GateState<T, E> {
    pub(crate) fn is_pending(&self) -> bool {
        matches!(self, GateState::Pending)
    }

    /// Discards a completed outcome. A pending gate is left alone so the
    /// in-flight refresh still reaches its waiters.
    pub(crate) fn clear(&mut self) {
        if matches!(self, GateState::Ready(_)) {
            *self = GateState::Cleared;
        }
    }
}

impl<T: Clone, E: Clone> GateState<T, E> {
    /// The outcome a waiter should return, or `None` if it must retry.
    pub(crate) fn outcome(&self) -> Option<Result<T, E>> {
        match self {
            GateState::Ready(outcome) => Some(outcome.clone()),
            GateState::Pending | GateState::Cleared | GateState::Abandoned => None,
        }
    }
}
