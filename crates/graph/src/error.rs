use crate::MAX_RAIL;

/// Errors raised by [`GraphContext::finish`](crate::GraphContext::finish).
///
/// There is no partial-success mode: once either variant is returned the
/// context's `n_err`-equivalent flag (see [`GraphContext::has_error`])
/// stays set and the caller must render without graph ornamentation.
#[derive(Debug)]
pub enum GraphError {
    /// The layout needed more than [`MAX_RAIL`] simultaneous rails, either
    /// because the free-rail scan found no free bit in its span, or
    /// because `max_rail` was pushed past the budget by a direct
    /// allocation (a timewarp down-rail, an off-screen merge rail, or the
    /// duplicate-routing rail).
    RailExhausted { reached: i32 },
    /// `finish` was called on a context that had already finished (either
    /// successfully or with an error).
    AlreadyFinished,
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            GraphError::RailExhausted { reached } => {
                write!(
                    f,
                    "graph layout needs {reached} rails, budget is {MAX_RAIL}"
                )
            }
            GraphError::AlreadyFinished => {
                write!(f, "finish() called on a context that already finished")
            }
        }
    }
}

impl std::error::Error for GraphError {}
