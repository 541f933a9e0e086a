use super::clock::HOURS_PER_YEAR;
use super::types::DispatchError;

/// A DR hour could not be applied to the system state.
///
/// The previous state is kept and nothing is written to the event log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HourError {
    #[error("hour {hour}: DR state update failed: {source}")]
    StateUpdate {
        hour: u32,
        #[source]
        source: DispatchError,
    },
}

/// A jump request was refused or landed on a failing hour.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JumpError {
    #[error("Invalid hour value {0}. Please enter a number between 0 and {HOURS_PER_YEAR}.")]
    OutOfRange(i64),
    /// The clock moved to the hour but its DR update was rejected.
    #[error(transparent)]
    Hour(#[from] HourError),
}
