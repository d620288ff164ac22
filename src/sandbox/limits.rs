//! Execution and reply limits.

use std::time::Duration;

/// Maximum length of one protocol line, excluding the trailing CRLF.
pub const PROTOCOL_LINE_BUDGET: usize = 510;
/// Allowance for the longest host mask the server may prepend.
pub const MAX_HOST_LENGTH: usize = 62;
/// Length of the `PRIVMSG` command keyword.
pub const COMMAND_KEYWORD_LENGTH: usize = 7;
/// Spaces between prefix, command, target and text.
pub const SPACING_OVERHEAD: usize = 3;
/// The two colons framing prefix and trailing parameter.
pub const COLON_OVERHEAD: usize = 2;

/// Maximum reply length for a given destination.
///
/// `2 * (510 - 62 - 7 - target_length - 3 - 2)`; saturates at zero for
/// absurdly long targets.
pub fn max_reply_length(target_length: usize) -> usize {
    let single = PROTOCOL_LINE_BUDGET
        .saturating_sub(MAX_HOST_LENGTH)
        .saturating_sub(COMMAND_KEYWORD_LENGTH)
        .saturating_sub(target_length)
        .saturating_sub(SPACING_OVERHEAD)
        .saturating_sub(COLON_OVERHEAD);
    2 * single
}

/// Limits applied to one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    /// Wall-clock limit for the run stage.
    pub wall_clock_timeout: Duration,
    /// Maximum reply length for the job's destination.
    pub max_reply_length: usize,
}

impl ExecutionLimits {
    /// Limits for a destination whose name is `target` bytes long.
    pub fn for_target(wall_clock_timeout: Duration, target: &str) -> Self {
        Self {
            wall_clock_timeout,
            max_reply_length: max_reply_length(target.len()),
        }
    }
}
