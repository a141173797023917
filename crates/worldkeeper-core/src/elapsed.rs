const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Renders a duration in its single largest whole unit, e.g. `5 minutes`.
pub fn format_elapsed_secs(seconds: u64) -> String {
    let (value, unit) = if seconds < MINUTE {
        (seconds, "second")
    } else if seconds < HOUR {
        (seconds / MINUTE, "minute")
    } else if seconds < DAY {
        (seconds / HOUR, "hour")
    } else if seconds < WEEK {
        (seconds / DAY, "day")
    } else {
        (seconds / WEEK, "week")
    };

    let plural = if value == 1 { "" } else { "s" };
    format!("{value} {unit}{plural}")
}

/// Elapsed time between a previous wipe (unix ms) and `now_ms`.
///
/// A missing record, or one from the future, renders as `0 seconds`.
pub fn format_elapsed_since(previous_ms: Option<u64>, now_ms: u64) -> String {
    let seconds = previous_ms
        .map(|previous| now_ms.saturating_sub(previous) / 1000)
        .unwrap_or(0);
    format_elapsed_secs(seconds)
}
