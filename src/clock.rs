use chrono::Utc;
use rand::Rng;

/// Earliest minute of day a daily round may be scheduled for (08:00 UTC).
const DAILY_WINDOW_START_MIN: u32 = 8 * 60;
/// Latest minute of day a daily round may be scheduled for (19:00 UTC).
const DAILY_WINDOW_END_MIN: u32 = 19 * 60;

pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Current UTC calendar date as `YYYY-MM-DD`.
pub fn today_utc() -> String {
    Utc::now().format("%Y-%m-%d").to_string()
}

/// Current UTC time of day as zero-padded `HH:MM`.
pub fn hhmm_now_utc() -> String {
    Utc::now().format("%H:%M").to_string()
}

/// Strict `H?H:MM` parser. Rejects out-of-range hours/minutes.
pub fn parse_hhmm(s: &str) -> Option<(u32, u32)> {
    let s = s.trim();
    let (hh, mm) = s.split_once(':')?;
    if hh.is_empty() || hh.len() > 2 || mm.len() != 2 {
        return None;
    }
    if !hh.chars().all(|c| c.is_ascii_digit()) || !mm.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let hh: u32 = hh.parse().ok()?;
    let mm: u32 = mm.parse().ok()?;
    if hh > 23 || mm > 59 {
        return None;
    }
    Some((hh, mm))
}

/// Draws a uniform start time within the daytime window.
pub fn random_daily_hhmm() -> String {
    let minute_of_day = rand::rng().random_range(DAILY_WINDOW_START_MIN..=DAILY_WINDOW_END_MIN);
    format!("{:02}:{:02}", minute_of_day / 60, minute_of_day % 60)
}

/// Short human-readable duration: `45s`, `9 min 30s`, `2h 5m`, `1d 3h`.
pub fn humanize_seconds(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        return format!("{}s", seconds);
    }
    let (mins, rem) = (seconds / 60, seconds % 60);
    if mins < 60 {
        return if rem == 0 {
            format!("{} min", mins)
        } else {
            format!("{} min {}s", mins, rem)
        };
    }
    let (hrs, mins) = (mins / 60, mins % 60);
    if hrs < 24 {
        return if mins == 0 {
            format!("{}h", hrs)
        } else {
            format!("{}h {}m", hrs, mins)
        };
    }
    let (days, hrs) = (hrs / 24, hrs % 24);
    if hrs == 0 {
        format!("{}d", days)
    } else {
        format!("{}d {}h", days, hrs)
    }
}
