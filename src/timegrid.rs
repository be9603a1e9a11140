use std::fmt;

/// Length of one display row. The grid is a half-hour grid everywhere;
/// slot durations are arbitrary whole minutes.
pub const ROW_MINUTES: i64 = 30;

pub const DAYS_PER_WEEK: i64 = 7;

/// Default visible window: 08:00 up to (not including) 18:30,
/// i.e. row starts 08:00, 08:30, ..., 18:00.
pub const DEFAULT_DAY_ORIGIN_MIN: i64 = 8 * 60;
pub const DEFAULT_DAY_END_MIN: i64 = 18 * 60 + 30;

pub const DEFAULT_ROW_HEIGHT_PX: f64 = 60.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadTime {
    pub input: String,
    pub reason: &'static str,
}

impl fmt::Display for BadTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for BadTime {}

/// Parse "HH:MM" or "HH:MM:SS" into minutes since midnight.
/// Times are whole minutes; a non-zero seconds field is rejected.
pub fn parse_time_minutes(raw: &str) -> Result<i64, BadTime> {
    let bad = |reason: &'static str| BadTime {
        input: raw.to_string(),
        reason,
    };

    let mut parts = raw.trim().split(':');
    let hh = parts.next().ok_or_else(|| bad("missing hours"))?;
    let mm = parts.next().ok_or_else(|| bad("missing minutes"))?;
    let ss = parts.next();
    if parts.next().is_some() {
        return Err(bad("too many components"));
    }

    let parse_2 = |s: &str, reason: &'static str| -> Result<i64, BadTime> {
        if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(bad(reason));
        }
        s.parse::<i64>().map_err(|_| bad(reason))
    };

    let hours = parse_2(hh, "hours must be two digits")?;
    let minutes = parse_2(mm, "minutes must be two digits")?;
    if hours > 23 {
        return Err(bad("hours out of range"));
    }
    if minutes > 59 {
        return Err(bad("minutes out of range"));
    }
    if let Some(ss) = ss {
        let seconds = parse_2(ss, "seconds must be two digits")?;
        if seconds > 59 {
            return Err(bad("seconds out of range"));
        }
        if seconds != 0 {
            return Err(bad("sub-minute times are not supported"));
        }
    }

    Ok(hours * 60 + minutes)
}

pub fn format_hhmm(minutes: i64) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Canonical persisted form, e.g. "09:45:00".
pub fn format_hhmmss(minutes: i64) -> String {
    format!("{:02}:{:02}:00", minutes / 60, minutes % 60)
}

/// Half-open interval overlap on minutes-since-midnight.
pub fn ranges_overlap(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> bool {
    a_start < b_end && a_end > b_start
}

/// Move a slot to a new start, keeping its original duration.
pub fn retarget(start_min: i64, end_min: i64, target_start_min: i64) -> (i64, i64) {
    let duration = end_min - start_min;
    (target_start_min, target_start_min + duration)
}

/// Vertical pixel band for one slot within a day column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub top_px: f64,
    pub height_px: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub day_origin_min: i64,
    pub day_end_min: i64,
    pub row_height_px: f64,
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            day_origin_min: DEFAULT_DAY_ORIGIN_MIN,
            day_end_min: DEFAULT_DAY_END_MIN,
            row_height_px: DEFAULT_ROW_HEIGHT_PX,
        }
    }
}

impl GridGeometry {
    /// top = (start - origin)/30 * rowHeight, height = (end - start)/30 * rowHeight.
    pub fn band(&self, start_min: i64, end_min: i64) -> Band {
        let top_px =
            ((start_min - self.day_origin_min) as f64 / ROW_MINUTES as f64) * self.row_height_px;
        let height_px = ((end_min - start_min) as f64 / ROW_MINUTES as f64) * self.row_height_px;
        Band { top_px, height_px }
    }

    /// The single display row a slot belongs to: the half-hour bucket
    /// containing its start. Starts before the origin land in row 0 so the
    /// slot is still rendered exactly once.
    pub fn row_index(&self, start_min: i64) -> usize {
        let idx = (start_min - self.day_origin_min).div_euclid(ROW_MINUTES);
        idx.max(0) as usize
    }

    /// Row start times in minutes, origin inclusive, end exclusive.
    pub fn row_starts(&self) -> Vec<i64> {
        let mut rows = Vec::new();
        let mut t = self.day_origin_min;
        while t < self.day_end_min {
            rows.push(t);
            t += ROW_MINUTES;
        }
        rows
    }
}
