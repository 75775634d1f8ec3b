use regex::Regex;
use std::sync::LazyLock;

/// "GMT"/"UTC", optional sign, 1-2 digit hour, optional `:mm` (colon optional)
static GMT_OFFSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:GMT|UTC)\s*([+-]?)(\d{1,2})(?::?(\d{2}))?").expect("valid regex")
});

/// Minutes east of UTC
const IST_OFFSET_MINUTES: i32 = 5 * 60 + 30;

/// A parsed UTC offset, stored in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimezoneOffset(i32);

impl TimezoneOffset {
    pub fn from_minutes(minutes: i32) -> Self {
        Self(minutes)
    }

    pub fn minutes(&self) -> i32 {
        self.0
    }

    /// Offset in fractional hours ("GMT+5:30" is 5.5)
    pub fn hours(&self) -> f64 {
        f64::from(self.0) / 60.0
    }

    /// Absolute distance between two offsets, in minutes
    pub fn distance_minutes(&self, other: &TimezoneOffset) -> u32 {
        self.0.abs_diff(other.0)
    }
}

/// Parse a free-text timezone label into an offset.
///
/// `None` means "unknown", which is not the same as a zero offset: absent,
/// empty and unparseable labels all land here.
pub fn parse_timezone_offset(label: Option<&str>) -> Option<TimezoneOffset> {
    let label = label.filter(|l| !l.is_empty())?;
    let upper = label.to_uppercase();

    if upper == "IST" {
        return Some(TimezoneOffset(IST_OFFSET_MINUTES));
    }

    let caps = GMT_OFFSET_RE.captures(&upper)?;
    let sign = if caps.get(1).map(|m| m.as_str()) == Some("-") { -1 } else { 1 };
    let hours: i32 = caps.get(2)?.as_str().parse().ok()?;
    let minutes: i32 = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };

    Some(TimezoneOffset(sign * (hours * 60 + minutes)))
}

/// True when a label is present at all, parseable or not
pub fn has_stated_timezone(label: Option<&str>) -> bool {
    label.map_or(false, |l| !l.is_empty())
}
