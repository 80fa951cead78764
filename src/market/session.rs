use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use crate::data::types::{Region, SessionState, SessionStatus};

/// Regular-session window expressed as UTC minutes of the day, `open <= m < close`.
///
/// These are fixed-offset approximations: no daylight-saving shift and no
/// holiday calendar. The US window spans both EST and EDT opens, so it reports
/// open for an hour before the bell in winter and for an hour after the close
/// in summer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub open_minute: u32,
    pub close_minute: u32,
}

/// 09:15-15:30 IST (UTC+5:30).
pub const INDIA_WINDOW: SessionWindow = SessionWindow {
    open_minute: 225,
    close_minute: 600,
};

/// 13:30-21:00 UTC.
pub const US_WINDOW: SessionWindow = SessionWindow {
    open_minute: 810,
    close_minute: 1260,
};

impl SessionWindow {
    pub fn contains(&self, minute_of_day: u32) -> bool {
        minute_of_day >= self.open_minute && minute_of_day < self.close_minute
    }
}

/// Session status for a region at `now`. Never touches the backend.
pub fn status(region: Region, now: DateTime<Utc>) -> SessionStatus {
    match region {
        Region::Crypto => SessionStatus::open(SessionState::Live247),
        Region::In => weekday_session(&INDIA_WINDOW, now),
        Region::Us => weekday_session(&US_WINDOW, now),
    }
}

fn weekday_session(window: &SessionWindow, now: DateTime<Utc>) -> SessionStatus {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return SessionStatus::closed(SessionState::Weekend);
    }

    let minute_of_day = now.hour() * 60 + now.minute();
    if window.contains(minute_of_day) {
        SessionStatus::open(SessionState::MarketOpen)
    } else {
        SessionStatus::closed(SessionState::MarketClosed)
    }
}
