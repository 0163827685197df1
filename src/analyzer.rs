use chrono::{DateTime, Datelike, NaiveDate, TimeDelta, Utc, Weekday};
use chrono_tz::Tz;

use crate::types::{Archive, Message, Stats, WeekStart};

/// How far past the analysis clock a recorded timestamp may lie before it
/// is treated as missing.
pub const FUTURE_TOLERANCE: TimeDelta = TimeDelta::days(1);

/// Source of "now" for messages that carry no timestamp.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Single-pass aggregator turning an [`Archive`] into [`Stats`].
///
/// Calendar dates (week buckets and the day span behind the per-day
/// average) are taken in `timezone`.
pub struct StatsAnalyzer<C: Clock = SystemClock> {
    clock: C,
    timezone: Tz,
    week_start: WeekStart,
}

impl StatsAnalyzer<SystemClock> {
    pub fn new() -> Self {
        Self {
            clock: SystemClock,
            timezone: Tz::UTC,
            week_start: WeekStart::default(),
        }
    }
}

impl Default for StatsAnalyzer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> StatsAnalyzer<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> StatsAnalyzer<D> {
        StatsAnalyzer {
            clock,
            timezone: self.timezone,
            week_start: self.week_start,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn with_week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn analyze(&self, archive: &Archive) -> Stats {
        let now = self.clock.now();
        let mut stats = Stats::empty(now);
        stats.conversation_count = archive.conversations.len() as u64;

        // first_message_date starts at `now`; the latest starts at the epoch.
        let mut latest_message_date = DateTime::<Utc>::UNIX_EPOCH;

        for conversation in &archive.conversations {
            let model = conversation.model_label();
            let mut chat_length = 0u64;

            for message in conversation.messages() {
                chat_length += 1;

                let message_date = message_date(message, now);
                stats.first_message_date = stats.first_message_date.min(message_date);
                latest_message_date = latest_message_date.max(message_date);

                match message.role() {
                    Some("user") => {
                        stats.user_message_count += 1;
                        stats.user_char_count += message.body_len();
                    }
                    Some("assistant") => {
                        stats.assistant_message_count += 1;
                        stats.assistant_char_count += message.body_len();
                        *stats.model_counts.entry(model.to_string()).or_insert(0) += 1;
                    }
                    _ => {}
                }

                let week_key = week_start_of(self.local_date(message_date), self.week_start)
                    .format("%Y-%m-%d")
                    .to_string();
                *stats
                    .weekly_messages
                    .entry(week_key)
                    .or_default()
                    .entry(model.to_string())
                    .or_insert(0) += 1;
            }

            stats.chat_lengths.push(chat_length);
            stats.longest_chat = stats.longest_chat.max(chat_length);
        }

        let day_span = self.day_span(stats.first_message_date, latest_message_date);
        stats.average_messages_per_day = stats.total_messages() as f64 / day_span as f64;

        stats
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Inclusive number of calendar days from `first` to `last`, never below 1.
    fn day_span(&self, first: DateTime<Utc>, last: DateTime<Utc>) -> i64 {
        let days = (self.local_date(last) - self.local_date(first)).num_days() + 1;
        days.max(1)
    }
}

/// The instant a message is counted at: its own timestamp when plausible,
/// `now` otherwise.
fn message_date(message: &Message, now: DateTime<Utc>) -> DateTime<Utc> {
    let limit = now.checked_add_signed(FUTURE_TOLERANCE);
    message
        .created_at()
        .filter(|created| limit.is_none_or(|limit| *created <= limit))
        .unwrap_or(now)
}

/// The date on which the week containing `date` begins.
pub fn week_start_of(date: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let offset = days_since(date.weekday(), week_start.weekday());
    date - chrono::Duration::days(offset)
}

fn days_since(day: Weekday, start: Weekday) -> i64 {
    let day = day.num_days_from_monday() as i64;
    let start = start.num_days_from_monday() as i64;
    (day - start).rem_euclid(7)
}
