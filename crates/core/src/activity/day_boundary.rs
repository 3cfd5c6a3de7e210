use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};

/// Clock plus calendar-day boundary used for the "logged today" signal and
/// for splitting upcoming from past appointments.
pub trait DayBoundary: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar day `at` falls on in this boundary's time zone.
    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate;

    /// First instant of the day after the one `at` falls on.
    fn next_day_start(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>>;

    fn is_today(&self, at: DateTime<Utc>) -> bool {
        self.day_of(at) == self.day_of(self.now())
    }
}

/// System clock, days split at local midnight.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalDayBoundary;

impl DayBoundary for LocalDayBoundary {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&Local).date_naive()
    }

    fn next_day_start(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = self.day_of(at).succ_opt()?.and_hms_opt(0, 0, 0)?;
        // Earliest, in case a DST shift repeats local midnight.
        midnight
            .and_local_timezone(Local)
            .earliest()
            .map(|start| start.with_timezone(&Utc))
    }
}

/// Pinned clock in a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedDayBoundary {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
}

impl FixedDayBoundary {
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self {
            now,
            offset: Utc.fix(),
        }
    }
}

impl DayBoundary for FixedDayBoundary {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    fn next_day_start(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let midnight = self.day_of(at).succ_opt()?.and_hms_opt(0, 0, 0)?;
        midnight
            .and_local_timezone(self.offset)
            .single()
            .map(|start| start.with_timezone(&Utc))
    }
}
