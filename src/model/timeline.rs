use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::milestone::Milestone;
use super::task::Task;

/// Controls how many days each header cell groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewGranularity {
    Day,
    #[default]
    Week,
    Month,
}

impl ViewGranularity {
    pub const ALL: [ViewGranularity; 3] = [Self::Day, Self::Week, Self::Month];

    /// Pixels per day. Finer granularity gets wider days.
    pub fn default_pixels_per_day(self) -> f32 {
        match self {
            Self::Day => 40.0,
            Self::Week => 18.0,
            Self::Month => 5.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::Week => "Week",
            Self::Month => "Month",
        }
    }
}

/// One cell of the axis header.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub label: String,
    pub sub_label: String,
    /// First date covered by the cell (after clipping).
    pub start: NaiveDate,
    pub x: f32,
    pub width: f32,
    pub is_weekend: bool,
    pub is_today: bool,
}

/// Maps calendar dates onto horizontal pixel offsets.
///
/// `domain_start` sits at x = 0; both domain ends are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineProjector {
    pub domain_start: NaiveDate,
    pub domain_end: NaiveDate,
    pub granularity: ViewGranularity,
    pub pixels_per_day: f32,
    pub week_start: Weekday,
    pub today: NaiveDate,
}

/// Padding applied around scheduled dates.
const LEAD_DAYS: i64 = 7;
const TRAIL_DAYS: i64 = 14;
/// Span of the default domain when nothing is scheduled.
const EMPTY_SPAN_DAYS: i64 = 30;

impl TimelineProjector {
    pub fn new(
        domain_start: NaiveDate,
        domain_end: NaiveDate,
        granularity: ViewGranularity,
        week_start: Weekday,
        today: NaiveDate,
    ) -> Self {
        Self {
            domain_start,
            domain_end: domain_end.max(domain_start),
            granularity,
            pixels_per_day: granularity.default_pixels_per_day(),
            week_start,
            today,
        }
    }

    /// Fit the domain to the given tasks and milestones.
    pub fn fit<'a>(
        tasks: impl IntoIterator<Item = &'a Task>,
        milestones: impl IntoIterator<Item = &'a Milestone>,
        granularity: ViewGranularity,
        week_start: Weekday,
        today: NaiveDate,
    ) -> Self {
        let dates = tasks
            .into_iter()
            .flat_map(|t| [t.start_date, t.end_date])
            .chain(milestones.into_iter().map(|m| m.date));
        let (start, end) = domain_for(dates, week_start, today);
        Self::new(start, end, granularity, week_start, today)
    }

    pub fn with_pixels_per_day(mut self, pixels_per_day: f32) -> Self {
        self.pixels_per_day = pixels_per_day.max(0.5);
        self
    }

    /// Convert a date to an x-pixel offset from the domain start.
    pub fn date_to_x(&self, date: NaiveDate) -> f32 {
        (date - self.domain_start).num_days() as f32 * self.pixels_per_day
    }

    /// Convert an x-pixel offset back to the nearest date.
    pub fn x_to_date(&self, x: f32) -> NaiveDate {
        self.domain_start + Duration::days(self.days_for(x))
    }

    /// Whole days a horizontal pixel delta corresponds to.
    pub fn days_for(&self, delta_x: f32) -> i64 {
        (delta_x / self.pixels_per_day).round() as i64
    }

    /// Offset and width of an inclusive date range.
    pub fn span(&self, start: NaiveDate, end: NaiveDate) -> (f32, f32) {
        let x = self.date_to_x(start);
        let days = (end - start).num_days() + 1;
        (x, days.max(1) as f32 * self.pixels_per_day)
    }

    /// Total width in pixels of the domain.
    pub fn total_width(&self) -> f32 {
        self.date_to_x(self.domain_end) + self.pixels_per_day
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.domain_start <= date && date <= self.domain_end
    }

    pub fn today_x(&self) -> Option<f32> {
        self.contains(self.today).then(|| self.date_to_x(self.today))
    }

    /// Header cells for the active granularity.
    pub fn header_cells(&self) -> Vec<HeaderCell> {
        match self.granularity {
            ViewGranularity::Day => self.day_cells(),
            ViewGranularity::Week => self.week_cells(),
            ViewGranularity::Month => self.month_cells(),
        }
    }

    fn day_cells(&self) -> Vec<HeaderCell> {
        self.domain_start
            .iter_days()
            .take_while(|d| *d <= self.domain_end)
            .map(|date| HeaderCell {
                label: date.format("%d").to_string(),
                sub_label: date.format("%a").to_string(),
                start: date,
                x: self.date_to_x(date),
                width: self.pixels_per_day,
                is_weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                is_today: date == self.today,
            })
            .collect()
    }

    fn week_cells(&self) -> Vec<HeaderCell> {
        let mut cells = Vec::new();
        let mut week = start_of_week(self.domain_start, self.week_start);
        while week <= self.domain_end {
            let next = week + Duration::days(7);
            let first = week.max(self.domain_start);
            let last = (next - Duration::days(1)).min(self.domain_end);
            // Number the week after the Monday it contains.
            let monday =
                week + Duration::days((7 - week.weekday().num_days_from_monday() as i64) % 7);
            cells.push(self.clipped_cell(
                first,
                last,
                format!("W{:02}", monday.iso_week().week()),
                week.format("%b %d").to_string(),
            ));
            week = next;
        }
        cells
    }

    fn month_cells(&self) -> Vec<HeaderCell> {
        let mut cells = Vec::new();
        let mut month = first_of_month(self.domain_start);
        while month <= self.domain_end {
            let next = next_month(month);
            let first = month.max(self.domain_start);
            let last = (next - Duration::days(1)).min(self.domain_end);
            cells.push(self.clipped_cell(
                first,
                last,
                month.format("%B").to_string(),
                month.format("%Y").to_string(),
            ));
            month = next;
        }
        cells
    }

    fn clipped_cell(
        &self,
        first: NaiveDate,
        last: NaiveDate,
        label: String,
        sub_label: String,
    ) -> HeaderCell {
        let (x, width) = self.span(first, last);
        HeaderCell {
            label,
            sub_label,
            start: first,
            x,
            width,
            is_weekend: false,
            is_today: first <= self.today && self.today <= last,
        }
    }
}

/// Display domain for a set of scheduled dates.
///
/// Empty input falls back to the current week through thirty days out.
pub fn domain_for(
    dates: impl IntoIterator<Item = NaiveDate>,
    week_start: Weekday,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for date in dates {
        bounds = Some(match bounds {
            Some((lo, hi)) => (lo.min(date), hi.max(date)),
            None => (date, date),
        });
    }
    match bounds {
        Some((lo, hi)) => (
            start_of_week(lo, week_start) - Duration::days(LEAD_DAYS),
            hi + Duration::days(TRAIL_DAYS),
        ),
        None => (
            start_of_week(today, week_start),
            today + Duration::days(EMPTY_SPAN_DAYS),
        ),
    }
}

pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    date - Duration::days(offset as i64)
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn next_month(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(first + Duration::days(31))
}
