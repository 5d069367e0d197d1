//! Calendar projections over the appointment list.
//!
//! Everything here is recomputed on demand. The list covers one office over
//! a bounded range, so linear scans are fine.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};

use crate::appointment::Appointment;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    first: NaiveDate,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|first| Month { first })
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Month {
            first: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn next(&self) -> Self {
        Month {
            first: self.first.checked_add_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    pub fn previous(&self) -> Self {
        Month {
            first: self.first.checked_sub_months(Months::new(1)).unwrap_or(self.first),
        }
    }

    /// Number of days, 28 to 31.
    pub fn days_in_month(&self) -> u32 {
        let next = self.next().first;
        if next == self.first {
            // Last representable month; count forward instead.
            return self.first.iter_days().take_while(|d| d.month() == self.month()).count() as u32;
        }
        (next - self.first).num_days() as u32
    }

    /// Blank cells before day 1 in a Sunday-first week, 0 to 6.
    pub fn first_weekday(&self) -> u32 {
        self.first.weekday().num_days_from_sunday()
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        self.first.iter_days().take(self.days_in_month() as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Month::of(date) == *self
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.first.format("%B %Y"))
    }
}

impl FromStr for Month {
    type Err = String;

    /// Parse `YYYY-MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid month '{}'. Expected YYYY-MM", s);
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

/// Read-only projections over a set of appointments.
#[derive(Debug, Clone, Copy)]
pub struct CalendarView<'a> {
    appointments: &'a [Appointment],
}

impl<'a> CalendarView<'a> {
    pub fn new(appointments: &'a [Appointment]) -> Self {
        CalendarView { appointments }
    }

    /// True if any appointment falls on `date`.
    pub fn is_busy(&self, date: NaiveDate) -> bool {
        self.appointments.iter().any(|a| a.date == date)
    }

    /// Appointments on `date`, earliest first.
    pub fn appointments_for_day(&self, date: NaiveDate) -> Vec<&'a Appointment> {
        let mut day: Vec<&Appointment> =
            self.appointments.iter().filter(|a| a.date == date).collect();
        // Stable, so same-time appointments keep store order.
        day.sort_by_key(|a| a.time);
        day
    }

    /// Days of `month` with no appointments, ascending.
    pub fn free_days_in_month(&self, month: Month) -> Vec<NaiveDate> {
        month.days().filter(|d| !self.is_busy(*d)).collect()
    }

    pub fn busy_days_in_month(&self, month: Month) -> Vec<NaiveDate> {
        month.days().filter(|d| self.is_busy(*d)).collect()
    }

    pub fn find(&self, id: &str) -> Option<&'a Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }
}

/// Calendar grid cells for `month`: leading blanks, then every day.
pub fn month_grid(month: Month) -> Vec<Option<NaiveDate>> {
    std::iter::repeat_n(None, month.first_weekday() as usize)
        .chain(month.days().map(Some))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::AppointmentKind;
    use chrono::{NaiveTime, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn appointment(id: &str, day: NaiveDate, time: &str) -> Appointment {
        Appointment {
            id: id.to_string(),
            office_id: "exec-office".to_string(),
            date: day,
            time: NaiveTime::parse_from_str(time, "%H:%M").unwrap(),
            title: format!("Appointment {}", id),
            kind: AppointmentKind::Work,
            note: None,
            dress_code: None,
            created_by: "Secretary".to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn month_geometry() {
        assert_eq!(Month::new(2025, 6).unwrap().days_in_month(), 30);
        assert_eq!(Month::new(2025, 2).unwrap().days_in_month(), 28);
        assert_eq!(Month::new(2024, 2).unwrap().days_in_month(), 29);
        assert_eq!(Month::new(2025, 12).unwrap().days_in_month(), 31);

        // 1 June 2025 is a Sunday, 1 February 2025 a Saturday.
        assert_eq!(Month::new(2025, 6).unwrap().first_weekday(), 0);
        assert_eq!(Month::new(2025, 2).unwrap().first_weekday(), 6);
    }

    #[test]
    fn month_navigation_wraps_years() {
        let december = Month::new(2025, 12).unwrap();
        assert_eq!(december.next(), Month::new(2026, 1).unwrap());
        assert_eq!(december.next().previous(), december);
        assert_eq!(Month::of(date(2025, 6, 17)), Month::new(2025, 6).unwrap());
        assert_eq!(december.to_string(), "December 2025");
    }

    #[test]
    fn month_parses_year_month() {
        assert_eq!("2025-06".parse::<Month>().unwrap(), Month::new(2025, 6).unwrap());
        assert!("2025-6".parse::<Month>().is_err());
        assert!("2025-13".parse::<Month>().is_err());
        assert!("June".parse::<Month>().is_err());
    }

    #[test]
    fn grid_has_leading_blanks() {
        let grid = month_grid(Month::new(2025, 2).unwrap());
        assert_eq!(grid.len(), 6 + 28);
        assert!(grid[..6].iter().all(Option::is_none));
        assert_eq!(grid[6], Some(date(2025, 2, 1)));
    }

    #[test]
    fn appointments_for_day_sorted_and_exact() {
        let day = date(2025, 6, 10);
        let records = vec![
            appointment("c", day, "16:00"),
            appointment("x", date(2025, 6, 11), "08:00"),
            appointment("a", day, "09:00"),
            appointment("b", day, "14:30"),
        ];
        let view = CalendarView::new(&records);

        let result = view.appointments_for_day(day);
        let ids: Vec<_> = result.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(result.windows(2).all(|w| w[0].time_label() <= w[1].time_label()));
        assert!(result.iter().all(|a| a.date_key() == "2025-06-10"));
    }

    #[test]
    fn free_and_busy_days_partition_the_month() {
        let month = Month::new(2025, 6).unwrap();
        let records = vec![
            appointment("a", date(2025, 6, 3), "10:00"),
            appointment("b", date(2025, 6, 3), "11:00"),
            appointment("c", date(2025, 6, 30), "10:00"),
            appointment("d", date(2025, 7, 1), "10:00"),
        ];
        let view = CalendarView::new(&records);

        let free = view.free_days_in_month(month);
        let busy = view.busy_days_in_month(month);

        assert_eq!(busy, vec![date(2025, 6, 3), date(2025, 6, 30)]);
        assert_eq!(free.len() + busy.len(), 30);
        assert!(free.iter().all(|d| !busy.contains(d)));
        assert!(free.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_month_is_entirely_free() {
        let view = CalendarView::new(&[]);
        let free = view.free_days_in_month(Month::new(2025, 6).unwrap());
        assert_eq!(free.len(), 30);
        assert_eq!(free.first(), Some(&date(2025, 6, 1)));
        assert_eq!(free.last(), Some(&date(2025, 6, 30)));
    }

    #[test]
    fn seeded_day_scenario() {
        let day = date(2025, 6, 10);
        let mut records = vec![
            appointment("late", day, "14:30"),
            appointment("early", day, "09:00"),
        ];

        let view = CalendarView::new(&records);
        let times: Vec<_> = view.appointments_for_day(day).iter().map(|a| a.time_label()).collect();
        assert_eq!(times, vec!["09:00", "14:30"]);

        records.retain(|a| a.id != "early");
        let view = CalendarView::new(&records);
        let remaining = view.appointments_for_day(day);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].time_label(), "14:30");
        assert!(view.is_busy(day));
    }
}
