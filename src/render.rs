//! Colored terminal rendering for appointments and calendars.

use chrono::{Datelike, NaiveDate};
use execsync_core::calendar::{CalendarView, Month, month_grid};
use execsync_core::{Appointment, AppointmentKind};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for AppointmentKind {
    fn render(&self) -> String {
        let tag = format!("[{}]", self.label());
        match self {
            AppointmentKind::Work => tag.blue().to_string(),
            AppointmentKind::Personal => tag.magenta().to_string(),
        }
    }
}

impl Render for Appointment {
    fn render(&self) -> String {
        let mut line = format!(
            "{} {} {}",
            self.time_label().bold(),
            self.title,
            self.kind.render()
        );
        if let Some(dress_code) = &self.dress_code {
            line.push_str(&format!(" {}", format!("dress: {}", dress_code).dimmed()));
        }
        if let Some(note) = &self.note {
            line.push_str(&format!("\n        {}", note.dimmed()));
        }
        line
    }
}

/// Appointments of one day, earliest first, with their ids when asked.
pub fn render_day(appointments: &[&Appointment], with_ids: bool) -> String {
    if appointments.is_empty() {
        return "  No appointments".dimmed().to_string();
    }

    appointments
        .iter()
        .map(|a| {
            if with_ids {
                format!("  {}\n        {}", a.render(), a.id.dimmed())
            } else {
                format!("  {}", a.render())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sunday-first month grid. Busy days are red, today is inverted.
pub fn render_month(month: Month, calendar: &CalendarView, today: NaiveDate) -> String {
    let mut lines = vec![
        format!("{:^20}", month.to_string()).bold().to_string(),
        "Su Mo Tu We Th Fr Sa".dimmed().to_string(),
    ];

    for week in month_grid(month).chunks(7) {
        let cells: Vec<String> = week
            .iter()
            .map(|cell| match cell {
                None => "  ".to_string(),
                Some(day) => {
                    let label = format!("{:>2}", day.day());
                    match (*day == today, calendar.is_busy(*day)) {
                        (true, true) => label.red().reversed().to_string(),
                        (true, false) => label.reversed().to_string(),
                        (false, true) => label.red().bold().to_string(),
                        (false, false) => label,
                    }
                }
            })
            .collect();
        lines.push(cells.join(" "));
    }

    lines.join("\n")
}

/// Free days as one line each, e.g. "Tue 10".
pub fn render_free_days(month: Month, free: &[NaiveDate]) -> String {
    if free.is_empty() {
        return format!("  No free days in {}", month).dimmed().to_string();
    }

    free.iter()
        .map(|d| format!("  {} {:>2}", d.format("%a").dimmed(), d.day()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// "1 appointment", "3 appointments".
pub fn pluralize(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{} {}", count, word)
    } else {
        format!("{} {}s", count, word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_counts() {
        assert_eq!(pluralize(1, "free day"), "1 free day");
        assert_eq!(pluralize(30, "free day"), "30 free days");
        assert_eq!(pluralize(0, "appointment"), "0 appointments");
    }

    #[test]
    fn month_grid_has_a_row_per_week() {
        let month = Month::new(2025, 6).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let rendered = render_month(month, &CalendarView::new(&[]), today);

        // Title, weekday header, then five weeks for June 2025.
        assert_eq!(rendered.lines().count(), 7);
        assert!(rendered.contains("30"));
    }
}
