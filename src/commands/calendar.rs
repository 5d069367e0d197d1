use anyhow::Result;
use execsync_core::calendar::{CalendarView, Month};
use owo_colors::OwoColorize;

use crate::render::{pluralize, render_month};
use crate::session::Session;

pub async fn run(session: Session, month: Option<Month>) -> Result<()> {
    let month = month.unwrap_or_else(|| Month::of(session.today));
    let appointments = session.appointments().await?;
    let calendar = CalendarView::new(&appointments);

    println!("{}", render_month(month, &calendar, session.today));
    println!();

    let busy = calendar.busy_days_in_month(month).len();
    println!(
        "{}",
        format!(
            "{}, {}",
            pluralize(busy, "busy day"),
            pluralize(month.days_in_month() as usize - busy, "free day")
        )
        .dimmed()
    );

    session.finish().await
}
