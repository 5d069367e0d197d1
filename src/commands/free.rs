use anyhow::Result;
use execsync_core::calendar::{CalendarView, Month};
use owo_colors::OwoColorize;

use crate::render::{pluralize, render_free_days};
use crate::session::Session;

pub async fn run(session: Session, month: Option<Month>) -> Result<()> {
    let month = month.unwrap_or_else(|| Month::of(session.today));
    let appointments = session.appointments().await?;
    let free = CalendarView::new(&appointments).free_days_in_month(month);

    println!(
        "{} {}",
        month.to_string().bold(),
        format!("({})", pluralize(free.len(), "free day")).dimmed()
    );
    println!("{}", render_free_days(month, &free));

    session.finish().await
}
