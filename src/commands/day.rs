use anyhow::Result;
use execsync_core::calendar::CalendarView;
use owo_colors::OwoColorize;

use crate::dates::parse_date;
use crate::render::render_day;
use crate::session::Session;

pub async fn run(session: Session, date: Option<String>) -> Result<()> {
    let date = match date {
        Some(input) => parse_date(&input, session.today)?,
        None => session.today,
    };

    let appointments = session.appointments().await?;
    let day = CalendarView::new(&appointments).appointments_for_day(date);

    println!("{}", session.display_date(date).bold());
    println!("{}", render_day(&day, true));

    session.finish().await
}
