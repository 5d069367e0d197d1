use anyhow::Result;
use execsync_core::date::parse_time;
use execsync_core::{AppointmentKind, NewAppointment};
use owo_colors::OwoColorize;

use crate::dates::parse_date;
use crate::session::Session;
use crate::utils::prompt;

pub struct AddArgs {
    pub title: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub kind: Option<AppointmentKind>,
    pub note: Option<String>,
    pub dress_code: Option<String>,
}

pub async fn run(session: Session, args: AddArgs) -> Result<()> {
    if session.identity.is_none() {
        anyhow::bail!("Not signed in, nothing was saved. Run with --verbose for details");
    }

    let mut draft = NewAppointment::for_date(session.today);
    if let Some(date) = &args.date {
        draft.date = parse_date(date, session.today)?;
    }
    if let Some(time) = &args.time {
        draft.time = parse_time(time.trim()).map_err(|e| anyhow::anyhow!(e))?;
    }
    draft.kind = args.kind.unwrap_or_default();
    draft.note = args.note.unwrap_or_default();
    draft.dress_code = args.dress_code.unwrap_or_default();

    let interactive = args.title.is_none();
    match args.title {
        Some(title) => draft.title = title,
        None => prompt::fill_draft(&mut draft, session.today)?,
    }

    // A blank title is dropped without complaint.
    if let Some(id) = session.store.create(&draft).await? {
        if interactive {
            println!();
        }
        println!(
            "{}",
            format!(
                "  Created: {} ({}) on {}",
                draft.title.trim(),
                execsync_core::date::time_label(draft.time),
                session.display_date(draft.date)
            )
            .green()
        );
        println!("  {}", id.dimmed());
    }

    session.finish().await
}
