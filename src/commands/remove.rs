use anyhow::Result;
use dialoguer::Confirm;
use execsync_core::calendar::CalendarView;

use crate::render::Render;
use crate::session::Session;

pub async fn run(session: Session, id: &str, yes: bool) -> Result<()> {
    let appointments = session.appointments().await?;
    let Some(appointment) = CalendarView::new(&appointments).find(id) else {
        anyhow::bail!("Appointment '{}' not found", id);
    };

    println!("{}", session.display_date(appointment.date));
    println!("  {}", appointment.render());

    if !yes {
        println!();
        let confirmed = Confirm::new()
            .with_prompt("Delete this appointment?")
            .default(false)
            .interact()?;

        if !confirmed {
            return session.finish().await;
        }
    }

    // Failures are logged by the store and not reported here.
    let _ = session.store.remove(id).await;

    session.finish().await
}
