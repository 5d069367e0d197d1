use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use execsync_core::error::ExecSyncError;
use execsync_core::store::StoreUpdate;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::notifier;
use crate::render::pluralize;
use crate::session::Session;

enum Event {
    Update { update: StoreUpdate, announced: usize },
    Failed(ExecSyncError),
}

pub async fn run(session: Session) -> Result<()> {
    let Some(identity) = session.identity.clone() else {
        anyhow::bail!("Not signed in, nothing to watch. Run with --verbose for details");
    };

    let dispatcher = Arc::new(notifier::dispatcher(
        session.office_id(),
        &session.config.notifications,
    ));
    let (tx, mut events) = mpsc::unbounded_channel();

    let subscription = {
        let dispatcher = Arc::clone(&dispatcher);
        let on_change = tx.clone();
        session
            .store
            .subscribe(
                &identity,
                session.office_id(),
                move |update| {
                    let announced = dispatcher.handle(&update);
                    let _ = on_change.send(Event::Update { update, announced });
                },
                move |e| {
                    let _ = tx.send(Event::Failed(e));
                },
            )
            .await?
    };

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(Event::Update { update, .. }) if update.initial => {
                    println!(
                        "Watching {} ({}). Press Ctrl-C to stop.",
                        session.office_id().bold(),
                        pluralize(update.appointments.len(), "appointment")
                    );
                }
                Some(Event::Update { announced, .. }) if announced > 0 => {
                    if let Some(banner) = dispatcher.banner(Instant::now()) {
                        println!("{} {}", "New:".green().bold(), banner);
                    }
                }
                Some(Event::Update { .. }) => {}
                Some(Event::Failed(e)) => {
                    eprintln!("{}", format!("Lost connection: {}", e).red());
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    subscription.unsubscribe();
    session.finish().await
}
