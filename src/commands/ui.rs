//! Interactive session over the view controller.
//!
//! Subscription callbacks run on their own task and only push into a channel;
//! the prompt loop drains it before every screen, so the controller has a
//! single owner.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use dialoguer::{Confirm, Input, Select};
use execsync_core::controller::{Action, SaveOutcome, View, ViewController};
use execsync_core::error::ExecSyncError;
use execsync_core::notify::NotificationDispatcher;
use execsync_core::store::{StoreUpdate, Subscription};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use crate::dates::parse_date;
use crate::notifier;
use crate::render::{Render, pluralize, render_day, render_free_days, render_month};
use crate::session::Session;
use crate::utils::{prompt, tui};

type Feed = mpsc::UnboundedReceiver<Result<StoreUpdate, ExecSyncError>>;

enum Step {
    Continue,
    Quit,
}

pub async fn run(session: Session) -> Result<()> {
    let mut controller = ViewController::new(session.today);
    let dispatcher = Arc::new(notifier::dispatcher(
        session.office_id(),
        &session.config.notifications,
    ));

    let (subscription, mut feed) = open_feed(&session, &dispatcher).await;
    if subscription.is_some() {
        if let Some(item) = tui::with_spinner("Loading appointments", feed.recv()).await {
            apply(&mut controller, item);
        }
    } else {
        controller.subscription_failed();
    }

    loop {
        while let Ok(item) = feed.try_recv() {
            apply(&mut controller, item);
        }

        let now = Instant::now();
        controller.expire_banners(now);
        println!();
        if let Some(banner) = dispatcher.banner(now) {
            println!("{} {}", "New appointment:".green().bold(), banner);
        }
        if let Some(banner) = controller.success_banner(now) {
            println!("{}", banner.green());
        }

        let step = match controller.view() {
            View::Calendar => calendar_screen(&session, &mut controller).await?,
            View::Day => day_screen(&session, &mut controller).await?,
            View::Summary => summary_screen(&session, &mut controller).await?,
        };

        if matches!(step, Step::Quit) {
            break;
        }
    }

    drop(subscription);
    session.finish().await
}

/// Subscribe when signed in. Without an identity, or if the live query cannot
/// be opened, the session continues on an empty list.
async fn open_feed(
    session: &Session,
    dispatcher: &Arc<NotificationDispatcher>,
) -> (Option<Subscription>, Feed) {
    let (tx, feed) = mpsc::unbounded_channel();
    let Some(identity) = &session.identity else {
        return (None, feed);
    };

    let on_change = tx.clone();
    let dispatcher = Arc::clone(dispatcher);
    let subscription = session
        .store
        .subscribe(
            identity,
            session.office_id(),
            move |update| {
                dispatcher.handle(&update);
                let _ = on_change.send(Ok(update));
            },
            move |e| {
                let _ = tx.send(Err(e));
            },
        )
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "continuing without live updates"))
        .ok();

    (subscription, feed)
}

fn apply(controller: &mut ViewController, item: Result<StoreUpdate, ExecSyncError>) {
    match item {
        Ok(update) => controller.apply_update(update),
        Err(_) => controller.subscription_failed(),
    }
}

async fn calendar_screen(session: &Session, controller: &mut ViewController) -> Result<Step> {
    let month = controller.displayed_month();
    println!("{}", render_month(month, &controller.calendar(), session.today));
    if controller.is_loading() {
        println!("{}", "Loading...".dimmed());
    }
    println!();

    let items = [
        "Open a day",
        "Previous month",
        "Next month",
        "Free days",
        "Add appointment",
        "Refresh",
        "Quit",
    ];
    let selection = Select::new().items(&items).default(0).interact()?;

    match selection {
        0 => {
            let default = execsync_core::date::date_key(controller.selected_date());
            let date = prompt::prompt_with_retry("  Date", &default, |s| {
                parse_date(s, session.today)
            })?;
            controller.apply(Action::SelectDate(date));
        }
        1 => {
            controller.apply(Action::PreviousMonth);
        }
        2 => {
            controller.apply(Action::NextMonth);
        }
        3 => {
            controller.apply(Action::ShowFreeDays);
        }
        4 => add_form(session, controller).await?,
        5 => {}
        _ => return Ok(Step::Quit),
    }
    Ok(Step::Continue)
}

async fn day_screen(session: &Session, controller: &mut ViewController) -> Result<Step> {
    println!("{}", session.display_date(controller.selected_date()).bold());
    println!("{}", render_day(&controller.day_appointments(), false));
    println!();

    let items = [
        "Add appointment",
        "Delete appointment",
        "Back",
        "Refresh",
        "Quit",
    ];
    let selection = Select::new().items(&items).default(0).interact()?;

    match selection {
        0 => add_form(session, controller).await?,
        1 => delete_flow(session, controller).await?,
        2 => {
            controller.apply(Action::Back);
        }
        3 => {}
        _ => return Ok(Step::Quit),
    }
    Ok(Step::Continue)
}

async fn summary_screen(session: &Session, controller: &mut ViewController) -> Result<Step> {
    let month = controller.displayed_month();
    let free = controller.free_days();
    println!(
        "{} {}",
        month.to_string().bold(),
        format!("({})", pluralize(free.len(), "free day")).dimmed()
    );
    println!("{}", render_free_days(month, &free));
    println!();

    let items = [
        "Open a free day",
        "Previous month",
        "Next month",
        "Add appointment",
        "Back",
        "Quit",
    ];
    let selection = Select::new().items(&items).default(0).interact()?;

    match selection {
        0 => {
            if free.is_empty() {
                return Ok(Step::Continue);
            }
            let labels: Vec<String> = free.iter().map(|d| session.display_date(*d)).collect();
            let picked = Select::new()
                .with_prompt("  Day")
                .items(&labels)
                .default(0)
                .interact()?;
            controller.apply(Action::SelectDate(free[picked]));
        }
        1 => {
            controller.apply(Action::PreviousMonth);
        }
        2 => {
            controller.apply(Action::NextMonth);
        }
        3 => add_form(session, controller).await?,
        4 => {
            controller.apply(Action::Back);
        }
        _ => return Ok(Step::Quit),
    }
    Ok(Step::Continue)
}

/// Keep the form open until the draft is saved or the user cancels.
async fn add_form(session: &Session, controller: &mut ViewController) -> Result<()> {
    controller.apply(Action::OpenAddForm);

    while controller.is_adding() {
        prompt::fill_draft(controller.draft_mut(), session.today)?;

        let choice = Select::new()
            .items(&["Save", "Edit again", "Cancel"])
            .default(0)
            .interact()?;

        match choice {
            0 => match controller.save(&session.store).await {
                Ok(SaveOutcome::Saved(_)) => {}
                Ok(SaveOutcome::Ignored) => {
                    println!("{}", "  A title is required".dimmed());
                }
                Err(e) => {
                    eprintln!("{}", format!("  Could not save appointment: {}", e).red());
                    Input::<String>::new()
                        .with_prompt("  Press Enter to continue")
                        .allow_empty(true)
                        .interact_text()?;
                }
            },
            1 => {}
            _ => {
                controller.apply(Action::CancelAdd);
            }
        }
    }

    Ok(())
}

async fn delete_flow(session: &Session, controller: &mut ViewController) -> Result<()> {
    let day: Vec<(String, String)> = controller
        .day_appointments()
        .iter()
        .map(|a| (a.id.clone(), a.render()))
        .collect();
    if day.is_empty() {
        return Ok(());
    }

    let labels: Vec<&str> = day.iter().map(|(_, label)| label.as_str()).collect();
    let picked = Select::new()
        .with_prompt("  Which one?")
        .items(&labels)
        .default(0)
        .interact()?;

    if !controller.request_delete(&day[picked].0) {
        return Ok(());
    }

    let confirmed = Confirm::new()
        .with_prompt("Delete this appointment?")
        .default(false)
        .interact()?;

    if confirmed {
        controller.confirm_delete(&session.store).await;
    } else {
        controller.cancel_delete();
    }
    Ok(())
}
