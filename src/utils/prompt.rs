use anyhow::Result;
use chrono::NaiveDate;
use dialoguer::{Input, Select};
use execsync_core::date::{date_key, parse_time, time_label};
use execsync_core::{AppointmentKind, NewAppointment};
use owo_colors::OwoColorize;

use crate::dates::parse_date;

/// Prompt until `parse` accepts the input. An empty answer takes `default`.
pub fn prompt_with_retry<T, F>(prompt: &str, default: &str, parse: F) -> Result<T>
where
    F: Fn(&str) -> Result<T>,
{
    loop {
        let input: String = Input::new()
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()?;
        match parse(&input) {
            Ok(result) => return Ok(result),
            Err(e) => {
                eprintln!("  {}", e.to_string().red());
            }
        }
    }
}

/// Free text that may be left blank. The current value is pre-typed, so
/// erasing it clears the field.
pub fn prompt_optional(prompt: &str, current: &str) -> Result<String> {
    let input: String = Input::new()
        .with_prompt(format!("{} (skip)", prompt))
        .with_initial_text(current)
        .allow_empty(true)
        .interact_text()?;
    Ok(input)
}

pub fn select_kind(current: AppointmentKind) -> Result<AppointmentKind> {
    let kinds = [AppointmentKind::Work, AppointmentKind::Personal];
    let items: Vec<&str> = kinds.iter().map(|k| k.label()).collect();
    let selection = Select::new()
        .with_prompt("  Type")
        .items(&items)
        .default(kinds.iter().position(|k| *k == current).unwrap_or(0))
        .interact()?;
    Ok(kinds[selection])
}

/// Ask for every field of the draft, offering its current values.
pub fn fill_draft(draft: &mut NewAppointment, today: NaiveDate) -> Result<()> {
    draft.title = Input::new()
        .with_prompt("  Title")
        .with_initial_text(draft.title.as_str())
        .allow_empty(true)
        .interact_text()?;

    draft.date = prompt_with_retry("  Date", &date_key(draft.date), |s| parse_date(s, today))?;
    draft.time = prompt_with_retry("  Time", &time_label(draft.time), |s| {
        parse_time(s.trim()).map_err(|e| anyhow::anyhow!(e))
    })?;
    draft.kind = select_kind(draft.kind)?;
    draft.note = prompt_optional("  Note", &draft.note)?;
    draft.dress_code = prompt_optional("  Dress code", &draft.dress_code)?;

    Ok(())
}
