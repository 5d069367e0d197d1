pub mod add;
pub mod calendar;
pub mod config;
pub mod day;
pub mod free;
pub mod remove;
pub mod ui;
pub mod watch;
