//! Core of Executive Sync: a shared appointment calendar for one office.
//!
//! - `store` signs in, keeps a live subscription on the shared collection and
//!   writes new appointments
//! - `notify` announces appointments that arrive while someone is watching
//! - `calendar` and `controller` hold what the front-end renders

pub mod appointment;
pub mod backend;
pub mod banner;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod date;
pub mod error;
pub mod notify;
pub mod store;

pub use appointment::*;
