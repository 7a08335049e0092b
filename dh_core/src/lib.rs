#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod announcement;
pub mod assign;
pub mod config;
pub mod discord;
pub mod notices;
pub mod platform;
pub mod reminders;
pub mod roles;
pub mod status;
pub mod structs;
pub mod sync;
pub mod volunteers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
