#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use dh_core::structs::{Command, Context, Error};

mod attendance;
mod meta;
mod sync;
mod volunteers;

#[must_use]
pub fn commands() -> Vec<Command> {
    meta::commands()
        .into_iter()
        .chain(attendance::commands())
        .chain(sync::commands())
        .chain(volunteers::commands())
        .collect()
}
