//! The embeds the bot sends, in one place.

use crate::announcement::ReactionKind;
use crate::platform::Notice;
use poise::serenity_prelude::Colour;

#[must_use]
pub fn announcement() -> Notice {
    let confirm = ReactionKind::Confirm.emoji();
    let withdraw = ReactionKind::Withdraw.emoji();
    Notice::new(
        "Attendance Confirmation",
        format!(
            "Thank you for your interest in attending DeerHacks!\n\n\
             To help us with finalizing our plans and ensuring we can accommodate everyone, \
             please confirm your attendance by reacting with one of the options below:\n\n\
             {confirm} - I will attend DeerHacks.\n\
             {withdraw} - I will not be able to attend.\n\n\
             Your response helps us with logistics, including arranging accommodations, meals, \
             and activities. If you have any questions, feel free to contact our team. Thank you!"
        ),
        Colour::new(0x00ff00),
    )
}

#[must_use]
pub fn reminder() -> Notice {
    Notice::new(
        "DeerHacks Attendance Confirmation Reminder",
        format!(
            "Hello! This is a friendly reminder that you haven't confirmed your attendance for \
             DeerHacks yet. Please respond to the attendance announcement in the server.\n\n\
             **Important:** To maintain your spot, please confirm your attendance as soon as \
             possible. Failure to respond may result in your spot being given to someone on the \
             waitlist.\n\n\
             If you can no longer attend, please let us know by selecting {} on the \
             announcement. This helps us plan effectively and gives others a chance to \
             participate.",
            ReactionKind::Withdraw.emoji()
        ),
        Colour::new(0xff9900),
    )
}

#[must_use]
pub fn welcome_registered(email: &str) -> Notice {
    Notice::new(
        "Welcome to DeerHacks!",
        "Thank you for signing up! We have given you a role to reflect your dashboard status.",
        Colour::DARK_GREEN,
    )
    .field("Registered Email", email, true)
    .footer(
        "If you believe the email provided is not yours, please contact an organizer immediately.",
    )
}

#[must_use]
pub fn welcome_unregistered(prefix: &str) -> Notice {
    Notice::new(
        "Welcome to DeerHacks!",
        format!(
            "Please sign up via https://deerhacks.ca/login to get a role.\n\n\
             • If you are unable to register using the link above, the registration period may \
             be over. Please contact an organizer for more information.\n\n\
             • After you have signed in, please send the following command to me: {prefix}sync"
        ),
        Colour::RED,
    )
    .footer("Please contact an organizer immediately for any questions or concerns.")
}

#[must_use]
pub fn roles_updated() -> Notice {
    Notice::new("Your roles were updated", "", Colour::GOLD)
}
