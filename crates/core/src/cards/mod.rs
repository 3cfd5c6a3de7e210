//! Feature cards derived from the journey profile, the preferences and the
//! daily activity signal. Cards are never stored.

mod card_feed;
mod card_model;
mod card_rules;

pub use card_feed::*;
pub use card_model::*;
pub use card_rules::*;
