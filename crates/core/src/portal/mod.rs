//! Portal-specific surface: element locators and stage-entry actions.

mod actions;
mod locators;

pub use actions::PortalActions;
pub use locators::Locators;
