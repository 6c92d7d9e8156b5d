pub mod drivers;
pub mod menu;

pub use drivers::{InquireDriver, PromptDriver};
