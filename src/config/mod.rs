pub mod preferences;
pub mod prompt;
