pub mod catalog;
pub mod prompt;
pub mod resolver;
pub mod types;

pub use catalog::ThemeCatalog;
pub use prompt::{build_fashion_prompt, PromptError};
pub use types::{Era, ThemeScores, WinningThemes};
