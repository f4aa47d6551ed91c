//! Pull requests: review and merge of issue branches

mod manager;
mod prompt;
mod types;

pub use manager::PrManager;
pub use prompt::ReviewPrompt;
pub use types::{PrStatus, PullRequest, ReviewAction};
