mod health;
mod stats;
mod url;

pub use health::health_handler;
pub use stats::{stats_handler, today_stats_handler};
pub use url::{redirect_handler, shorten_handler};
