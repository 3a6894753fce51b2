use std::sync::Arc;

use shortlane_shortener::{Shortener, UrlStats};

#[derive(Clone)]
pub struct AppState {
    pub(crate) shortener: Arc<dyn Shortener>,
    pub(crate) stats: Arc<dyn UrlStats>,
    base_url: String,
}

impl AppState {
    pub fn new(
        shortener: Arc<dyn Shortener>,
        stats: Arc<dyn UrlStats>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            stats,
            base_url: public_base_url.into(),
        }
    }

    /// Base that short codes are appended to in responses.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
