use crate::error::{Result, ShortenerError};
use shortlane_core::{ShortCode, UrlCache};
use shortlane_generator::Generator;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{trace, warn};

/// Draws candidate codes until one is absent from the cache.
///
/// Each attempt costs one `exists` probe and nothing is written. The probe
/// only sees cached codes; the durable store's key constraint catches the
/// rest at insert time. Reserved codes count as collisions.
#[derive(Debug)]
pub struct CodeMinter<G, C> {
    generator: Arc<G>,
    cache: Arc<C>,
    max_attempts: u32,
    reserved: Arc<HashSet<String>>,
}

impl<G, C> Clone for CodeMinter<G, C> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            cache: Arc::clone(&self.cache),
            max_attempts: self.max_attempts,
            reserved: Arc::clone(&self.reserved),
        }
    }
}

impl<G: Generator, C: UrlCache> CodeMinter<G, C> {
    pub fn new(generator: Arc<G>, cache: Arc<C>, max_attempts: u32) -> Self {
        Self {
            generator,
            cache,
            max_attempts: max_attempts.max(1),
            reserved: Arc::default(),
        }
    }

    /// Never hands out any of `codes`, e.g. paths a router serves itself.
    pub fn with_reserved<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved = Arc::new(codes.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns a code that was not cached at probe time.
    ///
    /// Fails with [`ShortenerError::NamespaceExhausted`] once every attempt
    /// has collided. A cache error aborts immediately.
    pub async fn mint(&self) -> Result<ShortCode> {
        for attempt in 1..=self.max_attempts {
            let candidate: ShortCode = self.generator.generate().into();
            if self.reserved.contains(candidate.as_str()) {
                trace!(code = %candidate, attempt, "Candidate is reserved, redrawing");
                continue;
            }
            if !self.cache.exists(&candidate).await? {
                trace!(code = %candidate, attempt, "Minted short code");
                return Ok(candidate);
            }
            trace!(code = %candidate, attempt, "Candidate already cached, redrawing");
        }

        warn!(attempts = self.max_attempts, "Short code namespace exhausted");
        Err(ShortenerError::NamespaceExhausted {
            attempts: self.max_attempts,
        })
    }
}
