use crate::error::GeneratorError;
use crate::Generator;
use rand::Rng;
use shortlane_core::shortcode::MAX_LENGTH;
use shortlane_core::ShortCode;
use std::collections::HashSet;
use typed_builder::TypedBuilder;

/// Lowercase letters, uppercase letters, then digits.
pub const BASE62: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Configures a [`RandomGenerator`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RandomGeneratorSettings {
    /// Number of symbols in every generated code.
    #[builder(default = 8)]
    pub length: usize,
    /// Symbols to draw from. Each must be ASCII alphanumeric and unique.
    #[builder(default = BASE62.to_string(), setter(into))]
    pub alphabet: String,
}

impl Default for RandomGeneratorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Draws every position of a code uniformly and independently from the
/// alphabet. There are no lexical constraints: all-digit or all-same-symbol
/// codes are as likely as any other.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    alphabet: Vec<u8>,
    length: usize,
}

impl RandomGenerator {
    pub fn new(settings: RandomGeneratorSettings) -> Result<Self, GeneratorError> {
        if settings.length == 0 {
            return Err(GeneratorError::ZeroLength);
        }
        if settings.length > MAX_LENGTH {
            return Err(GeneratorError::TooLong {
                got: settings.length,
                max: MAX_LENGTH,
            });
        }
        if settings.alphabet.is_empty() {
            return Err(GeneratorError::EmptyAlphabet);
        }

        let mut seen = HashSet::new();
        for symbol in settings.alphabet.chars() {
            if !symbol.is_ascii_alphanumeric() {
                return Err(GeneratorError::InvalidSymbol(symbol));
            }
            if !seen.insert(symbol) {
                return Err(GeneratorError::DuplicateSymbol(symbol));
            }
        }

        Ok(Self {
            alphabet: settings.alphabet.into_bytes(),
            length: settings.length,
        })
    }

    /// Returns the length of every generated code.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns the alphabet codes are drawn from.
    pub fn alphabet(&self) -> &[u8] {
        &self.alphabet
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self {
            alphabet: BASE62.as_bytes().to_vec(),
            length: 8,
        }
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::thread_rng();
        let code: String = (0..self.length)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}
