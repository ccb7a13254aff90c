use crate::Generator;
use rand::Rng;
use tinylink_core::ShortCode;

/// `A-Z`, `a-z` then `0-9`.
pub const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const DEFAULT_CODE_LENGTH: usize = 7;

/// Draws fixed-length codes uniformly from [`ALPHABET`].
///
/// Seven characters give 62^7 (about 3.5 * 10^12) codes, so collisions stay
/// rare until the store holds billions of records.
#[derive(Debug, Clone, Copy)]
pub struct RandomGenerator {
    length: usize,
}

impl RandomGenerator {
    pub fn new() -> Self {
        Self::with_length(DEFAULT_CODE_LENGTH)
    }

    /// Lengths outside `1..=64` are clamped into that range.
    pub fn with_length(length: usize) -> Self {
        Self {
            length: length.clamp(1, 64),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..self.length)
            .map(|_| char::from(ALPHABET[rng.random_range(0..ALPHABET.len())]))
            .collect();
        ShortCode::new_unchecked(code)
    }
}
