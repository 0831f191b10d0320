//! Entropy sources and value generators.
//!
//! Every generator takes its RNG explicitly. Secure generation uses an
//! `StdRng` seeded from the operating system; seeded generation derives the
//! `StdRng` seed from the SHA-256 digest of the user's seed string, so the
//! same seed always produces the same sequence.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};

use crate::error::ProviderError;

/// Upper-case letters.
pub const UPPER_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Lower-case letters.
pub const LOWER_CHARS: &str = "abcdefghijklmnopqrstuvwxyz";
/// Decimal digits.
pub const NUMERIC_CHARS: &str = "0123456789";
/// Special characters used unless overridden.
pub const DEFAULT_SPECIAL_CHARS: &str = "!@#$%&*()-_=+[]{}<>:?";

/// A generator seeded from the operating system entropy source.
pub fn secure_rng(resource: &str) -> Result<StdRng, ProviderError> {
    StdRng::try_from_os_rng().map_err(|e| ProviderError::generation(resource, e))
}

/// A deterministic generator derived from a seed string.
pub fn seeded_rng(seed: &str) -> StdRng {
    let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
    StdRng::from_seed(digest)
}

/// Seeded generator when a non-empty seed is given, secure otherwise.
pub fn rng_for(resource: &str, seed: Option<&str>) -> Result<StdRng, ProviderError> {
    match seed.filter(|s| !s.is_empty()) {
        Some(seed) => Ok(seeded_rng(seed)),
        None => secure_rng(resource),
    }
}

/// Character classes and minimums for string generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringSpec {
    /// Total number of characters.
    pub length: usize,
    /// Include upper-case letters in the general pool.
    pub upper: bool,
    /// Include lower-case letters in the general pool.
    pub lower: bool,
    /// Include digits in the general pool.
    pub numeric: bool,
    /// Include special characters in the general pool.
    pub special: bool,
    /// Minimum number of upper-case letters.
    pub min_upper: usize,
    /// Minimum number of lower-case letters.
    pub min_lower: usize,
    /// Minimum number of digits.
    pub min_numeric: usize,
    /// Minimum number of special characters.
    pub min_special: usize,
    /// Replacement special character set; `None` or empty keeps the default.
    pub override_special: Option<String>,
}

impl StringSpec {
    fn special_chars(&self) -> &str {
        match self.override_special.as_deref() {
            Some(chars) if !chars.is_empty() => chars,
            _ => DEFAULT_SPECIAL_CHARS,
        }
    }

    /// Characters drawn from once the class minimums are satisfied.
    pub fn pool(&self) -> Vec<char> {
        let mut pool = String::new();
        if self.upper {
            pool.push_str(UPPER_CHARS);
        }
        if self.lower {
            pool.push_str(LOWER_CHARS);
        }
        if self.numeric {
            pool.push_str(NUMERIC_CHARS);
        }
        if self.special {
            pool.push_str(self.special_chars());
        }
        pool.chars().collect()
    }

    /// Sum of the class minimums.
    pub fn min_total(&self) -> usize {
        [self.min_upper, self.min_lower, self.min_numeric, self.min_special]
            .into_iter()
            .fold(0, usize::saturating_add)
    }
}

/// Generate a string honouring the class minimums.
///
/// Each class contributes its minimum (even when the class is otherwise
/// disabled), the remainder comes from the enabled pool, and the result is
/// shuffled so the minimums are not clustered at the front.
pub fn generate_string<R: Rng + ?Sized>(rng: &mut R, spec: &StringSpec) -> Result<String, ProviderError> {
    if spec.min_total() > spec.length {
        return Err(ProviderError::Validation(format!(
            "length ({}) must be at least the sum of the character minimums ({})",
            spec.length,
            spec.min_total()
        )));
    }

    let classes: [(Vec<char>, usize); 4] = [
        (NUMERIC_CHARS.chars().collect(), spec.min_numeric),
        (LOWER_CHARS.chars().collect(), spec.min_lower),
        (UPPER_CHARS.chars().collect(), spec.min_upper),
        (spec.special_chars().chars().collect(), spec.min_special),
    ];

    let mut result = Vec::new();
    for (chars, min) in &classes {
        draw(rng, chars, *min, &mut result);
    }

    let remaining = spec.length - result.len();
    let pool = spec.pool();
    if remaining > 0 && pool.is_empty() {
        return Err(ProviderError::Validation(
            "at least one of upper, lower, numeric or special must be enabled".to_string(),
        ));
    }
    draw(rng, &pool, remaining, &mut result);

    result.shuffle(rng);
    Ok(result.into_iter().collect())
}

fn draw<R: Rng + ?Sized>(rng: &mut R, chars: &[char], count: usize, out: &mut Vec<char>) {
    if chars.is_empty() {
        return;
    }
    out.extend((0..count).map(|_| chars[rng.random_range(0..chars.len())]));
}

/// Uniform integer in `[min, max]`.
pub fn int_in_range<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> Result<i64, ProviderError> {
    if max < min {
        return Err(ProviderError::Validation(format!(
            "the minimum (min) value {} must be smaller than or equal to the maximum (max) value {}",
            min, max
        )));
    }
    Ok(rng.random_range(min..=max))
}

/// Concatenate shuffled permutations of `input` until `count` items are taken.
pub fn shuffle_take<R: Rng + ?Sized>(rng: &mut R, input: &[String], count: usize) -> Vec<String> {
    if input.is_empty() || count == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(count.min(input.len()));

    let mut order: Vec<usize> = (0..input.len()).collect();
    while result.len() < count {
        order.shuffle(rng);
        for &i in &order {
            if result.len() == count {
                break;
            }
            result.push(input[i].clone());
        }
    }
    result
}

/// `len` random bytes.
pub fn random_bytes<R: RngCore + ?Sized>(rng: &mut R, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}
