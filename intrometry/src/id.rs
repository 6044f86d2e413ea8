//! Random and normalized identifier generation.
//!
//! Mirrors the teacher's use of small, self-contained helper functions
//! (`parse_fft_size`, `parse_redraw_size` in the original CLI) rather than a
//! general-purpose slug crate: the alphabet and normalization rules here are
//! narrow enough that pulling in a dependency would add more surface than it saves.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Uniform random `u32`, used to seed `names_version` (invariant V4).
pub fn random_u32() -> u32 {
    rand::thread_rng().gen()
}

/// A random identifier of `len` characters drawn from `[0-9a-z]`.
pub fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..ALPHABET.len());
    (0..len)
        .map(|_| ALPHABET[dist.sample(&mut rng)] as char)
        .collect()
}

/// Lowercases `s`, replaces every non-alphanumeric byte with `_`, and strips
/// leading underscores. The result may be empty.
pub fn normalize_id(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = out.trim_start_matches('_');
    if trimmed.len() != out.len() {
        out = trimmed.to_string();
    }
    out
}
