//! # Candidates: Lazy Enumeration of the Handle Search Space
//!
//! Produces every identifier over the alphabet `a-z`, `0-9`, `_` whose length
//! lies in `[min_len, max_len]`, shortest first and lexicographic (by alphabet
//! position) within a length. Strings without a letter are never yielded;
//! strings without a digit are dropped when `require_digit` is set.
//!
//! ## Resumability
//!
//! The generator carries no position state. A rerun starts from the first
//! candidate again and the driver skips everything already in the processed
//! ledger, so generation order is the only contract resume depends on.
//!
//! ## Algorithm
//!
//! An odometer over alphabet indices, one digit per character. Each step
//! increments the rightmost position with carry; overflow moves to the next
//! length. Filtering is a single pass over the current odometer state.

/// Alphabet in generation order: letters, then digits, then underscore.
pub const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789_";

const LETTERS: u128 = 26;
const DIGITS: u128 = 10;

/// Iterator over candidates in generation order.
#[derive(Debug, Clone)]
pub struct Candidates {
    max_len: usize,
    require_digit: bool,
    /// Alphabet indices of the next string to examine. Empty once exhausted.
    odometer: Vec<usize>,
}

/// Enumerate candidates of length `min_len..=max_len`.
///
/// Returns an empty iterator when `min_len > max_len`.
pub fn generate(min_len: usize, max_len: usize, require_digit: bool) -> Candidates {
    let start = min_len.max(1);
    let odometer = if start > max_len {
        Vec::new()
    } else {
        vec![0; start]
    };
    Candidates {
        max_len,
        require_digit,
        odometer,
    }
}

impl Candidates {
    /// Advance the odometer by one. Returns false when the space is exhausted.
    fn advance(&mut self) -> bool {
        for slot in self.odometer.iter_mut().rev() {
            *slot += 1;
            if *slot < ALPHABET.len() {
                return true;
            }
            *slot = 0;
        }
        // Carried out of the leftmost position: next length.
        let next_len = self.odometer.len() + 1;
        if next_len > self.max_len {
            self.odometer.clear();
            return false;
        }
        self.odometer = vec![0; next_len];
        true
    }

    fn current_is_admissible(&self) -> bool {
        let mut has_letter = false;
        let mut has_digit = false;
        for &i in &self.odometer {
            let c = ALPHABET[i];
            has_letter |= c.is_ascii_lowercase();
            has_digit |= c.is_ascii_digit();
        }
        has_letter && (has_digit || !self.require_digit)
    }

    fn current(&self) -> String {
        self.odometer.iter().map(|&i| ALPHABET[i] as char).collect()
    }
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.odometer.is_empty() {
            let admissible = self.current_is_admissible();
            let value = admissible.then(|| self.current());
            self.advance();
            if value.is_some() {
                return value;
            }
        }
        None
    }
}

/// Exact number of candidates `generate(min_len, max_len, require_digit)`
/// yields, or `None` if it does not fit in a `u128`.
///
/// Per length L over 37 symbols: strings with a letter are `37^L - 11^L`
/// (everything minus digit/underscore-only strings). Requiring a digit also
/// removes letter/underscore-only strings that contain a letter:
/// `27^L - 1`.
pub fn space_size(min_len: usize, max_len: usize, require_digit: bool) -> Option<u128> {
    let all = ALPHABET.len() as u128;
    let no_letter = all - LETTERS;
    let no_digit = all - DIGITS;
    let mut total: u128 = 0;
    for len in min_len.max(1)..=max_len {
        let exp = u32::try_from(len).ok()?;
        let mut count = all.checked_pow(exp)? - no_letter.checked_pow(exp)?;
        if require_digit {
            count -= no_digit.checked_pow(exp)? - 1;
        }
        total = total.checked_add(count)?;
    }
    Some(total)
}
