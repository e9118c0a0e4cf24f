//! Base-98 text packing for `Text` symbols
//!
//! Formulas only handle numbers, so a short label travels as two numbers.
//! Each word is a little-endian base-98 digit stream: the first character is
//! `word % 98`, the next `(word / 98) % 98`, and so on. Eight digits fit in
//! 53 bits (98^8 < 2^53), so a packed word survives a round trip through an
//! `f64` unchanged.
//!
//! Digit 0 is `'\n'`; a word ends when its remaining value is zero, so a
//! trailing zero digit acts as the terminator. A newline is only packable
//! when some other character follows it in the same word: `"a\nb"` round
//! trips, `"ab\n"` and `"abcdefg\nxy"` are rejected.
//!
//! Decoding stops after eight characters per word even if a word produced by
//! a formula holds more digits, so an oversized first word never spills into
//! the second word's half of the label.

use std::fmt;

use super::symbol::TEXT_WORDS;

/// Number base of the packing
pub const BASE: u64 = 98;

/// Characters decoded from one word
pub const CHARS_PER_WORD: usize = 8;

/// Maximum characters carried by a `Text` symbol
pub const MAX_CHARS: usize = CHARS_PER_WORD * TEXT_WORDS;

/// Digit → character table
pub const ALPHABET: [char; BASE as usize] = [
    // 0 = newline, 1..26 = a..z, 27..29 = space, underscore, tab
    '\n', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q',
    'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', ' ', '_', '\t',
    // 30..39
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
    // 40..49
    '.', ':', '=', '<', '>', '+', '-', '*', '/', '|',
    // 50 = comma, 51..76 = A..Z, 77..79
    ',', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q',
    'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', ';', '!', '?',
    // 80..89
    '°', '±', '\'', '"', '(', ')', '[', ']', '{', '}',
    // 90..97
    '#', '$', '&', '@', '\\', '^', '`', '~',
];

/// Error packing a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCodecError {
    /// Character has no digit in the alphabet
    UnsupportedChar { ch: char, position: usize },
    /// Newline with nothing else after it in its word; decoding would drop it
    TrailingNewline { position: usize },
}

impl fmt::Display for TextCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedChar { ch, position } => {
                write!(f, "character {:?} at position {} cannot be packed", ch, position)
            }
            Self::TrailingNewline { position } => {
                write!(f, "newline at position {} ends its word and would be lost", position)
            }
        }
    }
}

impl std::error::Error for TextCodecError {}

/// Digit of a character, if it is part of the alphabet
pub fn digit_of(ch: char) -> Option<u64> {
    ALPHABET.iter().position(|&c| c == ch).map(|d| d as u64)
}

/// Decode packed payload words into a label of at most [`MAX_CHARS`] characters
pub fn unpack_text(words: &[u64; TEXT_WORDS]) -> String {
    let mut out = String::with_capacity(MAX_CHARS);

    for &word in words {
        let mut v = word;
        let mut decoded = 0;
        while v != 0 && decoded < CHARS_PER_WORD {
            out.push(ALPHABET[(v % BASE) as usize]);
            v /= BASE;
            decoded += 1;
        }
    }

    out
}

/// Pack a label into payload words.
///
/// Characters past [`MAX_CHARS`] are dropped. The first eight characters go
/// into the first word, the next eight into the second.
pub fn pack_text(text: &str) -> Result<[u64; TEXT_WORDS], TextCodecError> {
    let mut words = [0u64; TEXT_WORDS];
    // Position of the earliest newline not yet followed by another character
    let mut open_newline = None;

    for (position, ch) in text.chars().take(MAX_CHARS).enumerate() {
        let digit = digit_of(ch).ok_or(TextCodecError::UnsupportedChar { ch, position })?;
        let word = position / CHARS_PER_WORD;
        let place = (position % CHARS_PER_WORD) as u32;

        if place == 0 {
            if let Some(position) = open_newline {
                return Err(TextCodecError::TrailingNewline { position });
            }
        }
        if digit == 0 {
            open_newline.get_or_insert(position);
        } else {
            open_newline = None;
        }

        words[word] += digit * BASE.pow(place);
    }

    match open_newline {
        Some(position) => Err(TextCodecError::TrailingNewline { position }),
        None => Ok(words),
    }
}

/// Pack a label into the two numbers a formula passes to `text(...)`
pub fn pack_text_f64(text: &str) -> Result<[f64; TEXT_WORDS], TextCodecError> {
    let [w0, w1] = pack_text(text)?;
    Ok([w0 as f64, w1 as f64])
}

/// Convert a formula number to a payload word (saturating, NaN → 0)
#[inline]
pub fn word_from_f64(v: f64) -> u64 {
    v as u64
}
