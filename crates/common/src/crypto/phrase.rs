//! 24-word recovery phrase for the master key
//!
//! The 33-byte master key is 264 bits, which splits evenly into twenty-four
//! 11-bit indices into the BIP-39 English word list. Bits are consumed
//! most-significant first and there is no checksum word: the master key
//! itself is the payload.

use bip39::Language;
use zeroize::Zeroizing;

use super::seed::{SeedError, MASTER_KEY_SIZE};

/// Number of words in a recovery phrase
pub const PHRASE_WORD_COUNT: usize = 24;

const BITS_PER_WORD: u32 = 11;
const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

fn word_list() -> &'static [&'static str; 2048] {
    Language::English.word_list()
}

/// Encode a master key as 24 recovery words
pub fn encode_phrase(master_key: &[u8; MASTER_KEY_SIZE]) -> Vec<&'static str> {
    let words = word_list();
    let mut phrase = Vec::with_capacity(PHRASE_WORD_COUNT);
    let mut accumulator: u32 = 0;
    let mut bits: u32 = 0;

    for byte in master_key {
        accumulator = (accumulator << 8) | u32::from(*byte);
        bits += 8;
        if bits >= BITS_PER_WORD {
            bits -= BITS_PER_WORD;
            let index = (accumulator >> bits) & WORD_MASK;
            accumulator &= (1 << bits) - 1;
            phrase.push(words[index as usize]);
        }
    }

    phrase
}

/// Decode 24 recovery words back into the master key
///
/// Words are matched exactly against the lowercase English list.
///
/// # Errors
///
/// - [`SeedError::InvalidWordCount`] if there are not exactly 24 words
/// - [`SeedError::UnknownWord`] if a word is not in the list
/// - [`SeedError::ShortPayload`] if the words do not pack into 33 bytes
pub fn decode_phrase<S: AsRef<str>>(
    phrase: &[S],
) -> Result<Zeroizing<[u8; MASTER_KEY_SIZE]>, SeedError> {
    if phrase.len() != PHRASE_WORD_COUNT {
        return Err(SeedError::InvalidWordCount(phrase.len()));
    }

    let words = word_list();
    let mut bytes = Zeroizing::new(Vec::with_capacity(MASTER_KEY_SIZE));
    let mut remainder: u32 = 0;
    let mut bits: u32 = 0;

    for word in phrase {
        let word = word.as_ref();
        let index = words
            .binary_search(&word)
            .map_err(|_| SeedError::UnknownWord(word.to_string()))?;

        remainder = (remainder << BITS_PER_WORD) | index as u32;
        bits += BITS_PER_WORD;
        while bits >= 8 {
            bits -= 8;
            bytes.push((remainder >> bits) as u8);
        }
        remainder &= (1 << bits) - 1;
    }

    if bytes.len() != MASTER_KEY_SIZE {
        return Err(SeedError::ShortPayload(bytes.len()));
    }

    let mut master_key = Zeroizing::new([0u8; MASTER_KEY_SIZE]);
    master_key.copy_from_slice(&bytes);
    Ok(master_key)
}

/// Split a space separated phrase and decode it
pub fn decode_phrase_str(phrase: &str) -> Result<Zeroizing<[u8; MASTER_KEY_SIZE]>, SeedError> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    decode_phrase(&words)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_phrase_roundtrip() {
        for _ in 0..64 {
            let mut master_key = [0u8; MASTER_KEY_SIZE];
            getrandom::getrandom(&mut master_key).unwrap();

            let phrase = encode_phrase(&master_key);
            assert_eq!(phrase.len(), PHRASE_WORD_COUNT);

            let decoded = decode_phrase(&phrase).unwrap();
            assert_eq!(*decoded, master_key);
        }
    }

    #[test]
    fn test_phrase_edges() {
        let zeros = encode_phrase(&[0u8; MASTER_KEY_SIZE]);
        assert!(zeros.iter().all(|w| *w == "abandon"));

        let ones = encode_phrase(&[0xffu8; MASTER_KEY_SIZE]);
        assert!(ones.iter().all(|w| *w == "zoo"));
    }

    #[test]
    fn test_phrase_bit_order() {
        // first 11 bits are 0b00000000_001 -> index 1
        let mut master_key = [0u8; MASTER_KEY_SIZE];
        master_key[1] = 0b0010_0000;
        let phrase = encode_phrase(&master_key);
        assert_eq!(phrase[0], word_list()[1]);
        assert!(phrase[1..].iter().all(|w| *w == "abandon"));
    }

    #[test]
    fn test_phrase_wrong_word_count() {
        let phrase = vec!["abandon"; 23];
        assert!(matches!(
            decode_phrase(&phrase),
            Err(SeedError::InvalidWordCount(23))
        ));
        let phrase = vec!["abandon"; 25];
        assert!(matches!(
            decode_phrase(&phrase),
            Err(SeedError::InvalidWordCount(25))
        ));
    }

    #[test]
    fn test_phrase_unknown_word() {
        let mut phrase = vec!["abandon"; PHRASE_WORD_COUNT];
        phrase[7] = "bitmark";
        match decode_phrase(&phrase) {
            Err(SeedError::UnknownWord(word)) => assert_eq!(word, "bitmark"),
            other => panic!("expected unknown word, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_phrase_from_str() {
        let master_key = [0x5au8; MASTER_KEY_SIZE];
        let joined = encode_phrase(&master_key).join(" ");
        let decoded = decode_phrase_str(&format!("  {joined}\n")).unwrap();
        assert_eq!(*decoded, master_key);
    }
}
