//! Reinterpreting raw little-endian words as samples

use num_traits::FromBytes;

use crate::WORD_SIZE;

/// Decode one 4-byte little-endian word
pub fn decode_word<T>(word: [u8; WORD_SIZE]) -> T
where
    T: FromBytes<Bytes = [u8; WORD_SIZE]>,
{
    T::from_le_bytes(&word)
}

/// Decode a run of 4-byte little-endian words. A trailing partial word is ignored,
/// the synchronizers never hand one over.
pub fn decode_le<T>(bytes: &[u8]) -> Vec<T>
where
    T: FromBytes<Bytes = [u8; WORD_SIZE]>,
{
    bytes
        .chunks_exact(WORD_SIZE)
        .map(|chunk| {
            let mut word = [0u8; WORD_SIZE];
            word.copy_from_slice(chunk);
            decode_word(word)
        })
        .collect()
}
