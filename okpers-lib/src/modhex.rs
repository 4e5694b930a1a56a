//! Modhex: hex with the alphabet `cbdefghijklnrtuv`, chosen to survive any
//! keyboard layout.

use crate::error::KeyError;

const MODHEX_ALPHABET: &[u8; 16] = b"cbdefghijklnrtuv";

pub fn encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for &byte in data {
        out.push(MODHEX_ALPHABET[(byte >> 4) as usize] as char);
        out.push(MODHEX_ALPHABET[(byte & 0x0f) as usize] as char);
    }
    out
}

pub fn decode(text: &str) -> Result<Vec<u8>, KeyError> {
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(KeyError::InvalidArgument(format!("modhex string has odd length {}", bytes.len())));
    }

    bytes
        .chunks_exact(2)
        .map(|pair| Ok((nibble(pair[0])? << 4) | nibble(pair[1])?))
        .collect()
}

fn nibble(c: u8) -> Result<u8, KeyError> {
    MODHEX_ALPHABET
        .iter()
        .position(|&m| m == c.to_ascii_lowercase())
        .map(|p| p as u8)
        .ok_or_else(|| KeyError::InvalidArgument(format!("'{}' is not a modhex character", c as char)))
}
