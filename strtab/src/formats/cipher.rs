//! Per-language byte transforms applied to the binary string pool.
//!
//! Most locales store their strings in clear text. The rest use either a
//! repeating XOR key or an affine byte substitution. The table below is part
//! of the on-disk format: changing an entry requires a new format version.

use crate::language::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Clear,
    /// Byte `i` of a slot is XORed with `key[i % key.len()]`.
    Xor(&'static [u8]),
    /// `encoded = plain * mul + add (mod 256)`; `mul` is odd.
    Substitution { mul: u8, add: u8 },
}

const XOR_ZH_CN: &[u8] = &[0x5A, 0xC3, 0x17, 0x88];
const XOR_ZH_TW: &[u8] = &[0x3D, 0x91, 0xE6, 0x42, 0x0B, 0x7F];
const XOR_PL: &[u8] = &[0xA7, 0x2C, 0x64, 0xD9, 0x15];
const XOR_RU: &[u8] = &[0x6E, 0xB2, 0x09, 0xF4, 0x33, 0x8D, 0xC1, 0x50];

/// Indexed by [`Language::code`].
const CIPHER_TABLE: [Cipher; 17] = [
    Cipher::Clear, // en-US
    Cipher::Xor(XOR_ZH_CN), // zh-CN
    Cipher::Xor(XOR_ZH_TW), // zh-TW
    Cipher::Clear, // cs-CZ
    Cipher::Clear, // da-DK
    Cipher::Clear, // nl-NL
    Cipher::Clear, // fi-FI
    Cipher::Clear, // fr-FR
    Cipher::Clear, // de-DE
    Cipher::Clear, // it-IT
    Cipher::Substitution { mul: 0x95, add: 0x3B }, // ja-JP
    Cipher::Substitution { mul: 0x1D, add: 0xC6 }, // ko-KR
    Cipher::Clear, // nb-NO
    Cipher::Xor(XOR_PL), // pl-PL
    Cipher::Clear, // pt-BR
    Cipher::Xor(XOR_RU), // ru-RU
    Cipher::Clear, // es-ES
];

/// Multiplicative inverse of an odd byte modulo 256.
fn inverse_mod_256(mul: u8) -> u8 {
    // Newton iteration doubles the number of correct low bits each round.
    let mut inv = mul;
    for _ in 0..3 {
        inv = inv.wrapping_mul(2u8.wrapping_sub(mul.wrapping_mul(inv)));
    }
    inv
}

impl Cipher {
    pub fn for_language(language: Language) -> Cipher {
        CIPHER_TABLE[usize::from(language.code())]
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Cipher::Clear)
    }

    /// Enciphers one pool slot in place.
    pub fn encode(&self, slot: &mut [u8]) {
        match *self {
            Cipher::Clear => {}
            Cipher::Xor(key) => xor_in_place(slot, key),
            Cipher::Substitution { mul, add } => {
                for byte in slot.iter_mut() {
                    *byte = byte.wrapping_mul(mul).wrapping_add(add);
                }
            }
        }
    }

    /// Deciphers one pool slot in place.
    pub fn decode(&self, slot: &mut [u8]) {
        match *self {
            Cipher::Clear => {}
            Cipher::Xor(key) => xor_in_place(slot, key),
            Cipher::Substitution { mul, add } => {
                let inv = inverse_mod_256(mul);
                for byte in slot.iter_mut() {
                    *byte = byte.wrapping_sub(add).wrapping_mul(inv);
                }
            }
        }
    }
}

fn xor_in_place(slot: &mut [u8], key: &[u8]) {
    for (byte, k) in slot.iter_mut().zip(key.iter().cycle()) {
        *byte ^= k;
    }
}
