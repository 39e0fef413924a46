//! Key hashing shared by every codec.
//!
//! The binary string table addresses keys and string ids by 32-bit FNV-1a;
//! `keyHex` is the canonical text rendering of that hash so keys round-trip
//! byte-identically between the text formats and the binary one.

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
pub fn fnv1a_32(s: &str) -> u32 {
    s.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Renders a key hash as `0x` + eight upper-case hex digits.
pub fn format_key_hex(hash: u32) -> String {
    format!("0x{hash:08X}")
}

/// The `keyHex` a record with this key name must carry.
pub fn key_hex(key_name: &str) -> String {
    format_key_hex(fnv1a_32(key_name))
}

/// Parses a `keyHex` string back into its hash value. Accepts an optional `0x`
/// prefix and either case.
pub fn parse_key_hex(s: &str) -> Option<u32> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() || digits.len() > 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a_32(""), 0x811C_9DC5);
        assert_eq!(fnv1a_32("a"), 0xE40C_292C);
        assert_eq!(fnv1a_32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_key_hex_format() {
        assert_eq!(key_hex(""), "0x811C9DC5");
        assert_eq!(format_key_hex(0xAB), "0x000000AB");
    }

    #[test]
    fn test_parse_key_hex() {
        assert_eq!(parse_key_hex("0x000000AB"), Some(0xAB));
        assert_eq!(parse_key_hex("e40c292c"), Some(0xE40C_292C));
        assert_eq!(parse_key_hex("0x"), None);
        assert_eq!(parse_key_hex("0x123456789"), None);
        assert_eq!(parse_key_hex("zz"), None);
    }
}
