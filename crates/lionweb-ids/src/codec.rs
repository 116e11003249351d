//! 6-bit identifier packing
//!
//! Node identifiers are drawn from a 64-symbol alphabet, so every character
//! carries exactly 6 bits. Four characters pack into three bytes; a trailing
//! group of two or three characters packs into one or two bytes.

use smallvec::SmallVec;

/// Inline capacity for packed identifiers (32 characters)
pub const INLINE_BYTES: usize = 24;

/// Packed byte storage
pub type PackedBytes = SmallVec<[u8; INLINE_BYTES]>;

/// Symbols in value order: digits, upper-case, lower-case, `-`, `_`
pub const ALPHABET: &[u8; 64] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz-_";

const INVALID: u8 = 0xFF;

const fn build_reverse_table() -> [u8; 256] {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 64 {
        table[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
}

const REVERSE: [u8; 256] = build_reverse_table();

/// 6-bit value of an alphabet symbol
#[inline]
#[must_use]
pub fn symbol_value(symbol: u8) -> Option<u8> {
    match REVERSE[symbol as usize] {
        INVALID => None,
        v => Some(v),
    }
}

/// Whether every character of `id` belongs to the alphabet
#[inline]
#[must_use]
pub fn is_alphabet_only(id: &str) -> bool {
    id.bytes().all(|b| REVERSE[b as usize] != INVALID)
}

/// Pack an identifier into bytes
///
/// Returns `None` when the identifier cannot be packed losslessly:
/// - a character is outside the alphabet
/// - the length is `4k + 1` (a single trailing symbol has no packed form)
/// - the trailing group has non-zero bits that the partial byte would drop
#[must_use]
pub fn encode(id: &str) -> Option<PackedBytes> {
    let input = id.as_bytes();
    if input.len() % 4 == 1 {
        return None;
    }

    let mut out = PackedBytes::with_capacity(input.len() / 4 * 3 + 2);
    for group in input.chunks(4) {
        let mut v = [0u8; 4];
        for (slot, &symbol) in v.iter_mut().zip(group) {
            *slot = symbol_value(symbol)?;
        }

        match group.len() {
            4 => {
                out.push((v[0] << 2) | (v[1] >> 4));
                out.push(((v[1] & 0x0F) << 4) | (v[2] >> 2));
                out.push(((v[2] & 0x03) << 6) | v[3]);
            }
            3 => {
                if v[2] & 0x03 != 0 {
                    return None;
                }
                out.push((v[0] << 2) | (v[1] >> 4));
                out.push(((v[1] & 0x0F) << 4) | (v[2] >> 2));
            }
            2 => {
                if v[1] & 0x0F != 0 {
                    return None;
                }
                out.push((v[0] << 2) | (v[1] >> 4));
            }
            _ => return None,
        }
    }

    Some(out)
}

/// Unpack bytes produced by [`encode`]
///
/// The byte length determines the trailing group: `3k + 1` bytes end in a
/// two-symbol group, `3k + 2` bytes in a three-symbol group.
#[must_use]
pub fn decode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / 3 * 4 + 3);
    let symbol = |v: u8| char::from(ALPHABET[(v & 0x3F) as usize]);

    for group in bytes.chunks(3) {
        match *group {
            [b0, b1, b2] => {
                out.push(symbol(b0 >> 2));
                out.push(symbol(((b0 & 0x03) << 4) | (b1 >> 4)));
                out.push(symbol(((b1 & 0x0F) << 2) | (b2 >> 6)));
                out.push(symbol(b2 & 0x3F));
            }
            [b0, b1] => {
                out.push(symbol(b0 >> 2));
                out.push(symbol(((b0 & 0x03) << 4) | (b1 >> 4)));
                out.push(symbol((b1 & 0x0F) << 2));
            }
            [b0] => {
                out.push(symbol(b0 >> 2));
                out.push(symbol((b0 & 0x03) << 4));
            }
            _ => {}
        }
    }

    out
}
