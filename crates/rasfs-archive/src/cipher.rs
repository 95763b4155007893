//! RAS keystream cipher.
//!
//! The header and both index blobs of a RAS archive are obscured with a
//! byte-wise keystream derived from the signed 32-bit seed stored at offset 4.
//! This is obfuscation only and must not be treated as a security boundary.
//!
//! Every block restarts from the base seed; blocks are never chained.

/// Multiplier whose high product word drives the seed step.
const SEED_MAGIC: i32 = 0xb92143fb_u32 as i32;
const SEED_MUL: i32 = 0xab;
const SEED_MOD: i32 = 0x763d;

/// Keystream generator for a single block.
#[derive(Debug, Clone)]
struct Keystream {
    seed: i32,
}

impl Keystream {
    #[inline]
    fn new(seed: i32) -> Self {
        Self {
            seed: if seed == 0 { 1 } else { seed },
        }
    }

    /// Advance the seed and return the next key byte.
    ///
    /// The high-word multiply is a signed division by 177, making this a
    /// Schrage step of `171 * seed mod 30269` without the final correction.
    #[inline]
    fn next(&mut self) -> u8 {
        let seed = self.seed;
        let high = ((i64::from(seed) * i64::from(SEED_MAGIC)) >> 32) as i32;
        let edx = high.wrapping_add(seed) >> 7;
        let quotient = (((edx as u32) >> 31) as i32).wrapping_add(edx);
        self.seed = seed
            .wrapping_mul(SEED_MUL)
            .wrapping_sub(quotient.wrapping_mul(SEED_MOD));
        self.seed as u8
    }
}

#[inline]
fn position_mask(pos: usize) -> u8 {
    (pos as u8).wrapping_add(3).wrapping_mul(6)
}

#[inline]
fn rotation(pos: usize) -> u32 {
    (pos % 5) as u32
}

/// Decrypt a block in place.
///
/// A seed of zero behaves exactly like a seed of one.
pub fn decrypt_in_place(data: &mut [u8], seed: i32) {
    let mut keystream = Keystream::new(seed);
    for (pos, byte) in data.iter_mut().enumerate() {
        let rotated = byte.rotate_left(rotation(pos));
        let key = keystream.next();
        *byte = (position_mask(pos) ^ rotated).wrapping_add(key);
    }
}

/// Encrypt a block in place; the exact inverse of [`decrypt_in_place`].
pub fn encrypt_in_place(data: &mut [u8], seed: i32) {
    let mut keystream = Keystream::new(seed);
    for (pos, byte) in data.iter_mut().enumerate() {
        let key = keystream.next();
        let rotated = byte.wrapping_sub(key) ^ position_mask(pos);
        *byte = rotated.rotate_right(rotation(pos));
    }
}

/// Decrypt a block to a new buffer.
pub fn decrypt(data: &[u8], seed: i32) -> Vec<u8> {
    let mut buffer = data.to_vec();
    decrypt_in_place(&mut buffer, seed);
    buffer
}
