//! A module that holds the bit-level transforms of the BLE link layer.
//!
//! These are kept as explicit bit loops because the exact polynomial and
//! bit order are what make the output acceptable to a real BLE scanner.

/// The CRC initial value used on BLE advertising channels (`0x555555`).
///
/// Stored as 3 bytes, low-to-high, in the form expected by [`crc24()`].
pub const CRC_INIT: [u8; 3] = [0x55; 3];

/// The number of CRC bytes trailing a BLE packet.
pub const CRC_LEN: usize = 3;

/// Reverse the order of bits in a single `byte` (bit 7 becomes bit 0 and so on).
pub const fn reverse_bits(byte: u8) -> u8 {
    byte.reverse_bits()
}

/// Reverse the bit order for each byte in the given `buf`.
///
/// This does not alter the buffer's Endianness.
pub fn reverse_bits_in(buf: &mut [u8]) {
    for byte in buf {
        *byte = reverse_bits(*byte);
    }
}

/// Run the BLE CRC-24 over `data`, using `crc` as the running accumulator.
///
/// The accumulator must be seeded before calling this (see [`CRC_INIT`]).
/// Input bits are consumed least-significant first. Upon return, `crc` holds
/// the checksum in natural bit order.
pub fn crc24(data: &[u8], crc: &mut [u8; 3]) {
    for byte in data {
        let mut input = *byte;
        for _ in 0u8..8 {
            let carry = crc[0] >> 7;
            crc[0] = (crc[0] << 1) | (crc[1] >> 7);
            crc[1] = (crc[1] << 1) | (crc[2] >> 7);
            crc[2] <<= 1;
            if carry != (input & 1) {
                crc[2] ^= 0x5B;
                crc[1] ^= 0x06;
            }
            input >>= 1;
        }
    }
}

/// Calculate a 24 bit CRC checksum for the given `data` seeded with [`CRC_INIT`].
pub fn crc24_ble(data: &[u8]) -> [u8; 3] {
    let mut crc = CRC_INIT;
    crc24(data, &mut crc);
    crc
}

/// Whiten or de-whiten the given `buf` using a 7 bit LFSR started from `seed`.
///
/// The LFSR occupies the upper 7 bits of `seed`. Use [`whitening_seed()`] to get
/// the `seed` for a BLE channel index. Applying this twice with the same `seed`
/// restores the original content.
pub fn whiten(buf: &mut [u8], seed: u8) {
    let mut lfsr = seed;
    for byte in buf {
        let mut mask = 1u8;
        while mask != 0 {
            if lfsr & 0x80 != 0 {
                lfsr ^= 0x11;
                *byte ^= mask;
            }
            lfsr <<= 1;
            mask <<= 1;
        }
    }
}

/// Get the whitening LFSR seed for a BLE channel index (0 - 39).
///
/// This is the bit-reversed channel index with bit 1 set, which lines up
/// with the LFSR layout used by [`whiten()`].
pub const fn whitening_seed(channel: u8) -> u8 {
    reverse_bits(channel) | 2
}
