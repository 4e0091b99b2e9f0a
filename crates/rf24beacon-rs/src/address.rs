//! Device address generation.
//!
//! Addresses are given most-significant byte first, as they are usually printed
//! (`01:23:45:67:89:AB`). The frame stores them least-significant byte first.

/// The fallback device address used when no other address is configured.
pub const DEFAULT_ADDRESS: [u8; 6] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB];

/// Derive a static random device address from a caller-supplied `seed`.
///
/// Any entropy source will do (a RTC timestamp, a hardware RNG word, a chip ID).
/// The same `seed` always yields the same address. The two most significant
/// bits are set as BLE requires for static random addresses.
pub fn address_from_seed(seed: u64) -> [u8; 6] {
    // splitmix64 finalizer
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;

    let mut address = [0u8; 6];
    address.copy_from_slice(&z.to_be_bytes()[2..8]);
    address[0] |= 0xC0;
    address
}
