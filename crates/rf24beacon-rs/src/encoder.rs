//! The BLE link layer encode pipeline.
//!
//! A raw packet is laid out as `[header][length][payload][CRC x 3]`.
//! [`encode()`] turns it into the exact bytes that the radio shall emit.

use crate::data_manipulation::{crc24, reverse_bits_in, whiten, whitening_seed, CRC_INIT, CRC_LEN};

/// Split a `packet` into its PDU and its trailing CRC.
fn split_crc(packet: &mut [u8]) -> Option<(&mut [u8], &mut [u8; 3])> {
    let pdu_len = packet.len().checked_sub(CRC_LEN)?;
    let (pdu, crc) = packet.split_at_mut(pdu_len);
    let crc = <&mut [u8; 3]>::try_from(crc).ok()?;
    Some((pdu, crc))
}

/// Encode a raw `packet` in place for transmission on the BLE `channel` (37 - 39).
///
/// The `packet` length includes the 3 trailing CRC bytes, which must already
/// hold [`CRC_INIT`] (not zeros). The steps are
///
/// 1. calculate the CRC over everything before the trailing 3 bytes,
/// 2. reverse the bit order of the CRC bytes only,
/// 3. whiten the whole packet with the `channel`'s seed,
/// 4. reverse the bit order of every byte.
///
/// The order of these steps matters. A `packet` shorter than 3 bytes is left untouched.
pub fn encode(packet: &mut [u8], channel: u8) {
    let Some((pdu, crc)) = split_crc(packet) else {
        return;
    };
    crc24(pdu, crc);
    reverse_bits_in(crc);
    whiten(packet, whitening_seed(channel));
    reverse_bits_in(packet);
}

/// Undo [`encode()`] in place and verify the CRC.
///
/// The `channel` must be the same BLE channel that the `packet` was encoded for.
/// Upon return, the `packet` holds the plaintext PDU followed by its CRC
/// (in natural bit order). Returns `true` if that CRC matches a checksum
/// recalculated over the plaintext.
pub fn decode(packet: &mut [u8], channel: u8) -> bool {
    if packet.len() < CRC_LEN {
        return false;
    }
    reverse_bits_in(packet);
    whiten(packet, whitening_seed(channel));
    let Some((pdu, crc)) = split_crc(packet) else {
        return false;
    };
    reverse_bits_in(crc);
    let mut expected = CRC_INIT;
    crc24(pdu, &mut expected);
    expected == *crc
}
