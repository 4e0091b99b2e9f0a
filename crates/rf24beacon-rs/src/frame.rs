//! The advertising frame builder.
//!
//! An [`AdvertisingFrame`] owns the fixed-size buffer that becomes the raw BLE packet:
//!
//! | offset | length | content |
//! |:-------|:-------|:--------|
//! | `0` | 1 | PDU header ([`PduHeader`]) |
//! | `1` | 1 | PDU length (everything after this byte, excluding the CRC) |
//! | `2` | 6 | device address (least significant byte first) |
//! | `8` | 3 | flags AD structure ([`FLAGS_AD`]) |
//! | `11` | `2 + n` | name AD structure (optional) |
//! | `13 + n` | `2 + m` | manufacturer data AD structure (optional) |
//! | `2 + length` | 3 | CRC (placeholder until encoded) |
use bitfield_struct::bitfield;
use core::fmt::{Display, Formatter, Result as FmtResult};

use crate::{
    address::DEFAULT_ADDRESS,
    data_manipulation::{CRC_INIT, CRC_LEN},
};

#[cfg(feature = "std")]
extern crate std;

/// The largest packet the radio can hold (nRF24L01 TX FIFO width).
pub const MAX_PAYLOAD_LEN: usize = 32;

/// The smallest usable capacity: fixed fields, an empty name, empty data and the CRC.
pub const MIN_PAYLOAD_CAPACITY: u8 = (FIXED_LEN + AD_HEADER_LEN * 2 + CRC_LEN) as u8;

/// The PDU type of a non-connectable undirected advertisement.
pub const ADV_NONCONN_IND: u8 = 2;

/// AD structure declaring "LE limited discoverable, BR/EDR not supported".
pub const FLAGS_AD: [u8; 3] = [2, 1, 5];

/// AD type of the device name ("shortened local name").
///
/// This is used even when the name was not shortened.
pub const AD_TYPE_SHORT_NAME: u8 = 0x08;

/// AD type of the application data ("manufacturer specific data").
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

const HEADER: usize = 0;
const LENGTH: usize = 1;
const ADDRESS: usize = 2;
const FLAGS: usize = 8;
const NAME: usize = 11;
const ADDRESS_LEN: usize = FLAGS - ADDRESS;
/// Bytes used by the header, length, address and flags.
const FIXED_LEN: usize = NAME;
/// Bytes used by an AD structure's own length and type fields.
const AD_HEADER_LEN: usize = 2;

/// The first byte of a BLE advertising channel PDU.
#[bitfield(u8, order = Msb)]
#[derive(PartialEq, Eq)]
pub struct PduHeader {
    /// Receiver address is random (unused by advertisements without a target).
    pub rx_add: bool,
    /// Advertiser (device) address is random.
    pub tx_add: bool,
    /// Channel selection algorithm #2 is supported.
    pub ch_sel: bool,
    #[bits(1)]
    _padding: u8,
    /// The PDU type.
    #[bits(4)]
    pub pdu_type: u8,
}

impl PduHeader {
    /// A non-connectable undirected advertisement from a random address (`0x42`).
    pub fn advertisement() -> Self {
        Self::new()
            .with_pdu_type(ADV_NONCONN_IND)
            .with_tx_add(true)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PduHeader {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PduHeader type: {=u8}, tx_add: {=bool}, rx_add: {=bool}",
            self.pdu_type(),
            self.tx_add(),
            self.rx_add()
        )
    }
}

/// Reasons a frame declined a change.
///
/// The frame is never altered when one of these is returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// The field would not fit in the remaining space of the payload.
    CapacityExceeded {
        /// The number of bytes that the field needed.
        requested: usize,
        /// The number of bytes that were available.
        available: u8,
    },
    /// Data was given before a device name was set.
    ///
    /// Use [`AdvertisingFrame::set_name()`] (with an empty name if needed) first.
    NameRequired,
}

impl Display for FrameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FrameError::CapacityExceeded {
                requested,
                available,
            } => write!(
                f,
                "{requested} bytes requested but only {available} bytes are available"
            ),
            FrameError::NameRequired => write!(f, "a device name must be set before data"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FrameError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            FrameError::CapacityExceeded {
                requested,
                available,
            } => defmt::write!(
                fmt,
                "CapacityExceeded requested: {=usize}, available: {=u8}",
                requested,
                available
            ),
            FrameError::NameRequired => defmt::write!(fmt, "NameRequired"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FrameError {}

/// The content of one beacon payload, before link layer encoding.
#[derive(Debug, Clone)]
pub struct AdvertisingFrame {
    buf: [u8; MAX_PAYLOAD_LEN],
    capacity: u8,
    address: [u8; 6],
    name_len: Option<u8>,
    data_len: Option<u8>,
}

impl Default for AdvertisingFrame {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD_LEN as u8)
    }
}

impl AdvertisingFrame {
    /// Create a frame that uses up to `capacity` bytes (clamped to
    /// the range [[`MIN_PAYLOAD_CAPACITY`], [`MAX_PAYLOAD_LEN`]]) including the CRC.
    ///
    /// The frame starts with [`DEFAULT_ADDRESS`], no name and no data.
    pub fn new(capacity: u8) -> Self {
        let mut frame = Self {
            buf: [0u8; MAX_PAYLOAD_LEN],
            capacity: capacity.clamp(MIN_PAYLOAD_CAPACITY, MAX_PAYLOAD_LEN as u8),
            address: DEFAULT_ADDRESS,
            name_len: None,
            data_len: None,
        };
        frame.reset();
        frame
    }

    /// Clear the name and data, and rewrite the fixed fields.
    ///
    /// The device address is kept.
    pub fn reset(&mut self) {
        self.buf = [0u8; MAX_PAYLOAD_LEN];
        self.buf[HEADER] = PduHeader::advertisement().into_bits();
        self.buf[FLAGS..NAME].copy_from_slice(&FLAGS_AD);
        self.name_len = None;
        self.data_len = None;
        self.set_address(self.address);
        self.update_length();
    }

    /// The number of bytes (including the CRC) that this frame may occupy.
    pub fn capacity(&self) -> u8 {
        self.capacity
    }

    /// The PDU header of this frame.
    pub fn header(&self) -> PduHeader {
        PduHeader::from_bits(self.buf[HEADER])
    }

    /// Set the device address. The `address` is given most significant byte first.
    pub fn set_address(&mut self, address: [u8; 6]) {
        self.address = address;
        for (dst, src) in self.buf[ADDRESS..FLAGS].iter_mut().zip(address.iter().rev()) {
            *dst = *src;
        }
    }

    /// Get the device address (most significant byte first).
    pub fn address(&self) -> [u8; 6] {
        self.address
    }

    /// Set the device name, discarding any data previously set.
    ///
    /// Returns the number of bytes left for [`AdvertisingFrame::set_data()`].
    /// If the `name` cannot fit alongside an empty data field, then
    /// [`FrameError::CapacityExceeded`] is returned and nothing changes.
    pub fn set_name(&mut self, name: &str) -> Result<u8, FrameError> {
        let name = name.as_bytes();
        let available = self.space_after(0);
        if name.len() > available {
            return Err(FrameError::CapacityExceeded {
                requested: name.len(),
                available: available as u8,
            });
        }
        let len = name.len();
        self.buf[NAME] = len as u8 + 1;
        self.buf[NAME + 1] = AD_TYPE_SHORT_NAME;
        self.buf[NAME + AD_HEADER_LEN..NAME + AD_HEADER_LEN + len].copy_from_slice(name);
        self.buf[NAME + AD_HEADER_LEN + len..].fill(0);
        self.name_len = Some(len as u8);
        self.data_len = None;
        self.update_length();
        Ok(self.space_after(len) as u8)
    }

    /// Get the device name bytes, if a name was set.
    pub fn name(&self) -> Option<&[u8]> {
        let len = self.name_len? as usize;
        Some(&self.buf[NAME + AD_HEADER_LEN..NAME + AD_HEADER_LEN + len])
    }

    /// Set the application data as a manufacturer specific AD structure.
    ///
    /// This can be called repeatedly, but only after [`AdvertisingFrame::set_name()`].
    /// The given `data` must not be longer than [`AdvertisingFrame::remaining_capacity()`].
    /// Upon error, nothing changes.
    pub fn set_data(&mut self, data: &[u8]) -> Result<(), FrameError> {
        let available = self.remaining_capacity().ok_or(FrameError::NameRequired)?;
        if data.len() > available as usize {
            return Err(FrameError::CapacityExceeded {
                requested: data.len(),
                available,
            });
        }
        let offset = self.data_offset();
        let len = data.len();
        self.buf[offset] = len as u8 + 1;
        self.buf[offset + 1] = AD_TYPE_MANUFACTURER_DATA;
        self.buf[offset + AD_HEADER_LEN..offset + AD_HEADER_LEN + len].copy_from_slice(data);
        self.buf[offset + AD_HEADER_LEN + len..].fill(0);
        self.data_len = Some(len as u8);
        self.update_length();
        Ok(())
    }

    /// Get the application data bytes, if data was set.
    pub fn data(&self) -> Option<&[u8]> {
        let len = self.data_len? as usize;
        let offset = self.data_offset() + AD_HEADER_LEN;
        Some(&self.buf[offset..offset + len])
    }

    /// The number of data bytes that [`AdvertisingFrame::set_data()`] will accept.
    ///
    /// Returns [`None`] if no name has been set.
    pub fn remaining_capacity(&self) -> Option<u8> {
        self.name_len.map(|len| self.space_after(len as usize) as u8)
    }

    /// The PDU length field value for the fields currently present.
    pub fn current_length(&self) -> u8 {
        let mut len = ADDRESS_LEN + FLAGS_AD.len();
        if let Some(name_len) = self.name_len {
            len += AD_HEADER_LEN + name_len as usize;
        }
        if let Some(data_len) = self.data_len {
            len += AD_HEADER_LEN + data_len as usize;
        }
        len as u8
    }

    /// The raw PDU (header, length and fields) without a CRC.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..LENGTH + 1 + self.current_length() as usize]
    }

    /// Write the length field and the CRC placeholder ([`CRC_INIT`]).
    ///
    /// Returns the raw packet that is ready for [`encode()`](fn@crate::encoder::encode).
    pub fn finalize(&mut self) -> &[u8] {
        self.update_length();
        let pdu_len = LENGTH + 1 + self.current_length() as usize;
        self.buf[pdu_len..pdu_len + CRC_LEN].copy_from_slice(&CRC_INIT);
        &self.buf[..pdu_len + CRC_LEN]
    }

    fn update_length(&mut self) {
        self.buf[LENGTH] = self.current_length();
    }

    fn data_offset(&self) -> usize {
        NAME + AD_HEADER_LEN + self.name_len.unwrap_or_default() as usize
    }

    /// Bytes left for data given a name of `name_len` bytes.
    fn space_after(&self, name_len: usize) -> usize {
        (self.capacity as usize)
            .saturating_sub(FIXED_LEN + AD_HEADER_LEN + name_len + AD_HEADER_LEN + CRC_LEN)
    }
}
