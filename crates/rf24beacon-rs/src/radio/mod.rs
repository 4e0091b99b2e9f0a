//! The raw radio primitives that a beacon needs.
//!
//! A [`Beacon`](struct@crate::Beacon) only talks to its radio through [`BeaconRadio`],
//! so the encoding core can run (and be tested) without any hardware.
//! [`Nrf24Radio`] implements it for the nRF24L01 using [`embedded_hal`] traits.

mod nrf24;
pub use nrf24::{
    access_address, commands, mnemonics, registers, Nrf24Error, Nrf24Radio, BLE_ACCESS_ADDRESS,
};

/// A transceiver that can emit arbitrary bytes on a given frequency.
///
/// All operations are synchronous. Hardware failures are reported as
/// [`BeaconRadio::Error`] and are never retried by the beacon.
pub trait BeaconRadio {
    type Error;

    /// Write a single `value` to a configuration `register`.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Write a raw sequence of `bytes` (command followed by its data) to the radio.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Tune the radio to the given `frequency` (MHz above 2400 MHz).
    fn set_channel_frequency(&mut self, frequency: u8) -> Result<(), Self::Error>;

    /// Load the encoded `payload` to be sent by the next [`BeaconRadio::pulse_enable()`].
    fn load_payload(&mut self, payload: &[u8]) -> Result<(), Self::Error>;

    /// Assert the transmit-enable signal, hold it for `hold_ms` milliseconds, then de-assert it.
    ///
    /// This blocks for the whole hold duration.
    fn pulse_enable(&mut self, hold_ms: u32) -> Result<(), Self::Error>;

    /// Apply the configuration needed to emit raw BLE advertising packets.
    ///
    /// The default implementation does nothing.
    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Put the radio in a low power state.
    ///
    /// The default implementation does nothing.
    fn power_down(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
