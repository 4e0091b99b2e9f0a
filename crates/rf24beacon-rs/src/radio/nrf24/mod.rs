use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiDevice};

mod constants;
pub use constants::{commands, mnemonics, registers};

use super::BeaconRadio;
use crate::{data_manipulation::reverse_bits_in, frame::MAX_PAYLOAD_LEN};

/// The access address shared by every BLE advertising packet.
pub const BLE_ACCESS_ADDRESS: u32 = 0x8E89_BED6;

/// CONFIG register value: CRC disabled, "max retries" IRQ masked, powered up as TX.
const CONFIG_TX: u8 = mnemonics::MASK_MAX_RT | mnemonics::PWR_UP;

/// All IRQ flags of the STATUS register. Writing these clears the flags.
const IRQ_MASK: u8 = mnemonics::MASK_RX_DR | mnemonics::MASK_TX_DS | mnemonics::MASK_MAX_RT;

/// Register writes that turn the nRF24L01 into a dumb BLE-compatible transmitter.
const INIT_SEQUENCE: [(u8, u8); 11] = [
    (registers::CONFIG, CONFIG_TX),
    // no auto-ack
    (registers::EN_AA, 0),
    (registers::EN_RXADDR, 0),
    // 4 byte addresses
    (registers::SETUP_AW, 2),
    // no auto-retries
    (registers::SETUP_RETR, 0),
    // 1 Mbps at 0 dBm
    (registers::RF_SETUP, 6),
    (registers::STATUS, IRQ_MASK),
    // static payloads only
    (registers::DYNPD, 0),
    (registers::FEATURE, 0),
    (registers::RX_PW_P0, MAX_PAYLOAD_LEN as u8),
    (registers::EN_RXADDR, 1),
];

/// The BLE access address as the nRF24L01 expects it in its address registers.
pub fn access_address() -> [u8; 4] {
    let mut address = BLE_ACCESS_ADDRESS.to_be_bytes();
    reverse_bits_in(&mut address);
    address
}

/// An collection of error types to describe hardware malfunctions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Nrf24Error<SPI, DO> {
    /// Represents a SPI transaction error.
    Spi(SPI),
    /// Represents a DigitalOutput error.
    Gpo(DO),
}

/// A [`BeaconRadio`] implementation for the nRF24L01 transceiver.
///
/// The radio's CSN pin (aka Chip Select pin) shall be defined
/// when instantiating the [`SpiDevice`] object (passed to the `spi` parameter).
pub struct Nrf24Radio<SPI, DO, DELAY> {
    spi: SPI,
    ce_pin: DO,
    delay_impl: DELAY,
    buf: [u8; MAX_PAYLOAD_LEN + 1],
    status: u8,
}

impl<SPI, DO, DELAY> Nrf24Radio<SPI, DO, DELAY>
where
    SPI: SpiDevice,
    DO: OutputPin,
    DELAY: DelayNs,
{
    /// Instantiate a [`Nrf24Radio`] object for use on the specified
    /// `spi` bus with the given `ce_pin`.
    pub fn new(ce_pin: DO, spi: SPI, delay_impl: DELAY) -> Self {
        Self {
            spi,
            ce_pin,
            delay_impl,
            buf: [0u8; MAX_PAYLOAD_LEN + 1],
            status: 0,
        }
    }

    /// Release the underlying hardware objects.
    pub fn free(self) -> (DO, SPI, DELAY) {
        (self.ce_pin, self.spi, self.delay_impl)
    }

    /// The STATUS byte returned by the latest SPI transaction.
    pub fn status(&self) -> u8 {
        self.status
    }

    fn spi_transfer(&mut self, len: usize) -> Result<(), Nrf24Error<SPI::Error, DO::Error>> {
        self.spi
            .transfer_in_place(&mut self.buf[..len])
            .map_err(Nrf24Error::Spi)?;
        self.status = self.buf[0];
        Ok(())
    }

    /// Send `command` followed by at most [`MAX_PAYLOAD_LEN`] bytes of `buf`.
    fn spi_write_buf(
        &mut self,
        command: u8,
        buf: &[u8],
    ) -> Result<(), Nrf24Error<SPI::Error, DO::Error>> {
        let len = buf.len().min(MAX_PAYLOAD_LEN);
        self.buf[0] = command;
        self.buf[1..len + 1].copy_from_slice(&buf[..len]);
        self.spi_transfer(len + 1)
    }
}

impl<SPI, DO, DELAY> BeaconRadio for Nrf24Radio<SPI, DO, DELAY>
where
    SPI: SpiDevice,
    DO: OutputPin,
    DELAY: DelayNs,
{
    type Error = Nrf24Error<SPI::Error, DO::Error>;

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
        self.buf[0] = register | commands::W_REGISTER;
        self.buf[1] = value;
        self.spi_transfer(2)
    }

    /// Anything beyond 33 bytes (a command and a full payload) is ignored.
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let len = bytes.len().min(self.buf.len());
        self.buf[..len].copy_from_slice(&bytes[..len]);
        self.spi_transfer(len)
    }

    /// The nRF24L01 support 126 channels. The specified `frequency` is
    /// clamped to the range [0, 125].
    fn set_channel_frequency(&mut self, frequency: u8) -> Result<(), Self::Error> {
        self.write_register(registers::RF_CH, frequency.min(125))
    }

    /// The TX FIFO holds 32 bytes. Anything beyond that in `payload` is not sent,
    /// so a longer `payload` goes out truncated.
    fn load_payload(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
        self.write_register(registers::STATUS, IRQ_MASK)?;
        self.write_bytes(&[commands::FLUSH_RX])?;
        self.write_bytes(&[commands::FLUSH_TX])?;
        self.spi_write_buf(commands::W_TX_PAYLOAD, payload)?;
        self.write_register(registers::CONFIG, CONFIG_TX)
    }

    fn pulse_enable(&mut self, hold_ms: u32) -> Result<(), Self::Error> {
        self.ce_pin.set_high().map_err(Nrf24Error::Gpo)?;
        self.delay_impl.delay_ms(hold_ms);
        self.ce_pin.set_low().map_err(Nrf24Error::Gpo)
    }

    fn init(&mut self) -> Result<(), Self::Error> {
        self.ce_pin.set_low().map_err(Nrf24Error::Gpo)?;
        for (register, value) in INIT_SEQUENCE {
            self.write_register(register, value)?;
        }
        let address = access_address();
        self.spi_write_buf(registers::TX_ADDR | commands::W_REGISTER, &address)?;
        self.spi_write_buf(registers::RX_ADDR_P0 | commands::W_REGISTER, &address)
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        self.ce_pin.set_low().map_err(Nrf24Error::Gpo)?;
        self.write_register(registers::CONFIG, CONFIG_TX & !mnemonics::PWR_UP)
    }
}
