#![no_std]
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/nRF24/rf24-rs/main/docs/src/images/logo-square.png"
)]
#![doc(html_favicon_url = "https://github.com/nRF24/rf24-rs/raw/main/docs/src/images/favicon.ico")]
#![doc = include_str!("../README.md")]
//! ## Packet layout
//!
//! Each transmission is a complete BLE advertising channel packet (minus the
//! preamble and access address, which the radio emits by itself):
//!
//! ```text
//! [header][length][address x 6][flags x 3][name AD][data AD][CRC x 3]
//! ```
//!
//! The whole packet must fit in the radio's 32 byte payload, so
//!
//! ```text
//! 32 - 2 (header, length) - 6 (address) - 3 (flags) - 2 (name AD) - 2 (data AD) - 3 (CRC) = 14
//! ```
//!
//! bytes are shared by the device name and the data.
//! [`AdvertisingFrame::set_name()`] reports how many of them are left for data.
//!
//! ## Limitations
//!
//! 1. The radio can only use one channel at a time. Each transmission uses the next
//!    of BLE's 3 advertising channels (see [`ChannelHopper`]) instead of all 3 at once.
//! 2. Only non-connectable advertisements are supported. There is no scan response,
//!    no connection and no security.
//! 3. CRC, whitening and bit order are done in software by [`encoder::encode()`]
//!    because the nRF24L01 cannot generate a 3 byte CRC nor whiten data.

mod address;
pub use address::{address_from_seed, DEFAULT_ADDRESS};

mod beacon;
pub use beacon::{Beacon, BeaconConfig, BeaconError};

mod channels;
pub use channels::{AdvertisingChannel, ChannelHopper, BLE_CHANNEL, LE_CHANNEL};

pub mod data_manipulation;
pub mod encoder;

mod frame;
pub use frame::{
    AdvertisingFrame, FrameError, PduHeader, AD_TYPE_MANUFACTURER_DATA, AD_TYPE_SHORT_NAME,
    ADV_NONCONN_IND, FLAGS_AD, MAX_PAYLOAD_LEN, MIN_PAYLOAD_CAPACITY,
};

pub mod radio;

#[cfg(test)]
mod test {
    extern crate std;
    use crate::radio::{BeaconRadio, Nrf24Radio};
    use embedded_hal_mock::eh1::{
        delay::NoopDelay,
        digital::{Mock as PinMock, Transaction as PinTransaction},
        spi::{Mock as SpiMock, Transaction as SpiTransaction},
    };
    use std::vec::Vec;

    /// Takes an indefinite repetition of a tuple of 2 vectors: `(expected_data, response_data)`
    /// and generates an array of `SpiTransaction`s.
    ///
    /// NOTE: This macro is only used to generate code in unit tests (for this crate only).
    #[macro_export]
    macro_rules! spi_test_expects {
        ($( ($expected:expr , $response:expr $(,)? ) , ) + ) => {
            [
                $(
                    SpiTransaction::transaction_start(),
                    SpiTransaction::transfer_in_place($expected, $response),
                    SpiTransaction::transaction_end(),
                )*
            ]
        }
    }

    /// A tuple struct to encapsulate objects used to mock [`Nrf24Radio`],
    pub struct MockRadio(
        pub Nrf24Radio<SpiMock<u8>, PinMock, NoopDelay>,
        pub SpiMock<u8>,
        pub PinMock,
    );

    /// Create a mock objects using the given expectations.
    pub fn mk_radio(
        ce_expectations: &[PinTransaction],
        spi_expectations: &[SpiTransaction<u8>],
    ) -> MockRadio {
        let spi = SpiMock::new(spi_expectations);
        let ce_pin = PinMock::new(ce_expectations);
        let delay_impl = NoopDelay;
        let radio = Nrf24Radio::new(ce_pin.clone(), spi.clone(), delay_impl);
        MockRadio(radio, spi, ce_pin)
    }

    /// A call made to a [`RecordingRadio`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum RadioEvent {
        Init,
        Register(u8, u8),
        Bytes(Vec<u8>),
        Frequency(u8),
        Payload(Vec<u8>),
        Pulse(u32),
        PowerDown,
    }

    /// A [`BeaconRadio`] that records every call instead of touching hardware.
    #[derive(Debug, Default)]
    pub struct RecordingRadio {
        pub events: Vec<RadioEvent>,
        /// Fail every payload load with a "bus error".
        pub fail: bool,
    }

    impl BeaconRadio for RecordingRadio {
        type Error = &'static str;

        fn write_register(&mut self, register: u8, value: u8) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::Register(register, value));
            Ok(())
        }

        fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::Bytes(bytes.to_vec()));
            Ok(())
        }

        fn set_channel_frequency(&mut self, frequency: u8) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::Frequency(frequency));
            Ok(())
        }

        fn load_payload(&mut self, payload: &[u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err("bus error");
            }
            self.events.push(RadioEvent::Payload(payload.to_vec()));
            Ok(())
        }

        fn pulse_enable(&mut self, hold_ms: u32) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::Pulse(hold_ms));
            Ok(())
        }

        fn init(&mut self) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::Init);
            Ok(())
        }

        fn power_down(&mut self) -> Result<(), Self::Error> {
            self.events.push(RadioEvent::PowerDown);
            Ok(())
        }
    }
}
