use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

use crate::{
    address::DEFAULT_ADDRESS,
    channels::{AdvertisingChannel, ChannelHopper, BLE_CHANNEL},
    encoder::encode,
    frame::{AdvertisingFrame, FrameError, MAX_PAYLOAD_LEN, MIN_PAYLOAD_CAPACITY},
    radio::BeaconRadio,
};

#[cfg(feature = "std")]
extern crate std;

/// An object to configure a [`Beacon`].
///
/// This struct follows a builder pattern. Since all fields are private, users should
/// start with the [`BeaconConfig::default`] constructor, then mutate the object accordingly.
/// ```
/// use rf24beacon::{address_from_seed, BeaconConfig};
///
/// let config = BeaconConfig::default()
///     .with_address(address_from_seed(0x2024_0611))
///     .with_tx_hold_ms(20);
/// assert_eq!(config.tx_hold_ms(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeaconConfig {
    payload_capacity: u8,
    tx_hold_ms: u32,
    address: [u8; 6],
    first_channel: u8,
}

impl Default for BeaconConfig {
    /// Instantiate a [`BeaconConfig`] object with library defaults.
    ///
    /// | feature | default value |
    /// |--------:|:--------------|
    /// | [`BeaconConfig::payload_capacity()`] | `32` |
    /// | [`BeaconConfig::tx_hold_ms()`] | `50` |
    /// | [`BeaconConfig::address()`] | [`DEFAULT_ADDRESS`] |
    /// | [`BeaconConfig::first_channel()`] | `0` (BLE channel 37) |
    fn default() -> Self {
        Self {
            payload_capacity: MAX_PAYLOAD_LEN as u8,
            tx_hold_ms: 50,
            address: DEFAULT_ADDRESS,
            first_channel: 0,
        }
    }
}

impl BeaconConfig {
    /// The maximum number of bytes (including the CRC) in each transmitted packet.
    pub const fn payload_capacity(&self) -> u8 {
        self.payload_capacity
    }

    /// Set the maximum packet size.
    ///
    /// The given `capacity` is clamped to the range [18, 32].
    pub fn with_payload_capacity(self, capacity: u8) -> Self {
        Self {
            payload_capacity: capacity.clamp(MIN_PAYLOAD_CAPACITY, MAX_PAYLOAD_LEN as u8),
            ..self
        }
    }

    /// How long (in milliseconds) the transmit-enable signal is held for each packet.
    pub const fn tx_hold_ms(&self) -> u32 {
        self.tx_hold_ms
    }

    /// Set the transmit-enable hold duration (in milliseconds).
    pub fn with_tx_hold_ms(self, hold_ms: u32) -> Self {
        Self {
            tx_hold_ms: hold_ms,
            ..self
        }
    }

    /// The device address (most significant byte first) used by [`Beacon::begin()`].
    pub const fn address(&self) -> [u8; 6] {
        self.address
    }

    /// Set the device address (most significant byte first).
    ///
    /// See [`address_from_seed()`](fn@crate::address_from_seed) to
    /// derive a random address.
    pub fn with_address(self, address: [u8; 6]) -> Self {
        Self { address, ..self }
    }

    /// The index of [`BLE_CHANNEL`] used for the first transmission.
    pub const fn first_channel(&self) -> u8 {
        self.first_channel
    }

    /// Set the index of [`BLE_CHANNEL`] used for the first transmission.
    ///
    /// The given `index` wraps to the range [0, 2].
    pub fn with_first_channel(self, index: u8) -> Self {
        Self {
            first_channel: index % BLE_CHANNEL.len() as u8,
            ..self
        }
    }
}

/// Errors reported by [`Beacon::send_data()`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BeaconError<E> {
    /// The data was declined by the frame. Nothing was transmitted.
    Frame(FrameError),
    /// The radio failed while transmitting.
    Radio(E),
}

impl<E> From<FrameError> for BeaconError<E> {
    fn from(value: FrameError) -> Self {
        BeaconError::Frame(value)
    }
}

impl<E: Debug> Display for BeaconError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            BeaconError::Frame(err) => write!(f, "frame error: {err}"),
            BeaconError::Radio(err) => write!(f, "radio error: {err:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E: Debug> std::error::Error for BeaconError<E> {}

/// A BLE advertising beacon driven by a [`BeaconRadio`].
///
/// ```ignore
/// use rf24beacon::{radio::Nrf24Radio, Beacon, BeaconConfig};
///
/// let radio = Nrf24Radio::new(ce_pin, spi_device, delay_impl);
/// let mut beacon = Beacon::new(radio, BeaconConfig::default());
/// beacon.begin()?;
/// let available = beacon.set_name("nRF24")?;
/// beacon.send_data(&[0x01, 0x02])?;
/// ```
pub struct Beacon<R> {
    radio: R,
    config: BeaconConfig,
    frame: AdvertisingFrame,
    hopper: ChannelHopper,
    packet: [u8; MAX_PAYLOAD_LEN],
    packet_len: usize,
}

impl<R: BeaconRadio> Beacon<R> {
    /// Create a beacon that transmits with the given `radio`.
    ///
    /// The radio is not touched until [`Beacon::begin()`].
    pub fn new(radio: R, config: BeaconConfig) -> Self {
        let mut frame = AdvertisingFrame::new(config.payload_capacity());
        frame.set_address(config.address());
        Self {
            radio,
            config,
            frame,
            hopper: ChannelHopper::new(config.first_channel() as usize),
            packet: [0u8; MAX_PAYLOAD_LEN],
            packet_len: 0,
        }
    }

    /// Configure the radio and start a new session with the configured address.
    pub fn begin(&mut self) -> Result<(), R::Error> {
        self.radio.init()?;
        self.restart();
        Ok(())
    }

    /// Forget the session state and power the radio down.
    ///
    /// The device address reverts to [`BeaconConfig::address()`].
    pub fn end(&mut self) -> Result<(), R::Error> {
        self.restart();
        self.radio.power_down()
    }

    fn restart(&mut self) {
        self.frame = AdvertisingFrame::new(self.config.payload_capacity());
        self.frame.set_address(self.config.address());
        self.hopper = ChannelHopper::new(self.config.first_channel() as usize);
        self.packet = [0u8; MAX_PAYLOAD_LEN];
        self.packet_len = 0;
    }

    /// The configuration used by this beacon.
    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// The advertising frame that will be sent by the next transmission.
    pub fn frame(&self) -> &AdvertisingFrame {
        &self.frame
    }

    /// Access the radio for operations beyond the beacon's scope.
    pub fn radio(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Release the radio.
    pub fn free(self) -> R {
        self.radio
    }

    /// The encoded bytes of the latest transmission (empty before any transmission).
    pub fn last_packet(&self) -> &[u8] {
        &self.packet[..self.packet_len]
    }

    /// The channel that the next transmission will use.
    pub fn next_channel(&self) -> AdvertisingChannel {
        self.hopper.current()
    }

    /// Set the device address (most significant byte first) for this session.
    pub fn set_address(&mut self, address: [u8; 6]) {
        self.frame.set_address(address);
    }

    /// Set the device name. See [`AdvertisingFrame::set_name()`].
    ///
    /// Returns the number of bytes available for data.
    pub fn set_name(&mut self, name: &str) -> Result<u8, FrameError> {
        self.frame.set_name(name)
    }

    /// Set the data for following transmissions. See [`AdvertisingFrame::set_data()`].
    pub fn set_data(&mut self, data: &[u8]) -> Result<(), FrameError> {
        self.frame.set_data(data)
    }

    /// Encode the current frame and transmit it on the next advertising channel.
    ///
    /// This blocks for [`BeaconConfig::tx_hold_ms()`].
    /// Returns the channel that was used.
    pub fn transmit_once(&mut self) -> Result<AdvertisingChannel, R::Error> {
        let raw = self.frame.finalize();
        let len = raw.len();
        self.packet[..len].copy_from_slice(raw);
        self.packet_len = len;

        let channel = self.hopper.advance();

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Before encoding ({=usize}) on {}: {=[u8]:x}",
            len,
            channel,
            &self.packet[..len]
        );

        encode(&mut self.packet[..len], channel.channel);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "After encoding ({=usize}): {=[u8]:x}",
            len,
            &self.packet[..len]
        );

        self.radio.set_channel_frequency(channel.frequency)?;
        self.radio.load_payload(&self.packet[..len])?;
        self.radio.pulse_enable(self.config.tx_hold_ms())?;
        Ok(channel)
    }

    /// Set the `data` and transmit it once.
    ///
    /// If the `data` is declined by the frame, then nothing is transmitted.
    pub fn send_data(&mut self, data: &[u8]) -> Result<AdvertisingChannel, BeaconError<R::Error>> {
        if let Err(err) = self.frame.set_data(data) {
            #[cfg(feature = "defmt")]
            defmt::warn!("Declined {=usize} bytes of data: {}", data.len(), err);
            return Err(err.into());
        }
        self.transmit_once().map_err(BeaconError::Radio)
    }
}

/////////////////////////////////////////////////////////////////////////////////
/// unit tests
#[cfg(test)]
mod test {
    extern crate std;
    use super::{Beacon, BeaconConfig, BeaconError};
    use crate::{
        address::DEFAULT_ADDRESS,
        channels::AdvertisingChannel,
        encoder::decode,
        frame::FrameError,
        radio::{commands, registers, BeaconRadio},
        spi_test_expects,
        test::{mk_radio, RadioEvent, RecordingRadio},
    };
    use embedded_hal_mock::eh1::{
        digital::{State, Transaction as PinTransaction},
        spi::Transaction as SpiTransaction,
    };
    use std::vec;

    /// "Tag" with `[1, 2]` from [`DEFAULT_ADDRESS`], encoded for channel 37.
    const ENCODED_37: [u8; 23] = [
        0xF3, 0x03, 0x3F, 0x14, 0x5A, 0x47, 0xA2, 0x8D, 0xEE, 0x0C, 0x28, 0x32, 0x79, 0xC4, 0x99,
        0x21, 0xA2, 0x68, 0x55, 0x4B, 0x8E, 0xA7, 0xF1,
    ];

    fn mk_beacon() -> Beacon<RecordingRadio> {
        Beacon::new(RecordingRadio::default(), BeaconConfig::default())
    }

    #[test]
    fn config() {
        let config = BeaconConfig::default();
        assert_eq!(config.payload_capacity(), 32);
        assert_eq!(config.tx_hold_ms(), 50);
        assert_eq!(config.address(), DEFAULT_ADDRESS);
        assert_eq!(config.first_channel(), 0);

        let config = config
            .with_payload_capacity(4)
            .with_tx_hold_ms(5)
            .with_address([1; 6])
            .with_first_channel(4);
        assert_eq!(config.payload_capacity(), 18);
        assert_eq!(config.tx_hold_ms(), 5);
        assert_eq!(config.address(), [1; 6]);
        assert_eq!(config.first_channel(), 1);
        assert_eq!(config.with_payload_capacity(64).payload_capacity(), 32);
    }

    #[test]
    fn send_data() {
        let mut beacon = mk_beacon();
        assert_eq!(beacon.set_name("Tag"), Ok(11));
        let channel = beacon.send_data(&[0x01, 0x02]).unwrap();
        assert_eq!(
            channel,
            AdvertisingChannel {
                channel: 37,
                frequency: 2
            }
        );
        assert_eq!(beacon.frame().current_length(), 18);
        assert_eq!(beacon.last_packet(), ENCODED_37);
        assert_eq!(
            beacon.radio().events,
            vec![
                RadioEvent::Frequency(2),
                RadioEvent::Payload(ENCODED_37.to_vec()),
                RadioEvent::Pulse(50),
            ]
        );

        // the receiver's view: first byte is the whitened, reversed header
        let mut received = ENCODED_37;
        assert!(decode(&mut received, 37));
        assert_eq!(received[0], 0x42);
        assert_eq!(received[..20], *beacon.frame().as_bytes());
    }

    #[test]
    fn hops_between_transmissions() {
        let mut beacon = mk_beacon();
        beacon.set_name("hop").unwrap();
        let mut frequencies = vec![];
        for (i, expected) in [37u8, 38, 39, 37].into_iter().enumerate() {
            assert_eq!(beacon.next_channel().channel, expected);
            let channel = beacon.send_data(&[i as u8]).unwrap();
            assert_eq!(channel.channel, expected);
            frequencies.push(channel.frequency);

            let mut received = beacon.last_packet().to_vec();
            assert!(decode(&mut received, expected));
            assert_eq!(received[received.len() - 4], i as u8);
        }
        assert_eq!(frequencies, vec![2, 26, 80, 2]);
        let pulses = beacon
            .radio()
            .events
            .iter()
            .filter(|e| matches!(e, RadioEvent::Pulse(50)))
            .count();
        assert_eq!(pulses, 4);
    }

    #[test]
    fn declined_data() {
        let mut beacon = mk_beacon();
        assert_eq!(
            beacon.send_data(&[1]),
            Err(BeaconError::Frame(FrameError::NameRequired))
        );

        assert_eq!(beacon.set_name("Tag"), Ok(11));
        beacon.set_data(&[7; 11]).unwrap();
        let before = beacon.frame().as_bytes().to_vec();
        assert_eq!(
            beacon.send_data(&[0; 12]),
            Err(BeaconError::Frame(FrameError::CapacityExceeded {
                requested: 12,
                available: 11
            }))
        );
        assert_eq!(beacon.frame().as_bytes(), before.as_slice());
        assert!(beacon.radio().events.is_empty());
        assert!(beacon.last_packet().is_empty());
        assert_eq!(beacon.next_channel().channel, 37);
    }

    #[test]
    fn radio_errors_propagate() {
        let mut beacon = mk_beacon();
        beacon.radio().fail = true;
        beacon.set_name("").unwrap();
        assert_eq!(
            beacon.send_data(&[]),
            Err(BeaconError::Radio("bus error"))
        );
    }

    #[test]
    fn raw_radio_access() {
        let mut beacon = mk_beacon();
        beacon.set_name("raw").unwrap();
        beacon.send_data(&[9]).unwrap();
        beacon.radio().events.clear();

        // tweak the radio between transmissions without touching the frame
        beacon.radio().write_register(registers::RF_SETUP, 0).unwrap();
        beacon.radio().write_bytes(&[commands::FLUSH_TX]).unwrap();
        assert_eq!(
            beacon.radio().events,
            vec![
                RadioEvent::Register(registers::RF_SETUP, 0),
                RadioEvent::Bytes(vec![commands::FLUSH_TX]),
            ]
        );
        assert_eq!(beacon.frame().data(), Some([9u8].as_slice()));
        assert_eq!(beacon.next_channel().channel, 38);

        // the controller itself only uses the transmit primitives
        beacon.radio().events.clear();
        beacon.send_data(&[10]).unwrap();
        assert!(beacon
            .radio()
            .events
            .iter()
            .all(|e| !matches!(e, RadioEvent::Register(..) | RadioEvent::Bytes(_))));
    }

    #[test]
    fn transmit_without_data() {
        let mut beacon = mk_beacon();
        beacon.transmit_once().unwrap();
        let mut received = beacon.last_packet().to_vec();
        assert_eq!(received.len(), 14);
        assert!(decode(&mut received, 37));
        assert_eq!(received[..11], [0x42, 9, 0xAB, 0x89, 0x67, 0x45, 0x23, 0x01, 2, 1, 5]);
    }

    #[test]
    fn begin_and_end() {
        let config = BeaconConfig::default()
            .with_address([0xC0, 0, 0, 0, 0, 1])
            .with_tx_hold_ms(1)
            .with_first_channel(2);
        let mut beacon = Beacon::new(RecordingRadio::default(), config);
        beacon.begin().unwrap();
        beacon.set_address([0xC0, 0, 0, 0, 0, 2]);
        beacon.set_name("a").unwrap();
        assert_eq!(beacon.send_data(&[]).unwrap().channel, 39);
        beacon.end().unwrap();

        assert_eq!(beacon.frame().address(), [0xC0, 0, 0, 0, 0, 1]);
        assert_eq!(beacon.frame().name(), None);
        assert!(beacon.last_packet().is_empty());
        assert_eq!(beacon.next_channel().channel, 39);
        let radio = beacon.free();
        assert_eq!(radio.events.first(), Some(&RadioEvent::Init));
        assert_eq!(radio.events.last(), Some(&RadioEvent::PowerDown));
        assert!(radio.events.contains(&RadioEvent::Pulse(1)));
    }

    const MASK_IRQ: u8 = 0x70;
    const CONFIG_TX: u8 = 0x12;

    #[test]
    fn send_with_nrf24() {
        let mut payload = vec![commands::W_TX_PAYLOAD];
        payload.extend_from_slice(&ENCODED_37);
        let mut response = vec![0u8; payload.len()];
        response[0] = 0xE;

        let spi_expectations = spi_test_expects![
            (vec![registers::RF_CH | commands::W_REGISTER, 2], vec![0xEu8, 0]),
            (vec![registers::STATUS | commands::W_REGISTER, MASK_IRQ], vec![0xEu8, 0]),
            (vec![commands::FLUSH_RX], vec![0xEu8]),
            (vec![commands::FLUSH_TX], vec![0xEu8]),
            (payload, response),
            (vec![registers::CONFIG | commands::W_REGISTER, CONFIG_TX], vec![0xEu8, 0]),
        ];
        let ce_expectations = [
            PinTransaction::set(State::High),
            PinTransaction::set(State::Low),
        ];
        let mocks = mk_radio(&ce_expectations, &spi_expectations);
        let (radio, mut spi, mut ce_pin) = (mocks.0, mocks.1, mocks.2);

        let mut beacon = Beacon::new(radio, BeaconConfig::default());
        beacon.set_name("Tag").unwrap();
        beacon.send_data(&[0x01, 0x02]).unwrap();
        spi.done();
        ce_pin.done();
    }
}
