//! Channel hopping across the BLE primary advertising channels.

/// The radio channels (offsets in MHz from 2400 MHz) of the BLE advertising channels.
pub const BLE_CHANNEL: [u8; 3] = [2, 26, 80];

/// The BLE advertising channel indices matching each entry of [`BLE_CHANNEL`].
pub const LE_CHANNEL: [u8; 3] = [37, 38, 39];

/// A BLE advertising channel paired with the radio channel that carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdvertisingChannel {
    /// The BLE channel index (37, 38 or 39). This seeds the whitening.
    pub channel: u8,
    /// The radio channel (MHz above 2400 MHz).
    pub frequency: u8,
}

#[cfg(feature = "defmt")]
impl defmt::Format for AdvertisingChannel {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "channel {=u8} ({=u16} MHz)",
            self.channel,
            self.frequency as u16 + 2400u16
        )
    }
}

/// Cycles through the 3 advertising channels, one step per transmission.
///
/// The radio can only listen/talk on one channel at a time, so advertisements
/// are spread over successive transmissions instead of being sent on all 3 channels at once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChannelHopper {
    index: usize,
}

impl ChannelHopper {
    /// Create a hopper that starts on the channel at `index` (wrapped to [0, 2]).
    pub fn new(index: usize) -> Self {
        Self {
            index: index % BLE_CHANNEL.len(),
        }
    }

    /// Get the channel pair at the given `index` of [`LE_CHANNEL`] and [`BLE_CHANNEL`].
    ///
    /// Returns [`None`] if the `index` is out of range.
    pub fn get(index: usize) -> Option<AdvertisingChannel> {
        Some(AdvertisingChannel {
            channel: *LE_CHANNEL.get(index)?,
            frequency: *BLE_CHANNEL.get(index)?,
        })
    }

    /// Get the index of [`BLE_CHANNEL`] for the given radio `frequency`.
    ///
    /// Returns [`None`] if the given `frequency` is not in [`BLE_CHANNEL`].
    pub fn index_of(frequency: u8) -> Option<usize> {
        BLE_CHANNEL.iter().position(|ch| *ch == frequency)
    }

    /// The channel pair that the next call to [`ChannelHopper::advance()`] returns.
    pub fn current(&self) -> AdvertisingChannel {
        AdvertisingChannel {
            channel: LE_CHANNEL[self.index],
            frequency: BLE_CHANNEL[self.index],
        }
    }

    /// Return the current channel pair, then move to the next one (wrapping).
    pub fn advance(&mut self) -> AdvertisingChannel {
        let current = self.current();
        self.index = (self.index + 1) % BLE_CHANNEL.len();
        current
    }

    /// Go back to the first advertising channel.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}
