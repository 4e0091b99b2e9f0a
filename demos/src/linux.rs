use anyhow::{anyhow, Context, Result};
use linux_embedded_hal::{
    gpio_cdev::{chips, Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};
use rf24beacon::radio::Nrf24Radio;

/// The beacon's radio as wired to a Linux board.
pub type LinuxRadio = Nrf24Radio<SpidevDevice, CdevPin, Delay>;

/// Where the nRF24L01 is connected.
#[derive(Debug, Clone, Copy)]
pub struct Wiring {
    /// The `N` in `/dev/gpiochipN`.
    pub gpio_chip: u8,
    pub spi_bus: u8,
    /// The SPI chip select (CSN) line.
    pub spi_cs: u8,
    /// The GPIO line connected to CE.
    pub ce_pin: u32,
}

impl Default for Wiring {
    /// SPI0 with CE0, and CE on GPIO22 of a Raspberry Pi.
    fn default() -> Self {
        Self {
            gpio_chip: 0,
            spi_bus: 0,
            spi_cs: 0,
            ce_pin: 22,
        }
    }
}

fn open_gpio_chip(number: u8) -> Result<Chip> {
    let suffix = number.to_string();
    chips()?
        .filter_map(|chip| chip.ok())
        .find(|chip| chip.path().to_string_lossy().ends_with(&suffix))
        .ok_or_else(|| anyhow!("/dev/gpiochip{number} is not available in this system"))
}

fn open_spi(bus: u8, cs: u8) -> Result<SpidevDevice> {
    let mut spi = SpidevDevice::open(format!("/dev/spidev{bus}.{cs}"))
        .with_context(|| format!("SPI bus {bus} with CS {cs} is not available in this system"))?;
    let options = SpidevOptions::new()
        .max_speed_hz(10_000_000)
        .mode(SpiModeFlags::SPI_MODE_0)
        .bits_per_word(8)
        .build();
    spi.configure(&options)?;
    Ok(spi)
}

/// Open the radio with the given `wiring`.
pub fn open_radio(wiring: Wiring) -> Result<LinuxRadio> {
    let mut gpio = open_gpio_chip(wiring.gpio_chip)?;
    let ce_line = gpio
        .get_line(wiring.ce_pin)
        .with_context(|| format!("GPIO{} is unavailable", wiring.ce_pin))?;
    let ce_handle = ce_line.request(LineRequestFlags::OUTPUT, 0, "rf24beacon-rs")?;
    let ce_pin = CdevPin::new(ce_handle)?;
    Ok(Nrf24Radio::new(
        ce_pin,
        open_spi(wiring.spi_bus, wiring.spi_cs)?,
        Delay,
    ))
}

/// Open the radio with the [`Wiring::default`] pins.
///
/// The Raspberry Pi 5 exposes its header on `/dev/gpiochip4`, so that is tried first.
pub fn default_radio() -> Result<LinuxRadio> {
    let wiring = Wiring::default();
    open_radio(Wiring {
        gpio_chip: 4,
        ..wiring
    })
    .or_else(|_| open_radio(wiring))
}
