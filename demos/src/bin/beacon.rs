//! This demo uses the nRF24L01 as a BLE beacon that advertises a counter.
//!
//! Usage: `beacon [NAME] [COUNT]`
//!
//! Scan with any BLE app (nRF Connect, LightBlue, etc.) to see the
//! device name and the counter as manufacturer specific data.
use anyhow::Result;
use embedded_hal::delay::DelayNs;
use linux_embedded_hal::Delay;
use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

use rf24beacon::{address_from_seed, Beacon, BeaconConfig};
use rf24beacon_demos::{
    debug_err,
    linux::{default_radio, LinuxRadio},
};

/// Advertise `name` with an incrementing counter `count` times.
fn advertise(beacon: &mut Beacon<LinuxRadio>, name: &str, count: u16) -> Result<()> {
    beacon.begin().map_err(debug_err)?;

    let available = beacon.set_name(name)?;
    let address = beacon.frame().address();
    println!(
        "Advertising as \"{name}\" from {}",
        address.map(|b| format!("{b:02X}")).join(":")
    );
    println!("Number of bytes remaining in advertisement payload: {available}");

    let width = (available as usize).min(2);
    for counter in 0..count {
        let data = counter.to_le_bytes();
        let channel = beacon.send_data(&data[..width]).map_err(debug_err)?;
        println!(
            "Sent {counter} on channel {} ({} MHz)",
            channel.channel,
            2400 + channel.frequency as u16
        );
        Delay.delay_ms(500);
    }

    beacon.end().map_err(debug_err)
}

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let name = args.next().unwrap_or_else(|| "nRF24".to_string());
    let count = args
        .next()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(50);

    // any changing value will do as a seed for a random address
    let seed = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let config = BeaconConfig::default().with_address(address_from_seed(seed));
    let mut beacon = Beacon::new(default_radio()?, config);
    advertise(&mut beacon, &name, count)
}
