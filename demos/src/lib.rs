//! Board glue shared by the beacon demos.
#[cfg(target_os = "linux")]
pub mod linux;

use anyhow::{anyhow, Error};
use core::fmt::Debug;

/// Wrap errors that only implement [`Debug`] (like the radio's) for `?`.
pub fn debug_err(err: impl Debug) -> Error {
    anyhow!("{err:?}")
}
