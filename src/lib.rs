#![doc(html_root_url = "https://docs.rs/xpt2046-touch")]
#![deny(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    unused_variables,
    unreachable_code,
    unused_comparisons,
    unused_must_use
)]
#![cfg_attr(not(test), no_std)]

//! A platform agnostic Rust driver for the XPT2046 resistive touch screen
//! controller, based on the
//! [`embedded-hal`](https://github.com/rust-embedded/embedded-hal) traits.
//!
//! The controller is reached over either a bit-banged serial connection on
//! three GPIOs ([`SoftwareSpi`]) or a hardware SPI peripheral
//! ([`HardwareSpi`]); both implement the [`Transport`] trait the sampler is
//! generic over, so the choice is made once at construction.
//!
//! The heart of the driver is the fetch in [`Xpt2046::read_channel`]: every
//! reading is the outlier-filtered combination of three back-to-back
//! conversions, taken with the chip selected and the bus held for the whole
//! burst. On top of that sit [`Xpt2046::is_touched`], which prefers the
//! controller's PENIRQ line and falls back to a Z1 pressure reading, and
//! [`Xpt2046::get_raw_point`], which returns the raw (x, y) position of a
//! confirmed touch.
//!
//! Raw positions are in controller units. Mapping them onto display pixels
//! (calibration) and debouncing across polls are left to the caller.

pub mod driver;
pub mod error;
pub mod transport;

pub use crate::driver::{Channel, Point, Xpt2046, DEFAULT_Z1_THRESHOLD};
pub use crate::error::Error;
pub use crate::transport::{HardwareSpi, SoftwareSpi, Transport};
