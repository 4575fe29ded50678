//! Error definition for the crate

#[cfg(feature = "defmt")]
use defmt::Format;

/// Driver error.
///
/// Wraps the error of whichever transport is in use and the error of the
/// chip-select / pen-interrupt pins. Note that a noisy or disconnected bus is
/// *not* an error at this level: the controller cannot signal it, so bad data
/// is left to the three-sample filter upstream.
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, PartialEq, Eq)]
pub enum Error<BusE, PinE> {
    /// Bus transport error
    Bus(BusE),
    /// Chip-select or pen-interrupt pin error
    Pin(PinE),
}
