//! The XPT2046 sampler.
//!
//! The XPT2046 is an ADC in front of a resistive touch panel: commanded over
//! the serial bus, it converts one of several analog channels (the X and Y
//! position plates, the Z1/Z2 pressure dividers) into a 12-bit reading.
//!
//! Raw readings are noisy. The panel settles for a short time after the
//! channel multiplexer switches, so back-to-back conversions of the same
//! channel can disagree badly. [`Xpt2046::read_channel`] therefore performs
//! three conversions per fetch, discards the reading most divergent from its
//! neighbours and averages the surviving pair, which is a cheap single-pass
//! stand-in for a 3-element median filter.
//!
//! Touch presence comes in two tiers. Boards that wire the controller's
//! PENIRQ output get a plain GPIO level check; the rest fall back to
//! converting the Z1 pressure channel and comparing it against a threshold.

use core::fmt::Debug;

#[cfg(feature = "defmt")]
use defmt::Format;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::Error;
use crate::transport::Transport;

/// Re-exported from
/// [embedded_graphics](https://docs.rs/embedded-graphics/latest/embedded_graphics/index.html)
/// for convenience.
pub use embedded_graphics::geometry::Point;

/// Default pressure threshold for the Z1 fallback in [`Xpt2046::is_touched`].
///
/// The Z1 reading at which touch is considered asserted depends on the panel
/// resistance, so boards should measure their own value and override it with
/// [`Xpt2046::with_z1_threshold`]. This default works for common 2.8"/3.2"
/// panel modules.
pub const DEFAULT_Z1_THRESHOLD: u16 = 10;

// The control byte consists of one start bit (S), three channel select bits
// (A2-A0), one 12-bit/8-bit conversion select bit (MODE), one
// single-ended/differential select bit (SER/DFR) and two power-down select
// bits (PD1-PD0). See Tables 5-8 of the XPT2046 data sheet
// (<https://www.snapeda.com/parts/XPT2046/Xptek/datasheet/>).
//
// Position channels are measured differentially (SER/DFR = 0) because the
// differential conversion is the more accurate one, at 12-bit precision
// (MODE = 0). PD1-PD0 = 00 powers the ADC down between conversions while
// keeping PENIRQ enabled, so the presence line stays alive across fetches.

/// Selects the analog channel converted by one fetch.
///
/// The discriminant is the full control byte for the channel: start bit set,
/// channel select per Table 5, 12-bit differential conversion, power-down
/// mode `00` (PENIRQ stays enabled).
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// X-Position plate voltage.
    X = 0xD0,
    /// Y-Position plate voltage.
    Y = 0x90,
    /// Z1 pressure divider. Compared against a threshold, this gives a crude
    /// touch-pressure signal.
    Z1 = 0xB0,
    /// Z2 pressure divider.
    Z2 = 0xC0,
}

impl Channel {
    /// The control byte commanding a conversion of this channel.
    pub const fn command(self) -> u8 {
        self as u8
    }
}

/// Three-sample outlier rejection.
///
/// Of the three conversions, the one furthest from the other two is
/// overwritten by the third before the first two are averaged: if the first
/// two samples are not already the closest pair, whichever of them sits
/// further from the third is replaced by it. Samples are at most 12 bits, so
/// the sum cannot overflow.
fn filter_samples(mut samples: [u16; 3]) -> u16 {
    let d01 = samples[0].abs_diff(samples[1]);
    let d02 = samples[0].abs_diff(samples[2]);
    let d12 = samples[1].abs_diff(samples[2]);

    if d01 > d02 || d01 > d12 {
        let outlier = if d02 > d12 { 0 } else { 1 };
        samples[outlier] = samples[2];
    }

    (samples[0] + samples[1]) >> 1
}

/// The XPT2046 driver.
///
/// Generic over the bus [`Transport`] (bit-banged or hardware SPI), the
/// chip-select output and an optional PENIRQ input. The chip-select and
/// pen-interrupt pins must share one error type.
///
/// The driver is fully blocking: every fetch holds the chip selected and the
/// transport open for the whole three-conversion burst, so a transport shared
/// with other peripherals (a display controller, typically) never sees a torn
/// read.
#[derive(Debug)]
pub struct Xpt2046<T, Cs, Irq> {
    /// The bus transport.
    bus: T,
    /// Chip-select line, active low.
    cs: Cs,
    /// PENIRQ line, active low, when the board wires it.
    pen_irq: Option<Irq>,
    /// Z1 threshold for the pressure-based touch fallback.
    z1_threshold: u16,
}

impl<T, Cs, Irq, PinE> Xpt2046<T, Cs, Irq>
where
    T: Transport,
    Cs: OutputPin<Error = PinE>,
    Irq: InputPin<Error = PinE>,
    PinE: Debug,
{
    /// Creates the driver.
    ///
    /// The transport and pins come pre-configured from the HAL. Pass the
    /// PENIRQ pin when the board wires it; without it, touch detection falls
    /// back to converting the Z1 channel on every query.
    pub fn new(bus: T, cs: Cs, pen_irq: Option<Irq>) -> Self {
        Self {
            bus,
            cs,
            pen_irq,
            z1_threshold: DEFAULT_Z1_THRESHOLD,
        }
    }

    /// Overrides the Z1 touch threshold used when no PENIRQ pin is wired.
    pub fn with_z1_threshold(mut self, z1_threshold: u16) -> Self {
        self.z1_threshold = z1_threshold;
        self
    }

    /// One-time setup. Must be called before any other operation.
    ///
    /// Deasserts chip select so the controller idles until addressed, then
    /// makes a throwaway X-Position fetch: the XPT2046 only starts driving
    /// PENIRQ once it has seen a command with the power-down bits clear.
    pub fn init(&mut self) -> Result<(), Error<T::Error, PinE>> {
        self.cs.set_high().map_err(Error::Pin)?;
        let _ = self.read_channel(Channel::X)?;
        Ok(())
    }

    /// Returns whether a bus transfer is currently in flight.
    ///
    /// Presence and point queries short-circuit while this is true so they
    /// never race a transfer already on the wire.
    pub fn is_busy(&mut self) -> bool {
        self.bus.is_busy()
    }

    /// Returns whether the panel is currently touched.
    ///
    /// Reports not-touched while the bus is busy. With a PENIRQ pin this is a
    /// single GPIO read (asserted low); without one it converts the Z1
    /// pressure channel and compares it against the configured threshold.
    pub fn is_touched(&mut self) -> Result<bool, Error<T::Error, PinE>> {
        if self.bus.is_busy() {
            return Ok(false);
        }
        match &mut self.pen_irq {
            Some(pen_irq) => pen_irq.is_low().map_err(Error::Pin),
            None => Ok(self.read_channel(Channel::Z1)? >= self.z1_threshold),
        }
    }

    /// Returns the filtered raw touch position, or `None` when the panel is
    /// not being touched or the bus is busy.
    ///
    /// The presence check runs even when a PENIRQ pin is wired, so a touch
    /// that ended since the last query cannot hand out stale coordinates.
    /// When touch is asserted, the X channel is fetched first, then Y.
    pub fn get_raw_point(&mut self) -> Result<Option<Point>, Error<T::Error, PinE>> {
        if self.bus.is_busy() || !self.is_touched()? {
            return Ok(None);
        }
        let x = self.read_channel(Channel::X)?;
        let y = self.read_channel(Channel::Y)?;
        Ok(Some(Point::new(x.into(), y.into())))
    }

    /// Fetches one filtered 12-bit reading of `channel`.
    ///
    /// Asserts chip select and opens the transport for the whole burst, makes
    /// exactly three conversions and filters them down to one value with the
    /// outlier-rejection rule described at the module level. The chip is
    /// released on every exit path, including transfer failures. The filtered
    /// value only ever combines the three in-hand samples; nothing is re-read.
    pub fn read_channel(&mut self, channel: Channel) -> Result<u16, Error<T::Error, PinE>> {
        self.cs.set_low().map_err(Error::Pin)?;
        if let Err(e) = self.bus.open() {
            // The chip is already selected; let it go before reporting.
            self.cs.set_high().map_err(Error::Pin)?;
            return Err(Error::Bus(e));
        }

        let samples = self.sample_triple(channel);

        let closed = self.bus.close().map_err(Error::Bus);
        let deselected = self.cs.set_high().map_err(Error::Pin);
        let samples = samples?;
        closed?;
        deselected?;

        Ok(filter_samples(samples))
    }

    /// Runs three conversion cycles of `channel` back to back.
    ///
    /// Each cycle sends the control byte (its reply carries bits of the
    /// previous conversion and is dropped), then clocks out two continuation
    /// bytes carrying the left-justified 12-bit result: the first holds bits
    /// 11..4, the top nibble of the second holds bits 3..0.
    fn sample_triple(&mut self, channel: Channel) -> Result<[u16; 3], Error<T::Error, PinE>> {
        let mut samples = [0u16; 3];
        for sample in &mut samples {
            self.bus
                .transfer(channel.command().into())
                .map_err(Error::Bus)?;
            let high = self.bus.transfer(0).map_err(Error::Bus)?;
            let low = self.bus.transfer(0).map_err(Error::Bus)?;
            *sample = (u16::from(high) << 4) | (u16::from(low) >> 4);
        }
        Ok(samples)
    }

    /// Releases the transport and pins.
    pub fn release(self) -> (T, Cs, Option<Irq>) {
        (self.bus, self.cs, self.pen_irq)
    }
}
