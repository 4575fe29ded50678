//! Bus transports for the XPT2046.
//!
//! The XPT2046 speaks a plain full-duplex synchronous serial protocol (SPI
//! mode 0, MSB first, 8-bit words), and boards connect it one of two ways:
//! three spare GPIOs that the host toggles by hand, or a real SPI peripheral
//! that may be shared with other devices such as the display controller. The
//! [`Transport`] trait covers both so the sampling code in
//! [`driver`](crate::driver) does not care which one it is running on.
//!
//! `embedded-hal` does not expose enabling/disabling an SPI peripheral or
//! querying whether a transfer is in flight, so `Transport` carries those
//! operations itself. [`HardwareSpi`] bridges to any blocking
//! [`SpiBus`](embedded_hal::spi::SpiBus); platforms with a gateable or shared
//! peripheral can implement `Transport` directly and scope the peripheral to
//! one acquisition via [`Transport::open`] and [`Transport::close`].

use core::fmt::Debug;

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::spi::SpiBus;

/// One full-duplex serial connection to the touch controller.
///
/// A transport moves single bytes; it does not own the chip-select line.
/// Chip select and the open/close scope are driven by the sampler around each
/// multi-transfer burst so the whole burst holds the bus.
pub trait Transport {
    /// Transport error type.
    type Error: Debug;

    /// Acquires the bus peripheral ahead of a burst of transfers.
    ///
    /// On a shared bus this is the point to enable the peripheral; the
    /// sampler calls it once per fetch and pairs it with [`Self::close`] on
    /// every exit path, so other bus users are never starved mid-burst.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Releases the bus peripheral after a burst of transfers.
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Returns whether a transfer is currently in flight.
    ///
    /// Fully blocking transports are never busy by the time a caller can ask.
    fn is_busy(&mut self) -> bool;

    /// Performs one full-duplex 8-bit exchange.
    ///
    /// Only the low 8 bits of `word` are shifted out, MSB first; the returned
    /// byte is what the controller shifted in during the same eight clocks.
    fn transfer(&mut self, word: u16) -> Result<u8, Self::Error>;
}

/// Bit-banged transport over three GPIO lines.
///
/// Clocks each byte out by hand: for every bit, MSB first, the clock is
/// driven low, MOSI takes the bit, MISO is sampled, and the clock is driven
/// high. The clock is left low once the byte is done. Each call blocks until
/// the exchange completes, so this transport is never busy and has nothing to
/// open or close.
///
/// All three pins must share one error type.
#[derive(Debug)]
pub struct SoftwareSpi<Sck, Mosi, Miso> {
    sck: Sck,
    mosi: Mosi,
    miso: Miso,
}

impl<Sck, Mosi, Miso, E> SoftwareSpi<Sck, Mosi, Miso>
where
    Sck: OutputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Miso: InputPin<Error = E>,
{
    /// Creates the transport from already-configured pins: `sck` and `mosi`
    /// as push-pull outputs, `miso` as an input.
    pub fn new(sck: Sck, mosi: Mosi, miso: Miso) -> Self {
        Self { sck, mosi, miso }
    }

    /// Releases the pins.
    pub fn release(self) -> (Sck, Mosi, Miso) {
        (self.sck, self.mosi, self.miso)
    }
}

impl<Sck, Mosi, Miso, E> Transport for SoftwareSpi<Sck, Mosi, Miso>
where
    Sck: OutputPin<Error = E>,
    Mosi: OutputPin<Error = E>,
    Miso: InputPin<Error = E>,
    E: Debug,
{
    type Error = E;

    fn open(&mut self) -> Result<(), E> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), E> {
        Ok(())
    }

    fn is_busy(&mut self) -> bool {
        false
    }

    fn transfer(&mut self, word: u16) -> Result<u8, E> {
        let byte = word as u8;
        let mut result = 0;

        let mut mask = 0x80u8;
        while mask != 0 {
            self.sck.set_low()?;
            self.mosi.set_state(PinState::from(byte & mask != 0))?;
            // The controller drives MISO on the falling edge, so sample
            // before clocking back high.
            if self.miso.is_high()? {
                result |= mask;
            }
            self.sck.set_high()?;
            mask >>= 1;
        }
        self.sck.set_low()?;

        Ok(result)
    }
}

/// Transport backed by a blocking SPI peripheral.
///
/// The caller configures the peripheral for SPI mode 0, MSB-first bit order,
/// 8-bit words and a clock the XPT2046 can follow (its ADC needs settling
/// time; 2.5 MHz or slower is safe). A blocking [`SpiBus`] is always powered
/// and owned by this driver between transfers, so [`Transport::open`] is a
/// no-op and [`Transport::close`] only flushes, guaranteeing the last word
/// has left the shift register before the sampler deasserts chip select.
#[derive(Debug)]
pub struct HardwareSpi<Spi> {
    spi: Spi,
}

impl<Spi> HardwareSpi<Spi>
where
    Spi: SpiBus<u8>,
{
    /// Creates the transport from a configured SPI bus.
    pub fn new(spi: Spi) -> Self {
        Self { spi }
    }

    /// Releases the SPI bus.
    pub fn release(self) -> Spi {
        self.spi
    }
}

impl<Spi> Transport for HardwareSpi<Spi>
where
    Spi: SpiBus<u8>,
{
    type Error = Spi::Error;

    fn open(&mut self) -> Result<(), Spi::Error> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), Spi::Error> {
        self.spi.flush()
    }

    fn is_busy(&mut self) -> bool {
        false
    }

    fn transfer(&mut self, word: u16) -> Result<u8, Spi::Error> {
        let mut rx = [0];
        self.spi.transfer(&mut rx, &[word as u8])?;
        Ok(rx[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};

    fn clock_expectations() -> Vec<PinTransaction> {
        let mut sck = Vec::new();
        for _ in 0..8 {
            sck.push(PinTransaction::set(PinState::Low));
            sck.push(PinTransaction::set(PinState::High));
        }
        // Idles low after the final bit.
        sck.push(PinTransaction::set(PinState::Low));
        sck
    }

    fn bit_states(byte: u8) -> impl Iterator<Item = PinState> {
        (0..8).map(move |i| {
            if byte & (0x80 >> i) != 0 {
                PinState::High
            } else {
                PinState::Low
            }
        })
    }

    #[test]
    fn software_transfer_shifts_msb_first_and_samples_full_duplex() {
        let sck = PinMock::new(&clock_expectations());
        let mosi = PinMock::new(
            &bit_states(0x90)
                .map(PinTransaction::set)
                .collect::<Vec<_>>(),
        );
        let miso = PinMock::new(
            &bit_states(0xA5)
                .map(PinTransaction::get)
                .collect::<Vec<_>>(),
        );

        let mut bus = SoftwareSpi::new(sck, mosi, miso);
        // High byte of the word must be ignored.
        let result = bus.transfer(0xAB90).unwrap();
        assert_eq!(result, 0xA5);

        let (mut sck, mut mosi, mut miso) = bus.release();
        sck.done();
        mosi.done();
        miso.done();
    }

    #[test]
    fn software_transport_is_never_busy() {
        let mut bus = SoftwareSpi::new(PinMock::new(&[]), PinMock::new(&[]), PinMock::new(&[]));
        assert!(!bus.is_busy());
        bus.open().unwrap();
        bus.close().unwrap();

        let (mut sck, mut mosi, mut miso) = bus.release();
        sck.done();
        mosi.done();
        miso.done();
    }

    #[test]
    fn hardware_transfer_sends_low_byte_only() {
        let spi = SpiMock::new(&[SpiTransaction::transfer(vec![0xD0], vec![0x42])]);

        let mut bus = HardwareSpi::new(spi);
        assert_eq!(bus.transfer(0xFFD0).unwrap(), 0x42);

        let mut spi = bus.release();
        spi.done();
    }

    #[test]
    fn hardware_close_flushes_the_bus() {
        let spi = SpiMock::new(&[SpiTransaction::flush()]);

        let mut bus = HardwareSpi::new(spi);
        bus.open().unwrap();
        assert!(!bus.is_busy());
        bus.close().unwrap();

        let mut spi = bus.release();
        spi.done();
    }
}
