//! Programmer trait definitions

/// One of the ICSP signal lines
///
/// Ground is the implicit fourth connection and is not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// PGC, the programming clock (always driven by the programmer)
    Clock,
    /// PGD, the bidirectional programming data line
    Data,
    /// MCLR, the reset line that selects programming mode
    Mclr,
}

/// Direction of a signal line, seen from the programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Line is released and sampled
    Input,
    /// Line is driven
    Output,
}

/// GPIO capability used to bit-bang the ICSP protocol
///
/// Every call must take effect before it returns: the engine relies on
/// strict ordering between pin changes and delays. Implementations should
/// not buffer or reorder writes.
///
/// Pin operations are infallible at this level. Backends that can fail
/// (e.g. a GPIO ioctl) log the failure; a corrupted transfer is caught
/// later by readback verification.
pub trait IcspPins {
    /// Configure a line as input or output
    fn set_direction(&mut self, pin: Pin, direction: Direction);

    /// Drive a line high (`true`) or low (`false`)
    fn write(&mut self, pin: Pin, high: bool);

    /// Sample a line
    fn read(&mut self, pin: Pin) -> bool;

    /// Busy-wait or sleep for the given number of microseconds
    fn delay_us(&mut self, us: u32);
}

impl<T: IcspPins + ?Sized> IcspPins for &mut T {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        (**self).set_direction(pin, direction)
    }

    fn write(&mut self, pin: Pin, high: bool) {
        (**self).write(pin, high)
    }

    fn read(&mut self, pin: Pin) -> bool {
        (**self).read(pin)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}

#[cfg(feature = "alloc")]
impl<T: IcspPins + ?Sized> IcspPins for alloc::boxed::Box<T> {
    fn set_direction(&mut self, pin: Pin, direction: Direction) {
        (**self).set_direction(pin, direction)
    }

    fn write(&mut self, pin: Pin, high: bool) {
        (**self).write(pin, high)
    }

    fn read(&mut self, pin: Pin) -> bool {
        (**self).read(pin)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }
}
