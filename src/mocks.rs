use crate::can::MCP2515;
use crate::io::CanIo;
use core::cell::RefCell;
use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use embedded_time::clock::Error;
use embedded_time::duration::Duration;
use embedded_time::fixed_point::FixedPoint;
use embedded_time::fraction::Fraction;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use mockall::mock;

/// Clock returning a scripted list of instants (µs), fails once the list is exhausted
#[derive(Debug, PartialEq, Eq)]
pub struct TestClock {
    pub next_instants: RefCell<Vec<u64>>,
}

impl TestClock {
    pub fn new(next_instants: Vec<u64>) -> Self {
        Self {
            next_instants: RefCell::new(next_instants),
        }
    }
}

impl Clock for TestClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        if self.next_instants.borrow().is_empty() {
            return Err(Error::Unspecified);
        }

        Ok(Instant::new(self.next_instants.borrow_mut().remove(0)))
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}

/// One chip select cycle: all bytes sent on MOSI, returns the bytes received on MISO
pub trait Transfer {
    fn transfer(&mut self, mosi: Vec<u8>) -> Result<Vec<u8>, ErrorKind>;
}

mock! {
    pub SPIBus {}

    impl Transfer for SPIBus {
        fn transfer(&mut self, mosi: Vec<u8>) -> Result<Vec<u8>, ErrorKind>;
    }
}

impl ErrorType for MockSPIBus {
    type Error = ErrorKind;
}

impl SpiDevice<u8> for MockSPIBus {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ErrorKind> {
        let mut mosi = Vec::new();

        for operation in operations.iter() {
            match operation {
                Operation::Write(data) => mosi.extend_from_slice(data),
                Operation::Read(data) => mosi.resize(mosi.len() + data.len(), 0x0),
                Operation::Transfer(read, write) => {
                    mosi.extend_from_slice(write);
                    mosi.resize(mosi.len() + read.len().saturating_sub(write.len()), 0x0);
                }
                Operation::TransferInPlace(data) => mosi.extend_from_slice(data),
                Operation::DelayNs(_) => {}
            }
        }

        let miso = Transfer::transfer(self, mosi)?;
        let mut received = miso.into_iter().chain(core::iter::repeat(0x0));

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(data) => received.by_ref().take(data.len()).for_each(drop),
                Operation::Read(data) | Operation::TransferInPlace(data) => {
                    data.iter_mut().for_each(|byte| *byte = received.next().unwrap_or(0x0))
                }
                Operation::Transfer(read, write) => {
                    for index in 0..read.len().max(write.len()) {
                        let byte = received.next().unwrap_or(0x0);

                        if let Some(slot) = read.get_mut(index) {
                            *slot = byte;
                        }
                    }
                }
                Operation::DelayNs(_) => {}
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct Mocks {
    pub bus: MockSPIBus,
}

impl Mocks {
    pub fn into_controller(self) -> MCP2515<MockSPIBus, TestClock> {
        MCP2515::new(self.bus)
    }

    pub fn into_io<const N: usize>(self) -> CanIo<MockSPIBus, TestClock, N> {
        CanIo::new(self.bus)
    }
}
