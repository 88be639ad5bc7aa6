use core::fmt::Debug;

use embedded_hal::serial::{Read, Write};
use heapless::spsc::Consumer;

pub trait ByteSource {
    /// Next received byte if any, never blocks
    fn try_receive_byte(&mut self) -> Option<u8>;
}

pub trait Transport: ByteSource {
    type Error: Debug;

    fn open(&mut self, baudrate: u32) -> Result<(), Self::Error>;
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl<'q, const N: usize> ByteSource for Consumer<'q, u8, N> {
    fn try_receive_byte(&mut self) -> Option<u8> {
        self.dequeue()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Error<E> {
    NotOpened,
    Baudrate { configured: u32, requested: u32 },
    Bus(E),
}

/// Serial peripheral polled from the consumer context.
///
/// The peripheral is set up by the board with a fixed baudrate, `open` only
/// verifies the requested one matches.
pub struct Polled<S> {
    serial: S,
    baudrate: u32,
    opened: bool,
    errors: usize,
}

impl<S> Polled<S> {
    pub fn new(serial: S, baudrate: u32) -> Self {
        Self { serial, baudrate, opened: false, errors: 0 }
    }

    /// Receive errors (overrun, framing, noise) seen so far
    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn release(self) -> S {
        self.serial
    }
}

impl<S: Read<u8>> ByteSource for Polled<S> {
    fn try_receive_byte(&mut self) -> Option<u8> {
        loop {
            match self.serial.read() {
                Ok(byte) => return Some(byte),
                Err(nb::Error::WouldBlock) => return None,
                Err(nb::Error::Other(_)) => self.errors += 1,
            }
        }
    }
}

fn open(configured: u32, requested: u32) -> Result<(), (u32, u32)> {
    if configured != requested {
        return Err((configured, requested));
    }
    Ok(())
}

fn transmit<W: Write<u8>>(writer: &mut W, bytes: &[u8]) -> Result<(), W::Error> {
    for &byte in bytes.iter() {
        nb::block!(writer.write(byte))?;
    }
    nb::block!(writer.flush())
}

impl<S: Read<u8> + Write<u8>> Transport for Polled<S>
where
    <S as Write<u8>>::Error: Debug,
{
    type Error = Error<<S as Write<u8>>::Error>;

    fn open(&mut self, baudrate: u32) -> Result<(), Self::Error> {
        open(self.baudrate, baudrate)
            .map_err(|(configured, requested)| Error::Baudrate { configured, requested })?;
        self.opened = true;
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if !self.opened {
            return Err(Error::NotOpened);
        }
        transmit(&mut self.serial, bytes).map_err(Error::Bus)
    }
}

/// Reception fed by an interrupt handler through a spsc queue,
/// transmission blocking on the writer half.
pub struct Queued<'q, W, const N: usize> {
    rx: Consumer<'q, u8, N>,
    tx: W,
    baudrate: u32,
    opened: bool,
}

impl<'q, W, const N: usize> Queued<'q, W, N> {
    pub fn new(rx: Consumer<'q, u8, N>, tx: W, baudrate: u32) -> Self {
        Self { rx, tx, baudrate, opened: false }
    }
}

impl<'q, W, const N: usize> ByteSource for Queued<'q, W, N> {
    fn try_receive_byte(&mut self) -> Option<u8> {
        self.rx.dequeue()
    }
}

impl<'q, W: Write<u8>, const N: usize> Transport for Queued<'q, W, N>
where
    W::Error: Debug,
{
    type Error = Error<W::Error>;

    fn open(&mut self, baudrate: u32) -> Result<(), Self::Error> {
        open(self.baudrate, baudrate)
            .map_err(|(configured, requested)| Error::Baudrate { configured, requested })?;
        self.opened = true;
        Ok(())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if !self.opened {
            return Err(Error::NotOpened);
        }
        transmit(&mut self.tx, bytes).map_err(Error::Bus)
    }
}

mod test {
    #[cfg(test)]
    struct Loopback {
        rx: heapless::Deque<nb::Result<u8, ()>, 16>,
        tx: heapless::Vec<u8, 16>,
    }

    #[cfg(test)]
    impl embedded_hal::serial::Read<u8> for Loopback {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, ()> {
            self.rx.pop_front().unwrap_or(Err(nb::Error::WouldBlock))
        }
    }

    #[cfg(test)]
    impl embedded_hal::serial::Write<u8> for Loopback {
        type Error = ();

        fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
            self.tx.push(byte).map_err(|_| nb::Error::Other(()))
        }

        fn flush(&mut self) -> nb::Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn test_polled() {
        use super::{ByteSource, Error, Polled, Transport};

        let mut loopback = Loopback { rx: heapless::Deque::new(), tx: heapless::Vec::new() };
        loopback.rx.push_back(Ok(b'$')).ok();
        loopback.rx.push_back(Err(nb::Error::Other(()))).ok();
        loopback.rx.push_back(Ok(b'G')).ok();

        let mut polled = Polled::new(loopback, 115200);
        assert_eq!(polled.transmit(b"x"), Err(Error::NotOpened));
        let expected = Error::Baudrate { configured: 115200, requested: 9600 };
        assert_eq!(polled.open(9600), Err(expected));
        assert_eq!(polled.open(115200), Ok(()));

        assert_eq!(polled.try_receive_byte(), Some(b'$'));
        assert_eq!(polled.try_receive_byte(), Some(b'G'));
        assert_eq!(polled.try_receive_byte(), None);
        assert_eq!(polled.errors(), 1);

        assert_eq!(polled.transmit(&[0xB5, 0x62]), Ok(()));
        assert_eq!(&polled.release().tx[..], &[0xB5, 0x62]);
    }

    #[test]
    fn test_queued() {
        use heapless::spsc::Queue;

        use super::{ByteSource, Queued};

        let mut queue: Queue<u8, 8> = Queue::new();
        let (mut producer, consumer) = queue.split();
        let tx = Loopback { rx: heapless::Deque::new(), tx: heapless::Vec::new() };
        let mut queued = Queued::new(consumer, tx, 9600);
        assert_eq!(queued.try_receive_byte(), None);
        producer.enqueue(0xB5).ok();
        producer.enqueue(0x62).ok();
        assert_eq!(queued.try_receive_byte(), Some(0xB5));
        assert_eq!(queued.try_receive_byte(), Some(0x62));
        assert_eq!(queued.try_receive_byte(), None);
    }
}
