use core::{
    fmt::{self, Display, Formatter, Write},
    str::from_utf8,
};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::sys::jiffies;

/// Ring buffer keeping the latest log lines
pub struct LogBuffer {
    buffer: &'static mut [u8],
    written: usize,
}

impl LogBuffer {
    pub const fn new(buffer: &'static mut [u8]) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn clear(&mut self) {
        self.written = 0;
    }
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let size = self.buffer.len();
        if size == 0 {
            return Ok(());
        }
        let mut bytes = s.as_bytes();
        if bytes.len() > size {
            self.written += bytes.len() - size;
            bytes = &bytes[bytes.len() - size..];
        }
        let index = self.written % size;
        let partial_size = (size - index).min(bytes.len());
        self.buffer[index..index + partial_size].copy_from_slice(&bytes[..partial_size]);
        self.buffer[..bytes.len() - partial_size].copy_from_slice(&bytes[partial_size..]);
        self.written += bytes.len();
        Ok(())
    }
}

fn write_lossy(f: &mut Formatter, mut bytes: &[u8]) -> fmt::Result {
    loop {
        match from_utf8(bytes) {
            Ok(s) => return f.write_str(s),
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                f.write_str(from_utf8(valid).map_err(|_| fmt::Error)?)?;
                f.write_char(char::REPLACEMENT_CHARACTER)?;
                bytes = &rest[e.error_len().unwrap_or(rest.len())..];
            }
        }
    }
}

impl Display for LogBuffer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let size = self.buffer.len();
        if self.written <= size {
            return write_lossy(f, &self.buffer[..self.written]);
        }
        let index = self.written % size;
        write_lossy(f, &self.buffer[index..])?;
        write_lossy(f, &self.buffer[..index])
    }
}

pub struct Logger {
    buffer: &'static Mutex<LogBuffer>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Never spin, a contended line is dropped
        let mut buffer = match self.buffer.try_lock() {
            Some(buffer) => buffer,
            None => return,
        };
        let millis = jiffies::get().as_millis() as u64;
        let (seconds, millis) = (millis / 1000, millis % 1000);
        let level = record.level();
        writeln!(buffer, "[{:5}.{:03}] {:5} {}", seconds, millis, level, record.args()).ok();
    }

    fn flush(&self) {}
}

static LOG_BUFFER: Mutex<LogBuffer> = Mutex::new(LogBuffer::new(&mut []));
static LOGGER: Logger = Logger { buffer: &LOG_BUFFER };

pub fn init(buffer: &'static mut [u8], level: LevelFilter) -> Result<(), SetLoggerError> {
    *LOG_BUFFER.lock() = LogBuffer::new(buffer);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Writes buffered log lines, oldest first
pub fn dump<W: Write>(writer: &mut W) -> fmt::Result {
    write!(writer, "{}", *LOG_BUFFER.lock())
}

mod test {
    #[cfg(test)]
    fn leak(size: usize) -> &'static mut [u8] {
        std::boxed::Box::leak(std::vec![0u8; size].into_boxed_slice())
    }

    #[test]
    fn test_log_buffer() {
        use core::fmt::Write;
        use std::string::ToString;

        use super::LogBuffer;

        let mut buffer = LogBuffer::new(leak(8));
        write!(buffer, "abc").ok();
        assert_eq!(buffer.to_string(), "abc");
        write!(buffer, "defgh").ok();
        assert_eq!(buffer.to_string(), "abcdefgh");
        write!(buffer, "ij").ok();
        assert_eq!(buffer.to_string(), "cdefghij");
        write!(buffer, "0123456789").ok();
        assert_eq!(buffer.to_string(), "23456789");
        buffer.clear();
        assert_eq!(buffer.to_string(), "");
    }

    #[test]
    fn test_log_buffer_cut_utf8() {
        use core::fmt::Write;
        use std::string::ToString;

        use super::LogBuffer;

        // Only the continuation byte of the degree sign is kept
        let mut buffer = LogBuffer::new(leak(3));
        write!(buffer, "a°bc").ok();
        assert_eq!(buffer.to_string(), "\u{FFFD}bc");
    }

    #[test]
    #[serial_test::serial]
    fn test_logger() {
        use std::string::{String, ToString};

        use log::{Level, LevelFilter, Log, Record};
        use spin::Mutex;

        use super::{LogBuffer, Logger};

        log::set_max_level(LevelFilter::Trace);
        let buffer: &'static Mutex<LogBuffer> =
            std::boxed::Box::leak(std::boxed::Box::new(Mutex::new(LogBuffer::new(leak(64)))));
        let logger = Logger { buffer };
        let record = Record::builder().args(format_args!("fix {}", 3)).level(Level::Error).build();
        logger.log(&record);
        let output: String = buffer.lock().to_string();
        assert!(output.starts_with('['));
        assert!(output.ends_with("] ERROR fix 3\n"));

        let guard = buffer.lock();
        logger.log(&record);
        drop(guard);
        assert_eq!(buffer.lock().to_string(), output);

        log::set_max_level(LevelFilter::Warn);
        let record = Record::builder().args(format_args!("dropped")).level(Level::Info).build();
        logger.log(&record);
        assert_eq!(buffer.lock().to_string(), output);
    }
}
