use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Blocking, half-duplex byte channel to the PLC.
///
/// `read` waits at most the link timeout and may return fewer bytes than
/// asked for, or none at all, when the device stays silent.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>>;

    fn clear_input(&mut self) -> io::Result<()>;

    fn clear_output(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        (**self).read(n)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        (**self).clear_input()
    }

    fn clear_output(&mut self) -> io::Result<()> {
        (**self).clear_output()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 7,
            parity: Parity::Even,
            stop_bits: 1,
            timeout_ms: 5000,
        }
    }
}

impl LinkConfig {
    pub fn new(port: impl Into<String>) -> Self {
        LinkConfig {
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_data_bits(mut self, data_bits: u8) -> Self {
        self.data_bits = data_bits;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: u8) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(feature = "serial")]
mod serial {
    use std::io::{self, Read, Write};

    use serialport::{ClearBuffer, DataBits, SerialPort, StopBits};

    use super::{LinkConfig, Parity, Transport};

    /// Serial port opened from a [`LinkConfig`].
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        pub fn open(config: &LinkConfig) -> io::Result<Self> {
            let data_bits = match config.data_bits {
                5 => DataBits::Five,
                6 => DataBits::Six,
                7 => DataBits::Seven,
                8 => DataBits::Eight,
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unsupported data bits: {other}"),
                    ));
                }
            };
            let stop_bits = match config.stop_bits {
                1 => StopBits::One,
                2 => StopBits::Two,
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("unsupported stop bits: {other}"),
                    ));
                }
            };
            let parity = match config.parity {
                Parity::None => serialport::Parity::None,
                Parity::Odd => serialport::Parity::Odd,
                Parity::Even => serialport::Parity::Even,
            };

            let port = serialport::new(&config.port, config.baud_rate)
                .data_bits(data_bits)
                .parity(parity)
                .stop_bits(stop_bits)
                .timeout(config.timeout())
                .open()?;

            tracing::info!(port = %config.port, baud = config.baud_rate, "Serial link opened");
            Ok(SerialTransport { port })
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.port.write_all(bytes)?;
            self.port.flush()
        }

        fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
            let mut buf = vec![0u8; n];
            let mut filled = 0;
            while filled < n {
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(count) => filled += count,
                    Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                }
            }
            buf.truncate(filled);
            Ok(buf)
        }

        fn clear_input(&mut self) -> io::Result<()> {
            Ok(self.port.clear(ClearBuffer::Input)?)
        }

        fn clear_output(&mut self) -> io::Result<()> {
            Ok(self.port.clear(ClearBuffer::Output)?)
        }
    }
}
