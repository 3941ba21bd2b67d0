//! Serial port scanner driver.
//!
//! Wraps the blocking `serialport` crate. Every open and read runs on Tokio's
//! blocking pool; the port handle is moved into the blocking task and handed
//! back when the call returns, so the driver never shares the handle.
//!
//! Lines are terminated by `\n`. Bytes received before a read timeout are kept
//! and completed by the next read, so a slow scanner never splits a payload.

use crate::error::{HardwareError, Result};
use crate::traits::{ReadOutcome, ScannerDevice};
use serialport::SerialPort;
use std::io::{BufRead, BufReader};
use tablelink_core::{Handshake, Parity, SerialSettings, StopBits};
use tracing::{debug, trace};

/// Line terminator emitted by the scanner.
const NEWLINE: u8 = b'\n';

/// Scanner attached to a serial port.
#[derive(Debug)]
pub struct SerialScanner {
    settings: SerialSettings,
    link: Option<SerialLink>,
}

/// Open port plus the bytes of a line not yet terminated.
struct SerialLink {
    reader: BufReader<Box<dyn SerialPort>>,
    pending: Vec<u8>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("pending_bytes", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SerialScanner {
    /// Create a closed scanner for the configured port.
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            settings,
            link: None,
        }
    }

    /// Translate settings into a `serialport` builder.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for framing options `serialport` cannot express.
    fn builder(&self) -> Result<serialport::SerialPortBuilder> {
        let s = &self.settings;

        let data_bits = match s.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(HardwareError::invalid_argument(format!(
                    "unsupported data bits: {other}"
                )));
            }
        };

        let parity = match s.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
            Parity::Mark | Parity::Space => {
                return Err(HardwareError::invalid_argument(format!(
                    "unsupported parity: {:?}",
                    s.parity
                )));
            }
        };

        let stop_bits = match s.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
            StopBits::OnePointFive => {
                return Err(HardwareError::invalid_argument(
                    "unsupported stop bits: OnePointFive",
                ));
            }
        };

        let flow_control = match s.handshake {
            Handshake::None => serialport::FlowControl::None,
            Handshake::XonXoff => serialport::FlowControl::Software,
            Handshake::RequestToSend | Handshake::RequestToSendXonXoff => {
                serialport::FlowControl::Hardware
            }
        };

        Ok(serialport::new(s.port_name.clone(), s.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .flow_control(flow_control)
            .timeout(s.read_timeout()))
    }
}

/// Classify a `serialport` error raised for `device`.
fn map_serial_error(device: &str, error: serialport::Error) -> HardwareError {
    match error.kind() {
        serialport::ErrorKind::NoDevice => HardwareError::disconnected(device),
        serialport::ErrorKind::InvalidInput => HardwareError::invalid_argument(error.description),
        serialport::ErrorKind::Io(kind) => {
            HardwareError::from_io(device, std::io::Error::new(kind, error.description))
        }
        serialport::ErrorKind::Unknown => HardwareError::other(error.description),
    }
}

impl SerialLink {
    /// Blocking read of at most one line.
    fn read_line(&mut self, device: &str) -> Result<ReadOutcome> {
        use std::io::ErrorKind;

        match self.reader.read_until(NEWLINE, &mut self.pending) {
            Ok(0) => Err(HardwareError::disconnected(device)),
            Ok(_) if self.pending.last() == Some(&NEWLINE) => {
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                Ok(ReadOutcome::Line(line))
            }
            // Stream ended in the middle of a line.
            Ok(_) => Err(HardwareError::disconnected(device)),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Ok(ReadOutcome::TimedOut)
            }
            Err(e) => Err(HardwareError::from_io(device, e)),
        }
    }
}

impl ScannerDevice for SerialScanner {
    async fn open(&mut self) -> Result<()> {
        if self.link.is_some() {
            return Ok(());
        }

        let builder = self.builder()?;
        let device = self.settings.port_name.clone();

        debug!(port = %device, baud = self.settings.baud_rate, "Opening serial port");

        let port = tokio::task::spawn_blocking(move || {
            builder.open().map_err(|e| map_serial_error(&device, e))
        })
        .await??;

        self.link = Some(SerialLink {
            reader: BufReader::new(port),
            pending: Vec::new(),
        });
        Ok(())
    }

    async fn read_line(&mut self) -> Result<ReadOutcome> {
        let device = self.settings.port_name.clone();
        let mut link = self
            .link
            .take()
            .ok_or_else(|| HardwareError::not_open(&device))?;

        let (link, result) = tokio::task::spawn_blocking(move || {
            let result = link.read_line(&device);
            (link, result)
        })
        .await?;

        match result {
            Ok(outcome) => {
                trace!(outcome = ?outcome, "Serial read completed");
                self.link = Some(link);
                Ok(outcome)
            }
            // Dropping the link releases the port.
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) {
        if self.link.take().is_some() {
            debug!(port = %self.settings.port_name, "Serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        self.link.is_some()
    }

    fn name(&self) -> &str {
        &self.settings.port_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::{self, Read, Write};
    use std::time::Duration;

    /// In-memory port replaying scripted chunks, then timing out.
    struct ScriptedPort {
        chunks: std::collections::VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedPort {
        fn boxed(chunks: Vec<io::Result<Vec<u8>>>) -> Box<dyn SerialPort> {
            Box::new(Self {
                chunks: chunks.into(),
            })
        }
    }

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from(io::ErrorKind::TimedOut)),
            }
        }
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SerialPort for ScriptedPort {
        fn name(&self) -> Option<String> {
            Some("scripted".into())
        }
        fn baud_rate(&self) -> serialport::Result<u32> {
            Ok(9600)
        }
        fn data_bits(&self) -> serialport::Result<serialport::DataBits> {
            Ok(serialport::DataBits::Eight)
        }
        fn flow_control(&self) -> serialport::Result<serialport::FlowControl> {
            Ok(serialport::FlowControl::None)
        }
        fn parity(&self) -> serialport::Result<serialport::Parity> {
            Ok(serialport::Parity::None)
        }
        fn stop_bits(&self) -> serialport::Result<serialport::StopBits> {
            Ok(serialport::StopBits::One)
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(500)
        }
        fn set_baud_rate(&mut self, _: u32) -> serialport::Result<()> {
            Ok(())
        }
        fn set_data_bits(&mut self, _: serialport::DataBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_flow_control(&mut self, _: serialport::FlowControl) -> serialport::Result<()> {
            Ok(())
        }
        fn set_parity(&mut self, _: serialport::Parity) -> serialport::Result<()> {
            Ok(())
        }
        fn set_stop_bits(&mut self, _: serialport::StopBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_timeout(&mut self, _: Duration) -> serialport::Result<()> {
            Ok(())
        }
        fn write_request_to_send(&mut self, _: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn write_data_terminal_ready(&mut self, _: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn bytes_to_read(&self) -> serialport::Result<u32> {
            Ok(0)
        }
        fn bytes_to_write(&self) -> serialport::Result<u32> {
            Ok(0)
        }
        fn clear(&self, _: serialport::ClearBuffer) -> serialport::Result<()> {
            Ok(())
        }
        fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
            Err(serialport::Error::new(
                serialport::ErrorKind::Unknown,
                "not cloneable",
            ))
        }
        fn set_break(&self) -> serialport::Result<()> {
            Ok(())
        }
        fn clear_break(&self) -> serialport::Result<()> {
            Ok(())
        }
    }

    fn link(chunks: Vec<io::Result<Vec<u8>>>) -> SerialLink {
        SerialLink {
            reader: BufReader::new(ScriptedPort::boxed(chunks)),
            pending: Vec::new(),
        }
    }

    #[test]
    fn test_reads_complete_line() {
        let mut link = link(vec![Ok(b"  XYZ123\n".to_vec())]);
        assert_eq!(
            link.read_line("scripted").unwrap(),
            ReadOutcome::Line("  XYZ123\n".into())
        );
        assert_eq!(link.read_line("scripted").unwrap(), ReadOutcome::TimedOut);
    }

    #[test]
    fn test_partial_line_survives_timeout() {
        let mut link = link(vec![
            Ok(b"04AB".to_vec()),
            Err(io::Error::from(io::ErrorKind::TimedOut)),
            Ok(b"CDEF\r\n".to_vec()),
        ]);

        assert_eq!(link.read_line("scripted").unwrap(), ReadOutcome::TimedOut);
        assert_eq!(link.pending, b"04AB");
        assert_eq!(
            link.read_line("scripted").unwrap(),
            ReadOutcome::Line("04ABCDEF\r\n".into())
        );
        assert!(link.pending.is_empty());
    }

    #[test]
    fn test_two_lines_in_one_chunk() {
        let mut link = link(vec![Ok(b"A1\nB2\n".to_vec())]);
        assert_eq!(
            link.read_line("scripted").unwrap(),
            ReadOutcome::Line("A1\n".into())
        );
        assert_eq!(
            link.read_line("scripted").unwrap(),
            ReadOutcome::Line("B2\n".into())
        );
    }

    #[test]
    fn test_eof_is_disconnect() {
        let mut link = link(vec![Ok(Vec::new())]);
        assert!(matches!(
            link.read_line("scripted"),
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[test]
    fn test_io_error_is_fault() {
        let mut link = link(vec![Err(io::Error::from(io::ErrorKind::BrokenPipe))]);
        assert!(matches!(
            link.read_line("scripted"),
            Err(HardwareError::Disconnected { .. })
        ));
    }

    #[rstest]
    #[case::mark_parity(|s: &mut SerialSettings| s.parity = Parity::Mark)]
    #[case::space_parity(|s: &mut SerialSettings| s.parity = Parity::Space)]
    #[case::one_point_five(|s: &mut SerialSettings| s.stop_bits = StopBits::OnePointFive)]
    #[case::nine_bits(|s: &mut SerialSettings| s.data_bits = 9)]
    fn test_builder_rejects_unsupported_framing(#[case] mutate: fn(&mut SerialSettings)) {
        let mut settings = SerialSettings::default();
        mutate(&mut settings);
        let scanner = SerialScanner::new(settings);
        assert!(matches!(
            scanner.builder(),
            Err(HardwareError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_builder_applies_settings() {
        let settings = SerialSettings {
            baud_rate: 115_200,
            parity: Parity::Even,
            handshake: Handshake::RequestToSend,
            ..SerialSettings::default()
        };
        assert!(SerialScanner::new(settings).builder().is_ok());
    }

    #[test]
    fn test_map_serial_error() {
        let err = map_serial_error(
            "/dev/ttyUSB0",
            serialport::Error::new(serialport::ErrorKind::NoDevice, "gone"),
        );
        assert!(matches!(err, HardwareError::Disconnected { .. }));

        let err = map_serial_error(
            "/dev/ttyUSB0",
            serialport::Error::new(
                serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied),
                "denied",
            ),
        );
        assert!(matches!(err, HardwareError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_read_without_open_fails() {
        let mut scanner = SerialScanner::new(SerialSettings::default());
        assert!(!scanner.is_open());
        assert!(matches!(
            scanner.read_line().await,
            Err(HardwareError::NotOpen { .. })
        ));
    }

    #[tokio::test]
    async fn test_open_missing_port_is_fault() {
        let mut scanner = SerialScanner::new(SerialSettings {
            port_name: "/dev/tablelink-does-not-exist".into(),
            ..SerialSettings::default()
        });
        assert!(scanner.open().await.is_err());
        assert!(!scanner.is_open());
    }
}
