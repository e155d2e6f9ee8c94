//! TCP client for the companion power meter.
//!
//! The lab rig speaks a plain text convention: the sweep side sends the
//! candidate azimuth in degrees as decimal text, the meter answers with one
//! decimal dBm reading. The encoding is a harness convention, not a stable
//! protocol.

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::debug;

use crate::pattern::DirectionAngle;
use crate::sweep::PowerMeter;
use crate::types::{Error, Result};

/// A request/response power meter on the far end of a TCP connection.
pub struct SocketMeter {
    stream: TcpStream,
}

impl SocketMeter {
    /// Connects to the meter and applies `read_timeout` to every reading.
    pub fn connect<A: ToSocketAddrs>(addr: A, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(read_timeout))?;
        debug!("Meter connected: {:?}", stream.peer_addr());
        Ok(Self { stream })
    }

    /// Wraps an already-connected stream, e.g. one accepted from a listener.
    pub fn from_stream(stream: TcpStream, read_timeout: Duration) -> Result<Self> {
        stream.set_read_timeout(Some(read_timeout))?;
        Ok(Self { stream })
    }
}

impl PowerMeter for SocketMeter {
    fn measure(&mut self, outgoing: DirectionAngle) -> Result<f64> {
        self.stream
            .write_all(format!("{}", outgoing.phi_deg).as_bytes())?;

        let mut buf = [0u8; 1024];
        let n = match self.stream.read(&mut buf) {
            Ok(0) => {
                return Err(Error::MeasurementDecode(
                    "meter closed the connection".into(),
                ))
            }
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Err(Error::MeasurementTimeout)
            }
            Err(e) => return Err(e.into()),
        };

        decode_power(&buf[..n])
    }
}

/// Parses one text-encoded decimal dBm reading.
fn decode_power(payload: &[u8]) -> Result<f64> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| Error::MeasurementDecode("reading is not UTF-8".into()))?;
    let power: f64 = text
        .trim()
        .parse()
        .map_err(|_| Error::MeasurementDecode(format!("invalid power value: {text:?}")))?;
    if !power.is_finite() {
        return Err(Error::MeasurementDecode(format!(
            "non-finite power value: {text:?}"
        )));
    }
    Ok(power)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn decodes_plain_decimal_readings() {
        assert_eq!(decode_power(b"-37.25").unwrap(), -37.25);
        assert_eq!(decode_power(b" -5 \n").unwrap(), -5.0);
        assert!(matches!(
            decode_power(b"ERR"),
            Err(Error::MeasurementDecode(_))
        ));
        assert!(matches!(
            decode_power(b"NaN"),
            Err(Error::MeasurementDecode(_))
        ));
        assert!(matches!(
            decode_power(b"inf"),
            Err(Error::MeasurementDecode(_))
        ));
        assert!(matches!(
            decode_power(&[0xFF, 0xFE]),
            Err(Error::MeasurementDecode(_))
        ));
    }

    #[test]
    fn exchanges_direction_for_power() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let rig = thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let n = conn.read(&mut buf).unwrap();
            let phi: f64 = std::str::from_utf8(&buf[..n]).unwrap().parse().unwrap();
            assert_eq!(phi, 130.0);
            conn.write_all(b"-41.5").unwrap();
        });

        let mut meter = SocketMeter::connect(addr, Duration::from_secs(2)).unwrap();
        let power = meter.measure(DirectionAngle::new(75.0, 130.0)).unwrap();
        assert_eq!(power, -41.5);
        rig.join().unwrap();
    }

    #[test]
    fn silent_meter_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let rig = thread::spawn(move || {
            // Accept but never answer.
            let (conn, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(300));
            drop(conn);
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut meter = SocketMeter::from_stream(stream, Duration::from_millis(50)).unwrap();
        let err = meter.measure(DirectionAngle::new(0.0, 0.0));
        assert!(matches!(err, Err(Error::MeasurementTimeout)));
        rig.join().unwrap();
    }
}
