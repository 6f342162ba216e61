//! Serial and UDP plumbing underneath the frame synchronizers.
//!
//! Nothing here knows about frames. Serial ports are consumed through
//! [`std::io::Read`], datagram sockets through [`DatagramSource`].

use std::{
    io::{self, ErrorKind, Read, Write},
    net::{Ipv4Addr, SocketAddr, UdpSocket},
    time::Duration,
};

use serialport::{ClearBuffer, SerialPort};
use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info};

use crate::{Error, Result};

/// A byte stream we can also talk back to (the counted protocol sends a request first)
pub trait CommandPort: Read + Write {
    /// Throw away anything the transport has already buffered
    fn discard_input(&mut self) -> io::Result<()>;
}

impl CommandPort for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        while self.bytes_to_read()? > 0 {
            self.clear(ClearBuffer::Input)?;
        }
        Ok(())
    }
}

/// Anything that hands out whole datagrams
pub trait DatagramSource {
    /// Receive one datagram into `buf` and return its length.
    /// A timeout surfaces as `WouldBlock` or `TimedOut`.
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl DatagramSource for UdpSocket {
    fn receive(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.recv_from(buf).map(|(n, _)| n)
    }
}

pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Read until `buf` is full, the transport times out or the stream ends.
/// Returns how many bytes landed in `buf`; anything short of `buf.len()` is a short read.
pub fn read_up_to<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => break,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub fn open_serial(path: &str, baud: u32, timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let port = serialport::new(path, baud)
        .timeout(timeout)
        .open()
        .map_err(|source| Error::SerialOpen {
            path: path.to_owned(),
            source,
        })?;
    info!(path, baud, "Opened serial port");
    Ok(port)
}

fn bind_error(port: u16) -> impl Fn(io::Error) -> Error {
    move |source| Error::UdpBind { port, source }
}

/// Bind a receive-only socket on all interfaces with an enlarged kernel buffer
pub fn open_udp(port: u16, recv_buffer: usize, timeout: Duration) -> Result<UdpSocket> {
    let socket =
        Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_error(port))?;
    socket
        .set_recv_buffer_size(recv_buffer)
        .map_err(bind_error(port))?;
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into()).map_err(bind_error(port))?;
    let socket: UdpSocket = socket.into();
    socket
        .set_read_timeout(Some(timeout))
        .map_err(bind_error(port))?;
    // The kernel is free to round the buffer size, so report what we actually got
    if let Ok(actual) = socket2::SockRef::from(&socket).recv_buffer_size() {
        debug!(requested = recv_buffer, actual, "UDP receive buffer");
    }
    info!(port, "Listening for UDP frames");
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// Hands out pre-baked read results one call at a time
    struct Chunked(VecDeque<io::Result<Vec<u8>>>);

    impl Read for Chunked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn test_fills_across_reads() {
        let mut reader = Chunked(VecDeque::from(vec![
            Ok(vec![1, 2]),
            Err(io::Error::from(ErrorKind::Interrupted)),
            Ok(vec![3]),
            Ok(vec![4, 5]),
        ]));
        let mut buf = [0u8; 5];
        assert_eq!(read_up_to(&mut reader, &mut buf).unwrap(), 5);
        assert_eq!(buf, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_timeout_is_short_read() {
        let mut reader = Chunked(VecDeque::from(vec![
            Ok(vec![9, 9, 9]),
            Err(io::Error::from(ErrorKind::TimedOut)),
            Ok(vec![1]),
        ]));
        let mut buf = [0u8; 8];
        assert_eq!(read_up_to(&mut reader, &mut buf).unwrap(), 3);
    }

    #[test]
    fn test_eof_is_short_read() {
        let mut reader = Cursor::new(vec![7u8; 3]);
        let mut buf = [0u8; 4];
        assert_eq!(read_up_to(&mut reader, &mut buf).unwrap(), 3);
    }

    #[test]
    fn test_hard_errors_propagate() {
        let mut reader = Chunked(VecDeque::from(vec![Err(io::Error::from(
            ErrorKind::BrokenPipe,
        ))]));
        let mut buf = [0u8; 4];
        assert!(read_up_to(&mut reader, &mut buf).is_err());
    }
}
