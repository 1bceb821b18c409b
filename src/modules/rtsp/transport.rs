//! Socket establishment behind a trait, so the client can be driven over TCP
//! in production and over scripted streams in tests.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(100);

/// A connected, bidirectional byte stream owned by exactly one client.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

/// Opens transports to `addr`, bounded by `timeout` for connect and I/O.
pub trait Connector: Send + Sync {
    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<Box<dyn Transport>>;
}

/// Plain TCP with connect, read and write timeouts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(&self, addr: SocketAddr, timeout: Duration) -> io::Result<Box<dyn Transport>> {
        let timeout = timeout.max(MIN_SOCKET_TIMEOUT);
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}
