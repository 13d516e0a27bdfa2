//! Stream socket transport to the database.
//!
//! The connection runs in non-blocking mode. Reads go through a readiness
//! wait bounded by a caller-supplied timeout so the listener can observe its
//! shutdown flag between polls; writes retry through transient back-pressure
//! until the whole request is on the wire.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use socket2::{Domain, SockAddr, Socket, Type};

use ovsgate_config::DbEndpoint;

use crate::errors::DbError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_RETRY_TIMEOUT: Duration = Duration::from_millis(100);

/// Stream connection to the database socket.
pub(crate) enum DbSocket {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl DbSocket {
    /// Connects to the endpoint and switches the stream into non-blocking
    /// mode.
    pub(crate) fn connect(endpoint: &DbEndpoint) -> Result<Self, DbError> {
        let socket = match endpoint {
            DbEndpoint::Unix { path } => {
                connect_unix(path.as_str()).map_err(|source| DbError::Connect {
                    endpoint: endpoint.to_string(),
                    source,
                })?
            }
            DbEndpoint::Tcp { host, port } => {
                let address = resolve_tcp_address(host, *port, endpoint)?;
                let stream = TcpStream::connect_timeout(&address, CONNECT_TIMEOUT).map_err(
                    |source| DbError::Connect {
                        endpoint: endpoint.to_string(),
                        source,
                    },
                )?;
                Self::Tcp(stream)
            }
        };

        socket
            .set_nonblocking()
            .map_err(|source| DbError::NonBlocking { source })?;
        Ok(socket)
    }

    /// Clones the underlying stream so the listener can own a read handle
    /// while callers keep writing.
    pub(crate) fn try_clone(&self) -> Result<Self, DbError> {
        let clone = match self {
            Self::Unix(stream) => stream.try_clone().map(Self::Unix),
            Self::Tcp(stream) => stream.try_clone().map(Self::Tcp),
        };
        clone.map_err(|source| DbError::CloneStream { source })
    }

    fn set_nonblocking(&self) -> io::Result<()> {
        match self {
            Self::Unix(stream) => stream.set_nonblocking(true),
            Self::Tcp(stream) => stream.set_nonblocking(true),
        }
    }

    /// Writes the whole buffer, waiting out transient back-pressure.
    pub(crate) fn send_all(&mut self, bytes: &[u8]) -> Result<(), DbError> {
        let mut written = 0;
        while written < bytes.len() {
            match self.write(&bytes[written..]) {
                Ok(0) => return Err(DbError::Disconnected),
                Ok(count) => written += count,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    self.wait_for(PollFlags::POLLOUT, WRITE_RETRY_TIMEOUT)?;
                }
                Err(source) => return Err(DbError::Write { source }),
            }
        }
        Ok(())
    }

    /// Waits up to `timeout` for inbound data and reads what arrived.
    ///
    /// `Ok(0)` means no data yet; end-of-stream and read failures are fatal
    /// to the connection.
    pub(crate) fn poll_read(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, DbError> {
        if !self.wait_for(PollFlags::POLLIN, timeout)? {
            return Ok(0);
        }

        match self.read(buffer) {
            Ok(0) => Err(DbError::Disconnected),
            Ok(count) => Ok(count),
            Err(error)
                if error.kind() == io::ErrorKind::WouldBlock
                    || error.kind() == io::ErrorKind::Interrupted =>
            {
                Ok(0)
            }
            Err(source) => Err(DbError::Read { source }),
        }
    }

    /// Waits for the requested readiness, returning whether it was signalled
    /// before the timeout elapsed.
    fn wait_for(&self, flags: PollFlags, timeout: Duration) -> Result<bool, DbError> {
        let millis = u16::try_from(timeout.as_millis()).unwrap_or(u16::MAX);
        let mut fds = [PollFd::new(self.as_fd(), flags)];
        let ready = poll(&mut fds, PollTimeout::from(millis)).map_err(|errno| DbError::Poll {
            source: io::Error::from(errno),
        })?;
        Ok(ready > 0)
    }
}

impl AsFd for DbSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        match self {
            Self::Unix(stream) => stream.as_fd(),
            Self::Tcp(stream) => stream.as_fd(),
        }
    }
}

impl Read for DbSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Unix(stream) => stream.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for DbSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Unix(stream) => stream.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Unix(stream) => stream.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

fn connect_unix(path: &str) -> io::Result<DbSocket> {
    let socket = Socket::new(Domain::UNIX, Type::STREAM, None)?;
    let address = SockAddr::unix(path)?;
    socket.connect_timeout(&address, CONNECT_TIMEOUT)?;
    let stream: UnixStream = OwnedFd::from(socket).into();
    Ok(DbSocket::Unix(stream))
}

fn resolve_tcp_address(
    host: &str,
    port: u16,
    endpoint: &DbEndpoint,
) -> Result<SocketAddr, DbError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| DbError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| DbError::ResolveEmpty {
            endpoint: endpoint.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;
    use std::os::unix::net::UnixListener;
    use std::time::Instant;

    use rstest::{fixture, rstest};

    use super::*;

    struct SocketPair {
        socket: DbSocket,
        server: UnixStream,
        _dir: tempfile::TempDir,
    }

    #[fixture]
    fn socket_pair() -> SocketPair {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("db.sock");
        let listener = UnixListener::bind(&path).expect("bind listener");
        let endpoint = DbEndpoint::unix(path.to_str().expect("utf8 path"));
        let socket = DbSocket::connect(&endpoint).expect("connect socket");
        let (server, _) = listener.accept().expect("accept connection");
        SocketPair {
            socket,
            server,
            _dir: dir,
        }
    }

    #[rstest]
    fn poll_read_times_out_without_data(mut socket_pair: SocketPair) {
        let mut buffer = [0_u8; 64];
        let started = Instant::now();
        let count = socket_pair
            .socket
            .poll_read(&mut buffer, Duration::from_millis(50))
            .expect("poll read");
        assert_eq!(count, 0);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[rstest]
    fn poll_read_returns_available_bytes(mut socket_pair: SocketPair) {
        socket_pair.server.write_all(b"{}").expect("server write");
        let mut buffer = [0_u8; 64];
        let count = socket_pair
            .socket
            .poll_read(&mut buffer, Duration::from_secs(1))
            .expect("poll read");
        assert_eq!(&buffer[..count], b"{}");
    }

    #[rstest]
    fn closed_peer_is_fatal(socket_pair: SocketPair) {
        let SocketPair {
            mut socket, server, ..
        } = socket_pair;
        drop(server);

        let mut buffer = [0_u8; 64];
        let error = socket
            .poll_read(&mut buffer, Duration::from_secs(1))
            .expect_err("peer closed");
        assert!(matches!(error, DbError::Disconnected));
    }

    #[rstest]
    fn send_all_writes_the_whole_request(mut socket_pair: SocketPair) {
        socket_pair
            .socket
            .send_all(b"{\"method\":\"transact\"}")
            .expect("send request");

        let mut buffer = [0_u8; 64];
        let count = socket_pair.server.read(&mut buffer).expect("server read");
        assert_eq!(&buffer[..count], b"{\"method\":\"transact\"}");
    }
}
