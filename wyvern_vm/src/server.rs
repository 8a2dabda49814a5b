use std::collections::VecDeque;
use std::fmt::Debug;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::time::Duration;
use tracing::{debug, warn};

/// Readiness events surfaced by one server tick.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ServerEvent {
    /// A new connection was accepted under the given token.
    Accepted(usize),
    /// Raw input bytes arrived on a connection.
    Input(usize, Vec<u8>),
    /// The peer closed the connection (or it failed).
    Closed(usize),
}

/// The TCP server the scheduler drives between fiber passes.
///
/// One tick bounds the wait on the given timeout, then surfaces accepted
/// connections, delivered bytes and closed peers; writes are fire and
/// forget. The interface is fixed; the scheduler never touches sockets
/// directly.
pub trait Server: Debug {
    /// Advance the I/O state by one bounded tick.
    fn tick(&mut self, timeout: Duration) -> Vec<ServerEvent>;

    /// Send bytes to a connection.
    fn write(&mut self, token: usize, bytes: &[u8]);

    /// Close a connection.
    fn close(&mut self, token: usize);
}

/// A line-oriented telnet server over non-blocking `std::net` sockets.
///
/// Each tick sleeps out its timeout, drains the accept queue, then polls
/// every socket for readable bytes.
#[derive(Debug)]
pub struct TcpServer {
    listener: TcpListener,
    streams: Vec<(usize, TcpStream)>,
    next_token: usize,
}

impl TcpServer {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns an error when the address cannot be bound.
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))?;
        listener.set_nonblocking(true)?;
        debug!("listening on port {port}");
        Ok(Self {
            listener,
            streams: Vec::new(),
            next_token: 0,
        })
    }

    fn accept_pending(&mut self, events: &mut Vec<ServerEvent>) {
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    let token = self.next_token;
                    self.next_token += 1;
                    debug!("accepted {peer} as connection {token}");
                    self.streams.push((token, stream));
                    events.push(ServerEvent::Accepted(token));
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => break,
                Err(error) => {
                    warn!("accept failed: {error}");
                    break;
                }
            }
        }
    }

    fn poll_streams(&mut self, events: &mut Vec<ServerEvent>) {
        let mut closed = Vec::new();
        for (token, stream) in &mut self.streams {
            let mut buffer = [0_u8; 512];
            match stream.read(&mut buffer) {
                Ok(0) => closed.push(*token),
                Ok(count) => events.push(ServerEvent::Input(*token, buffer[..count].to_vec())),
                Err(error) if error.kind() == ErrorKind::WouldBlock => {}
                Err(error) => {
                    warn!("read failed on connection {token}: {error}");
                    closed.push(*token);
                }
            }
        }
        for token in closed {
            self.close(token);
            events.push(ServerEvent::Closed(token));
        }
    }
}

impl Server for TcpServer {
    fn tick(&mut self, timeout: Duration) -> Vec<ServerEvent> {
        std::thread::sleep(timeout);
        let mut events = Vec::new();
        self.accept_pending(&mut events);
        self.poll_streams(&mut events);
        events
    }

    fn write(&mut self, token: usize, bytes: &[u8]) {
        if let Some((_, stream)) = self.streams.iter_mut().find(|(entry, _)| *entry == token)
            && let Err(error) = stream.write_all(bytes)
        {
            warn!("write failed on connection {token}: {error}");
        }
    }

    fn close(&mut self, token: usize) {
        if let Some(position) = self.streams.iter().position(|(entry, _)| *entry == token) {
            let (_, stream) = self.streams.remove(position);
            let _ = stream.shutdown(Shutdown::Both);
            debug!("closed connection {token}");
        }
    }
}

/// A scripted in-memory server for driving the scheduler without
/// sockets: ticks replay queued event batches and writes are recorded.
#[derive(Debug, Default)]
pub struct LoopbackServer {
    pending: VecDeque<Vec<ServerEvent>>,
    written: Vec<(usize, Vec<u8>)>,
    closed: Vec<usize>,
}

impl LoopbackServer {
    /// Create a server with no queued events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one tick's worth of events.
    pub fn queue(&mut self, events: Vec<ServerEvent>) {
        self.pending.push_back(events);
    }

    /// Everything written so far, in order.
    #[must_use]
    pub fn written(&self) -> &[(usize, Vec<u8>)] {
        &self.written
    }

    /// The bytes written to one connection, concatenated.
    #[must_use]
    pub fn written_to(&self, token: usize) -> Vec<u8> {
        self.written
            .iter()
            .filter(|(entry, _)| *entry == token)
            .flat_map(|(_, bytes)| bytes.iter().copied())
            .collect()
    }

    /// Tokens closed so far.
    #[must_use]
    pub fn closed(&self) -> &[usize] {
        &self.closed
    }
}

impl Server for LoopbackServer {
    fn tick(&mut self, _timeout: Duration) -> Vec<ServerEvent> {
        self.pending.pop_front().unwrap_or_default()
    }

    fn write(&mut self, token: usize, bytes: &[u8]) {
        self.written.push((token, bytes.to_vec()));
    }

    fn close(&mut self, token: usize) {
        self.closed.push(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_replays_queued_events() {
        let mut server = LoopbackServer::new();
        server.queue(vec![ServerEvent::Accepted(0)]);
        assert_eq!(
            vec![ServerEvent::Accepted(0)],
            server.tick(Duration::ZERO)
        );
        assert!(server.tick(Duration::ZERO).is_empty());
    }

    #[test]
    fn test_loopback_records_writes() {
        let mut server = LoopbackServer::new();
        server.write(3, b"hello ");
        server.write(3, b"world");
        server.write(4, b"other");
        assert_eq!(b"hello world".to_vec(), server.written_to(3));
    }
}
