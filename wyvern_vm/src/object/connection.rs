use crate::fiber::FiberId;
use crate::value::Value;
use std::collections::VecDeque;

/// Capacity of a connection's input ring buffer in bytes.
pub const INPUT_RING_CAPACITY: usize = 1024;

/// A bounded byte ring buffering a connection's raw input.
///
/// Carriage returns are stripped on the way in and newlines delimit
/// lines. When the ring overflows, the oldest bytes are silently dropped.
#[derive(Clone, Debug, Default)]
pub struct InputRing {
    bytes: VecDeque<u8>,
}

impl InputRing {
    /// Create an empty ring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: VecDeque::with_capacity(INPUT_RING_CAPACITY),
        }
    }

    /// Buffer raw input bytes, stripping `\r` and dropping the oldest
    /// bytes on overflow.
    pub fn push_bytes(&mut self, input: &[u8]) {
        for byte in input {
            if *byte == b'\r' {
                continue;
            }
            if self.bytes.len() == INPUT_RING_CAPACITY {
                self.bytes.pop_front();
            }
            self.bytes.push_back(*byte);
        }
    }

    /// Remove and return the next complete line, without its `\n`.
    pub fn pop_line(&mut self) -> Option<Vec<u8>> {
        let newline = self.bytes.iter().position(|byte| *byte == b'\n')?;
        let mut line: Vec<u8> = self.bytes.drain(..=newline).collect();
        line.pop();
        Some(line)
    }

    /// Number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` when no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A player connection.
///
/// Wraps the server-side socket token, the line-oriented input ring, the
/// fiber driving the connection and the player object controlling it. The
/// connection and its fiber reference each other; both are collected only
/// when unreachable from the roots.
#[derive(Clone, Debug)]
pub struct Connection {
    token: usize,
    ring: InputRing,
    fiber: Option<FiberId>,
    player: Value,
    open: bool,
}

impl Connection {
    /// Wrap a freshly accepted socket token.
    #[must_use]
    pub fn new(token: usize) -> Self {
        Self {
            token,
            ring: InputRing::new(),
            fiber: None,
            player: Value::Nil,
            open: true,
        }
    }

    /// The server-side socket token.
    #[must_use]
    pub fn token(&self) -> usize {
        self.token
    }

    /// The buffered input.
    #[must_use]
    pub fn ring(&self) -> &InputRing {
        &self.ring
    }

    /// Mutable access to the buffered input.
    pub fn ring_mut(&mut self) -> &mut InputRing {
        &mut self.ring
    }

    /// The fiber bound to this connection.
    #[must_use]
    pub fn fiber(&self) -> Option<FiberId> {
        self.fiber
    }

    /// Bind the driving fiber.
    pub fn bind_fiber(&mut self, fiber: FiberId) {
        self.fiber = Some(fiber);
    }

    /// Detach the driving fiber.
    pub fn unbind_fiber(&mut self) {
        self.fiber = None;
    }

    /// The player object controlling this connection.
    #[must_use]
    pub fn player(&self) -> Value {
        self.player
    }

    /// Install the player object.
    pub fn set_player(&mut self, player: Value) {
        self.player = player;
    }

    /// Whether the socket is still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Record end-of-input from the server.
    pub fn mark_closed(&mut self) {
        self.open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_delimited_and_cr_stripped() {
        let mut ring = InputRing::new();
        ring.push_bytes(b"hello\r\nwo");
        assert_eq!(Some(b"hello".to_vec()), ring.pop_line());
        assert_eq!(None, ring.pop_line());
        ring.push_bytes(b"rld\n");
        assert_eq!(Some(b"world".to_vec()), ring.pop_line());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut ring = InputRing::new();
        let flood = vec![b'x'; INPUT_RING_CAPACITY + 10];
        ring.push_bytes(&flood);
        assert_eq!(INPUT_RING_CAPACITY, ring.len());
        ring.push_bytes(b"\n");
        let line = ring.pop_line().expect("line");
        assert_eq!(INPUT_RING_CAPACITY - 1, line.len());
    }

    #[test]
    fn test_empty_line() {
        let mut ring = InputRing::new();
        ring.push_bytes(b"\r\n");
        assert_eq!(Some(Vec::new()), ring.pop_line());
    }
}
