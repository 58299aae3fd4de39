//! Advisory pool of reusable byte buffers.
//!
//! Response assembly wants a scratch buffer per exchange; pooling them keeps
//! steady-state traffic from re-allocating. The pool is strictly advisory:
//! `get` always succeeds, and dropping a buffer instead of returning it is
//! harmless.

use std::sync::Mutex;

use bytes::BytesMut;

/// Buffers larger than this are dropped on release instead of pooled, so one
/// oversized response can't pin memory forever.
const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// A thread-safe pool of `BytesMut` scratch buffers.
#[derive(Debug, Default)]
pub struct BufferPool {
    buffers: Mutex<Vec<BytesMut>>,
}

impl BufferPool {
    pub fn new() -> BufferPool {
        BufferPool::default()
    }

    /// Hands out an empty buffer with capacity of at least `size`.
    ///
    /// Reuses a pooled buffer when its capacity suffices, otherwise
    /// allocates fresh.
    pub fn get(&self, size: usize) -> BytesMut {
        let mut buffers = self.buffers.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(mut buf) = buffers.pop() {
            if buf.capacity() >= size {
                buf.clear();
                return buf;
            }
        }
        BytesMut::with_capacity(size)
    }

    /// Returns a buffer to the pool. Oversized buffers are dropped.
    pub fn put(&self, mut buf: BytesMut) {
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(|p| p.into_inner());
        buffers.push(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_requested_capacity() {
        let pool = BufferPool::new();
        let buf = pool.get(4096);
        assert!(buf.capacity() >= 4096);
        assert!(buf.is_empty());
    }

    #[test]
    fn released_buffer_is_reused() {
        let pool = BufferPool::new();
        let mut buf = pool.get(1024);
        buf.extend_from_slice(b"leftover");
        let cap = buf.capacity();
        pool.put(buf);

        let buf = pool.get(512);
        assert_eq!(buf.capacity(), cap);
        assert!(buf.is_empty(), "reused buffer must come back cleared");
    }

    #[test]
    fn undersized_pooled_buffer_is_not_handed_out() {
        let pool = BufferPool::new();
        pool.put(BytesMut::with_capacity(64));
        let buf = pool.get(8192);
        assert!(buf.capacity() >= 8192);
    }

    #[test]
    fn oversized_buffers_are_dropped() {
        let pool = BufferPool::new();
        pool.put(BytesMut::with_capacity(MAX_POOLED_CAPACITY + 1));
        // nothing pooled, so this allocates fresh at the requested size
        let buf = pool.get(16);
        assert!(buf.capacity() < MAX_POOLED_CAPACITY);
    }
}
