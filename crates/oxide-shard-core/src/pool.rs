//! Process-wide pool of scratch buffers used while rendering SQL.

use std::ops::{Deref, DerefMut};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Buffers idle in the pool beyond this count are dropped.
const MAX_IDLE: usize = 64;
/// Buffers that grew beyond this capacity are not kept.
const MAX_CAPACITY: usize = 64 * 1024;

static POOL: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A buffer borrowed from the pool, returned on drop.
pub struct PooledBuffer {
    buf: String,
}

/// Takes a cleared buffer from the pool, or allocates one.
pub fn acquire() -> PooledBuffer {
    let buf = POOL.lock().pop().unwrap_or_else(|| String::with_capacity(256));
    PooledBuffer { buf }
}

impl PooledBuffer {
    /// Copies the content out, leaving the buffer to the pool.
    pub(crate) fn to_owned_string(&self) -> String {
        self.buf.clone()
    }
}

impl Deref for PooledBuffer {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if self.buf.capacity() > MAX_CAPACITY {
            return;
        }
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let mut pool = POOL.lock();
        if pool.len() < MAX_IDLE {
            pool.push(buf);
        }
    }
}
