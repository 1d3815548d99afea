//! Per-call context: cancellation, deadline and routing markers.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Routing markers consumed by the shadow sharding algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShadowFlags {
    /// Prefix the datasource name.
    pub datasource: bool,
    /// Prefix the database name.
    pub database: bool,
    /// Prefix the table name.
    pub table: bool,
}

/// Context handed to every builder and data source call.
///
/// Cloning is cheap; clones share the same cancellation token.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    use_master: bool,
    shadow: ShadowFlags,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context without deadline or markers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: None,
            use_master: false,
            shadow: ShadowFlags::default(),
        }
    }

    /// Sets a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Uses an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Forces reads to the master.
    #[must_use]
    pub const fn use_master(mut self) -> Self {
        self.use_master = true;
        self
    }

    /// Sets the shadow routing markers.
    #[must_use]
    pub const fn with_shadow(mut self, shadow: ShadowFlags) -> Self {
        self.shadow = shadow;
        self
    }

    /// Returns `true` when reads must go to the master.
    #[must_use]
    pub const fn is_use_master(&self) -> bool {
        self.use_master
    }

    /// Returns the shadow routing markers.
    #[must_use]
    pub const fn shadow(&self) -> ShadowFlags {
        self.shadow
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels the context and every clone of it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fails when the context is already cancelled or past its deadline.
    ///
    /// # Errors
    ///
    /// [`Error::Cancelled`] or [`Error::Timeout`].
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Error::Timeout),
            _ => Ok(()),
        }
    }
}
