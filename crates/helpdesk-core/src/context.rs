// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-call cancellation and deadline.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::HelpdeskError;

/// Carried by every store and service operation. Checked before a write
/// transaction begins and again before it commits; a tripped context rolls
/// the transaction back.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl CallContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `budget` from now.
    pub fn with_timeout(budget: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some((Instant::now() + budget, budget)),
        }
    }

    /// Apply an optional timeout to this context, keeping its token.
    pub fn timeout(mut self, budget: Option<Duration>) -> Self {
        self.deadline = budget.map(|b| (Instant::now() + b, b));
        self
    }

    /// A child context sharing this deadline; cancelling the parent cancels it.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `Err(Cancelled)` or `Err(Timeout)` once the context has tripped.
    pub fn check(&self) -> Result<(), HelpdeskError> {
        if self.token.is_cancelled() {
            return Err(HelpdeskError::Cancelled);
        }
        if let Some((deadline, budget)) = self.deadline {
            if Instant::now() >= deadline {
                return Err(HelpdeskError::Timeout { duration: budget });
            }
        }
        Ok(())
    }
}
