// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for helpdesk integration tests.
//!
//! [`TestHarness`] stands up a temp SQLite database with users of every
//! role, an active and an inactive category, and a ready
//! [`helpdesk_tickets::TicketService`].

pub mod harness;

pub use harness::{TestHarness, TestHarnessBuilder};
