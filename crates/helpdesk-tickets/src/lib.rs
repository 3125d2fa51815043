// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket domain service for the helpdesk backend.
//!
//! - **Service**: workflow transitions, assignment and escalation
//!   eligibility, deletion rights, paging defaults
//! - **Requests**: caller payloads and their field rules
//! - **History**: change log derived from consecutive versions

pub mod history;
pub mod requests;
pub mod service;

pub use history::{ChangeAction, TicketChange};
pub use requests::{CreateTicketRequest, EscalateTicketRequest, UpdateTicketRequest};
pub use service::TicketService;
