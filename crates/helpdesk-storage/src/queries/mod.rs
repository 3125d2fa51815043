// SPDX-FileCopyrightText: 2026 Helpdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed stores over the helpdesk tables.

pub mod categories;
pub mod tickets;
pub mod users;
