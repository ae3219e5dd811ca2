// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

pub mod config;
pub mod crypto;
pub mod envelope;
pub mod fixtures;
pub mod handler;
pub mod handshake;
pub mod http;
pub mod keys;
pub mod metrics;
pub mod responses;
pub mod router;
pub mod server;
pub mod tokens;
