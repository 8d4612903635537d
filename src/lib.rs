// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

pub mod advisory;
pub mod api;
pub mod config;
pub mod credentials;
pub mod prompt;
pub mod stream;
pub mod upstream;
