// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Plain HTTP acquisition: the fetch client and robots.txt parsing.

pub mod http_client;
pub mod robots;

pub use http_client::{FetchedPage, HttpClient};
pub use robots::{parse_robots, RobotsTxt};
