// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page analysis: a cheap HTTP pass for samples and a rendered pass for the
//! main page and a capped set of discovered pages.

pub mod deep;
pub mod light;

pub use deep::{DeepAnalyzer, PageFailure, PageSignals, PerformanceSignals, RenderDelta};
pub use light::{LightAnalyzer, LightPage, LightSignals};
