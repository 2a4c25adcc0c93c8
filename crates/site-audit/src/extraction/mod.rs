// Copyright 2026 Site Audit Contributors
// SPDX-License-Identifier: Apache-2.0

//! Signal extraction shared by the light and deep analyzers.

pub mod jsonld;
pub mod signals;

pub use jsonld::{ArticleCompleteness, LdNode, NapCompleteness, OfferCompleteness, TypeReport};
pub use signals::{extract_signals, url_clean, DocumentSignals};
