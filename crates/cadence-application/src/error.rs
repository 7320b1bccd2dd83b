// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Failures that abort a whole resolve command.
///
/// Row-level problems such as a dangling source id are logged and skipped,
/// and an empty candidate set is a normal empty outcome, so neither shows up
/// here.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}
