// SPDX-License-Identifier: GPL-3.0-or-later
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Scheme prefix of locators served by a remote peer.
pub const SERVENT_SCHEME: &str = "servent://";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("remote locator is missing the tab separator: {0}")]
    MissingSeparator(String),
    #[error("remote locator has an empty user name: {0}")]
    EmptyUserName(String),
}

/// Where a result's file can be fetched from.
///
/// Local files render as their raw catalog path. Files on a peer render as
/// `servent://<user>\t<path>`.
///
/// Parsing splits at the first tab, so a user name must not contain one.
/// A local path that itself starts with `servent://` parses back as remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locator {
    Local(String),
    Remote { user_name: String, path: String },
}

impl Locator {
    pub fn remote(user_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Remote {
            user_name: user_name.into(),
            path: path.into(),
        }
    }

    /// Path relative to the serving source's collection.
    pub fn path(&self) -> &str {
        match self {
            Self::Local(path) => path,
            Self::Remote { path, .. } => path,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => f.write_str(path),
            Self::Remote { user_name, path } => {
                write!(f, "{}{}\t{}", SERVENT_SCHEME, user_name, path)
            }
        }
    }
}

impl FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some(rest) = s.strip_prefix(SERVENT_SCHEME) else {
            return Ok(Self::Local(s.to_string()));
        };

        let (user_name, path) = rest
            .split_once('\t')
            .ok_or_else(|| LocatorError::MissingSeparator(s.to_string()))?;
        if user_name.is_empty() {
            return Err(LocatorError::EmptyUserName(s.to_string()));
        }

        Ok(Self::remote(user_name, path))
    }
}
