// SPDX-License-Identifier: LGPL-2.1-or-later
//
// This file is part of FlexLock.
//
// FlexLock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// FlexLock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with FlexLock. If not, see <https://www.gnu.org/licenses/>.

//! Error types for lock operations.

use thiserror::Error;

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;

/// Errors that can occur during lock operations.
///
/// `AlreadyLocked` is a control signal, not a failure: a non-blocking
/// acquisition found the key held by an unexpired lease and the caller is
/// expected to branch on it. Every other variant is fatal to the call that
/// raised it.
#[derive(Error, Debug)]
pub enum LockError {
    /// Key is held by an unexpired lease
    #[error("Already locked: {0}")]
    AlreadyLocked(String),

    /// Backend error (database, network, etc.)
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LockError {
    /// True for the denied outcome of a non-blocking acquisition attempt.
    pub fn is_already_locked(&self) -> bool {
        matches!(self, LockError::AlreadyLocked(_))
    }
}

#[cfg(any(feature = "sqlite-backend", feature = "postgres-backend"))]
impl From<sqlx::Error> for LockError {
    fn from(err: sqlx::Error) -> Self {
        LockError::BackendError(format!("SQL error: {}", err))
    }
}
