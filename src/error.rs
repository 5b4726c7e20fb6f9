// Copyright 2025 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

/// Errors surfaced synchronously to a caller as the result of a request.
///
/// A call-state veto is not an error; it is reported as a boolean false
/// reply. Client-loss cleanup (lease eviction, call-state auto-revert) is
/// likewise never an error and manifests only as subsequent signals.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Unknown enum value or malformed key in a request argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The caller lacks the capability required by the operation.
    #[error("access denied: missing capability {0}")]
    AccessDenied(&'static str),

    /// Config key with no stored value and no compiled-in default.
    #[error("not found: {0}")]
    NotFound(String),

    /// A system-wide registration bound was reached.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// A config write took effect in memory but did not durably persist.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// Invariant violation. Fatal to the affected request only.
    #[error("internal error: {0}")]
    Internal(String),
}
