// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;
use thiserror::Error;

/// Kernel-level errors surfaced by registration, dispatch and configuration.
#[derive(Error, Debug)]
pub enum KernelError {
    /// A method, codec or type name was registered twice (fatal at startup)
    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    /// No remote transport is attached
    #[error("Remote transport unavailable")]
    BridgeUnavailable,

    #[error("Remote request timed out after {0:?}")]
    RemoteTimeout(Duration),

    /// The transport reported a failure
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    /// I/O Error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Codec registry errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    /// Input cannot be handled by the codec
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// Token issuance and verification errors.
///
/// Any of these means "unauthenticated"; callers must not trust a partially
/// decoded token.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    /// Wrong number of segments
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("Token codec not configured")]
    Unconfigured,

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Token codec error: {0}")]
    Codec(#[from] CodecError),
}

impl KernelError {
    /// Get a message safe to show to remote callers.
    pub fn user_message(&self) -> String {
        match self {
            KernelError::DuplicateRegistration(_) => "Internal error".to_string(),
            KernelError::BridgeUnavailable => "Service unavailable".to_string(),
            KernelError::RemoteTimeout(_) => "Service briefly unavailable".to_string(),
            KernelError::Transport(_) => "Service unavailable".to_string(),
            KernelError::ConfigurationError(_) => "Internal error".to_string(),
            KernelError::Codec(_) => "Invalid data".to_string(),
            KernelError::Token(_) => "Authentication failed".to_string(),
            KernelError::IoError(_) => "Internal system error".to_string(),
        }
    }
}
