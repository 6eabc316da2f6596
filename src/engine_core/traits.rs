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

//! Collaborator seams.
//!
//! The kernel reaches remote nodes, verifies tokens, renders strings and
//! emits log lines only through these traits.

use crate::engine_core::errors::{KernelError, TokenError};
use crate::engine_core::models::{Echo, LogLevel, Metadata};
use crate::engine_core::value::Value;
use async_trait::async_trait;
use std::time::Duration;

/// Forwards a call the local registry does not know to another node.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Send the call and wait at most `timeout` for its echo.
    async fn request(&self, metadata: Metadata, timeout: Duration) -> Result<Echo, KernelError>;
}

/// Quick yes/no token check without claim extraction.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<(), TokenError>;
}

/// Localised string lookup used to render outcome templates.
pub trait StringLookup: Send + Sync {
    fn lookup(&self, locale: &str, key: &str, args: &[Value]) -> String;
}

/// Leveled log sink.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}
