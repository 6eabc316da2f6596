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

//! Override policy shared by every registry.
//!
//! Registrations under an existing key either replace the earlier entry
//! (override enabled, the default) or are ignored (strict-once mode). The
//! flag is read under its own lock so it can be flipped at startup.

use parking_lot::RwLock;
use tracing::debug;

#[derive(Debug)]
pub struct OverridePolicy {
    enabled: RwLock<bool>,
}

impl OverridePolicy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: RwLock::new(enabled),
        }
    }

    pub fn enabled(&self) -> bool {
        *self.enabled.read()
    }

    pub fn set(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }

    /// Decide whether a registration under `key` should be stored.
    pub fn admit(&self, registry: &str, key: &str, exists: bool) -> bool {
        if !exists {
            return true;
        }
        if self.enabled() {
            debug!("{} entry '{}' replaced", registry, key);
            true
        } else {
            debug!("{} entry '{}' already defined, ignored", registry, key);
            false
        }
    }
}

impl Default for OverridePolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
