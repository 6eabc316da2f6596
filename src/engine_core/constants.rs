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

//! Kernel constants - single source of truth for codes, names and defaults.
//!
//! Outcome codes, codec names, shape tags and configuration keys live here so
//! the registries, the mapping engine and the CLI agree on them.

/// Built-in outcome codes
pub mod outcome {
    /// Sole success code
    pub const OK: i32 = 0;
    pub const FAIL: i32 = 1;
    pub const RETRY: i32 = 2;
    pub const INVALID: i32 = 3;
    /// Unknown operation (or nothing found)
    pub const NOTHING: i32 = 4;
    pub const UNSIGNED: i32 = 5;
    pub const UNAUTHED: i32 = 6;
    /// Required field missing
    pub const VAR_EMPTY: i32 = 7;
    /// Field failed its type check
    pub const VAR_ERROR: i32 = 8;
    /// Outcome built from a raw error (transport failure etc.)
    pub const ERROR: i32 = -1;
    /// First code handed out by an outcome group
    pub const GROUP_BASE: i32 = 1000;
}

/// Codec names
pub mod codec {
    pub const JSON: &str = "json";
    pub const BINARY: &str = "binary";
    pub const TEXT: &str = "text";
    pub const TEXTS: &str = "texts";
    pub const DIGIT: &str = "digit";
    pub const DIGITS: &str = "digits";

    pub const DEFAULT_TEXT_ALPHABET: &str =
        "01234AaBbCcDdEeFfGgHhIiJjKkLlMmNnOoPpQqRrSsTtUuVvWwXxYyZz56789-_";
    pub const DEFAULT_DIGIT_ALPHABET: &str =
        "abcdefghijkmnpqrstuvwxyz123456789ACDEFGHJKLMNPQRSTUVWXYZ";
    pub const DEFAULT_SALT: &str = "bindery";
    pub const DEFAULT_DIGIT_LENGTH: usize = 7;
}

/// Unique id generator defaults
pub mod sequence {
    /// 2022-05-01T00:00:00Z in unix milliseconds
    pub const DEFAULT_START_MS: i64 = 1_651_363_200_000;
    pub const DEFAULT_TIME_BITS: u8 = 42;
    pub const DEFAULT_NODE_BITS: u8 = 7;
    pub const DEFAULT_STEP_BITS: u8 = 14;
}

/// Dispatcher constants
pub mod dispatch {
    use std::time::Duration;

    /// Upper bound for a remote request
    pub const REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

    pub const SHAPE_PLAIN: &str = "plain";
    pub const SHAPE_LIST: &str = "list";
    pub const SHAPE_COUNT: &str = "count";
    pub const SHAPE_PAGED: &str = "paged";
    pub const SHAPE_DUAL: &str = "dual";

    pub const KEY_ITEM: &str = "item";
    pub const KEY_ITEMS: &str = "items";
    pub const KEY_COUNT: &str = "count";
    pub const KEY_OFFSET: &str = "offset";
    pub const KEY_LIMIT: &str = "limit";
}

/// Lifecycle trigger events
pub mod trigger {
    pub const START: &str = "start";
    pub const STOP: &str = "stop";
}

/// Locale handling
pub mod locale {
    pub const DEFAULT: &str = "default";
}

/// Token header keys and defaults
pub mod token {
    /// Number of dot separated segments in a signed token
    pub const SEGMENTS: usize = 3;
    pub const DEFAULT_PAYLOAD_CODEC: &str = super::codec::BINARY;
}

/// Configuration Environment Variables
pub mod config {
    pub const ENV_NAME: &str = "BINDERY_NAME";
    pub const ENV_ROLE: &str = "BINDERY_ROLE";
    pub const ENV_VERSION: &str = "BINDERY_VERSION";
    pub const ENV_NODE: &str = "BINDERY_NODE";
    pub const ENV_SECRET: &str = "BINDERY_SECRET";
    pub const ENV_SALT: &str = "BINDERY_SALT";
    pub const ENV_MODE: &str = "BINDERY_MODE";
    pub const ENV_OVERRIDE: &str = "BINDERY_OVERRIDE";
    pub const ENV_LOCALE: &str = "BINDERY_LOCALE";
    pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
    pub const ENV_TOKEN_SECRET: &str = "BINDERY_TOKEN_SECRET";
    pub const ENV_TOKEN_CODEC: &str = "BINDERY_TOKEN_CODEC";
    pub const ENV_TOKEN_EXPIRE: &str = "BINDERY_TOKEN_EXPIRE";
    pub const ENV_TEXT_ALPHABET: &str = "BINDERY_TEXT_ALPHABET";
    pub const ENV_DIGIT_ALPHABET: &str = "BINDERY_DIGIT_ALPHABET";
    pub const ENV_DIGIT_LENGTH: &str = "BINDERY_DIGIT_LENGTH";
    pub const ENV_ID_TIME_BITS: &str = "BINDERY_ID_TIME_BITS";
    pub const ENV_ID_NODE_BITS: &str = "BINDERY_ID_NODE_BITS";
    pub const ENV_ID_STEP_BITS: &str = "BINDERY_ID_STEP_BITS";
    /// RFC 3339 instant the id clock counts from
    pub const ENV_ID_START: &str = "BINDERY_ID_START";
    pub const ENV_CONFIG_PATH: &str = "BINDERY_CONFIG";
}
