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

//! Clock helpers.
//!
//! Unix time as the token window and the id sequence see it.

use chrono::Utc;

/// Milliseconds since the unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Seconds since the unix epoch.
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}
