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

//! bindery: request binding and call dispatch for modular service kernels.
//!
//! The crate validates loosely structured payloads against declared field
//! schemas, routes calls to registered handlers (or a remote transport),
//! normalises handler results into one canonical shape and carries signed
//! identity tokens along the same path. [`kernel::Kernel`] wires the
//! registries together.

pub mod codec;
pub mod config;
pub mod engine;
pub mod engine_core;
pub mod kernel;
pub mod utils;

mod verification;
