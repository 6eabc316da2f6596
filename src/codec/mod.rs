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

//! Codec registry, built-in codecs, unique ids and signed tokens.

pub mod builtin;
pub mod registry;
pub mod sequence;
pub mod token;

pub use registry::{Codec, CodecRegistry};
pub use sequence::Sequence;
pub use token::{Token, TokenCodec, TokenHeader};
