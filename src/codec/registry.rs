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

//! Codec registry.
//!
//! Named, reversible transforms looked up case-insensitively. `encrypt`
//! is `encode` constrained to a transmissible string and `decrypt` is the
//! inverse. The registry also owns the unique-id [`Sequence`].

use crate::codec::builtin::{BinaryCodec, DigitCodec, DigitsCodec, JsonCodec, TextCodec, TextsCodec};
use crate::codec::sequence::Sequence;
use crate::config::CodecConfig;
use crate::engine_core::constants::codec as names;
use crate::engine_core::errors::CodecError;
use crate::engine_core::policy::OverridePolicy;
use crate::engine_core::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A bidirectional transform.
pub trait Codec: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Value, CodecError>;
    fn decode(&self, data: &Value) -> Result<Value, CodecError>;
}

pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn Codec>>>,
    policy: Arc<OverridePolicy>,
    sequence: Sequence,
}

impl CodecRegistry {
    /// Registry with no codecs.
    pub fn empty(policy: Arc<OverridePolicy>, sequence: Sequence) -> Self {
        Self {
            codecs: RwLock::new(HashMap::new()),
            policy,
            sequence,
        }
    }

    /// Registry preloaded with the built-in codecs.
    pub fn with_builtins(
        config: &CodecConfig,
        node: u64,
        policy: Arc<OverridePolicy>,
    ) -> Result<Self, CodecError> {
        let sequence = Sequence::new(
            config.start.timestamp_millis(),
            node,
            config.time_bits,
            config.node_bits,
            config.step_bits,
        )?;
        let registry = Self::empty(policy, sequence);
        registry.register(names::JSON, Arc::new(JsonCodec), &[]);
        registry.register(names::BINARY, Arc::new(BinaryCodec), &["bin", "gob"]);
        registry.register(names::TEXT, Arc::new(TextCodec::new(&config.text_alphabet)?), &[]);
        registry.register(names::TEXTS, Arc::new(TextsCodec::new(&config.text_alphabet)?), &[]);
        let digit = DigitCodec::new(&config.digit_alphabet, &config.salt, config.digit_length)?;
        registry.register(names::DIGITS, Arc::new(DigitsCodec::new(digit.clone())), &[]);
        registry.register(names::DIGIT, Arc::new(digit), &[]);
        Ok(registry)
    }

    /// Register a codec under `name` and every alias.
    pub fn register(&self, name: &str, codec: Arc<dyn Codec>, aliases: &[&str]) {
        let mut codecs = self.codecs.write();
        for key in std::iter::once(name).chain(aliases.iter().copied()) {
            let key = key.to_lowercase();
            if self.policy.admit("codec", &key, codecs.contains_key(&key)) {
                codecs.insert(key, Arc::clone(&codec));
            }
        }
        debug!("Registered codec '{}'", name);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.codecs.read().contains_key(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Codec>, CodecError> {
        self.codecs
            .read()
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| CodecError::UnknownCodec(name.to_string()))
    }

    pub fn encode(&self, name: &str, value: &Value) -> Result<Value, CodecError> {
        self.get(name)?.encode(value)
    }

    pub fn decode(&self, name: &str, data: &Value) -> Result<Value, CodecError> {
        self.get(name)?.decode(data)
    }

    /// Encode to raw bytes.
    pub fn marshal(&self, name: &str, value: &Value) -> Result<Vec<u8>, CodecError> {
        match self.encode(name, value)? {
            Value::Bytes(b) => Ok(b),
            Value::Str(s) => Ok(s.into_bytes()),
            other => Ok(other.to_string().into_bytes()),
        }
    }

    pub fn unmarshal(&self, name: &str, data: &[u8]) -> Result<Value, CodecError> {
        self.decode(name, &Value::Bytes(data.to_vec()))
    }

    /// Encode to a transmissible string.
    pub fn encrypt(&self, name: &str, value: &Value) -> Result<String, CodecError> {
        match self.encode(name, value)? {
            Value::Str(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|_| {
                CodecError::InvalidData(format!("codec '{}' produced non-text output", name))
            }),
            other => Ok(other.to_string()),
        }
    }

    pub fn decrypt(&self, name: &str, text: &str) -> Result<Value, CodecError> {
        self.decode(name, &Value::Str(text.to_string()))
    }

    pub fn encrypt_text(&self, text: &str) -> Result<String, CodecError> {
        self.encrypt(names::TEXT, &Value::from(text))
    }

    pub fn decrypt_text(&self, text: &str) -> Result<String, CodecError> {
        match self.decrypt(names::TEXT, text)? {
            Value::Str(s) => Ok(s),
            _ => Err(CodecError::InvalidData("decoded text is not utf-8".into())),
        }
    }

    pub fn encrypt_texts(&self, texts: &[String]) -> Result<String, CodecError> {
        self.encrypt(names::TEXTS, &Value::list(texts.iter().cloned()))
    }

    pub fn decrypt_texts(&self, text: &str) -> Result<Vec<String>, CodecError> {
        match self.decrypt(names::TEXTS, text)? {
            Value::List(items) => Ok(items.into_iter().map(|v| v.to_string()).collect()),
            _ => Err(CodecError::InvalidData("decoded texts are not a list".into())),
        }
    }

    pub fn encrypt_digit(&self, number: i64) -> Result<String, CodecError> {
        self.encrypt(names::DIGIT, &Value::Int(number))
    }

    pub fn decrypt_digit(&self, text: &str) -> Result<i64, CodecError> {
        self.decrypt(names::DIGIT, text)?
            .as_i64()
            .ok_or_else(|| CodecError::InvalidData("digit out of range".into()))
    }

    pub fn encrypt_digits(&self, numbers: &[i64]) -> Result<String, CodecError> {
        self.encrypt(names::DIGITS, &Value::list(numbers.iter().copied()))
    }

    pub fn decrypt_digits(&self, text: &str) -> Result<Vec<i64>, CodecError> {
        match self.decrypt(names::DIGITS, text)? {
            Value::List(items) => items
                .iter()
                .map(|v| {
                    v.as_i64()
                        .ok_or_else(|| CodecError::InvalidData("digit out of range".into()))
                })
                .collect(),
            _ => Err(CodecError::InvalidData("decoded digits are not a list".into())),
        }
    }

    pub fn marshal_json(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        self.marshal(names::JSON, value)
    }

    pub fn unmarshal_json(&self, data: &[u8]) -> Result<Value, CodecError> {
        self.unmarshal(names::JSON, data)
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    /// Next unique id, obfuscated through the digit codec and prefixed.
    ///
    /// Falls back to plain decimal when no digit codec is registered.
    pub fn generate(&self, prefix: &str) -> String {
        let id = self.sequence.next();
        let body = match self.encrypt_digit(id) {
            Ok(code) => code,
            Err(e) => {
                warn!("Digit codec unavailable for id generation: {}", e);
                id.to_string()
            }
        };
        format!("{}{}", prefix, body)
    }
}
