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

use crate::engine_core::constants::{codec, config as keys, locale, sequence, token};
use crate::engine_core::errors::KernelError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum RunMode {
    #[default]
    Developing,
    Testing,
    Preview,
    Production,
}

impl RunMode {
    pub fn parse_safe(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "t" | "test" | "testing" => RunMode::Testing,
            "pre" | "preview" => RunMode::Preview,
            "pro" | "prod" | "production" => RunMode::Production,
            _ => RunMode::Developing,
        }
    }
}

/// Codec and id generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub text_alphabet: String,
    pub digit_alphabet: String,
    pub salt: String,
    pub digit_length: usize,
    pub start: DateTime<Utc>,
    pub time_bits: u8,
    pub node_bits: u8,
    pub step_bits: u8,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            text_alphabet: codec::DEFAULT_TEXT_ALPHABET.to_string(),
            digit_alphabet: codec::DEFAULT_DIGIT_ALPHABET.to_string(),
            salt: codec::DEFAULT_SALT.to_string(),
            digit_length: codec::DEFAULT_DIGIT_LENGTH,
            start: Utc
                .timestamp_millis_opt(sequence::DEFAULT_START_MS)
                .single()
                .unwrap_or_default(),
            time_bits: sequence::DEFAULT_TIME_BITS,
            node_bits: sequence::DEFAULT_NODE_BITS,
            step_bits: sequence::DEFAULT_STEP_BITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Falls back to the kernel secret, then the kernel name
    pub secret: Option<String>,
    pub codec: String,
    /// Default lifetime in seconds for issued tokens
    pub expire: Option<u64>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            codec: token::DEFAULT_PAYLOAD_CODEC.to_string(),
            expire: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub name: String,
    pub role: String,
    pub version: String,
    pub node: Option<u64>,
    pub secret: Option<String>,
    pub mode: RunMode,
    /// Later registrations under an existing key replace it
    #[serde(rename = "override")]
    pub override_existing: bool,
    pub locale: String,
    pub log_level: String,
    pub log_format: String, // "json" or "text"
    pub codec: CodecConfig,
    pub token: TokenConfig,
}

fn flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn bits(key: &str, value: &str) -> Result<u8, KernelError> {
    value
        .trim()
        .parse()
        .map_err(|_| KernelError::ConfigurationError(format!("{} must be an integer", key)))
}

impl Config {
    pub fn from_env() -> Result<Self, KernelError> {
        let mut config = match env::var(keys::ENV_CONFIG_PATH) {
            Ok(path) => Self::from_yaml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, KernelError> {
        serde_yaml_ng::from_str(content)
            .map_err(|e| KernelError::ConfigurationError(format!("invalid config: {}", e)))
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self, KernelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Overlay `BINDERY_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), KernelError> {
        if let Ok(v) = env::var(keys::ENV_NAME) {
            self.name = v;
        }
        if let Ok(v) = env::var(keys::ENV_ROLE) {
            self.role = v;
        }
        if let Ok(v) = env::var(keys::ENV_VERSION) {
            self.version = v;
        }
        if let Ok(v) = env::var(keys::ENV_NODE) {
            let node = v.parse().map_err(|_| {
                KernelError::ConfigurationError(format!("{} must be an integer", keys::ENV_NODE))
            })?;
            self.node = Some(node);
        }
        if let Ok(v) = env::var(keys::ENV_SECRET) {
            self.secret = Some(v);
        }
        if let Ok(v) = env::var(keys::ENV_SALT) {
            self.codec.salt = v;
        }
        if let Ok(v) = env::var(keys::ENV_MODE) {
            self.mode = RunMode::parse_safe(&v);
        }
        if let Ok(v) = env::var(keys::ENV_OVERRIDE) {
            self.override_existing = flag(&v);
        }
        if let Ok(v) = env::var(keys::ENV_LOCALE) {
            self.locale = v;
        }
        if let Ok(v) = env::var(keys::ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        if let Ok(v) = env::var(keys::ENV_LOG_FORMAT) {
            self.log_format = v;
        }
        if let Ok(v) = env::var(keys::ENV_TOKEN_SECRET) {
            self.token.secret = Some(v);
        }
        if let Ok(v) = env::var(keys::ENV_TOKEN_CODEC) {
            self.token.codec = v;
        }
        if let Ok(v) = env::var(keys::ENV_TOKEN_EXPIRE) {
            let secs = v.parse().map_err(|_| {
                KernelError::ConfigurationError(format!("{} must be seconds", keys::ENV_TOKEN_EXPIRE))
            })?;
            self.token.expire = Some(secs);
        }
        if let Ok(v) = env::var(keys::ENV_TEXT_ALPHABET) {
            self.codec.text_alphabet = v;
        }
        if let Ok(v) = env::var(keys::ENV_DIGIT_ALPHABET) {
            self.codec.digit_alphabet = v;
        }
        if let Ok(v) = env::var(keys::ENV_DIGIT_LENGTH) {
            self.codec.digit_length = v.parse().map_err(|_| {
                KernelError::ConfigurationError(format!("{} must be an integer", keys::ENV_DIGIT_LENGTH))
            })?;
        }
        if let Ok(v) = env::var(keys::ENV_ID_TIME_BITS) {
            self.codec.time_bits = bits(keys::ENV_ID_TIME_BITS, &v)?;
        }
        if let Ok(v) = env::var(keys::ENV_ID_NODE_BITS) {
            self.codec.node_bits = bits(keys::ENV_ID_NODE_BITS, &v)?;
        }
        if let Ok(v) = env::var(keys::ENV_ID_STEP_BITS) {
            self.codec.step_bits = bits(keys::ENV_ID_STEP_BITS, &v)?;
        }
        if let Ok(v) = env::var(keys::ENV_ID_START) {
            let start = DateTime::parse_from_rfc3339(v.trim()).map_err(|_| {
                KernelError::ConfigurationError(format!("{} must be an RFC 3339 time", keys::ENV_ID_START))
            })?;
            self.codec.start = start.with_timezone(&Utc);
        }
        Ok(())
    }

    /// Configured node id, or one derived from the kernel identity.
    pub fn node_id(&self) -> u64 {
        if let Some(node) = self.node {
            return node;
        }
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.role.as_bytes());
        hasher.update(self.version.as_bytes());
        hasher.update(self.secret.as_deref().unwrap_or_default().as_bytes());
        hasher.update(self.codec.salt.as_bytes());
        let digest = hex::encode(hasher.finalize());
        u64::from_str_radix(&digest[..8], 16).unwrap_or_default()
    }

    pub fn token_secret(&self) -> String {
        self.token
            .secret
            .clone()
            .or_else(|| self.secret.clone())
            .unwrap_or_else(|| self.name.clone())
    }

    pub fn is_production(&self) -> bool {
        self.mode == RunMode::Production
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "bindery".to_string(),
            role: String::new(),
            version: "0.1.0".to_string(),
            node: None,
            secret: None,
            mode: RunMode::Developing,
            override_existing: true,
            locale: locale::DEFAULT.to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            codec: CodecConfig::default(),
            token: TokenConfig::default(),
        }
    }
}
