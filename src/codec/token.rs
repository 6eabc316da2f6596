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

//! Signed tokens.
//!
//! Format: `{header}.{payload}.{signature}`. The header is JSON, the payload
//! goes through the configured payload codec (binary by default); both are
//! then run through the `text` codec. The signature is HMAC-SHA256 over
//! `header.payload`, base64url without padding.

use crate::codec::registry::CodecRegistry;
use crate::engine_core::constants::{codec as names, token as consts};
use crate::engine_core::errors::TokenError;
use crate::engine_core::traits::TokenValidator;
use crate::engine_core::value::{Map, Value};
use crate::utils::time::now_secs;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Token header. Zero timestamps mean "unbounded".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenHeader {
    #[serde(rename = "i", default)]
    pub id: String,
    #[serde(rename = "t", default, skip_serializing_if = "is_zero")]
    pub issued: i64,
    #[serde(rename = "b", default, skip_serializing_if = "is_zero")]
    pub not_before: i64,
    #[serde(rename = "e", default, skip_serializing_if = "is_zero")]
    pub expires: i64,
    #[serde(rename = "a", default)]
    pub authorized: bool,
    #[serde(rename = "r", default, skip_serializing_if = "String::is_empty")]
    pub role: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Token {
    pub header: TokenHeader,
    pub payload: Map,
}

impl Token {
    pub fn new(payload: Map) -> Self {
        Self {
            header: TokenHeader {
                issued: now_secs(),
                ..Default::default()
            },
            payload,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.header.id = id.into();
        self
    }

    pub fn authorized(mut self, authorized: bool) -> Self {
        self.header.authorized = authorized;
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.header.role = role.into();
        self
    }

    /// Expire `ttl` from now.
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.header.expires = now_secs() + ttl.as_secs() as i64;
        self
    }

    pub fn expires_at(mut self, unix_secs: i64) -> Self {
        self.header.expires = unix_secs;
        self
    }

    pub fn not_before(mut self, unix_secs: i64) -> Self {
        self.header.not_before = unix_secs;
        self
    }

    /// Whether `now` lies inside the inclusive validity window.
    pub fn in_window(&self, now: i64) -> bool {
        let begin = self.header.not_before;
        let end = self.header.expires;
        (begin == 0 || now >= begin) && (end == 0 || now <= end)
    }
}

pub struct TokenCodec {
    secret: Vec<u8>,
    payload_codec: String,
    default_ttl: Option<Duration>,
    codecs: Arc<CodecRegistry>,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, codecs: Arc<CodecRegistry>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            payload_codec: consts::DEFAULT_PAYLOAD_CODEC.to_string(),
            default_ttl: None,
            codecs,
        }
    }

    pub fn with_payload_codec(mut self, codec: impl Into<String>) -> Self {
        self.payload_codec = codec.into();
        self
    }

    /// Lifetime used by [`issue`](Self::issue) when none is given.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Fresh token identity from the kernel's id sequence.
    pub fn new_id(&self) -> String {
        self.codecs.generate("")
    }

    fn signature(&self, data: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        mac.update(data.as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, token: &Token) -> Result<String, TokenError> {
        let header_json =
            serde_json::to_vec(&token.header).map_err(|e| TokenError::Signing(e.to_string()))?;
        let header = self.codecs.encrypt(names::TEXT, &Value::Bytes(header_json))?;

        let payload_raw = self
            .codecs
            .encode(&self.payload_codec, &Value::Map(token.payload.clone()))?;
        let payload = self.codecs.encrypt(names::TEXT, &payload_raw)?;

        let data = format!("{}.{}", header, payload);
        let sig = self.signature(&data)?.finalize().into_bytes();
        Ok(format!("{}.{}", data, URL_SAFE_NO_PAD.encode(sig)))
    }

    /// Check the signature, decode both parts and apply the validity window.
    ///
    /// A token outside its window verifies but comes back unauthorized.
    pub fn verify(&self, text: &str) -> Result<Token, TokenError> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != consts::SEGMENTS {
            return Err(TokenError::InvalidToken);
        }
        let (header, payload, sig) = (parts[0], parts[1], parts[2]);

        let provided = URL_SAFE_NO_PAD
            .decode(sig)
            .map_err(|_| TokenError::BadSignature)?;
        self.signature(&format!("{}.{}", header, payload))?
            .verify_slice(&provided)
            .map_err(|_| TokenError::BadSignature)?;

        let header_bytes = self
            .codecs
            .decrypt(names::TEXT, header)?
            .into_bytes()
            .ok_or_else(|| TokenError::Malformed("header".into()))?;
        let mut header: TokenHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| TokenError::Malformed(format!("header: {}", e)))?;

        let payload_bytes = self
            .codecs
            .decrypt(names::TEXT, payload)?
            .into_bytes()
            .ok_or_else(|| TokenError::Malformed("payload".into()))?;
        let payload = self
            .codecs
            .decode(&self.payload_codec, &Value::Bytes(payload_bytes))?
            .into_map()
            .ok_or_else(|| TokenError::Malformed("payload is not a record".into()))?;

        let mut token = Token {
            header: header.clone(),
            payload,
        };
        if header.authorized && !token.in_window(now_secs()) {
            debug!("Token {} outside its validity window", header.id);
            header.authorized = false;
            token.header = header;
        }
        Ok(token)
    }

    /// Mint a token with a fresh id.
    pub fn issue(
        &self,
        authorized: bool,
        payload: Map,
        ttl: Option<Duration>,
        role: &str,
    ) -> Result<(Token, String), TokenError> {
        let mut token = Token::new(payload)
            .with_id(self.new_id())
            .authorized(authorized)
            .role(role);
        if let Some(ttl) = ttl.or(self.default_ttl) {
            token = token.expires_in(ttl);
        }
        let text = self.sign(&token)?;
        Ok((token, text))
    }
}

impl TokenValidator for TokenCodec {
    fn validate(&self, token: &str) -> Result<(), TokenError> {
        self.verify(token).map(|_| ())
    }
}
