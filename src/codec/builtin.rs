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

//! Built-in codecs.
//!
//! - `json`: structural serializer for nested records and lists.
//! - `binary`: bincode over [`Value`], keeps integers, bytes and timestamps.
//! - `text`: base64 over a configurable alphabet.
//! - `texts`: newline-joined string lists through the same alphabet.
//! - `digit`: salted integer obfuscation with a minimum output length.
//! - `digits`: lists of `digit` codes joined by a reserved separator.

use crate::codec::registry::Codec;
use crate::engine_core::errors::CodecError;
use crate::engine_core::value::Value;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::Engine as _;

pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        serde_json::to_vec(&value.to_json())
            .map(Value::Bytes)
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        let bytes = raw_bytes(data)?;
        let json: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CodecError::InvalidData(e.to_string()))?;
        Ok(Value::from_json(json))
    }
}

pub struct BinaryCodec;

impl Codec for BinaryCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        bincode::serialize(value)
            .map(Value::Bytes)
            .map_err(|e| CodecError::Serialization(e.to_string()))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        bincode::deserialize(raw_bytes(data)?).map_err(|e| CodecError::InvalidData(e.to_string()))
    }
}

fn raw_bytes(data: &Value) -> Result<&[u8], CodecError> {
    match data {
        Value::Bytes(b) => Ok(b),
        Value::Str(s) => Ok(s.as_bytes()),
        other => Err(CodecError::InvalidData(format!(
            "expected bytes, got {}",
            other.kind()
        ))),
    }
}

fn text_engine(alphabet: &str) -> Result<GeneralPurpose, CodecError> {
    let alphabet = Alphabet::new(alphabet)
        .map_err(|e| CodecError::InvalidData(format!("text alphabet: {}", e)))?;
    Ok(GeneralPurpose::new(&alphabet, PAD))
}

fn decode_text(engine: &GeneralPurpose, data: &Value) -> Result<Vec<u8>, CodecError> {
    let text = match data {
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => String::from_utf8(b.clone())
            .map_err(|_| CodecError::InvalidData("text is not utf-8".into()))?,
        other => other.to_string(),
    };
    engine
        .decode(text.trim())
        .map_err(|e| CodecError::InvalidData(e.to_string()))
}

/// Base64 over a custom alphabet. Decodes to a string when the bytes are
/// valid utf-8, to raw bytes otherwise.
pub struct TextCodec {
    engine: GeneralPurpose,
}

impl TextCodec {
    pub fn new(alphabet: &str) -> Result<Self, CodecError> {
        Ok(Self {
            engine: text_engine(alphabet)?,
        })
    }
}

impl Codec for TextCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        let bytes = match value {
            Value::Bytes(b) => b.clone(),
            Value::Str(s) => s.as_bytes().to_vec(),
            other => other.to_string().into_bytes(),
        };
        Ok(Value::Str(self.engine.encode(bytes)))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        let bytes = decode_text(&self.engine, data)?;
        Ok(match String::from_utf8(bytes) {
            Ok(s) => Value::Str(s),
            Err(e) => Value::Bytes(e.into_bytes()),
        })
    }
}

pub struct TextsCodec {
    engine: GeneralPurpose,
}

impl TextsCodec {
    pub fn new(alphabet: &str) -> Result<Self, CodecError> {
        Ok(Self {
            engine: text_engine(alphabet)?,
        })
    }
}

impl Codec for TextsCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        let text = match value {
            Value::List(items) => items
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            other => other.to_string(),
        };
        Ok(Value::Str(self.engine.encode(text)))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        let bytes = decode_text(&self.engine, data)?;
        let text =
            String::from_utf8(bytes).map_err(|_| CodecError::InvalidData("texts are not utf-8".into()))?;
        if text.is_empty() {
            return Ok(Value::List(Vec::new()));
        }
        Ok(Value::List(text.split('\n').map(Value::from).collect()))
    }
}

/// Salted integer obfuscation.
///
/// The first output character is a lottery picked from the number itself;
/// the body is the number in base `alphabet.len()` over an alphabet shuffled
/// with the lottery and salt. Short outputs are padded after a guard
/// character that never appears in the body. A second reserved character
/// separates the codes of a [`DigitsCodec`] list.
#[derive(Clone)]
pub struct DigitCodec {
    alphabet: Vec<char>,
    guard: char,
    separator: char,
    salt: String,
    min_length: usize,
}

const MIN_DIGIT_ALPHABET: usize = 16;

impl DigitCodec {
    pub fn new(alphabet: &str, salt: &str, min_length: usize) -> Result<Self, CodecError> {
        let mut chars: Vec<char> = Vec::new();
        for c in alphabet.chars() {
            if !c.is_whitespace() && !chars.contains(&c) {
                chars.push(c);
            }
        }
        if chars.len() < MIN_DIGIT_ALPHABET {
            return Err(CodecError::InvalidData(format!(
                "digit alphabet needs at least {} unique characters",
                MIN_DIGIT_ALPHABET
            )));
        }
        shuffle(&mut chars, salt);
        let guard = chars.remove(0);
        let separator = chars.remove(0);
        Ok(Self {
            alphabet: chars,
            guard,
            separator,
            salt: salt.to_string(),
            min_length,
        })
    }

    fn working(&self, lottery: char) -> Vec<char> {
        let mut working = self.alphabet.clone();
        shuffle(&mut working, &format!("{}{}", lottery, self.salt));
        working
    }

    pub fn encode_number(&self, number: u64) -> String {
        let base = self.alphabet.len() as u64;
        let lottery = self.alphabet[(number % base) as usize];
        let working = self.working(lottery);

        let mut body = Vec::new();
        let mut rest = number;
        loop {
            body.push(working[(rest % base) as usize]);
            rest /= base;
            if rest == 0 {
                break;
            }
        }
        body.reverse();

        let mut out = String::with_capacity(self.min_length.max(body.len() + 1));
        out.push(lottery);
        out.extend(body);
        let mut len = out.chars().count();
        if len < self.min_length {
            out.push(self.guard);
            len += 1;
            let mut i = 0usize;
            while len < self.min_length {
                let idx = (number as usize).wrapping_add(i.wrapping_mul(7)) % working.len();
                out.push(working[idx]);
                len += 1;
                i += 1;
            }
        }
        out
    }

    pub fn decode_number(&self, text: &str) -> Result<u64, CodecError> {
        let invalid = || CodecError::InvalidData(format!("not a digit code: {}", text));
        let significant: Vec<char> = text.chars().take_while(|c| *c != self.guard).collect();
        let (lottery, body) = significant.split_first().ok_or_else(invalid)?;
        if body.is_empty() || !self.alphabet.contains(lottery) {
            return Err(invalid());
        }
        let working = self.working(*lottery);
        let base = working.len() as u64;
        let mut number: u64 = 0;
        for c in body {
            let digit = working.iter().position(|w| w == c).ok_or_else(invalid)? as u64;
            number = number
                .checked_mul(base)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(invalid)?;
        }
        if self.encode_number(number) != text {
            return Err(invalid());
        }
        Ok(number)
    }
}

fn digit_operand(value: &Value) -> Result<u64, CodecError> {
    value.as_u64().ok_or_else(|| {
        CodecError::InvalidData(format!("digit codec needs a non-negative integer, got {}", value.kind()))
    })
}

fn digit_value(number: u64) -> Value {
    match i64::try_from(number) {
        Ok(n) => Value::Int(n),
        Err(_) => Value::UInt(number),
    }
}

fn code_text(data: &Value) -> String {
    match data {
        Value::Str(s) => s.trim().to_string(),
        Value::Bytes(b) => String::from_utf8_lossy(b).trim().to_string(),
        other => other.to_string(),
    }
}

impl Codec for DigitCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        Ok(Value::Str(self.encode_number(digit_operand(value)?)))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        Ok(digit_value(self.decode_number(&code_text(data))?))
    }
}

/// Integer lists as separator-joined `digit` codes. A single `digit` code
/// decodes to a one item list.
pub struct DigitsCodec {
    digit: DigitCodec,
}

impl DigitsCodec {
    pub fn new(digit: DigitCodec) -> Self {
        Self { digit }
    }

    pub fn encode_numbers(&self, numbers: &[u64]) -> String {
        numbers
            .iter()
            .map(|n| self.digit.encode_number(*n))
            .collect::<Vec<_>>()
            .join(&self.digit.separator.to_string())
    }

    pub fn decode_numbers(&self, text: &str) -> Result<Vec<u64>, CodecError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        text.split(self.digit.separator)
            .map(|code| self.digit.decode_number(code))
            .collect()
    }
}

impl Codec for DigitsCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        let numbers = match value {
            Value::List(items) => items.iter().map(digit_operand).collect::<Result<Vec<_>, _>>()?,
            other => vec![digit_operand(other)?],
        };
        Ok(Value::Str(self.encode_numbers(&numbers)))
    }

    fn decode(&self, data: &Value) -> Result<Value, CodecError> {
        let numbers = self.decode_numbers(&code_text(data))?;
        Ok(Value::List(numbers.into_iter().map(digit_value).collect()))
    }
}

/// Deterministic salt-driven permutation.
fn shuffle(chars: &mut [char], salt: &str) {
    let salt: Vec<usize> = salt.chars().map(|c| c as usize).collect();
    if salt.is_empty() || chars.len() < 2 {
        return;
    }
    let mut v = 0usize;
    let mut p = 0usize;
    let mut i = chars.len() - 1;
    while i > 0 {
        v %= salt.len();
        let n = salt[v];
        p += n;
        let j = (n + v + p) % i;
        chars.swap(i, j);
        i -= 1;
        v += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_core::constants::codec::{DEFAULT_DIGIT_ALPHABET, DEFAULT_TEXT_ALPHABET};
    use crate::engine_core::value::Map;

    #[test]
    fn test_text_round_trip_uses_custom_alphabet() {
        let codec = TextCodec::new(DEFAULT_TEXT_ALPHABET).unwrap();
        let encoded = codec.encode(&Value::from("hello world")).unwrap();
        let text = encoded.as_str().unwrap().to_string();
        assert!(text
            .chars()
            .all(|c| DEFAULT_TEXT_ALPHABET.contains(c) || c == '='));
        assert_eq!(codec.decode(&encoded).unwrap(), Value::from("hello world"));
    }

    #[test]
    fn test_text_keeps_non_utf8_bytes() {
        let codec = TextCodec::new(DEFAULT_TEXT_ALPHABET).unwrap();
        let raw = Value::bytes(vec![0xff, 0x00, 0xfe]);
        let encoded = codec.encode(&raw).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), raw);
    }

    #[test]
    fn test_texts_round_trip() {
        let codec = TextsCodec::new(DEFAULT_TEXT_ALPHABET).unwrap();
        let list = Value::list(["a", "b c", "d"]);
        let encoded = codec.encode(&list).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), list);
        let empty = codec.encode(&Value::List(vec![])).unwrap();
        assert_eq!(codec.decode(&empty).unwrap(), Value::List(vec![]));
    }

    #[test]
    fn test_binary_preserves_native_types() {
        let mut record = Map::new();
        record.insert("n".into(), Value::UInt(u64::MAX));
        record.insert("b".into(), Value::bytes(vec![1, 2, 3]));
        record.insert("t".into(), Value::from(chrono::Utc::now()));
        let value = Value::Map(record);
        let encoded = BinaryCodec.encode(&value).unwrap();
        assert_eq!(BinaryCodec.decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_json_rejects_garbage() {
        assert!(JsonCodec.decode(&Value::from("{not json")).is_err());
        assert!(JsonCodec.decode(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_digit_round_trip_and_length() {
        let codec = DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "bindery", 7).unwrap();
        for n in [0u64, 1, 55, 56, 9_999, 1 << 40, i64::MAX as u64] {
            let code = codec.encode_number(n);
            assert!(code.chars().count() >= 7, "{} -> {}", n, code);
            assert_eq!(codec.decode_number(&code).unwrap(), n);
        }
    }

    #[test]
    fn test_digit_salt_changes_output() {
        let a = DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "one", 7).unwrap();
        let b = DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "two", 7).unwrap();
        assert_ne!(a.encode_number(123_456), b.encode_number(123_456));
    }

    #[test]
    fn test_digits_round_trip_lists() {
        let digit = DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "bindery", 7).unwrap();
        let codec = DigitsCodec::new(digit.clone());
        let list = Value::list([1i64, 2, 3, 1 << 40]);
        let encoded = codec.encode(&list).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), list);

        let empty = codec.encode(&Value::List(vec![])).unwrap();
        assert_eq!(empty, Value::from(""));
        assert_eq!(codec.decode(&empty).unwrap(), Value::List(vec![]));

        let single = Value::from(digit.encode_number(77));
        assert_eq!(codec.decode(&single).unwrap(), Value::list([77i64]));
    }

    #[test]
    fn test_digits_rejects_negative_and_garbage() {
        let codec = DigitsCodec::new(DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "bindery", 7).unwrap());
        assert!(codec.encode(&Value::list([1i64, -2])).is_err());
        assert!(codec.encode(&Value::list(["x"])).is_err());
        assert!(codec.decode(&Value::from("!!!!")).is_err());
    }

    #[test]
    fn test_digit_rejects_tampering() {
        let codec = DigitCodec::new(DEFAULT_DIGIT_ALPHABET, "bindery", 7).unwrap();
        assert!(codec.decode_number("").is_err());
        assert!(codec.decode_number("!!!!").is_err());
        assert!(DigitCodec::new("abc", "x", 4).is_err());
    }
}
