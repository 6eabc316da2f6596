use bindery::codec::registry::CodecRegistry;
use bindery::codec::token::{Token, TokenCodec};
use bindery::config::CodecConfig;
use bindery::engine_core::errors::TokenError;
use bindery::engine_core::policy::OverridePolicy;
use bindery::engine_core::traits::TokenValidator;
use bindery::engine_core::value::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

fn codecs() -> Arc<CodecRegistry> {
    Arc::new(
        CodecRegistry::with_builtins(&CodecConfig::default(), 3, Arc::new(OverridePolicy::default()))
            .unwrap(),
    )
}

fn claims() -> Map {
    let mut claims = Map::new();
    claims.insert("uid".into(), Value::Int(42));
    claims.insert("name".into(), Value::from("ada"));
    claims
}

#[test]
fn test_sign_verify_round_trip() {
    let codec = TokenCodec::new("s1", codecs());
    let (issued, text) = codec.issue(true, claims(), Some(Duration::from_secs(60)), "admin").unwrap();
    let token = codec.verify(&text).unwrap();
    assert_eq!(token.header.id, issued.header.id);
    assert!(token.header.authorized);
    assert_eq!(token.header.role, "admin");
    assert_eq!(token.payload, claims());
    assert!(codec.validate(&text).is_ok());
}

#[test]
fn test_expired_token_verifies_unauthorized() {
    let codec = TokenCodec::new("s1", codecs());
    let token = Token::new(claims())
        .with_id("t-1")
        .authorized(true)
        .expires_at(1);
    let text = codec.sign(&token).unwrap();
    let verified = codec.verify(&text).unwrap();
    assert!(!verified.header.authorized);
    assert_eq!(verified.payload, claims());
}

#[test]
fn test_other_secret_rejects() {
    let text = TokenCodec::new("s1", codecs())
        .issue(true, claims(), None, "")
        .unwrap()
        .1;
    let other = TokenCodec::new("s2", codecs());
    assert_eq!(other.verify(&text), Err(TokenError::BadSignature));
}

#[test]
fn test_tampered_payload_rejects() {
    let codec = TokenCodec::new("s1", codecs());
    let (_, text) = codec.issue(false, claims(), None, "").unwrap();
    let (_, forged) = codec.issue(true, Map::new(), None, "").unwrap();

    let parts: Vec<&str> = text.split('.').collect();
    let forged_parts: Vec<&str> = forged.split('.').collect();
    let spliced = format!("{}.{}.{}", forged_parts[0], parts[1], parts[2]);
    assert_eq!(codec.verify(&spliced), Err(TokenError::BadSignature));
}

#[test]
fn test_structure_errors() {
    let codec = TokenCodec::new("s1", codecs());
    assert_eq!(codec.verify("only.two"), Err(TokenError::InvalidToken));
    assert_eq!(codec.verify("a.b.c.d"), Err(TokenError::InvalidToken));
    assert!(codec.verify("a.b.!!!").is_err());
}

#[test]
fn test_json_payload_codec() {
    let codec = TokenCodec::new("s1", codecs()).with_payload_codec("json");
    let (_, text) = codec.issue(true, claims(), None, "").unwrap();
    assert_eq!(codec.verify(&text).unwrap().payload, claims());
}
