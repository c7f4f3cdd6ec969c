//! Text encoding of a [`SecurityContext`] for the propagation channel.
//!
//! Token layout:
//!
//! ```text
//! dsc1.<base64url(payload)>.<hex(blake3(payload)[..8])>
//! ```
//!
//! where `payload` is the JSON document
//! `{"v":1,"filter":<string|null>,"fields":<[selector]|null>}` and each
//! selector is `{"include":<name>}` or `{"exclude":<name>}`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::context::SecurityContext;
use super::error::{SecurityError, SecurityResult};
use super::field_spec::{FieldSelector, FieldVisibilitySpec};

/// Token prefix, including the format version.
pub const TOKEN_PREFIX: &str = "dsc1";

/// Payload version understood by this codec.
pub const PAYLOAD_VERSION: u32 = 1;

const CHECKSUM_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    v: u32,
    filter: Option<String>,
    fields: Option<Vec<FieldSelector>>,
}

/// Converts security contexts to and from tokens.
pub struct SecurityContextCodec;

impl SecurityContextCodec {
    /// Encode a context into a token.
    ///
    /// Returns `None` when the context cannot be serialized; the caller then
    /// behaves as if no context were available.
    pub fn encode(context: &SecurityContext) -> Option<String> {
        let payload = Payload {
            v: PAYLOAD_VERSION,
            filter: context.row_predicate.clone(),
            fields: context.field_spec.as_ref().map(|spec| spec.selectors().to_vec()),
        };

        let json = match serde_json::to_vec(&payload) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize security context");
                return None;
            }
        };

        Some(format!(
            "{TOKEN_PREFIX}.{}.{}",
            URL_SAFE_NO_PAD.encode(&json),
            checksum(&json)
        ))
    }

    /// Decode a token.
    ///
    /// An absent token decodes to `Ok(None)`. A token that is present but
    /// malformed, corrupted or of an unknown version is an error.
    pub fn decode(token: Option<&str>) -> SecurityResult<Option<SecurityContext>> {
        let token = match token {
            Some(token) => token.trim(),
            None => return Ok(None),
        };

        let mut parts = token.split('.');
        let (prefix, body, sum) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(body), Some(sum), None) => (prefix, body, sum),
            _ => return Err(SecurityError::ContextDecode("malformed token".to_string())),
        };

        if prefix != TOKEN_PREFIX {
            return Err(SecurityError::ContextDecode(format!(
                "unsupported token format '{prefix}'"
            )));
        }

        let json = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(|e| SecurityError::ContextDecode(format!("invalid payload encoding: {e}")))?;

        if checksum(&json) != sum {
            return Err(SecurityError::ContextDecode("checksum mismatch".to_string()));
        }

        let payload: Payload = serde_json::from_slice(&json)
            .map_err(|e| SecurityError::ContextDecode(format!("invalid payload: {e}")))?;

        if payload.v != PAYLOAD_VERSION {
            return Err(SecurityError::ContextDecode(format!(
                "unsupported payload version {}",
                payload.v
            )));
        }

        Ok(Some(SecurityContext {
            row_predicate: payload.filter,
            field_spec: payload.fields.map(FieldVisibilitySpec::from_selectors),
        }))
    }
}

fn checksum(bytes: &[u8]) -> String {
    hex::encode(&blake3::hash(bytes).as_bytes()[..CHECKSUM_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip() {
        let context = SecurityContext::with_predicate(r#"{"Eq":{"field":"title","value":"a1"}}"#)
            .with_field_spec(FieldVisibilitySpec::new(["title", "~secret"]));

        let token = SecurityContextCodec::encode(&context).unwrap();
        assert!(token.starts_with("dsc1."));
        assert_eq!(SecurityContextCodec::decode(Some(&token)).unwrap(), Some(context));
    }

    #[test]
    fn test_roundtrip_unrestricted() {
        let context = SecurityContext::unrestricted();
        let token = SecurityContextCodec::encode(&context).unwrap();
        assert_eq!(SecurityContextCodec::decode(Some(&token)).unwrap(), Some(context));
    }

    #[test]
    fn test_roundtrip_keeps_raw_field_names() {
        for spec in [
            FieldVisibilitySpec::include(["~secret"]),
            FieldVisibilitySpec::include([" title "]),
            FieldVisibilitySpec::exclude(["~~x", ""]),
            FieldVisibilitySpec::default(),
        ] {
            let context = SecurityContext::unrestricted().with_field_spec(spec);
            let token = SecurityContextCodec::encode(&context).unwrap();
            assert_eq!(SecurityContextCodec::decode(Some(&token)).unwrap(), Some(context));
        }
    }

    #[test]
    fn test_absent_token() {
        assert_eq!(SecurityContextCodec::decode(None).unwrap(), None);
    }

    #[test]
    fn test_corrupt_tokens_rejected() {
        let token = SecurityContextCodec::encode(&SecurityContext::with_predicate("x")).unwrap();
        let truncated = &token[..token.len() - 2];
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[0] = "dsc9";
        let wrong_prefix = parts.join(".");

        for bad in ["", "garbage", "dsc1.%%%.00", truncated, wrong_prefix.as_str()] {
            assert!(
                matches!(SecurityContextCodec::decode(Some(bad)), Err(SecurityError::ContextDecode(_))),
                "expected decode failure for {bad:?}"
            );
        }
    }

    #[test]
    fn test_wrong_version_rejected() {
        let json = br#"{"v":2,"filter":null,"fields":null}"#;
        let token = format!("dsc1.{}.{}", URL_SAFE_NO_PAD.encode(json), checksum(json));
        let err = SecurityContextCodec::decode(Some(&token)).unwrap_err();
        assert!(err.to_string().contains("version 2"));
    }
}
