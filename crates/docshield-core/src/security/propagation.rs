//! Request-scoped propagation of the security context.
//!
//! The authorization layer writes the encoded context into a header of the
//! request's [`RequestContext`]; the orchestrator reads it when segments are
//! opened for that request. The value is owned by the request and passed
//! explicitly, so nothing outlives it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::codec::SecurityContextCodec;
use super::context::SecurityContext;
use super::error::{SecurityError, SecurityResult};

/// Header carrying the encoded security context.
pub const SECURITY_CONTEXT_HEADER: &str = "_docshield_security_context";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Headers of one in-flight request.
///
/// A header can be written once. Dropping the context, or calling
/// [`clear`](Self::clear), ends the request.
#[derive(Debug)]
pub struct RequestContext {
    id: u64,
    headers: HashMap<String, String>,
}

impl RequestContext {
    /// Start a new request.
    pub fn new() -> Self {
        Self {
            id: NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed),
            headers: HashMap::new(),
        }
    }

    /// Process-unique request id, for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Set a header. Writing a header that is already present is rejected.
    pub fn put_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> SecurityResult<()> {
        let name = name.into();
        if self.headers.contains_key(&name) {
            return Err(SecurityError::InvalidContext(format!(
                "header '{name}' already set for request {}",
                self.id
            )));
        }
        self.headers.insert(name, value.into());
        Ok(())
    }

    /// Read a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// The encoded security context, if one was attached.
    pub fn security_token(&self) -> Option<&str> {
        self.header(SECURITY_CONTEXT_HEADER)
    }

    /// Remove every header.
    pub fn clear(&mut self) {
        if !self.headers.is_empty() {
            debug!(request = self.id, headers = self.headers.len(), "cleared request context");
        }
        self.headers.clear();
    }

    /// Encode `context` and attach it to the request.
    ///
    /// Returns `Ok(false)` when the context could not be encoded, in which
    /// case the request proceeds as if none were available.
    pub fn attach_security_context(&mut self, context: &SecurityContext) -> SecurityResult<bool> {
        let token = match SecurityContextCodec::encode(context) {
            Some(token) => token,
            None => {
                warn!(request = self.id, "no security context available for request");
                return Ok(false);
            }
        };
        self.put_header(SECURITY_CONTEXT_HEADER, token)?;
        Ok(true)
    }

    /// Request carrying `context`.
    pub fn with_security_context(context: &SecurityContext) -> SecurityResult<Self> {
        let mut request = Self::new();
        request.attach_security_context(context)?;
        Ok(request)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_and_read() {
        let context = SecurityContext::with_predicate(r#"{"Eq":{"field":"title","value":"a1"}}"#);
        let request = RequestContext::with_security_context(&context).unwrap();

        let decoded = SecurityContextCodec::decode(request.security_token()).unwrap();
        assert_eq!(decoded, Some(context));
    }

    #[test]
    fn test_header_written_once() {
        let mut request = RequestContext::new();
        request.put_header("x", "1").unwrap();
        let err = request.put_header("x", "2").unwrap_err();
        assert!(matches!(err, SecurityError::InvalidContext(_)));
        assert_eq!(request.header("x"), Some("1"));

        let context = SecurityContext::unrestricted();
        request.attach_security_context(&context).unwrap();
        assert!(matches!(
            request.attach_security_context(&context),
            Err(SecurityError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_clear() {
        let mut request = RequestContext::with_security_context(&SecurityContext::unrestricted()).unwrap();
        assert!(request.security_token().is_some());
        request.clear();
        assert!(request.security_token().is_none());
    }

    #[test]
    fn test_request_ids_differ() {
        assert_ne!(RequestContext::new().id(), RequestContext::new().id());
    }
}
