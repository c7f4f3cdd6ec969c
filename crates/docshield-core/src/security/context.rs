//! Per-request security context.
//!
//! The context is produced by the authorization layer once per request and
//! carries what the caller may see: a row predicate restricting documents and
//! an optional field visibility spec. It is immutable once built.

use super::field_spec::{FieldSelector, FieldVisibilitySpec};

/// What a single request is allowed to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SecurityContext {
    /// Row predicate in the JSON filter DSL. `None` means unrestricted rows.
    pub row_predicate: Option<String>,
    /// Field visibility narrowing the index's configured fields.
    pub field_spec: Option<FieldVisibilitySpec>,
}

impl SecurityContext {
    /// A context that restricts nothing.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Create a context with a row predicate.
    pub fn with_predicate(predicate: impl Into<String>) -> Self {
        Self {
            row_predicate: Some(predicate.into()),
            field_spec: None,
        }
    }

    /// Set the row predicate.
    pub fn with_row_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.row_predicate = Some(predicate.into());
        self
    }

    /// Set the field visibility spec.
    pub fn with_field_spec(mut self, spec: FieldVisibilitySpec) -> Self {
        self.field_spec = Some(spec);
        self
    }

    /// The row predicate, if it has any content.
    ///
    /// Blank predicate text is treated exactly like no predicate.
    pub fn effective_predicate(&self) -> Option<&str> {
        self.row_predicate
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// The field spec, if it restricts anything.
    ///
    /// An empty spec is treated exactly like no spec.
    pub fn effective_field_spec(&self) -> Option<&FieldVisibilitySpec> {
        self.field_spec.as_ref().filter(|spec| !spec.is_empty())
    }

    /// Check if this context filters rows.
    pub fn has_row_filter(&self) -> bool {
        self.effective_predicate().is_some()
    }

    /// Check if this context restricts neither rows nor fields.
    pub fn is_unrestricted(&self) -> bool {
        !self.has_row_filter() && self.effective_field_spec().is_none()
    }

    /// Stable digest identifying what this context lets a caller see.
    ///
    /// Contexts that differ only in predicate whitespace, or in an empty
    /// versus absent field spec, share a fingerprint.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        match self.effective_predicate() {
            Some(predicate) => {
                hasher.update(&[1]);
                hasher.update(&(predicate.len() as u64).to_le_bytes());
                hasher.update(predicate.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
        match self.effective_field_spec() {
            Some(spec) => {
                hasher.update(&[1]);
                for selector in spec.selectors() {
                    let tag = match selector {
                        FieldSelector::Include(_) => 0u8,
                        FieldSelector::Exclude(_) => 1u8,
                    };
                    hasher.update(&[tag]);
                    hasher.update(&(selector.name().len() as u64).to_le_bytes());
                    hasher.update(selector.name().as_bytes());
                }
            }
            None => {
                hasher.update(&[0]);
            }
        }
        *hasher.finalize().as_bytes()
    }
}
