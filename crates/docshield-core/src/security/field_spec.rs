//! Field-level visibility rules.
//!
//! A spec is an ordered list of selectors. A plain selector (`title`)
//! includes a field, a selector prefixed with [`EXCLUDE_MARKER`] (`~title`)
//! excludes one. Excludes take precedence: as soon as a spec contains one
//! exclude, every field except the excluded ones is visible and includes are
//! ignored. A spec with only includes exposes exactly the included fields
//! that the segment actually has. A spec without selectors restricts nothing.
//!
//! The selector strings are the settings syntax only. Inside a security
//! token selectors travel tagged (`{"include":"title"}`), so any name,
//! including one starting with the marker, survives the trip unchanged.

use serde::{Deserialize, Serialize};

use crate::segment::FieldSchema;

/// Prefix marking an exclude selector.
pub const EXCLUDE_MARKER: char = '~';

/// One parsed selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSelector {
    /// Field is visible.
    Include(String),
    /// Field is hidden.
    Exclude(String),
}

impl FieldSelector {
    /// Parse a selector string. Blank selectors yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.strip_prefix(EXCLUDE_MARKER) {
            Some(name) if !name.trim().is_empty() => Some(FieldSelector::Exclude(name.trim().to_string())),
            Some(_) => None,
            None if raw.is_empty() => None,
            None => Some(FieldSelector::Include(raw.to_string())),
        }
    }

    /// The field name this selector refers to.
    pub fn name(&self) -> &str {
        match self {
            FieldSelector::Include(name) | FieldSelector::Exclude(name) => name,
        }
    }

    fn render(&self) -> String {
        match self {
            FieldSelector::Include(name) => name.clone(),
            FieldSelector::Exclude(name) => format!("{EXCLUDE_MARKER}{name}"),
        }
    }
}

/// Field visibility rules applied to every segment of a protected index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FieldVisibilitySpec {
    selectors: Vec<FieldSelector>,
}

impl FieldVisibilitySpec {
    /// Build a spec from selector strings, skipping blank entries.
    pub fn new<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            selectors: selectors
                .into_iter()
                .filter_map(|s| FieldSelector::parse(s.as_ref()))
                .collect(),
        }
    }

    /// Build a spec from already parsed selectors, kept as given.
    pub fn from_selectors(selectors: impl IntoIterator<Item = FieldSelector>) -> Self {
        Self {
            selectors: selectors.into_iter().collect(),
        }
    }

    /// Spec exposing exactly `fields`.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selectors: fields.into_iter().map(|f| FieldSelector::Include(f.into())).collect(),
        }
    }

    /// Spec hiding `fields`.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selectors: fields.into_iter().map(|f| FieldSelector::Exclude(f.into())).collect(),
        }
    }

    /// Parsed selectors in their original order.
    pub fn selectors(&self) -> &[FieldSelector] {
        &self.selectors
    }

    /// Check if the spec has no selectors.
    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Check if any selector is an exclude.
    pub fn has_excludes(&self) -> bool {
        self.selectors.iter().any(|s| matches!(s, FieldSelector::Exclude(_)))
    }

    /// Included field names.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().filter_map(|s| match s {
            FieldSelector::Include(name) => Some(name.as_str()),
            FieldSelector::Exclude(_) => None,
        })
    }

    /// Excluded field names.
    pub fn excludes(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().filter_map(|s| match s {
            FieldSelector::Exclude(name) => Some(name.as_str()),
            FieldSelector::Include(_) => None,
        })
    }

    /// Whether a field called `name` is visible under this spec.
    pub fn is_visible(&self, name: &str) -> bool {
        if self.is_empty() {
            true
        } else if self.has_excludes() {
            !self.excludes().any(|e| e == name)
        } else {
            self.includes().any(|i| i == name)
        }
    }

    /// Restrict `schema` to the visible fields.
    ///
    /// Selectors naming fields the schema does not have are ignored. The
    /// result is always a subset of `schema`.
    pub fn project(&self, schema: &FieldSchema) -> FieldSchema {
        schema.retain(|field| self.is_visible(&field.name))
    }

    /// Selector strings, with excludes carrying the marker.
    ///
    /// An include whose name starts with the marker renders like an
    /// exclude; use [`selectors`](Self::selectors) where that matters.
    pub fn to_strings(&self) -> Vec<String> {
        self.selectors.iter().map(FieldSelector::render).collect()
    }
}

impl From<Vec<String>> for FieldVisibilitySpec {
    fn from(selectors: Vec<String>) -> Self {
        Self::new(selectors)
    }
}

impl From<FieldVisibilitySpec> for Vec<String> {
    fn from(spec: FieldVisibilitySpec) -> Self {
        spec.to_strings()
    }
}
