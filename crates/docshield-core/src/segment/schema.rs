//! Per-segment field schema.

use std::collections::HashMap;

/// Metadata for one field of a segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Field number, unique within the segment.
    pub number: u32,
    /// Whether the field has a term dictionary.
    pub indexed: bool,
    /// Whether the field's values are stored.
    pub stored: bool,
}

impl FieldInfo {
    /// Create an indexed and stored field.
    pub fn new(name: impl Into<String>, number: u32) -> Self {
        Self {
            name: name.into(),
            number,
            indexed: true,
            stored: true,
        }
    }

    /// Set whether the field is indexed.
    pub fn with_indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }
}

/// Ordered set of fields, sorted by field number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldInfo>,
    by_name: HashMap<String, usize>,
}

impl FieldSchema {
    /// Build a schema. Later duplicates of a name are dropped.
    pub fn new(fields: impl IntoIterator<Item = FieldInfo>) -> Self {
        let mut fields: Vec<FieldInfo> = fields.into_iter().collect();
        fields.sort_by_key(|f| f.number);

        let mut by_name = HashMap::with_capacity(fields.len());
        let mut unique = Vec::with_capacity(fields.len());
        for field in fields {
            if by_name.contains_key(&field.name) {
                continue;
            }
            by_name.insert(field.name.clone(), unique.len());
            unique.push(field);
        }

        Self {
            fields: unique,
            by_name,
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// Check if the schema has a field with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Iterate fields in field-number order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter()
    }

    /// Field names in field-number order.
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if there are no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Keep only the fields accepted by `keep`.
    pub fn retain(&self, mut keep: impl FnMut(&FieldInfo) -> bool) -> FieldSchema {
        FieldSchema::new(self.fields.iter().filter(|f| keep(f)).cloned())
    }

    /// Check that every field here also exists, identically, in `other`.
    pub fn is_subset_of(&self, other: &FieldSchema) -> bool {
        self.fields
            .iter()
            .all(|f| other.field(&f.name).is_some_and(|o| o == f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![
            FieldInfo::new("c", 2),
            FieldInfo::new("a", 0),
            FieldInfo::new("b", 1),
        ])
    }

    #[test]
    fn test_ordered_by_number() {
        assert_eq!(schema().names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_lookup() {
        let schema = schema();
        assert_eq!(schema.field("b").map(|f| f.number), Some(1));
        assert!(schema.contains("c"));
        assert!(!schema.contains("d"));
        assert_eq!(schema.len(), 3);
    }

    #[test]
    fn test_duplicates_dropped() {
        let schema = FieldSchema::new(vec![FieldInfo::new("a", 0), FieldInfo::new("a", 5)]);
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.field("a").map(|f| f.number), Some(0));
    }

    #[test]
    fn test_retain_is_subset() {
        let schema = schema();
        let kept = schema.retain(|f| f.name != "b");
        assert_eq!(kept.names(), vec!["a", "c"]);
        assert!(kept.is_subset_of(&schema));
        assert!(!schema.is_subset_of(&kept));
    }
}
