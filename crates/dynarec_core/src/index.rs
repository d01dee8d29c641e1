//! Secondary index registry and index selection.

use dynarec_storage::ComparisonOperator;

/// Name of the implicit index over the primary key.
pub const PRIMARY_INDEX: &str = "primary";

/// A hash key with an optional range key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    hash_key: String,
    range_key: Option<String>,
}

impl Index {
    /// Creates an index named `index_on_<hash>_<range>`.
    pub fn new(hash_key: impl Into<String>, range_key: Option<&str>) -> Self {
        let hash_key = hash_key.into();
        let name = match range_key {
            Some(range) => format!("index_on_{hash_key}_{range}"),
            None => format!("index_on_{hash_key}"),
        };
        Self {
            name,
            hash_key,
            range_key: range_key.map(str::to_string),
        }
    }

    /// Creates an index with an explicit name.
    pub fn named(
        name: impl Into<String>,
        hash_key: impl Into<String>,
        range_key: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            range_key: range_key.map(str::to_string),
        }
    }

    /// The implicit primary index: `id`, ranged by `created_at` if declared.
    pub(crate) fn primary(has_created_at: bool) -> Self {
        Self::named(
            PRIMARY_INDEX,
            "id",
            has_created_at.then_some("created_at"),
        )
    }

    /// Index name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash key column.
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Range key column, if any.
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// Whether this is the implicit primary index.
    pub fn is_primary(&self) -> bool {
        self.name == PRIMARY_INDEX
    }

    /// Whether `field` is one of this index's keys.
    pub fn is_key(&self, field: &str) -> bool {
        self.hash_key == field || self.range_key.as_deref() == Some(field)
    }
}

/// Picks the first index usable for a set of condition keys.
///
/// A hash key must appear as a plain key or with an explicit `eq`; a range
/// key may appear with any operator, but not as the same key as the hash.
/// `primary` is tried after all declared indexes. Malformed keys simply do
/// not count toward any index.
pub fn detect_index<'a, I, K>(declared: &'a [Index], primary: &'a Index, keys: I) -> Option<&'a Index>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut hash_eligible: Vec<String> = Vec::new();
    let mut range_eligible: Vec<String> = Vec::new();
    for key in keys {
        let key = key.as_ref();
        let (field, operator) = match key.split_once('.') {
            Some((field, op)) => (field, Some(op)),
            None => (key, None),
        };
        let is_eq = operator.map_or(true, |op| {
            ComparisonOperator::parse(op) == Some(ComparisonOperator::Eq)
        });
        if is_eq && !hash_eligible.iter().any(|k| k == field) {
            hash_eligible.push(field.to_string());
        }
        if !range_eligible.iter().any(|k| k == field) {
            range_eligible.push(field.to_string());
        }
    }

    declared.iter().chain(std::iter::once(primary)).find(|index| {
        let hash_ok = hash_eligible.iter().any(|k| *k == index.hash_key);
        let range_ok = index.range_key.as_ref().map_or(true, |range| {
            *range != index.hash_key && range_eligible.iter().any(|k| k == range)
        });
        hash_ok && range_ok
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexes() -> Vec<Index> {
        vec![
            Index::new("email", Some("created_at")),
            Index::new("first_name", Some("last_name")),
        ]
    }

    #[test]
    fn default_names() {
        assert_eq!(Index::new("email", Some("created_at")).name(), "index_on_email_created_at");
        assert_eq!(Index::new("email", None).name(), "index_on_email");
        assert!(Index::primary(true).is_primary());
    }

    #[test]
    fn selects_index_with_range_operator() {
        let declared = indexes();
        let primary = Index::primary(true);
        let found = detect_index(&declared, &primary, ["email", "created_at.ge"]).unwrap();
        assert_eq!(found.name(), "index_on_email_created_at");
    }

    #[test]
    fn hash_key_requires_equality() {
        let declared = indexes();
        let primary = Index::primary(true);
        assert!(detect_index(&declared, &primary, ["email.begins_with", "created_at"]).is_none());
        let found = detect_index(&declared, &primary, ["email.EQ", "created_at.lt"]).unwrap();
        assert_eq!(found.name(), "index_on_email_created_at");
    }

    #[test]
    fn missing_range_key_means_no_match() {
        let declared = indexes();
        let primary = Index::primary(true);
        assert!(detect_index(&declared, &primary, ["email"]).is_none());
        assert!(detect_index(&declared, &primary, ["id"]).is_none());
    }

    #[test]
    fn primary_index_is_last_resort() {
        let declared = indexes();
        let primary = Index::primary(true);
        let found = detect_index(&declared, &primary, ["id", "created_at.ge"]).unwrap();
        assert!(found.is_primary());

        let primary = Index::primary(false);
        assert!(detect_index(&declared, &primary, ["id"]).unwrap().is_primary());
    }

    #[test]
    fn declaration_order_wins() {
        let declared = indexes();
        let primary = Index::primary(true);
        let found = detect_index(
            &declared,
            &primary,
            ["first_name", "last_name", "email", "created_at"],
        )
        .unwrap();
        assert_eq!(found.name(), "index_on_email_created_at");
    }
}
