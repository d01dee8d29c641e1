//! Request and response types exchanged with a [`StorageClient`].
//!
//! [`StorageClient`]: crate::StorageClient

use crate::operator::ComparisonOperator;
use dynarec_codec::{NativeItem, NativeKind, NativeValue};
use std::collections::BTreeMap;

/// A native filter or key condition on one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Comparison values, already in native form.
    pub values: Vec<NativeValue>,
    /// Comparison operator.
    pub operator: ComparisonOperator,
}

impl Condition {
    /// Creates a condition.
    pub fn new(operator: ComparisonOperator, values: Vec<NativeValue>) -> Self {
        Self { values, operator }
    }

    /// Creates an `EQ` condition on a single value.
    pub fn eq(value: NativeValue) -> Self {
        Self::new(ComparisonOperator::Eq, vec![value])
    }

    /// Evaluates the condition against an item attribute.
    pub fn matches(&self, attribute: Option<&NativeValue>) -> bool {
        self.operator.evaluate(attribute, &self.values)
    }
}

/// Evaluates every condition of a filter against an item.
pub(crate) fn filter_matches(filter: &BTreeMap<String, Condition>, item: &NativeItem) -> bool {
    filter
        .iter()
        .all(|(name, condition)| condition.matches(item.get(name)))
}

/// What a read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Select {
    /// Whole items.
    AllAttributes,
    /// Only the attributes listed in `attributes_to_get`.
    SpecificAttributes,
    /// No items, only the count.
    Count,
}

/// What a put returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnValues {
    /// Nothing.
    #[default]
    None,
    /// The item as it was before the put, if any.
    AllOld,
}

/// A full-table scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanRequest {
    /// Table to scan.
    pub table_name: String,
    /// Maximum number of items evaluated.
    pub limit: Option<u32>,
    /// Cursor to resume from.
    pub exclusive_start_key: Option<NativeItem>,
    /// Post-read filter.
    pub scan_filter: BTreeMap<String, Condition>,
    /// Result mode; `None` means all attributes.
    pub select: Option<Select>,
    /// Projection for [`Select::SpecificAttributes`].
    pub attributes_to_get: Vec<String>,
}

impl ScanRequest {
    /// Creates an unfiltered scan of a table.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// A key-condition query against the table or one of its secondary indexes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRequest {
    /// Table to query.
    pub table_name: String,
    /// Secondary index; `None` queries the primary key.
    pub index_name: Option<String>,
    /// Conditions on the hash (and optionally range) key.
    pub key_conditions: BTreeMap<String, Condition>,
    /// Post-read filter on non-key attributes.
    pub query_filter: BTreeMap<String, Condition>,
    /// Maximum number of items evaluated.
    pub limit: Option<u32>,
    /// Cursor to resume from.
    pub exclusive_start_key: Option<NativeItem>,
    /// Result mode; `None` means all attributes.
    pub select: Option<Select>,
    /// Projection for [`Select::SpecificAttributes`].
    pub attributes_to_get: Vec<String>,
    /// Ascending range order when `true` or unset.
    pub scan_index_forward: Option<bool>,
}

impl QueryRequest {
    /// Creates a query with no conditions yet.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Self::default()
        }
    }
}

/// Writes a whole item, replacing any item with the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct PutItemRequest {
    /// Target table.
    pub table_name: String,
    /// Item to write.
    pub item: NativeItem,
    /// Whether to return the replaced item.
    pub return_values: ReturnValues,
}

impl PutItemRequest {
    /// Creates a put that returns nothing.
    pub fn new(table_name: impl Into<String>, item: NativeItem) -> Self {
        Self {
            table_name: table_name.into(),
            item,
            return_values: ReturnValues::None,
        }
    }

    /// Sets the return mode.
    #[must_use]
    pub fn return_values(mut self, return_values: ReturnValues) -> Self {
        self.return_values = return_values;
        self
    }
}

/// Deletes one item by its primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteItemRequest {
    /// Target table.
    pub table_name: String,
    /// Primary key attributes.
    pub key: NativeItem,
}

impl DeleteItemRequest {
    /// Creates a delete request.
    pub fn new(table_name: impl Into<String>, key: NativeItem) -> Self {
        Self {
            table_name: table_name.into(),
            key,
        }
    }
}

/// Role of a key attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Partition key.
    Hash,
    /// Sort key.
    Range,
}

/// One element of a key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchemaElement {
    /// Attribute name.
    pub attribute_name: String,
    /// Hash or range.
    pub key_type: KeyType,
}

impl KeySchemaElement {
    /// Hash key element.
    pub fn hash(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            key_type: KeyType::Hash,
        }
    }

    /// Range key element.
    pub fn range(attribute_name: impl Into<String>) -> Self {
        Self {
            attribute_name: attribute_name.into(),
            key_type: KeyType::Range,
        }
    }
}

/// Declared native kind of a key attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    /// Attribute name.
    pub attribute_name: String,
    /// Scalar native kind.
    pub attribute_type: NativeKind,
}

/// Read and write capacity units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionedThroughput {
    /// Read capacity units.
    pub read_capacity_units: u64,
    /// Write capacity units.
    pub write_capacity_units: u64,
}

impl Default for ProvisionedThroughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 4,
            write_capacity_units: 4,
        }
    }
}

/// A global secondary index with an all-attributes projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    /// Index name.
    pub index_name: String,
    /// Index key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// Index throughput.
    pub provisioned_throughput: ProvisionedThroughput,
}

/// Creates a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableRequest {
    /// Table name.
    pub table_name: String,
    /// Primary key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// Kinds of every key attribute used by the table or its indexes.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Global secondary indexes.
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    /// Table throughput.
    pub provisioned_throughput: ProvisionedThroughput,
}

impl CreateTableRequest {
    /// Creates a request with no secondary indexes and default throughput.
    pub fn new<N: Into<String>>(
        table_name: impl Into<String>,
        key_schema: Vec<KeySchemaElement>,
        attribute_definitions: Vec<(N, NativeKind)>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            key_schema,
            attribute_definitions: attribute_definitions
                .into_iter()
                .map(|(name, kind)| AttributeDefinition {
                    attribute_name: name.into(),
                    attribute_type: kind,
                })
                .collect(),
            global_secondary_indexes: Vec::new(),
            provisioned_throughput: ProvisionedThroughput::default(),
        }
    }

    /// Adds a global secondary index.
    #[must_use]
    pub fn with_index(mut self, index: SecondaryIndex) -> Self {
        self.global_secondary_indexes.push(index);
        self
    }

    /// Sets the table throughput.
    #[must_use]
    pub fn with_throughput(mut self, throughput: ProvisionedThroughput) -> Self {
        self.provisioned_throughput = throughput;
        self
    }
}

/// Table metadata as reported by `describe_table` and `create_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    /// Table name.
    pub table_name: String,
    /// Primary key schema.
    pub key_schema: Vec<KeySchemaElement>,
    /// Key attribute kinds.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Global secondary indexes.
    pub global_secondary_indexes: Vec<SecondaryIndex>,
    /// Number of stored items.
    pub item_count: u64,
}

/// One page of a scan or query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemPage {
    /// Matching items (empty in count mode).
    pub items: Vec<NativeItem>,
    /// Cursor for the next page, if the limit stopped evaluation.
    pub last_evaluated_key: Option<NativeItem>,
    /// Number of matching items.
    pub count: u64,
    /// Number of items evaluated before filtering.
    pub scanned_count: u64,
}

impl ItemPage {
    /// A page with nothing in it.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_requires_every_condition() {
        let mut item = NativeItem::new();
        item.insert("age".into(), NativeValue::integer(30));
        item.insert("name".into(), NativeValue::S("ann".into()));

        let mut filter = BTreeMap::new();
        filter.insert("age".to_string(), Condition::eq(NativeValue::integer(30)));
        assert!(filter_matches(&filter, &item));

        filter.insert(
            "name".to_string(),
            Condition::new(
                ComparisonOperator::BeginsWith,
                vec![NativeValue::S("bo".into())],
            ),
        );
        assert!(!filter_matches(&filter, &item));
    }

    #[test]
    fn create_table_request_builder() {
        let request = CreateTableRequest::new(
            "users",
            vec![KeySchemaElement::hash("id"), KeySchemaElement::range("created_at")],
            vec![("id", NativeKind::S), ("created_at", NativeKind::N)],
        )
        .with_throughput(ProvisionedThroughput {
            read_capacity_units: 10,
            write_capacity_units: 2,
        });
        assert_eq!(request.attribute_definitions.len(), 2);
        assert_eq!(request.key_schema[1].key_type, KeyType::Range);
        assert_eq!(request.provisioned_throughput.read_capacity_units, 10);
    }

    #[test]
    fn put_defaults_to_no_return_values() {
        let put = PutItemRequest::new("users", NativeItem::new());
        assert_eq!(put.return_values, ReturnValues::None);
        let put = put.return_values(ReturnValues::AllOld);
        assert_eq!(put.return_values, ReturnValues::AllOld);
    }
}
