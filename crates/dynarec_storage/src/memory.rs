//! In-memory storage client for testing.

use crate::client::StorageClient;
use crate::error::{StorageError, StorageResult};
use crate::operator::ComparisonOperator;
use crate::request::{
    filter_matches, Condition, CreateTableRequest, DeleteItemRequest, ItemPage, KeySchemaElement,
    KeyType, PutItemRequest, QueryRequest, ReturnValues, ScanRequest, Select, TableDescription,
};
use dynarec_codec::{decode_item, encode_item, NativeItem, NativeValue};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

type PrimaryKey = (NativeValue, Option<NativeValue>);

/// An in-memory table store.
///
/// Items are kept CBOR-encoded, keyed by primary key. Reads order items by
/// their key attributes (numbers numerically, strings and binaries
/// bytewise), so cursor paging is deterministic.
///
/// # Thread Safety
///
/// All tables sit behind one `RwLock`; the client can be shared across
/// threads.
///
/// # Example
///
/// ```rust
/// use dynarec_storage::{InMemoryClient, StorageClient};
///
/// let client = InMemoryClient::new();
/// assert!(client.list_tables().unwrap().is_empty());
/// assert!(client.describe_table("users").unwrap_err().is_not_found());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryClient {
    tables: RwLock<BTreeMap<String, MemoryTable>>,
}

#[derive(Debug)]
struct MemoryTable {
    description: TableDescription,
    items: HashMap<PrimaryKey, Vec<u8>>,
}

/// Key attribute names of the table or index a read walks.
struct KeyPath {
    hash: String,
    range: Option<String>,
    /// Attribute names that order the walk, most significant first.
    order: Vec<String>,
}

impl InMemoryClient {
    /// Creates a client with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every table.
    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

impl MemoryTable {
    fn key_names(schema: &[KeySchemaElement]) -> (Option<&str>, Option<&str>) {
        let find = |key_type| {
            schema
                .iter()
                .find(|e| e.key_type == key_type)
                .map(|e| e.attribute_name.as_str())
        };
        (find(KeyType::Hash), find(KeyType::Range))
    }

    fn table_path(&self) -> StorageResult<KeyPath> {
        let (hash, range) = Self::key_names(&self.description.key_schema);
        let hash = hash.ok_or_else(|| StorageError::validation("table has no hash key"))?;
        let mut order = vec![hash.to_string()];
        order.extend(range.map(str::to_string));
        Ok(KeyPath {
            hash: hash.to_string(),
            range: range.map(str::to_string),
            order,
        })
    }

    fn index_path(&self, index_name: &str) -> StorageResult<KeyPath> {
        let index = self
            .description
            .global_secondary_indexes
            .iter()
            .find(|i| i.index_name == index_name)
            .ok_or_else(|| {
                StorageError::validation(format!(
                    "the table does not have the specified index: {index_name}"
                ))
            })?;
        let (hash, range) = Self::key_names(&index.key_schema);
        let hash = hash.ok_or_else(|| StorageError::validation("index has no hash key"))?;
        let table = self.table_path()?;
        let mut order = vec![hash.to_string()];
        order.extend(range.map(str::to_string));
        for name in table.order {
            if !order.contains(&name) {
                order.push(name);
            }
        }
        Ok(KeyPath {
            hash: hash.to_string(),
            range: range.map(str::to_string),
            order,
        })
    }

    fn primary_key(&self, item: &NativeItem) -> StorageResult<PrimaryKey> {
        let path = self.table_path()?;
        let hash = key_attribute(item, &path.hash)?;
        let range = match &path.range {
            Some(name) => Some(key_attribute(item, name)?),
            None => None,
        };
        Ok((hash, range))
    }

    /// Decodes every item, sorted along `path`.
    fn sorted_items(&self, path: &KeyPath, forward: bool) -> StorageResult<Vec<NativeItem>> {
        let mut items = self
            .items
            .values()
            .map(|bytes| decode_item(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by(|a, b| compare_along(&path.order, a, b));
        if !forward {
            items.reverse();
        }
        Ok(items)
    }
}

fn key_attribute(item: &NativeItem, name: &str) -> StorageResult<NativeValue> {
    match item.get(name) {
        Some(value) if !value.kind().is_set() => Ok(value.clone()),
        Some(value) => Err(StorageError::validation(format!(
            "key attribute {name} must be a scalar, got {}",
            value.kind()
        ))),
        None => Err(StorageError::validation(format!(
            "missing key attribute: {name}"
        ))),
    }
}

fn compare_optional(a: Option<&NativeValue>, b: Option<&NativeValue>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a
            .cmp_scalar(b)
            .unwrap_or_else(|| a.kind().tag().cmp(b.kind().tag())),
    }
}

fn compare_along(order: &[String], a: &NativeItem, b: &NativeItem) -> Ordering {
    order
        .iter()
        .map(|name| compare_optional(a.get(name), b.get(name)))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn cursor_of(order: &[String], item: &NativeItem) -> NativeItem {
    order
        .iter()
        .filter_map(|name| item.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}

/// Paging and result-shaping parameters common to scans and queries.
struct PageWindow<'a> {
    exclusive_start_key: Option<&'a NativeItem>,
    limit: Option<u32>,
    filter: &'a BTreeMap<String, Condition>,
    select: Option<Select>,
    attributes_to_get: &'a [String],
}

/// Shared tail of scan and query: cursor, limit, filter, projection.
fn read_page(
    candidates: Vec<NativeItem>,
    order: &[String],
    forward: bool,
    window: &PageWindow<'_>,
) -> ItemPage {
    let remaining: Vec<NativeItem> = match window.exclusive_start_key {
        Some(start) => candidates
            .into_iter()
            .filter(|item| {
                let ord = compare_along(order, item, start);
                if forward {
                    ord == Ordering::Greater
                } else {
                    ord == Ordering::Less
                }
            })
            .collect(),
        None => candidates,
    };

    let limit = window.limit.map(|l| l as usize);
    let evaluated = match limit {
        Some(l) => remaining.len().min(l),
        None => remaining.len(),
    };
    let last_evaluated_key = if evaluated < remaining.len() && evaluated > 0 {
        Some(cursor_of(order, &remaining[evaluated - 1]))
    } else {
        None
    };

    let matching: Vec<NativeItem> = remaining
        .into_iter()
        .take(evaluated)
        .filter(|item| filter_matches(window.filter, item))
        .collect();
    let count = matching.len() as u64;

    let items = match window.select {
        Some(Select::Count) => Vec::new(),
        Some(Select::SpecificAttributes) => project(matching, window.attributes_to_get),
        _ if !window.attributes_to_get.is_empty() => project(matching, window.attributes_to_get),
        _ => matching,
    };

    ItemPage {
        items,
        last_evaluated_key,
        count,
        scanned_count: evaluated as u64,
    }
}

fn project(items: Vec<NativeItem>, attributes: &[String]) -> Vec<NativeItem> {
    items
        .into_iter()
        .map(|item| {
            item.into_iter()
                .filter(|(name, _)| attributes.iter().any(|a| a == name))
                .collect()
        })
        .collect()
}

fn validate_key_conditions(
    conditions: &BTreeMap<String, Condition>,
    path: &KeyPath,
) -> StorageResult<()> {
    let hash = conditions.get(&path.hash).ok_or_else(|| {
        StorageError::validation(format!(
            "query condition missed key schema element: {}",
            path.hash
        ))
    })?;
    if hash.operator != ComparisonOperator::Eq {
        return Err(StorageError::validation(format!(
            "hash key {} only supports EQ, got {}",
            path.hash, hash.operator
        )));
    }
    for (name, condition) in conditions {
        if *name == path.hash {
            continue;
        }
        if path.range.as_deref() != Some(name.as_str()) {
            return Err(StorageError::validation(format!(
                "query key condition not supported on non-key attribute: {name}"
            )));
        }
        if !condition.operator.allowed_on_range_key() {
            return Err(StorageError::validation(format!(
                "unsupported operator on range key {name}: {}",
                condition.operator
            )));
        }
    }
    for condition in conditions.values() {
        if !condition.operator.arity().accepts(condition.values.len()) {
            return Err(StorageError::validation(format!(
                "{} takes {}",
                condition.operator,
                condition.operator.arity()
            )));
        }
    }
    Ok(())
}

impl StorageClient for InMemoryClient {
    fn scan(&self, request: &ScanRequest) -> StorageResult<ItemPage> {
        let tables = self.tables.read();
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| StorageError::not_found(&request.table_name))?;
        let path = table.table_path()?;
        let candidates = table.sorted_items(&path, true)?;
        let window = PageWindow {
            exclusive_start_key: request.exclusive_start_key.as_ref(),
            limit: request.limit,
            filter: &request.scan_filter,
            select: request.select,
            attributes_to_get: &request.attributes_to_get,
        };
        Ok(read_page(candidates, &path.order, true, &window))
    }

    fn query(&self, request: &QueryRequest) -> StorageResult<ItemPage> {
        let tables = self.tables.read();
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| StorageError::not_found(&request.table_name))?;
        let path = match &request.index_name {
            Some(index) => table.index_path(index)?,
            None => table.table_path()?,
        };
        validate_key_conditions(&request.key_conditions, &path)?;

        let forward = request.scan_index_forward.unwrap_or(true);
        let candidates: Vec<NativeItem> = table
            .sorted_items(&path, forward)?
            .into_iter()
            // Secondary indexes are sparse: items lacking index keys are absent.
            .filter(|item| {
                item.contains_key(&path.hash)
                    && path.range.as_ref().map_or(true, |r| item.contains_key(r))
            })
            .filter(|item| filter_matches(&request.key_conditions, item))
            .collect();

        let window = PageWindow {
            exclusive_start_key: request.exclusive_start_key.as_ref(),
            limit: request.limit,
            filter: &request.query_filter,
            select: request.select,
            attributes_to_get: &request.attributes_to_get,
        };
        Ok(read_page(candidates, &path.order, forward, &window))
    }

    fn put_item(&self, request: &PutItemRequest) -> StorageResult<Option<NativeItem>> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| StorageError::not_found(&request.table_name))?;
        let key = table.primary_key(&request.item)?;
        let bytes = encode_item(&request.item)?;
        let old = table.items.insert(key, bytes);
        match (request.return_values, old) {
            (ReturnValues::AllOld, Some(bytes)) => Ok(Some(decode_item(&bytes)?)),
            _ => Ok(None),
        }
    }

    fn delete_item(&self, request: &DeleteItemRequest) -> StorageResult<()> {
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| StorageError::not_found(&request.table_name))?;
        let key = table.primary_key(&request.key)?;
        table.items.remove(&key);
        Ok(())
    }

    fn create_table(&self, request: &CreateTableRequest) -> StorageResult<TableDescription> {
        let mut tables = self.tables.write();
        if tables.contains_key(&request.table_name) {
            return Err(StorageError::in_use(&request.table_name));
        }

        let defined = |name: &str| {
            request
                .attribute_definitions
                .iter()
                .any(|d| d.attribute_name == name && !d.attribute_type.is_set())
        };
        let schemas = std::iter::once(&request.key_schema)
            .chain(request.global_secondary_indexes.iter().map(|i| &i.key_schema));
        for schema in schemas {
            let (hash, _) = MemoryTable::key_names(schema);
            if hash.is_none() {
                return Err(StorageError::validation("key schema needs a HASH element"));
            }
            if let Some(missing) = schema.iter().find(|e| !defined(&e.attribute_name)) {
                return Err(StorageError::validation(format!(
                    "no scalar attribute definition for key {}",
                    missing.attribute_name
                )));
            }
        }

        let description = TableDescription {
            table_name: request.table_name.clone(),
            key_schema: request.key_schema.clone(),
            attribute_definitions: request.attribute_definitions.clone(),
            global_secondary_indexes: request.global_secondary_indexes.clone(),
            item_count: 0,
        };
        tables.insert(
            request.table_name.clone(),
            MemoryTable {
                description: description.clone(),
                items: HashMap::new(),
            },
        );
        Ok(description)
    }

    fn delete_table(&self, table_name: &str) -> StorageResult<()> {
        self.tables
            .write()
            .remove(table_name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(table_name))
    }

    fn describe_table(&self, table_name: &str) -> StorageResult<TableDescription> {
        let tables = self.tables.read();
        let table = tables
            .get(table_name)
            .ok_or_else(|| StorageError::not_found(table_name))?;
        let mut description = table.description.clone();
        description.item_count = table.items.len() as u64;
        Ok(description)
    }

    fn list_tables(&self) -> StorageResult<Vec<String>> {
        Ok(self.tables.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ProvisionedThroughput, SecondaryIndex};
    use dynarec_codec::NativeKind;
    use proptest::prelude::*;

    fn s(v: &str) -> NativeValue {
        NativeValue::S(v.into())
    }

    fn n(v: i64) -> NativeValue {
        NativeValue::integer(v)
    }

    fn client_with_table() -> InMemoryClient {
        let client = InMemoryClient::new();
        let request = CreateTableRequest::new(
            "people",
            vec![KeySchemaElement::hash("id"), KeySchemaElement::range("created_at")],
            vec![
                ("id", NativeKind::S),
                ("created_at", NativeKind::N),
                ("email", NativeKind::S),
            ],
        )
        .with_index(SecondaryIndex {
            index_name: "index_on_email_created_at".into(),
            key_schema: vec![
                KeySchemaElement::hash("email"),
                KeySchemaElement::range("created_at"),
            ],
            provisioned_throughput: ProvisionedThroughput::default(),
        });
        client.create_table(&request).unwrap();
        client
    }

    fn person(id: &str, created_at: i64, email: Option<&str>) -> NativeItem {
        let mut item = NativeItem::new();
        item.insert("id".into(), s(id));
        item.insert("created_at".into(), n(created_at));
        if let Some(email) = email {
            item.insert("email".into(), s(email));
        }
        item
    }

    fn put(client: &InMemoryClient, item: NativeItem) {
        client.put_item(&PutItemRequest::new("people", item)).unwrap();
    }

    #[test]
    fn create_table_twice_is_in_use() {
        let client = client_with_table();
        let request = CreateTableRequest::new(
            "people",
            vec![KeySchemaElement::hash("id")],
            vec![("id", NativeKind::S)],
        );
        assert!(matches!(
            client.create_table(&request),
            Err(StorageError::ResourceInUse { .. })
        ));
    }

    #[test]
    fn create_table_requires_key_definitions() {
        let client = InMemoryClient::new();
        let request = CreateTableRequest::new(
            "people",
            vec![KeySchemaElement::hash("id")],
            Vec::<(&str, NativeKind)>::new(),
        );
        assert!(matches!(
            client.create_table(&request),
            Err(StorageError::Validation { .. })
        ));
    }

    #[test]
    fn put_requires_key_attributes() {
        let client = client_with_table();
        let mut item = NativeItem::new();
        item.insert("id".into(), s("a"));
        let result = client.put_item(&PutItemRequest::new("people", item));
        assert!(matches!(result, Err(StorageError::Validation { .. })));
    }

    #[test]
    fn put_returns_old_item_on_request() {
        let client = client_with_table();
        put(&client, person("a", 1, Some("old@x.com")));
        let old = client
            .put_item(
                &PutItemRequest::new("people", person("a", 1, Some("new@x.com")))
                    .return_values(ReturnValues::AllOld),
            )
            .unwrap()
            .unwrap();
        assert_eq!(old.get("email"), Some(&s("old@x.com")));
        assert_eq!(client.describe_table("people").unwrap().item_count, 1);
    }

    #[test]
    fn scan_orders_by_primary_key() {
        let client = client_with_table();
        put(&client, person("b", 1, None));
        put(&client, person("a", 10, None));
        put(&client, person("a", 9, None));
        let page = client.scan(&ScanRequest::new("people")).unwrap();
        let keys: Vec<_> = page
            .items
            .iter()
            .map(|i| (i["id"].clone(), i["created_at"].clone()))
            .collect();
        assert_eq!(keys, vec![(s("a"), n(9)), (s("a"), n(10)), (s("b"), n(1))]);
        assert_eq!(page.last_evaluated_key, None);
    }

    #[test]
    fn limit_counts_items_before_filtering() {
        let client = client_with_table();
        put(&client, person("a", 1, Some("x@x.com")));
        put(&client, person("b", 1, None));
        put(&client, person("c", 1, Some("x@x.com")));

        let mut request = ScanRequest::new("people");
        request.limit = Some(2);
        request.scan_filter.insert(
            "email".into(),
            Condition::new(ComparisonOperator::NotNull, vec![]),
        );
        let page = client.scan(&request).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.scanned_count, 2);
        let cursor = page.last_evaluated_key.unwrap();
        assert_eq!(cursor.get("id"), Some(&s("b")));

        request.exclusive_start_key = Some(cursor);
        let page = client.scan(&request).unwrap();
        assert_eq!(page.count, 1);
        assert_eq!(page.items[0]["id"], s("c"));
        assert_eq!(page.last_evaluated_key, None);
    }

    #[test]
    fn count_mode_returns_no_items() {
        let client = client_with_table();
        put(&client, person("a", 1, None));
        put(&client, person("b", 1, None));
        let mut request = ScanRequest::new("people");
        request.select = Some(Select::Count);
        let page = client.scan(&request).unwrap();
        assert_eq!(page.count, 2);
        assert!(page.items.is_empty());
    }

    #[test]
    fn specific_attributes_project_items() {
        let client = client_with_table();
        put(&client, person("a", 1, Some("a@x.com")));
        let mut request = ScanRequest::new("people");
        request.select = Some(Select::SpecificAttributes);
        request.attributes_to_get = vec!["email".into()];
        let page = client.scan(&request).unwrap();
        assert_eq!(page.items[0].len(), 1);
        assert_eq!(page.items[0]["email"], s("a@x.com"));
    }

    #[test]
    fn query_on_index_is_sparse_and_ordered() {
        let client = client_with_table();
        put(&client, person("a", 3, Some("x@x.com")));
        put(&client, person("b", 1, Some("x@x.com")));
        put(&client, person("c", 2, None));
        put(&client, person("d", 2, Some("y@x.com")));

        let mut request = QueryRequest::new("people");
        request.index_name = Some("index_on_email_created_at".into());
        request
            .key_conditions
            .insert("email".into(), Condition::eq(s("x@x.com")));
        request.key_conditions.insert(
            "created_at".into(),
            Condition::new(ComparisonOperator::Ge, vec![n(0)]),
        );
        let page = client.query(&request).unwrap();
        let ids: Vec<_> = page.items.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![s("b"), s("a")]);

        request.scan_index_forward = Some(false);
        let page = client.query(&request).unwrap();
        let ids: Vec<_> = page.items.iter().map(|i| i["id"].clone()).collect();
        assert_eq!(ids, vec![s("a"), s("b")]);
    }

    #[test]
    fn query_rejects_bad_key_conditions() {
        let client = client_with_table();
        let mut request = QueryRequest::new("people");
        request.key_conditions.insert(
            "id".into(),
            Condition::new(ComparisonOperator::BeginsWith, vec![s("a")]),
        );
        assert!(matches!(
            client.query(&request),
            Err(StorageError::Validation { .. })
        ));

        let mut request = QueryRequest::new("people");
        request.key_conditions.insert("id".into(), Condition::eq(s("a")));
        request
            .key_conditions
            .insert("email".into(), Condition::eq(s("a")));
        assert!(client.query(&request).is_err());

        let mut request = QueryRequest::new("people");
        request.index_name = Some("missing".into());
        assert!(client.query(&request).is_err());
    }

    #[test]
    fn delete_item_and_tables() {
        let client = client_with_table();
        put(&client, person("a", 1, None));
        let mut key = NativeItem::new();
        key.insert("id".into(), s("a"));
        key.insert("created_at".into(), n(1));
        client
            .delete_item(&DeleteItemRequest::new("people", key))
            .unwrap();
        assert_eq!(client.describe_table("people").unwrap().item_count, 0);

        assert_eq!(client.list_tables().unwrap(), vec!["people".to_string()]);
        client.delete_table("people").unwrap();
        assert!(client.delete_table("people").unwrap_err().is_not_found());
        assert!(client
            .scan(&ScanRequest::new("people"))
            .unwrap_err()
            .is_not_found());
    }

    proptest! {
        #[test]
        fn cursor_paging_yields_each_item_once(count in 0usize..40, page_size in 1u32..7) {
            let client = client_with_table();
            for i in 0..count {
                put(&client, person(&format!("id{i:03}"), i as i64, None));
            }
            let mut request = ScanRequest::new("people");
            request.limit = Some(page_size);
            let mut seen = Vec::new();
            loop {
                let page = client.scan(&request).unwrap();
                seen.extend(page.items.into_iter().map(|i| i["id"].clone()));
                match page.last_evaluated_key {
                    Some(cursor) => request.exclusive_start_key = Some(cursor),
                    None => break,
                }
            }
            prop_assert_eq!(seen.len(), count);
            let mut deduped = seen.clone();
            deduped.dedup();
            prop_assert_eq!(deduped.len(), count);
        }
    }
}
