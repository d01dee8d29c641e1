//! Finders: index selection, scan/query dispatch and page emulation.

use super::Collection;
use crate::callback::{run_each, Phase};
use crate::condition::{compile, compile_for_index, Conditions};
use crate::error::CoreResult;
use crate::record::Record;
use crate::value::Value;
use dynarec_storage::{
    ItemPage, NativeItem, QueryRequest, ScanRequest, Select, StorageClient, StorageResult,
};
use std::collections::VecDeque;
use tracing::debug;

/// How a finder reads and what it returns.
///
/// # Example
///
/// ```rust
/// use dynarec_core::FindOptions;
///
/// let options = FindOptions::new()
///     .select("first_name, email")
///     .order("desc")
///     .page(2)
///     .per_page(10);
/// assert_eq!(options.selected(), ["first_name", "email"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    limit: Option<u32>,
    page: Option<u32>,
    per_page: Option<u32>,
    select: Vec<String>,
    count: bool,
    result_set: bool,
    order: Option<String>,
    start_with: Vec<(String, Value)>,
    exclusive_start_key: Option<NativeItem>,
}

impl FindOptions {
    /// Options for a plain read.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of items the store evaluates.
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 1-based page number for page emulation.
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Page size for page emulation. Values below 1 use the default.
    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Projection as a comma-separated list.
    #[must_use]
    pub fn select(mut self, fields: &str) -> Self {
        self.select = fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// Projection as a list.
    #[must_use]
    pub fn select_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: AsRef<str>,
    {
        self.select = fields
            .into_iter()
            .map(|f| f.as_ref().trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    /// Return only the number of matches.
    #[must_use]
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    /// Return the raw page instead of records.
    #[must_use]
    pub fn result_set(mut self) -> Self {
        self.result_set = true;
        self
    }

    /// Range-key order for index queries; anything starting with `desc`
    /// (any case) reads descending.
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Resume after the item whose key attributes have these values.
    #[must_use]
    pub fn start_with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.start_with.push((field.into(), value.into()));
        self
    }

    /// Resume after a native cursor returned by an earlier page.
    #[must_use]
    pub fn exclusive_start_key(mut self, key: NativeItem) -> Self {
        self.exclusive_start_key = Some(key);
        self
    }

    /// The trimmed projection.
    pub fn selected(&self) -> &[String] {
        &self.select
    }

    fn select_mode(&self) -> Select {
        if self.count {
            Select::Count
        } else if self.select.is_empty() {
            Select::AllAttributes
        } else {
            Select::SpecificAttributes
        }
    }
}

/// What [`Collection::finder`] returns, depending on [`FindOptions`].
#[derive(Debug, Clone)]
pub enum FindOutput {
    /// Materialized records.
    Records(Vec<Record>),
    /// Number of matches.
    Count(u64),
    /// The raw page.
    ResultSet(ItemPage),
}

/// A scan or a query, ready to run.
#[derive(Debug, Clone)]
enum ReadPlan {
    Scan(ScanRequest),
    Query(QueryRequest),
}

impl ReadPlan {
    fn set_limit(&mut self, limit: Option<u32>) {
        match self {
            ReadPlan::Scan(r) => r.limit = limit,
            ReadPlan::Query(r) => r.limit = limit,
        }
    }

    fn set_start(&mut self, key: Option<NativeItem>) {
        match self {
            ReadPlan::Scan(r) => r.exclusive_start_key = key,
            ReadPlan::Query(r) => r.exclusive_start_key = key,
        }
    }

    fn set_projection(&mut self, select: Select, attributes: Vec<String>) {
        let attributes = if select == Select::SpecificAttributes {
            attributes
        } else {
            Vec::new()
        };
        match self {
            ReadPlan::Scan(r) => {
                r.select = Some(select);
                r.attributes_to_get = attributes;
            }
            ReadPlan::Query(r) => {
                r.select = Some(select);
                r.attributes_to_get = attributes;
            }
        }
    }

    /// A count-only copy used to walk the cursor forward.
    fn count_probe(&self, per_page: u32, cursor: Option<&NativeItem>) -> Self {
        let mut probe = self.clone();
        probe.set_projection(Select::Count, Vec::new());
        probe.set_limit(Some(per_page));
        if let Some(cursor) = cursor {
            probe.set_start(Some(cursor.clone()));
        }
        probe
    }

    fn execute<S: StorageClient>(&self, client: &S) -> StorageResult<ItemPage> {
        match self {
            ReadPlan::Scan(request) => {
                debug!(table = %request.table_name, operation = "scan", ?request, "storage call");
                client.scan(request)
            }
            ReadPlan::Query(request) => {
                debug!(table = %request.table_name, operation = "query", ?request, "storage call");
                client.query(request)
            }
        }
    }
}

impl<S: StorageClient> Collection<S> {
    /// Runs a finder and returns records, a count, or the raw page,
    /// according to `options`.
    ///
    /// Conditions naming an index's keys become a query on that index;
    /// anything else is a filtered scan.
    ///
    /// # Errors
    ///
    /// Returns configuration errors for malformed conditions, coercion
    /// errors for unrepresentable values, and storage errors.
    pub fn finder(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<FindOutput> {
        let page = self.read(conditions, options)?;
        if options.count {
            return Ok(FindOutput::Count(page.map_or(0, |p| p.count)));
        }
        let page = page.unwrap_or_else(ItemPage::empty);
        if options.result_set {
            return Ok(FindOutput::ResultSet(page));
        }
        Ok(FindOutput::Records(self.materialize(&page.items)?))
    }

    /// All records matching `conditions`.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn find_all_by(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<Vec<Record>> {
        let mut options = options.clone();
        options.count = false;
        options.result_set = false;
        let page = self.read(conditions, &options)?;
        match page {
            Some(page) => self.materialize(&page.items),
            None => Ok(Vec::new()),
        }
    }

    /// The first record of a one-item read.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn find_by(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<Option<Record>> {
        let options = options.clone().limit(1);
        Ok(self.find_all_by(conditions, &options)?.into_iter().next())
    }

    /// Every record in the table.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn all(&self) -> CoreResult<Vec<Record>> {
        self.find_all_by(&Conditions::new(), &FindOptions::new())
    }

    /// Whether a one-item read finds anything.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn exists(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<bool> {
        Ok(self.find_by(conditions, options)?.is_some())
    }

    /// Number of matching records.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn count(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<u64> {
        let options = options.clone().count();
        Ok(self.read(conditions, &options)?.map_or(0, |p| p.count))
    }

    /// The raw page for `conditions`.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn result_set(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<ItemPage> {
        let mut options = options.clone();
        options.count = false;
        Ok(self
            .read(conditions, &options)?
            .unwrap_or_else(ItemPage::empty))
    }

    /// The first match, or a new unsaved record built from the equality
    /// conditions.
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`].
    pub fn find_or_initialize_by(&self, conditions: &Conditions) -> CoreResult<Record> {
        if let Some(found) = self.find_by(conditions, &FindOptions::new())? {
            return Ok(found);
        }
        self.build(conditions.equalities()?.into_iter().map(|(k, v)| (k, v.clone())))
    }

    /// The first match, or a record created from the equality conditions.
    ///
    /// The created record may be unsaved if validation or a hook stopped
    /// it; check [`Record::is_persisted`].
    ///
    /// # Errors
    ///
    /// See [`Collection::finder`] and [`Collection::save`].
    pub fn find_or_create_by(&self, conditions: &Conditions) -> CoreResult<Record> {
        if let Some(found) = self.find_by(conditions, &FindOptions::new())? {
            return Ok(found);
        }
        let attributes: Vec<(&str, Value)> = conditions
            .equalities()?
            .into_iter()
            .map(|(k, v)| (k, v.clone()))
            .collect();
        let (record, _) = self.create(attributes)?;
        Ok(record)
    }

    /// Feeds every matching record to `f`, reading page by page.
    ///
    /// # Errors
    ///
    /// Stops at the first read error or error returned by `f`.
    pub fn find_each<F>(&self, conditions: &Conditions, options: &FindOptions, mut f: F) -> CoreResult<()>
    where
        F: FnMut(Record) -> CoreResult<()>,
    {
        for record in self.stream(conditions, options) {
            f(record?)?;
        }
        Ok(())
    }

    /// Lazily iterates every matching record, reading page by page.
    ///
    /// Page emulation and count mode do not apply to streams.
    pub fn stream(&self, conditions: &Conditions, options: &FindOptions) -> RecordStream<'_, S> {
        let mut options = options.clone();
        options.page = None;
        options.count = false;
        options.result_set = true;
        RecordStream {
            collection: self,
            conditions: conditions.clone(),
            options,
            buffer: VecDeque::new(),
            cursor: None,
            done: false,
        }
    }

    /// Builds and runs the read. `None` means page emulation ran past the
    /// last page.
    ///
    /// Page emulation only applies when neither a limit nor a start key was
    /// given.
    fn read(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<Option<ItemPage>> {
        let mut plan = self.plan(conditions, options)?;

        let page = options.page.unwrap_or(0);
        let per_page = options
            .per_page
            .filter(|p| *p >= 1)
            .unwrap_or(self.config.default_per_page);
        if options.limit.is_none() && page >= 1 {
            plan.set_limit(Some(per_page));
        }
        let explicit_start =
            options.exclusive_start_key.is_some() || !options.start_with.is_empty();
        if page >= 2 && options.limit.is_none() && !explicit_start {
            let mut cursor: Option<NativeItem> = None;
            for n in 2..=page {
                let probe = plan.count_probe(per_page, cursor.as_ref());
                let result = probe.execute(&*self.client)?;
                debug!(
                    table = self.schema.table_name(),
                    page = n,
                    count = result.count,
                    "pagination probe"
                );
                match result.last_evaluated_key {
                    Some(key) => cursor = Some(key),
                    None => return Ok(None),
                }
            }
            plan.set_start(cursor);
        }

        let result = plan.execute(&*self.client)?;
        debug!(
            table = self.schema.table_name(),
            count = result.count,
            scanned = result.scanned_count,
            more = result.last_evaluated_key.is_some(),
            "read result"
        );
        Ok(Some(result))
    }

    fn plan(&self, conditions: &Conditions, options: &FindOptions) -> CoreResult<ReadPlan> {
        let table = self.schema.table_name();
        let mut plan = match self.schema.detect_index(conditions) {
            None => {
                let mut request = ScanRequest::new(table);
                request.scan_filter = compile(&self.schema, conditions)?;
                ReadPlan::Scan(request)
            }
            Some(index) => {
                let split = compile_for_index(&self.schema, conditions, index)?;
                let mut request = QueryRequest::new(table);
                if !index.is_primary() {
                    request.index_name = Some(index.name().to_string());
                }
                request.key_conditions = split.key_conditions;
                request.query_filter = split.filter;
                request.scan_index_forward = options
                    .order
                    .as_deref()
                    .map(|o| !o.trim().to_ascii_lowercase().starts_with("desc"));
                ReadPlan::Query(request)
            }
        };

        plan.set_limit(options.limit);
        plan.set_projection(options.select_mode(), options.select.clone());

        let mut start = options.exclusive_start_key.clone();
        if !options.start_with.is_empty() {
            let mut key = NativeItem::new();
            for (field, value) in &options.start_with {
                let column = self.schema.column_for(field)?;
                key.insert(column.name().to_string(), column.to_native(value)?);
            }
            start = Some(key);
        }
        plan.set_start(start);
        Ok(plan)
    }

    fn materialize(&self, items: &[NativeItem]) -> CoreResult<Vec<Record>> {
        items.iter().map(|item| self.load(item)).collect()
    }

    /// Materializes one stored item and runs `after_find` hooks.
    fn load(&self, item: &NativeItem) -> CoreResult<Record> {
        let mut record = Record::from_native(&self.schema, item)?;
        run_each(&mut record, Phase::AfterFind)?;
        Ok(record)
    }
}

/// Lazy, single-pass iterator over every record matching a finder.
///
/// Pages are read on demand; the stream ends when the store reports no
/// further cursor, or repeats the previous one.
pub struct RecordStream<'a, S: StorageClient> {
    collection: &'a Collection<S>,
    conditions: Conditions,
    options: FindOptions,
    buffer: VecDeque<NativeItem>,
    cursor: Option<NativeItem>,
    done: bool,
}

impl<S: StorageClient> Iterator for RecordStream<'_, S> {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(self.collection.load(&item));
            }
            if self.done {
                return None;
            }

            let mut options = self.options.clone();
            if let Some(cursor) = &self.cursor {
                options.start_with.clear();
                options.exclusive_start_key = Some(cursor.clone());
            }
            let page = match self.collection.read(&self.conditions, &options) {
                Ok(page) => page.unwrap_or_else(ItemPage::empty),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            self.buffer.extend(page.items);
            match page.last_evaluated_key {
                Some(next) if self.cursor.as_ref() != Some(&next) => self.cursor = Some(next),
                _ => self.done = true,
            }
        }
    }
}

impl<S: StorageClient> std::fmt::Debug for RecordStream<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStream")
            .field("conditions", &self.conditions)
            .field("buffered", &self.buffer.len())
            .field("done", &self.done)
            .finish()
    }
}
