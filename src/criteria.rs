//! Filter criteria orchestration: accumulates WHERE/JOIN/GROUP BY/ORDER
//! BY/LIMIT state and compiles it into one parameterized SQL statement plus a
//! named bind map. The concrete query shape (template, base select list,
//! searchable fields) is supplied by an injected [`QuerySource`] strategy;
//! custom computed columns are resolved by a bounded fixpoint rebuild loop.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::debug;

use crate::clause::{is_vacuous, ClauseSet, SqlStatement};
use crate::criteria::custom::{CustomColumnSet, CUSTOM_COLUMN_SUFFIX};
use crate::error::{CriteriaError, Result};
use crate::join::JoinRegistry;
use crate::placeholder::PlaceholderRegistry;
use crate::search::{self, SearchKeywords};
use crate::template::{
    self, TOKEN_GROUPBY, TOKEN_JOINS, TOKEN_LIMIT, TOKEN_ORDERBY, TOKEN_WHAT, TOKEN_WHERE,
};
use crate::value::BindValue;

pub mod custom;

/// Cap on the custom-column fixpoint loop. A build that keeps discovering
/// newly-used columns past this many rebuilds is a configuration bug.
pub const MAX_BUILD_ITERATIONS: usize = 10;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Asc
    }
}

/// Strategy interface supplying the concrete query shape. Replaces the
/// abstract template methods of a subclassing design: a filter "kind" is a
/// value implementing this trait, composed into the generic compiler.
pub trait QuerySource {
    /// Raw query template containing a subset of the six `{TOKEN}`s.
    fn query_template(&self) -> String;

    /// Mandatory base select fragments; an empty list fails the build.
    fn base_select(&self) -> Vec<String>;

    /// Fields the free-text search fans out across. Empty means search input
    /// is ignored.
    fn search_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Column used for count-mode `COUNT(...)` when the criteria has no
    /// table binding.
    fn count_column(&self) -> String {
        "*".to_string()
    }

    /// One-time init hook, run lazily before the first build or custom-column
    /// access: register statement placeholders, joins and custom columns here.
    fn init(&self, criteria: &mut CriteriaState) -> Result<()> {
        let _ = criteria;
        Ok(())
    }

    /// Per-build preparation hook, run at the start of every assembly pass.
    fn prepare(&self, criteria: &mut CriteriaState) -> Result<()> {
        let _ = criteria;
        Ok(())
    }
}

/// Per-call build flags, threaded explicitly through the assembly stages so
/// count and item builds on the same instance cannot leak state into each
/// other.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext {
    pub is_count: bool,
    pub distinct: bool,
}

/// Fixed conditions injected by the owning record collection: table and
/// primary key, foreign-key pairs AND-ed into every WHERE clause, and the
/// default sort applied when the caller sets none.
#[derive(Debug, Clone, Default)]
pub struct TableBinding {
    pub table: String,
    pub primary_key: String,
    pub fixed: Vec<(String, BindValue)>,
    pub default_order: Option<(String, SortOrder)>,
}

/// The boundary artifact: SQL text, the name→value bind map, and the custom
/// column ids each fixpoint pass newly enabled (empty when the first
/// assembly was already stable).
#[derive(Debug, Clone, Serialize)]
pub struct BuiltQuery {
    pub sql: String,
    pub binds: BTreeMap<String, String>,
    pub enabled_passes: Vec<Vec<String>>,
}

/// Mutable criteria state: placeholder registry, join registry, clause
/// accumulators, custom columns and the order/limit/distinct directives.
/// Exclusively owned by one criteria instance; hooks receive it mutably.
#[derive(Debug, Default, Clone)]
pub struct CriteriaState {
    pub placeholders: PlaceholderRegistry,
    pub joins: JoinRegistry,
    pub custom: CustomColumnSet,
    wheres: ClauseSet,
    group_by: ClauseSet,
    having: ClauseSet,
    select: ClauseSet,
    order_field: Option<String>,
    order: SortOrder,
    limit_offset: u64,
    limit_count: u64,
    distinct: bool,
    count_column: Option<String>,
}

impl CriteriaState {
    /// Add a WHERE fragment. Empty or vacuous (`()`) fragments are rejected;
    /// re-adding an equal fragment is a no-op and returns false.
    pub fn add_where(&mut self, fragment: &str) -> Result<bool> {
        if is_vacuous(fragment) {
            return Err(CriteriaError::InvalidWhereStatement { fragment: fragment.to_string() });
        }
        Ok(self.wheres.add(fragment))
    }

    /// Add a WHERE statement carrying its own named binds. Dedup is by the
    /// raw template; binds are registered on first insertion only.
    pub fn add_where_statement(&mut self, stmt: &SqlStatement) -> Result<bool> {
        if is_vacuous(stmt.template()) {
            return Err(CriteriaError::InvalidWhereStatement {
                fragment: stmt.template().to_string(),
            });
        }
        if !self.wheres.add(stmt.template()) {
            return Ok(false);
        }
        stmt.register_binds(&mut self.placeholders);
        Ok(true)
    }

    /// Equality condition against a bound value.
    pub fn add_where_eq(&mut self, field: &str, value: impl Into<BindValue>) -> Result<bool> {
        let name = self.placeholders.generate(value);
        let frag = format!("{} = {}", field, PlaceholderRegistry::token(&name));
        self.add_where(&frag)
    }

    /// Date-range condition: `field >= :from` and/or `field <= :until`.
    /// Both bounds absent is a no-op.
    pub fn add_where_date(
        &mut self,
        field: &str,
        from: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
    ) -> Result<()> {
        if let Some(from) = from {
            let name = self.placeholders.generate(from.format(DATE_FORMAT).to_string());
            self.add_where(&format!("{} >= {}", field, PlaceholderRegistry::token(&name)))?;
        }
        if let Some(until) = until {
            let name = self.placeholders.generate(until.format(DATE_FORMAT).to_string());
            self.add_where(&format!("{} <= {}", field, PlaceholderRegistry::token(&name)))?;
        }
        Ok(())
    }

    pub fn add_group_by(&mut self, fragment: &str) -> bool {
        self.group_by.add(fragment)
    }

    pub fn add_having(&mut self, fragment: &str) -> bool {
        self.having.add(fragment)
    }

    pub fn add_select_column(&mut self, fragment: &str) -> bool {
        self.select.add(fragment)
    }

    /// Set the ordering column and direction. Naming a registered custom
    /// column force-enables it.
    pub fn set_order_by(&mut self, field: &str, order: SortOrder) {
        if self.custom.has(field) {
            // registered id, cannot fail
            let _ = self.custom.set_enabled(field, true);
            debug!(target: "criterium::build", "order by custom column '{}' force-enables it", field);
        }
        self.order_field = Some(field.to_string());
        self.order = order;
    }

    pub fn order_by(&self) -> Option<(&str, SortOrder)> {
        self.order_field.as_deref().map(|f| (f, self.order))
    }

    pub fn make_distinct(&mut self) {
        self.distinct = true;
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn set_limit(&mut self, offset: u64, count: u64) {
        self.limit_offset = offset;
        self.limit_count = count;
    }

    pub fn set_count_column(&mut self, column: &str) {
        self.count_column = Some(column.to_string());
    }

    /// Clear per-query state for reuse on an unrelated query. Registered
    /// join/column pools survive; active joins deactivate and custom columns
    /// disable.
    pub fn reset(&mut self) {
        self.placeholders.reset();
        self.wheres.clear();
        self.group_by.clear();
        self.having.clear();
        self.select.clear();
        self.order_field = None;
        self.order = SortOrder::default();
        self.limit_offset = 0;
        self.limit_count = 0;
        self.distinct = false;
        self.joins.deactivate_all();
        self.custom.disable_all();
    }

    fn render_where(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.wheres.join(" AND "))
        }
    }

    fn render_limit(&self, ctx: &BuildContext) -> String {
        if ctx.is_count || (self.limit_offset == 0 && self.limit_count == 0) {
            String::new()
        } else {
            format!("LIMIT {},{}", self.limit_offset, self.limit_count)
        }
    }

    fn render_order_by(&self, ctx: &BuildContext) -> String {
        if ctx.is_count {
            return String::new();
        }
        match &self.order_field {
            None => String::new(),
            Some(field) => {
                format!("ORDER BY {} {}", quote_order_field(field), self.order.as_sql())
            }
        }
    }
}

/// Quote a plain ordering column; already-qualified fields (table dot,
/// namespace separator) and custom-column aliases pass through untouched.
fn quote_order_field(field: &str) -> String {
    if field.contains('.') || field.contains("::") || field.ends_with(CUSTOM_COLUMN_SUFFIX) {
        field.to_string()
    } else {
        format!("`{}`", field)
    }
}

fn push_unique(items: &mut Vec<String>, fragment: &str) {
    if !items.iter().any(|f| f == fragment) {
        items.push(fragment.to_string());
    }
}

fn render_group_by(group_items: &[String], having_items: &[String]) -> String {
    let mut out = String::new();
    if !group_items.is_empty() {
        out.push_str("GROUP BY ");
        out.push_str(&group_items.join(", "));
    }
    if !having_items.is_empty() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str("HAVING ");
        out.push_str(&having_items.join(" AND "));
    }
    out
}

/// Filter criteria compiler. Single-threaded and non-reentrant: every build
/// entry point takes `&mut self`, so exclusive use per instance is
/// compile-checked.
#[derive(Debug, Clone)]
pub struct FilterCriteria<S: QuerySource> {
    source: S,
    state: CriteriaState,
    keywords: SearchKeywords,
    initialized: bool,
}

impl<S: QuerySource> FilterCriteria<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: CriteriaState::default(),
            keywords: SearchKeywords::default(),
            initialized: false,
        }
    }

    pub fn set_search_keywords(&mut self, keywords: SearchKeywords) {
        self.keywords = keywords;
    }

    /// Mutable access to the accumulated criteria state, running the
    /// one-time init hook first.
    pub fn criteria(&mut self) -> Result<&mut CriteriaState> {
        self.ensure_init()?;
        Ok(&mut self.state)
    }

    /// Apply the owning collection's fixed conditions: count column becomes
    /// `table.pk`, foreign-key pairs become unconditional WHERE fragments,
    /// and the default sort applies when none is set yet.
    pub fn bind_table(&mut self, binding: &TableBinding) -> Result<()> {
        self.ensure_init()?;
        self.state.count_column = Some(format!("{}.{}", binding.table, binding.primary_key));
        for (column, value) in &binding.fixed {
            let name = self.state.placeholders.generate(value.clone());
            let frag = format!(
                "{}.{} = {}",
                binding.table,
                column,
                PlaceholderRegistry::token(&name)
            );
            self.state.add_where(&frag)?;
        }
        if self.state.order_field.is_none() {
            if let Some((field, order)) = &binding.default_order {
                self.state.set_order_by(field, *order);
            }
        }
        Ok(())
    }

    /// Compile a free-text search string across the source's searchable
    /// fields into one WHERE fragment. Empty compilations add nothing.
    pub fn add_search(&mut self, input: &str) -> Result<()> {
        self.ensure_init()?;
        let terms = search::tokenize(input);
        let fields = self.source.search_fields();
        let fragment = search::compile(&terms, &fields, &self.keywords, &mut self.state.placeholders);
        if !fragment.is_empty() {
            self.state.add_where(&fragment)?;
        }
        Ok(())
    }

    pub fn register_custom_column(
        &mut self,
        id: &str,
        expression: &str,
        required_joins: &[&str],
    ) -> Result<()> {
        self.ensure_init()?;
        self.state.custom.register(id, expression, required_joins)
    }

    /// The select fragment of a registered custom column (`expr AS id`).
    pub fn custom_select(&mut self, id: &str) -> Result<String> {
        self.ensure_init()?;
        Ok(self.state.custom.get(id)?.select_fragment())
    }

    pub fn set_custom_column(&mut self, id: &str, enable: bool) -> Result<()> {
        self.ensure_init()?;
        self.state.custom.set_enabled(id, enable)
    }

    pub fn has_custom_column(&mut self, id: &str) -> Result<bool> {
        self.ensure_init()?;
        Ok(self.state.custom.has(id))
    }

    /// Build the item query (ORDER BY and LIMIT included when set).
    pub fn build_items_query(&mut self) -> Result<BuiltQuery> {
        self.build(false)
    }

    /// Build the count query: select list replaced by `COUNT(...)`, ORDER BY
    /// and LIMIT suppressed.
    pub fn build_count_query(&mut self) -> Result<BuiltQuery> {
        self.build(true)
    }

    /// Compile to SQL text only; the bind map stays readable via
    /// [`FilterCriteria::bind_map`].
    pub fn build_query(&mut self, is_count: bool) -> Result<String> {
        Ok(self.build(is_count)?.sql)
    }

    /// Full build: assemble the query, then scan the emitted SQL for disabled
    /// custom columns whose expression is nevertheless present, enable them
    /// and rebuild until stable or the iteration cap trips.
    pub fn build(&mut self, is_count: bool) -> Result<BuiltQuery> {
        self.ensure_init()?;
        let ctx = BuildContext { is_count, distinct: self.state.distinct };
        debug!(target: "criterium::build", "build start count={} distinct={}", ctx.is_count, ctx.distinct);
        let mut passes: Vec<Vec<String>> = Vec::new();
        let mut sql = self.assemble(&ctx)?;
        for pass in 0..MAX_BUILD_ITERATIONS {
            let newly = self.state.custom.enable_found(&sql);
            if newly.is_empty() {
                debug!(target: "criterium::build", "query stable after {} rebuild pass(es)", pass);
                return Ok(BuiltQuery {
                    sql,
                    binds: self.state.placeholders.bind_map(),
                    enabled_passes: passes,
                });
            }
            passes.push(newly);
            sql = self.assemble(&ctx)?;
        }
        Err(CriteriaError::MaxBuildIterationsReached { iterations: MAX_BUILD_ITERATIONS })
    }

    pub fn bind_map(&self) -> BTreeMap<String, String> {
        self.state.placeholders.bind_map()
    }

    /// Clear per-query state for reuse; see [`CriteriaState::reset`].
    pub fn reset(&mut self) {
        self.state.reset();
    }

    fn ensure_init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        self.source.init(&mut self.state)
    }

    /// One assembly pass. Token order matters: the select list is computed
    /// last because earlier passes (distinct group-by folding, order-column
    /// auto-add) can still add select columns.
    fn assemble(&mut self, ctx: &BuildContext) -> Result<String> {
        self.source.prepare(&mut self.state)?;
        // the prepare hook may toggle directives like make_distinct, so the
        // distinct flag is re-read once the hook has run
        let ctx = &BuildContext { distinct: self.state.distinct, ..*ctx };

        let mut sql = self.source.query_template();
        // count mode expresses distinctness as COUNT(DISTINCT ...) instead
        if ctx.distinct && !ctx.is_count {
            sql = template::inject_distinct(&sql)?;
        }

        let base = self.source.base_select();
        if base.is_empty() {
            return Err(CriteriaError::EmptySelectFieldsList);
        }

        // enabled custom columns pull in their joins in every mode
        let required: Vec<String> = self
            .state
            .custom
            .enabled()
            .flat_map(|c| c.required_joins().iter().cloned())
            .collect();
        for id in required {
            self.state.joins.require(&id)?;
        }

        sql = template::substitute(&sql, TOKEN_JOINS, &self.state.joins.render(true));
        sql = template::substitute(&sql, TOKEN_WHERE, &self.state.render_where());

        // Render-time additions happen on local lists so count and item
        // builds on the same instance stay independent.
        let mut select_items: Vec<String> = Vec::new();
        for item in base {
            push_unique(&mut select_items, &item);
        }
        for item in self.state.select.items() {
            push_unique(&mut select_items, item);
        }
        if !ctx.is_count {
            let custom_fragments: Vec<String> =
                self.state.custom.enabled().map(|c| c.select_fragment()).collect();
            for fragment in custom_fragments {
                push_unique(&mut select_items, &fragment);
            }
        }

        let mut group_items: Vec<String> = self.state.group_by.items().to_vec();
        if ctx.distinct && !ctx.is_count {
            // distinct plus explicit grouping avoids undefined-column
            // ambiguity in the underlying engine
            for item in select_items.clone() {
                push_unique(&mut group_items, &item);
            }
            if let Some(field) = self.state.order_field.clone() {
                push_unique(&mut select_items, &field);
                push_unique(&mut group_items, &field);
            }
        }

        sql = template::substitute(
            &sql,
            TOKEN_GROUPBY,
            &render_group_by(&group_items, self.state.having.items()),
        );
        sql = template::substitute(&sql, TOKEN_ORDERBY, &self.state.render_order_by(ctx));
        sql = template::substitute(&sql, TOKEN_LIMIT, &self.state.render_limit(ctx));

        let what = if ctx.is_count {
            let column = self
                .state
                .count_column
                .clone()
                .unwrap_or_else(|| self.source.count_column());
            format!("COUNT({}{})", if ctx.distinct { "DISTINCT " } else { "" }, column)
        } else {
            select_items.join(", ")
        };
        sql = template::substitute(&sql, TOKEN_WHAT, &what);
        Ok(sql)
    }
}
