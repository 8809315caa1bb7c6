//! # Grid Query Engine
//!
//! [`Grid`] turns a [`GridRequest`] into a page of rows:
//!
//! 1. clone the base query (and the count query, if the grid has one)
//! 2. append ORDER BY for every sorter entry
//! 3. AND the filter groups and the search predicate into WHERE
//! 4. count, over the dedicated count query or the filtered base query
//! 5. fetch the requested page with LIMIT/OFFSET
//!
//! Every column is checked against the whitelist before anything runs, so a
//! rejected request never reaches the database.

use sea_orm::{
    Condition, ConnectionTrait, DatabaseBackend, FromQueryResult,
    sea_query::{Alias, Expr, Order, Query, SelectStatement, SimpleExpr},
};
use serde_json::Value;

use crate::{
    errors::GridError,
    filtering::{apply_filters, apply_sort, build_search_condition, calculate_offset},
    models::{FilterClause, GridColumns},
    registry::ColumnRegistry,
    request::GridRequest,
    result::{ResultData, ResultPage, Row},
    traits::GridFilter,
};

/// Suggestions returned per searchable column unless configured otherwise.
pub const DEFAULT_SUGGESTION_LIMIT: u64 = 50;

const COUNT_ALIAS: &str = "count";
const COUNT_SUBQUERY_ALIAS: &str = "grid_count";
const SUGGESTION_ALIAS: &str = "suggestion";

/// Statements assembled for one request, ready to execute.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    main: SelectStatement,
    count: SelectStatement,
    offset: u64,
    limit: u64,
}

impl QueryPlan {
    /// Sorted, filtered and paginated row query.
    #[must_use]
    pub fn main(&self) -> &SelectStatement {
        &self.main
    }

    /// Query whose first column is the number of matching rows.
    #[must_use]
    pub fn count(&self) -> &SelectStatement {
        &self.count
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// A grid definition compiled for execution.
///
/// Read-only after construction; share one instance across requests.
#[derive(Debug, Clone)]
pub struct Grid {
    registry: ColumnRegistry,
    base_query: Option<SelectStatement>,
    count_query: Option<SelectStatement>,
    suggestion_limit: u64,
}

impl Grid {
    #[must_use]
    pub fn new<G: GridFilter>() -> Self {
        Self {
            registry: ColumnRegistry::new(
                G::GRID_NAME,
                G::filter_columns(),
                G::order_columns(),
                G::searchable_columns(),
                G::column_callbacks(),
            ),
            base_query: G::base_query(),
            count_query: G::count_query(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    /// Cap on suggestions fetched per searchable column.
    #[must_use]
    pub fn with_suggestion_limit(mut self, limit: u64) -> Self {
        self.suggestion_limit = limit;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.registry.grid()
    }

    /// External column names accepted for filtering, sorting and search.
    #[must_use]
    pub fn columns(&self) -> GridColumns {
        GridColumns {
            filter: self.registry.filter_names(),
            order: self.registry.order_names(),
            search: self.registry.searchable_names().to_vec(),
        }
    }

    fn base_query(&self) -> Result<SelectStatement, GridError> {
        self.base_query.clone().ok_or_else(|| {
            GridError::configuration(format!("'{}::base_query' is not defined", self.name()))
        })
    }

    /// WHERE predicate for filter and search. Callbacks may add joins to
    /// `query`, which is why it is built once per statement.
    fn predicate(
        &self,
        query: &mut SelectStatement,
        filter: &FilterClause,
        search: Option<&str>,
    ) -> Result<Condition, GridError> {
        let mut condition = apply_filters(query, &self.registry, filter)?;
        if let Some(term) = search {
            condition = condition.add(build_search_condition(query, &self.registry, term)?);
        }
        Ok(condition)
    }

    /// Base query with filter and search applied, no ORDER BY.
    fn filtered_query(
        &self,
        filter: &FilterClause,
        search: Option<&str>,
    ) -> Result<SelectStatement, GridError> {
        let mut query = self.base_query()?;
        self.registry.validate_searchable_columns(search.is_some())?;

        let condition = self.predicate(&mut query, filter, search)?;
        if !condition.is_empty() {
            query.cond_where(condition);
        }
        Ok(query)
    }

    /// Assemble the row and count statements for `request` without running
    /// them.
    ///
    /// # Errors
    ///
    /// Parse errors of the request, whitelist errors for filter, sorter and
    /// search columns, and `GridError::Configuration` without a base query.
    pub fn build_plan(&self, request: &GridRequest) -> Result<QueryPlan, GridError> {
        let filter = request.filter()?;
        let sorter = request.sorter()?;
        let search = request.search();

        let mut main = self.filtered_query(&filter, search.as_deref())?;
        apply_sort(&mut main, &self.registry, &sorter)?;

        let count = match &self.count_query {
            Some(template) => {
                let mut count = template.clone();
                let condition = self.predicate(&mut count, &filter, search.as_deref())?;
                if !condition.is_empty() {
                    count.cond_where(condition);
                }
                count
            }
            None => {
                let mut inner = main.clone();
                inner.clear_order_by();
                Query::select()
                    .expr_as(Expr::cust("COUNT(*)"), Alias::new(COUNT_ALIAS))
                    .from_subquery(inner, Alias::new(COUNT_SUBQUERY_ALIAS))
                    .to_owned()
            }
        };

        let limit = request.items_per_page();
        let offset = calculate_offset(request.page(), limit);
        main.limit(limit).offset(offset);

        tracing::debug!(
            grid = self.name(),
            groups = filter.groups().len(),
            sort_keys = sorter.len(),
            search = search.is_some(),
            offset,
            limit,
            "Built grid query plan"
        );

        Ok(QueryPlan {
            main,
            count,
            offset,
            limit,
        })
    }

    async fn count<C>(db: &C, backend: DatabaseBackend, plan: &QueryPlan) -> Result<u64, GridError>
    where
        C: ConnectionTrait,
    {
        let total = match db.query_one(backend.build(&plan.count)).await? {
            Some(row) => row.try_get_by_index::<i64>(0)?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or_default())
    }

    /// Plan, count and record the total on the request. Rows are left to
    /// the returned [`ResultData`].
    ///
    /// # Errors
    ///
    /// See [`build_plan`](Self::build_plan); `GridError::Execution` if the
    /// count fails.
    pub async fn execute<C>(&self, db: &C, request: &mut GridRequest) -> Result<ResultData, GridError>
    where
        C: ConnectionTrait,
    {
        let plan = self.build_plan(request)?;
        let backend = db.get_database_backend();

        let total = Self::count(db, backend, &plan).await?;
        tracing::debug!(grid = self.name(), total, "Counted grid rows");
        request.set_total(total);

        Ok(ResultData::new(plan.main, backend, plan.offset, total))
    }

    /// One page of rows as JSON maps, with `date_fields` rendered as
    /// `YYYY-MM-DD HH:MM:SS`. The total is also recorded on `request`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn get_data<C>(
        &self,
        db: &C,
        request: &mut GridRequest,
        date_fields: &[&str],
    ) -> Result<ResultPage<Row>, GridError>
    where
        C: ConnectionTrait,
    {
        let mut data = self.execute(db, request).await?;
        let rows = data.rows(db, date_fields).await?.to_vec();
        Ok(ResultPage {
            rows,
            total: data.total_count(),
        })
    }

    /// One page of rows hydrated into `M`.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn get_data_as<M, C>(
        &self,
        db: &C,
        request: &mut GridRequest,
    ) -> Result<ResultPage<M>, GridError>
    where
        M: FromQueryResult,
        C: ConnectionTrait,
    {
        let data = self.execute(db, request).await?;
        Ok(ResultPage {
            rows: data.fetch_as(db).await?,
            total: data.total_count(),
        })
    }

    /// Distinct values of every searchable column among the rows matching
    /// the request's filter and search, for type-ahead inputs. Values are
    /// returned as strings, de-duplicated across columns, at most
    /// `suggestion_limit` per column. Sorter and paging are ignored.
    ///
    /// # Errors
    ///
    /// Parse and whitelist errors of the request, `GridError::Execution` if
    /// a lookup fails.
    pub async fn suggestions<C>(&self, db: &C, request: &GridRequest) -> Result<Vec<String>, GridError>
    where
        C: ConnectionTrait,
    {
        let filter = request.filter()?;
        let search = request.search();
        let filtered = self.filtered_query(&filter, search.as_deref())?;
        let backend = db.get_database_backend();

        let mut suggestions: Vec<String> = Vec::new();
        for (name, resolution) in self.registry.searchable_resolutions()? {
            let column: SimpleExpr = resolution.expression().clone();
            let mut query = filtered.clone();
            query
                .clear_selects()
                .distinct()
                .expr_as(column.clone(), Alias::new(SUGGESTION_ALIAS))
                .and_where(Expr::expr(column.clone()).is_not_null())
                .order_by_expr(column, Order::Asc)
                .limit(self.suggestion_limit);

            let rows = Value::find_by_statement(backend.build(&query)).all(db).await?;
            tracing::debug!(grid = self.name(), column = name, found = rows.len(), "Fetched suggestions");

            for value in rows.iter().filter_map(|row| row.get(SUGGESTION_ALIAS)) {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => continue,
                    other => other.to_string(),
                };
                if !suggestions.contains(&text) {
                    suggestions.push(text);
                }
            }
        }

        Ok(suggestions)
    }
}
