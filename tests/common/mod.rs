#![allow(dead_code)]

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use chrono::{NaiveDate, NaiveDateTime};
use gridcrate::{
    ColumnCallback, FilterValue, Grid, GridError, GridFilter, GridRequest, Operator, Scalar,
    column_callback, grid_response,
};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, FromQueryResult};
use sea_orm_migration::prelude::*;
use serde_json::Value;
use std::sync::Arc;

pub const ROWS: i32 = 10;

/// Route grid debug events to the test output; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed(&db).await?;

    Ok(db)
}

pub fn fixture_date(i: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1 + <u32 as TryFrom<i32>>::try_from(i).unwrap())
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// Rows `i = 0..10`: `String i`, `i`, `i.i`, even `i` is true, 2024-01-(i+1),
/// and a note on even rows only.
async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut insert = Query::insert();
    insert.into_table(GridTable).columns([
        GridColumn::String,
        GridColumn::Int,
        GridColumn::Float,
        GridColumn::Bool,
        GridColumn::Date,
        GridColumn::Note,
    ]);

    for i in 0..ROWS {
        let note = (i % 2 == 0).then(|| format!("Note {i}"));
        insert.values_panic([
            format!("String {i}").into(),
            i.into(),
            format!("{i}.{i}").parse::<f64>().unwrap().into(),
            (i % 2 == 0).into(),
            fixture_date(i).into(),
            note.into(),
        ]);
    }

    db.execute(db.get_database_backend().build(&insert)).await?;
    Ok(())
}

pub fn request(bag: Value) -> GridRequest {
    let Value::Object(map) = bag else {
        panic!("request bag must be a JSON object")
    };
    GridRequest::new(map)
}

#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct EntityRow {
    pub id: i32,
    pub string: String,
    pub int: i32,
    pub float: f64,
    pub bool: bool,
    pub date: NaiveDateTime,
    pub note: Option<String>,
}

pub fn ints(rows: &[EntityRow]) -> Vec<i32> {
    rows.iter().map(|row| row.int).collect()
}

fn alias() -> Alias {
    Alias::new("e")
}

fn col(column: GridColumn) -> SimpleExpr {
    Expr::col((alias(), column)).into()
}

fn entity_query() -> SelectStatement {
    Query::select()
        .columns([
            (alias(), GridColumn::Id),
            (alias(), GridColumn::String),
            (alias(), GridColumn::Int),
            (alias(), GridColumn::Float),
            (alias(), GridColumn::Bool),
            (alias(), GridColumn::Date),
            (alias(), GridColumn::Note),
        ])
        .from_as(GridTable, alias())
        .to_owned()
}

fn entity_filter_columns() -> Vec<(&'static str, SimpleExpr)> {
    vec![
        ("id", col(GridColumn::Id)),
        ("string", col(GridColumn::String)),
        ("custom_string", col(GridColumn::String)),
        ("int", col(GridColumn::Int)),
        ("float", col(GridColumn::Float)),
        ("bool", col(GridColumn::Bool)),
        ("date", col(GridColumn::Date)),
        ("note", col(GridColumn::Note)),
    ]
}

fn entity_order_columns() -> Vec<(&'static str, SimpleExpr)> {
    vec![
        ("id", col(GridColumn::Id)),
        ("string", col(GridColumn::String)),
        ("int", col(GridColumn::Int)),
        ("float", col(GridColumn::Float)),
        ("date", col(GridColumn::Date)),
    ]
}

/// `custom_string` matches exactly, or by substring when searched.
fn custom_string_callback() -> ColumnCallback {
    column_callback(|_, value, column, group, operator| {
        let text = value
            .and_then(FilterValue::first)
            .map(Scalar::as_text)
            .unwrap_or_default();
        match operator {
            Operator::Like => group.add(Expr::expr(column.clone()).like(format!("%{text}%"))),
            _ => group.add(Expr::expr(column.clone()).eq(text)),
        }
    })
}

/// Full grid with a callback column and a dedicated count query.
pub struct EntityGrid;

impl GridFilter for EntityGrid {
    const GRID_NAME: &'static str = "EntityGrid";

    fn base_query() -> Option<SelectStatement> {
        Some(entity_query())
    }

    fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_filter_columns()
    }

    fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_order_columns()
    }

    fn searchable_columns() -> Vec<&'static str> {
        vec!["string", "custom_string", "int", "float"]
    }

    fn column_callbacks() -> Vec<(&'static str, ColumnCallback)> {
        vec![("custom_string", custom_string_callback())]
    }

    fn count_query() -> Option<SelectStatement> {
        Some(
            Query::select()
                .expr_as(Expr::col((alias(), GridColumn::Id)).count(), Alias::new("count"))
                .from_as(GridTable, alias())
                .to_owned(),
        )
    }
}

/// Same columns, no search, total counted over the filtered base query.
pub struct PlainGrid;

impl GridFilter for PlainGrid {
    const GRID_NAME: &'static str = "PlainGrid";

    fn base_query() -> Option<SelectStatement> {
        Some(entity_query())
    }

    fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_filter_columns()
    }

    fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_order_columns()
    }
}

/// Searchable column that is not filterable.
pub struct BrokenSearchGrid;

impl GridFilter for BrokenSearchGrid {
    const GRID_NAME: &'static str = "BrokenSearchGrid";

    fn base_query() -> Option<SelectStatement> {
        Some(entity_query())
    }

    fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_filter_columns()
    }

    fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_order_columns()
    }

    fn searchable_columns() -> Vec<&'static str> {
        vec!["string", "password"]
    }
}

pub struct NoBaseQueryGrid;

impl GridFilter for NoBaseQueryGrid {
    const GRID_NAME: &'static str = "NoBaseQueryGrid";

    fn base_query() -> Option<SelectStatement> {
        None
    }

    fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_filter_columns()
    }

    fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
        entity_order_columns()
    }
}

/// Lists from a table that does not exist.
pub struct MissingTableGrid;

impl GridFilter for MissingTableGrid {
    const GRID_NAME: &'static str = "MissingTableGrid";

    fn base_query() -> Option<SelectStatement> {
        Some(
            Query::select()
                .column(Asterisk)
                .from(Alias::new("no_such_table"))
                .to_owned(),
        )
    }

    fn filter_columns() -> Vec<(&'static str, SimpleExpr)> {
        Vec::new()
    }

    fn order_columns() -> Vec<(&'static str, SimpleExpr)> {
        Vec::new()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub grid: Arc<Grid>,
    pub db: DatabaseConnection,
}

async fn list_entities(
    State(state): State<AppState>,
    request: GridRequest,
) -> Result<impl IntoResponse, GridError> {
    grid_response(&state.grid, &state.db, request, &["date"]).await
}

pub fn setup_test_app(db: DatabaseConnection) -> Router {
    let state = AppState {
        grid: Arc::new(Grid::new::<EntityGrid>()),
        db,
    };

    let api = Router::new()
        .route("/entities", get(list_entities))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateGridTable)]
    }
}

pub struct CreateGridTable;

#[async_trait::async_trait]
impl MigrationName for CreateGridTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_grid_entity_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateGridTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(GridTable)
            .if_not_exists()
            .col(
                ColumnDef::new(GridColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(GridColumn::String).string().not_null())
            .col(ColumnDef::new(GridColumn::Int).integer().not_null())
            .col(ColumnDef::new(GridColumn::Float).double().not_null())
            .col(ColumnDef::new(GridColumn::Bool).boolean().not_null())
            .col(ColumnDef::new(GridColumn::Date).date_time().not_null())
            .col(ColumnDef::new(GridColumn::Note).string().null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GridTable).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum GridColumn {
    Id,
    String,
    Int,
    Float,
    Bool,
    Date,
    Note,
}

impl Iden for GridColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::String => "string",
                Self::Int => "int",
                Self::Float => "float",
                Self::Bool => "bool",
                Self::Date => "date",
                Self::Note => "note",
            }
        )
        .unwrap();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GridTable;

impl Iden for GridTable {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "grid_entity").unwrap();
    }
}
