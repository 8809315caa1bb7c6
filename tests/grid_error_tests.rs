use gridcrate::{Grid, GridError, GridRequest};
use serde_json::json;

mod common;
use common::{
    BrokenSearchGrid, EntityGrid, EntityRow, MissingTableGrid, NoBaseQueryGrid, PlainGrid,
    request, setup_test_db,
};

async fn run(grid: &Grid, mut request: GridRequest) -> Result<u64, GridError> {
    let db = setup_test_db().await.expect("Failed to setup test database");
    grid.get_data(&db, &mut request, &[]).await.map(|page| page.total)
}

#[tokio::test]
async fn test_whitelisted_filters_never_raise_column_errors() {
    let grid = Grid::new::<EntityGrid>();
    for column in grid.columns().filter {
        let request = request(json!({
            "filter": [[{"column": column, "operator": "NEMPTY"}]],
        }));
        let result = run(&grid, request).await;
        assert!(result.is_ok(), "{column}: {result:?}");
    }
}

#[tokio::test]
async fn test_unknown_filter_column() {
    let request = request(json!({
        "filter": [[{"column": "password", "operator": "EQ", "value": "x"}]],
    }));
    let err = run(&Grid::new::<EntityGrid>(), request).await.unwrap_err();

    assert!(matches!(err, GridError::FilterColumn { ref column, .. } if column == "password"));
    assert!(err.to_string().contains("'password'"));
}

#[tokio::test]
async fn test_unknown_sort_column() {
    let request = request(json!({"sorter": [{"column": "Unknown", "direction": "ASC"}]}));
    let err = run(&Grid::new::<EntityGrid>(), request).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Column 'Unknown' cannot be used for sorting! Have you forgotten add it to 'EntityGrid::order_columns'?"
    );
}

#[tokio::test]
async fn test_filterable_but_not_sortable() {
    let request = request(json!({"sorter": [{"column": "bool", "direction": "DESC"}]}));
    let err = run(&Grid::new::<EntityGrid>(), request).await.unwrap_err();
    assert!(matches!(err, GridError::SortColumn { .. }));
}

#[tokio::test]
async fn test_missing_value_is_rejected_before_execution() {
    let request = request(json!({"filter": [[{"column": "int", "operator": "GTE"}]]}));
    let err = run(&Grid::new::<EntityGrid>(), request).await.unwrap_err();
    assert!(matches!(err, GridError::FilterFormat { .. }));
}

#[tokio::test]
async fn test_invalid_sort_direction() {
    let request = request(json!({"sorter": [{"column": "id", "direction": "descending"}]}));
    let err = run(&Grid::new::<EntityGrid>(), request).await.unwrap_err();
    assert!(matches!(err, GridError::SortFormat { .. }));
}

#[tokio::test]
async fn test_search_without_searchable_columns() {
    let grid = Grid::new::<PlainGrid>();

    assert_eq!(run(&grid, GridRequest::default()).await.unwrap(), 10);

    let err = run(&grid, request(json!({"search": "String"}))).await.unwrap_err();
    assert!(matches!(err, GridError::SearchColumn { .. }));
}

#[tokio::test]
async fn test_searchable_column_must_be_filterable() {
    let err = run(&Grid::new::<BrokenSearchGrid>(), GridRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::SearchColumn { .. }));
    assert!(err.to_string().contains("'password'"));
}

#[tokio::test]
async fn test_missing_base_query_is_a_configuration_error() {
    let err = run(&Grid::new::<NoBaseQueryGrid>(), GridRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::Configuration { .. }));
    assert_eq!(err.code(), 7);
}

#[tokio::test]
async fn test_database_failure_is_an_execution_error() {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let err = Grid::new::<MissingTableGrid>()
        .get_data_as::<EntityRow, _>(&db, &mut GridRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GridError::Execution(_)));
    assert!(err.to_string().starts_with("A database error occurred"));
}
