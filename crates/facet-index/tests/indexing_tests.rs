//! Index table installation and row maintenance through the service.

mod common;

use facet_index::config::DialectKind;
use facet_index::error::{ConfigError, FacetError};
use facet_index::sql::SqlParam;
use facet_index::types::StaticItem;

use common::*;

#[tokio::test]
async fn test_install_creates_table_with_filter_columns() {
    let (service, backend, _) = create_service(DialectKind::Mysql);

    service.install("place").await.unwrap();

    let statement = backend.last_statement().unwrap();
    let sql = statement.sql;
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `facets_place`"));
    assert!(sql.contains("`item_id` BIGINT UNSIGNED NOT NULL"));
    assert!(sql.contains("`filter_q` TEXT"));
    assert!(sql.contains("FULLTEXT KEY"));
    assert!(sql.contains("`filter_near` POINT SRID 4326 NOT NULL"));
    assert!(sql.contains("SPATIAL KEY"));
    assert!(sql.contains("`author_id` BIGINT UNSIGNED NOT NULL DEFAULT 0"));
    assert!(!sql.contains("`filter_price`"));
    assert!(statement.params.is_empty());
}

#[tokio::test]
async fn test_mariadb_point_column() {
    let (service, backend, _) = create_service(DialectKind::Mariadb);

    service.install("place").await.unwrap();

    let sql = backend.last_statement().unwrap().sql;
    assert!(sql.contains("`filter_near` POINT REF_SYSTEM_ID=4326 NOT NULL"));
}

#[tokio::test]
async fn test_reinstall_drops_first() {
    let (service, backend, _) = create_service(DialectKind::Mysql);

    service.reinstall("place").await.unwrap();

    let statements = backend.statements();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].sql, "DROP TABLE IF EXISTS `facets_place`");
    assert!(statements[1].sql.starts_with("CREATE TABLE"));
}

#[tokio::test]
async fn test_index_item_upserts_row() {
    let (service, backend, _) = create_service(DialectKind::Mysql);

    service.index_item("place", &pizzeria()).await.unwrap();

    let statement = backend.last_statement().unwrap();
    assert!(statement.sql.starts_with("INSERT INTO `facets_place` ("));
    assert!(statement.sql.contains("ON DUPLICATE KEY UPDATE"));
    assert_eq!(statement.sql.matches('?').count(), statement.params.len());

    let params = &statement.params;
    assert!(params.contains(&SqlParam::integer(101)));
    assert!(params.contains(&SqlParam::integer(3)));
    assert!(params.contains(&SqlParam::integer(7)));
    assert!(params.contains(&SqlParam::integer(45)));
    assert!(params.contains(&SqlParam::string("luigis pizzeria pizza quattro formaggi")));
    assert!(params.contains(&SqlParam::string("POINT(48.8566 2.3522)")));
}

#[tokio::test]
async fn test_index_row_defaults_for_empty_item() {
    let (service, _, _) = create_service(DialectKind::Mysql);

    let row = service.index_row("place", &StaticItem::new(5)).unwrap();

    assert_eq!(row.item_id, 5);
    assert_eq!(row.values["filter_q"].params, vec![SqlParam::string("")]);
    assert_eq!(row.values["filter_near"].params, vec![SqlParam::string("POINT(0 0)")]);
    assert_eq!(row.values["filter_open"].params, vec![SqlParam::integer(0)]);
    assert_eq!(row.values["filter_rating"].params, vec![SqlParam::Null]);
}

#[tokio::test]
async fn test_remove_item() {
    let (service, backend, _) = create_service(DialectKind::Mysql);

    service.remove_item("place", 101).await.unwrap();

    let statement = backend.last_statement().unwrap();
    assert_eq!(statement.sql, "DELETE FROM `facets_place` WHERE `item_id` = ?");
    assert_eq!(statement.params, vec![SqlParam::integer(101)]);
}

#[tokio::test]
async fn test_unknown_content_type() {
    let (service, backend, _) = create_service(DialectKind::Mysql);

    let err = service.install("event").await.unwrap_err();

    assert!(matches!(
        err,
        FacetError::Config(ConfigError::UnknownContentType { ref content_type }) if content_type == "event"
    ));
    assert!(backend.statements().is_empty());
}

#[tokio::test]
async fn test_backend_failure_surfaces() {
    let (service, backend, _) = create_service(DialectKind::Mysql);
    backend.fail_with("table is read only");

    let err = service.index_item("place", &pizzeria()).await.unwrap_err();

    match err {
        FacetError::Backend(err) => assert_eq!(err.backend_name(), "recording"),
        other => panic!("expected backend error, got {:?}", other),
    }
}
