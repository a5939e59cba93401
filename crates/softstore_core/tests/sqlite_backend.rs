mod common;

use common::Item;
use serde_json::{json, Value};
use softstore_core::db::open_db_in_memory;
use softstore_core::{CrudRepository, Document, Filter, RepoError, SqliteCrudRepository, Where};
use uuid::Uuid;

fn repo<'conn>(conn: &'conn rusqlite::Connection) -> SqliteCrudRepository<'conn, Item> {
    SqliteCrudRepository::try_new(conn, "items").unwrap()
}

#[test]
fn create_defaults_unset_timestamps_at_the_storage_boundary() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let created = repo.create(Item::new("raw", "a")).unwrap();
    assert!(created.audit.created_at.unwrap() > 0);
    assert_eq!(created.audit.created_at, created.audit.updated_at);

    let mut preset = Item::new("preset", "a");
    preset.audit.created_at = Some(123);
    preset.audit.updated_at = Some(456);
    let stored = repo.create(preset).unwrap();
    assert_eq!(stored.audit.created_at, Some(123));
    assert_eq!(stored.audit.updated_at, Some(456));
}

#[test]
fn try_new_rejects_malformed_table_names() {
    let conn = open_db_in_memory().unwrap();
    let result = SqliteCrudRepository::<Item>::try_new(&conn, "items; DROP TABLE x");
    assert!(matches!(result, Err(RepoError::InvalidData(_))));
}

#[test]
fn find_returns_rows_in_insertion_order_with_paging() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let a = repo.create(Item::new("a", "x")).unwrap();
    let b = repo.create(Item::new("b", "x")).unwrap();
    let c = repo.create(Item::new("c", "x")).unwrap();

    let all = repo.find(None).unwrap();
    assert_eq!(
        all.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![a.id, b.id, c.id]
    );

    let page = repo
        .find(Some(&Filter {
            condition: None,
            limit: Some(2),
            offset: 1,
        }))
        .unwrap();
    assert_eq!(
        page.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![b.id, c.id]
    );

    let offset_only = repo
        .find(Some(&Filter {
            condition: None,
            limit: None,
            offset: 2,
        }))
        .unwrap();
    assert_eq!(
        offset_only.iter().map(|item| item.id).collect::<Vec<_>>(),
        vec![c.id]
    );
}

#[test]
fn null_conditions_match_unset_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    repo.create(Item::new("fresh", "a")).unwrap();

    let found = repo
        .find(Some(&Filter::with_condition(Where::field(
            "deleted_by",
            Value::Null,
        ))))
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn wrapped_disjunction_evaluates_like_any_match_and_not_deleted() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let keep = repo.create(Item::new("keep", "a")).unwrap();
    let tombstoned = {
        let mut item = Item::new("tombstoned", "b");
        item.audit.mark_deleted(100, None);
        repo.create(item).unwrap()
    };
    repo.create(Item::new("unrelated", "c")).unwrap();

    // Shape produced by the disjunction rewrite rule.
    let condition = Where::all(vec![
        Where::field("deleted", false),
        Where::any(vec![Where::field("kind", "a"), Where::field("kind", "b")]),
    ]);

    let found = repo
        .find(Some(&Filter::with_condition(condition)))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, keep.id);
    assert_ne!(found[0].id, tombstoned.id);
}

#[test]
fn update_all_merges_patch_into_matching_documents() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let one = repo.create(Item::new("one", "a")).unwrap();
    let two = repo.create(Item::new("two", "b")).unwrap();

    let mut data = Document::new();
    data.insert("name".to_string(), json!("patched"));
    let updated = repo
        .update_all(&data, Some(&Where::field("kind", "a")))
        .unwrap();
    assert_eq!(updated, 1);

    assert_eq!(repo.find_by_id(&one.id).unwrap().unwrap().name, "patched");
    assert_eq!(repo.find_by_id(&two.id).unwrap().unwrap().name, "two");
}

#[test]
fn update_by_id_and_delete_by_id_report_missing_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    let missing = Uuid::new_v4();
    let mut data = Document::new();
    data.insert("name".to_string(), json!("x"));

    assert!(matches!(
        repo.update_by_id(&missing, &data),
        Err(RepoError::NotFound(_))
    ));
    assert!(matches!(
        repo.delete_by_id(&missing),
        Err(RepoError::NotFound(_))
    ));
}

#[test]
fn count_and_delete_all_honor_conditions() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    repo.create(Item::new("one", "a")).unwrap();
    repo.create(Item::new("two", "a")).unwrap();
    repo.create(Item::new("three", "b")).unwrap();

    assert_eq!(repo.count(Some(&Where::field("kind", "a"))).unwrap(), 2);
    assert_eq!(repo.count(None).unwrap(), 3);

    let removed = repo.delete_all(Some(&Where::field("kind", "a"))).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repo.count(None).unwrap(), 1);
}

#[test]
fn repositories_on_distinct_tables_are_isolated() {
    let conn = open_db_in_memory().unwrap();
    let items = SqliteCrudRepository::<Item>::try_new(&conn, "items").unwrap();
    let archive = SqliteCrudRepository::<Item>::try_new(&conn, "archive").unwrap();

    items.create(Item::new("only-here", "a")).unwrap();

    assert_eq!(items.count(None).unwrap(), 1);
    assert_eq!(archive.count(None).unwrap(), 0);
}

#[test]
fn empty_boolean_nodes_behave_as_constants() {
    let conn = open_db_in_memory().unwrap();
    let repo = repo(&conn);

    repo.create(Item::new("one", "a")).unwrap();

    assert_eq!(repo.count(Some(&Where::And(vec![]))).unwrap(), 1);
    assert_eq!(repo.count(Some(&Where::Or(vec![]))).unwrap(), 0);
}
