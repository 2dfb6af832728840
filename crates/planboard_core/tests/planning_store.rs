use planboard_core::db::open_db_in_memory;
use planboard_core::{
    BoardDocument, BoardPayload, EntityId, PlanningStore, Priority, SnapshotInbox,
    SqlitePlanningStore, StoreError, TaskFields, TaskPayload,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn documents(store: &SqlitePlanningStore<'_>, owner: &str) -> Vec<BoardDocument> {
    serde_json::from_value(store.fetch_boards(owner).unwrap()).unwrap()
}

fn task_payload(id: EntityId, title: &str) -> TaskPayload {
    TaskPayload {
        id,
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        status: String::new(),
        due_date: None,
        assignee: None,
        created_at: None,
    }
}

fn board_payload(id: EntityId, title: &str, tasks: Vec<TaskPayload>) -> BoardPayload {
    BoardPayload {
        id,
        title: title.to_string(),
        description: String::new(),
        tasks,
    }
}

#[test]
fn bulk_save_assigns_durable_ids_to_temporary_entities() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    let temp_board = EntityId::temporary();
    let temp_task = EntityId::temporary();

    let receipt = store
        .save_boards(
            "u1",
            &[
                board_payload(
                    temp_board.clone(),
                    "To Do",
                    vec![task_payload(temp_task.clone(), "Write spec")],
                ),
                board_payload(EntityId::temporary(), "Done", vec![]),
            ],
        )
        .unwrap();

    assert_eq!(receipt.board_ids.len(), 2);
    assert_eq!(receipt.task_ids.len(), 1);
    assert_eq!(receipt.assigned.len(), 3);
    let durable_board = &receipt.assigned[temp_board.as_str()];
    assert_eq!(&receipt.board_ids[0], durable_board);
    assert!(!durable_board.starts_with("temp-"));

    let docs = documents(&store, "u1");
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].title, "To Do");
    assert_eq!(docs[1].title, "Done");
    assert!(docs[1].tasks.is_empty());
    let task = &docs[0].tasks[0];
    assert_eq!(task.id.clone().into_string(), receipt.assigned[temp_task.as_str()]);
    assert_eq!(task.status, "to-do");
    assert_eq!(task.priority, "medium");
}

#[test]
fn bulk_save_replaces_whole_board_set() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    let first = store
        .save_boards(
            "u1",
            &[
                board_payload(
                    EntityId::temporary(),
                    "To Do",
                    vec![
                        task_payload(EntityId::temporary(), "keep"),
                        task_payload(EntityId::temporary(), "drop"),
                    ],
                ),
                board_payload(EntityId::temporary(), "Obsolete", vec![]),
            ],
        )
        .unwrap();
    let todo = EntityId::durable(first.board_ids[0].clone());
    let keep = EntityId::durable(first.task_ids[0].clone());

    store
        .save_boards(
            "u1",
            &[
                board_payload(todo.clone(), "To Do", vec![]),
                board_payload(
                    EntityId::temporary(),
                    "Done",
                    vec![task_payload(keep.clone(), "keep")],
                ),
            ],
        )
        .unwrap();

    let docs = documents(&store, "u1");
    let titles: Vec<_> = docs.iter().map(|doc| doc.title.as_str()).collect();
    assert_eq!(titles, vec!["To Do", "Done"]);
    assert!(docs[0].tasks.is_empty());
    assert_eq!(docs[1].tasks.len(), 1);
    assert_eq!(docs[1].tasks[0].id.clone().into_string(), keep.as_str());
    assert_eq!(docs[1].tasks[0].status, "done");
}

#[test]
fn rejected_bulk_save_changes_nothing() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    store
        .save_boards("u1", &[board_payload(EntityId::temporary(), "To Do", vec![])])
        .unwrap();
    let before = store.fetch_boards("u1").unwrap();

    let err = store
        .save_boards(
            "u1",
            &[
                board_payload(EntityId::temporary(), "Fresh", vec![]),
                board_payload(EntityId::temporary(), "   ", vec![]),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert_eq!(store.fetch_boards("u1").unwrap(), before);
}

#[test]
fn owners_are_isolated() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    let receipt = store
        .save_boards("alice", &[board_payload(EntityId::temporary(), "Mine", vec![])])
        .unwrap();
    let alice_board = EntityId::durable(receipt.board_ids[0].clone());

    assert!(documents(&store, "bob").is_empty());
    let err = store
        .save_boards("bob", &[board_payload(alice_board.clone(), "Stolen", vec![])])
        .unwrap_err();
    assert!(matches!(err, StoreError::Rejected(_)));
    assert!(matches!(
        store.delete_board("bob", &alice_board),
        Err(StoreError::NotFound(_))
    ));
    assert_eq!(documents(&store, "alice")[0].title, "Mine");
}

#[test]
fn single_entity_mutations_reject_temporary_ids() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    let temp = EntityId::temporary();

    assert!(matches!(
        store.update_board("u1", &temp, "x", ""),
        Err(StoreError::TemporaryId(id)) if id == temp
    ));
    assert!(matches!(
        store.delete_board("u1", &temp),
        Err(StoreError::TemporaryId(_))
    ));
    assert!(matches!(
        store.create_task("u1", &temp, &TaskFields::titled("x")),
        Err(StoreError::TemporaryId(_))
    ));
    assert!(matches!(
        store.update_task("u1", &temp, &TaskFields::titled("x")),
        Err(StoreError::TemporaryId(_))
    ));
    assert!(matches!(
        store.delete_task("u1", &temp),
        Err(StoreError::TemporaryId(_))
    ));
}

#[test]
fn single_entity_crud_roundtrip() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();

    let board = store.create_board("u1", "To Do", "first column").unwrap();
    assert!(!board.is_temporary());
    let task = store
        .create_task(
            "u1",
            &board,
            &TaskFields {
                title: "Write spec".to_string(),
                priority: Priority::High,
                assignee: Some("ada".to_string()),
                ..TaskFields::default()
            },
        )
        .unwrap();

    let docs = documents(&store, "u1");
    assert_eq!(docs[0].description, "first column");
    assert_eq!(docs[0].tasks[0].status, "to-do");
    assert_eq!(docs[0].tasks[0].priority, "high");
    assert_eq!(docs[0].tasks[0].assignee.as_deref(), Some("ada"));

    store.update_board("u1", &board, "In Review", "").unwrap();
    store
        .update_task("u1", &task, &TaskFields::titled("Review spec"))
        .unwrap();
    let docs = documents(&store, "u1");
    assert_eq!(docs[0].tasks[0].status, "in-review");
    assert_eq!(docs[0].tasks[0].title, "Review spec");
    assert_eq!(docs[0].tasks[0].assignee, None);

    store.delete_task("u1", &task).unwrap();
    assert!(documents(&store, "u1")[0].tasks.is_empty());
    assert!(matches!(
        store.delete_task("u1", &task),
        Err(StoreError::NotFound(_))
    ));

    store.delete_board("u1", &board).unwrap();
    assert!(documents(&store, "u1").is_empty());
}

#[test]
fn mutations_push_snapshots_to_subscribers() {
    let conn = setup();
    let store = SqlitePlanningStore::try_new(&conn).unwrap();
    let inbox = SnapshotInbox::new();
    let subscription = store.subscribe("u1", inbox.listener());
    let other = SnapshotInbox::new();
    let _other_subscription = store.subscribe("u2", other.listener());

    store.create_board("u1", "To Do", "").unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(other.is_empty());
    let pushed: Vec<BoardDocument> = serde_json::from_value(inbox.pop().unwrap()).unwrap();
    assert_eq!(pushed[0].title, "To Do");

    subscription.unsubscribe();
    store.create_board("u1", "Done", "").unwrap();
    assert!(inbox.is_empty());
}
