use chrono::{DateTime, TimeZone, Utc};
use docshape::{memory::InMemoryGateway, prelude::*};

async fn seeded() -> DocumentManager<InMemoryGateway> {
    let manager = DocumentManager::new(InMemoryGateway::builder().build().await.unwrap());

    let rows = ["Ann", "Bob", "Cid", "Dee", "Eve"]
        .iter()
        .zip([31, 25, 31, 40, 19])
        .map(|(name, age)| Object::new().with("name", *name).with("age", age).with("tags", vec!["staff"]))
        .collect::<Vec<_>>();

    manager
        .insert("people", &Object::new().with("root", rows))
        .await
        .unwrap();

    manager
}

fn names(response: &Object) -> Vec<&str> {
    response
        .get_object_array("root")
        .unwrap()
        .iter()
        .map(|row| row.get_str("name").unwrap())
        .collect()
}

#[tokio::test]
async fn test_find_pages_sorts_and_counts() {
    let manager = seeded().await;
    let search = Object::new()
        .with("tags", "staff")
        .with("$start", 1)
        .with("$limit", 2)
        .with("$orderBy", vec!["-age", "name"]);

    let response = manager.find("people", &search).await.unwrap();

    assert_eq!(response.get_long("total"), Some(5));
    assert_eq!(names(&response), vec!["Ann", "Cid"]);
    assert!(search.contains_key("$limit"));
}

#[tokio::test]
async fn test_find_without_limit_has_no_total() {
    let manager = seeded().await;

    let response = manager
        .find("people", &Object::new().with("age", 31))
        .await
        .unwrap();

    assert!(!response.contains_key("total"));
    assert_eq!(names(&response), vec!["Ann", "Cid"]);
}

#[tokio::test]
async fn test_find_projects_fields() {
    let manager = seeded().await;

    let response = manager
        .find("people", &Object::new().with("name", "Bob").with("$fields", vec!["name"]))
        .await
        .unwrap();

    let row = &response.get_object_array("root").unwrap()[0];
    assert_eq!(row.keys().collect::<Vec<_>>(), vec!["_id", "name"]);

    let response = manager
        .find("people", &Object::new().with("name", "Bob").with("$fields", vec!["-_id", "-tags"]))
        .await
        .unwrap();

    assert_eq!(
        response.get_object_array("root").unwrap(),
        &[Object::new().with("name", "Bob").with("age", 25)]
    );
}

#[tokio::test]
async fn test_insert_returns_stored_row_with_hex_id() {
    let manager = DocumentManager::new(InMemoryGateway::new());
    let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

    let inserted = manager
        .insert(
            "events",
            &Object::new()
                .with("kind", "deploy")
                .with("at", when)
                .with("meta", Object::new().with("attempt", 2)),
        )
        .await
        .unwrap();

    let rows = inserted.get_object_array("root").unwrap();
    let id = rows[0].get_str("_id").unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(id.len(), 24);
    assert_eq!(rows[0].get_datetime("at").map(|at| at.with_timezone(&Utc)), Some(when));
    assert_eq!(rows[0].get_object("meta").and_then(|meta| meta.get_integer("attempt")), Some(2));

    let found = manager
        .find("events", &Object::new().with("_id", id))
        .await
        .unwrap();
    assert_eq!(found.get_object_array("root").unwrap(), rows);
}

#[tokio::test]
async fn test_batch_insert_returns_every_row() {
    let manager = DocumentManager::new(InMemoryGateway::new());
    let rows = vec![
        Object::new().with("n", 1),
        Object::new().with("n", 2),
        Object::new().with("n", 3),
    ];

    let inserted = manager
        .insert("numbers", &Object::new().with("root", rows))
        .await
        .unwrap();

    assert_eq!(
        inserted
            .get_object_array("root")
            .unwrap()
            .iter()
            .map(|row| row.get_integer("n").unwrap())
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn test_update_with_set_reads_back() {
    let manager = seeded().await;

    let updated = manager
        .update(
            "people",
            &Object::new().with("age", 31),
            &Object::new().with("$set", Object::new().with("team", "core")),
            true,
        )
        .await
        .unwrap();

    assert_eq!(names(&updated), vec!["Ann", "Cid"]);
    assert!(updated
        .get_object_array("root")
        .unwrap()
        .iter()
        .all(|row| row.get_str("team") == Some("core")));
}

#[tokio::test]
async fn test_update_by_id_sets_fields() {
    let manager = seeded().await;
    let bob = manager
        .find("people", &Object::new().with("name", "Bob"))
        .await
        .unwrap();
    let id = bob.get_object_array("root").unwrap()[0].get_str("_id").unwrap().to_string();

    let updated = manager
        .update(
            "people",
            &Object::new().with("_id", id.as_str()),
            &Object::new().with("$set", Object::new().with("name", "Robert")),
            false,
        )
        .await
        .unwrap();

    assert_eq!(
        updated.get_object_array("root").unwrap(),
        &[Object::new()
            .with("_id", id.as_str())
            .with("name", "Robert")
            .with("age", 25)
            .with("tags", vec!["staff"])]
    );
}

#[tokio::test]
async fn test_update_with_plain_fields_is_rejected() {
    let manager = seeded().await;

    let result = manager
        .update(
            "people",
            &Object::new().with("name", "Bob"),
            &Object::new().with("name", "Robert"),
            false,
        )
        .await;

    assert!(matches!(result, Err(DocumentError::Backend(_))));
}

#[tokio::test]
async fn test_delete_counts_removed_rows() {
    let manager = seeded().await;
    let people = manager.collection("people");

    assert_eq!(people.delete(&Object::new().with("age", 31), false).await.unwrap(), 1);
    assert_eq!(people.delete_many(&Object::new().with("tags", "staff")).await.unwrap(), 4);

    let rest = people.find(&Object::new().with("$limit", 10)).await.unwrap();
    assert_eq!(rest.get_long("total"), Some(0));
    assert!(rest.get_object_array("root").is_none_or(|rows| rows.is_empty()));
}

#[tokio::test]
async fn test_malformed_id_is_rejected() {
    let manager = seeded().await;

    let result = manager
        .find("people", &Object::new().with("_id", "not-an-id"))
        .await;

    assert!(matches!(result, Err(DocumentError::MalformedIdentifier(_))));
}

#[tokio::test]
async fn test_invalid_control_key_is_rejected() {
    let manager = seeded().await;

    let result = manager
        .find("people", &Object::new().with("$limit", 0))
        .await;

    assert!(matches!(result, Err(DocumentError::InvalidQuery(_))));
}

#[tokio::test]
async fn test_response_serializes_to_json() {
    let manager = DocumentManager::new(InMemoryGateway::new());
    let at: DateTime<Utc> = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

    let inserted = manager
        .insert("events", &Object::new().with("kind", "boot").with("at", at))
        .await
        .unwrap();

    let json = inserted.to_json().unwrap();
    let row = &json["root"][0];

    assert_eq!(row["kind"], serde_json::json!("boot"));
    assert_eq!(row["at"], serde_json::json!("2024-01-02T03:04:05+00:00"));
}
