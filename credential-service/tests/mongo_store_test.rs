//! MongoDB-backed store and directory. Run with a live server:
//! `TEST_MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`

use credential_service::{
    models::AccessCredential,
    services::{
        AccountDirectory, CredentialStore, MongoAccountDirectory, MongoCredentialStore, MongoDb,
    },
    utils::generate_secret,
};
use mongodb::bson::{doc, oid::ObjectId, Document};
use uuid::Uuid;

async fn setup_db() -> (MongoDb, String) {
    dotenvy::dotenv().ok();
    let uri = std::env::var("TEST_MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let db_name = format!("test_credentials_{}", Uuid::new_v4().simple());
    let db = MongoDb::connect(&uri, &db_name)
        .await
        .expect("Failed to connect to MongoDB");
    (db, db_name)
}

async fn teardown(db: &MongoDb) {
    db.database().drop(None).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn unique_index_rejects_duplicate_secret() {
    let (db, _) = setup_db().await;
    let store = MongoCredentialStore::new(&db);
    store.init_indexes().await.unwrap();

    let secret = generate_secret();
    store
        .create(&AccessCredential::new(secret.clone(), "d1", "g1"))
        .await
        .unwrap();
    let duplicate = store
        .create(&AccessCredential::new(secret.clone(), "d2", "g1"))
        .await;
    assert!(duplicate.is_err());

    let found = store.find_by_secret(&secret).await.unwrap().unwrap();
    assert_eq!(found.dependent_id, "d1");

    teardown(&db).await;
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn list_and_delete_by_dependent() {
    let (db, _) = setup_db().await;
    let store = MongoCredentialStore::new(&db);
    store.init_indexes().await.unwrap();

    for dependent in ["d1", "d1", "d2"] {
        store
            .create(&AccessCredential::new(generate_secret(), dependent, "g1"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed = store.list_by_dependent("d1").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].issued_at >= listed[1].issued_at);

    assert_eq!(store.delete_by_dependent("d1").await.unwrap(), 2);
    assert_eq!(store.delete_by_dependent("d1").await.unwrap(), 0);
    assert_eq!(store.list_by_dependent("d2").await.unwrap().len(), 1);

    store.health_check().await.unwrap();
    teardown(&db).await;
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn directory_resolves_object_id_accounts() {
    let (db, _) = setup_db().await;
    let guardian_id = ObjectId::new();
    let dependent_id = ObjectId::new();

    db.database()
        .collection::<Document>("guardians")
        .insert_one(doc! { "_id": guardian_id, "dependents": [dependent_id] }, None)
        .await
        .unwrap();
    db.database()
        .collection::<Document>("dependents")
        .insert_one(
            doc! { "_id": dependent_id, "name": "Ada", "guardian": guardian_id },
            None,
        )
        .await
        .unwrap();

    let directory = MongoAccountDirectory::new(&db);

    let guardian = directory
        .find_guardian(&guardian_id.to_hex())
        .await
        .unwrap()
        .unwrap();
    assert!(guardian.manages(&dependent_id.to_hex()));

    let dependent = directory
        .find_dependent(&dependent_id.to_hex())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(dependent.display_name, "Ada");

    assert!(directory.find_dependent("not-hex").await.unwrap().is_none());
    assert!(directory
        .find_guardian(&ObjectId::new().to_hex())
        .await
        .unwrap()
        .is_none());

    teardown(&db).await;
}
