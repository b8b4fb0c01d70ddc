use seogen_core::AppError;
use seogen_core::models::FieldUpdate;
use seogen_core::traits::PageStore;
use seogen_db::{Database, PageRepository};
use uuid::Uuid;

use crate::integration::common::setup_test_db;

async fn seeded(repo: &PageRepository, paths: &[&str]) -> (Uuid, Vec<Uuid>) {
    let version = repo
        .create_version("www.example.co.kr", "spring launch")
        .await
        .unwrap();
    let mut ids = Vec::new();
    for path in paths {
        ids.push(repo.insert_page(version, path).await.unwrap());
    }
    (version, ids)
}

#[tokio::test]
async fn lists_pages_in_registration_order() {
    let (pool, _container) = setup_test_db().await;
    let repo = Database::from_pool(pool).page_repo();
    let (version, ids) = seeded(&repo, &["/faq", "/about", "/board/list"]).await;

    let pages = repo
        .list_pages_for_batch(&version.to_string(), &[])
        .await
        .unwrap();

    let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/faq", "/about", "/board/list"]);
    assert_eq!(pages[0].id, ids[0].to_string());
}

#[tokio::test]
async fn page_filter_restricts_listing() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);
    let (version, ids) = seeded(&repo, &["/a", "/b", "/c"]).await;
    let (_, other_ids) = seeded(&repo, &["/elsewhere"]).await;

    let wanted = vec![ids[2].to_string(), ids[0].to_string(), other_ids[0].to_string()];
    let pages = repo
        .list_pages_for_batch(&version.to_string(), &wanted)
        .await
        .unwrap();

    let paths: Vec<&str> = pages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(paths, vec!["/a", "/c"]);
}

#[tokio::test]
async fn unknown_version_lists_nothing() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);

    let pages = repo
        .list_pages_for_batch(&Uuid::new_v4().to_string(), &[])
        .await
        .unwrap();
    assert!(pages.is_empty());
}

#[tokio::test]
async fn malformed_ids_are_validation_errors() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);

    let err = repo.list_pages_for_batch("v-1", &[]).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = repo
        .list_pages_for_batch(&Uuid::new_v4().to_string(), &["nope".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ValidationError(_)));
}

#[tokio::test]
async fn update_writes_only_present_fields() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);
    let (_, ids) = seeded(&repo, &["/faq"]).await;
    let id = ids[0].to_string();

    let first = FieldUpdate {
        title: Some("FAQ | Example".into()),
        description: Some("Answers to common questions".into()),
        json_ld: Some(serde_json::json!({"@type": "FAQPage"})),
        ..Default::default()
    };
    repo.apply_field_updates(&id, &first).await.unwrap();
    let before = repo.get_page(&id).await.unwrap().unwrap();

    let second = FieldUpdate {
        title: Some("Frequently asked questions".into()),
        canonical: Some("https://www.example.co.kr/faq".into()),
        ..Default::default()
    };
    repo.apply_field_updates(&id, &second).await.unwrap();
    let page = repo.get_page(&id).await.unwrap().unwrap();

    assert_eq!(page.title.as_deref(), Some("Frequently asked questions"));
    assert_eq!(page.description.as_deref(), Some("Answers to common questions"));
    assert_eq!(page.json_ld, Some(serde_json::json!({"@type": "FAQPage"})));
    assert_eq!(page.canonical.as_deref(), Some("https://www.example.co.kr/faq"));
    assert_eq!(page.h1_selector, None);
    assert!(page.updated_at >= before.updated_at);
    assert_eq!(page.host, "www.example.co.kr");
}

#[tokio::test]
async fn update_of_missing_page_fails() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);

    let update = FieldUpdate {
        title: Some("x".into()),
        ..Default::default()
    };
    let err = repo
        .apply_field_updates(&Uuid::new_v4().to_string(), &update)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
}

#[tokio::test]
async fn marking_version_sets_flag_and_timestamp() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);
    let (version, _) = seeded(&repo, &["/"]).await;
    let version_id = version.to_string();

    let fresh = repo.get_version(&version_id).await.unwrap().unwrap();
    assert!(!fresh.ai_generated);
    assert!(fresh.ai_generated_at.is_none());

    repo.mark_version_generated(&version_id).await.unwrap();

    let marked = repo.get_version(&version_id).await.unwrap().unwrap();
    assert!(marked.ai_generated);
    assert!(marked.ai_generated_at.is_some());
    assert_eq!(marked.name, "spring launch");
}

#[tokio::test]
async fn marking_unknown_version_fails() {
    let (pool, _container) = setup_test_db().await;
    let repo = PageRepository::new(pool);

    let err = repo
        .mark_version_generated(&Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DatabaseError(_)));
}

#[tokio::test]
async fn health_check_succeeds_on_live_pool() {
    let (pool, _container) = setup_test_db().await;
    PageRepository::new(pool).health_check().await.unwrap();
}
