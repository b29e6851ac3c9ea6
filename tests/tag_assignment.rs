//! Tag assignment, usage counting and reporting.

mod common;

use common::{file, folder, relation_count, setup_db, tag, usage_count};
use folio::tag::TagType;
use folio::{Color, FileService, FolioError, NewFile, NewTag, TagService, TagUpdate};

#[tokio::test]
async fn test_file_tag_usage_scenario() {
    let db = setup_db().await;
    let x = folder(&db, "X", None).await;
    let a = file(&db, "a.pdf", 10, Some(&x)).await;
    let t1 = tag(&db, "t1").await;
    let t2 = tag(&db, "t2").await;
    let tags = TagService::new(&db);

    let added = tags
        .assign_to_file(a.id(), &[t1.id().to_string(), t2.id().to_string()])
        .await
        .unwrap();
    assert_eq!(added.len(), 2);
    assert_eq!(usage_count(&db, t1.id()).await, 1);
    assert_eq!(usage_count(&db, t2.id()).await, 1);

    tags.unassign_from_file(a.id(), &[t1.id().to_string()])
        .await
        .unwrap();
    assert_eq!(usage_count(&db, t1.id()).await, 0);
    assert_eq!(usage_count(&db, t2.id()).await, 1);

    let file = FileService::new(&db).get(a.id()).await.unwrap();
    assert_eq!(file.tag_ids(), &[t2.id().to_string()]);
}

#[tokio::test]
async fn test_assign_is_idempotent_and_counts_match_relations() {
    let db = setup_db().await;
    let docs = folder(&db, "Docs", None).await;
    let a = file(&db, "a.pdf", 1, Some(&docs)).await;
    let t = tag(&db, "shared").await;
    let tags = TagService::new(&db);
    let ids = [t.id().to_string()];

    tags.assign_to_file(a.id(), &ids).await.unwrap();
    assert!(tags.assign_to_file(a.id(), &ids).await.unwrap().is_empty());
    tags.assign_to_folder(docs.id(), &ids).await.unwrap();

    assert_eq!(usage_count(&db, t.id()).await, 2);
    assert_eq!(relation_count(&db, t.id()).await, 2);

    tags.unassign_from_folder(docs.id(), &ids).await.unwrap();
    assert!(tags.unassign_from_folder(docs.id(), &ids).await.unwrap().is_empty());
    assert_eq!(usage_count(&db, t.id()).await, 1);
    assert_eq!(relation_count(&db, t.id()).await, 1);

    let stats = tags.stats(t.id()).await.unwrap();
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.folder_count, 0);
    assert_eq!(stats.total_usage, 1);
    assert!(stats.is_most_used_in_files);
    assert!(!stats.is_most_used_in_folders);
}

#[tokio::test]
async fn test_popular_tags_scenario() {
    let db = setup_db().await;
    let t1 = tag(&db, "t1").await;
    let t2 = tag(&db, "t2").await;
    let t3 = tag(&db, "t3").await;
    let tags = TagService::new(&db);
    let files = FileService::new(&db);

    for (t, uses) in [(&t1, 5), (&t2, 3), (&t3, 3)] {
        for i in 0..uses {
            let f = files
                .create(NewFile::new(format!("{}-{i}.txt", t.name()), 1))
                .await
                .unwrap();
            tags.assign_to_file(f.id(), &[t.id().to_string()])
                .await
                .unwrap();
        }
    }

    let popular = tags.popular(2).await.unwrap();
    let names: Vec<&str> = popular.iter().map(|p| p.tag.name()).collect();
    assert_eq!(names, vec!["t1", "t2"]);
    assert!((popular[0].usage_percentage - 62.5).abs() < 1e-9);
    assert!((popular[1].usage_percentage - 37.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_rename_scenario() {
    let db = setup_db().await;
    let tags = TagService::new(&db);

    let work = tag(&db, "Work").await;
    tags.rename(work.id(), "Work").await.unwrap();

    let life = tag(&db, "Life").await;
    assert!(matches!(
        tags.rename(life.id(), "Work").await,
        Err(FolioError::DuplicateName(_))
    ));
}

#[tokio::test]
async fn test_system_tag_cannot_be_deleted() {
    let db = setup_db().await;
    let tags = TagService::new(&db);

    let report = tags.seed_defaults().await.unwrap();
    assert!(report.is_complete());
    let important = report
        .created
        .iter()
        .find(|t| t.name() == "Important")
        .unwrap();
    assert_eq!(important.tag_type(), TagType::System);
    assert!(matches!(
        tags.delete(important.id()).await,
        Err(FolioError::ProtectedResourceViolation(_))
    ));

    // Retyping is refused too, so the protection cannot be stripped first.
    assert!(matches!(
        tags.update(important.id(), &TagUpdate::new().tag_type(TagType::User))
            .await,
        Err(FolioError::InvalidState(_))
    ));
    assert_eq!(
        tags.get(important.id()).await.unwrap().tag_type(),
        TagType::System
    );
    assert!(tags.delete(important.id()).await.is_err());

    let again = tags.seed_defaults().await.unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.skipped.len(), report.created.len());
}

#[tokio::test]
async fn test_deactivated_tag_is_hidden_and_name_reusable() {
    let db = setup_db().await;
    let docs = folder(&db, "Docs", None).await;
    let old = tag(&db, "Old").await;
    let tags = TagService::new(&db);
    tags.assign_to_folder(docs.id(), &[old.id().to_string()])
        .await
        .unwrap();

    tags.delete(old.id()).await.unwrap();
    assert!(tags.tags_of_folder(docs.id()).await.unwrap().is_empty());
    assert!(matches!(
        tags.get(old.id()).await,
        Err(FolioError::NotFound { .. })
    ));

    tags.create(NewTag::new("Old", Color::new("#000000")))
        .await
        .unwrap();
    assert!(matches!(
        tags.reactivate(old.id()).await,
        Err(FolioError::DuplicateName(_))
    ));
}

#[tokio::test]
async fn test_tree_aggregates_usage_and_renders_json() {
    let db = setup_db().await;
    let tags = TagService::new(&db);
    let media = tag(&db, "Media").await;
    let photos = tags
        .create(NewTag::new("Photos", Color::new("#10B981")).with_parent(media.id()))
        .await
        .unwrap();

    let pic = file(&db, "pic.jpg", 1, None).await;
    tags.assign_to_file(pic.id(), &[photos.id().to_string()])
        .await
        .unwrap();

    let tree = tags.tree().await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].tag.name(), "Media");
    assert_eq!(tree[0].total_usage, 1);
    assert_eq!(tree[0].children[0].tag.name(), "Photos");

    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json[0]["children"][0]["tag"]["name"], "Photos");

    assert!(matches!(
        tags.set_parent(media.id(), Some(photos.id())).await,
        Err(FolioError::CycleDetected(_))
    ));
}

#[tokio::test]
async fn test_cleanup_deactivates_unused_user_tags() {
    let db = setup_db().await;
    let tags = TagService::new(&db);
    tags.seed_defaults().await.unwrap();
    let used = tag(&db, "used").await;
    let unused = tag(&db, "unused").await;
    let a = file(&db, "a.txt", 1, None).await;
    tags.assign_to_file(a.id(), &[used.id().to_string()])
        .await
        .unwrap();

    let removed = tags.cleanup_unused().await.unwrap();
    assert!(removed.contains(&unused.id().to_string()));
    assert!(!removed.contains(&used.id().to_string()));
    assert!(tags.get(used.id()).await.is_ok());
    // System defaults survive cleanup even when unused.
    assert!(tags
        .list(&Default::default())
        .await
        .unwrap()
        .iter()
        .any(|t| t.name() == "Important"));
}
