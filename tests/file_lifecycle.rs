//! File lifecycle across the file and folder services.

mod common;

use common::{file, folder, setup_db};
use folio::file::{AudioMetadata, FileFilter, FileMetadata, FileRepository};
use folio::{FileCategory, FileService, FileStatus, FileUpdate, FolioError, NewFile};

#[tokio::test]
async fn test_create_derives_fields_and_persists_metadata() {
    let db = setup_db().await;
    let music = folder(&db, "Music", None).await;
    let service = FileService::new(&db);

    let metadata = FileMetadata::new(4_200_000)
        .with_mime_type("audio/mpeg")
        .with_checksum("sha256:00ff")
        .with_audio(AudioMetadata {
            duration_secs: 215.5,
            bitrate: Some(320_000),
            sample_rate: Some(44_100),
        });
    let song = service
        .create(
            NewFile::new("Song.MP3", 4_200_000)
                .in_folder(music.id())
                .with_metadata(metadata.clone()),
        )
        .await
        .unwrap();

    assert_eq!(song.extension(), "mp3");
    assert_eq!(song.category(), FileCategory::Audio);
    assert_eq!(song.path(), "Music/Song.MP3");

    let loaded = service.open(song.id()).await.unwrap();
    assert_eq!(loaded.metadata(), &metadata);
    assert!(loaded.last_accessed_at().is_some());
}

#[tokio::test]
async fn test_names_are_unique_per_folder_only() {
    let db = setup_db().await;
    let a = folder(&db, "A", None).await;
    let b = folder(&db, "B", None).await;
    let service = FileService::new(&db);

    file(&db, "notes.txt", 1, Some(&a)).await;
    file(&db, "notes.txt", 1, Some(&b)).await;
    assert!(matches!(
        service
            .create(NewFile::new("notes.txt", 1).in_folder(a.id()))
            .await,
        Err(FolioError::DuplicateName(_))
    ));
}

#[tokio::test]
async fn test_move_between_folders_and_out() {
    let db = setup_db().await;
    let inbox = folder(&db, "Inbox", None).await;
    let archive = folder(&db, "Archive", None).await;
    let service = FileService::new(&db);

    let scan = file(&db, "scan.pdf", 10, Some(&inbox)).await;
    let moved = service.move_file(scan.id(), Some(archive.id())).await.unwrap();
    assert_eq!(moved.path(), "Archive/scan.pdf");
    assert!(service.list_in_folder(Some(inbox.id())).await.unwrap().is_empty());

    assert!(matches!(
        service.move_file(scan.id(), Some("missing")).await,
        Err(FolioError::NotFound { entity: "folder", .. })
    ));

    let loose = service.move_file(scan.id(), None).await.unwrap();
    assert_eq!(loose.path(), "scan.pdf");
    assert_eq!(service.list_in_folder(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_status_changes_and_soft_delete() {
    let db = setup_db().await;
    let service = FileService::new(&db);
    let upload = service
        .create(NewFile::new("upload.zip", 1).processing())
        .await
        .unwrap();
    assert_eq!(upload.status(), FileStatus::Processing);

    let ready = service
        .update(upload.id(), &FileUpdate::new().status(FileStatus::Active))
        .await
        .unwrap();
    assert_eq!(ready.status(), FileStatus::Active);

    let archived = service.archive(upload.id()).await.unwrap();
    assert_eq!(archived.status(), FileStatus::Archived);
    assert_eq!(
        service
            .list(&FileFilter::new().status(FileStatus::Archived))
            .await
            .unwrap()
            .len(),
        1
    );

    service.delete(upload.id()).await.unwrap();
    assert!(matches!(
        service.delete(upload.id()).await,
        Err(FolioError::NotFound { .. })
    ));

    // Soft-deleted rows stay in the table but free the name.
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
    service.create(NewFile::new("upload.zip", 1)).await.unwrap();
}

#[tokio::test]
async fn test_size_limit_and_totals() {
    let db = setup_db().await;
    let docs = folder(&db, "Docs", None).await;
    let service = FileService::new(&db).with_max_file_size(1024);

    assert!(matches!(
        service.create(NewFile::new("huge.iso", 2048)).await,
        Err(FolioError::ValidationFailed(_))
    ));

    for (name, size) in [("a.txt", 100), ("b.txt", 200), ("c.png", 300)] {
        service
            .create(NewFile::new(name, size).in_folder(docs.id()))
            .await
            .unwrap();
    }

    let repo = FileRepository::new(db.pool());
    let in_docs = FileFilter::new().folder(Some(docs.id()));
    assert_eq!(repo.total_size(&in_docs).await.unwrap(), 600);
    assert_eq!(
        repo.total_size(&in_docs.clone().category(FileCategory::Document))
            .await
            .unwrap(),
        300
    );
}
