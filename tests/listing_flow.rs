//! End-to-end listing and mutation flows over the memory backend.

mod common;

use common::{ids, memory_drive, names, sized_file, text_file};

use cloudshelf::{
    AccountId, AccountSession, ItemId, ItemKind, ShelfError, SortBy,
};

#[tokio::test]
async fn test_reports_folder_lifecycle() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    let listing = drive.listing();

    let reports = coordinator.create_folder("Reports", None).await.unwrap();
    assert_eq!(names(&listing.items().await), vec!["Reports"]);

    coordinator
        .rename(&reports.id, "Reports-2024", ItemKind::Folder)
        .await
        .unwrap();
    assert_eq!(names(&listing.items().await), vec!["Reports-2024"]);

    coordinator
        .delete_item(&reports.id, ItemKind::Folder)
        .await
        .unwrap();
    assert!(listing.items().await.is_empty());
}

#[tokio::test]
async fn test_upload_to_missing_folder_makes_no_blob_calls() {
    let (drive, backend) = memory_drive();

    let err = drive
        .coordinator()
        .upload(text_file("a.txt", "a"), Some(&ItemId::new("does-not-exist")))
        .await
        .unwrap_err();

    assert!(matches!(err, ShelfError::AccessDenied(_)));
    assert_eq!(backend.blob_calls(), 0);
}

#[tokio::test]
async fn test_upload_to_other_accounts_folder_is_denied() {
    let (drive, backend) = memory_drive();
    let folder = drive.coordinator().create_folder("mine", None).await.unwrap();

    drive
        .session()
        .sign_in(AccountSession::new(AccountId::new("mallory")));
    let err = drive
        .coordinator()
        .upload(text_file("a.txt", "a"), Some(&folder.id))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "target folder not found or access denied");
    assert_eq!(backend.blob_calls(), 0);
}

#[tokio::test]
async fn test_toggle_star_flips_only_target() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    let a = coordinator.upload(text_file("a.txt", "a"), None).await.unwrap();
    let b = coordinator.upload(text_file("b.txt", "b"), None).await.unwrap();
    let c = coordinator.upload(text_file("c.txt", "c"), None).await.unwrap();
    coordinator.toggle_star(&c.id).await.unwrap();

    coordinator.toggle_star(&a.id).await.unwrap();

    let listing = drive.listing();
    assert!(listing.find(&a.id).await.unwrap().starred);
    assert!(!listing.find(&b.id).await.unwrap().starred);
    assert!(listing.find(&c.id).await.unwrap().starred);
}

#[tokio::test]
async fn test_size_sort_keeps_folders_first() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    coordinator.upload(sized_file("a.txt", 10), None).await.unwrap();
    coordinator.upload(sized_file("b.txt", 20), None).await.unwrap();
    coordinator.create_folder("docs", None).await.unwrap();

    let view = drive.listing().view("", SortBy::Size).await;

    assert_eq!(names(&view), vec!["docs", "b.txt", "a.txt"]);
}

#[tokio::test]
async fn test_search_filters_listing() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    coordinator.create_folder("Invoices", None).await.unwrap();
    coordinator.upload(text_file("invoice-01.txt", "1"), None).await.unwrap();
    coordinator.upload(text_file("photo.png", "2"), None).await.unwrap();

    let listing = drive.listing();
    let all = listing.view("", SortBy::Name).await;
    assert_eq!(names(&all), vec!["Invoices", "invoice-01.txt", "photo.png"]);

    let hits = listing.view("INVOICE", SortBy::Name).await;
    assert_eq!(names(&hits), vec!["Invoices", "invoice-01.txt"]);

    assert!(listing.view("zzz", SortBy::Name).await.is_empty());
}

#[tokio::test]
async fn test_breadcrumb_navigation() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    let listing = drive.listing();

    let projects = coordinator.create_folder("Projects", None).await.unwrap();
    listing.navigate(projects.id.clone(), "Projects").await;
    let year = coordinator
        .create_folder("2024", Some(&projects.id))
        .await
        .unwrap();
    listing.navigate(year.id.clone(), "2024").await;
    coordinator
        .upload(text_file("plan.txt", "plan"), Some(&year.id))
        .await
        .unwrap();

    assert_eq!(listing.path().await.display(), "My Drive / Projects / 2024");
    assert_eq!(names(&listing.items().await), vec!["plan.txt"]);

    // Projects sits at index 1.
    assert!(listing.navigate_to_breadcrumb(Some(&projects.id)).await);
    assert_eq!(listing.path().await.len(), 2);
    assert_eq!(listing.current_folder().await, Some(projects.id.clone()));
    assert_eq!(names(&listing.items().await), vec!["2024"]);

    let before = listing.path().await;
    assert!(!listing.navigate_to_breadcrumb(Some(&ItemId::new("gone"))).await);
    assert_eq!(listing.path().await, before);

    assert!(listing.navigate_to_breadcrumb(None).await);
    assert_eq!(names(&listing.items().await), vec!["Projects"]);
}

#[tokio::test]
async fn test_upload_into_current_folder_refreshes_it() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    let listing = drive.listing();
    let docs = coordinator.create_folder("docs", None).await.unwrap();
    listing.navigate(docs.id.clone(), "docs").await;

    let item = coordinator
        .upload(text_file("notes.txt", "hello"), listing.current_folder().await.as_ref())
        .await
        .unwrap();

    assert_eq!(item.parent_id, Some(docs.id));
    assert_eq!(names(&listing.items().await), vec!["notes.txt"]);
}

#[tokio::test]
async fn test_batch_delete_of_selection() {
    let (drive, backend) = memory_drive();
    let coordinator = drive.coordinator();
    let listing = drive.listing();
    let a = coordinator.upload(text_file("a.txt", "a"), None).await.unwrap();
    let b = coordinator.upload(text_file("b.txt", "b"), None).await.unwrap();
    let keep = coordinator.upload(text_file("keep.txt", "k"), None).await.unwrap();

    listing.toggle_selection(&a.id).await;
    listing.toggle_selection(&b.id).await;
    let selection = listing.selection().await;
    assert_eq!(selection, ids(&[&a, &b]));

    let report = coordinator.delete_many(&selection).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.len(), 2);
    assert_eq!(names(&listing.items().await), vec!["keep.txt"]);
    assert!(listing.find(&keep.id).await.is_some());
    assert_eq!(backend.blob_count().await, 1);
}

#[tokio::test]
async fn test_storage_usage_after_uploads() {
    let (drive, _backend) = memory_drive();
    let coordinator = drive.coordinator();
    let docs = coordinator.create_folder("docs", None).await.unwrap();
    coordinator.upload(sized_file("a.bin", 1024), None).await.unwrap();
    coordinator
        .upload(sized_file("b.bin", 2048), Some(&docs.id))
        .await
        .unwrap();

    let usage = drive.listing().storage_usage().await;

    assert_eq!(usage.used_bytes, 3072);
    assert_eq!(usage.file_count, 2);
    assert_eq!(usage.total_bytes, 107_374_182_400);
}

#[tokio::test]
async fn test_accounts_do_not_see_each_other() {
    let (drive, _backend) = memory_drive();
    drive
        .coordinator()
        .upload(text_file("alice.txt", "a"), None)
        .await
        .unwrap();

    drive
        .session()
        .sign_in(AccountSession::new(AccountId::new("bob")));
    drive.listing().reset_to_root().await;

    assert!(drive.listing().items().await.is_empty());
    assert_eq!(drive.listing().storage_usage().await.file_count, 0);
}

#[tokio::test]
async fn test_sign_out_blocks_mutations_and_keeps_listing() {
    let (drive, backend) = memory_drive();
    drive
        .coordinator()
        .upload(text_file("a.txt", "a"), None)
        .await
        .unwrap();
    let calls = backend.blob_calls();

    drive.session().sign_out();
    let err = drive
        .coordinator()
        .create_folder("docs", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ShelfError::NotAuthenticated));
    assert_eq!(backend.blob_calls(), calls);
    assert_eq!(names(&drive.listing().items().await), vec!["a.txt"]);
}
