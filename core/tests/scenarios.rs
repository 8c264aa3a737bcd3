use std::collections::HashMap;

use hf_types::{JobItem, JobType};
use holdfast_core::{Config, IngestService};
use serde_json::json;

async fn service_in_tempdir() -> (std::sync::Arc<IngestService>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::with_root(dir.path());
    let service = IngestService::new(config).await.expect("service starts");
    (service, dir)
}

#[tokio::test(flavor = "multi_thread")]
async fn dedup_under_concurrency() {
    let (service, _dir) = service_in_tempdir().await;
    let content = vec![b'A'; 1024 * 1024];

    let mut handles = Vec::new();
    for _ in 0..10 {
        let storage = service.storage.clone();
        let content = content.clone();
        handles.push(tokio::spawn(async move {
            storage
                .store_file(
                    &content[..],
                    "blob.bin",
                    "application/octet-stream",
                    Some(content.len() as u64),
                    HashMap::new(),
                    None,
                )
                .await
                .expect("store succeeds")
        }));
    }

    let mut hashes = std::collections::HashSet::new();
    let mut duplicate_count = 0;
    for handle in handles {
        let (meta, duplicate) = handle.await.expect("task joins");
        hashes.insert(meta.hash);
        if duplicate {
            duplicate_count += 1;
        }
    }

    assert_eq!(hashes.len(), 1, "all ten stores resolve to one hash");
    assert_eq!(duplicate_count, 9, "nine of ten observe the duplicate");

    let physical_files: Vec<_> = walkdir::WalkDir::new(service.storage.root().join("storage"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .collect();
    assert_eq!(physical_files.len(), 1, "exactly one physical file on disk");
}

#[tokio::test(flavor = "multi_thread")]
async fn path_traversal_is_rejected() {
    let (service, _dir) = service_in_tempdir().await;

    assert!(service.storage.get_file_by_path("../etc/passwd").await.is_err());
    assert!(service
        .storage
        .get_file_by_path("storage/../../etc/passwd")
        .await
        .is_err());
    assert!(service.storage.get_file_by_path("/etc/passwd").await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn round_trip_rename_moves_the_physical_file() {
    let (service, _dir) = service_in_tempdir().await;

    let (meta, _) = service
        .storage
        .store_file(&b"hello"[..], "a.txt", "text/plain", Some(5), HashMap::new(), None)
        .await
        .expect("store succeeds");

    let old_full = service.storage.root().join(&meta.stored_path);
    assert!(tokio::fs::metadata(&old_full).await.is_ok());

    let renamed = service
        .storage
        .rename_file(&meta.hash, "b.txt", true)
        .await
        .expect("rename succeeds");

    assert_eq!(renamed.hash, meta.hash);
    assert!(tokio::fs::metadata(&old_full).await.is_err(), "old path gone");

    let new_full = service.storage.root().join(&renamed.stored_path);
    let content = tokio::fs::read(&new_full).await.expect("new path readable");
    assert_eq!(content, b"hello");
}

#[tokio::test(flavor = "multi_thread")]
async fn hard_link_lifecycle_tracks_ref_count() {
    let (service, _dir) = service_in_tempdir().await;

    let (original, _) = service
        .storage
        .store_file(&b"shared"[..], "x.txt", "text/plain", Some(6), HashMap::new(), None)
        .await
        .expect("store succeeds");

    let linked = service
        .storage
        .copy_file(&original.hash, "y.txt", true, None)
        .await
        .expect("copy succeeds");

    let original_after_copy = service
        .storage
        .get_file_metadata(&original.hash)
        .await
        .expect("original still indexed");
    assert_eq!(original_after_copy.ref_count, 2);
    assert_eq!(linked.ref_count, 2);

    service.storage.delete_file(&original.hash).await.expect("delete original");

    let linked_after_delete = service
        .storage
        .get_file_metadata(&linked.hash)
        .await
        .expect("linked copy still indexed");
    assert_eq!(linked_after_delete.ref_count, 1);

    let full_path = service.storage.root().join(&linked_after_delete.stored_path);
    assert!(tokio::fs::metadata(&full_path).await.is_ok(), "physical file survives");

    service.storage.delete_file(&linked.hash).await.expect("delete linked copy");
    assert!(tokio::fs::metadata(&full_path).await.is_err(), "physical file now gone");
}

#[tokio::test(flavor = "multi_thread")]
async fn verification_catches_an_orphaned_file() {
    let (service, _dir) = service_in_tempdir().await;

    service
        .storage
        .store_file(&b"hi"[..], "a.txt", "text/plain", Some(2), HashMap::new(), None)
        .await
        .expect("store succeeds");

    let orphan_dir = service.storage.root().join("storage/documents/txt");
    tokio::fs::create_dir_all(&orphan_dir).await.unwrap();
    tokio::fs::write(orphan_dir.join("abc.txt"), b"not in the index")
        .await
        .unwrap();

    let issues = service.duplicates.verify_deduplication_system().await.expect("verify runs");
    assert!(issues.iter().any(|issue| {
        matches!(issue.kind, hf_types::VerificationIssueKind::OrphanedFile)
            && issue.path.as_deref() == Some("storage/documents/txt/abc.txt")
    }));
}

#[tokio::test(flavor = "multi_thread")]
async fn async_batch_job_reports_partial_failure() {
    let (service, _dir) = service_in_tempdir().await;

    let items = vec![
        JobItem::new(json!({"engine": "demo", "namespace": "n", "record": {"ok": true}})),
        JobItem::new(json!({"engine": "demo"})), // missing namespace/record -> processor rejects
        JobItem::new(json!({"engine": "demo", "namespace": "n", "record": {"ok": true}})),
    ];

    let job_id = service.enqueue_job(JobType::Json, items).await.expect("enqueue succeeds");

    let job = loop {
        let job = service.get_job(job_id).await.expect("job exists");
        if job.status.is_terminal() {
            break job;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    };

    let result = job.result.expect("terminal job carries a result");
    assert_eq!(result.succeeded, 2);
    assert_eq!(result.failed, 1);
    assert!(result.message.contains("partial success"));
    assert!(job.items[1].error.is_some());
}
