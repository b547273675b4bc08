mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use artifetch::{
    ArtifactDescriptor, ArtifactSelection, BackendType, CancelToken, DownloadParameters, Error,
    RetrievalServer,
};
use common::{FakeContainer, FakeDedup, FakeSession, RecordingSink, project, read};
use tempfile::tempdir;

fn mixed_session() -> Arc<FakeSession> {
    let container = FakeContainer::new().file("drop/a.txt", b"alpha");
    Arc::new(
        FakeSession::with_container(container)
            .domain("default", FakeDedup::default().manifest("m1", &[("b.txt", b"bravo")])),
    )
}

fn mixed_artifacts() -> Vec<ArtifactDescriptor> {
    vec![
        ArtifactDescriptor::new("drop", BackendType::Container, "#/1/drop"),
        ArtifactDescriptor::new("Packages", BackendType::ContentAddressable, "m1"),
    ]
}

#[tokio::test]
async fn unknown_backend_is_rejected_before_any_transfer() {
    let dir = tempdir().unwrap();
    let session = mixed_session();
    let mut artifacts = mixed_artifacts();
    artifacts.push(ArtifactDescriptor {
        name: "weird".into(),
        backend_type: "GitRef".into(),
        resource_data: "refs/heads/main".into(),
        ..ArtifactDescriptor::default()
    });

    let err = RetrievalServer::new(session.clone(), Arc::new(RecordingSink::default()))
        .download_multiple_artifacts(
            &DownloadParameters::new(dir.path()).project(project()),
            &artifacts,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownBackend(tag) if tag == "GitRef"));
    assert_eq!(session.fake_container().list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mixed_backends_download_together() {
    let dir = tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let outcome = RetrievalServer::new(mixed_session(), sink.clone())
        .download_multiple_artifacts(
            &DownloadParameters::new(dir.path()).project(project()),
            &mixed_artifacts(),
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.file_count, 2);
    assert_eq!(read(dir.path().join("drop/a.txt")), "alpha");
    assert_eq!(read(dir.path().join("Packages/b.txt")), "bravo");

    let retrieval = sink.events_named("ArtifactRetrieval");
    assert_eq!(retrieval.len(), 1);
    assert_eq!(retrieval[0]["status"], "succeeded");
    assert_eq!(retrieval[0]["files"], 2);
}

#[tokio::test]
async fn selection_picks_one_artifact_by_name() {
    let dir = tempdir().unwrap();
    let params = DownloadParameters::new(dir.path())
        .project(project())
        .selection(ArtifactSelection::Single("packages".into()));

    let outcome = RetrievalServer::new(mixed_session(), Arc::new(RecordingSink::default()))
        .download(&params, &mixed_artifacts(), &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.file_count, 1);
    assert_eq!(read(dir.path().join("b.txt")), "bravo");
    assert!(!dir.path().join("drop").exists());
}

#[tokio::test]
async fn selection_of_missing_artifact_fails() {
    let dir = tempdir().unwrap();
    let params = DownloadParameters::new(dir.path()).selection(ArtifactSelection::Single("nope".into()));

    let err = RetrievalServer::new(mixed_session(), Arc::new(RecordingSink::default()))
        .download(&params, &mixed_artifacts(), &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ArtifactNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn invalid_parameters_are_rejected() {
    let dir = tempdir().unwrap();
    let params = DownloadParameters::new(dir.path()).parallelism(0);

    let err = RetrievalServer::new(mixed_session(), Arc::new(RecordingSink::default()))
        .download_single_artifact(&params, &mixed_artifacts()[0], &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameters(_)));
}

#[tokio::test]
async fn cancelled_before_start() {
    let dir = tempdir().unwrap();
    let token = CancelToken::new();
    token.cancel();
    let session = mixed_session();
    let sink = Arc::new(RecordingSink::default());

    let err = RetrievalServer::new(session.clone(), sink.clone())
        .download_multiple_artifacts(
            &DownloadParameters::new(dir.path()).project(project()),
            &mixed_artifacts(),
            &token,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(session.fake_container().downloads.load(Ordering::SeqCst), 0);
    assert_eq!(sink.warnings.lock().unwrap().as_slice(), ["Artifact download cancelled"]);
}
