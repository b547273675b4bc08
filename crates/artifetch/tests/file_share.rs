mod common;

use std::sync::Arc;

use artifetch::{
    ArtifactDescriptor, BackendType, CancelToken, DownloadParameters, Error, FileShareProvider,
    MirrorTool, RetrievalServer,
};
use common::{FakeSession, RecordingSink, read};
use tempfile::tempdir;

fn seed_share(root: &std::path::Path) {
    std::fs::create_dir_all(root.join("bin/x64")).unwrap();
    std::fs::create_dir_all(root.join("symbols")).unwrap();
    std::fs::write(root.join("readme.md"), "# drop").unwrap();
    std::fs::write(root.join("bin/tool.exe"), "exe").unwrap();
    std::fs::write(root.join("bin/x64/tool.exe"), "exe64").unwrap();
    std::fs::write(root.join("symbols/tool.pdb"), "pdb").unwrap();
}

fn server(sink: Arc<RecordingSink>) -> RetrievalServer {
    RetrievalServer::new(Arc::new(FakeSession::default()), sink)
        .with_publisher(FileShareProvider::new(Arc::new(RecordingSink::default())).with_mirror_tool(MirrorTool::Builtin))
}

#[tokio::test]
async fn download_from_share_with_patterns() {
    let share = tempdir().unwrap();
    let target = tempdir().unwrap();
    seed_share(share.path());
    let artifact = ArtifactDescriptor::new(
        "drop",
        BackendType::FileShare,
        share.path().to_string_lossy(),
    );

    let params = DownloadParameters::new(target.path()).patterns(["**", "!**/*.pdb"]);
    let sink = Arc::new(RecordingSink::default());
    let outcome = server(sink.clone())
        .download_single_artifact(&params, &artifact, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.file_count, 3);
    assert_eq!(outcome.total_bytes, 6 + 3 + 5);
    assert_eq!(read(target.path().join("bin/x64/tool.exe")), "exe64");
    assert!(!target.path().join("symbols/tool.pdb").exists());
    assert_eq!(sink.events_named("ArtifactDownload").len(), 1);
}

#[tokio::test]
async fn download_all_from_share_uses_artifact_directories() {
    let share = tempdir().unwrap();
    let target = tempdir().unwrap();
    seed_share(share.path());
    let artifacts = vec![
        ArtifactDescriptor::new("bin", BackendType::FileShare, share.path().join("bin").to_string_lossy()),
        ArtifactDescriptor::new("symbols", BackendType::FileShare, share.path().join("symbols").to_string_lossy()),
    ];

    let params = DownloadParameters::new(target.path());
    let outcome = server(Arc::new(RecordingSink::default()))
        .download(&params, &artifacts, &CancelToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.file_count, 3);
    assert_eq!(read(target.path().join("bin/tool.exe")), "exe");
    assert_eq!(read(target.path().join("symbols/tool.pdb")), "pdb");
}

#[tokio::test]
async fn missing_share_is_an_error() {
    let target = tempdir().unwrap();
    let artifact = ArtifactDescriptor::new(
        "drop",
        BackendType::FileShare,
        target.path().join("nowhere").to_string_lossy(),
    );
    let err = server(Arc::new(RecordingSink::default()))
        .download_single_artifact(&DownloadParameters::new(target.path()), &artifact, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fs(artifetch_fs::Error::Read { .. })));
}

#[tokio::test]
async fn publish_then_download_round_trip() {
    let source = tempdir().unwrap();
    let share = tempdir().unwrap();
    let target = tempdir().unwrap();
    seed_share(source.path());
    let server = server(Arc::new(RecordingSink::default()));
    let published_to = share.path().join("builds/42");

    let published = server
        .publish_artifact(source.path(), &published_to, 4, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(published.file_count, 4);
    assert_eq!(published.total_bytes, 6 + 3 + 5 + 3);
    assert_eq!(published.exit_code, None);

    let artifact = ArtifactDescriptor::new("drop", BackendType::FileShare, published_to.to_string_lossy());
    let outcome = server
        .download_single_artifact(&DownloadParameters::new(target.path()), &artifact, &CancelToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.file_count, 4);
    assert_eq!(read(target.path().join("readme.md")), "# drop");
    assert_eq!(read(target.path().join("symbols/tool.pdb")), "pdb");
}

#[tokio::test]
async fn publish_rejects_missing_source() {
    let dir = tempdir().unwrap();
    let err = server(Arc::new(RecordingSink::default()))
        .publish_artifact(dir.path().join("missing"), dir.path().join("out"), 2, &CancelToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fs(artifetch_fs::Error::NotADirectory(_))));
}
