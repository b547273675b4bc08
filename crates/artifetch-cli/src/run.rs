use std::sync::Arc;

use anyhow::{Context, bail};
use artifetch::{
    ArtifactDescriptor, ArtifactSelection, CancelToken, DownloadParameters, ProjectRef,
    RetrievalServer, TracingSink,
};

use crate::cli::{App, Commands, DownloadArg, PublishArg};
use crate::session::{OfflineSession, connect};

pub async fn run(app: App) -> anyhow::Result<()> {
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    match app.cmd {
        Commands::Download(arg) => download(arg, &cancel).await,
        Commands::Publish(arg) => publish(arg, &cancel).await,
    }
}

/// Merge command line flags over the optional config file.
pub fn build_params(arg: &DownloadArg) -> anyhow::Result<DownloadParameters> {
    let mut params = match &arg.config {
        Some(path) => DownloadParameters::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DownloadParameters::default(),
    };
    if let Some(target) = &arg.target {
        params.target_directory = target.clone();
    }
    if let Some(name) = &arg.name {
        params.selection = ArtifactSelection::Single(name.clone());
    }
    if !arg.patterns.is_empty() {
        params.patterns = arg.patterns.clone();
    }
    if let Some(project) = &arg.project {
        params.project = Some(ProjectRef::Id(project.clone()));
    }
    if let Some(parallelism) = arg.parallelism {
        params.parallelism = parallelism;
    }
    if let Some(retries) = arg.retries {
        params.retry_count = retries;
    }
    params.check_corruption |= arg.check_sizes;
    params.extract_tars |= arg.extract_tars;
    params.include_artifact_name_in_path |= arg.include_name;

    if params.target_directory.as_os_str().is_empty() {
        bail!("no target directory: pass --target or set target_directory in the config file");
    }
    params.validate()?;
    Ok(params)
}

fn load_artifacts(arg: &DownloadArg) -> anyhow::Result<Vec<ArtifactDescriptor>> {
    let raw = std::fs::read_to_string(&arg.artifacts)
        .with_context(|| format!("reading {}", arg.artifacts.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", arg.artifacts.display()))
}

async fn download(arg: DownloadArg, cancel: &CancelToken) -> anyhow::Result<()> {
    let params = build_params(&arg)?;
    let artifacts = load_artifacts(&arg)?;
    let session = connect(arg.service_url.as_deref(), &arg.token_env)?;
    let server = RetrievalServer::new(session, Arc::new(TracingSink));

    let outcome = server.download(&params, &artifacts, cancel).await?;
    println!(
        "{} file(s), {} bytes in {:.1}s",
        outcome.file_count,
        outcome.total_bytes,
        outcome.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn publish(arg: PublishArg, cancel: &CancelToken) -> anyhow::Result<()> {
    let server = RetrievalServer::new(Arc::new(OfflineSession), Arc::new(TracingSink));
    let outcome = server
        .publish_artifact(&arg.source, &arg.dest, arg.parallelism, cancel)
        .await?;
    println!(
        "{} file(s), {} bytes published in {:.1}s",
        outcome.file_count,
        outcome.total_bytes,
        outcome.elapsed.as_secs_f64()
    );
    Ok(())
}
