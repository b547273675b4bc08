use std::path::{Path, PathBuf};
use std::time::Duration;

use artifetch_filter::MatchOptions;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Project the artifacts belong to, by id or by name.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectRef {
    Id(String),
    Name(String),
}

impl ProjectRef {
    /// Value passed to backends as the request scope.
    pub fn scope(&self) -> &str {
        match self {
            ProjectRef::Id(v) | ProjectRef::Name(v) => v,
        }
    }
}

/// Which of a build's artifacts a download request covers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSelection {
    /// Every artifact of the build.
    #[default]
    All,
    /// One artifact, matched by name without regard to case.
    Single(String),
}

/// Configuration of one download request.
///
/// Loaded from TOML or assembled with the builder methods. Every field has a
/// default, so a configuration file only needs `target_directory`.
///
/// # Examples
///
/// ```
/// use artifetch::DownloadParameters;
///
/// let params = DownloadParameters::new("out")
///     .patterns(["**", "!**/*.pdb"])
///     .parallelism(4)
///     .check_corruption(true);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DownloadParameters {
    /// Directory the artifacts are materialized into.
    pub target_directory: PathBuf,

    /// Project scope. Required by the container backend.
    pub project: Option<ProjectRef>,

    pub selection: ArtifactSelection,

    /// Ordered include/exclude glob patterns. An empty list selects everything.
    pub patterns: Vec<String>,

    pub match_options: MatchOptions,

    /// Number of concurrent transfer workers.
    ///
    /// Default: 8
    pub parallelism: usize,

    /// Maximum number of queued, not yet started transfers.
    ///
    /// Default: 4096
    pub queue_capacity: usize,

    /// Retries per item after the first attempt.
    ///
    /// Default: 4
    pub retry_count: u32,

    /// Total attempts of a content-addressable bulk download.
    ///
    /// Default: 3
    pub dedup_attempts: u32,

    /// Base delay of the exponential retry backoff, in milliseconds.
    ///
    /// Default: 1000
    pub retry_backoff_ms: u64,

    /// Compare every downloaded file's length with its listed length.
    ///
    /// Default: false
    pub check_corruption: bool,

    /// Place a single downloaded artifact under `target/<name>` instead of
    /// directly in the target directory.
    ///
    /// Default: false
    pub include_artifact_name_in_path: bool,

    /// Fetch container items through the content-addressable blob store
    /// when they carry a blob id.
    ///
    /// Default: true
    pub blob_path_enabled: bool,

    /// Unpack downloaded `.tar` files into `target/extracted_tars`.
    ///
    /// Default: false
    pub extract_tars: bool,

    /// Scratch directory for tar extraction.
    ///
    /// Default: `<target>/.artifetch-tars`
    pub extract_temp_path: Option<PathBuf>,
}

impl Default for DownloadParameters {
    fn default() -> Self {
        Self {
            target_directory: PathBuf::new(),
            project: None,
            selection: ArtifactSelection::All,
            patterns: Vec::new(),
            match_options: MatchOptions::default(),
            parallelism: 8,
            queue_capacity: 4096,
            retry_count: 4,
            dedup_attempts: 3,
            retry_backoff_ms: 1000,
            check_corruption: false,
            include_artifact_name_in_path: false,
            blob_path_enabled: true,
            extract_tars: false,
            extract_temp_path: None,
        }
    }
}

impl DownloadParameters {
    pub fn new(target_directory: impl Into<PathBuf>) -> Self {
        Self {
            target_directory: target_directory.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&source)
    }

    /// Reject configurations no download can run with.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| Err(Error::InvalidParameters(message.to_string()));
        if self.target_directory.as_os_str().is_empty() {
            return invalid("target directory is empty");
        }
        if self.parallelism == 0 {
            return invalid("parallelism must be at least 1");
        }
        if self.queue_capacity == 0 {
            return invalid("queue capacity must be at least 1");
        }
        if self.queue_capacity < self.parallelism {
            return invalid("queue capacity must not be smaller than parallelism");
        }
        if self.dedup_attempts == 0 {
            return invalid("dedup attempts must be at least 1");
        }
        if let Some(project) = &self.project
            && project.scope().trim().is_empty()
        {
            return invalid("project identity is empty");
        }
        Ok(())
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Total attempts per item: the first try plus `retry_count` retries.
    pub fn item_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    #[must_use]
    pub fn project(mut self, project: ProjectRef) -> Self {
        self.project = Some(project);
        self
    }

    #[must_use]
    pub fn selection(mut self, selection: ArtifactSelection) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn match_options(mut self, match_options: MatchOptions) -> Self {
        self.match_options = match_options;
        self
    }

    #[must_use]
    pub fn parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    #[must_use]
    pub fn queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    #[must_use]
    pub fn dedup_attempts(mut self, dedup_attempts: u32) -> Self {
        self.dedup_attempts = dedup_attempts;
        self
    }

    #[must_use]
    pub fn retry_backoff_ms(mut self, retry_backoff_ms: u64) -> Self {
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    #[must_use]
    pub fn check_corruption(mut self, check_corruption: bool) -> Self {
        self.check_corruption = check_corruption;
        self
    }

    #[must_use]
    pub fn include_artifact_name_in_path(mut self, include: bool) -> Self {
        self.include_artifact_name_in_path = include;
        self
    }

    #[must_use]
    pub fn blob_path_enabled(mut self, enabled: bool) -> Self {
        self.blob_path_enabled = enabled;
        self
    }

    #[must_use]
    pub fn extract_tars(mut self, extract_tars: bool) -> Self {
        self.extract_tars = extract_tars;
        self
    }

    #[must_use]
    pub fn extract_temp_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.extract_temp_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = DownloadParameters::default();
        assert_eq!(params.parallelism, 8);
        assert_eq!(params.retry_count, 4);
        assert_eq!(params.item_attempts(), 5);
        assert_eq!(params.dedup_attempts, 3);
        assert_eq!(params.retry_backoff(), Duration::from_secs(1));
        assert!(params.blob_path_enabled);
        assert!(!params.check_corruption);
        assert_eq!(params.selection, ArtifactSelection::All);
    }

    #[test]
    fn test_from_toml() {
        let params = DownloadParameters::from_toml_str(
            r#"
            target_directory = "out"
            patterns = ["**", "!**/*.log"]
            parallelism = 2
            queue_capacity = 16
            project = { name = "tools" }
            selection = { single = "drop" }

            [match_options]
            case_sensitive = true
            "#,
        )
        .unwrap();
        assert_eq!(params.target_directory, PathBuf::from("out"));
        assert_eq!(params.patterns, vec!["**", "!**/*.log"]);
        assert_eq!(params.parallelism, 2);
        assert_eq!(params.project, Some(ProjectRef::Name("tools".into())));
        assert_eq!(params.selection, ArtifactSelection::Single("drop".into()));
        assert!(params.match_options.case_sensitive);
        assert!(params.match_options.dot);
        assert_eq!(params.retry_count, 4);
    }

    #[test]
    fn test_from_toml_rejects_unknown_types() {
        assert!(matches!(
            DownloadParameters::from_toml_str("parallelism = \"many\""),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_validate() {
        assert!(DownloadParameters::new("out").validate().is_ok());
        assert!(DownloadParameters::default().validate().is_err());
        assert!(DownloadParameters::new("out").parallelism(0).validate().is_err());
        assert!(DownloadParameters::new("out").queue_capacity(0).validate().is_err());
        assert!(
            DownloadParameters::new("out")
                .parallelism(16)
                .queue_capacity(8)
                .validate()
                .is_err()
        );
        assert!(
            DownloadParameters::new("out")
                .project(ProjectRef::Id("  ".into()))
                .validate()
                .is_err()
        );
    }
}
