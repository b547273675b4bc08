#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Folder,
}

/// One entry of a container listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactItem {
    /// `/`-separated path inside the container, including the artifact root.
    pub path: String,
    pub kind: ItemKind,
    /// Listed length in bytes; zero for folders.
    pub length: u64,
    /// Content-addressable id, when the item can be fetched from the blob store.
    pub blob_id: Option<String>,
}

impl ArtifactItem {
    pub fn file(path: impl Into<String>, length: u64) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::File,
            length,
            blob_id: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ItemKind::Folder,
            length: 0,
            blob_id: None,
        }
    }

    pub fn with_blob(mut self, id: impl Into<String>) -> Self {
        self.blob_id = Some(id.into());
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == ItemKind::File
    }
}
