//! Document sources: the metadata side of the pipeline, read lazily in a fixed order.

use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::{Document, Opts, ProviderKind};

/// `file-1 … file-N`, each keyed by its id. Pairs with the fake provider.
#[derive(Clone, Debug)]
pub struct SyntheticDocuments {
    next: u64,
    count: u64,
}

impl SyntheticDocuments {
    pub fn new(count: u64) -> Self {
        Self { next: 1, count }
    }
}

impl Iterator for SyntheticDocuments {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.next > self.count {
            return None;
        }
        let id = self.next;
        self.next += 1;
        Some(Document::new(id, format!("file-{id}"), id.to_string()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.count + 1).saturating_sub(self.next) as usize;
        (left, Some(left))
    }
}

/// Regular files under `root`, sorted by name at every level. Name and key are the path relative
/// to `root` with `/` separators. Unreadable entries and paths that are not valid UTF-8 are
/// logged and skipped (no key could address them).
pub struct DirectoryDocuments {
    root: PathBuf,
    walker: walkdir::IntoIter,
    next_id: u64,
    limit: Option<u64>,
}

impl DirectoryDocuments {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            walker: WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter(),
            next_id: 1,
            limit: None,
        }
    }

    /// Stop after `limit` documents.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn relative_key(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts = rel
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>();
        let Some(parts) = parts else {
            warn!("skipping {}: file name is not valid UTF-8", path.display());
            return None;
        };
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}

impl Iterator for DirectoryDocuments {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        if self.limit.is_some_and(|l| self.next_id > l) {
            return None;
        }
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(key) = self.relative_key(entry.path()) else {
                continue;
            };
            let id = self.next_id;
            self.next_id += 1;
            return Some(Document::new(id, key.clone(), key));
        }
    }
}

/// Build the document source matching the provider selected in `opts`.
pub fn documents_from_opts(opts: &Opts) -> Box<dyn Iterator<Item = Document> + Send> {
    match (opts.provider, &opts.source_dir) {
        (ProviderKind::Dir, Some(dir)) => {
            Box::new(DirectoryDocuments::new(dir).with_limit(opts.document_count))
        }
        _ => Box::new(SyntheticDocuments::new(opts.document_count)),
    }
}
