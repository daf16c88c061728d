//! Opaque asynchronous asset retrieval
//!
//! A source turns an asset URI into bytes and reports byte progress on the way. Sources are
//! polled on the viewer's thread; [`FileSource`] moves the blocking reads onto a worker thread
//! and resumes through channels.

use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use futures::{
    channel::{mpsc, oneshot},
    future::{self, LocalBoxFuture},
    FutureExt, StreamExt,
};

use crate::error::ResourceError;

/// Bytes fetched so far out of `total` (0 when unknown)
pub type FetchProgress = Box<dyn FnMut(u64, u64)>;

pub type FetchResult = Result<Vec<u8>, ResourceError>;

pub trait AssetSource {
    fn fetch(&self, uri: &str, progress: FetchProgress) -> LocalBoxFuture<'static, FetchResult>;
}

/// Reads assets relative to a root directory
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
    chunk_size: usize,
}

impl FileSource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            chunk_size: 64 * 1024,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Web-style absolute URIs ("/model.obj") resolve against the root too
    fn resolve(&self, uri: &str) -> PathBuf {
        self.root.join(uri.trim_start_matches('/'))
    }
}

fn read_chunked(
    path: &Path,
    uri: &str,
    chunk_size: usize,
    progress: &mpsc::UnboundedSender<(u64, u64)>,
) -> FetchResult {
    let mut file = File::open(path).map_err(|e| ResourceError::fetch(uri, e))?;
    let total = file.metadata().map(|m| m.len()).unwrap_or(0);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let read = file
            .read(&mut chunk)
            .map_err(|e| ResourceError::fetch(uri, e))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        // receiver gone means the future was dropped; keep reading to finish cleanly
        let _ = progress.unbounded_send((bytes.len() as u64, total));
    }
    Ok(bytes)
}

impl AssetSource for FileSource {
    fn fetch(
        &self,
        uri: &str,
        mut progress: FetchProgress,
    ) -> LocalBoxFuture<'static, FetchResult> {
        let path = self.resolve(uri);
        let uri = uri.to_string();
        let chunk_size = self.chunk_size;

        let (progress_tx, mut progress_rx) = mpsc::unbounded();
        let (done_tx, done_rx) = oneshot::channel();

        let worker_uri = uri.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("fetch {}", uri))
            .spawn(move || {
                let result = read_chunked(&path, &worker_uri, chunk_size, &progress_tx);
                drop(progress_tx);
                let _ = done_tx.send(result);
            });

        if let Err(e) = spawned {
            return future::ready(Err(ResourceError::Spawn {
                uri,
                reason: e.to_string(),
            }))
            .boxed_local();
        }

        async move {
            while let Some((loaded, total)) = progress_rx.next().await {
                progress(loaded, total);
            }
            done_rx
                .await
                .map_err(|_| ResourceError::fetch(&uri, "fetch worker exited early"))?
        }
        .boxed_local()
    }
}

/// Serves assets from memory; used by tests and embedded hosts
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, uri: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(uri, bytes);
        self
    }

    pub fn insert(&mut self, uri: &str, bytes: impl Into<Vec<u8>>) {
        self.assets.insert(uri.to_string(), bytes.into());
    }
}

impl AssetSource for MemorySource {
    fn fetch(
        &self,
        uri: &str,
        mut progress: FetchProgress,
    ) -> LocalBoxFuture<'static, FetchResult> {
        let result = match self.assets.get(uri) {
            Some(bytes) => {
                let len = bytes.len() as u64;
                progress(len, len);
                Ok(bytes.clone())
            }
            None => Err(ResourceError::fetch(uri, "no such asset")),
        };
        future::ready(result).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("orbitview-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_memory_source_missing_asset() {
        let source = MemorySource::new().with_asset("a.bin", vec![1, 2, 3]);

        let bytes = futures::executor::block_on(source.fetch("a.bin", Box::new(|_, _| {})));
        assert_eq!(bytes.unwrap(), vec![1, 2, 3]);

        let missing = futures::executor::block_on(source.fetch("b.bin", Box::new(|_, _| {})));
        assert!(matches!(missing, Err(ResourceError::Fetch { uri, .. }) if uri == "b.bin"));
    }

    #[test]
    fn test_file_source_reports_chunked_progress() {
        let dir = scratch_dir("chunks");
        std::fs::write(dir.join("model.obj"), vec![7u8; 10]).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let source = FileSource::new(&dir).with_chunk_size(4);

        let bytes = futures::executor::block_on(source.fetch(
            "/model.obj",
            Box::new(move |loaded, total| sink.borrow_mut().push((loaded, total))),
        ))
        .unwrap();

        assert_eq!(bytes.len(), 10);
        assert_eq!(*seen.borrow(), vec![(4, 10), (8, 10), (10, 10)]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_file_source_missing_file_is_fetch_error() {
        let dir = scratch_dir("missing");
        let source = FileSource::new(&dir);
        let result = futures::executor::block_on(source.fetch("nope.hdr", Box::new(|_, _| {})));
        assert!(matches!(result, Err(ResourceError::Fetch { .. })));
        std::fs::remove_dir_all(dir).ok();
    }
}
