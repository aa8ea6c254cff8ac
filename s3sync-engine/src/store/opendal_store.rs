use std::future::IntoFuture;
use std::path::Path;
use std::time::Duration;

use opendal::{layers::TimeoutLayer, Metakey, Operator};
use tokio::runtime::Handle;

use s3sync_core::SyncConfig;

use super::{write_local_atomically, ObjectStore, ObjectSummary};
use crate::error::{io_err, StoreError};

/// Non-I/O operation timeout (stat, delete, list page).
pub const OP_TIMEOUT_SECS: u64 = 60;
/// I/O operation timeout (read, write).
pub const IO_TIMEOUT_SECS: u64 = 300;

/// Blocking adapter over an opendal [`Operator`].
///
/// Async calls are driven with `block_on` on a runtime owned by the caller,
/// one at a time.
pub struct OpendalStore {
    operator: Operator,
    handle: Handle,
    name: String,
}

impl OpendalStore {
    /// Build the store described by `config`: a local directory when
    /// `fs_root` is set, S3 otherwise.
    pub fn from_config(config: &SyncConfig, handle: Handle) -> Result<Self, StoreError> {
        match &config.fs_root {
            Some(root) => Self::fs(&root.join(&config.bucket), handle),
            None => Self::s3(
                &config.bucket,
                &config.region,
                config.endpoint.as_deref(),
                handle,
            ),
        }
    }

    /// S3 bucket; credentials come from the standard AWS environment chain.
    pub fn s3(
        bucket: &str,
        region: &str,
        endpoint: Option<&str>,
        handle: Handle,
    ) -> Result<Self, StoreError> {
        use opendal::services::S3;

        let mut builder = S3::default().bucket(bucket).region(region);
        if let Some(ep) = endpoint {
            builder = builder.endpoint(ep);
        }

        let operator = Operator::new(builder)?.layer(timeouts()).finish();
        tracing::debug!("initialized S3 store: bucket={bucket}, region={region}");
        Ok(Self {
            operator,
            handle,
            name: format!("s3://{bucket}"),
        })
    }

    /// A local directory standing in for a bucket.
    pub fn fs(root: &Path, handle: Handle) -> Result<Self, StoreError> {
        use opendal::services::Fs;

        std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
        let builder = Fs::default().root(&root.to_string_lossy());
        let operator = Operator::new(builder)?.layer(timeouts()).finish();
        tracing::debug!("initialized filesystem store at {}", root.display());
        Ok(Self {
            operator,
            handle,
            name: format!("file://{}", root.display()),
        })
    }
}

fn timeouts() -> TimeoutLayer {
    TimeoutLayer::default()
        .with_timeout(Duration::from_secs(OP_TIMEOUT_SECS))
        .with_io_timeout(Duration::from_secs(IO_TIMEOUT_SECS))
}

impl ObjectStore for OpendalStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn list(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StoreError> {
        let path = if prefix.is_empty() { "/" } else { prefix };
        let listed = self.handle.block_on(
            self.operator
                .list_with(path)
                .recursive(true)
                .metakey(Metakey::ContentLength | Metakey::Etag | Metakey::Mode)
                .into_future(),
        );
        let entries = match listed {
            Ok(entries) => entries,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.path().trim_start_matches('/').to_string();
            if key.is_empty() {
                continue;
            }
            let meta = entry.metadata();
            objects.push(ObjectSummary {
                key,
                etag: meta.etag().map(str::to_string),
                size: if meta.is_dir() { 0 } else { meta.content_length() },
            });
        }
        Ok(objects)
    }

    fn head(&self, key: &str) -> Result<Option<ObjectSummary>, StoreError> {
        match self.handle.block_on(self.operator.stat(key)) {
            Ok(meta) if meta.is_dir() => Ok(None),
            Ok(meta) => Ok(Some(ObjectSummary {
                key: key.to_string(),
                etag: meta.etag().map(str::to_string),
                size: meta.content_length(),
            })),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match self.handle.block_on(self.operator.read(key)) {
            Ok(buf) => Ok(buf.to_vec()),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, local: &Path, key: &str, content_type: &str) -> Result<(), StoreError> {
        let data = std::fs::read(local).map_err(|e| io_err(local, e))?;
        self.handle.block_on(
            self.operator
                .write_with(key, data)
                .content_type(content_type)
                .into_future(),
        )?;
        Ok(())
    }

    fn get(&self, key: &str, local: &Path) -> Result<(), StoreError> {
        let data = self.read(key)?;
        write_local_atomically(local, &data)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.handle.block_on(self.operator.delete(key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::runtime::Runtime;

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn fs_store_put_list_head_get_delete() {
        let rt = runtime();
        let bucket = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = OpendalStore::fs(bucket.path(), rt.handle().clone()).unwrap();

        let src = work.path().join("logo.png");
        std::fs::write(&src, b"png-bytes").unwrap();
        store.put(&src, "site/img/logo.png", "image/png").unwrap();

        let listed = store.list("site/").unwrap();
        let files: Vec<_> = listed.iter().filter(|o| !o.is_folder_marker()).collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].key, "site/img/logo.png");
        assert_eq!(files[0].size, 9);

        let head = store.head("site/img/logo.png").unwrap().expect("exists");
        assert_eq!(head.size, 9);
        assert!(store.head("site/img/missing.png").unwrap().is_none());

        let dest = work.path().join("out").join("logo.png");
        store.get("site/img/logo.png", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"png-bytes");

        store.delete("site/img/logo.png").unwrap();
        assert!(store.head("site/img/logo.png").unwrap().is_none());
    }

    #[test]
    fn listing_includes_the_prefix_marker() {
        let rt = runtime();
        let bucket = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = OpendalStore::fs(bucket.path(), rt.handle().clone()).unwrap();
        let src = work.path().join("a.js");
        std::fs::write(&src, b"1").unwrap();
        store.put(&src, "site/Old/a.js", "text/javascript").unwrap();

        let keys: Vec<String> = store.list("site/Old/").unwrap().into_iter().map(|o| o.key).collect();
        assert!(keys.contains(&"site/Old/".to_string()), "{keys:?}");
        assert!(keys.contains(&"site/Old/a.js".to_string()), "{keys:?}");
    }

    #[test]
    fn push_of_vanished_folder_removes_the_folder_itself() {
        use crate::confirm::ScriptedConfirm;
        use crate::pipeline::{ConfirmMode, SyncOptions, SyncOrchestrator};
        use s3sync_core::{Direction, SyncConfig};

        let rt = runtime();
        let bucket = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = OpendalStore::fs(bucket.path(), rt.handle().clone()).unwrap();
        let src = project.path().join("seed.js");
        std::fs::write(&src, b"seed").unwrap();
        store.put(&src, "site/Old/a.js", "text/javascript").unwrap();
        store.put(&src, "site/Old/sub/b.js", "text/javascript").unwrap();
        store.put(&src, "site/Keep/c.js", "text/javascript").unwrap();

        let config = SyncConfig::new(project.path(), "bucket", "site");
        let confirm = ScriptedConfirm::new([true]);
        let options = SyncOptions::new(Direction::Push).mode(ConfirmMode::AutoConfirm);
        let run = SyncOrchestrator::new(&config, &store, &confirm).run(&["Old".to_string()], &options);

        assert!(!run.has_failures(), "{run:?}");
        assert_eq!(run.paths[0].plan.marker_deletes, vec!["site/Old/sub/", "site/Old/"]);
        assert!(!bucket.path().join("site/Old").exists());
        assert!(bucket.path().join("site/Keep/c.js").is_file());
    }

    #[test]
    fn listing_missing_prefix_is_empty() {
        let rt = runtime();
        let bucket = TempDir::new().unwrap();
        let store = OpendalStore::fs(bucket.path(), rt.handle().clone()).unwrap();
        assert!(store.list("nothing/here/").unwrap().is_empty());
    }
}
