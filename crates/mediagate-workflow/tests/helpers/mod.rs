//! Test helpers: an engine over a temp-dir file store and an in-memory record
//! store, with hooks to inject faults and to hold a critical section open.

#![allow(dead_code)]

use async_trait::async_trait;
use mediagate_core::{AppError, Identity, MediaAttributes, Record, Role};
use mediagate_db::{MemoryRecordStore, RecordChange, RecordStore};
use mediagate_processing::MetadataExtractor;
use mediagate_storage::{FileStore, LocalFileStore, StorageError, StorageResult, UploadReader};
use mediagate_workflow::{Engine, EngineSettings, Outcome, Upload};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Record store that can be told to fail its next commits.
#[derive(Default)]
pub struct FaultyRecordStore {
    inner: MemoryRecordStore,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl FaultyRecordStore {
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for FaultyRecordStore {
    async fn get(&self, id: Uuid) -> Result<Option<Record>, AppError> {
        self.inner.get(id).await
    }

    async fn find_by_path(&self, path: &str) -> Result<Option<Record>, AppError> {
        self.inner.find_by_path(path).await
    }

    async fn find_replaced_by(&self, replacement_id: Uuid) -> Result<Option<Record>, AppError> {
        self.inner.find_replaced_by(replacement_id).await
    }

    async fn list(&self) -> Result<Vec<Record>, AppError> {
        self.inner.list().await
    }

    async fn commit(&self, changes: Vec<RecordChange>) -> Result<(), AppError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(AppError::Internal("injected commit failure".to_string()));
        }
        self.inner.commit(changes).await?;
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_identity_by_name(&self, name: &str) -> Result<Option<Identity>, AppError> {
        self.inner.find_identity_by_name(name).await
    }

    async fn create_identity(&self, identity: &Identity) -> Result<(), AppError> {
        self.inner.create_identity(identity).await
    }
}

/// File store that can be told to fail its renames, swaps or removals.
pub struct FaultyFileStore {
    inner: LocalFileStore,
    fail_renames: AtomicBool,
    fail_replaces: AtomicBool,
    fail_removes: AtomicBool,
}

impl FaultyFileStore {
    pub fn new(inner: LocalFileStore) -> Self {
        Self {
            inner,
            fail_renames: AtomicBool::new(false),
            fail_replaces: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }

    pub fn fail_renames(&self, fail: bool) {
        self.fail_renames.store(fail, Ordering::SeqCst);
    }

    pub fn fail_replaces(&self, fail: bool) {
        self.fail_replaces.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileStore for FaultyFileStore {
    async fn write_new(
        &self,
        key: &str,
        reader: UploadReader,
        limit: u64,
        cancel: &CancellationToken,
    ) -> StorageResult<u64> {
        self.inner.write_new(key, reader, limit, cancel).await
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.inner.exists(key).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        if self.fail_renames.load(Ordering::SeqCst) {
            return Err(StorageError::RenameFailed(format!("injected: {} -> {}", from, to)));
        }
        self.inner.rename(from, to).await
    }

    async fn replace_with_backup(
        &self,
        source: &str,
        target: &str,
        backup: &str,
    ) -> StorageResult<()> {
        if self.fail_replaces.load(Ordering::SeqCst) {
            return Err(StorageError::RenameFailed(format!("injected: {} -> {}", source, target)));
        }
        self.inner.replace_with_backup(source, target, backup).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed(format!("injected: {}", key)));
        }
        self.inner.remove(key).await
    }

    async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys().await
    }

    fn local_path(&self, key: &str) -> StorageResult<PathBuf> {
        self.inner.local_path(key)
    }
}

/// Extractor returning fixed attributes, with a failure switch, a hold
/// point, and a count of overlapping calls.
pub struct TestExtractor {
    attributes: MediaAttributes,
    fail: AtomicBool,
    hold: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl TestExtractor {
    pub fn new() -> Self {
        Self {
            attributes: sample_attributes(),
            fail: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make the next calls wait for `release` after signalling `entered`.
    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataExtractor for TestExtractor {
    async fn extract(&self, _path: &Path) -> Result<MediaAttributes, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        } else {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Metadata("injected extraction failure".to_string()));
        }
        Ok(self.attributes.clone())
    }
}

pub fn sample_attributes() -> MediaAttributes {
    MediaAttributes {
        video_codec: "h264".to_string(),
        width: 1280,
        height: 720,
        duration_ms: 10_000,
        frame_rate: 25.0,
        frame_rate_mode: "CFR".to_string(),
        audio_codec: "aac".to_string(),
        sampling_rate: 48_000,
        ..MediaAttributes::default()
    }
}

pub struct TestEnv {
    pub engine: Engine,
    pub files: Arc<FaultyFileStore>,
    pub records: Arc<FaultyRecordStore>,
    pub extractor: Arc<TestExtractor>,
    pub admin: Identity,
    pub user: Identity,
    pub cancel: CancellationToken,
    pub _temp_dir: TempDir,
}

pub const TEST_UPLOAD_LIMIT: u64 = 1024;

pub async fn setup() -> TestEnv {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let files = Arc::new(FaultyFileStore::new(
        LocalFileStore::new(temp_dir.path().join("Videos"))
            .await
            .expect("Failed to create file store"),
    ));
    let records = Arc::new(FaultyRecordStore::default());
    let extractor = Arc::new(TestExtractor::new());

    let admin = Identity::new("Admin", "Admin12345", Role::Privileged);
    let user = Identity::new("User", "User12345", Role::Standard);
    records.create_identity(&admin).await.unwrap();
    records.create_identity(&user).await.unwrap();

    let engine = Engine::with_settings(
        files.clone(),
        records.clone(),
        extractor.clone(),
        EngineSettings {
            upload_limit: TEST_UPLOAD_LIMIT,
            ..EngineSettings::default()
        },
    );

    TestEnv {
        engine,
        files,
        records,
        extractor,
        admin,
        user,
        cancel: CancellationToken::new(),
        _temp_dir: temp_dir,
    }
}

impl TestEnv {
    pub async fn add(&self, name: &str, data: &[u8], actor: &Identity) -> Outcome {
        self.engine
            .add(Upload::from_bytes(name, data.to_vec()), actor, &self.cancel)
            .await
            .expect("add failed")
    }

    pub async fn replace(&self, name: &str, data: &[u8], actor: &Identity) -> Outcome {
        self.engine
            .replace(Upload::from_bytes(name, data.to_vec()), actor, &self.cancel)
            .await
            .expect("replace failed")
    }

    pub async fn record_at(&self, path: &str) -> Record {
        self.records
            .find_by_path(path)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no record at {}", path))
    }

    pub async fn records(&self) -> Vec<Record> {
        self.records.list().await.unwrap()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.files.list_keys().await.unwrap()
    }

    pub async fn content(&self, key: &str) -> Vec<u8> {
        let path = self.files.local_path(key).unwrap();
        tokio::fs::read(path).await.unwrap()
    }

    /// Every stored key with its bytes, in key order.
    pub async fn stored_files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();
        for key in self.keys().await {
            let content = self.content(&key).await;
            files.push((key, content));
        }
        files
    }
}
