use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// 导入应用模块
use drive_pictures_to_s3::config::TransferLimits;
use drive_pictures_to_s3::drive::{DriveSource, FetchedFile, SourceFile};
use drive_pictures_to_s3::error::{DriveError, TransferError};
use drive_pictures_to_s3::s3::ObjectStore;
use drive_pictures_to_s3::transfer::{NamingMode, ObjectNamer, Stage, TransferOrchestrator};

/// 记录同时进行中的操作数及其峰值
#[derive(Default)]
struct ActivityGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// 内存中的文件来源，可让指定文件始终下载失败
struct FakeDrive {
    files: Vec<SourceFile>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    gauge: ActivityGauge,
    fetch_calls: Mutex<HashMap<String, u32>>,
}

impl FakeDrive {
    fn new(names: &[&str]) -> Self {
        let files = names
            .iter()
            .enumerate()
            .map(|(index, name)| SourceFile {
                id: (index + 1).to_string(),
                name: name.to_string(),
                mime_type: "image/jpeg".to_string(),
            })
            .collect();
        Self {
            files,
            failing: HashSet::new(),
            delays: HashMap::new(),
            gauge: ActivityGauge::default(),
            fetch_calls: Mutex::new(HashMap::new()),
        }
    }

    fn failing(mut self, file_id: &str) -> Self {
        self.failing.insert(file_id.to_string());
        self
    }

    fn delay(mut self, file_id: &str, delay: Duration) -> Self {
        self.delays.insert(file_id.to_string(), delay);
        self
    }

    fn calls_for(&self, file_id: &str) -> u32 {
        self.fetch_calls
            .lock()
            .unwrap()
            .get(file_id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DriveSource for FakeDrive {
    async fn list_images(&self, _folder_id: &str) -> Result<Vec<SourceFile>, DriveError> {
        Ok(self.files.clone())
    }

    async fn fetch_file(&self, file_id: &str) -> Result<FetchedFile, DriveError> {
        *self
            .fetch_calls
            .lock()
            .unwrap()
            .entry(file_id.to_string())
            .or_insert(0) += 1;

        self.gauge.enter();
        let delay = self
            .delays
            .get(file_id)
            .copied()
            .unwrap_or(Duration::from_millis(10));
        tokio::time::sleep(delay).await;
        self.gauge.exit();

        if self.failing.contains(file_id) {
            return Err(DriveError::Api {
                status: 500,
                message: format!("file {file_id} is unavailable"),
            });
        }

        let file = self
            .files
            .iter()
            .find(|file| file.id == file_id)
            .ok_or_else(|| DriveError::Api {
                status: 404,
                message: "not found".to_string(),
            })?;
        Ok(FetchedFile {
            content: Bytes::from(format!("content of {}", file.name)),
            original_name: file.name.clone(),
        })
    }
}

/// 内存中的对象存储
#[derive(Default)]
struct FakeStore {
    objects: Mutex<HashMap<String, Bytes>>,
    gauge: ActivityGauge,
}

impl FakeStore {
    fn keys(&self) -> HashSet<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    fn content(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn put_object(
        &self,
        key: &str,
        content: Bytes,
        _content_type: Option<String>,
    ) -> anyhow::Result<()> {
        self.gauge.enter();
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.gauge.exit();

        self.objects.lock().unwrap().insert(key.to_string(), content);
        Ok(())
    }
}

fn limits(downloads: usize, uploads: usize) -> TransferLimits {
    TransferLimits {
        max_concurrent_downloads: downloads,
        max_concurrent_uploads: uploads,
        fetch_attempts: 3,
        retry_delay: Duration::from_millis(5),
        upload_attempts: 1,
    }
}

fn orchestrator(
    drive: &Arc<FakeDrive>,
    store: &Arc<FakeStore>,
    mode: NamingMode,
    prefix: &str,
    limits: &TransferLimits,
) -> TransferOrchestrator {
    TransferOrchestrator::new(
        drive.clone(),
        store.clone(),
        ObjectNamer::new(mode, prefix),
        limits,
    )
}

/// 集成测试：顺序编号模式
///
/// 验证序号按列举位置分配，与完成顺序无关
#[tokio::test]
async fn test_sequential_naming_follows_listing_order() {
    // 第一个文件最慢，完成顺序与列举顺序相反
    let drive = Arc::new(
        FakeDrive::new(&["a.jpg", "b.png", "c.jpg"])
            .delay("1", Duration::from_millis(60))
            .delay("2", Duration::from_millis(30))
            .delay("3", Duration::from_millis(5)),
    );
    let store = Arc::new(FakeStore::default());

    let report = orchestrator(&drive, &store, NamingMode::Sequential, "p/", &limits(3, 3))
        .run("folder")
        .await
        .unwrap();

    let expected: HashSet<String> = ["p/1.jpg", "p/2.png", "p/3.jpg"]
        .iter()
        .map(|key| key.to_string())
        .collect();
    assert_eq!(store.keys(), expected);
    assert_eq!(store.content("p/2.png").unwrap(), Bytes::from("content of b.png"));
    assert_eq!(report.uploaded_keys(), vec!["p/1.jpg", "p/2.png", "p/3.jpg"]);
}

/// 集成测试：保留原名模式
///
/// 验证键为前缀加原始文件名，特殊字符原样保留
#[tokio::test]
async fn test_retain_naming_verbatim() {
    let drive = Arc::new(FakeDrive::new(&["Sommer 2023 (1) ü&#.jpeg"]));
    let store = Arc::new(FakeStore::default());

    orchestrator(&drive, &store, NamingMode::Retain, "albums/", &limits(1, 5))
        .run("folder")
        .await
        .unwrap();

    assert!(store.keys().contains("albums/Sommer 2023 (1) ü&#.jpeg"));
}

/// 集成测试：下载并发上限
///
/// 验证突发大量文件时同时进行的下载数不超过上限
#[tokio::test]
async fn test_download_concurrency_bound() {
    let names: Vec<String> = (1..=8).map(|i| format!("{i}.jpg")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let drive = Arc::new(FakeDrive::new(&names));
    let store = Arc::new(FakeStore::default());

    let report = orchestrator(&drive, &store, NamingMode::Retain, "", &limits(2, 5))
        .run("folder")
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 8);
    // 下载池恰好跑满上限
    assert_eq!(drive.gauge.peak(), 2);
}

/// 集成测试：默认下载并发为 1
#[tokio::test]
async fn test_default_download_concurrency_serializes() {
    let drive = Arc::new(FakeDrive::new(&["a.jpg", "b.jpg", "c.jpg", "d.jpg"]));
    let store = Arc::new(FakeStore::default());

    orchestrator(&drive, &store, NamingMode::Retain, "", &TransferLimits {
        retry_delay: Duration::from_millis(5),
        ..TransferLimits::default()
    })
    .run("folder")
    .await
    .unwrap();

    assert_eq!(drive.gauge.peak(), 1);
}

/// 集成测试：上传并发上限
///
/// 下载槽位充足时，上传池独立跑满自己的上限且不超过它
#[tokio::test]
async fn test_upload_concurrency_bound() {
    let names: Vec<String> = (1..=10).map(|i| format!("{i}.png")).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let drive = Arc::new(FakeDrive::new(&names));
    let store = Arc::new(FakeStore::default());

    let report = orchestrator(&drive, &store, NamingMode::Retain, "", &limits(10, 3))
        .run("folder")
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 10);
    assert_eq!(store.gauge.peak(), 3);
}

/// 集成测试：单个文件失败不影响其他文件
///
/// 第 3 个文件始终下载失败，其余文件仍然完成，运行本身成功
#[tokio::test]
async fn test_partial_failure_isolation() {
    let drive = Arc::new(
        FakeDrive::new(&["1.jpg", "2.jpg", "3.jpg", "4.jpg", "5.jpg"]).failing("3"),
    );
    let store = Arc::new(FakeStore::default());

    let report = orchestrator(&drive, &store, NamingMode::Retain, "", &limits(1, 5))
        .run("folder")
        .await
        .unwrap();

    // 每个列举到的文件都有一个结果
    assert_eq!(report.total(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(store.keys().len(), report.total() - report.failed());

    for id in ["1", "2", "4", "5"] {
        assert_eq!(drive.calls_for(id), 1);
    }
    // 失败的文件恰好尝试了 3 次
    assert_eq!(drive.calls_for("3"), 3);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    let (outcome, failure) = failures[0];
    assert_eq!(outcome.source_id, "3");
    assert_eq!(outcome.position, 3);
    assert_eq!(failure.stage, Stage::Fetching);
    assert!(matches!(
        failure.error,
        TransferError::Fetch { attempts: 3, .. }
    ));
}
