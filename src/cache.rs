// src/cache.rs
//! `(group, date)` → JSON 파일 캐시
//!
//! ```text
//! {cache_dir}/
//! ├── БАСО-03-24_2024-06-10.json
//! └── БАСО-03-24_2024-06-11.json
//! ```
//!
//! 파일 수정 시각이 신선도 기준. 오래된 파일은 지우지 않고 무시했다가 덮어씀.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::AsyncWriteExt;

use crate::error::CacheError;
use crate::lesson::LessonRecord;

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// 같은 키를 동시에 쓰는 요청끼리 임시 파일이 겹치지 않게
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9\-А-Яа-яёЁ]").expect("sanitize pattern"));

/// 라틴/키릴 문자, 숫자, `-` 외의 문자는 `_`로 치환
pub fn sanitize_group(group: &str) -> String {
    UNSAFE_CHARS.replace_all(group, "_").into_owned()
}

pub fn cache_key(group: &str, date: &str) -> String {
    format!("{}_{}.json", sanitize_group(group), date)
}

/// 캐시 능력 인터페이스. 호출자는 hit/miss만 본다.
#[async_trait]
pub trait ScheduleCache: Send + Sync {
    async fn load(&self, group: &str, date: &str) -> Option<Vec<LessonRecord>>;
    async fn store(&self, group: &str, date: &str, schedule: &[LessonRecord]);
}

/// 내부 조회 결과
#[derive(Debug)]
pub enum Lookup {
    Hit(Vec<LessonRecord>),
    Miss,
    Stale(Duration),
    Failed(CacheError),
}

#[derive(Clone, Debug)]
pub struct FileCache {
    root_dir: PathBuf,
    ttl: Duration,
}

impl FileCache {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(root_dir, DEFAULT_TTL)
    }

    pub fn with_ttl(root_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self { root_dir: root_dir.into(), ttl }
    }

    pub fn path(&self, group: &str, date: &str) -> PathBuf {
        self.root_dir.join(cache_key(group, date))
    }

    pub async fn lookup(&self, group: &str, date: &str) -> Lookup {
        let path = self.path(group, date);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Lookup::Miss,
            Err(e) => return Lookup::Failed(e.into()),
        };
        let modified = match meta.modified() {
            Ok(t) => t,
            Err(e) => return Lookup::Failed(e.into()),
        };
        // 미래 시각(시계 역행)이면 나이 0으로 본다
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age >= self.ttl {
            return Lookup::Stale(age);
        }

        match self.read_json(&path).await {
            Ok(v) => Lookup::Hit(v),
            Err(e) => Lookup::Failed(e),
        }
    }

    async fn read_json(&self, path: &Path) -> Result<Vec<LessonRecord>, CacheError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 임시 파일에 쓴 뒤 rename. 읽는 쪽은 잘린 파일을 보지 않는다.
    pub async fn write(&self, group: &str, date: &str, schedule: &[LessonRecord]) -> Result<PathBuf, CacheError> {
        tokio::fs::create_dir_all(&self.root_dir).await?;
        let path = self.path(group, date);
        let bytes = serde_json::to_vec_pretty(schedule)?;

        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("{}.{seq}.tmp", std::process::id()));
        if let Err(e) = write_file(&tmp, &bytes).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(path)
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl ScheduleCache for FileCache {
    async fn load(&self, group: &str, date: &str) -> Option<Vec<LessonRecord>> {
        match self.lookup(group, date).await {
            Lookup::Hit(v) => {
                log::debug!("cache hit {group} {date} ({} lessons)", v.len());
                Some(v)
            }
            Lookup::Miss => None,
            Lookup::Stale(age) => {
                log::debug!("cache stale {group} {date} (age {}s)", age.as_secs());
                None
            }
            Lookup::Failed(e) => {
                log::warn!("cache read failed for {group} {date}: {e}");
                None
            }
        }
    }

    async fn store(&self, group: &str, date: &str, schedule: &[LessonRecord]) {
        if let Err(e) = self.write(group, date, schedule).await {
            log::error!("Ошибка сохранения кэша: {e}");
        }
    }
}
