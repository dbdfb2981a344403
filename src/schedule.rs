// src/schedule.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use futures::future::join_all;
use tokio::time::timeout;
use url::Url;

use crate::assemble::assemble;
use crate::browser::BrowserEngine;
use crate::cache::ScheduleCache;
use crate::error::ScrapeError;
use crate::lesson::{DayEntry, LessonRecord, WeekSchedule};
use crate::navigator::{build_url, render_day};

pub const DATE_FMT: &str = "%Y-%m-%d";

/// 하루치 시간표를 원본에서 긁어오는 쪽
#[async_trait]
pub trait DayScraper: Send + Sync {
    async fn scrape(&self, group: &str, date: &str) -> Result<Vec<LessonRecord>, ScrapeError>;
}

/// headless Chrome 기반 구현. 블로킹 작업은 spawn_blocking + 전체 타임아웃.
pub struct ChromeScraper {
    engine: Arc<BrowserEngine>,
    base_url: Url,
    deadline: Duration,
}

impl ChromeScraper {
    pub fn new(engine: Arc<BrowserEngine>, base_url: &str, deadline: Duration) -> anyhow::Result<Self> {
        Ok(Self { engine, base_url: Url::parse(base_url)?, deadline })
    }
}

#[async_trait]
impl DayScraper for ChromeScraper {
    async fn scrape(&self, group: &str, date: &str) -> Result<Vec<LessonRecord>, ScrapeError> {
        let engine = Arc::clone(&self.engine);
        let url = build_url(&self.base_url, group, date);

        let job = tokio::task::spawn_blocking(move || -> Result<Vec<LessonRecord>, ScrapeError> {
            let session = engine.open_page()?;
            let nodes = render_day(&session, &url, engine.config().timeout)?;
            Ok(assemble(&nodes))
        });

        // 타임아웃이 나도 블로킹 스레드는 끝까지 돌고 세션을 정리한다
        match timeout(self.deadline, job).await {
            Ok(joined) => joined?,
            Err(_) => Err(ScrapeError::Timeout(self.deadline)),
        }
    }
}

/// 캐시 → 스크래핑 → 캐시 저장. 실패는 모두 빈 시간표로.
#[derive(Clone)]
pub struct ScheduleService {
    scraper: Arc<dyn DayScraper>,
    cache: Arc<dyn ScheduleCache>,
}

impl ScheduleService {
    pub fn new(scraper: Arc<dyn DayScraper>, cache: Arc<dyn ScheduleCache>) -> Self {
        Self { scraper, cache }
    }

    pub async fn day(&self, group: &str, date: NaiveDate) -> Vec<LessonRecord> {
        let date = date.format(DATE_FMT).to_string();

        if let Some(cached) = self.cache.load(group, &date).await {
            return cached;
        }

        match self.scraper.scrape(group, &date).await {
            Ok(lessons) => {
                log::info!("{group} {date}: {} lessons scraped", lessons.len());
                self.cache.store(group, &date, &lessons).await;
                lessons
            }
            Err(e) => degrade(group, &date, &e),
        }
    }

    /// 해당 날짜가 속한 주(월~일) 7일을 동시에 가져온다
    pub async fn week(&self, group: &str, date: NaiveDate) -> WeekSchedule {
        let monday = week_start(date);
        let dates = week_dates(monday);

        let days = join_all(dates.iter().map(|d| self.day(group, *d))).await;

        WeekSchedule {
            group: group.to_string(),
            week_start: monday.format(DATE_FMT).to_string(),
            schedules: dates
                .iter()
                .zip(days)
                .map(|(d, schedule)| DayEntry { date: d.format(DATE_FMT).to_string(), schedule })
                .collect(),
        }
    }
}

// 실패 종류별 로그 후 빈 시간표. 실패 결과는 캐시하지 않음.
fn degrade(group: &str, date: &str, e: &ScrapeError) -> Vec<LessonRecord> {
    match e {
        ScrapeError::Timeout(limit) => {
            log::error!("Ошибка при парсинге {group} на {date}: timeout after {limit:?}")
        }
        ScrapeError::Navigation { .. } | ScrapeError::Browser(_) => {
            log::error!("Ошибка при парсинге {group} на {date}: {e}")
        }
        ScrapeError::Join(_) => log::error!("scrape task for {group} {date} died: {e}"),
    }
    Vec::new()
}

pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn week_dates(monday: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|i| monday + chrono::Duration::days(i as i64))
}
