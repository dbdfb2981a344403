// src/navigator.rs
use std::time::{Duration, Instant};

use anyhow::Result;
use headless_chrome::{Element, Tab};
use url::Url;

use crate::browser::PageSession;
use crate::detail;
use crate::error::ScrapeError;

/// 시간표 사이트 기본 URL
pub const DEFAULT_BASE_URL: &str = "https://schedule-of.mirea.ru/";

// 페이지 DOM 계약 (사이트 개편 시 깨질 수 있음)
const ENTRY_SELECTOR: &str = "div.TimeLine_fullcalendarText__fm4tW";
const TITLE_SELECTOR: &str = "strong.TimeLine_eventTitle__oq7tU";
const DETAILS_SELECTOR: &str = r#"div[style="white-space: nowrap;"]"#;

const NETWORK_QUIET: Duration = Duration::from_millis(500);
const POLL: Duration = Duration::from_millis(100);
const RENDER_SETTLE: Duration = Duration::from_secs(1);
const SCROLL_SETTLE: Duration = Duration::from_millis(500);

/// 수업 노드 하나에 대해 조립기가 필요로 하는 것
pub trait LessonNode {
    /// 제목(`시간 유형 | 과목`) 텍스트, 없으면 None
    fn title_text(&self) -> Option<String>;
    fn room_text(&self) -> Option<String>;
    /// hover 팝오버 텍스트. 팝오버가 안 뜨면 `Ok(None)`.
    fn popover_text(&self) -> Result<Option<String>>;
}

/// `?scheduleTitle=<group>&date=<YYYY-MM-DD>`
pub fn build_url(base: &Url, group: &str, date: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .clear()
        .append_pair("scheduleTitle", group)
        .append_pair("date", date);
    url
}

/// 렌더링된 DOM 위의 수업 노드
pub struct ChromeNode<'a> {
    tab: &'a Tab,
    element: Element<'a>,
}

impl ChromeNode<'_> {
    fn inner_text(&self, selector: &str) -> Option<String> {
        let found = self.element.find_element(selector).ok()?;
        match found.get_inner_text() {
            Ok(t) => Some(t.trim().to_string()),
            Err(e) => {
                log::debug!("inner text of {selector} failed: {e:#}");
                None
            }
        }
    }
}

impl LessonNode for ChromeNode<'_> {
    fn title_text(&self) -> Option<String> {
        self.inner_text(TITLE_SELECTOR)
    }

    fn room_text(&self) -> Option<String> {
        let details = self.element.find_element(DETAILS_SELECTOR).ok()?;
        let room = details.find_element("strong").ok()?;
        room.get_inner_text().ok().map(|t| t.trim().to_string())
    }

    fn popover_text(&self) -> Result<Option<String>> {
        detail::read_popover(self.tab, &self.element)
    }
}

/// 페이지 이동 → 렌더 완료 대기 → 스크롤 → 수업 노드 수집.
/// 노드가 하나도 없으면 빈 Vec (휴일).
pub fn render_day<'a>(session: &'a PageSession, url: &Url, timeout: Duration) -> Result<Vec<ChromeNode<'a>>, ScrapeError> {
    let tab = session.tab();
    let nav_err = |source: anyhow::Error| ScrapeError::Navigation { url: url.to_string(), source };

    tab.navigate_to(url.as_str()).map_err(nav_err)?;
    tab.wait_until_navigated().map_err(nav_err)?;
    wait_network_idle(tab, timeout)?;
    wait_dom_ready(tab, timeout)?;

    // 스크롤해야 타임라인이 끝까지 그려짐
    session.pause(RENDER_SETTLE);
    tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)?;
    session.pause(SCROLL_SETTLE);

    if count(tab, ENTRY_SELECTOR)? == 0 {
        log::info!("no timetable entries at {url}");
        return Ok(Vec::new());
    }

    let nodes = tab
        .find_elements(ENTRY_SELECTOR)?
        .into_iter()
        .map(|element| ChromeNode { tab, element })
        .collect::<Vec<_>>();
    log::debug!("{} timetable entries at {url}", nodes.len());
    Ok(nodes)
}

fn eval_u64(tab: &Tab, expr: &str) -> Result<u64> {
    let v = tab.evaluate(expr, false)?.value;
    Ok(v.and_then(|v| v.as_u64()).unwrap_or(0))
}

fn count(tab: &Tab, selector: &str) -> Result<u64> {
    eval_u64(tab, &format!("document.querySelectorAll('{selector}').length"))
}

/// 리소스 로드 수가 NETWORK_QUIET 동안 변하지 않으면 idle로 본다
fn wait_network_idle(tab: &Tab, timeout: Duration) -> Result<(), ScrapeError> {
    let started = Instant::now();
    let mut last = eval_u64(tab, "performance.getEntriesByType('resource').length")?;
    let mut quiet_since = Instant::now();

    while quiet_since.elapsed() < NETWORK_QUIET {
        if started.elapsed() >= timeout {
            return Err(ScrapeError::Timeout(timeout));
        }
        std::thread::sleep(POLL);
        let now = eval_u64(tab, "performance.getEntriesByType('resource').length")?;
        if now != last {
            last = now;
            quiet_since = Instant::now();
        }
    }
    Ok(())
}

fn wait_dom_ready(tab: &Tab, timeout: Duration) -> Result<(), ScrapeError> {
    let started = Instant::now();
    loop {
        let state = tab.evaluate("document.readyState", false)?.value;
        if state.as_ref().and_then(|v| v.as_str()).is_some_and(|s| s != "loading") {
            return Ok(());
        }
        if started.elapsed() >= timeout {
            return Err(ScrapeError::Timeout(timeout));
        }
        std::thread::sleep(POLL);
    }
}
