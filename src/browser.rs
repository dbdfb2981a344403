// src/browser.rs
//! 프로세스 전체에서 공유하는 headless Chrome 핸들
//!
//! - 시작 시 한 번 띄우고 종료 시 내림 (`BrowserEngine::launch` / `stop`)
//! - 요청마다 격리된 브라우저 컨텍스트 + 탭을 새로 받음 (`PageSession`)
//! - `PageSession`이 drop되면 탭을 닫고 컨텍스트를 폐기
//!
//! 컨텍스트 폐기(`Target.disposeBrowserContext`)는 기본 컨텍스트에 있는 제어용 탭으로 보낸다.
//! headless_chrome은 블로킹 API라서 이 모듈의 함수들은 `spawn_blocking` 안에서 호출한다.

use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use headless_chrome::protocol::cdp::{Emulation, Target};
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::BrowserConfig;

/// 봇 탐지 회피용 데스크톱 UA
pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
pub const VIEWPORT: (u32, u32) = (1920, 1080);

/// 살아 있는 Chrome 프로세스 + 기본 컨텍스트의 제어용 탭
struct Chrome {
    browser: Browser,
    control: Arc<Tab>,
}

impl Chrome {
    fn start(config: &BrowserConfig) -> Result<Self> {
        let options = LaunchOptions {
            headless: config.headless,
            window_size: Some(VIEWPORT),
            idle_browser_timeout: config.idle_timeout,
            args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
            ..Default::default()
        };
        let browser = Browser::new(options)?;
        let control = browser.new_tab()?;
        Ok(Self { browser, control })
    }
}

pub struct BrowserEngine {
    config: BrowserConfig,
    chrome: Mutex<Option<Arc<Chrome>>>,
}

impl BrowserEngine {
    pub fn launch(config: BrowserConfig) -> Result<Self> {
        let chrome = Chrome::start(&config)?;
        log::info!("headless Chrome started (headless={})", config.headless);
        Ok(Self {
            config,
            chrome: Mutex::new(Some(Arc::new(chrome))),
        })
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// 살아 있는 브라우저 핸들 (없으면 새로 띄움)
    fn chrome(&self) -> Result<Arc<Chrome>> {
        let mut slot = self.chrome.lock().map_err(|_| anyhow!("browser lock poisoned"))?;
        if let Some(c) = slot.as_ref() {
            return Ok(Arc::clone(c));
        }
        log::info!("launching headless Chrome");
        let c = Arc::new(Chrome::start(&self.config)?);
        *slot = Some(Arc::clone(&c));
        Ok(c)
    }

    /// 죽은 브라우저를 버림 (다음 호출에서 재시작)
    fn discard(&self, dead: &Arc<Chrome>) {
        if let Ok(mut slot) = self.chrome.lock() {
            if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, dead)) {
                *slot = None;
            }
        }
    }

    /// 격리된 컨텍스트에 새 탭을 연다. 브라우저가 죽어 있으면 한 번 재시작 후 재시도.
    pub fn open_page(&self) -> Result<PageSession> {
        let chrome = self.chrome()?;
        match PageSession::open(Arc::clone(&chrome), &self.config) {
            Ok(session) => Ok(session),
            Err(e) => {
                log::warn!("opening browser context failed ({e:#}), restarting Chrome");
                self.discard(&chrome);
                PageSession::open(self.chrome()?, &self.config)
            }
        }
    }

    /// 종료 시 호출. Chrome 프로세스는 마지막 핸들이 drop될 때 내려간다.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.chrome.lock() {
            if slot.take().is_some() {
                log::info!("headless Chrome stopped");
            }
        }
    }
}

/// 브라우저 컨텍스트를 폐기할 수 있는 쪽
pub trait ContextControl {
    fn dispose_context(&self, context_id: &str) -> Result<()>;
}

impl ContextControl for Tab {
    fn dispose_context(&self, context_id: &str) -> Result<()> {
        self.call_method(Target::DisposeBrowserContext {
            browser_context_id: context_id.to_string(),
        })?;
        Ok(())
    }
}

/// 컨텍스트가 만들어진 직후부터 잡고 있다가 drop 시 폐기
pub struct ContextGuard<C: ContextControl> {
    control: Arc<C>,
    context_id: String,
}

impl<C: ContextControl> ContextGuard<C> {
    pub fn new(control: Arc<C>, context_id: impl Into<String>) -> Self {
        Self { control, context_id: context_id.into() }
    }

    pub fn id(&self) -> &str {
        &self.context_id
    }
}

impl<C: ContextControl> Drop for ContextGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.control.dispose_context(&self.context_id) {
            log::warn!("disposing browser context {} failed: {e:#}", self.context_id);
        }
    }
}

/// 요청 하나가 쓰는 컨텍스트 + 탭. drop 시 정리.
pub struct PageSession {
    // 필드 drop 순서: 탭 → 컨텍스트 → 브라우저 핸들
    tab: Arc<Tab>,
    context: ContextGuard<Tab>,
    _chrome: Arc<Chrome>,
}

impl PageSession {
    fn open(chrome: Arc<Chrome>, config: &BrowserConfig) -> Result<Self> {
        let (context, tab) = {
            let ctx = chrome.browser.new_context()?;
            // 탭 생성이 실패해도 guard가 컨텍스트를 폐기함
            let guard = ContextGuard::new(Arc::clone(&chrome.control), ctx.get_id());
            let tab = ctx.new_tab()?;
            (guard, tab)
        };
        let session = Self { tab, context, _chrome: chrome };

        session.tab.set_default_timeout(config.timeout);
        session.tab.set_user_agent(DESKTOP_USER_AGENT, Some("ru-RU,ru;q=0.9,en;q=0.8"), Some("Win32"))?;
        session.tab.call_method(viewport_override())?;
        log::debug!("browser context {} opened", session.context.id());
        Ok(session)
    }

    pub fn tab(&self) -> &Tab {
        &self.tab
    }

    /// 고정 대기 (클라이언트 렌더링 안정화)
    pub fn pause(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        if let Err(e) = self.tab.close(true) {
            log::debug!("closing tab failed: {e:#}");
        }
    }
}

/// 창 크기가 아니라 뷰포트를 정확히 1920x1080으로
fn viewport_override() -> Emulation::SetDeviceMetricsOverride {
    Emulation::SetDeviceMetricsOverride {
        width: VIEWPORT.0,
        height: VIEWPORT.1,
        device_scale_factor: 1.0,
        mobile: false,
        scale: None,
        screen_width: None,
        screen_height: None,
        position_x: None,
        position_y: None,
        dont_set_visible_size: None,
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeControl {
        disposed: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ContextControl for FakeControl {
        fn dispose_context(&self, context_id: &str) -> Result<()> {
            self.disposed.lock().unwrap().push(context_id.to_string());
            if self.fail { Err(anyhow!("target closed")) } else { Ok(()) }
        }
    }

    fn open_then_fail(control: &Arc<FakeControl>) -> Result<()> {
        let _guard = ContextGuard::new(Arc::clone(control), "CTX-2");
        Err(anyhow!("new tab failed"))
    }

    #[test]
    fn context_disposed_on_drop() {
        let control = Arc::new(FakeControl::default());
        {
            let guard = ContextGuard::new(Arc::clone(&control), "CTX-1");
            assert_eq!(guard.id(), "CTX-1");
            assert!(control.disposed.lock().unwrap().is_empty());
        }
        assert_eq!(*control.disposed.lock().unwrap(), ["CTX-1"]);
    }

    #[test]
    fn context_disposed_on_early_error() {
        let control = Arc::new(FakeControl::default());
        assert!(open_then_fail(&control).is_err());
        assert_eq!(*control.disposed.lock().unwrap(), ["CTX-2"]);
    }

    #[test]
    fn dispose_failure_does_not_panic() {
        let control = Arc::new(FakeControl { fail: true, ..Default::default() });
        drop(ContextGuard::new(Arc::clone(&control), "CTX-3"));
        assert_eq!(control.disposed.lock().unwrap().len(), 1);
    }

    #[test]
    fn viewport_is_exact_desktop_size() {
        let v = serde_json::to_value(viewport_override()).unwrap();
        assert_eq!(v["width"], 1920);
        assert_eq!(v["height"], 1080);
        assert_eq!(v["mobile"], false);
        assert!(v.get("screenWidth").is_none());
    }
}
