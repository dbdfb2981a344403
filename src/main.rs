// src/main.rs
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::net::TcpListener;

mod api;
mod assemble;
mod browser;
mod cache;
mod config;
mod detail;
mod error;
mod lesson;
mod navigator;
mod normalize;
mod schedule;

use api::AppState;
use browser::BrowserEngine;
use cache::FileCache;
use config::{Cli, Command, Settings};
use lesson::DaySchedule;
use schedule::{ChromeScraper, DATE_FMT, ScheduleService};

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    // Chrome 쪽 로그는 시끄러우니 warn 이상만
    let filter = format!("{level},headless_chrome=warn,tungstenite=warn");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.settings.debug);
    let settings = cli.settings;
    log::info!("[start] timetable_api");

    // ── 1) 브라우저 엔진: 프로세스당 하나
    let browser_cfg = settings.browser_config();
    let engine = tokio::task::spawn_blocking(move || BrowserEngine::launch(browser_cfg))
        .await?
        .context("failed to launch headless Chrome")?;
    let engine = Arc::new(engine);

    // ── 2) 스크래퍼 + 캐시 → 서비스
    let scraper = ChromeScraper::new(Arc::clone(&engine), &settings.base_url, settings.scrape_timeout())
        .with_context(|| format!("invalid base url {}", settings.base_url))?;
    let cache = FileCache::with_ttl(&settings.cache_dir, settings.cache_ttl());
    let service = Arc::new(ScheduleService::new(Arc::new(scraper), Arc::new(cache)));

    // ── 3) 실행
    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&settings, service).await,
        Command::Fetch { group, date, week } => fetch(&service, &group, date.as_deref(), week).await,
    };

    // ── 4) 정리 (Chrome 종료는 블로킹)
    tokio::task::spawn_blocking(move || engine.stop()).await?;
    log::info!("[done]");
    result
}

async fn serve(settings: &Settings, service: Arc<ScheduleService>) -> Result<()> {
    let app = api::create_router(AppState { schedules: service });

    let addr = settings.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;
    log::info!("listening on http://{addr} (cache: {})", settings.cache_dir.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("ctrl-c handler failed: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("shutdown requested");
}

/// 서버 없이 한 번 실행해서 응답 본문과 같은 JSON을 stdout에 출력
async fn fetch(service: &ScheduleService, group: &str, date: Option<&str>, week: bool) -> Result<()> {
    api::validate_group(group)?;
    let date = api::resolve_date(date, Local::now().naive_local())?;

    let body = if week {
        let w = service.week(group, date).await;
        for d in &w.schedules {
            log::info!("{}: {} lessons", d.date, d.schedule.len());
        }
        serde_json::to_string_pretty(&w)?
    } else {
        let schedule = service.day(group, date).await;
        for lesson in &schedule {
            log::info!("- {lesson}");
        }
        serde_json::to_string_pretty(&DaySchedule {
            group: group.to_string(),
            date: date.format(DATE_FMT).to_string(),
            schedule,
        })?
    };

    println!("{body}");
    Ok(())
}
