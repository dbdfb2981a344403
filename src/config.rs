// src/config.rs
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::navigator::DEFAULT_BASE_URL;

#[derive(Parser, Debug)]
#[command(name = "timetable_api", version, about = "Schedule API RTU MIREA")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// HTTP API 서버 실행 (기본)
    Serve,
    /// 한 번만 긁어서 JSON 출력
    Fetch {
        #[arg(long)]
        group: String,
        /// YYYY-MM-DD, 기본값 오늘
        #[arg(long)]
        date: Option<String>,
        /// 해당 날짜가 속한 주 전체
        #[arg(long)]
        week: bool,
    },
}

/// 플래그 > 환경변수 > 기본값
#[derive(Args, Debug, Clone)]
pub struct Settings {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// debug 로그 출력 (환경변수는 1/0, yes/no, true/false)
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    pub debug: bool,

    #[arg(long, env = "CACHE_DIR", default_value = "schedule_cache")]
    pub cache_dir: PathBuf,

    /// 캐시 유효 시간(초)
    #[arg(long, env = "CACHE_TTL", default_value_t = 86_400)]
    pub cache_ttl: u64,

    /// 페이지 이동/대기 타임아웃(ms)
    #[arg(long, env = "BROWSER_TIMEOUT", default_value_t = 60_000)]
    pub browser_timeout: u64,

    #[arg(
        long,
        env = "BROWSER_HEADLESS",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub headless: bool,

    /// 유휴 상태에서 Chrome을 유지할 시간(초)
    #[arg(long, env = "BROWSER_IDLE_TIMEOUT", default_value_t = 3_600)]
    pub browser_idle_timeout: u64,

    /// 하루치 스크래핑 전체 상한(초)
    #[arg(long, env = "SCRAPE_TIMEOUT", default_value_t = 180)]
    pub scrape_timeout: u64,

    #[arg(long, env = "SCHEDULE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

/// 브라우저 엔진 설정
#[derive(Clone, Debug)]
pub struct BrowserConfig {
    pub headless: bool,
    pub timeout: Duration,
    pub idle_timeout: Duration,
}

impl Settings {
    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            headless: self.headless,
            timeout: Duration::from_millis(self.browser_timeout),
            idle_timeout: Duration::from_secs(self.browser_idle_timeout),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout)
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // 환경변수를 건드리는 테스트끼리 직렬화
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (k, v) in vars {
            unsafe { std::env::set_var(k, v) };
        }
        let out = f();
        for (k, _) in vars {
            unsafe { std::env::remove_var(k) };
        }
        out
    }

    #[test]
    fn defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::try_parse_from(["timetable_api"]).unwrap();
        let s = cli.settings;
        assert!(cli.command.is_none());
        assert_eq!(s.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(s.browser_config().timeout, Duration::from_millis(60_000));
        assert_eq!(s.scrape_timeout(), Duration::from_secs(180));
        assert!(s.headless);
    }

    #[test]
    fn numeric_bool_env_values() {
        let s = with_env(&[("DEBUG", "1"), ("BROWSER_HEADLESS", "0")], || {
            Cli::try_parse_from(["timetable_api"]).unwrap().settings
        });
        assert!(s.debug);
        assert!(!s.headless);

        let s = with_env(&[("DEBUG", "no"), ("BROWSER_HEADLESS", "yes")], || {
            Cli::try_parse_from(["timetable_api"]).unwrap().settings
        });
        assert!(!s.debug);
        assert!(s.headless);
    }

    #[test]
    fn debug_flag_without_value() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::try_parse_from(["timetable_api", "--debug", "--headless", "off"]).unwrap();
        assert!(cli.settings.debug);
        assert!(!cli.settings.headless);
    }

    #[test]
    fn listen_address_from_flags() {
        let cli = Cli::try_parse_from(["timetable_api", "--host", "127.0.0.1", "--port", "9000"]).unwrap();
        assert_eq!(cli.settings.addr().unwrap().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn fetch_subcommand() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let cli = Cli::try_parse_from([
            "timetable_api",
            "--headless",
            "false",
            "fetch",
            "--group",
            "БАСО-03-24",
            "--week",
        ])
        .unwrap();
        assert!(!cli.settings.headless);
        match cli.command {
            Some(Command::Fetch { group, date, week }) => {
                assert_eq!(group, "БАСО-03-24");
                assert_eq!(date, None);
                assert!(week);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
