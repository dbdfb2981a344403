// src/normalize.rs
//! 시간표 블록 제목 텍스트 → 기간 표시 / 수업 머리(시간, 유형, 과목)
//!
//! 모든 함수는 순수 함수이고 어떤 입력에도 실패하지 않음.
//! 파싱이 안 되면 표시 문자열(sentinel)로 떨어진다.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lesson::{NO_TIME, NOT_SPECIFIED, SESSION_PERIOD};

const WEEK_KEYWORD: &str = "неделя";
const SESSION_KEYWORD: &str = "сессия";

/// `H:MM - HH:MM 나머지` (대시 양옆 공백은 선택)
static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}:\d{2})\s*-\s*(\d{1,2}:\d{2})\s*(.+)").expect("time range pattern")
});

/// 블록 하나의 해석 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    /// 이후 수업들에 붙일 기간(주차/세션) 라벨
    Period(String),
    Lesson(LessonHead),
}

/// 제목 텍스트에서 얻을 수 있는 부분
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LessonHead {
    pub time: String,
    pub lesson_type: String,
    pub subject: String,
}

/// 시간 범위 매칭 시도 결과
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeSpan<'a> {
    /// `10:40 - 12:10 나머지`
    Range { start: &'a str, end: &'a str, rest: &'a str },
    /// 첫 토큰이 `-`를 포함 (`10:40-12:10 나머지`)
    Compact { range: &'a str, rest: &'a str },
    Unmatched,
}

pub fn parse_entry(text: &str) -> Entry {
    let text = text.trim();

    if is_marker(text, WEEK_KEYWORD) {
        return Entry::Period(text.to_string());
    }
    if is_marker(text, SESSION_KEYWORD) {
        return Entry::Period(SESSION_PERIOD.to_string());
    }

    let (time, subject_raw) = match match_time(text) {
        TimeSpan::Range { start, end, rest } => (format!("{start} - {end}"), rest.trim()),
        TimeSpan::Compact { range, rest } => (range.replace(' ', ""), rest.trim()),
        TimeSpan::Unmatched => (NO_TIME.to_string(), text),
    };

    let (lesson_type, subject) = split_subject(subject_raw);
    Entry::Lesson(LessonHead { time, lesson_type, subject })
}

/// 키워드 포함 + `:`/`-` 없음 → 기간 표시
fn is_marker(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(keyword) && !text.contains([':', '-'])
}

pub fn match_time(text: &str) -> TimeSpan<'_> {
    if let Some(caps) = TIME_RANGE.captures(text) {
        if let (Some(start), Some(end), Some(rest)) = (caps.get(1), caps.get(2), caps.get(3)) {
            return TimeSpan::Range {
                start: start.as_str(),
                end: end.as_str(),
                rest: rest.as_str(),
            };
        }
    }

    match text.split_once(char::is_whitespace) {
        Some((first, rest)) if first.contains('-') => TimeSpan::Compact { range: first, rest },
        _ => TimeSpan::Unmatched,
    }
}

/// `유형 | 과목` → (유형, 과목). 조각이 하나면 과목만.
pub fn split_subject(raw: &str) -> (String, String) {
    let mut lesson_type = NOT_SPECIFIED.to_string();
    let mut subject = raw;

    if raw.contains('|') {
        let parts: Vec<&str> = raw.split('|').map(str::trim).filter(|p| !p.is_empty()).collect();
        match parts.as_slice() {
            [kind, name, ..] => {
                lesson_type = (*kind).to_string();
                subject = name;
            }
            [name] => subject = name,
            [] => {}
        }
    }

    (lesson_type, subject.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(text: &str) -> LessonHead {
        match parse_entry(text) {
            Entry::Lesson(head) => head,
            Entry::Period(p) => panic!("expected lesson, got period {p:?}"),
        }
    }

    #[test]
    fn full_range_with_type_and_subject() {
        let head = lesson("10:40 - 12:10 Lecture | Algorithms");
        assert_eq!(head.time, "10:40 - 12:10");
        assert_eq!(head.lesson_type, "Lecture");
        assert_eq!(head.subject, "Algorithms");
    }

    #[test]
    fn range_without_spaces_around_dash() {
        let head = lesson("9:00-10:30 ПР | Физика");
        assert_eq!(head.time, "9:00 - 10:30");
        assert_eq!(head.lesson_type, "ПР");
        assert_eq!(head.subject, "Физика");
    }

    #[test]
    fn no_time_and_no_separator() {
        let head = lesson("  Военная подготовка  ");
        assert_eq!(head.time, NO_TIME);
        assert_eq!(head.lesson_type, NOT_SPECIFIED);
        assert_eq!(head.subject, "Военная подготовка");
    }

    #[test]
    fn compact_range_fallback() {
        // 분이 한 자리라 정규식은 실패, 첫 토큰에 '-' 있음
        let head = lesson("9:0-10:3 ЛК | История");
        assert_eq!(head.time, "9:0-10:3");
        assert_eq!(head.lesson_type, "ЛК");
        assert_eq!(head.subject, "История");
    }

    #[test]
    fn single_part_subject_keeps_default_type() {
        let head = lesson("10:40 - 12:10 | Английский язык |");
        assert_eq!(head.lesson_type, NOT_SPECIFIED);
        assert_eq!(head.subject, "Английский язык");
    }

    #[test]
    fn only_separators_leave_raw_subject() {
        let (kind, subject) = split_subject(" | ");
        assert_eq!(kind, NOT_SPECIFIED);
        assert_eq!(subject, "|");
    }

    #[test]
    fn time_without_subject_is_not_a_range() {
        let head = lesson("10:40 - 12:10");
        assert_eq!(head.time, NO_TIME);
        assert_eq!(head.subject, "10:40 - 12:10");
    }

    #[test]
    fn week_marker_is_period() {
        assert_eq!(parse_entry("5 неделя"), Entry::Period("5 неделя".into()));
        assert_eq!(parse_entry("Неделя 12"), Entry::Period("Неделя 12".into()));
    }

    #[test]
    fn session_marker_uses_fixed_label() {
        assert_eq!(parse_entry("Зимняя сессия"), Entry::Period(SESSION_PERIOD.into()));
    }

    #[test]
    fn marker_keyword_with_punctuation_is_a_lesson() {
        let head = lesson("10:40 - 12:10 ЛК | Неделя науки");
        assert_eq!(head.subject, "Неделя науки");
        assert!(matches!(parse_entry("сессия-консультация"), Entry::Lesson(_)));
    }

    #[test]
    fn match_time_is_tagged() {
        assert!(matches!(match_time("10:40 - 12:10 X"), TimeSpan::Range { .. }));
        assert!(matches!(match_time("a-b c"), TimeSpan::Compact { range: "a-b", rest: "c" }));
        assert_eq!(match_time("без времени"), TimeSpan::Unmatched);
        assert_eq!(match_time(""), TimeSpan::Unmatched);
    }
}
