// src/lesson.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// 빈 값 대신 쓰는 표시 문자열 (캐시 JSON과 그대로 호환)
pub const NOT_SPECIFIED: &str = "Не указан";
pub const NO_TIME: &str = "Нет времени";
pub const NO_DATA: &str = "Нет данных";
pub const NO_GROUPS: &str = "Нет данных о группах";
pub const SESSION_PERIOD: &str = "Сессия";

/// 시간표 항목 하나 (필드 순서 = JSON 순서)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRecord {
    pub period: String,
    pub time: String,
    #[serde(rename = "type")]
    pub lesson_type: String,
    pub subject: String,
    pub room: String,
    pub teacher: String,
    pub groups: Vec<String>,
}

impl LessonRecord {
    /// 시작 시각(자정 기준 분), `H:MM - ...` 형식이 아니면 None
    pub fn start_minutes(&self) -> Option<u32> {
        start_minutes(&self.time)
    }
}

pub fn no_groups() -> Vec<String> {
    vec![NO_GROUPS.to_string()]
}

/// `"10:00 - 11:30"` → 600
/// 첫 `" - "` 앞부분만 보고, 정확히 `시:분` 두 조각이어야 함
pub fn start_minutes(time: &str) -> Option<u32> {
    let start = time.split(" - ").next()?;
    let (h, m) = start.split_once(':')?;
    if m.contains(':') {
        return None;
    }
    let h: u32 = h.trim().parse().ok()?;
    let m: u32 = m.trim().parse().ok()?;
    h.checked_mul(60)?.checked_add(m)
}

/// 시작 시각 기준 안정 정렬, 파싱 불가 시간은 맨 뒤
pub fn sort_by_start(lessons: &mut [LessonRecord]) {
    lessons.sort_by_key(|l| l.start_minutes().unwrap_or(u32::MAX));
}

/// `/schedule` 응답 본문
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub group: String,
    pub date: String,
    pub schedule: Vec<LessonRecord>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: String,
    pub schedule: Vec<LessonRecord>,
}

/// `/schedule/week` 응답 본문
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeekSchedule {
    pub group: String,
    pub week_start: String,
    pub schedules: Vec<DayEntry>,
}

impl fmt::Display for LessonRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} | {} | {} | {}",
            self.period, self.time, self.lesson_type, self.subject, self.room, self.teacher
        )?;
        if self.groups.len() > 1 || self.groups.first().map(String::as_str) != Some(NO_GROUPS) {
            write!(f, " | {}", self.groups.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(time: &str) -> LessonRecord {
        LessonRecord {
            period: NOT_SPECIFIED.into(),
            time: time.into(),
            lesson_type: NOT_SPECIFIED.into(),
            subject: "Математика".into(),
            room: NO_DATA.into(),
            teacher: NO_DATA.into(),
            groups: no_groups(),
        }
    }

    #[test]
    fn start_minutes_of_regular_range() {
        assert_eq!(start_minutes("10:40 - 12:10"), Some(640));
        assert_eq!(start_minutes("9:00 - 10:30"), Some(540));
    }

    #[test]
    fn start_minutes_rejects_sentinel_and_compact_range() {
        assert_eq!(start_minutes(NO_TIME), None);
        // " - " 구분자가 없어서 시작 부분에 콜론이 두 개
        assert_eq!(start_minutes("10:00-11:30"), None);
        assert_eq!(start_minutes("-"), None);
    }

    #[test]
    fn unparsable_times_sort_last() {
        let mut day = vec![lesson("10:00 - 11:30"), lesson(NO_TIME), lesson("09:00 - 10:00")];
        sort_by_start(&mut day);
        let order: Vec<_> = day.iter().map(|l| l.time.as_str()).collect();
        assert_eq!(order, ["09:00 - 10:00", "10:00 - 11:30", NO_TIME]);
    }

    #[test]
    fn sort_is_stable_for_equal_starts() {
        let mut a = lesson("09:00 - 10:30");
        a.subject = "A".into();
        let mut b = lesson("09:00 - 10:30");
        b.subject = "B".into();
        let mut day = vec![a, b];
        sort_by_start(&mut day);
        assert_eq!(day[0].subject, "A");
        assert_eq!(day[1].subject, "B");
    }

    #[test]
    fn type_field_serializes_as_type() {
        let json = serde_json::to_string(&lesson("09:00 - 10:30")).unwrap();
        assert!(json.contains(r#""type":"Не указан""#));
        assert!(json.starts_with(r#"{"period":"#));
    }
}
