// src/detail.rs
use std::time::Duration;

use anyhow::Result;
use headless_chrome::browser::tab::point::Point;
use headless_chrome::util::Wait;
use headless_chrome::{Element, Tab};

use crate::lesson::{NO_DATA, no_groups};
use crate::navigator::LessonNode;

const TEACHER_LABEL: &str = "Преподаватель:";
const GROUPS_LABEL: &str = "Группы:";
// TODO: 다른 학부 그룹도 받으려면 접두어를 설정으로 빼야 함 (지금은 БАСО만)
const GROUP_PREFIX: &str = "БАСО-";

const DIALOG_SELECTOR: &str = r#"div[role="dialog"]"#;
const HOVER_SETTLE: Duration = Duration::from_millis(300);
const DIALOG_TIMEOUT: Duration = Duration::from_secs(3);
const DIALOG_POLL: Duration = Duration::from_millis(100);
const IS_VISIBLE_JS: &str = "function() { return this.checkVisibility(); }";

/// 팝오버에서 얻는 교수/그룹 정보
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detail {
    pub teacher: String,
    pub groups: Vec<String>,
}

impl Default for Detail {
    fn default() -> Self {
        Self { teacher: NO_DATA.to_string(), groups: no_groups() }
    }
}

/// 노드의 팝오버를 열어 읽는다. 어떤 실패든 기본값(표시 문자열)으로 대체.
pub fn extract<N: LessonNode>(node: &N) -> Detail {
    match node.popover_text() {
        Ok(Some(text)) => parse_popover(&text),
        Ok(None) => {
            log::debug!("popover did not appear within {DIALOG_TIMEOUT:?}");
            Detail::default()
        }
        Err(e) => {
            log::warn!("popover interaction failed: {e:#}");
            Detail::default()
        }
    }
}

/// 팝오버 전체 텍스트 파싱
pub fn parse_popover(text: &str) -> Detail {
    let lines: Vec<&str> = text.trim().split('\n').collect();

    let teacher = lines
        .iter()
        .find(|l| l.contains(TEACHER_LABEL))
        .map(|l| l.replace(TEACHER_LABEL, "").trim().to_string())
        .unwrap_or_else(|| NO_DATA.to_string());

    let mut groups = Vec::new();
    let mut in_groups = false;
    for line in &lines {
        if line.contains(GROUPS_LABEL) {
            in_groups = true;
            continue;
        }
        if !in_groups {
            continue;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if line.contains(GROUP_PREFIX) {
            groups.push(line.to_string());
        }
    }
    if groups.is_empty() {
        groups = no_groups();
    }

    Detail { teacher, groups }
}

/// hover → 잠깐 대기 → 보이는 dialog 대기(최대 3초) → 텍스트.
/// dialog가 안 뜨면 `Ok(None)`. 어느 경로든 나갈 때 빈 곳을 클릭해서 닫는다.
pub fn read_popover(tab: &Tab, element: &Element<'_>) -> Result<Option<String>> {
    let _dismiss = Dismiss(tab);

    element.move_mouse_over()?;
    std::thread::sleep(HOVER_SETTLE);

    let found = Wait::new(DIALOG_TIMEOUT, DIALOG_POLL).until(|| {
        let dialogs = tab.find_elements(DIALOG_SELECTOR).ok()?;
        pick_visible(dialogs, is_visible)
    });
    match found {
        Ok(dialog) => Ok(Some(dialog.get_inner_text()?)),
        Err(_) => Ok(None),
    }
}

// DOM에 남아 있는 숨은/이전 dialog는 건너뜀
fn pick_visible<T>(candidates: Vec<T>, mut visible: impl FnMut(&T) -> bool) -> Option<T> {
    candidates.into_iter().find(|c| visible(c))
}

fn is_visible(element: &Element<'_>) -> bool {
    element
        .call_js_fn(IS_VISIBLE_JS, vec![], false)
        .ok()
        .and_then(|r| r.value)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

// 팝오버 닫기 (다음 노드 hover 방해 방지)
struct Dismiss<'a>(&'a Tab);

impl Drop for Dismiss<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.0.click_point(Point { x: 0.0, y: 0.0 }) {
            log::debug!("dismiss click failed: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lesson::NO_GROUPS;

    const POPOVER: &str = "\
Математический анализ
Лекция
Преподаватель: Иванов Иван Иванович
Аудитория: А-101 (В-78)
Группы:
БАСО-01-24
БАСО-02-24
ИКБО-01-24
БАСО-03-24

Подгруппа: 1
БАСО-99-99";

    #[test]
    fn parses_teacher_and_prefixed_groups() {
        let d = parse_popover(POPOVER);
        assert_eq!(d.teacher, "Иванов Иван Иванович");
        assert_eq!(d.groups, ["БАСО-01-24", "БАСО-02-24", "БАСО-03-24"]);
    }

    #[test]
    fn missing_sections_fall_back() {
        let d = parse_popover("Математический анализ\nЛекция");
        assert_eq!(d, Detail::default());
        assert_eq!(d.groups, [NO_GROUPS]);
    }

    #[test]
    fn groups_without_prefix_fall_back() {
        let d = parse_popover("Преподаватель:   Петров П.П.  \nГруппы:\nИКБО-01-24\n");
        assert_eq!(d.teacher, "Петров П.П.");
        assert_eq!(d.groups, [NO_GROUPS]);
    }

    #[test]
    fn empty_text_is_default() {
        assert_eq!(parse_popover(""), Detail::default());
    }

    #[test]
    fn hidden_dialogs_are_skipped() {
        let dialogs = vec![("stale", false), ("current", true), ("later", true)];
        let picked = pick_visible(dialogs, |d| d.1);
        assert_eq!(picked, Some(("current", true)));
    }

    #[test]
    fn no_visible_dialog_yet() {
        let dialogs = vec![("stale", false)];
        assert_eq!(pick_visible(dialogs, |d| d.1), None);
        assert_eq!(pick_visible(Vec::<(&str, bool)>::new(), |d| d.1), None);
    }

    #[test]
    fn first_teacher_line_wins() {
        let d = parse_popover("Преподаватель: A\nПреподаватель: B");
        assert_eq!(d.teacher, "A");
    }
}
