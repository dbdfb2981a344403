// src/assemble.rs
use crate::detail;
use crate::lesson::{LessonRecord, NO_DATA, NOT_SPECIFIED, sort_by_start};
use crate::navigator::LessonNode;
use crate::normalize::{Entry, parse_entry};

/// DOM 순서대로 노드를 처리해서 하루 시간표를 만든다.
///
/// 기간 표시 노드는 이후 수업들의 `period`만 바꾸고 기록을 남기지 않는다.
/// 팝오버 실패는 해당 수업의 교수/그룹만 기본값으로 둔다.
pub fn assemble<N: LessonNode>(nodes: &[N]) -> Vec<LessonRecord> {
    let mut period = NOT_SPECIFIED.to_string();
    let mut lessons = Vec::with_capacity(nodes.len());

    for node in nodes {
        let title = node.title_text().unwrap_or_else(|| NO_DATA.to_string());
        let head = match parse_entry(&title) {
            Entry::Period(p) => {
                period = p;
                continue;
            }
            Entry::Lesson(head) => head,
        };

        let room = node.room_text().unwrap_or_else(|| NO_DATA.to_string());
        let detail = detail::extract(node);

        lessons.push(LessonRecord {
            period: period.clone(),
            time: head.time,
            lesson_type: head.lesson_type,
            subject: head.subject,
            room,
            teacher: detail.teacher,
            groups: detail.groups,
        });
    }

    sort_by_start(&mut lessons);
    lessons
}
