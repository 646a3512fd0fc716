use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use time::Time;

#[derive(Debug, Error)]
pub(crate) enum LessonsError {
    #[error("failed to read lessons")]
    Read(#[from] io::Error),

    #[error("line {line}: expected `HH:MM-HH:MM name`, got {raw:?}")]
    BadLine { line: usize, raw: String },

    #[error("line {line}: lesson must end after it starts")]
    EmptySpan { line: usize },
}

/// Один урок расписания
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Lesson {
    pub(crate) start: Time,
    pub(crate) end: Time,
    pub(crate) name: String,
}

impl Lesson {
    /// "08:00-08:45"
    pub(crate) fn span(&self) -> String {
        format!("{}-{}", hhmm(self.start), hhmm(self.end))
    }
}

/// Где мы в расписании на момент `now`
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LessonStatus<'a> {
    InProgress(&'a Lesson),
    Next(&'a Lesson),
    Over,
}

/// Расписание на день, отсортированное по началу урока
#[derive(Debug, Clone, Default)]
pub(crate) struct LessonSchedule {
    lessons: Vec<Lesson>,
}

impl LessonSchedule {
    /// Чтение расписания: `HH:MM-HH:MM Название` на строку,
    /// пустые строки и `#` комментарии пропускаются
    pub(crate) fn read<R: io::Read>(reader: R) -> Result<Self, LessonsError> {
        let mut lessons = Vec::new();

        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            if let Some(s) = normalize_line(&line) {
                lessons.push(parse_lesson(s, idx + 1)?);
            }
        }

        lessons.sort_by_key(|l| l.start);
        Ok(Self { lessons })
    }

    pub(crate) fn read_from_path(path: impl AsRef<Path>) -> Result<Self, LessonsError> {
        let f = File::open(path)?;
        Self::read(f)
    }

    pub(crate) fn len(&self) -> usize {
        self.lessons.len()
    }

    pub(crate) fn at(&self, now: Time) -> LessonStatus<'_> {
        if let Some(l) = self.lessons.iter().find(|l| l.start <= now && now < l.end) {
            return LessonStatus::InProgress(l);
        }
        match self.lessons.iter().find(|l| l.start > now) {
            Some(l) => LessonStatus::Next(l),
            None => LessonStatus::Over,
        }
    }
}

pub(crate) fn hhmm(t: Time) -> String {
    format!("{:02}:{:02}", t.hour(), t.minute())
}

fn normalize_line(line: &str) -> Option<&str> {
    // Поддержка inline-комментариев: "08:00-08:45 Math # room 12"
    let s = line.split('#').next().unwrap_or("").trim();
    if s.is_empty() {
        return None;
    }
    Some(s)
}

fn parse_lesson(s: &str, line: usize) -> Result<Lesson, LessonsError> {
    let bad = || LessonsError::BadLine {
        line,
        raw: s.to_string(),
    };

    let (span, name) = s.split_once(char::is_whitespace).ok_or_else(bad)?;
    let name = name.trim();
    let (start, end) = span.split_once('-').ok_or_else(bad)?;
    let start = parse_hhmm(start).ok_or_else(bad)?;
    let end = parse_hhmm(end).ok_or_else(bad)?;

    if name.is_empty() {
        return Err(bad());
    }
    if end <= start {
        return Err(LessonsError::EmptySpan { line });
    }

    Ok(Lesson {
        start,
        end,
        name: name.to_string(),
    })
}

fn parse_hhmm(raw: &str) -> Option<Time> {
    let (h, m) = raw.split_once(':')?;
    let h: u8 = h.parse().ok()?;
    let m: u8 = m.parse().ok()?;
    Time::from_hms(h, m, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use time::macros::time;

    fn schedule(text: &str) -> LessonSchedule {
        LessonSchedule::read(Cursor::new(text)).unwrap()
    }

    #[test]
    fn reads_sorts_and_skips_comments() {
        let s = schedule(
            "\
# morning
10:00-10:45 Physics
08:00-08:45 Mathematics   # room 12

   08:55-09:40   Literature and Poetry
",
        );
        let names: Vec<_> = s.lessons.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Mathematics", "Literature and Poetry", "Physics"]);
        assert_eq!(s.lessons[0].span(), "08:00-08:45");
    }

    #[test]
    fn rejects_malformed_lines_with_line_number() {
        let err = LessonSchedule::read(Cursor::new("08:00-08:45 Math\n8am Physics\n")).unwrap_err();
        assert!(matches!(err, LessonsError::BadLine { line: 2, .. }), "{err}");

        let err = LessonSchedule::read(Cursor::new("08:00-08:45\n")).unwrap_err();
        assert!(matches!(err, LessonsError::BadLine { line: 1, .. }), "{err}");

        let err = LessonSchedule::read(Cursor::new("25:00-26:00 Night\n")).unwrap_err();
        assert!(matches!(err, LessonsError::BadLine { line: 1, .. }), "{err}");
    }

    #[test]
    fn rejects_lessons_ending_before_start() {
        let err = LessonSchedule::read(Cursor::new("09:00-08:00 Backwards\n")).unwrap_err();
        assert!(matches!(err, LessonsError::EmptySpan { line: 1 }));
    }

    #[test]
    fn status_at_various_times() {
        let s = schedule("08:00-08:45 Math\n09:00-09:45 Physics\n");

        assert_eq!(s.at(time!(7:30)), LessonStatus::Next(&s.lessons[0]));
        assert_eq!(s.at(time!(8:00)), LessonStatus::InProgress(&s.lessons[0]));
        assert_eq!(s.at(time!(8:45)), LessonStatus::Next(&s.lessons[1]));
        assert_eq!(s.at(time!(9:44)), LessonStatus::InProgress(&s.lessons[1]));
        assert_eq!(s.at(time!(10:00)), LessonStatus::Over);
    }

    #[test]
    fn empty_schedule_is_always_over() {
        let s = schedule("# nothing\n");
        assert_eq!(s.len(), 0);
        assert_eq!(s.at(time!(12:00)), LessonStatus::Over);
    }

    #[test]
    fn read_from_path_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "13:05-13:50 English").unwrap();
        writeln!(f, "12:10-12:55 Chemistry").unwrap();

        let s = LessonSchedule::read_from_path(f.path()).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.lessons[0].name, "Chemistry");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LessonSchedule::read_from_path(dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, LessonsError::Read(_)));
    }
}
