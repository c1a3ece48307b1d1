//! crates/omniread_core/src/progress.rs
//!
//! Partial-update semantics for the per-(user, book) reading cursor.

use crate::domain::{ChapterMark, ReadingProgress};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One progress-sync payload. Every field is optional and independently
/// updatable; omitted fields leave the stored record untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressUpdate {
    pub current_page: Option<u32>,
    pub current_chapter_index: Option<u32>,
    pub percent_complete: Option<f64>,
    /// Sub-progress for the chapter named by `current_chapter_index`.
    /// Ignored unless that index is also present in the same payload.
    pub chapter_percent: Option<f64>,
}

impl ProgressUpdate {
    /// Percent fields must stay within [0, 100].
    pub fn validate(&self) -> Result<(), String> {
        let percents = [
            ("percentComplete", self.percent_complete),
            ("chapterPercent", self.chapter_percent),
        ];
        for (name, value) in percents {
            if let Some(percent) = value {
                if !(0.0..=100.0).contains(&percent) {
                    return Err(format!("{name} must be between 0 and 100"));
                }
            }
        }
        Ok(())
    }
}

impl ReadingProgress {
    /// A fresh record for a pair that has never synced before.
    pub fn new(user_id: Uuid, book_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            book_id,
            current_chapter_index: 0,
            current_page: 1,
            percent_complete: 0.0,
            chapter_progress: Vec::new(),
            last_read: now,
        }
    }

    /// Merges one sync payload into the record. `last_read` moves on every
    /// call, even when the payload changes nothing else.
    pub fn apply(&mut self, update: &ProgressUpdate, now: DateTime<Utc>) {
        if let Some(page) = update.current_page {
            self.current_page = page;
        }
        if let Some(index) = update.current_chapter_index {
            self.current_chapter_index = index;
        }
        if let Some(percent) = update.percent_complete {
            self.percent_complete = percent;
        }
        if let (Some(percent), Some(index)) = (update.chapter_percent, update.current_chapter_index)
        {
            upsert_chapter_mark(&mut self.chapter_progress, index, percent);
        }
        self.last_read = now;
    }
}

/// Updates the entry for `chapter_index` in place, or appends one. The list
/// never holds two entries for the same index.
pub fn upsert_chapter_mark(marks: &mut Vec<ChapterMark>, chapter_index: u32, percent: f64) {
    match marks.iter_mut().find(|mark| mark.chapter_index == chapter_index) {
        Some(mark) => mark.percent = percent,
        None => marks.push(ChapterMark {
            chapter_index,
            percent,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn fresh() -> ReadingProgress {
        ReadingProgress::new(Uuid::new_v4(), Uuid::new_v4(), at(0))
    }

    #[test]
    fn new_record_has_documented_defaults() {
        let progress = fresh();
        assert_eq!(progress.current_chapter_index, 0);
        assert_eq!(progress.current_page, 1);
        assert_eq!(progress.percent_complete, 0.0);
        assert!(progress.chapter_progress.is_empty());
    }

    #[test]
    fn partial_update_preserves_unspecified_fields() {
        let mut progress = fresh();
        progress.apply(
            &ProgressUpdate {
                percent_complete: Some(40.0),
                ..Default::default()
            },
            at(1),
        );
        progress.apply(
            &ProgressUpdate {
                current_page: Some(5),
                ..Default::default()
            },
            at(2),
        );

        assert_eq!(progress.current_page, 5);
        assert_eq!(progress.percent_complete, 40.0);
    }

    #[test]
    fn repeated_identical_updates_leave_record_unchanged() {
        let update = ProgressUpdate {
            current_page: Some(12),
            current_chapter_index: Some(2),
            percent_complete: Some(61.5),
            chapter_percent: Some(30.0),
        };

        let mut progress = fresh();
        progress.apply(&update, at(1));
        let first = progress.clone();
        progress.apply(&update, at(2));

        // last_read moves on every write; everything else must not.
        assert_eq!(progress.current_page, first.current_page);
        assert_eq!(progress.current_chapter_index, first.current_chapter_index);
        assert_eq!(progress.percent_complete, first.percent_complete);
        assert_eq!(progress.chapter_progress, first.chapter_progress);
        assert!(progress.last_read > first.last_read);
    }

    #[test]
    fn chapter_marks_have_at_most_one_entry_per_index() {
        let mut progress = fresh();
        for percent in [10.0, 55.0, 90.0] {
            progress.apply(
                &ProgressUpdate {
                    current_chapter_index: Some(3),
                    chapter_percent: Some(percent),
                    ..Default::default()
                },
                at(1),
            );
        }

        assert_eq!(progress.chapter_progress.len(), 1);
        assert_eq!(progress.chapter_progress[0].chapter_index, 3);
        assert_eq!(progress.chapter_progress[0].percent, 90.0);
    }

    #[test]
    fn chapter_percent_without_index_is_ignored() {
        let mut progress = fresh();
        progress.apply(
            &ProgressUpdate {
                chapter_percent: Some(50.0),
                ..Default::default()
            },
            at(1),
        );
        assert!(progress.chapter_progress.is_empty());
    }

    #[test]
    fn validate_rejects_out_of_range_percent() {
        let update = ProgressUpdate {
            percent_complete: Some(101.0),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let update = ProgressUpdate {
            chapter_percent: Some(-0.1),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        assert!(ProgressUpdate::default().validate().is_ok());
    }
}
