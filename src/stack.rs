//! Comment stack anchored above the input field.
//!
//! Rows stay put until the feed evicts them, unless an exit animation is
//! configured, in which case each row fades out and removes itself. A user
//! submission nudges the whole stack up one row for [`NUDGE_DURATION`].

use std::time::{Duration, Instant};

use crate::data::Comment;
use crate::feed::Presenter;

pub const NUDGE_DURATION: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowId(u64);

#[derive(Debug, Clone)]
struct Row {
    id: RowId,
    comment: Comment,
    born: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct StackRow<'a> {
    pub comment: &'a Comment,
    pub opacity: f32,
}

#[derive(Debug)]
pub struct CommentStack {
    exit_animation: Duration,
    rows: Vec<Row>,
    next_id: u64,
    nudged_at: Option<Instant>,
}

impl CommentStack {
    pub fn new(exit_animation: Duration) -> Self {
        Self {
            exit_animation,
            rows: Vec::new(),
            next_id: 0,
            nudged_at: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn expired(&self, row: &Row, now: Instant) -> bool {
        !self.exit_animation.is_zero()
            && now.saturating_duration_since(row.born) >= self.exit_animation
    }

    /// Oldest first.
    pub fn rows(&self, now: Instant) -> Vec<StackRow<'_>> {
        self.rows
            .iter()
            .filter(|row| !self.expired(row, now))
            .map(|row| {
                let opacity = if self.exit_animation.is_zero() {
                    1.0
                } else {
                    let age = now.saturating_duration_since(row.born);
                    1.0 - age.as_secs_f32() / self.exit_animation.as_secs_f32()
                };
                StackRow {
                    comment: &row.comment,
                    opacity,
                }
            })
            .collect()
    }

    pub fn nudge(&mut self, now: Instant) {
        self.nudged_at = Some(now);
    }

    /// Rows to lift the stack by right now.
    pub fn nudge_offset(&self, now: Instant) -> u16 {
        match self.nudged_at {
            Some(at) if now.saturating_duration_since(at) < NUDGE_DURATION => 1,
            _ => 0,
        }
    }

    /// Expires faded rows and finished nudges. Returns whether anything is
    /// still moving.
    pub fn animate(&mut self, now: Instant) -> bool {
        if self.nudge_offset(now) == 0 {
            self.nudged_at = None;
        }
        if !self.exit_animation.is_zero() {
            let exit = self.exit_animation;
            self.rows
                .retain(|row| now.saturating_duration_since(row.born) < exit);
        }
        self.nudged_at.is_some() || (!self.exit_animation.is_zero() && !self.rows.is_empty())
    }
}

impl Presenter for CommentStack {
    type Handle = RowId;

    fn render(&mut self, item: &Comment, now: Instant) -> RowId {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(Row {
            id,
            comment: item.clone(),
            born: now,
        });
        id
    }

    fn dismiss(&mut self, handle: RowId) {
        self.rows.retain(|row| row.id != handle);
    }
}
