//! Floating comment bubbles drawn over the video surface.
//!
//! Each rendered comment starts just above the overlay, slides in during
//! [`ENTER_DURATION`], then drifts down across the overlay while fading out
//! over the configured exit animation. Finished bubbles are dropped by
//! [`FloatingOverlay::animate`].

use std::time::{Duration, Instant};

use crate::data::Comment;
use crate::feed::Presenter;

pub const ENTER_DURATION: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BubbleId(u64);

#[derive(Debug, Clone)]
struct Bubble {
    id: BubbleId,
    comment: Comment,
    born: Instant,
}

/// Animation progress, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Entering(f32),
    Leaving(f32),
}

#[derive(Debug, Clone, Copy)]
pub struct BubbleFrame<'a> {
    pub id: BubbleId,
    pub comment: &'a Comment,
    pub phase: Phase,
}

impl BubbleFrame<'_> {
    pub fn opacity(&self) -> f32 {
        match self.phase {
            Phase::Entering(_) => 1.0,
            Phase::Leaving(progress) => 1.0 - progress,
        }
    }

    /// Row inside an overlay of `height` rows, or `None` while the bubble is
    /// still above it.
    pub fn row(&self, height: u16) -> Option<u16> {
        if height == 0 {
            return None;
        }
        match self.phase {
            Phase::Entering(progress) => (progress >= 0.5).then_some(0),
            Phase::Leaving(progress) => {
                let last = f32::from(height - 1);
                Some((last * progress).round() as u16)
            }
        }
    }
}

#[derive(Debug)]
pub struct FloatingOverlay {
    exit_animation: Duration,
    bubbles: Vec<Bubble>,
    next_id: u64,
}

impl FloatingOverlay {
    pub fn new(exit_animation: Duration) -> Self {
        Self {
            exit_animation,
            bubbles: Vec::new(),
            next_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.bubbles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bubbles.is_empty()
    }

    fn lifetime(&self) -> Duration {
        ENTER_DURATION.saturating_add(self.exit_animation)
    }

    fn phase(&self, age: Duration) -> Option<Phase> {
        if age < ENTER_DURATION {
            return Some(Phase::Entering(
                age.as_secs_f32() / ENTER_DURATION.as_secs_f32(),
            ));
        }
        if age >= self.lifetime() {
            return None;
        }
        let leaving = age - ENTER_DURATION;
        Some(Phase::Leaving(
            leaving.as_secs_f32() / self.exit_animation.as_secs_f32(),
        ))
    }

    /// Drops bubbles whose animation has finished. Returns how many were
    /// removed.
    pub fn animate(&mut self, now: Instant) -> usize {
        let lifetime = self.lifetime();
        let before = self.bubbles.len();
        self.bubbles
            .retain(|bubble| now.saturating_duration_since(bubble.born) < lifetime);
        before - self.bubbles.len()
    }

    /// Oldest first.
    pub fn frames(&self, now: Instant) -> Vec<BubbleFrame<'_>> {
        self.bubbles
            .iter()
            .filter_map(|bubble| {
                let age = now.saturating_duration_since(bubble.born);
                self.phase(age).map(|phase| BubbleFrame {
                    id: bubble.id,
                    comment: &bubble.comment,
                    phase,
                })
            })
            .collect()
    }
}

impl Presenter for FloatingOverlay {
    type Handle = BubbleId;

    fn render(&mut self, item: &Comment, now: Instant) -> BubbleId {
        let id = BubbleId(self.next_id);
        self.next_id += 1;
        self.bubbles.push(Bubble {
            id,
            comment: item.clone(),
            born: now,
        });
        id
    }

    fn dismiss(&mut self, handle: BubbleId) {
        self.bubbles.retain(|bubble| bubble.id != handle);
    }
}
