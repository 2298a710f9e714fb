//! Timed, bounded comment feed.
//!
//! A [`Feed`] pulls comments out of a [`CommentSource`] on a fixed interval
//! and pushes them into a [`DisplayWindow`], which keeps at most `capacity`
//! items on screen and hands rendering off to a [`Presenter`]. Time is never
//! read here: callers pass `now` into every operation, so the whole feed can
//! be driven deterministically.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::data::Comment;

pub const DEFAULT_CAPACITY: usize = 3;
pub const MAX_CAPACITY: usize = 1024;
/// Upper bound for the interval and the exit animation.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// What a source does once it has handed out its last comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Start over from the first comment.
    #[default]
    Cyclic,
    /// Report the end of the sequence; the feed goes idle.
    Finite,
}

impl LoopMode {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "cyclic" | "loop" => Some(Self::Cyclic),
            "finite" | "once" => Some(Self::Finite),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("feed capacity must be at least 1")]
    ZeroCapacity,
    #[error("feed interval must be greater than zero")]
    ZeroInterval,
    #[error("feed capacity {0} exceeds the maximum of 1024")]
    CapacityTooLarge(usize),
    #[error("feed interval {0:?} exceeds the maximum of one day")]
    IntervalTooLong(Duration),
    #[error("exit animation {0:?} exceeds the maximum of one day")]
    ExitAnimationTooLong(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub interval: Duration,
    pub exit_animation: Duration,
    pub capacity: usize,
    pub loop_mode: LoopMode,
}

impl Settings {
    pub fn validate(self) -> Result<Self, SettingsError> {
        if self.capacity == 0 {
            return Err(SettingsError::ZeroCapacity);
        }
        if self.capacity > MAX_CAPACITY {
            return Err(SettingsError::CapacityTooLarge(self.capacity));
        }
        if self.interval.is_zero() {
            return Err(SettingsError::ZeroInterval);
        }
        if self.interval > MAX_DURATION {
            return Err(SettingsError::IntervalTooLong(self.interval));
        }
        if self.exit_animation > MAX_DURATION {
            return Err(SettingsError::ExitAnimationTooLong(self.exit_animation));
        }
        Ok(self)
    }
}

/// Renders comments for a feed.
///
/// `render` shows a comment and returns a handle to it; the visual is free to
/// animate out and disappear on its own. `dismiss` removes a visual at once.
/// Dismissing a handle whose visual already finished must be a no-op.
pub trait Presenter {
    type Handle: Copy + Eq + fmt::Debug;

    fn render(&mut self, item: &Comment, now: Instant) -> Self::Handle;
    fn dismiss(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Default)]
pub struct CommentSource {
    items: Vec<Comment>,
    cursor: usize,
    mode: LoopMode,
}

impl CommentSource {
    pub fn new(items: Vec<Comment>, mode: LoopMode) -> Self {
        Self {
            items,
            cursor: 0,
            mode,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn items(&self) -> &[Comment] {
        &self.items
    }

    /// Index of the comment the next call to [`next`](Self::next) returns.
    pub fn current_index(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        match self.mode {
            LoopMode::Cyclic => self.items.is_empty(),
            LoopMode::Finite => self.cursor >= self.items.len(),
        }
    }

    /// Returns the next comment, or `None` at the end of a finite sequence
    /// (and always for an empty source).
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Comment> {
        let item = self.items.get(self.cursor)?.clone();
        self.cursor += 1;
        if self.mode == LoopMode::Cyclic && self.cursor == self.items.len() {
            self.cursor = 0;
        }
        Some(item)
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn replace(&mut self, items: Vec<Comment>) {
        self.items = items;
        self.cursor = 0;
    }
}

/// FIFO window of on-screen comments together with their presenter handles.
#[derive(Debug)]
pub struct DisplayWindow<H> {
    entries: VecDeque<(Comment, H)>,
    capacity: usize,
}

impl<H: Copy + Eq + fmt::Debug> DisplayWindow<H> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(MAX_CAPACITY) + 1),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn items(&self) -> impl Iterator<Item = &Comment> + '_ {
        self.entries.iter().map(|(item, _)| item)
    }

    /// Appends `item`, evicting the oldest entries first when full.
    pub fn push<P>(&mut self, item: Comment, presenter: &mut P, now: Instant)
    where
        P: Presenter<Handle = H>,
    {
        while self.entries.len() >= self.capacity {
            let Some((evicted, handle)) = self.entries.pop_front() else {
                break;
            };
            trace!(username = %evicted.username, ?handle, "evicting comment");
            presenter.dismiss(handle);
        }
        let handle = presenter.render(&item, now);
        trace!(username = %item.username, ?handle, "rendered comment");
        self.entries.push_back((item, handle));
    }

    pub fn clear<P>(&mut self, presenter: &mut P)
    where
        P: Presenter<Handle = H>,
    {
        for (_, handle) in self.entries.drain(..) {
            presenter.dismiss(handle);
        }
    }

    /// Clears the window and shows the tail of `items`. Items that would be
    /// evicted straight away are never rendered.
    pub fn replace_all<P>(&mut self, items: &[Comment], presenter: &mut P, now: Instant)
    where
        P: Presenter<Handle = H>,
    {
        self.clear(presenter);
        let skip = items.len().saturating_sub(self.capacity);
        for item in &items[skip..] {
            self.push(item.clone(), presenter, now);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Running { next_tick: Instant },
}

/// A comment source, a display window and the timer driving one into the
/// other.
pub struct Feed<P: Presenter> {
    name: &'static str,
    settings: Settings,
    source: CommentSource,
    window: DisplayWindow<P::Handle>,
    state: State,
    presenter: P,
}

impl<P: Presenter> Feed<P> {
    pub fn new(name: &'static str, settings: Settings, presenter: P) -> Self {
        Self {
            name,
            settings,
            source: CommentSource::new(Vec::new(), settings.loop_mode),
            window: DisplayWindow::new(settings.capacity),
            state: State::Idle,
            presenter,
        }
    }

    pub fn source(&self) -> &CommentSource {
        &self.source
    }

    pub fn window(&self) -> &DisplayWindow<P::Handle> {
        &self.window
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn next_due(&self) -> Option<Instant> {
        match self.state {
            State::Running { next_tick } => Some(next_tick),
            State::Idle => None,
        }
    }

    /// Swaps the comment list the timer reads from and rewinds it. Visible
    /// comments stay where they are.
    pub fn set_source(&mut self, items: Vec<Comment>) {
        debug!(feed = self.name, count = items.len(), "comment source replaced");
        self.source.replace(items);
    }

    /// Replaces everything on screen with the tail of `items`.
    pub fn replace_all(&mut self, items: &[Comment], now: Instant) {
        self.window.replace_all(items, &mut self.presenter, now);
    }

    /// Starts the timer with the first tick due immediately.
    pub fn start(&mut self, now: Instant) {
        self.start_at(now);
    }

    /// Starts the timer with the first tick due at `first_tick`. An empty or
    /// exhausted source leaves the feed idle until [`set_source`] rewinds it;
    /// a running feed keeps its schedule.
    ///
    /// [`set_source`]: Self::set_source
    pub fn start_at(&mut self, first_tick: Instant) {
        if self.is_running() {
            return;
        }
        if self.source.is_exhausted() {
            debug!(feed = self.name, "comment source empty or exhausted; staying idle");
            return;
        }
        debug!(
            feed = self.name,
            interval = ?self.settings.interval,
            mode = ?self.source.mode(),
            "feed started"
        );
        self.state = State::Running {
            next_tick: first_tick,
        };
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            debug!(feed = self.name, "feed stopped");
        }
        self.state = State::Idle;
    }

    /// Stops the timer and removes every visible comment.
    pub fn dispose(&mut self) {
        self.stop();
        self.window.clear(&mut self.presenter);
    }

    /// Fires the pending tick if it is due. Returns whether a comment was
    /// pushed.
    pub fn advance(&mut self, now: Instant) -> bool {
        let due = matches!(self.state, State::Running { next_tick } if next_tick <= now);
        due && self.tick(now)
    }

    /// Pulls the next comment and pushes it, regardless of the deadline.
    /// Does nothing while idle.
    pub fn tick(&mut self, now: Instant) -> bool {
        let State::Running { next_tick: scheduled } = self.state else {
            return false;
        };

        let Some(item) = self.source.next() else {
            debug!(feed = self.name, "comment source exhausted");
            self.state = State::Idle;
            return false;
        };

        self.window.push(item, &mut self.presenter, now);

        let interval = self.settings.interval;
        // Fell more than one interval behind: skip rather than burst.
        let next_tick = Some(scheduled)
            .filter(|scheduled| *scheduled <= now)
            .and_then(|scheduled| scheduled.checked_add(interval))
            .filter(|next| *next > now)
            .or_else(|| now.checked_add(interval));
        self.state = match next_tick {
            Some(next_tick) => State::Running { next_tick },
            None => {
                debug!(feed = self.name, "next tick out of range; going idle");
                State::Idle
            }
        };
        true
    }

    /// Pushes a user-submitted comment straight away. The timer keeps its
    /// schedule.
    pub fn submit(&mut self, item: Comment, now: Instant) {
        debug!(feed = self.name, username = %item.username, "comment submitted");
        self.window.push(item, &mut self.presenter, now);
    }
}

impl<P: Presenter> fmt::Debug for Feed<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("cursor", &self.source.current_index())
            .field("visible", &self.window.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Render(String, usize),
        Dismiss(usize),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
        next: usize,
    }

    impl Recorder {
        fn renders(&self) -> Vec<&str> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Render(text, _) => Some(text.as_str()),
                    Call::Dismiss(_) => None,
                })
                .collect()
        }
    }

    impl Presenter for Recorder {
        type Handle = usize;

        fn render(&mut self, item: &Comment, _now: Instant) -> usize {
            let id = self.next;
            self.next += 1;
            self.calls.push(Call::Render(item.text.clone(), id));
            id
        }

        fn dismiss(&mut self, handle: usize) {
            self.calls.push(Call::Dismiss(handle));
        }
    }

    fn comment(text: &str) -> Comment {
        Comment {
            username: format!("user_{text}"),
            avatar: String::new(),
            text: text.to_string(),
        }
    }

    fn comments(texts: &[&str]) -> Vec<Comment> {
        texts.iter().map(|text| comment(text)).collect()
    }

    fn settings(mode: LoopMode) -> Settings {
        Settings {
            interval: Duration::from_secs(3),
            exit_animation: Duration::ZERO,
            capacity: DEFAULT_CAPACITY,
            loop_mode: mode,
        }
    }

    fn visible(feed: &Feed<Recorder>) -> Vec<String> {
        feed.window().items().map(|item| item.text.clone()).collect()
    }

    #[test]
    fn cyclic_source_wraps_to_first_item() {
        let mut source = CommentSource::new(comments(&["a", "b", "c"]), LoopMode::Cyclic);
        let len = source.len();
        for k in 1..=3 {
            for _ in 0..len {
                assert!(source.next().is_some());
            }
            assert_eq!(source.current_index(), 0, "after {} full cycles", k);
        }
    }

    #[test]
    fn finite_source_reports_end() {
        let mut source = CommentSource::new(comments(&["a", "b"]), LoopMode::Finite);
        assert_eq!(source.next().map(|c| c.text), Some("a".to_string()));
        assert_eq!(source.next().map(|c| c.text), Some("b".to_string()));
        assert!(source.is_exhausted());
        assert!(source.next().is_none());
        source.rewind();
        assert_eq!(source.next().map(|c| c.text), Some("a".to_string()));
    }

    #[test]
    fn empty_source_never_yields() {
        let mut cyclic = CommentSource::new(Vec::new(), LoopMode::Cyclic);
        assert!(cyclic.next().is_none());
        assert!(cyclic.is_exhausted());
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut presenter = Recorder::default();
        let mut window = DisplayWindow::new(3);
        let now = Instant::now();
        for i in 0..20 {
            window.push(comment(&i.to_string()), &mut presenter, now);
            assert!(window.len() <= 3);
        }
        let held: Vec<_> = window.items().map(|c| c.text.as_str()).collect();
        assert_eq!(held, vec!["17", "18", "19"]);
    }

    #[test]
    fn fourth_push_evicts_oldest_before_render() {
        let mut presenter = Recorder::default();
        let mut window = DisplayWindow::new(3);
        let now = Instant::now();
        for text in ["a", "b", "c", "d"] {
            window.push(comment(text), &mut presenter, now);
        }
        assert_eq!(
            &presenter.calls[3..],
            &[Call::Dismiss(0), Call::Render("d".into(), 3)]
        );
        let held: Vec<_> = window.items().map(|c| c.text.as_str()).collect();
        assert_eq!(held, vec!["b", "c", "d"]);
    }

    #[test]
    fn replace_all_renders_only_the_tail() {
        let mut presenter = Recorder::default();
        let mut window = DisplayWindow::new(3);
        let now = Instant::now();
        window.push(comment("old"), &mut presenter, now);
        window.replace_all(&comments(&["a", "b", "c", "d", "e"]), &mut presenter, now);

        assert_eq!(presenter.calls[1], Call::Dismiss(0));
        assert_eq!(presenter.renders(), vec!["old", "c", "d", "e"]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn clear_dismisses_everything() {
        let mut presenter = Recorder::default();
        let mut window = DisplayWindow::new(3);
        let now = Instant::now();
        window.push(comment("a"), &mut presenter, now);
        window.push(comment("b"), &mut presenter, now);
        window.clear(&mut presenter);
        assert!(window.is_empty());
        assert_eq!(
            &presenter.calls[2..],
            &[Call::Dismiss(0), Call::Dismiss(1)]
        );
    }

    #[test]
    fn cyclic_feed_five_ticks() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B", "C"]));
        let start = Instant::now();
        feed.start(start);
        for i in 0..5 {
            assert!(feed.advance(start + Duration::from_secs(3 * i)));
        }
        assert_eq!(feed.presenter().renders(), vec!["A", "B", "C", "A", "B"]);
        assert_eq!(visible(&feed), vec!["C", "A", "B"]);
        assert!(feed.is_running());
    }

    #[test]
    fn finite_feed_goes_idle_when_exhausted() {
        let mut feed = Feed::new("test", settings(LoopMode::Finite), Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        assert!(feed.advance(start));
        assert!(feed.advance(start + Duration::from_secs(3)));
        assert!(!feed.advance(start + Duration::from_secs(6)));
        assert_eq!(feed.state(), State::Idle);
        assert_eq!(feed.presenter().renders(), vec!["A", "B"]);
    }

    #[test]
    fn start_with_empty_source_is_noop() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        let start = Instant::now();
        feed.start(start);
        assert_eq!(feed.state(), State::Idle);
        assert!(!feed.advance(start + Duration::from_secs(60)));
        assert!(feed.presenter().calls.is_empty());
    }

    #[test]
    fn advance_waits_for_interval() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        assert!(feed.advance(start));
        assert!(!feed.advance(start + Duration::from_millis(2999)));
        assert_eq!(feed.next_due(), Some(start + Duration::from_secs(3)));
        assert!(feed.advance(start + Duration::from_secs(3)));
    }

    #[test]
    fn stop_cancels_pending_tick() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        feed.advance(start);
        feed.stop();
        assert!(!feed.advance(start + Duration::from_secs(3)));
        assert!(!feed.tick(start + Duration::from_secs(3)));
        assert_eq!(feed.presenter().renders(), vec!["A"]);
        assert_eq!(feed.next_due(), None);
    }

    #[test]
    fn late_feed_does_not_burst() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B", "C"]));
        let start = Instant::now();
        feed.start(start);
        let late = start + Duration::from_secs(30);
        assert!(feed.advance(late));
        assert!(!feed.advance(late));
        assert_eq!(feed.next_due(), Some(late + Duration::from_secs(3)));
    }

    #[test]
    fn submission_and_due_tick_in_same_instant() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        feed.submit(comment("hello"), start);
        assert!(feed.advance(start));
        assert_eq!(feed.presenter().renders(), vec!["hello", "A"]);
        assert_eq!(visible(&feed), vec!["hello", "A"]);
        assert!(!feed.advance(start));
    }

    #[test]
    fn start_at_defers_first_tick() {
        let mut feed = Feed::new("test", settings(LoopMode::Finite), Recorder::default());
        feed.set_source(comments(&["A"]));
        let start = Instant::now();
        feed.start_at(start + Duration::from_secs(3));
        assert!(!feed.advance(start));
        assert!(feed.advance(start + Duration::from_secs(3)));
    }

    #[test]
    fn dispose_stops_and_clears() {
        let mut feed = Feed::new("test", settings(LoopMode::Cyclic), Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        feed.advance(start);
        feed.dispose();
        assert!(!feed.is_running());
        assert!(feed.window().is_empty());
        assert_eq!(feed.presenter().calls.last(), Some(&Call::Dismiss(0)));
    }

    #[test]
    fn settings_validation() {
        let mut bad = settings(LoopMode::Cyclic);
        bad.capacity = 0;
        assert_eq!(bad.validate(), Err(SettingsError::ZeroCapacity));
        let mut bad = settings(LoopMode::Cyclic);
        bad.interval = Duration::ZERO;
        assert_eq!(bad.validate(), Err(SettingsError::ZeroInterval));
        assert!(settings(LoopMode::Finite).validate().is_ok());
    }

    #[test]
    fn settings_reject_out_of_range_values() {
        let mut bad = settings(LoopMode::Cyclic);
        bad.capacity = usize::MAX;
        assert_eq!(
            bad.validate(),
            Err(SettingsError::CapacityTooLarge(usize::MAX))
        );
        let mut bad = settings(LoopMode::Cyclic);
        bad.interval = Duration::from_secs(u64::MAX);
        assert_eq!(
            bad.validate(),
            Err(SettingsError::IntervalTooLong(Duration::from_secs(u64::MAX)))
        );
        let mut bad = settings(LoopMode::Cyclic);
        bad.exit_animation = MAX_DURATION + Duration::from_secs(1);
        assert!(matches!(
            bad.validate(),
            Err(SettingsError::ExitAnimationTooLong(_))
        ));
        let mut edge = settings(LoopMode::Cyclic);
        edge.capacity = MAX_CAPACITY;
        edge.interval = MAX_DURATION;
        edge.exit_animation = MAX_DURATION;
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn huge_capacity_window_does_not_overflow() {
        let mut window = DisplayWindow::<usize>::new(usize::MAX);
        let mut recorder = Recorder::default();
        window.push(comment("A"), &mut recorder, Instant::now());
        assert_eq!(window.capacity(), usize::MAX);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn unrepresentable_next_tick_goes_idle() {
        let mut unchecked = settings(LoopMode::Cyclic);
        unchecked.interval = Duration::from_secs(u64::MAX);
        let mut feed = Feed::new("test", unchecked, Recorder::default());
        feed.set_source(comments(&["A", "B"]));
        let start = Instant::now();
        feed.start(start);
        assert!(feed.advance(start));
        assert_eq!(feed.state(), State::Idle);
        assert_eq!(feed.presenter().renders(), vec!["A"]);
    }

    #[test]
    fn exhausted_finite_feed_stays_idle_until_new_source() {
        let mut feed = Feed::new("test", settings(LoopMode::Finite), Recorder::default());
        feed.set_source(comments(&["A"]));
        let start = Instant::now();
        feed.start(start);
        assert!(feed.advance(start));
        assert!(!feed.advance(start + Duration::from_secs(3)));
        assert_eq!(feed.state(), State::Idle);

        feed.start(start + Duration::from_secs(4));
        assert_eq!(feed.state(), State::Idle);
        assert_eq!(feed.next_due(), None);

        feed.set_source(comments(&["B"]));
        feed.start(start + Duration::from_secs(5));
        assert!(feed.is_running());
        assert!(feed.advance(start + Duration::from_secs(5)));
        assert_eq!(feed.presenter().renders(), vec!["A", "B"]);
    }

    #[test]
    fn loop_mode_keys() {
        assert_eq!(LoopMode::from_key("Cyclic"), Some(LoopMode::Cyclic));
        assert_eq!(LoopMode::from_key(" once "), Some(LoopMode::Finite));
        assert_eq!(LoopMode::from_key("sometimes"), None);
    }
}
