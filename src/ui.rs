use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, Stdout};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use rand::Rng;
use ratatui::backend::CrosstermBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use tracing::{debug, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::data::{Comment, User, VideoData};
use crate::feed::{self, Feed};
use crate::overlay::FloatingOverlay;
use crate::stack::CommentStack;

type Rgb = (u8, u8, u8);

const RGB_BACKDROP: Rgb = (17, 17, 27);
const RGB_PATTERN: Rgb = (49, 50, 68);
const RGB_TEXT: Rgb = (205, 214, 244);
const RGB_BUBBLE: Rgb = (36, 36, 52);
const RGB_HEART: Rgb = (243, 139, 168);

const COLOR_BG: Color = Color::Rgb(RGB_BACKDROP.0, RGB_BACKDROP.1, RGB_BACKDROP.2);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(RGB_TEXT.0, RGB_TEXT.1, RGB_TEXT.2);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_BORDER_IDLE: Color = Color::Rgb(69, 71, 90);
const COLOR_INPUT_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_STACK_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_LIVE: Color = Color::Rgb(210, 15, 57);
const COLOR_FOLLOW: Color = Color::Rgb(30, 102, 245);
const COLOR_HEART: Color = Color::Rgb(RGB_HEART.0, RGB_HEART.1, RGB_HEART.2);
const AVATAR_COLORS: [Color; 6] = [
    Color::Rgb(250, 179, 135),
    Color::Rgb(249, 226, 175),
    Color::Rgb(166, 227, 161),
    Color::Rgb(148, 226, 213),
    Color::Rgb(137, 180, 250),
    Color::Rgb(203, 166, 247),
];

const TICK_RATE: Duration = Duration::from_millis(50);
const HEART_DURATION: Duration = Duration::from_secs(1);
const HEART_RISE: f32 = 6.0;
const PATTERN_STEP: Duration = Duration::from_millis(250);
const HEADER_HEIGHT: u16 = 2;
const INPUT_HEIGHT: u16 = 3;
const HEART_BUTTON_WIDTH: u16 = 7;
const OVERLAY_WIDTH_PERCENT: u16 = 80;
const PLACEHOLDER_AVATAR: &str = "·";
const INPUT_PLACEHOLDER: &str = "Write a comment...";

fn fade(fg: Rgb, bg: Rgb, opacity: f32) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    let mix = |from: u8, to: u8| -> u8 {
        (f32::from(to) + (f32::from(from) - f32::from(to)) * opacity).round() as u8
    };
    Color::Rgb(mix(fg.0, bg.0), mix(fg.1, bg.1), mix(fg.2, bg.2))
}

fn avatar_color(avatar: &str) -> Color {
    let mut hasher = DefaultHasher::new();
    avatar.hash(&mut hasher);
    AVATAR_COLORS[(hasher.finish() % AVATAR_COLORS.len() as u64) as usize]
}

/// Initial of the avatar file stem, or a placeholder when the reference is
/// empty.
fn avatar_glyph(avatar: &str) -> (String, Color) {
    let initial = Path::new(avatar.trim())
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.chars().find(|ch| ch.is_alphanumeric()));
    match initial {
        Some(ch) => (ch.to_uppercase().collect(), avatar_color(avatar)),
        None => (PLACEHOLDER_AVATAR.to_string(), COLOR_TEXT_SECONDARY),
    }
}

fn avatar_span(avatar: &str, bg: Color) -> Span<'static> {
    let (glyph, color) = avatar_glyph(avatar);
    Span::styled(
        format!("({glyph})"),
        Style::default()
            .fg(color)
            .bg(bg)
            .add_modifier(Modifier::BOLD),
    )
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut width = 0;
    for ch in text.chars() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width + 1 > max_width {
            break;
        }
        out.push(ch);
        width += ch_width;
    }
    out.push('…');
    out
}

fn format_count(count: u64) -> String {
    match count {
        0..=999 => count.to_string(),
        1_000..=999_999 => trim_decimal(count as f64 / 1_000.0, "K"),
        _ => trim_decimal(count as f64 / 1_000_000.0, "M"),
    }
}

fn trim_decimal(value: f64, suffix: &str) -> String {
    let formatted = format!("{value:.1}");
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{trimmed}{suffix}")
}

/// One-line bubble: avatar, bold username, text. Colors are blended towards
/// `bg` by `opacity`.
fn comment_line(comment: &Comment, bg: Rgb, opacity: f32, max_width: u16) -> Line<'static> {
    let bg_color = Color::Rgb(bg.0, bg.1, bg.2);
    let text_color = fade(RGB_TEXT, bg, opacity);
    let avatar = if opacity >= 0.5 {
        avatar_span(&comment.avatar, bg_color)
    } else {
        Span::styled(
            format!("({})", avatar_glyph(&comment.avatar).0),
            Style::default().fg(text_color).bg(bg_color),
        )
    };
    let prefix_width = avatar.width() + 1;
    let username = format!("{} ", comment.username);
    let remaining = (max_width as usize)
        .saturating_sub(prefix_width + UnicodeWidthStr::width(username.as_str()) + 1);
    let text = truncate_to_width(&comment.text, remaining);
    Line::from(vec![
        avatar,
        Span::styled(" ", Style::default().bg(bg_color)),
        Span::styled(
            username,
            Style::default()
                .fg(text_color)
                .bg(bg_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("{text} "),
            Style::default().fg(text_color).bg(bg_color),
        ),
    ])
}

struct HeartBurst {
    born: Instant,
    drift: i16,
}

#[derive(Default)]
struct CommentInput {
    value: String,
    focused: bool,
}

impl CommentInput {
    fn focus(&mut self) {
        self.focused = true;
    }

    fn blur(&mut self) {
        self.focused = false;
    }

    fn insert_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.value.push(ch);
        }
    }

    fn backspace(&mut self) {
        self.value.pop();
    }

    /// Clears the field and returns its trimmed text, unless blank.
    fn take_submission(&mut self) -> Option<String> {
        let text = self.value.trim().to_string();
        self.value.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

pub struct Options {
    pub status_message: String,
    pub stream: Option<VideoData>,
    pub identity: User,
    pub stack: feed::Settings,
    pub overlay: Option<feed::Settings>,
}

pub struct Model {
    status_message: String,
    host: User,
    video: String,
    viewer_count: u64,
    likes: u64,
    identity: User,
    playing: bool,
    following: bool,
    stack: Feed<CommentStack>,
    overlay: Option<Feed<FloatingOverlay>>,
    input: CommentInput,
    hearts: Vec<HeartBurst>,
    started_at: Instant,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options, now: Instant) -> Self {
        let comments = opts
            .stream
            .as_ref()
            .map(|stream| stream.comments.clone())
            .unwrap_or_default();

        // The stack shows the tail of the list at once, then replays the list
        // one comment per interval.
        let mut stack = Feed::new(
            "stack",
            opts.stack,
            CommentStack::new(opts.stack.exit_animation),
        );
        stack.set_source(comments.clone());
        stack.replace_all(&comments, now);
        stack.start_at(now.checked_add(opts.stack.interval).unwrap_or(now));

        let overlay = opts.overlay.map(|settings| {
            let mut feed = Feed::new(
                "overlay",
                settings,
                FloatingOverlay::new(settings.exit_animation),
            );
            feed.set_source(comments.clone());
            feed.start(now);
            feed
        });

        let (host, video, viewer_count, likes) = match opts.stream {
            Some(stream) => (stream.user, stream.video, stream.viewer_count, stream.likes),
            None => (
                User {
                    username: "offline".into(),
                    avatar: String::new(),
                },
                String::new(),
                0,
                0,
            ),
        };

        Self {
            status_message: opts.status_message,
            host,
            playing: !video.trim().is_empty(),
            video,
            viewer_count,
            likes,
            identity: opts.identity,
            following: false,
            stack,
            overlay,
            input: CommentInput::default(),
            hearts: Vec::new(),
            started_at: now,
            needs_redraw: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);
        self.dispose();

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.needs_redraw {
                let now = Instant::now();
                terminal.draw(|frame| self.draw(frame, now))?;
                self.needs_redraw = false;
            }

            let timeout = TICK_RATE
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code, Instant::now()) {
                            break;
                        }
                    }
                    Event::Resize(..) => self.mark_dirty(),
                    _ => {}
                }
            }

            if last_tick.elapsed() >= TICK_RATE {
                last_tick = Instant::now();
                if self.on_tick(last_tick) {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Stops both feeds and drops every in-flight visual.
    pub fn dispose(&mut self) {
        self.stack.dispose();
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.dispose();
        }
        self.hearts.clear();
        debug!("screen disposed");
    }

    /// Advances timers and animations. Returns whether the screen changed.
    fn on_tick(&mut self, now: Instant) -> bool {
        let mut changed = self.stack.advance(now);
        changed |= self.stack.presenter_mut().animate(now);

        if let Some(overlay) = self.overlay.as_mut() {
            changed |= overlay.advance(now);
            changed |= overlay.presenter_mut().animate(now) > 0;
            changed |= !overlay.presenter().is_empty();
        }

        let hearts_before = self.hearts.len();
        self.hearts
            .retain(|heart| now.saturating_duration_since(heart.born) < HEART_DURATION);
        changed |= hearts_before != self.hearts.len() || !self.hearts.is_empty();

        changed || self.playing
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, code: KeyCode, now: Instant) -> bool {
        self.mark_dirty();

        if self.input.focused {
            match code {
                KeyCode::Enter => self.submit_comment(now),
                KeyCode::Esc => self.input.blur(),
                KeyCode::Backspace => self.input.backspace(),
                KeyCode::Char(ch) => self.input.insert_char(ch),
                _ => {}
            }
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('i') | KeyCode::Enter => {
                self.input.focus();
                self.status_message.clear();
            }
            KeyCode::Char(' ') => self.toggle_playback(),
            KeyCode::Char('l') | KeyCode::Char('L') => self.send_heart(now),
            KeyCode::Char('f') | KeyCode::Char('F') => self.toggle_follow(),
            _ => {}
        }
        false
    }

    fn submit_comment(&mut self, now: Instant) {
        let Some(text) = self.input.take_submission() else {
            self.input.blur();
            return;
        };
        let comment = Comment::from_user(&self.identity, text);
        debug!(chars = comment.text.chars().count(), "posting comment");
        self.stack.submit(comment, now);
        self.stack.presenter_mut().nudge(now);
        self.input.blur();
        self.status_message = "Comment posted.".into();
    }

    fn toggle_playback(&mut self) {
        if self.video.trim().is_empty() {
            self.status_message = "No video for this stream.".into();
            return;
        }
        self.playing = !self.playing;
        self.status_message = (if self.playing { "Playing." } else { "Paused." }).into();
    }

    fn send_heart(&mut self, now: Instant) {
        self.likes = self.likes.saturating_add(1);
        let drift = rand::thread_rng().gen_range(-2..=2);
        self.hearts.push(HeartBurst { born: now, drift });
    }

    fn toggle_follow(&mut self) {
        self.following = !self.following;
        info!(host = %self.host.username, following = self.following, "follow toggled");
        self.status_message = if self.following {
            format!("Following {}.", self.host.username)
        } else {
            format!("Unfollowed {}.", self.host.username)
        };
    }

    fn footer_text(&self) -> String {
        if self.input.focused {
            return format!("commenting as {} · Enter send · Esc cancel", self.identity.username);
        }
        let mut parts = Vec::new();
        if !self.status_message.is_empty() {
            parts.push(self.status_message.clone());
        }
        parts.push("i comment".to_string());
        parts.push("l like".to_string());
        parts.push("f follow".to_string());
        parts.push(format!(
            "space {}",
            if self.playing { "pause" } else { "play" }
        ));
        parts.push("q quit".to_string());
        parts.join(" · ")
    }

    fn draw(&self, frame: &mut Frame<'_>, now: Instant) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);
        self.draw_video(frame.buffer_mut(), full, now);

        let stack_rows = self.stack.window().capacity().min(u16::MAX as usize) as u16;
        let keyboard_gap = u16::from(self.input.focused);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(stack_rows),
                Constraint::Length(keyboard_gap),
                Constraint::Length(INPUT_HEIGHT),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_header(frame, layout[0]);
        self.draw_video_status(frame, layout[1]);
        self.draw_overlay(frame.buffer_mut(), layout[1], now);
        self.draw_stack(frame.buffer_mut(), layout[2], now);

        let input_row = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(HEART_BUTTON_WIDTH)])
            .split(layout[4]);
        self.draw_input(frame, input_row[0]);
        self.draw_heart_button(frame, input_row[1]);
        self.draw_hearts(frame.buffer_mut(), input_row[1], now);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[5]);
    }

    fn draw_video(&self, buf: &mut Buffer, area: Rect, now: Instant) {
        if !self.playing {
            return;
        }
        let elapsed = now.saturating_duration_since(self.started_at);
        let phase = (elapsed.as_millis() / PATTERN_STEP.as_millis()) as usize;
        let color = Color::Rgb(RGB_PATTERN.0, RGB_PATTERN.1, RGB_PATTERN.2);
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if (x as usize + y as usize * 3 + phase) % 13 == 0 {
                    buf.get_mut(x, y).set_symbol("·").set_fg(color);
                }
            }
        }
    }

    fn draw_video_status(&self, frame: &mut Frame<'_>, area: Rect) {
        if self.playing || area.height == 0 {
            return;
        }
        let label = if self.video.trim().is_empty() {
            "no video"
        } else {
            "▶ paused · space to play"
        };
        let row = Rect {
            y: area.y + area.height / 2,
            height: 1,
            ..area
        };
        let paragraph = Paragraph::new(label)
            .style(Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_BG))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, row);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let follow = if self.following {
            Span::styled(
                " Following ",
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .bg(COLOR_INPUT_BG)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(
                " Follow ",
                Style::default()
                    .fg(Color::White)
                    .bg(COLOR_FOLLOW)
                    .add_modifier(Modifier::BOLD),
            )
        };
        let left = vec![
            Line::from(vec![
                Span::raw(" "),
                avatar_span(&self.host.avatar, COLOR_BG),
                Span::raw(" "),
                Span::styled(
                    self.host.username.clone(),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                follow,
            ]),
            Line::from(vec![
                Span::raw("     "),
                Span::styled(
                    format!("♥ {}", format_count(self.likes)),
                    Style::default().fg(COLOR_HEART),
                ),
            ]),
        ];
        frame.render_widget(
            Paragraph::new(left).style(Style::default().bg(COLOR_BG)),
            halves[0],
        );

        let right = Line::from(vec![
            Span::styled(
                " LIVE ",
                Style::default()
                    .fg(Color::White)
                    .bg(COLOR_LIVE)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  👁 {} ", format_count(self.viewer_count)),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(right)
                .style(Style::default().bg(COLOR_BG))
                .alignment(Alignment::Right),
            halves[1],
        );
    }

    fn draw_overlay(&self, buf: &mut Buffer, area: Rect, now: Instant) {
        let Some(overlay) = self.overlay.as_ref() else {
            return;
        };
        let width = (u32::from(area.width) * u32::from(OVERLAY_WIDTH_PERCENT) / 100) as u16;
        if width < 2 {
            return;
        }
        for bubble in overlay.presenter().frames(now) {
            let Some(row) = bubble.row(area.height) else {
                continue;
            };
            let opacity = bubble.opacity();
            if opacity <= 0.05 {
                continue;
            }
            let bg = blend(RGB_BUBBLE, RGB_BACKDROP, opacity);
            let line = comment_line(bubble.comment, bg, opacity, width - 1);
            buf.set_line(area.x + 1, area.y + row, &line, width - 1);
        }
    }

    fn draw_stack(&self, buf: &mut Buffer, area: Rect, now: Instant) {
        let rows = self.stack.presenter().rows(now);
        if rows.is_empty() || area.height == 0 || area.width < 2 {
            return;
        }
        let lift = self.stack.presenter().nudge_offset(now);
        let visible = rows.len().min(area.height as usize);
        let first_y = area.bottom() - visible as u16;
        let first_y = first_y.saturating_sub(lift);
        let bg = match COLOR_STACK_BG {
            Color::Rgb(r, g, b) => (r, g, b),
            _ => RGB_BUBBLE,
        };
        for (offset, row) in rows[rows.len() - visible..].iter().enumerate() {
            let line = comment_line(row.comment, bg, row.opacity, area.width - 1);
            buf.set_line(area.x + 1, first_y + offset as u16, &line, area.width - 1);
        }
    }

    fn draw_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let border_color = if self.input.focused {
            COLOR_ACCENT
        } else {
            COLOR_BORDER_IDLE
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(COLOR_INPUT_BG));
        let inner = block.inner(area);

        let text = if self.input.value.is_empty() {
            Span::styled(
                INPUT_PLACEHOLDER,
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )
        } else {
            let width = UnicodeWidthStr::width(self.input.value.as_str());
            let max = inner.width.saturating_sub(1) as usize;
            // Keep the tail visible while typing past the edge.
            let shown = if width > max {
                tail_to_width(&self.input.value, max)
            } else {
                self.input.value.clone()
            };
            Span::styled(shown, Style::default().fg(COLOR_TEXT_PRIMARY))
        };
        frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);

        if self.input.focused && inner.width > 0 && inner.height > 0 {
            let typed = if self.input.value.is_empty() {
                0
            } else {
                UnicodeWidthStr::width(self.input.value.as_str())
                    .min(inner.width.saturating_sub(1) as usize)
            };
            frame.set_cursor(inner.x + typed as u16, inner.y);
        }
    }

    fn draw_heart_button(&self, frame: &mut Frame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(COLOR_HEART));
        let heart = Paragraph::new(Span::styled(
            "♥",
            Style::default()
                .fg(COLOR_HEART)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(block);
        frame.render_widget(heart, area);
    }

    fn draw_hearts(&self, buf: &mut Buffer, button: Rect, now: Instant) {
        let bounds = buf.area;
        if bounds.width == 0 || bounds.height == 0 {
            return;
        }
        for heart in &self.hearts {
            let age = now.saturating_duration_since(heart.born);
            let progress = (age.as_secs_f32() / HEART_DURATION.as_secs_f32()).min(1.0);
            let rise = (progress * HEART_RISE).round() as u16 + 1;
            let Some(y) = button.y.checked_sub(rise) else {
                continue;
            };
            let center = i32::from(button.x + button.width / 2) + i32::from(heart.drift);
            let x = center.clamp(i32::from(bounds.left()), i32::from(bounds.right()) - 1) as u16;
            if y < bounds.top() {
                continue;
            }
            let color = fade(RGB_HEART, RGB_BACKDROP, 1.0 - progress);
            buf.get_mut(x, y).set_symbol("♥").set_fg(color);
        }
    }
}

fn blend(fg: Rgb, bg: Rgb, opacity: f32) -> Rgb {
    match fade(fg, bg, opacity) {
        Color::Rgb(r, g, b) => (r, g, b),
        _ => bg,
    }
}

fn tail_to_width(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut start = text.len();
    for (idx, ch) in text.char_indices().rev() {
        let ch_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if width + ch_width > max_width {
            break;
        }
        width += ch_width;
        start = idx;
    }
    text[start..].to_string()
}
