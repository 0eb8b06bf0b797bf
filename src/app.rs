use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rust_i18n::t;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::event::AppEvent;
use crate::keyboard::layout::{GlyphSet, Key};
use crate::keyboard::popover::Visibility;
use crate::keyboard::{InputEvent, KeyboardInputEngine};
use crate::navigation::feed::{FeedMessage, LocalPlayerFeed};
use crate::navigation::stack::ScreenStack;
use crate::navigation::{
    ConnectionStatus, NavigationSurface, PlayerRecord, QuizPhase, QuizState, Route, ScreenResolver,
};
use crate::ui::keyboard_view::KeyRects;

/// Harness state: one keyboard-backed answer field on top of a feed-driven
/// screen stack.
///
/// The keyboard belongs to the mounted screen instance. When the resolver
/// remounts the screen the engine is torn down and rebuilt empty.
pub struct App {
    pub config: Config,
    pub engine: KeyboardInputEngine,
    pub resolver: ScreenResolver,
    pub stack: ScreenStack,
    pub player_feed: LocalPlayerFeed,
    pub key_rects: KeyRects,
    pub last_event: Option<InputEvent>,
    pub should_quit: bool,
    /// False when the terminal cannot report key releases; every press is
    /// then a complete tap.
    pub release_events: bool,
    feed_tx: Sender<FeedMessage>,
    glyphs: GlyphSet,
    mounted_instance: Option<u64>,
    sim_status: ConnectionStatus,
    sim_tier: u32,
    started: Instant,
}

impl App {
    pub fn new(config: Config, glyphs: GlyphSet, feed_tx: Sender<FeedMessage>) -> Self {
        let key_rects = KeyRects::new();
        let engine = build_engine(&config, glyphs.clone(), &key_rects);
        let stack = ScreenStack::default();
        let mounted_instance = stack.current().map(|s| s.instance_id);
        Self {
            player_feed: LocalPlayerFeed::new(PlayerRecord { is_active: true }, feed_tx.clone()),
            config,
            engine,
            resolver: ScreenResolver::new(),
            stack,
            key_rects,
            last_event: None,
            should_quit: false,
            release_events: true,
            feed_tx,
            glyphs,
            mounted_instance,
            sim_status: ConnectionStatus::Disconnected,
            sim_tier: 0,
            started: Instant::now(),
        }
    }

    /// Offset on the harness clock.
    pub fn now(&self) -> Duration {
        self.started.elapsed()
    }

    /// Seeds the local feed: connected, active player, idle quiz.
    pub fn start_local_session(&mut self) {
        self.set_status(ConnectionStatus::Connected);
        self.player_feed.set_active(true);
        self.send_phase(QuizPhase::Idle);
    }

    pub fn on_feed(&mut self, message: FeedMessage) {
        trace!(?message, "feed message");
        match message {
            FeedMessage::Player(record) => self.resolver.on_player(record),
            FeedMessage::Quiz(state) => self.resolver.on_quiz(state),
            FeedMessage::Status(status) => {
                self.sim_status = status;
                self.resolver.on_status(status);
            }
        }
    }

    /// Applies one queued event. Feed messages only update the held values;
    /// evaluation waits for the next `tick`, so a burst collapses into one.
    pub fn handle_event(&mut self, event: AppEvent, now: Duration) {
        match event {
            AppEvent::Key(key) => self.handle_key(key, now),
            AppEvent::Feed(message) => self.on_feed(message),
            AppEvent::Tick | AppEvent::Resize(_, _) => {}
        }
    }

    /// Fires due timers, evaluates pending feed updates and drains engine
    /// notifications.
    pub fn tick(&mut self, now: Duration) {
        self.engine.advance(now);
        if let Some(resolution) = self.resolver.process(&mut self.stack, &mut self.player_feed) {
            debug!(?resolution, "feed resolved");
        }
        let current = self.stack.current().map(|s| s.instance_id);
        if current != self.mounted_instance {
            self.remount_keyboard();
            self.mounted_instance = current;
        }
        self.drain_events();
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Duration) {
        if key.kind == KeyEventKind::Press
            && key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_quit = true;
            return;
        }

        match key.kind {
            KeyEventKind::Release => {
                if let Some(k) = self.keyboard_key(key.code) {
                    self.engine.end_press(k, now);
                }
            }
            KeyEventKind::Press => self.handle_press(key.code, now),
            KeyEventKind::Repeat => {}
        }
        self.drain_events();
    }

    fn handle_press(&mut self, code: KeyCode, now: Duration) {
        match code {
            KeyCode::Esc => {
                self.engine.dismiss_popover(now);
            }
            KeyCode::F(n @ 1..=7) => self.send_phase(QuizPhase::ALL[usize::from(n - 1)]),
            KeyCode::F(8) => {
                let active = self.player_feed.record().is_active;
                self.player_feed.set_active(!active);
            }
            KeyCode::F(9) => {
                let next = match self.sim_status {
                    ConnectionStatus::Connected => ConnectionStatus::Reconnecting,
                    ConnectionStatus::Reconnecting => ConnectionStatus::Disconnected,
                    ConnectionStatus::Disconnected => ConnectionStatus::Connected,
                };
                self.set_status(next);
            }
            KeyCode::F(10) => {
                let disabled = !self.engine.is_disabled();
                info!(disabled, "keyboard toggled");
                self.engine.set_disabled(disabled);
            }
            KeyCode::Left => {
                let pos = self.engine.buffer().cursor().saturating_sub(1);
                self.engine.move_cursor_to(pos);
            }
            KeyCode::Right => {
                let pos = self.engine.buffer().cursor() + 1;
                self.engine.move_cursor_to(pos);
            }
            KeyCode::Home => self.engine.move_cursor_to(0),
            KeyCode::End => self.engine.focus_field(),
            KeyCode::Char(d @ '1'..='9') if self.engine.popover_visibility() == Visibility::Open => {
                let index = d as usize - '1' as usize;
                self.engine.resolve_alternate(index, now);
            }
            code => {
                let Some(k) = self.keyboard_key(code) else {
                    trace!(?code, "key not on keyboard");
                    return;
                };
                self.engine.begin_press(k, now);
                if !self.release_events {
                    self.engine.end_press(k, now);
                }
            }
        }
    }

    pub fn pressed_keys(&self) -> Vec<Key> {
        self.engine.pressed_keys().collect()
    }

    pub fn route(&self) -> Route {
        self.stack.current_route().unwrap_or(Route::Default)
    }

    pub fn route_label(&self) -> String {
        let key = match self.route() {
            Route::Default => "screen.default",
            Route::Prepare => "screen.prepare",
            Route::Question => "screen.question",
            Route::Admin => "screen.admin",
        };
        t!(key, locale = &self.glyphs.locale).into_owned()
    }

    pub fn placeholder(&self) -> String {
        if self.config.placeholder.is_empty() {
            t!("keyboard.placeholder", locale = &self.glyphs.locale).into_owned()
        } else {
            self.config.placeholder.clone()
        }
    }

    fn keyboard_key(&self, code: KeyCode) -> Option<Key> {
        let key = match code {
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Char(ch) => Key::from_char(ch.to_lowercase().next().unwrap_or(ch)),
            _ => return None,
        };
        self.engine.glyphs().contains(key).then_some(key)
    }

    fn send_phase(&mut self, phase: QuizPhase) {
        if phase == QuizPhase::QuestionPre {
            self.sim_tier += 1;
        }
        let state = QuizState {
            state: phase,
            tier_number: Some(self.sim_tier),
        };
        self.send(FeedMessage::Quiz(state));
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        self.sim_status = status;
        self.send(FeedMessage::Status(status));
    }

    fn send(&self, message: FeedMessage) {
        if self.feed_tx.send(message).is_err() {
            warn!("feed channel closed");
        }
    }

    fn remount_keyboard(&mut self) {
        let disabled = self.engine.is_disabled();
        self.engine.teardown();
        self.drain_events();
        self.engine = build_engine(&self.config, self.glyphs.clone(), &self.key_rects);
        self.engine.set_disabled(disabled);
        debug!(route = self.route().as_str(), "keyboard remounted");
    }

    fn drain_events(&mut self) {
        for event in self.engine.take_events() {
            match &event {
                InputEvent::ValueChanged(value) => debug!(%value, "answer changed"),
                other => trace!(?other, "keyboard event"),
            }
            self.last_event = Some(event);
        }
    }
}

fn build_engine(config: &Config, glyphs: GlyphSet, key_rects: &KeyRects) -> KeyboardInputEngine {
    KeyboardInputEngine::new(glyphs, config.thresholds(), config.popover_fade())
        .with_measure(Box::new(key_rects.clone()))
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use crossterm::event::KeyEventState;

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        }
    }

    fn test_app() -> (App, Receiver<FeedMessage>) {
        let (tx, rx) = mpsc::channel();
        let app = App::new(Config::default(), GlyphSet::for_locale("en"), tx);
        (app, rx)
    }

    fn pump(app: &mut App, rx: &Receiver<FeedMessage>, now: Duration) {
        for message in rx.try_iter().collect::<Vec<_>>() {
            app.on_feed(message);
        }
        app.tick(now);
        // Refetches re-deliver through the channel.
        for message in rx.try_iter().collect::<Vec<_>>() {
            app.on_feed(message);
        }
        app.tick(now);
    }

    #[test]
    fn test_tap_types_into_buffer() {
        let (mut app, _rx) = test_app();
        app.handle_key(press(KeyCode::Char('C')), ms(0));
        app.handle_key(release(KeyCode::Char('C')), ms(50));
        app.handle_key(press(KeyCode::Char('a')), ms(100));
        app.handle_key(release(KeyCode::Char('a')), ms(150));
        assert_eq!(app.engine.buffer().value(), "ca");
        assert_eq!(app.last_event, Some(InputEvent::ValueChanged("ca".into())));
    }

    #[test]
    fn test_press_without_release_events_taps() {
        let (mut app, _rx) = test_app();
        app.release_events = false;
        app.handle_key(press(KeyCode::Char('x')), ms(0));
        assert_eq!(app.engine.buffer().value(), "x");
        assert!(app.pressed_keys().is_empty());
    }

    #[test]
    fn test_long_press_then_digit_selects_alternate() {
        let (mut app, _rx) = test_app();
        app.handle_key(press(KeyCode::Char('e')), ms(0));
        app.tick(ms(400));
        app.handle_key(release(KeyCode::Char('e')), ms(450));
        app.tick(ms(600));
        assert_eq!(app.engine.popover_visibility(), Visibility::Open);

        app.handle_key(press(KeyCode::Char('2')), ms(700));
        assert_eq!(app.engine.buffer().value(), "é");
        app.tick(ms(1000));
        assert_eq!(app.engine.popover_visibility(), Visibility::Closed);
    }

    #[test]
    fn test_digit_without_popover_is_ignored() {
        let (mut app, _rx) = test_app();
        app.handle_key(press(KeyCode::Char('1')), ms(0));
        assert_eq!(app.engine.buffer().value(), "");
    }

    #[test]
    fn test_arrow_keys_move_cursor() {
        let (mut app, _rx) = test_app();
        for (i, ch) in "abc".chars().enumerate() {
            let t = i as u64 * 100;
            app.handle_key(press(KeyCode::Char(ch)), ms(t));
            app.handle_key(release(KeyCode::Char(ch)), ms(t + 10));
        }
        app.handle_key(press(KeyCode::Left), ms(400));
        app.handle_key(press(KeyCode::Left), ms(410));
        assert_eq!(app.engine.buffer().cursor(), 1);
        app.handle_key(press(KeyCode::End), ms(420));
        assert_eq!(app.engine.buffer().cursor(), 3);
        app.handle_key(press(KeyCode::Right), ms(430));
        assert_eq!(app.engine.buffer().cursor(), 3);
    }

    #[test]
    fn test_function_keys_drive_navigation() {
        let (mut app, rx) = test_app();
        app.start_local_session();
        pump(&mut app, &rx, ms(0));
        assert_eq!(app.route(), Route::Default);

        app.handle_key(press(KeyCode::F(2)), ms(10));
        pump(&mut app, &rx, ms(10));
        assert_eq!(app.route(), Route::Prepare);

        app.handle_key(press(KeyCode::F(3)), ms(20));
        pump(&mut app, &rx, ms(20));
        assert_eq!(app.route(), Route::Question);
        assert_eq!(
            app.stack.current().map(|s| s.params.tier_number),
            Some(Some(1))
        );
    }

    #[test]
    fn test_feed_burst_collapses_to_latest() {
        let (mut app, _rx) = test_app();
        let burst = [
            FeedMessage::Status(ConnectionStatus::Connected),
            FeedMessage::Player(PlayerRecord { is_active: true }),
            FeedMessage::Quiz(QuizState {
                state: QuizPhase::QuestionPre,
                tier_number: Some(1),
            }),
            FeedMessage::Quiz(QuizState {
                state: QuizPhase::QuestionOpen,
                tier_number: Some(1),
            }),
        ];
        for message in burst {
            app.handle_event(AppEvent::Feed(message), ms(0));
        }
        app.tick(ms(0));

        // Prepare was never mounted: the reset is the first new instance.
        assert_eq!(app.stack.routes(), vec![Route::Question]);
        assert_eq!(app.stack.current().map(|s| s.instance_id), Some(1));
    }

    #[test]
    fn test_remount_clears_answer_field() {
        let (mut app, rx) = test_app();
        app.start_local_session();
        app.handle_key(press(KeyCode::F(3)), ms(0));
        pump(&mut app, &rx, ms(0));
        assert_eq!(app.route(), Route::Question);

        app.handle_key(press(KeyCode::Char('a')), ms(10));
        app.handle_key(release(KeyCode::Char('a')), ms(20));
        assert_eq!(app.engine.buffer().value(), "a");

        // Closing the question resets back to Default: a fresh screen.
        app.handle_key(press(KeyCode::F(4)), ms(30));
        pump(&mut app, &rx, ms(30));
        assert_eq!(app.route(), Route::Default);
        assert_eq!(app.engine.buffer().value(), "");
    }

    #[test]
    fn test_disconnect_holds_screen() {
        let (mut app, rx) = test_app();
        app.start_local_session();
        app.handle_key(press(KeyCode::F(2)), ms(0));
        pump(&mut app, &rx, ms(0));
        assert_eq!(app.route(), Route::Prepare);

        app.handle_key(press(KeyCode::F(9)), ms(10));
        app.handle_key(press(KeyCode::F(1)), ms(20));
        pump(&mut app, &rx, ms(20));
        assert_eq!(app.resolver.status(), ConnectionStatus::Reconnecting);
        assert_eq!(app.route(), Route::Prepare);
    }

    #[test]
    fn test_f10_disables_keyboard() {
        let (mut app, _rx) = test_app();
        app.handle_key(press(KeyCode::F(10)), ms(0));
        app.handle_key(press(KeyCode::Char('a')), ms(10));
        app.handle_key(release(KeyCode::Char('a')), ms(20));
        assert!(app.engine.is_disabled());
        assert_eq!(app.engine.buffer().value(), "");
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (mut app, _rx) = test_app();
        app.handle_key(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            ms(0),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn test_placeholder_falls_back_to_locale() {
        let (mut app, _rx) = test_app();
        assert_eq!(app.placeholder(), "Enter text...");
        app.config.placeholder = "Answer".into();
        assert_eq!(app.placeholder(), "Answer");
        assert_eq!(app.route_label(), t!("screen.default", locale = "en"));
    }
}
