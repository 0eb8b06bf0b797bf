use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quizpad::app::App;
use quizpad::config::Config;
use quizpad::event::EventHandler;
use quizpad::keyboard::layout::{GlyphSet, LOCALES};
use quizpad::navigation::ConnectionStatus;
use quizpad::navigation::feed::spawn_script;
use quizpad::ui::keyboard_view::{KeyboardView, PopoverView};
use quizpad::ui::layout::{AppLayout, pack_hint_lines};

#[derive(Parser)]
#[command(name = "quizpad", version, about = "Terminal quiz client with an on-screen keyboard")]
struct Cli {
    #[arg(short, long, help = "Keyboard locale (en, uk)")]
    locale: Option<String>,

    #[arg(long, help = "Long-press threshold in milliseconds")]
    long_press_ms: Option<u64>,

    #[arg(long, help = "Backspace hold-to-clear threshold in milliseconds")]
    hold_to_clear_ms: Option<u64>,

    #[arg(long, help = "Glyph set TOML overriding the locale keyboard")]
    glyphs: Option<PathBuf>,

    #[arg(long, help = "Start with the keyboard disabled")]
    disabled: bool,

    #[arg(short, long, help = "JSON-lines feed script to replay")]
    feed: Option<PathBuf>,

    #[arg(long, help = "Write logs to this file")]
    log: Option<PathBuf>,

    #[arg(long, help = "Save the effective settings to the config file")]
    save_config: bool,
}

fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizpad=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.log {
        init_logging(path)?;
    }

    let mut config = Config::load().unwrap_or_default();
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    config.normalize_locale(LOCALES);
    if let Some(ms) = cli.long_press_ms {
        config.long_press_ms = ms;
    }
    if let Some(ms) = cli.hold_to_clear_ms {
        config.hold_to_clear_ms = ms;
    }
    if let Some(path) = cli.glyphs {
        config.glyph_set_path = Some(path.display().to_string());
    }

    if cli.save_config {
        config.save()?;
        info!("config saved");
    }

    let glyphs = match &config.glyph_set_path {
        Some(path) => GlyphSet::load(path.as_ref())?,
        None => GlyphSet::for_locale(&config.locale),
    };
    info!(locale = %glyphs.locale, keys = glyphs.alphabet.len(), "glyph set loaded");

    let events = EventHandler::new(config.tick_rate());
    let feed_tx = events.feed_sender();
    let mut app = App::new(config, glyphs, feed_tx.clone());
    app.engine.set_disabled(cli.disabled);

    match &cli.feed {
        Some(path) => {
            spawn_script(path, feed_tx)?;
        }
        None => app.start_local_session(),
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    // Release events are needed for long-press and hold-to-clear.
    let keyboard_enhanced = supports_keyboard_enhancement().unwrap_or(false)
        && execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )
        .is_ok();
    app.release_events = keyboard_enhanced;
    info!(keyboard_enhanced, "terminal ready");

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events);

    app.engine.teardown();
    if keyboard_enhanced {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        // Everything already queued is applied before one evaluation, so
        // only the newest feed snapshot is acted on.
        let event = events.next()?;
        let now = app.now();
        app.handle_event(event, now);
        while let Some(event) = events.try_next() {
            let now = app.now();
            app.handle_event(event, now);
        }
        let now = app.now();
        app.tick(now);

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let area = frame.area();

    let hints = [
        "[1-9] alternate",
        "[Esc] dismiss",
        "[F1-F7] phase",
        "[F8] player",
        "[F9] connection",
        "[F10] keyboard",
        "[Ctrl-C] quit",
    ];
    let hint_lines = pack_hint_lines(&hints, usize::from(area.width));
    let layout = AppLayout::new(area, hint_lines.len() as u16);

    render_header(frame, app, layout.header);
    render_screen(frame, app, layout.screen);
    render_field(frame, app, layout.field);

    let pressed = app.pressed_keys();
    let keyboard = KeyboardView::new(
        app.engine.glyphs(),
        &pressed,
        app.engine.is_disabled(),
        &app.key_rects,
    );
    frame.render_widget(keyboard, layout.keyboard);

    if let Some(state) = app.engine.popover().state() {
        let progress = state.fade_progress(app.now());
        frame.render_widget(PopoverView::new(state, progress), area);
    }

    let footer: Vec<Line> = hint_lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l, Style::default().fg(Color::DarkGray))))
        .collect();
    frame.render_widget(Paragraph::new(footer), layout.footer);
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let (status, color) = match app.resolver.status() {
        ConnectionStatus::Connected => ("connected", Color::Green),
        ConnectionStatus::Reconnecting => ("reconnecting", Color::Yellow),
        ConnectionStatus::Disconnected => ("disconnected", Color::Red),
    };
    let phase = app
        .resolver
        .quiz()
        .map(|q| q.state.as_str())
        .unwrap_or("-");
    let player = match app.resolver.player() {
        Some(p) if p.is_active => "active",
        Some(_) => "inactive",
        None => "-",
    };
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", app.route_label()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(status, Style::default().fg(color)),
        Span::raw(format!(" | phase {phase} | player {player}")),
    ]);
    let block = Block::bordered().title(" quizpad ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_screen(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let Some(screen) = app.stack.current() else {
        return;
    };
    let mut lines = vec![Line::from(format!(
        " {} #{}  (stack depth {})",
        screen.route.as_str(),
        screen.instance_id,
        app.stack.depth()
    ))];
    if let Some(tier) = screen.params.tier_number {
        lines.push(Line::from(format!(" tier {tier}")));
    }
    if let Some(event) = &app.last_event {
        lines.push(Line::from(Span::styled(
            format!(" last: {event:?}"),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_field(frame: &mut ratatui::Frame, app: &App, area: ratatui::layout::Rect) {
    let buffer = app.engine.buffer();
    let cursor_style = Style::default().fg(Color::Black).bg(Color::White);
    let line = if buffer.is_empty() {
        Line::from(vec![
            Span::styled(" ", cursor_style),
            Span::styled(app.placeholder(), Style::default().fg(Color::DarkGray)),
        ])
    } else {
        let (before, at, after) = buffer.render_parts();
        Line::from(vec![
            Span::raw(before.to_string()),
            Span::styled(at.map(String::from).unwrap_or_else(|| " ".into()), cursor_style),
            Span::raw(after.to_string()),
        ])
    };
    let block = Block::bordered().title(" Answer ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}
