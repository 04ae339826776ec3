//! Terminal front end: raw-mode input, redraws and effect execution.

use crate::session::jobs::{spawn_synthesis_job, JobContext};
use crate::session::view::{render, LineStyle};
use crate::session::{Effect, Event, Key, Session, SessionError, LOG_TARGET};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

const TICK_INTERVAL: Duration = Duration::from_millis(250);
const HIGHLIGHT: Color = Color::Rgb {
    r: 0x7D,
    g: 0x56,
    b: 0xF4,
};

/// Runs the session until the user quits.
///
/// Keystrokes, redraw ticks and job completions share one queue and are
/// applied strictly one at a time.
pub async fn run_interactive(mut session: Session, ctx: JobContext) -> Result<(), SessionError> {
    let _guard = TerminalGuard::enter()?;
    let (tx, mut rx) = unbounded_channel::<Event>();

    spawn_key_reader(tx.clone())?;
    let ticker = tokio::spawn({
        let tx = tx.clone();
        async move {
            let mut interval = tokio::time::interval(TICK_INTERVAL);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        }
    });

    tracing::info!(target: LOG_TARGET, "interactive session started");
    let mut stdout = io::stdout();
    let result = loop {
        if let Err(e) = draw(&mut stdout, &session) {
            break Err(SessionError::Terminal(e));
        }
        let Some(event) = rx.recv().await else {
            break Ok(());
        };

        let mut quit = false;
        for effect in session.update(event) {
            match effect {
                Effect::Quit => quit = true,
                Effect::Synthesize(request) => spawn_synthesis_job(&ctx, request, tx.clone()),
            }
        }
        if quit {
            break Ok(());
        }
    };

    // The runtime cannot exit while a playback task is still running.
    ctx.shutdown();
    ticker.abort();
    tracing::info!(
        target: LOG_TARGET,
        pending = session.pending_jobs(),
        "interactive session ended"
    );
    result
}

fn spawn_key_reader(tx: UnboundedSender<Event>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("talkback-keys".to_owned())
        .spawn(move || loop {
            let event = match event::read() {
                Ok(TermEvent::Key(key)) => match map_key(key) {
                    Some(key) => Event::Key(key),
                    None => continue,
                },
                Ok(TermEvent::Resize(_, _)) => Event::Tick,
                Ok(_) => continue,
                Err(e) => {
                    // Without input the user has no way out; end the session.
                    tracing::error!(target: LOG_TARGET, error = %e, "terminal input failed");
                    let _ = tx.send(Event::Key(Key::CtrlC));
                    break;
                }
            };
            if tx.send(event).is_err() {
                break;
            }
        })?;
    Ok(())
}

/// Translates a terminal key press into a session key, dropping anything the
/// session has no binding for.
pub fn map_key(key: KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => Some(Key::CtrlC),
        KeyCode::Char(_) if ctrl || alt => None,
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Backspace => Some(Key::Backspace),
        KeyCode::Enter => Some(Key::Enter),
        KeyCode::Esc => Some(Key::Esc),
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        _ => None,
    }
}

fn draw(out: &mut impl Write, session: &Session) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for (row, line) in render(session, usize::from(rows))
        .into_iter()
        .take(usize::from(rows))
        .enumerate()
    {
        let text: String = line.text.chars().take(usize::from(cols)).collect();
        queue!(out, MoveTo(0, u16::try_from(row).unwrap_or(u16::MAX)))?;
        apply_style(out, line.style)?;
        queue!(out, Print(text), SetAttribute(Attribute::Reset), ResetColor)?;
    }
    out.flush()
}

fn apply_style(out: &mut impl Write, style: LineStyle) -> io::Result<()> {
    match style {
        LineStyle::Plain => Ok(()),
        LineStyle::Title => queue!(out, SetAttribute(Attribute::Bold)),
        LineStyle::Highlight => queue!(
            out,
            SetForegroundColor(Color::White),
            SetBackgroundColor(HIGHLIGHT),
            SetAttribute(Attribute::Bold)
        ),
        LineStyle::Dim => queue!(out, SetForegroundColor(Color::DarkGrey)),
        LineStyle::Success => queue!(out, SetForegroundColor(Color::Green)),
        LineStyle::Failure => queue!(out, SetForegroundColor(Color::Red)),
    }
}

/// Raw mode and the alternate screen for as long as it lives.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}
