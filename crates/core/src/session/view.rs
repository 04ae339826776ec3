//! Pure rendering of a [`Session`] into styled lines.

use crate::session::{Message, Mode, Role, Session, Status};

pub const SELECT_HELP: &str = "Use arrow keys to navigate, Enter to select voice, Esc to clear search";
pub const LIST_TITLE: &str = "Select a Voice";
pub const SEARCH_PLACEHOLDER: &str = " Search voices";
pub const TEXT_PROMPT: &str = "Enter text to speak (Esc to cancel):";
pub const TEXT_PLACEHOLDER: &str = "Type text to speak";
pub const TEXT_FOOTER: &str = "Press Enter to speak.";
pub const NO_MATCHES: &str = "No voices found.";

const SEARCH_BOX_WIDTH: usize = 34;
// Help, top border, search, bottom border, blank, title.
const SELECT_HEADER_ROWS: usize = 6;
const ROWS_PER_VOICE: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineStyle {
    Plain,
    Title,
    Highlight,
    Dim,
    Success,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

impl Line {
    fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, LineStyle::Plain)
    }

    fn styled(text: impl Into<String>, style: LineStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    fn blank() -> Self {
        Self::plain("")
    }
}

/// Lines for a terminal `rows` high. The voice list is paged and the
/// transcript is tailed so the input prompt stays visible.
pub fn render(session: &Session, rows: usize) -> Vec<Line> {
    match session.mode() {
        Mode::SelectingVoice => render_selecting(session, rows),
        Mode::TypingText | Mode::Processing => render_typing(session, rows),
    }
}

fn render_selecting(session: &Session, rows: usize) -> Vec<Line> {
    let mut lines = vec![Line::styled(SELECT_HELP, LineStyle::Dim)];

    let query = if session.query().is_empty() {
        Line::styled(boxed(SEARCH_PLACEHOLDER), LineStyle::Dim)
    } else {
        Line::plain(boxed(&format!(" {}█", session.query())))
    };
    lines.push(Line::plain(border('┌', '┐')));
    lines.push(query);
    lines.push(Line::plain(border('└', '┘')));
    lines.push(Line::blank());
    lines.push(Line::styled(LIST_TITLE, LineStyle::Title));

    let total = session.filtered_len();
    if total == 0 {
        lines.push(Line::styled(NO_MATCHES, LineStyle::Dim));
        return lines;
    }

    // One row is kept for the pager.
    let per_page = (rows.saturating_sub(SELECT_HEADER_ROWS + 1) / ROWS_PER_VOICE).max(1);
    let page = session.cursor() / per_page;
    let pages = total.div_ceil(per_page);
    let first = page * per_page;

    for (offset, voice) in session
        .filtered_voices()
        .skip(first)
        .take(per_page)
        .enumerate()
    {
        if first + offset == session.cursor() {
            lines.push(Line::styled(format!("│ {}", voice.name), LineStyle::Highlight));
            lines.push(Line::styled(
                format!("│ {}", voice.description()),
                LineStyle::Highlight,
            ));
        } else {
            lines.push(Line::plain(format!("  {}", voice.name)));
            lines.push(Line::styled(format!("  {}", voice.description()), LineStyle::Dim));
        }
    }

    if pages > 1 {
        lines.push(Line::styled(
            format!("  page {}/{} ({} voices)", page + 1, pages, total),
            LineStyle::Dim,
        ));
    }
    lines
}

fn render_typing(session: &Session, rows: usize) -> Vec<Line> {
    let voice = session
        .selected_voice()
        .map(|v| v.name.as_str())
        .unwrap_or("<none>");

    let mut footer = Vec::new();
    if session.mode() == Mode::Processing {
        footer.push(Line::styled("Generating audio...", LineStyle::Dim));
    } else {
        footer.push(Line::plain(TEXT_PROMPT));
        footer.push(Line::blank());
        footer.push(if session.input().is_empty() {
            Line::styled(format!("> {TEXT_PLACEHOLDER}"), LineStyle::Dim)
        } else {
            Line::plain(format!("> {}█", session.input()))
        });
        footer.push(Line::blank());
        footer.push(Line::styled(TEXT_FOOTER, LineStyle::Dim));
    }

    let mut lines = vec![
        Line::styled(format!("Selected Voice: {voice}"), LineStyle::Title),
        Line::blank(),
    ];

    let transcript = session.transcript();
    let room = rows.saturating_sub(lines.len() + footer.len() + 1);
    let skip = transcript.len().saturating_sub(room);
    lines.extend(transcript.messages()[skip..].iter().map(message_line));
    if !transcript.is_empty() {
        lines.push(Line::blank());
    }

    lines.extend(footer);
    lines
}

pub fn message_line(message: &Message) -> Line {
    match (message.role, message.status) {
        (Role::User, _) => Line::plain(format!("You: {}", message.text)),
        (Role::System, Status::Processing) => Line::styled(message.text.clone(), LineStyle::Dim),
        (Role::System, Status::Done) => {
            Line::styled(format!("✓ {}", message.text), LineStyle::Success)
        }
        (Role::System, Status::Failed) => {
            Line::styled(format!("✗ {}", message.text), LineStyle::Failure)
        }
        (Role::System, Status::None) => Line::plain(format!("System: {}", message.text)),
    }
}

fn border(left: char, right: char) -> String {
    let mut s = String::with_capacity(SEARCH_BOX_WIDTH * 3);
    s.push(left);
    s.extend(std::iter::repeat('─').take(SEARCH_BOX_WIDTH));
    s.push(right);
    s
}

fn boxed(content: &str) -> String {
    let width = content.chars().count();
    let padded: String = if width >= SEARCH_BOX_WIDTH {
        content.chars().take(SEARCH_BOX_WIDTH).collect()
    } else {
        format!("{content}{}", " ".repeat(SEARCH_BOX_WIDTH - width))
    };
    format!("│{padded}│")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::session::{Completion, Event, JobId, Key};
    use crate::voice::{Voice, VoiceCatalog};
    use std::sync::Arc;

    fn catalog(n: usize) -> Arc<VoiceCatalog> {
        Arc::new(VoiceCatalog::new(
            (0..n)
                .map(|i| Voice {
                    id: format!("voice-{i}"),
                    name: format!("Voice {i}"),
                    gender: if i % 2 == 0 { "Male" } else { "Female" }.to_owned(),
                    language: "English".to_owned(),
                    country: "Canada".to_owned(),
                })
                .collect(),
        ))
    }

    fn session(n: usize) -> Session {
        Session::new(catalog(n), SessionConfig::default())
    }

    fn press(s: &mut Session, key: Key) {
        s.update(Event::Key(key));
    }

    fn texts(lines: &[Line]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn selecting_view_shows_search_and_highlighted_voice() {
        let s = session(3);
        let lines = render(&s, 40);
        assert_eq!(lines[0].text, SELECT_HELP);
        assert!(lines[2].text.contains(SEARCH_PLACEHOLDER));
        assert_eq!(lines[5].text, LIST_TITLE);
        assert_eq!(lines[6], Line::styled("│ Voice 0", LineStyle::Highlight));
        assert_eq!(
            lines[7],
            Line::styled("│ Male | English | Canada", LineStyle::Highlight)
        );
        assert_eq!(lines[8].text, "  Voice 1");
        assert_eq!(lines.len(), 6 + 3 * 2, "single page has no pager");
    }

    #[test]
    fn search_box_keeps_fixed_width() {
        let mut s = session(3);
        for c in "a very long query that overflows".chars() {
            press(&mut s, Key::Char(c));
        }
        let lines = render(&s, 40);
        assert_eq!(lines[1].text.chars().count(), lines[2].text.chars().count());
        assert_eq!(lines[2].text.chars().count(), lines[3].text.chars().count());
    }

    #[test]
    fn empty_filter_shows_no_matches() {
        let mut s = session(3);
        for c in "xyz".chars() {
            press(&mut s, Key::Char(c));
        }
        let lines = render(&s, 40);
        assert_eq!(lines.last().unwrap().text, NO_MATCHES);
    }

    #[test]
    fn list_pages_follow_the_cursor() {
        let mut s = session(20);
        // 17 rows -> 5 voices per page.
        for _ in 0..7 {
            press(&mut s, Key::Down);
        }
        let lines = render(&s, 17);
        let body = texts(&lines);
        assert!(body.contains(&"  Voice 5"));
        assert!(body.contains(&"│ Voice 7"));
        assert!(!body.contains(&"  Voice 4"));
        assert_eq!(lines.last().unwrap().text, "  page 2/4 (20 voices)");
        assert!(lines.len() <= 17);
    }

    #[test]
    fn typing_view_renders_transcript_with_markers() {
        let mut s = session(2);
        press(&mut s, Key::Enter);
        for text in ["first", "second", "third"] {
            for c in text.chars() {
                press(&mut s, Key::Char(c));
            }
            press(&mut s, Key::Enter);
        }
        for (job, success) in [(0, true), (1, false)] {
            s.update(Event::JobCompleted(Completion {
                job: JobId(job),
                success,
                text: String::new(),
                path: None,
            }));
        }

        let lines = render(&s, 40);
        let body = texts(&lines);
        assert_eq!(body[0], "Selected Voice: Voice 0");
        assert_eq!(
            &body[2..8],
            &[
                "You: first",
                "✓ Generated",
                "You: second",
                "✗ Failed to generate audio",
                "You: third",
                "Processing...",
            ]
        );
        assert!(body.contains(&TEXT_PROMPT));
        assert!(body.contains(&"> Type text to speak"));
        assert_eq!(*body.last().unwrap(), TEXT_FOOTER);
    }

    #[test]
    fn transcript_is_tailed_to_fit() {
        let mut s = session(1);
        press(&mut s, Key::Enter);
        for i in 0..10 {
            press(&mut s, Key::Char(char::from(b'a' + i)));
            press(&mut s, Key::Enter);
        }
        let lines = render(&s, 12);
        assert!(lines.len() <= 12);
        let body = texts(&lines);
        assert!(body.contains(&"You: j"));
        assert!(!body.contains(&"You: a"));
        assert!(body.contains(&TEXT_PROMPT));
    }

    #[test]
    fn esc_then_reselect_restores_the_same_view() {
        let mut s = session(3);
        press(&mut s, Key::Down);
        press(&mut s, Key::Enter);
        for c in "hello".chars() {
            press(&mut s, Key::Char(c));
        }
        press(&mut s, Key::Enter);
        let before = render(&s, 40);

        for c in "draft".chars() {
            press(&mut s, Key::Char(c));
        }
        press(&mut s, Key::Esc);
        assert_eq!(s.mode(), Mode::SelectingVoice);
        press(&mut s, Key::Down);
        press(&mut s, Key::Enter);

        assert_eq!(render(&s, 40), before);
    }

    #[test]
    fn system_messages_without_status_are_labelled() {
        let message = Message {
            role: Role::System,
            text: "hi".into(),
            status: Status::None,
        };
        assert_eq!(message_line(&message).text, "System: hi");
    }
}
