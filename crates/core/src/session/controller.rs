use crate::config::SessionConfig;
use crate::session::{
    Completion, Effect, Event, JobId, JobRequest, Key, Message, Mode, TextInput, Transcript,
    LOG_TARGET,
};
use crate::voice::{Voice, VoiceCatalog};
use std::collections::BTreeMap;
use std::sync::Arc;

const SEARCH_CHAR_LIMIT: usize = 32;
const TEXT_CHAR_LIMIT: usize = 10_000;

pub struct Session {
    catalog: Arc<VoiceCatalog>,
    config: SessionConfig,
    mode: Mode,
    search: TextInput,
    filtered: Vec<usize>,
    cursor: usize,
    selected: Option<usize>,
    input: TextInput,
    transcript: Transcript,
    // job -> index of its placeholder in the transcript
    pending: BTreeMap<JobId, usize>,
    next_job: u64,
}

impl Session {
    pub fn new(catalog: Arc<VoiceCatalog>, config: SessionConfig) -> Self {
        let filtered = catalog.filter("");
        Self {
            catalog,
            config,
            mode: Mode::SelectingVoice,
            search: TextInput::new(SEARCH_CHAR_LIMIT),
            filtered,
            cursor: 0,
            selected: None,
            input: TextInput::new(TEXT_CHAR_LIMIT),
            transcript: Transcript::default(),
            pending: BTreeMap::new(),
            next_job: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        self.search.value()
    }

    pub fn input(&self) -> &str {
        self.input.value()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn pending_jobs(&self) -> usize {
        self.pending.len()
    }

    pub fn filtered_voices(&self) -> impl Iterator<Item = &Voice> {
        self.filtered.iter().filter_map(|&i| self.catalog.get(i))
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered.len()
    }

    pub fn highlighted_voice(&self) -> Option<&Voice> {
        self.filtered
            .get(self.cursor)
            .and_then(|&i| self.catalog.get(i))
    }

    pub fn selected_voice(&self) -> Option<&Voice> {
        self.selected.and_then(|i| self.catalog.get(i))
    }

    /// Applies one event. Effects are returned for the caller to run.
    pub fn update(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Key(Key::CtrlC) => vec![Effect::Quit],
            Event::Key(key) => match self.mode {
                Mode::SelectingVoice => {
                    self.on_selecting_key(key);
                    Vec::new()
                }
                Mode::TypingText => self.on_typing_key(key),
                Mode::Processing => Vec::new(),
            },
            Event::Tick => Vec::new(),
            Event::JobCompleted(completion) => {
                self.on_completion(completion);
                Vec::new()
            }
        }
    }

    fn on_selecting_key(&mut self, key: Key) {
        match key {
            Key::Up => self.cursor = self.cursor.saturating_sub(1),
            Key::Down => {
                if self.cursor + 1 < self.filtered.len() {
                    self.cursor += 1;
                }
            }
            Key::Esc => {
                self.search.clear();
                self.refilter();
            }
            Key::Enter => {
                if let Some(voice) = self.highlighted_voice() {
                    tracing::debug!(target: LOG_TARGET, voice = %voice.name, "voice selected");
                    self.selected = self.filtered.get(self.cursor).copied();
                    self.mode = Mode::TypingText;
                }
            }
            Key::Char(c) => {
                if self.search.insert(c) {
                    self.refilter();
                }
            }
            Key::Backspace => {
                if self.search.backspace() {
                    self.refilter();
                }
            }
            Key::CtrlC => {}
        }
    }

    fn on_typing_key(&mut self, key: Key) -> Vec<Effect> {
        match key {
            Key::Esc => {
                self.input.clear();
                self.search.clear();
                self.refilter();
                self.cursor = 0;
                self.mode = Mode::SelectingVoice;
                Vec::new()
            }
            Key::Enter => self.submit(),
            Key::Char(c) => {
                self.input.insert(c);
                Vec::new()
            }
            Key::Backspace => {
                self.input.backspace();
                Vec::new()
            }
            Key::Up | Key::Down | Key::CtrlC => Vec::new(),
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        let text = self.input.take();
        if text.trim().is_empty() {
            return Vec::new();
        }
        let Some(voice_name) = self.selected_voice().map(|v| v.name.clone()) else {
            return Vec::new();
        };

        self.transcript.push(Message::user(text.clone()));
        let placeholder = self.transcript.push(Message::processing());

        let job = JobId(self.next_job);
        self.next_job += 1;
        self.pending.insert(job, placeholder);

        if self.config.lock_input_while_processing {
            self.mode = Mode::Processing;
        }

        tracing::debug!(target: LOG_TARGET, %job, voice = %voice_name, "dispatching synthesis");
        vec![Effect::Synthesize(JobRequest {
            job,
            text,
            voice_name,
            out_path: self.config.temp_audio_path.clone(),
        })]
    }

    fn on_completion(&mut self, completion: Completion) {
        let index = match self.pending.remove(&completion.job) {
            Some(index) => Some(index),
            None => {
                // Unknown token: take the newest placeholder no live job owns.
                let owned: Vec<usize> = self.pending.values().copied().collect();
                self.transcript
                    .last_pending_where(|i| !owned.contains(&i))
            }
        };

        match index {
            Some(index) if self.transcript.resolve(index, completion.success) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    job = %completion.job,
                    success = completion.success,
                    "transcript updated"
                );
            }
            _ => {
                tracing::warn!(
                    target: LOG_TARGET,
                    job = %completion.job,
                    "completion has no pending placeholder; ignoring"
                );
            }
        }

        if self.mode == Mode::Processing && self.pending.is_empty() {
            self.mode = Mode::TypingText;
        }
    }

    fn refilter(&mut self) {
        self.filtered = self.catalog.filter(self.search.value());
        if self.cursor >= self.filtered.len() {
            self.cursor = self.filtered.len().saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Status, DONE_TEXT, FAILED_TEXT, PROCESSING_TEXT};
    use std::path::PathBuf;

    fn voice(id: &str, name: &str, gender: &str) -> Voice {
        Voice {
            id: id.to_owned(),
            name: name.to_owned(),
            gender: gender.to_owned(),
            language: "English".to_owned(),
            country: "United States".to_owned(),
        }
    }

    fn catalog() -> Arc<VoiceCatalog> {
        Arc::new(VoiceCatalog::new(vec![
            voice("voice-1", "Andrew Multilingual", "Male"),
            voice("voice-2", "Emma Multilingual", "Female"),
            voice("voice-3", "Guy", "Male"),
        ]))
    }

    fn config() -> SessionConfig {
        SessionConfig {
            temp_audio_path: PathBuf::from("/tmp/talkback-test/generated.mp3"),
            lock_input_while_processing: false,
        }
    }

    fn session() -> Session {
        Session::new(catalog(), config())
    }

    fn press(s: &mut Session, key: Key) -> Vec<Effect> {
        s.update(Event::Key(key))
    }

    fn type_str(s: &mut Session, text: &str) {
        for c in text.chars() {
            press(s, Key::Char(c));
        }
    }

    fn typing_session() -> Session {
        let mut s = session();
        press(&mut s, Key::Enter);
        assert_eq!(s.mode(), Mode::TypingText);
        s
    }

    fn submit(s: &mut Session, text: &str) -> JobRequest {
        type_str(s, text);
        let mut effects = press(s, Key::Enter);
        assert_eq!(effects.len(), 1);
        match effects.remove(0) {
            Effect::Synthesize(request) => request,
            other => panic!("unexpected effect {other:?}"),
        }
    }

    fn complete(s: &mut Session, job: JobId, success: bool) {
        s.update(Event::JobCompleted(Completion {
            job,
            success,
            text: String::new(),
            path: success.then(|| config().temp_audio_path),
        }));
    }

    #[test]
    fn starts_selecting_with_full_catalog() {
        let s = session();
        assert_eq!(s.mode(), Mode::SelectingVoice);
        assert_eq!(s.filtered_len(), 3);
        assert_eq!(s.cursor(), 0);
        assert!(s.selected_voice().is_none());
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let mut s = session();
        assert_eq!(press(&mut s, Key::CtrlC), vec![Effect::Quit]);
        press(&mut s, Key::Enter);
        assert_eq!(press(&mut s, Key::CtrlC), vec![Effect::Quit]);

        let mut locked = Session::new(
            catalog(),
            SessionConfig {
                lock_input_while_processing: true,
                ..config()
            },
        );
        press(&mut locked, Key::Enter);
        submit(&mut locked, "hi");
        assert_eq!(locked.mode(), Mode::Processing);
        assert_eq!(press(&mut locked, Key::CtrlC), vec![Effect::Quit]);
    }

    #[test]
    fn typing_filters_the_list() {
        let mut s = session();
        type_str(&mut s, "multi");
        assert_eq!(s.filtered_len(), 2);

        for _ in 0..5 {
            press(&mut s, Key::Backspace);
        }
        type_str(&mut s, "ANDREW");
        let names: Vec<&str> = s.filtered_voices().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Andrew Multilingual"]);

        for _ in 0..6 {
            press(&mut s, Key::Backspace);
        }
        type_str(&mut s, "xyz");
        assert_eq!(s.filtered_len(), 0);
        press(&mut s, Key::Enter);
        assert_eq!(s.mode(), Mode::SelectingVoice, "nothing to select");
    }

    #[test]
    fn arrows_move_cursor_within_bounds() {
        let mut s = session();
        press(&mut s, Key::Up);
        assert_eq!(s.cursor(), 0);
        for _ in 0..10 {
            press(&mut s, Key::Down);
        }
        assert_eq!(s.cursor(), 2);
        press(&mut s, Key::Up);
        assert_eq!(s.highlighted_voice().unwrap().name, "Emma Multilingual");
    }

    #[test]
    fn letters_do_not_navigate() {
        let mut s = session();
        press(&mut s, Key::Char('j'));
        press(&mut s, Key::Char('k'));
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.query(), "jk");
    }

    #[test]
    fn cursor_is_clamped_when_filter_shrinks() {
        let mut s = session();
        press(&mut s, Key::Down);
        press(&mut s, Key::Down);
        type_str(&mut s, "andrew");
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.highlighted_voice().unwrap().name, "Andrew Multilingual");
    }

    #[test]
    fn esc_clears_query_and_restores_catalog() {
        let mut s = session();
        type_str(&mut s, "emma");
        assert_eq!(s.filtered_len(), 1);
        press(&mut s, Key::Esc);
        assert_eq!(s.query(), "");
        assert_eq!(s.filtered_len(), 3);
        assert_eq!(s.mode(), Mode::SelectingVoice);
    }

    #[test]
    fn enter_selects_highlighted_voice() {
        let mut s = session();
        type_str(&mut s, "female");
        press(&mut s, Key::Enter);
        assert_eq!(s.mode(), Mode::TypingText);
        assert_eq!(s.selected_voice().unwrap().name, "Emma Multilingual");
    }

    #[test]
    fn submit_appends_two_messages_and_dispatches() {
        let mut s = typing_session();
        let request = submit(&mut s, "Hello world");

        assert_eq!(request.text, "Hello world");
        assert_eq!(request.voice_name, "Andrew Multilingual");
        assert_eq!(request.out_path, config().temp_audio_path);
        assert_eq!(s.input(), "");
        assert_eq!(s.mode(), Mode::TypingText);

        let messages = s.transcript().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], Message::user("Hello world"));
        assert_eq!(messages[1].status, Status::Processing);
        assert_eq!(messages[1].text, PROCESSING_TEXT);
        assert_eq!(s.pending_jobs(), 1);
    }

    #[test]
    fn submitted_text_is_kept_untrimmed() {
        let mut s = typing_session();
        let request = submit(&mut s, "  padded  ");
        assert_eq!(request.text, "  padded  ");
        assert_eq!(s.transcript().messages()[0].text, "  padded  ");
    }

    #[test]
    fn blank_submissions_are_ignored_but_clear_input() {
        for text in ["", " ", "   ", "\u{3000}"] {
            let mut s = typing_session();
            type_str(&mut s, text);
            assert!(press(&mut s, Key::Enter).is_empty());
            assert!(s.transcript().is_empty());
            assert_eq!(s.pending_jobs(), 0);
            assert_eq!(s.input(), "");
        }
    }

    #[test]
    fn every_nonblank_submission_appends_exactly_two() {
        let mut s = typing_session();
        for (n, text) in ["a", " b", "c ", "hello there", "ünïcödé"].iter().enumerate() {
            submit(&mut s, text);
            assert_eq!(s.transcript().len(), 2 * (n + 1));
            let messages = s.transcript().messages();
            assert_eq!(messages[2 * n], Message::user(*text));
            assert!(messages[2 * n + 1].is_pending());
        }
    }

    #[test]
    fn successful_completion_marks_done() {
        let mut s = typing_session();
        let request = submit(&mut s, "Hello world");
        complete(&mut s, request.job, true);

        let last = s.transcript().last().unwrap();
        assert_eq!(last.status, Status::Done);
        assert_eq!(last.text, DONE_TEXT);
        assert_eq!(s.pending_jobs(), 0);
        assert_eq!(s.mode(), Mode::TypingText);
    }

    #[test]
    fn failed_completion_marks_failed() {
        let mut s = typing_session();
        let request = submit(&mut s, "Hello world");
        complete(&mut s, request.job, false);

        let last = s.transcript().last().unwrap();
        assert_eq!(last.status, Status::Failed);
        assert_eq!(last.text, FAILED_TEXT);
        assert_eq!(s.transcript().messages()[0], Message::user("Hello world"));
    }

    #[test]
    fn double_submission_routes_completions_by_job() {
        let mut s = typing_session();
        let first = submit(&mut s, "one");
        let second = submit(&mut s, "two");
        assert_eq!(s.pending_jobs(), 2);
        assert_ne!(first.job, second.job);

        // The first job completes while the second is still in flight.
        complete(&mut s, first.job, false);
        let messages = s.transcript().messages();
        assert_eq!(messages[1].status, Status::Failed);
        assert_eq!(messages[3].status, Status::Processing);

        complete(&mut s, second.job, true);
        let messages = s.transcript().messages();
        assert_eq!(messages[1].status, Status::Failed);
        assert_eq!(messages[3].status, Status::Done);
    }

    #[test]
    fn double_submission_in_arrival_order() {
        let mut s = typing_session();
        let first = submit(&mut s, "one");
        let second = submit(&mut s, "two");

        complete(&mut s, second.job, true);
        complete(&mut s, first.job, true);
        let statuses: Vec<Status> = s.transcript().messages().iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![Status::None, Status::Done, Status::None, Status::Done]
        );
    }

    #[test]
    fn completions_never_rewrite_finished_messages() {
        let mut s = typing_session();
        let request = submit(&mut s, "one");
        complete(&mut s, request.job, true);
        let before = s.transcript().clone();

        // Duplicate and stray completions find nothing pending.
        complete(&mut s, request.job, false);
        complete(&mut s, JobId(999), false);
        assert_eq!(s.transcript(), &before);
    }

    #[test]
    fn unknown_job_falls_back_to_newest_unowned_placeholder() {
        let mut s = typing_session();
        let first = submit(&mut s, "one");
        let second = submit(&mut s, "two");
        // Simulate a lost token for the second job.
        s.pending.remove(&second.job);

        complete(&mut s, JobId(42), true);
        let messages = s.transcript().messages();
        assert_eq!(messages[3].status, Status::Done);
        assert_eq!(messages[1].status, Status::Processing, "still owned by first job");

        complete(&mut s, first.job, true);
        assert_eq!(s.transcript().messages()[1].status, Status::Done);
    }

    #[test]
    fn completion_while_selecting_updates_without_mode_change() {
        let mut s = typing_session();
        let request = submit(&mut s, "one");
        press(&mut s, Key::Esc);
        complete(&mut s, request.job, true);
        assert_eq!(s.mode(), Mode::SelectingVoice);
        assert_eq!(s.transcript().last().unwrap().status, Status::Done);
    }

    #[test]
    fn locked_session_ignores_keys_until_completion() {
        let mut s = Session::new(
            catalog(),
            SessionConfig {
                lock_input_while_processing: true,
                ..config()
            },
        );
        press(&mut s, Key::Enter);
        let request = submit(&mut s, "one");
        assert_eq!(s.mode(), Mode::Processing);

        type_str(&mut s, "more");
        assert!(press(&mut s, Key::Enter).is_empty());
        press(&mut s, Key::Esc);
        assert_eq!(s.input(), "");
        assert_eq!(s.mode(), Mode::Processing);
        assert_eq!(s.transcript().len(), 2);

        complete(&mut s, request.job, true);
        assert_eq!(s.mode(), Mode::TypingText);
        type_str(&mut s, "x");
        assert_eq!(s.input(), "x");
    }

    #[test]
    fn esc_from_typing_discards_text_and_resets_list() {
        let mut s = session();
        press(&mut s, Key::Down);
        type_str(&mut s, "multi");
        press(&mut s, Key::Enter);
        assert_eq!(s.selected_voice().unwrap().name, "Emma Multilingual");

        type_str(&mut s, "draft");
        press(&mut s, Key::Esc);
        assert_eq!(s.mode(), Mode::SelectingVoice);
        assert_eq!(s.input(), "");
        assert_eq!(s.query(), "");
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.filtered_len(), 3);
        // Selection survives until the next confirm.
        assert_eq!(s.selected_voice().unwrap().name, "Emma Multilingual");
    }

    #[test]
    fn transcript_persists_across_voice_changes() {
        let mut s = typing_session();
        submit(&mut s, "one");
        press(&mut s, Key::Esc);
        press(&mut s, Key::Down);
        press(&mut s, Key::Enter);
        assert_eq!(s.selected_voice().unwrap().name, "Emma Multilingual");
        assert_eq!(s.transcript().len(), 2);
        let request = submit(&mut s, "two");
        assert_eq!(request.voice_name, "Emma Multilingual");
    }

    #[test]
    fn ticks_change_nothing() {
        let mut s = typing_session();
        type_str(&mut s, "abc");
        assert!(s.update(Event::Tick).is_empty());
        assert_eq!(s.input(), "abc");
        assert_eq!(s.mode(), Mode::TypingText);
    }
}
