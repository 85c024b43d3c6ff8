//! Live console output for a streaming session
//!
//! The thinking trace is printed dimmed under a "Thinking" header, the answer
//! follows in plain text. Only the growth since the previous snapshot is
//! written, so the terminal shows the response as it arrives.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thinkstream_application::StreamObserver;
use thinkstream_domain::{SessionId, StreamPhase, StreamSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Thinking,
    Answer,
}

/// Turns successive snapshots into the text to append to the terminal.
#[derive(Debug)]
pub struct LiveRenderer {
    colored: bool,
    session: Option<SessionId>,
    section: Section,
    thoughts_shown: usize,
    answer_shown: usize,
    finished: bool,
}

impl LiveRenderer {
    pub fn new() -> Self {
        Self {
            colored: true,
            session: None,
            section: Section::None,
            thoughts_shown: 0,
            answer_shown: 0,
            finished: false,
        }
    }

    /// Disable colors
    pub fn without_colors(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Text to append for `snapshot`.
    pub fn render(&mut self, snapshot: &StreamSnapshot) -> String {
        if snapshot.session != self.session {
            self.restart(snapshot.session);
        }
        if self.finished {
            return String::new();
        }

        let mut out = String::new();

        // Text only ever grows unless the heuristic was re-evaluated.
        let rewound = snapshot.thoughts.len() < self.thoughts_shown
            || snapshot.answer.len() < self.answer_shown
            || !snapshot.thoughts.is_char_boundary(self.thoughts_shown)
            || !snapshot.answer.is_char_boundary(self.answer_shown);
        if rewound {
            out.push('\n');
            out.push_str(&self.style_note("(output reclassified)"));
            out.push('\n');
            self.section = Section::None;
            self.thoughts_shown = 0;
            self.answer_shown = 0;
        }

        let new_thoughts = &snapshot.thoughts[self.thoughts_shown..];
        if !new_thoughts.is_empty() && self.section != Section::Answer {
            if self.section == Section::None {
                out.push_str(&self.style_header("Thinking"));
                out.push('\n');
                self.section = Section::Thinking;
            }
            out.push_str(&self.style_thought(new_thoughts));
            self.thoughts_shown = snapshot.thoughts.len();
        }

        let new_answer = &snapshot.answer[self.answer_shown..];
        if !new_answer.is_empty() {
            if self.section == Section::Thinking {
                out.push_str("\n\n");
                out.push_str(&self.style_header("Answer"));
                out.push('\n');
            }
            self.section = Section::Answer;
            out.push_str(new_answer);
            self.answer_shown = snapshot.answer.len();
        }

        if snapshot.phase.is_terminal() {
            self.finished = true;
            if self.section != Section::None {
                out.push('\n');
            }
        }

        out
    }

    fn restart(&mut self, session: Option<SessionId>) {
        self.session = session;
        self.section = Section::None;
        self.thoughts_shown = 0;
        self.answer_shown = 0;
        self.finished = false;
    }

    fn style_header(&self, title: &str) -> String {
        if self.colored {
            format!("── {} ──", title).cyan().bold().to_string()
        } else {
            format!("── {} ──", title)
        }
    }

    fn style_thought(&self, text: &str) -> String {
        if self.colored {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn style_note(&self, text: &str) -> String {
        if self.colored {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }
}

impl Default for LiveRenderer {
    fn default() -> Self {
        Self::new()
    }
}

struct ConsoleState {
    renderer: LiveRenderer,
    spinner: Option<ProgressBar>,
}

/// Prints snapshots to stdout as they are published
///
/// While the session is connecting a spinner is shown on stderr (unless
/// quiet). Errors are reported on stderr.
pub struct ConsoleObserver {
    state: Mutex<ConsoleState>,
    show_progress: bool,
    target: String,
}

impl ConsoleObserver {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(ConsoleState {
                renderer: LiveRenderer::new(),
                spinner: None,
            }),
            show_progress: true,
            target: target.into(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_spinner(&self) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::spinner_style());
        pb.set_message(format!("Waiting for {}", self.target));
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl StreamObserver for ConsoleObserver {
    fn on_snapshot(&self, snapshot: &StreamSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let text = state.renderer.render(snapshot);
        let waiting = snapshot.phase == StreamPhase::Connecting && text.is_empty();

        if waiting {
            if self.show_progress && state.spinner.is_none() {
                state.spinner = Some(self.start_spinner());
            }
            return;
        }
        if let Some(pb) = state.spinner.take() {
            pb.finish_and_clear();
        }

        if !text.is_empty() {
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        }

        if snapshot.phase == StreamPhase::Errored {
            let cause = snapshot.error.as_deref().unwrap_or("unknown error");
            eprintln!("{} {}", "Error:".red().bold(), cause);
        }
    }
}
