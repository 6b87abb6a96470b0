//! Console sink: writes formatted lines to stdout (or any writer), colouring
//! the `%^ … %$` range by severity.

use std::io::{self, Write};

use colored::{ColoredString, Colorize};
use parking_lot::Mutex;

use crate::logger::level::Severity;
use crate::logger::pattern::TimeMode;
use crate::logger::sink::{Record, Sink, SinkSettings};

enum Target {
    Stdout,
    Writer(Box<dyn Write + Send>),
}

/// Console destination.
pub struct ConsoleSink {
    settings: SinkSettings,
    target: Mutex<Target>,
    colorize: bool,
}

impl ConsoleSink {
    /// Sink bound to the process's stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self {
            settings: SinkSettings::default(),
            target: Mutex::new(Target::Stdout),
            colorize: true,
        }
    }

    /// Sink bound to an arbitrary writer, without colour.
    #[must_use]
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            settings: SinkSettings::default(),
            target: Mutex::new(Target::Writer(writer)),
            colorize: false,
        }
    }
}

fn paint(text: &str, level: Severity) -> ColoredString {
    match level {
        Severity::Trace => text.white(),
        Severity::Debug => text.cyan(),
        Severity::Info => text.green(),
        Severity::Warn => text.yellow().bold(),
        Severity::Error => text.red().bold(),
        Severity::Critical => text.white().bold().on_red(),
        Severity::Off => text.normal(),
    }
}

impl Sink for ConsoleSink {
    fn set_min_severity(&self, level: Severity) {
        self.settings.set_level(level);
    }

    fn min_severity(&self) -> Severity {
        self.settings.level()
    }

    fn set_pattern(&self, pattern: &str, time_mode: TimeMode) {
        self.settings.set_pattern(pattern, time_mode);
    }

    fn pattern(&self) -> String {
        self.settings.pattern()
    }

    fn write(&self, record: &Record) {
        let line = self.settings.format(record);
        let rendered = match (&line.color_range, self.colorize) {
            (Some(range), true) => format!(
                "{}{}{}",
                &line.text[..range.start],
                paint(&line.text[range.clone()], record.level),
                &line.text[range.end..]
            ),
            _ => line.text,
        };

        // Console output failures are not actionable; drop the line.
        let mut target = self.target.lock();
        let _ = match &mut *target {
            Target::Stdout => io::stdout().lock().write_all(rendered.as_bytes()),
            Target::Writer(w) => w.write_all(rendered.as_bytes()),
        };
    }

    fn flush(&self) {
        let mut target = self.target.lock();
        let _ = match &mut *target {
            Target::Stdout => io::stdout().flush(),
            Target::Writer(w) => w.flush(),
        };
    }
}
