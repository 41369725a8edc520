//! Console progress output
use colored::Colorize;
use keel_build::{BuildEvent, Reporter};

/// Prints build events as they happen.
///
/// Failures always go to stderr; everything else is muted in quiet mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Colored line for a progress event, `None` when muted
    fn progress_line(&self, event: &BuildEvent) -> Option<String> {
        if self.quiet {
            return None;
        }
        let line = event.to_string();
        let colored = match event {
            BuildEvent::Compiling { .. } => line.green().to_string(),
            BuildEvent::UpToDate { .. } | BuildEvent::LinkUpToDate { .. } => {
                line.dimmed().to_string()
            }
            BuildEvent::Skipped { .. } => line.yellow().to_string(),
            BuildEvent::Linking { .. } | BuildEvent::Testing { .. } => line.cyan().to_string(),
            BuildEvent::Removing { .. } => line,
            BuildEvent::Failed { .. } => return None,
        };
        Some(colored)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: &BuildEvent) {
        if let BuildEvent::Failed { .. } = event {
            eprintln!("{}", event.to_string().red().bold());
        } else if let Some(line) = self.progress_line(event) {
            println!("{line}");
        }
    }
}
