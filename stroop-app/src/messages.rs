//! Info screen texts. A messages directory holds one file per screen:
//! `training<n>.txt`, `instruction.txt`, `break<n>.txt` and `end.txt`. The
//! key instructions replace every `<--insert-->` marker.

use std::path::PathBuf;

use stroop_experiment::InfoScreen;

const INSERT_MARKER: &str = "<--insert-->";

#[derive(Debug, Clone, Default)]
pub struct Messages {
    dir: Option<PathBuf>,
}

impl Messages {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Text for `screen`, falling back to the built-in one when the file is
    /// missing or unreadable.
    pub fn text(&self, screen: InfoScreen, insert: &str) -> String {
        let Some(dir) = &self.dir else {
            return builtin(screen, insert);
        };
        let path = dir.join(file_name(screen));
        match std::fs::read_to_string(&path) {
            Ok(raw) => raw.replace(INSERT_MARKER, insert),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "message file unreadable, using built-in text"
                );
                builtin(screen, insert)
            }
        }
    }
}

pub fn file_name(screen: InfoScreen) -> String {
    match screen {
        InfoScreen::Training(n) => format!("training{n}.txt"),
        InfoScreen::Instruction => "instruction.txt".to_string(),
        InfoScreen::Break(n) => format!("break{n}.txt"),
        InfoScreen::End => "end.txt".to_string(),
    }
}

pub fn builtin(screen: InfoScreen, insert: &str) -> String {
    match screen {
        InfoScreen::Training(n) => {
            format!("Trening, część {n}\n\nNaciśnij:\n{insert}\nSpacja - rozpocznij")
        }
        InfoScreen::Instruction => format!(
            "Teraz rozpocznie się właściwe badanie.\n\n\
             Naciśnij:\n{insert}\nSpacja - rozpocznij"
        ),
        InfoScreen::Break(n) => {
            format!("Koniec części {n}. Odpocznij chwilę.\n\nSpacja - kontynuuj")
        }
        InfoScreen::End => "Dziękujemy za udział w badaniu.\n\nSpacja - zakończ".to_string(),
    }
}
