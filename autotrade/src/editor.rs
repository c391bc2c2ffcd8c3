//! Interactive editing of tuple-list options such as action scripts

use crate::config::ConfigStore;
use crate::errors::AutomationError;
use crate::literal::TupleEntry;
use crate::platforms::InputDriver;
use crate::retry::RetryPolicy;
use crate::types::MouseButton;
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

/// Line-oriented operator dialogue
pub trait Prompter {
    fn show(&mut self, line: &str) -> Result<(), AutomationError>;

    /// Reads one line. Empty input returns `default` when there is one.
    fn prompt(&mut self, message: &str, default: Option<&str>) -> Result<String, AutomationError>;
}

/// Talks to the operator over stdin/stdout
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn show(&mut self, line: &str) -> Result<(), AutomationError> {
        println!("{line}");
        Ok(())
    }

    fn prompt(&mut self, message: &str, default: Option<&str>) -> Result<String, AutomationError> {
        let mut stdout = io::stdout().lock();
        match default {
            Some(default) => write!(stdout, "{message} [{default}]: ")?,
            None => write!(stdout, "{message}: ")?,
        }
        stdout.flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(AutomationError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed",
            )));
        }
        let line = line.trim();
        Ok(match default {
            Some(default) if line.is_empty() => default.to_string(),
            _ => line.to_string(),
        })
    }
}

/// One mnemonic per option: its first character, lowercased.
///
/// Options sharing a first character have no mnemonic that tells them apart.
pub fn build_mnemonics(options: &[&str]) -> Result<Vec<char>, AutomationError> {
    let mut mnemonics: Vec<char> = Vec::with_capacity(options.len());
    for option in options {
        let mnemonic = option
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
            .ok_or_else(|| AutomationError::UndeterminedMnemonics(format!("{options:?}")))?;
        if mnemonics.contains(&mnemonic) {
            return Err(AutomationError::UndeterminedMnemonics(format!("{options:?}")));
        }
        mnemonics.push(mnemonic);
    }
    Ok(mnemonics)
}

/// A one-line menu such as `[i]nsert, [q]uit`
#[derive(Debug)]
pub struct Menu<'o> {
    options: &'o [&'o str],
    mnemonics: Vec<char>,
}

impl<'o> Menu<'o> {
    pub fn new(options: &'o [&'o str]) -> Result<Self, AutomationError> {
        Ok(Self {
            options,
            mnemonics: build_mnemonics(options)?,
        })
    }

    pub fn prompt_text(&self) -> String {
        self.options
            .iter()
            .map(|option| {
                let mut chars = option.chars();
                let first = chars.next().unwrap_or_default();
                format!("[{first}]{}", chars.as_str())
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The option whose mnemonic starts `input`, ignoring case.
    pub fn choose(&self, input: &str) -> Option<&'o str> {
        let typed = input.trim().chars().next()?.to_ascii_lowercase();
        self.mnemonics
            .iter()
            .position(|mnemonic| *mnemonic == typed)
            .map(|i| self.options[i])
    }
}

const INSERT: &str = "insert";
const MODIFY: &str = "modify";
const DELETE: &str = "delete";
const QUIT: &str = "quit";

/// Blocks until the primary button goes down, then reports the pointer as `x, y`.
pub fn capture_click(input: &dyn InputDriver, retry: RetryPolicy) -> Result<String, AutomationError> {
    let primary = MouseButton::Left.honoring_swap(input.buttons_swapped());
    let initially_down = input.button_down(primary)?;
    if initially_down {
        retry.retry("primary button release", || {
            Ok((!input.button_down(primary)?).then_some(()))
        })?;
    }
    retry.retry("click", || Ok(input.button_down(primary)?.then_some(())))?;
    let position = input.pointer_position()?;
    debug!("Captured click at {}", position);
    Ok(position.to_string())
}

pub struct TupleListEditor<'a> {
    prompter: &'a mut dyn Prompter,
    input: &'a dyn InputDriver,
    retry: RetryPolicy,
    positioning_keys: &'a [String],
}

impl<'a> TupleListEditor<'a> {
    pub fn new(
        prompter: &'a mut dyn Prompter,
        input: &'a dyn InputDriver,
        retry: RetryPolicy,
        positioning_keys: &'a [String],
    ) -> Self {
        Self {
            prompter,
            input,
            retry,
            positioning_keys,
        }
    }

    /// Runs the dialogue over `existing` (`None` creates a new list) and
    /// returns the edited list.
    pub fn edit(
        &mut self,
        existing: Option<Vec<TupleEntry>>,
    ) -> Result<Vec<TupleEntry>, AutomationError> {
        match existing {
            None => self.create(),
            Some(entries) => self.revise(entries),
        }
    }

    fn create(&mut self) -> Result<Vec<TupleEntry>, AutomationError> {
        let options = [INSERT, QUIT];
        let menu = Menu::new(&options)?;
        let mut entries = Vec::new();
        loop {
            let answer = self.prompter.prompt(&menu.prompt_text(), None)?;
            match menu.choose(&answer) {
                Some(INSERT) => {
                    let entry = self.read_entry(None)?;
                    entries.push(entry);
                }
                Some(_) => break,
                None => continue,
            }
        }
        Ok(entries)
    }

    fn revise(&mut self, mut entries: Vec<TupleEntry>) -> Result<Vec<TupleEntry>, AutomationError> {
        let full = [INSERT, MODIFY, DELETE, QUIT];
        let at_end = [INSERT, QUIT];
        let full_menu = Menu::new(&full)?;
        let end_menu = Menu::new(&at_end)?;

        let mut cursor = 0;
        while cursor <= entries.len() {
            let menu = if cursor == entries.len() {
                self.prompter.show("(end of list)")?;
                &end_menu
            } else {
                self.prompter.show(&format!("{}: {}", cursor, entries[cursor]))?;
                &full_menu
            };

            let answer = self.prompter.prompt(&menu.prompt_text(), None)?;
            match menu.choose(&answer) {
                Some(INSERT) => {
                    // The cursor stays on the new entry
                    let entry = self.read_entry(None)?;
                    entries.insert(cursor, entry);
                    continue;
                }
                Some(MODIFY) => {
                    let current = entries[cursor].clone();
                    entries[cursor] = self.read_entry(Some(&current))?;
                }
                Some(DELETE) => {
                    let removed = entries.remove(cursor);
                    debug!("Deleted {}", removed);
                    continue;
                }
                Some(_) => break,
                None => {}
            }
            cursor += 1;
        }
        Ok(entries)
    }

    fn read_entry(&mut self, current: Option<&TupleEntry>) -> Result<TupleEntry, AutomationError> {
        let key = loop {
            let key = self
                .prompter
                .prompt("key", current.map(|entry| entry.key.as_str()))?;
            if !key.trim().is_empty() {
                break key.trim().to_string();
            }
        };

        if self.positioning_keys.iter().any(|positioning| *positioning == key) {
            self.prompter.show("Click the target position")?;
            let position = capture_click(self.input, self.retry)?;
            return Ok(TupleEntry::new(key, Some(position)));
        }

        let previous = current.and_then(|entry| entry.value.as_deref());
        let value = self.prompter.prompt("value", previous)?;
        Ok(TupleEntry::from_input(key, &value))
    }
}

/// Edits `[section] option` and persists the store. An emptied list removes
/// the option.
pub fn edit_tuple_list(
    store: &mut ConfigStore,
    section: &str,
    option: &str,
    editor: &mut TupleListEditor<'_>,
) -> Result<(), AutomationError> {
    let existing = store.tuple_list(section, option)?;
    let entries = editor.edit(existing)?;
    if entries.is_empty() {
        store.remove(section, option);
        info!("Removed empty [{}] {}", section, option);
    } else {
        store.set_tuple_list(section, option, &entries);
    }
    store.save()
}
