//! Tuple-list editing driven by a scripted operator

use super::RecordingInput;
use crate::config::{ConfigStore, ACTIONS_SECTION};
use crate::editor::{capture_click, edit_tuple_list, Prompter, TupleListEditor};
use crate::errors::AutomationError;
use crate::literal::TupleEntry;
use crate::retry::RetryPolicy;
use crate::types::Point;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

/// Answers prompts from a script and keeps what was shown
struct ScriptedPrompter {
    answers: VecDeque<&'static str>,
    shown: Vec<String>,
}

impl ScriptedPrompter {
    fn new(answers: &[&'static str]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            shown: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn show(&mut self, line: &str) -> Result<(), AutomationError> {
        self.shown.push(line.to_string());
        Ok(())
    }

    fn prompt(&mut self, _message: &str, default: Option<&str>) -> Result<String, AutomationError> {
        let answer = self.answers.pop_front().ok_or_else(|| {
            AutomationError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        })?;
        Ok(match default {
            Some(default) if answer.is_empty() => default.to_string(),
            _ => answer.to_string(),
        })
    }
}

fn retry() -> RetryPolicy {
    RetryPolicy::bounded(Duration::from_millis(1), 10)
}

fn positioning_keys() -> Vec<String> {
    vec!["click".to_string(), "move_to".to_string()]
}

fn entry(key: &str, value: Option<&str>) -> TupleEntry {
    TupleEntry::new(key, value.map(str::to_string))
}

fn clicking_at(point: Point) -> RecordingInput {
    let input = RecordingInput::default();
    input.pointer.set(point);
    input
        .button_states
        .borrow_mut()
        .extend([false, false, false, true]);
    input
}

#[test]
fn test_capture_click_waits_for_press() {
    let input = clicking_at(Point::new(10, 20));
    assert_eq!(capture_click(&input, retry()).unwrap(), "10, 20");
    assert!(input.button_states.borrow().is_empty());
}

#[test]
fn test_capture_click_gives_up_when_bounded() {
    let input = RecordingInput::default();
    assert!(matches!(
        capture_click(&input, retry()),
        Err(AutomationError::Timeout(_))
    ));
}

#[test]
fn test_create_appends_entries() {
    let input = clicking_at(Point::new(10, 20));
    let keys = positioning_keys();
    let mut prompter =
        ScriptedPrompter::new(&["i", "click", "i", "write_share_size", "", "x", "q"]);

    let entries = TupleListEditor::new(&mut prompter, &input, retry(), &keys)
        .edit(None)
        .unwrap();

    assert_eq!(
        entries,
        vec![
            entry("click", Some("10, 20")),
            entry("write_share_size", None)
        ]
    );
    assert!(prompter.shown.iter().any(|line| line.contains("Click")));
}

#[test]
fn test_revise_modifies_deletes_and_inserts() {
    let input = RecordingInput::default();
    let keys = positioning_keys();
    let existing = vec![
        entry("wait_for_period", Some("1")),
        entry("beep", None),
        entry("write_share_size", None),
    ];
    let mut prompter = ScriptedPrompter::new(&[
        // 0: keep the key, change the value
        "m", "", "0.5",
        // 1: drop beep; the cursor stays on what follows
        "d",
        // 1: insert before write_share_size, then move past the new entry
        "i", "press_key", "tab", "",
        // 2: write_share_size, nothing to do
        "",
        // end of list
        "",
    ]);

    let entries = TupleListEditor::new(&mut prompter, &input, retry(), &keys)
        .edit(Some(existing))
        .unwrap();

    assert_eq!(
        entries,
        vec![
            entry("wait_for_period", Some("0.5")),
            entry("press_key", Some("tab")),
            entry("write_share_size", None),
        ]
    );
    assert_eq!(prompter.shown.last().map(String::as_str), Some("(end of list)"));
}

#[test]
fn test_insert_then_delete_restores_the_list() {
    let input = RecordingInput::default();
    let keys = positioning_keys();
    let existing = vec![
        entry("wait_for_period", Some("1")),
        entry("write_share_size", None),
    ];
    let mut prompter = ScriptedPrompter::new(&[
        // 1: insert beep, then delete it right away
        "", "i", "beep", "", "d",
        "q",
    ]);

    let entries = TupleListEditor::new(&mut prompter, &input, retry(), &keys)
        .edit(Some(existing.clone()))
        .unwrap();

    assert_eq!(entries, existing);
    let at_one: Vec<&str> = prompter
        .shown
        .iter()
        .filter(|line| line.starts_with("1: "))
        .map(String::as_str)
        .collect();
    assert_eq!(
        at_one,
        vec![
            format!("1: {}", existing[1]).as_str(),
            format!("1: {}", entry("beep", None)).as_str(),
            format!("1: {}", existing[1]).as_str(),
        ]
    );
}

#[test]
fn test_quit_keeps_earlier_edits() {
    let input = RecordingInput::default();
    let keys = positioning_keys();
    let existing = vec![entry("beep", None), entry("beep", None)];
    let mut prompter = ScriptedPrompter::new(&["d", "q"]);

    let entries = TupleListEditor::new(&mut prompter, &input, retry(), &keys)
        .edit(Some(existing))
        .unwrap();
    assert_eq!(entries, vec![entry("beep", None)]);
}

#[test]
fn test_end_of_list_only_offers_insert_and_quit() {
    let input = RecordingInput::default();
    let keys = positioning_keys();
    // "d" means nothing at the end, so the editor moves past it
    let mut prompter = ScriptedPrompter::new(&["d"]);

    let entries = TupleListEditor::new(&mut prompter, &input, retry(), &keys)
        .edit(Some(Vec::new()))
        .unwrap();
    assert!(entries.is_empty());
}

#[test]
fn test_edits_are_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.ini");
    let mut store = ConfigStore::empty(&path);
    let input = clicking_at(Point::new(300, 400));
    let keys = positioning_keys();

    let mut prompter = ScriptedPrompter::new(&["i", "move_to", "q"]);
    let mut editor = TupleListEditor::new(&mut prompter, &input, retry(), &keys);
    edit_tuple_list(&mut store, ACTIONS_SECTION, "focus", &mut editor).unwrap();

    let saved = ConfigStore::load(&path).unwrap();
    assert_eq!(
        saved.tuple_list(ACTIONS_SECTION, "focus").unwrap(),
        Some(vec![entry("move_to", Some("300, 400"))])
    );
}

#[test]
fn test_emptied_option_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.ini");
    let mut store = ConfigStore::empty(&path);
    store.set_tuple_list(ACTIONS_SECTION, "beep", &[entry("beep", None)]);
    store.set_tuple_list(ACTIONS_SECTION, "keep", &[entry("beep", None)]);
    store.save().unwrap();
    let input = RecordingInput::default();
    let keys = positioning_keys();

    let mut prompter = ScriptedPrompter::new(&["d", "q"]);
    let mut editor = TupleListEditor::new(&mut prompter, &input, retry(), &keys);
    edit_tuple_list(&mut store, ACTIONS_SECTION, "beep", &mut editor).unwrap();

    let saved = ConfigStore::load(&path).unwrap();
    assert!(!saved.contains(ACTIONS_SECTION, "beep"));
    assert_eq!(saved.action_names(), vec!["keep"]);
}
