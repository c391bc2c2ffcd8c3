use autotrade::config::{ACTIONS_SECTION, GENERAL_SECTION};
use autotrade::{Action, Command, ConfigStore, Key, Point, Settings, TupleEntry};
use std::time::Duration;

fn entry(key: &str, value: Option<&str>) -> TupleEntry {
    TupleEntry::new(key, value.map(str::to_string))
}

#[test]
fn test_actions_survive_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autotrade").join("config.ini");
    let entries = vec![
        entry("get_symbol", Some(r"\((\d{4})\) 個別チャート")),
        entry("click", Some("(10, 20)")),
        entry("press_key", Some("tab, 2")),
        entry("wait_for_period", Some("0.5")),
        entry("write_share_size", None),
    ];

    let mut store = ConfigStore::empty(&path);
    store.set_tuple_list(ACTIONS_SECTION, "buy", &entries);
    store.set(GENERAL_SECTION, "trading_unit", "1");
    store.save().unwrap();

    let loaded = ConfigStore::load(&path).unwrap();
    assert_eq!(
        loaded.tuple_list(ACTIONS_SECTION, "buy").unwrap(),
        Some(entries)
    );

    let action = Action::load(&loaded, "buy").unwrap();
    assert_eq!(action.commands.len(), 5);
    assert_eq!(action.commands[1], Command::Click(Some(Point::new(10, 20))));
    assert_eq!(
        action.commands[2],
        Command::PressKey {
            key: Key::Tab,
            presses: 2
        }
    );
    assert_eq!(
        action.commands[3],
        Command::WaitForPeriod(Duration::from_millis(500))
    );
    assert_eq!(action.commands[4], Command::WriteShareSize);
    assert_eq!(Settings::from_store(&loaded).unwrap().trading_unit, 1);
}

#[test]
fn test_hand_edited_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.ini");
    std::fs::write(
        &path,
        "[General]\n\
         utilization_ratio = 0.5\n\
         positioning_keys = ['click', 'move_to', 'back_to']\n\
         ocr_color_key = 220, 30, 30\n\
         \n\
         [Actions]\n\
         sell = [(\"press_hotkeys\", \"alt, s\"), ('beep', None)]\n\
         chart = [('get_symbol', '\\((\\d{4})\\) 個別チャート'), ('click_widget', 'C:\\img\\ok.png, 0, 0, 200, 100')]\n",
    )
    .unwrap();

    let store = ConfigStore::load(&path).unwrap();
    let settings = Settings::from_store(&store).unwrap();
    assert_eq!(settings.utilization_ratio, 0.5);
    assert_eq!(settings.positioning_keys.len(), 3);
    assert_eq!(settings.ocr.color_key, Some([220, 30, 30]));

    let action = Action::load(&store, "sell").unwrap();
    assert_eq!(
        action.commands,
        vec![
            Command::PressHotkeys(vec![Key::Alt, Key::Char('s')]),
            Command::Beep
        ]
    );

    let chart = Action::load(&store, "chart").unwrap();
    match &chart.commands[0] {
        Command::GetSymbol(pattern) => {
            assert_eq!(pattern.as_str(), r"\((\d{4})\) 個別チャート");
            assert_eq!(
                pattern.capture("(7203) 個別チャート").as_deref(),
                Some("7203")
            );
        }
        other => panic!("unexpected {other:?}"),
    }
    match &chart.commands[1] {
        Command::ClickWidget { image, .. } => {
            assert_eq!(image, &std::path::PathBuf::from(r"C:\img\ok.png"))
        }
        other => panic!("unexpected {other:?}"),
    }

    // Saving keeps the backslashes for the next load
    store.save().unwrap();
    assert_eq!(
        ConfigStore::load(&path).unwrap().get(ACTIONS_SECTION, "chart"),
        store.get(ACTIONS_SECTION, "chart")
    );
}

#[test]
fn test_unknown_actions_and_commands() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = ConfigStore::empty(dir.path().join("config.ini"));
    assert!(Action::load(&store, "missing").is_err());

    store.set(ACTIONS_SECTION, "broken", "[('jump', '3')]");
    let error = Action::load(&store, "broken").unwrap_err();
    assert!(error.to_string().contains("command 0"));
}

#[test]
fn test_delete_action_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.ini");
    let mut store = ConfigStore::empty(&path);
    store.set_tuple_list(ACTIONS_SECTION, "buy", &[entry("beep", None)]);
    store.set_tuple_list(ACTIONS_SECTION, "sell", &[entry("beep", None)]);
    store.save().unwrap();

    assert!(store.delete_action("buy").unwrap());
    assert!(!store.delete_action("buy").unwrap());
    assert_eq!(ConfigStore::load(&path).unwrap().action_names(), vec!["sell"]);
}
