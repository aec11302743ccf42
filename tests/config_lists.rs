mod common;

use common::FakeSpicetify;
use spicetify_wizard::app::{App, ListKind};
use spicetify_wizard::config_list::{self, AddOutcome, EXTENSIONS, LAUNCH_FLAGS};
use spicetify_wizard::invoker::Spicetify;
use spicetify_wizard::paths::SpicetifyPaths;
use spicetify_wizard::settings::WizardSettings;

fn app(fake: FakeSpicetify) -> App<FakeSpicetify> {
    let paths = SpicetifyPaths::new(
        "/tmp/spicetify-wizard-test/userdata".into(),
        "/tmp/spicetify-wizard-test/bin".into(),
    );
    App::with_tool(Spicetify::new(fake), paths, WizardSettings::default())
}

#[test]
fn removing_an_extension_writes_the_suffix_and_the_store_drops_it() {
    let app = app(FakeSpicetify::with(&[(EXTENSIONS, "ext1.js|ext2.js")]));

    app.remove_item(ListKind::Extensions, "ext1.js").unwrap();

    let fake = app.tool.runner();
    assert_eq!(fake.writes(EXTENSIONS), vec!["ext1.js-"]);
    assert_eq!(app.list(ListKind::Extensions), vec!["ext2.js"]);
}

#[test]
fn removal_does_not_read_first() {
    let tool = Spicetify::new(FakeSpicetify::with(&[(EXTENSIONS, "a.js")]));
    config_list::remove_token(&tool, EXTENSIONS, "a.js").unwrap();
    assert_eq!(tool.runner().calls.borrow().len(), 1);
}

#[test]
fn adding_a_launch_flag_writes_the_whole_string_once() {
    let app = app(FakeSpicetify::with(&[(LAUNCH_FLAGS, "--minimized")]));

    assert_eq!(app.add_launch_flag("--maximized").unwrap(), AddOutcome::Added);

    let fake = app.tool.runner();
    assert_eq!(fake.writes(LAUNCH_FLAGS), vec!["--minimized|--maximized"]);
    assert_eq!(app.launch_flags(), vec!["--minimized", "--maximized"]);
}

#[test]
fn clear_all_removes_each_snapshot_token() {
    let app = app(FakeSpicetify::with(&[("custom_apps", "marketplace|lyrics-plus|stats")]));
    // Snapshot taken before someone else added "reddit"
    let snapshot = app.list(ListKind::CustomApps);
    app.tool.runner().store.borrow_mut().insert(
        "custom_apps".into(),
        "marketplace|lyrics-plus|stats|reddit".into(),
    );

    let removed = app.clear_items(ListKind::CustomApps, &snapshot).unwrap();

    assert_eq!(removed, 3);
    let fake = app.tool.runner();
    assert_eq!(fake.writes("custom_apps"), vec!["marketplace-", "lyrics-plus-", "stats-"]);
    assert_eq!(fake.value("custom_apps"), "reddit");
}

#[test]
fn adding_a_present_token_writes_nothing() {
    let app = app(FakeSpicetify::with(&[(EXTENSIONS, "fullAppDisplay.js|shuffle+.js")]));

    assert_eq!(
        app.add_item(ListKind::Extensions, " shuffle+.js ").unwrap(),
        AddOutcome::AlreadyPresent
    );
    assert!(app.tool.runner().writes(EXTENSIONS).is_empty());

    assert_eq!(
        app.add_item(ListKind::Extensions, "keyboardShortcut.js").unwrap(),
        AddOutcome::Added
    );
    assert_eq!(app.tool.runner().writes(EXTENSIONS), vec!["keyboardShortcut.js"]);
}

#[test]
fn malformed_names_are_refused_before_any_call() {
    let app = app(FakeSpicetify::default());
    assert!(app.add_item(ListKind::Extensions, "   ").is_err());
    assert!(app.add_item(ListKind::Extensions, "a.js|b.js").is_err());
    assert!(app.add_item(ListKind::Extensions, "trailing-").is_err());
    assert!(app.tool.runner().calls.borrow().is_empty());
}

#[test]
fn echoed_key_or_blank_reads_as_empty() {
    let fake = FakeSpicetify::with(&[(EXTENSIONS, "extensions"), ("custom_apps", "   ")]);
    let tool = Spicetify::new(fake);
    assert!(config_list::get_list(&tool, EXTENSIONS).is_empty());
    assert!(config_list::get_list(&tool, "custom_apps").is_empty());
    assert!(config_list::get_list(&tool, "never_set").is_empty());
}

#[test]
fn list_actions_need_the_tool() {
    let fake = FakeSpicetify { missing: true, ..Default::default() };
    let app = app(fake);
    let err = app.add_item(ListKind::Extensions, "x.js").unwrap_err();
    assert!(err.to_string().contains("not installed"));
    assert!(app.list(ListKind::Extensions).is_empty());
}
