mod common;

use common::FakeSpicetify;
use spicetify_wizard::app::App;
use spicetify_wizard::invoker::Spicetify;
use spicetify_wizard::paths::SpicetifyPaths;
use spicetify_wizard::release::TokenCheck;
use spicetify_wizard::settings::WizardSettings;
use std::fs;

fn app_with(
    fake: FakeSpicetify,
    userdata: &std::path::Path,
    settings: WizardSettings,
) -> App<FakeSpicetify> {
    let paths = SpicetifyPaths::new(userdata.to_path_buf(), userdata.join("bin"));
    App::with_tool(Spicetify::new(fake), paths, settings)
}

#[test]
fn toggle_flips_and_reports_new_state() {
    let dir = tempfile::tempdir().unwrap();
    let fake = FakeSpicetify::with(&[("inject_css", "0")]);
    let app = app_with(fake, dir.path(), WizardSettings::default());

    assert!(app.toggle("inject_css").unwrap());
    assert_eq!(app.tool.runner().value("inject_css"), "1");
    assert!(!app.toggle("inject_css").unwrap());
    assert_eq!(app.tool.runner().value("inject_css"), "0");

    assert!(app.toggle("not_a_setting").is_err());
    let states = app.toggles();
    assert!(states.contains(&("inject_css", false)));
}

#[test]
fn theme_and_scheme_are_written_raw() {
    let dir = tempfile::tempdir().unwrap();
    let theme = dir.path().join("Themes/Sleek");
    fs::create_dir_all(&theme).unwrap();
    let ini = "[Nord]\ntext = ffffff\n\n[Dracula]\ntext = f8f8f2\n";
    fs::write(theme.join("color.ini"), ini).unwrap();
    let app = app_with(FakeSpicetify::default(), dir.path(), WizardSettings::default());

    assert_eq!(app.themes(), vec!["Sleek"]);
    assert_eq!(app.color_schemes("Sleek"), vec!["Nord", "Dracula"]);

    app.set_theme("Sleek", Some("Dracula")).unwrap();
    assert_eq!(app.tool.runner().value("current_theme"), "Sleek");
    assert_eq!(app.tool.runner().value("color_scheme"), "Dracula");
    assert!(app.set_theme("  ", None).is_err());
}

#[test]
fn rejected_token_is_not_saved() {
    let mut server = mockito::Server::new();
    let _bad = server
        .mock("GET", "/rate_limit")
        .match_header("authorization", "Bearer nope")
        .with_status(401)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let settings = WizardSettings { api_base: server.url(), ..Default::default() };
    let mut app = app_with(FakeSpicetify::default(), dir.path(), settings);

    assert_eq!(app.set_token("nope").unwrap(), TokenCheck::Invalid);
    assert_eq!(app.settings.token(), None);
}

#[test]
fn accepted_token_is_kept_and_cleared() {
    let mut server = mockito::Server::new();
    let _good = server
        .mock("GET", "/rate_limit")
        .match_header("authorization", "Bearer ghp_valid")
        .with_status(200)
        .with_body(r#"{"rate":{"limit":5000,"remaining":4999}}"#)
        .create();
    let dir = tempfile::tempdir().unwrap();
    let settings = WizardSettings { api_base: server.url(), ..Default::default() };
    let mut app = app_with(FakeSpicetify::default(), dir.path(), settings);

    assert_eq!(app.set_token(" ghp_valid ").unwrap(), TokenCheck::Valid { remaining: Some(4999) });
    assert_eq!(app.settings.token(), Some("ghp_valid"));
    assert_eq!(app.check_token().unwrap(), Some(TokenCheck::Valid { remaining: Some(4999) }));

    app.clear_token().unwrap();
    assert_eq!(app.check_token().unwrap(), None);
}
