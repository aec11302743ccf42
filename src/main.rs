use anyhow::Result;
use clap::Parser;
use spicetify_wizard::app::App;
use spicetify_wizard::cli::{self, Args};
use spicetify_wizard::settings;
use spicetify_wizard::{menu, ui};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    if let Err(e) = run() {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let (settings, path) = settings::load_or_default(settings::settings_path().ok());
    let mut app = App::new(settings, path);

    match args.command {
        Some(command) => cli::run(&mut app, command),
        None => menu::run(&mut app),
    }
}
