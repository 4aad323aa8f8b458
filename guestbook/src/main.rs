mod app;
mod camera;
mod widgets;
mod window;

use app::GuestbookApplication;
use gtk4::prelude::*;
use guestbook_core::GuestbookConfig;
use libadwaita as adw;

fn main() -> gtk4::glib::ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    ).init();

    if let Err(e) = adw::init() {
        log::error!("Failed to initialize Libadwaita: {}", e);
        return gtk4::glib::ExitCode::FAILURE;
    }

    let config = GuestbookConfig::load_or_default();
    let app = GuestbookApplication::new(config);
    app.run()
}
