use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::gio;
use gtk::glib;

use std::cell::RefCell;

use guestbook_core::GuestbookConfig;

use crate::window::GuestbookWindow;

const APP_ID: &str = "id.sch.smkn1cimahi.Guestbook";

mod imp {
    use super::*;

    #[derive(Debug, Default)]
    pub struct GuestbookApplication {
        pub config: RefCell<GuestbookConfig>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for GuestbookApplication {
        const NAME: &'static str = "GuestbookApplication";
        type Type = super::GuestbookApplication;
        type ParentType = adw::Application;
    }

    impl ObjectImpl for GuestbookApplication {
        fn constructed(&self) {
            self.parent_constructed();
            let obj = self.obj();
            obj.setup_actions();
            obj.load_css();
        }
    }

    impl ApplicationImpl for GuestbookApplication {
        fn activate(&self) {
            let app = self.obj();
            if let Some(window) = app.active_window() {
                window.present();
                return;
            }
            let window = GuestbookWindow::new(&app, self.config.borrow().clone());
            window.present();
        }
    }

    impl GtkApplicationImpl for GuestbookApplication {}
    impl AdwApplicationImpl for GuestbookApplication {}
}

glib::wrapper! {
    pub struct GuestbookApplication(ObjectSubclass<imp::GuestbookApplication>)
        @extends gio::Application, gtk::Application, adw::Application,
        @implements gio::ActionGroup, gio::ActionMap;
}

impl GuestbookApplication {
    pub fn new(config: GuestbookConfig) -> Self {
        let app: Self = glib::Object::builder()
            .property("application-id", APP_ID)
            .property("flags", gio::ApplicationFlags::FLAGS_NONE)
            .build();
        *app.imp().config.borrow_mut() = config;
        app
    }

    fn setup_actions(&self) {
        let about_action = gio::ActionEntry::builder("about")
            .activate(|app: &Self, _, _| app.show_about())
            .build();

        let quit_action = gio::ActionEntry::builder("quit")
            .activate(|app: &Self, _, _| app.quit())
            .build();

        self.add_action_entries([about_action, quit_action]);
        self.set_accels_for_action("app.quit", &["<Ctrl>q"]);
    }

    fn load_css(&self) {
        let css = r#"
            .camera-preview {
                background-color: @card_bg_color;
                border-radius: 12px;
                min-height: 240px;
            }
            .camera-error { color: @error_color; font-weight: bold; }
            .photo-taken { color: @success_color; font-weight: bold; }
            button.warning {
                background-color: @warning_bg_color;
                color: @warning_fg_color;
            }
            .student-info { padding: 6px; }
        "#;

        let provider = gtk::CssProvider::new();
        provider.load_from_string(css);

        if let Some(display) = gtk::gdk::Display::default() {
            gtk::style_context_add_provider_for_display(
                &display, &provider, gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
            );
        }
    }

    fn show_about(&self) {
        let window = self.active_window();

        let dialog = adw::AboutWindow::builder()
            .application_name("Buku Tamu")
            .application_icon("x-office-address-book-symbolic")
            .developer_name("Guestbook Team")
            .version(env!("CARGO_PKG_VERSION"))
            .license_type(gtk::License::Gpl30)
            .website("https://github.com/smkn1-cimahi/guestbook")
            .comments("Kiosk buku tamu digital untuk tamu umum dan orang tua siswa")
            .modal(true)
            .build();

        if let Some(win) = window {
            dialog.set_transient_for(Some(&win));
        }
        dialog.present();
    }
}
