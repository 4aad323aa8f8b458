use gtk4 as gtk;
use libadwaita as adw;

use adw::prelude::*;
use adw::subclass::prelude::*;
use gtk::gio;
use gtk::glib;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use guestbook_core::{
    FormKind, GuestbookApi, GuestbookConfig, HttpGuestbookApi, Navigator, Notice, NoticeKind, Route,
};
use log::{debug, info};

use crate::app::GuestbookApplication;
use crate::camera::{self, CameraEvent};
use crate::widgets::intake_form::{FormHandlers, IntakeFormView};

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct GuestbookWindow {
        pub config: RefCell<GuestbookConfig>,
        pub api: RefCell<Option<Arc<dyn GuestbookApi>>>,
        pub navigator: RefCell<Navigator>,

        /// Mounted while the intake page is shown.
        pub forms: RefCell<Vec<IntakeFormView>>,
        /// Bumped on every camera start and stop; a stream whose
        /// generation is stale stops forwarding.
        pub camera_generation: Cell<u64>,

        // UI widgets
        pub toast_overlay: RefCell<Option<adw::ToastOverlay>>,
        pub navigation: RefCell<Option<adw::NavigationView>>,
        pub form_stack: RefCell<Option<adw::ViewStack>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for GuestbookWindow {
        const NAME: &'static str = "GuestbookWindow";
        type Type = super::GuestbookWindow;
        type ParentType = adw::ApplicationWindow;
    }

    impl ObjectImpl for GuestbookWindow {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().build_ui();
        }
    }

    impl WidgetImpl for GuestbookWindow {}
    impl WindowImpl for GuestbookWindow {}
    impl ApplicationWindowImpl for GuestbookWindow {}
    impl AdwApplicationWindowImpl for GuestbookWindow {}
}

glib::wrapper! {
    pub struct GuestbookWindow(ObjectSubclass<imp::GuestbookWindow>)
        @extends gtk::Widget, gtk::Window, gtk::ApplicationWindow, adw::ApplicationWindow,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget,
                    gtk::Native, gtk::Root, gtk::ShortcutManager;
}

impl GuestbookWindow {
    pub fn new(app: &GuestbookApplication, config: GuestbookConfig) -> Self {
        let window: Self = glib::Object::builder()
            .property("application", app)
            .build();
        window.setup(config);
        window
    }

    fn setup(&self, config: GuestbookConfig) {
        let imp = self.imp();
        info!("Guestbook API at {}", config.api.base_url);

        let api: Arc<dyn GuestbookApi> = Arc::new(HttpGuestbookApi::new(&config.api));
        *imp.api.borrow_mut() = Some(api);
        *imp.config.borrow_mut() = config;

        imp.navigator.borrow_mut().on_navigate(Box::new(glib::clone!(
            #[weak(rename_to = window)] self,
            move |from: Route, to: Route| { window.on_route_changed(from, to); }
        )));
    }

    fn build_ui(&self) {
        let imp = self.imp();

        let toast_overlay = adw::ToastOverlay::new();
        let navigation = adw::NavigationView::new();

        // === Landing Page ===
        let landing_page = adw::NavigationPage::builder()
            .title("Buku Tamu")
            .tag(Route::Landing.tag())
            .build();

        let landing_toolbar = adw::ToolbarView::new();
        let header = adw::HeaderBar::new();

        let menu_btn = gtk::MenuButton::builder()
            .icon_name("open-menu-symbolic")
            .build();
        let menu = gio::Menu::new();
        menu.append(Some("_Tentang Buku Tamu"), Some("app.about"));
        menu.append(Some("_Keluar"), Some("app.quit"));
        menu_btn.set_menu_model(Some(&menu));
        header.pack_end(&menu_btn);
        landing_toolbar.add_top_bar(&header);

        let status_page = adw::StatusPage::builder()
            .icon_name("x-office-address-book-symbolic")
            .title("Buku Tamu Digital")
            .description("Selamat datang! Silakan isi buku tamu sebelum berkunjung.")
            .build();

        let btn_start = gtk::Button::builder()
            .label("Isi Buku Tamu")
            .css_classes(["suggested-action", "pill"])
            .halign(gtk::Align::Center)
            .build();
        btn_start.connect_clicked(glib::clone!(
            #[weak(rename_to = window)] self,
            move |_| { window.go_to(Route::Intake); }
        ));

        status_page.set_child(Some(&btn_start));
        landing_toolbar.set_content(Some(&status_page));
        landing_page.set_child(Some(&landing_toolbar));

        // === Intake Page ===
        let intake_page = adw::NavigationPage::builder()
            .title("Isi Buku Tamu")
            .tag(Route::Intake.tag())
            .build();

        let intake_toolbar = adw::ToolbarView::new();
        let form_stack = adw::ViewStack::builder()
            .vhomogeneous(false)
            .build();

        let switcher = adw::ViewSwitcher::builder()
            .stack(&form_stack)
            .policy(adw::ViewSwitcherPolicy::Wide)
            .build();
        let intake_header = adw::HeaderBar::builder()
            .show_back_button(true)
            .title_widget(&switcher)
            .build();
        intake_toolbar.add_top_bar(&intake_header);

        let clamp = adw::Clamp::builder()
            .maximum_size(720)
            .margin_top(24)
            .margin_bottom(24)
            .margin_start(12)
            .margin_end(12)
            .child(&form_stack)
            .build();
        let scrolled = gtk::ScrolledWindow::builder()
            .hscrollbar_policy(gtk::PolicyType::Never)
            .vexpand(true)
            .child(&clamp)
            .build();

        intake_toolbar.set_content(Some(&scrolled));
        intake_page.set_child(Some(&intake_toolbar));

        navigation.add(&landing_page);
        navigation.add(&intake_page);

        // Back button and swipe gestures pop the page without going
        // through go_to.
        navigation.connect_popped(glib::clone!(
            #[weak(rename_to = window)] self,
            move |navigation, _| {
                let route = navigation
                    .visible_page()
                    .and_then(|page| page.tag())
                    .map(|tag| Route::from_tag(&tag))
                    .unwrap_or_default();
                window.imp().navigator.borrow_mut().navigate(route);
            }
        ));

        toast_overlay.set_child(Some(&navigation));
        self.set_content(Some(&toast_overlay));

        *imp.toast_overlay.borrow_mut() = Some(toast_overlay);
        *imp.navigation.borrow_mut() = Some(navigation);
        *imp.form_stack.borrow_mut() = Some(form_stack);

        self.set_title(Some("Buku Tamu"));
        self.set_default_size(720, 860);
    }

    /// Navigate to `route`, mounting or unmounting the intake forms.
    pub fn go_to(&self, route: Route) {
        let imp = self.imp();
        if !imp.navigator.borrow_mut().navigate(route) {
            return;
        }

        if let Some(ref navigation) = *imp.navigation.borrow() {
            match route {
                Route::Intake => navigation.push_by_tag(route.tag()),
                Route::Landing => {
                    navigation.pop_to_tag(route.tag());
                }
            }
        }
    }

    fn on_route_changed(&self, from: Route, to: Route) {
        debug!("Route changed {} -> {}", from, to);
        if from == Route::Intake {
            self.unmount_forms();
        }
        if to == Route::Intake {
            self.mount_forms();
        }
    }

    fn mount_forms(&self) {
        let imp = self.imp();
        let Some(api) = imp.api.borrow().clone() else { return };
        let stack = imp.form_stack.borrow();
        let Some(stack) = stack.as_ref() else { return };

        let config = imp.config.borrow();
        let handlers = self.form_handlers();
        let mut forms = Vec::new();

        for kind in FormKind::ALL {
            let view = IntakeFormView::new(kind, &config, api.clone(), handlers.clone());
            let page = stack.add_titled(&view, Some(kind.role()), kind.title());
            page.set_icon_name(Some(match kind {
                FormKind::Parent => "system-users-symbolic",
                FormKind::General => "avatar-default-symbolic",
            }));
            forms.push(view);
        }

        *imp.forms.borrow_mut() = forms;
        stack.set_visible_child_name(config.intake.default_tab.role());
        self.start_camera(&config);
        info!("Intake forms mounted");
    }

    fn unmount_forms(&self) {
        let imp = self.imp();
        self.stop_camera();

        let forms: Vec<IntakeFormView> = imp.forms.borrow_mut().drain(..).collect();
        let stack = imp.form_stack.borrow();
        for view in forms {
            if let Some(ref stack) = *stack {
                stack.remove(&view);
            }
        }
        debug!("Intake forms unmounted");
    }

    /// One stream serves every tab; the device can only be opened once.
    fn start_camera(&self, config: &GuestbookConfig) {
        let imp = self.imp();
        let generation = imp.camera_generation.get() + 1;
        imp.camera_generation.set(generation);

        let rx = camera::start_stream(&config.camera);
        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = window)] self,
            async move {
                while let Ok(event) = rx.recv().await {
                    if window.imp().camera_generation.get() != generation {
                        break;
                    }
                    window.dispatch_camera_event(event);
                }
                debug!("Camera stream {} closed", generation);
            }
        ));
    }

    /// The forwarding task drops its receiver on the next frame, which
    /// stops the worker and releases the device.
    fn stop_camera(&self) {
        let imp = self.imp();
        imp.camera_generation.set(imp.camera_generation.get() + 1);
    }

    /// Frames go to the visible tab only. A device failure reaches every
    /// tab so none of them waits for frames that will not come.
    fn dispatch_camera_event(&self, event: CameraEvent) {
        let imp = self.imp();
        let forms = imp.forms.borrow();

        match event {
            CameraEvent::Frame(_) => {
                let visible = imp
                    .form_stack
                    .borrow()
                    .as_ref()
                    .and_then(|stack| stack.visible_child());
                let active = forms
                    .iter()
                    .find(|view| visible.as_ref() == Some(view.upcast_ref::<gtk::Widget>()));
                if let Some(view) = active {
                    view.handle_camera_event(event);
                }
            }
            CameraEvent::Failed(_) => {
                for view in forms.iter() {
                    view.handle_camera_event(event.clone());
                }
            }
        }
    }

    fn form_handlers(&self) -> FormHandlers {
        FormHandlers {
            show_toast: Rc::new(glib::clone!(
                #[weak(rename_to = window)] self,
                move |message: &str| { window.show_toast(message); }
            )),
            show_notice: Rc::new(glib::clone!(
                #[weak(rename_to = window)] self,
                move |notice: &Notice| { window.show_notice(notice); }
            )),
            navigate: Rc::new(glib::clone!(
                #[weak(rename_to = window)] self,
                move |route: Route| { window.go_to(route); }
            )),
        }
    }

    fn show_notice(&self, notice: &Notice) {
        match notice.kind {
            NoticeKind::Success => self.show_toast(&notice.message),
            NoticeKind::Failure => {
                let dialog = adw::MessageDialog::builder()
                    .heading("Gagal")
                    .body(notice.message.as_str())
                    .modal(true)
                    .transient_for(self)
                    .build();

                dialog.add_response("close", "Tutup");
                dialog.set_default_response(Some("close"));
                dialog.present();
            }
        }
    }

    fn show_toast(&self, message: &str) {
        let imp = self.imp();
        if let Some(ref overlay) = *imp.toast_overlay.borrow() {
            overlay.add_toast(adw::Toast::new(message));
        }
    }
}
