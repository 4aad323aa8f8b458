//! Webcam preview with capture / retake button.
//!
//! The widget does not own the camera; the window feeds it
//! [`CameraEvent`]s while its tab is visible.

use gtk4 as gtk;

use gtk::gdk;
use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;

use std::cell::RefCell;

use guestbook_core::config::CameraConfig;
use guestbook_core::{CaptureState, CapturedImage, Frame, PhotoCapture};
use log::warn;

use crate::camera::CameraEvent;

mod imp {
    use super::*;

    #[derive(Debug, Default)]
    pub struct PhotoCaptureWidget {
        pub capture: RefCell<Option<PhotoCapture>>,
        pub last_frame: RefCell<Option<Frame>>,

        pub picture: RefCell<Option<gtk::Picture>>,
        pub spinner: RefCell<Option<gtk::Spinner>>,
        pub lbl_status: RefCell<Option<gtk::Label>>,
        pub lbl_hint: RefCell<Option<gtk::Label>>,
        pub lbl_taken: RefCell<Option<gtk::Label>>,
        pub btn_action: RefCell<Option<gtk::Button>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for PhotoCaptureWidget {
        const NAME: &'static str = "GuestbookPhotoCapture";
        type Type = super::PhotoCaptureWidget;
        type ParentType = gtk::Box;
    }

    impl ObjectImpl for PhotoCaptureWidget {
        fn constructed(&self) {
            self.parent_constructed();
            self.obj().build_ui();
        }
    }

    impl WidgetImpl for PhotoCaptureWidget {}
    impl BoxImpl for PhotoCaptureWidget {}
}

glib::wrapper! {
    pub struct PhotoCaptureWidget(ObjectSubclass<imp::PhotoCaptureWidget>)
        @extends gtk::Widget, gtk::Box,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl PhotoCaptureWidget {
    pub fn new(config: &CameraConfig) -> Self {
        let widget: Self = glib::Object::builder()
            .property("orientation", gtk::Orientation::Vertical)
            .property("spacing", 12)
            .build();

        if let Some(ref picture) = *widget.imp().picture.borrow() {
            picture.set_size_request(config.frame_width as i32, config.frame_height as i32);
        }
        *widget.imp().capture.borrow_mut() = Some(PhotoCapture::new(config));
        widget.update_ui();
        widget
    }

    /// `callback` receives the photo on capture and `None` on retake.
    pub fn connect_photo_changed<F>(&self, callback: F)
    where
        F: FnMut(Option<&CapturedImage>) + 'static,
    {
        if let Some(ref mut capture) = *self.imp().capture.borrow_mut() {
            capture.connect_changed(Box::new(callback));
        }
    }

    /// Discard any held photo and return to the live preview.
    pub fn reset(&self) {
        let imp = self.imp();
        let can_retake = imp.capture.borrow().as_ref().is_some_and(|c| c.can_retake());
        if can_retake {
            if let Some(ref mut capture) = *imp.capture.borrow_mut() {
                let _ = capture.retake();
            }
        }
        self.update_ui();
    }

    fn build_ui(&self) {
        let imp = self.imp();

        let title = gtk::Label::builder()
            .label("Foto Diri")
            .css_classes(["heading"])
            .halign(gtk::Align::Start)
            .build();

        let frame = gtk::Frame::builder()
            .halign(gtk::Align::Center)
            .css_classes(["camera-preview"])
            .build();

        let overlay = gtk::Overlay::new();
        let picture = gtk::Picture::builder()
            .content_fit(gtk::ContentFit::Cover)
            .can_shrink(true)
            .build();

        let status_box = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(8)
            .halign(gtk::Align::Center)
            .valign(gtk::Align::Center)
            .build();

        let spinner = gtk::Spinner::builder()
            .width_request(32)
            .height_request(32)
            .build();

        let lbl_status = gtk::Label::builder()
            .label("Menyiapkan kamera...")
            .css_classes(["dim-label"])
            .build();

        let lbl_hint = gtk::Label::builder()
            .label("Pastikan kamera sudah diizinkan")
            .css_classes(["caption", "camera-error"])
            .visible(false)
            .build();

        status_box.append(&spinner);
        status_box.append(&lbl_status);
        status_box.append(&lbl_hint);

        overlay.set_child(Some(&picture));
        overlay.add_overlay(&status_box);
        frame.set_child(Some(&overlay));

        let lbl_taken = gtk::Label::builder()
            .label("✓ Foto Sudah Berhasil Diambil")
            .css_classes(["photo-taken"])
            .visible(false)
            .build();

        let btn_action = gtk::Button::builder()
            .label("Ambil Foto")
            .css_classes(["suggested-action", "pill"])
            .halign(gtk::Align::Center)
            .width_request(160)
            .build();
        btn_action.connect_clicked(glib::clone!(
            #[weak(rename_to = widget)] self,
            move |_| { widget.on_action_clicked(); }
        ));

        self.append(&title);
        self.append(&frame);
        self.append(&lbl_taken);
        self.append(&btn_action);

        *imp.picture.borrow_mut() = Some(picture);
        *imp.spinner.borrow_mut() = Some(spinner);
        *imp.lbl_status.borrow_mut() = Some(lbl_status);
        *imp.lbl_hint.borrow_mut() = Some(lbl_hint);
        *imp.lbl_taken.borrow_mut() = Some(lbl_taken);
        *imp.btn_action.borrow_mut() = Some(btn_action);
    }

    pub fn handle_camera_event(&self, event: CameraEvent) {
        let imp = self.imp();
        match event {
            CameraEvent::Frame(frame) => {
                let (became_live, show_preview, mirrored) = {
                    let mut capture = imp.capture.borrow_mut();
                    let Some(capture) = capture.as_mut() else { return };
                    let was_waiting = *capture.state() == CaptureState::AwaitingDevice;
                    capture.device_ready();
                    (was_waiting, capture.can_capture(), capture.is_mirrored())
                };

                if show_preview {
                    self.show_frame(&frame, mirrored);
                    *imp.last_frame.borrow_mut() = Some(frame);
                }
                if became_live {
                    self.update_ui();
                }
            }
            CameraEvent::Failed(reason) => {
                if let Some(ref mut capture) = *imp.capture.borrow_mut() {
                    capture.device_failed(reason);
                }
                *imp.last_frame.borrow_mut() = None;
                self.update_ui();
            }
        }
    }

    fn show_frame(&self, frame: &Frame, mirrored: bool) {
        let data = if mirrored {
            frame.mirrored().rgb_data
        } else {
            frame.rgb_data.clone()
        };
        let bytes = glib::Bytes::from_owned(data);
        let texture = gdk::MemoryTexture::new(
            frame.width as i32,
            frame.height as i32,
            gdk::MemoryFormat::R8g8b8,
            &bytes,
            frame.width as usize * 3,
        );
        if let Some(ref picture) = *self.imp().picture.borrow() {
            picture.set_paintable(Some(&texture));
        }
    }

    fn on_action_clicked(&self) {
        let imp = self.imp();
        let result = {
            let mut capture = imp.capture.borrow_mut();
            let Some(capture) = capture.as_mut() else { return };
            if capture.can_retake() {
                capture.retake()
            } else {
                match imp.last_frame.borrow().as_ref() {
                    Some(frame) => capture.capture(frame).map(|_| ()),
                    None => Err(guestbook_core::CaptureError::NotLive),
                }
            }
        };

        if let Err(e) = result {
            warn!("Photo action failed: {}", e);
        }
        self.update_ui();
    }

    fn update_ui(&self) {
        let imp = self.imp();
        let state = match imp.capture.borrow().as_ref() {
            Some(capture) => capture.state().clone(),
            None => return,
        };

        let spinner = imp.spinner.borrow();
        let lbl_status = imp.lbl_status.borrow();
        let lbl_hint = imp.lbl_hint.borrow();
        let lbl_taken = imp.lbl_taken.borrow();
        let btn = imp.btn_action.borrow();
        let (Some(spinner), Some(lbl_status), Some(lbl_hint), Some(lbl_taken), Some(btn)) = (
            spinner.as_ref(),
            lbl_status.as_ref(),
            lbl_hint.as_ref(),
            lbl_taken.as_ref(),
            btn.as_ref(),
        ) else {
            return;
        };

        match state {
            CaptureState::AwaitingDevice => {
                spinner.start();
                spinner.set_visible(true);
                lbl_status.set_label("Menyiapkan kamera...");
                lbl_status.set_visible(true);
                lbl_hint.set_visible(false);
                lbl_taken.set_visible(false);
                btn.set_label("Loading...");
                btn.set_sensitive(false);
            }
            CaptureState::Error(_) => {
                if let Some(ref picture) = *imp.picture.borrow() {
                    picture.set_paintable(None::<&gdk::Paintable>);
                }
                spinner.stop();
                spinner.set_visible(false);
                lbl_status.set_label("Kamera tidak dapat diakses");
                lbl_status.set_visible(true);
                lbl_hint.set_visible(true);
                lbl_taken.set_visible(false);
                btn.set_label("Ambil Foto");
                btn.remove_css_class("warning");
                btn.set_sensitive(false);
            }
            CaptureState::Live => {
                spinner.stop();
                spinner.set_visible(false);
                lbl_status.set_visible(false);
                lbl_hint.set_visible(false);
                lbl_taken.set_visible(false);
                btn.set_label("Ambil Foto");
                btn.remove_css_class("warning");
                btn.add_css_class("suggested-action");
                btn.set_sensitive(true);
            }
            CaptureState::Captured(_) => {
                lbl_status.set_visible(false);
                lbl_taken.set_visible(true);
                btn.set_label("Ulangi");
                btn.remove_css_class("suggested-action");
                btn.add_css_class("warning");
                btn.set_sensitive(true);
            }
        }
    }
}
