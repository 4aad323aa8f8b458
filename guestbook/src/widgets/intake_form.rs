//! Intake form view, one instance per visitor category

use gtk4 as gtk;

use gtk::glib;
use gtk::prelude::*;
use gtk::subclass::prelude::*;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use guestbook_core::api::{ApiError, SubmitResponse};
use guestbook_core::config::GuestbookConfig;
use guestbook_core::intake::{SelectFieldSpec, TextFieldSpec};
use guestbook_core::{
    load_reference_data, EntityId, FormItem, FormKind, GuestbookApi, IntakeForm, Notice,
    ReferenceData, Route, SelectField, TextField,
};
use log::{debug, info};

use crate::camera::CameraEvent;
use crate::widgets::photo_capture::PhotoCaptureWidget;

/// Callbacks into the window that hosts the form.
#[derive(Clone)]
pub struct FormHandlers {
    pub show_toast: Rc<dyn Fn(&str)>,
    pub show_notice: Rc<dyn Fn(&Notice)>,
    pub navigate: Rc<dyn Fn(Route)>,
}

#[derive(Debug, Clone)]
pub enum TextInput {
    Line(gtk::Entry),
    Area(gtk::TextView),
}

impl TextInput {
    fn text(&self) -> String {
        match self {
            TextInput::Line(entry) => entry.text().to_string(),
            TextInput::Area(view) => {
                let buffer = view.buffer();
                buffer.text(&buffer.start_iter(), &buffer.end_iter(), false).to_string()
            }
        }
    }

    fn set_text(&self, text: &str) {
        if self.text() == text {
            return;
        }
        match self {
            TextInput::Line(entry) => entry.set_text(text),
            TextInput::Area(view) => view.buffer().set_text(text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectInput {
    pub dropdown: gtk::DropDown,
    pub model: gtk::StringList,
    pub hint: gtk::Label,
    pub spec: SelectFieldSpec,
}

#[derive(Debug, Clone)]
pub struct StudentInfo {
    pub container: gtk::Box,
    pub nis: gtk::Label,
    pub nisn: gtk::Label,
    pub kelas: gtk::Label,
}

mod imp {
    use super::*;

    #[derive(Default)]
    pub struct IntakeFormView {
        pub form: RefCell<Option<IntakeForm>>,
        pub api: RefCell<Option<Arc<dyn GuestbookApi>>>,
        pub handlers: RefCell<Option<FormHandlers>>,
        /// Set while widgets are updated from the form state.
        pub syncing: Cell<bool>,

        pub photo: RefCell<Option<PhotoCaptureWidget>>,
        pub text_inputs: RefCell<Vec<(TextField, TextInput)>>,
        pub selects: RefCell<Vec<(SelectField, SelectInput)>>,
        /// Option ids in dropdown order, per select.
        pub select_ids: RefCell<Vec<(SelectField, Vec<EntityId>)>>,
        pub student_info: RefCell<Option<StudentInfo>>,
        pub btn_submit: RefCell<Option<gtk::Button>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for IntakeFormView {
        const NAME: &'static str = "GuestbookIntakeFormView";
        type Type = super::IntakeFormView;
        type ParentType = gtk::Box;
    }

    impl ObjectImpl for IntakeFormView {}
    impl WidgetImpl for IntakeFormView {}
    impl BoxImpl for IntakeFormView {}
}

glib::wrapper! {
    pub struct IntakeFormView(ObjectSubclass<imp::IntakeFormView>)
        @extends gtk::Widget, gtk::Box,
        @implements gtk::Accessible, gtk::Buildable, gtk::ConstraintTarget, gtk::Orientable;
}

impl IntakeFormView {
    pub fn new(
        kind: FormKind,
        config: &GuestbookConfig,
        api: Arc<dyn GuestbookApi>,
        handlers: FormHandlers,
    ) -> Self {
        let view: Self = glib::Object::builder()
            .property("orientation", gtk::Orientation::Vertical)
            .property("spacing", 24)
            .build();

        let imp = view.imp();
        *imp.form.borrow_mut() = Some(IntakeForm::new(kind, config.intake.redirect_delay()));
        *imp.api.borrow_mut() = Some(api);
        *imp.handlers.borrow_mut() = Some(handlers);

        view.build_ui(kind, config);
        view.sync_from_form();
        view.load_reference_data();
        view
    }

    pub fn handle_camera_event(&self, event: CameraEvent) {
        if let Some(ref photo) = *self.imp().photo.borrow() {
            photo.handle_camera_event(event);
        }
    }

    fn handlers(&self) -> Option<FormHandlers> {
        self.imp().handlers.borrow().clone()
    }

    fn build_ui(&self, kind: FormKind, config: &GuestbookConfig) {
        let imp = self.imp();

        let photo = PhotoCaptureWidget::new(&config.camera);
        photo.connect_photo_changed(glib::clone!(
            #[weak(rename_to = view)] self,
            move |image| {
                if let Some(ref mut form) = *view.imp().form.borrow_mut() {
                    form.set_photo(image.cloned());
                }
                view.update_controls();
            }
        ));
        self.append(&photo);
        *imp.photo.borrow_mut() = Some(photo);

        let fields = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(18)
            .build();

        for item in kind.layout() {
            match item {
                FormItem::Text(spec) => fields.append(&self.build_text_field(spec)),
                FormItem::Select(spec) => fields.append(&self.build_select_field(spec)),
                FormItem::StudentInfo => fields.append(&self.build_student_info()),
            }
        }
        self.append(&fields);

        let actions = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(12)
            .halign(gtk::Align::End)
            .margin_top(12)
            .build();

        let btn_back = gtk::Button::builder()
            .label("Kembali")
            .css_classes(["pill"])
            .build();
        btn_back.connect_clicked(glib::clone!(
            #[weak(rename_to = view)] self,
            move |_| {
                if let Some(handlers) = view.handlers() {
                    (handlers.navigate)(Route::Landing);
                }
            }
        ));

        let btn_submit = gtk::Button::builder()
            .label("Kirim Data")
            .css_classes(["suggested-action", "pill"])
            .sensitive(false)
            .build();
        btn_submit.connect_clicked(glib::clone!(
            #[weak(rename_to = view)] self,
            move |_| { view.submit(); }
        ));

        actions.append(&btn_back);
        actions.append(&btn_submit);
        self.append(&actions);

        *imp.btn_submit.borrow_mut() = Some(btn_submit);
    }

    fn field_label(text: &str) -> gtk::Label {
        gtk::Label::builder()
            .label(text)
            .css_classes(["heading"])
            .halign(gtk::Align::Start)
            .build()
    }

    fn build_text_field(&self, spec: &TextFieldSpec) -> gtk::Box {
        let container = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(6)
            .build();
        container.append(&Self::field_label(spec.label));

        let field = spec.field;
        let input = if spec.multiline {
            let view = gtk::TextView::builder()
                .wrap_mode(gtk::WrapMode::WordChar)
                .height_request(80)
                .top_margin(8)
                .bottom_margin(8)
                .left_margin(8)
                .right_margin(8)
                .tooltip_text(spec.placeholder)
                .build();
            view.buffer().connect_changed(glib::clone!(
                #[weak(rename_to = form_view)] self,
                move |_| { form_view.on_text_changed(field); }
            ));
            let frame = gtk::Frame::builder().child(&view).build();
            container.append(&frame);
            TextInput::Area(view)
        } else {
            let entry = gtk::Entry::builder()
                .placeholder_text(spec.placeholder)
                .build();
            entry.connect_changed(glib::clone!(
                #[weak(rename_to = form_view)] self,
                move |_| { form_view.on_text_changed(field); }
            ));
            container.append(&entry);
            TextInput::Line(entry)
        };

        self.imp().text_inputs.borrow_mut().push((field, input));
        container
    }

    fn build_select_field(&self, spec: &SelectFieldSpec) -> gtk::Box {
        let container = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(6)
            .build();
        container.append(&Self::field_label(spec.label));

        let row = gtk::Box::builder()
            .orientation(gtk::Orientation::Horizontal)
            .spacing(6)
            .build();

        let model = gtk::StringList::new(&[]);
        let expression = gtk::PropertyExpression::new(
            gtk::StringObject::static_type(),
            None::<gtk::Expression>,
            "string",
        );
        let dropdown = gtk::DropDown::builder()
            .model(&model)
            .expression(&expression)
            .enable_search(true)
            .search_match_mode(gtk::StringFilterMatchMode::Substring)
            .hexpand(true)
            .sensitive(false)
            .build();
        dropdown.set_selected(gtk::INVALID_LIST_POSITION);

        let field = spec.field;
        dropdown.connect_selected_notify(glib::clone!(
            #[weak(rename_to = view)] self,
            move |dropdown| { view.on_select_changed(field, dropdown.selected()); }
        ));

        let btn_clear = gtk::Button::builder()
            .icon_name("edit-clear-symbolic")
            .tooltip_text("Kosongkan pilihan")
            .css_classes(["flat"])
            .build();
        btn_clear.connect_clicked(glib::clone!(
            #[weak] dropdown,
            move |_| { dropdown.set_selected(gtk::INVALID_LIST_POSITION); }
        ));

        row.append(&dropdown);
        row.append(&btn_clear);
        container.append(&row);

        let hint = gtk::Label::builder()
            .label(spec.loading_placeholder)
            .css_classes(["dim-label", "caption"])
            .halign(gtk::Align::Start)
            .build();
        container.append(&hint);

        self.imp().selects.borrow_mut().push((
            field,
            SelectInput { dropdown, model, hint, spec: *spec },
        ));
        container
    }

    fn build_student_info(&self) -> gtk::Box {
        let container = gtk::Box::builder()
            .orientation(gtk::Orientation::Vertical)
            .spacing(12)
            .css_classes(["card", "student-info"])
            .visible(false)
            .build();

        let title = gtk::Label::builder()
            .label("Informasi Siswa")
            .css_classes(["title-4"])
            .halign(gtk::Align::Start)
            .margin_top(12)
            .margin_start(12)
            .build();
        container.append(&title);

        let grid = gtk::Grid::builder()
            .column_spacing(24)
            .row_spacing(6)
            .margin_start(12)
            .margin_end(12)
            .margin_bottom(12)
            .build();

        let mut values = Vec::new();
        for (row, caption) in ["NIS", "NISN", "Kelas Siswa"].iter().enumerate() {
            let key = gtk::Label::builder()
                .label(*caption)
                .css_classes(["dim-label"])
                .halign(gtk::Align::Start)
                .build();
            let value = gtk::Label::builder()
                .selectable(true)
                .halign(gtk::Align::Start)
                .build();
            grid.attach(&key, 0, row as i32, 1, 1);
            grid.attach(&value, 1, row as i32, 1, 1);
            values.push(value);
        }
        container.append(&grid);

        let [nis, nisn, kelas]: [gtk::Label; 3] = match values.try_into() {
            Ok(labels) => labels,
            Err(_) => return container,
        };
        *self.imp().student_info.borrow_mut() = Some(StudentInfo {
            container: container.clone(),
            nis,
            nisn,
            kelas,
        });
        container
    }

    fn load_reference_data(&self) {
        let Some(api) = self.imp().api.borrow().clone() else { return };

        let (tx, rx) = async_channel::bounded::<ReferenceData>(1);
        std::thread::spawn(move || {
            let data = load_reference_data(api.as_ref());
            let _ = tx.send_blocking(data);
        });

        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = view)] self,
            async move {
                if let Ok(data) = rx.recv().await {
                    view.on_reference_data(data);
                }
            }
        ));
    }

    fn on_reference_data(&self, data: ReferenceData) {
        let imp = self.imp();

        let mut select_ids = Vec::new();
        for (field, input) in imp.selects.borrow().iter() {
            let (labels, ids): (Vec<String>, Vec<EntityId>) = match field {
                SelectField::Staff => data
                    .staff
                    .iter()
                    .map(|o| (o.label.clone(), o.value.clone()))
                    .unzip(),
                SelectField::Student => data
                    .students
                    .iter()
                    .map(|o| (o.label.clone(), o.value.clone()))
                    .unzip(),
            };
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

            imp.syncing.set(true);
            input.model.splice(0, input.model.n_items(), &labels);
            input.dropdown.set_selected(gtk::INVALID_LIST_POSITION);
            input.dropdown.set_sensitive(true);
            imp.syncing.set(false);

            select_ids.push((*field, ids));
        }
        *imp.select_ids.borrow_mut() = select_ids;

        if let Some(ref mut form) = *imp.form.borrow_mut() {
            form.apply_reference_data(data);
        }
        self.sync_from_form();
    }

    fn on_text_changed(&self, field: TextField) {
        let imp = self.imp();
        if imp.syncing.get() {
            return;
        }

        let value = imp
            .text_inputs
            .borrow()
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, input)| input.text());

        let Some(value) = value else { return };
        if let Some(ref mut form) = *imp.form.borrow_mut() {
            form.set_text(field, value);
        }
    }

    fn on_select_changed(&self, field: SelectField, position: u32) {
        let imp = self.imp();
        if imp.syncing.get() {
            return;
        }

        let id = imp
            .select_ids
            .borrow()
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, ids)| ids.get(position as usize).cloned());
        debug!("{:?} selection changed to {:?}", field, id);

        if let Some(ref mut form) = *imp.form.borrow_mut() {
            form.select(field, id);
        }
        self.sync_from_form();
    }

    /// Push form state into the widgets. Selecting a student clears the
    /// contact fields, so every select change comes through here.
    fn sync_from_form(&self) {
        let imp = self.imp();
        imp.syncing.set(true);

        if let Some(ref form) = *imp.form.borrow() {
            for (field, input) in imp.text_inputs.borrow().iter() {
                input.set_text(form.state().text(*field));
            }

            let select_ids = imp.select_ids.borrow();
            for (field, input) in imp.selects.borrow().iter() {
                let selection = form.state().selection(*field);
                let position = select_ids
                    .iter()
                    .find(|(f, _)| f == field)
                    .and_then(|(_, ids)| {
                        selection.id().and_then(|id| ids.iter().position(|i| i == id))
                    })
                    .map(|p| p as u32)
                    .unwrap_or(gtk::INVALID_LIST_POSITION);
                if input.dropdown.selected() != position {
                    input.dropdown.set_selected(position);
                }

                let hint = if form.is_loading() {
                    input.spec.loading_placeholder
                } else {
                    input.spec.placeholder
                };
                input.hint.set_label(hint);
                input.hint.set_visible(form.is_loading() || selection.is_empty());
            }

            if let Some(ref info) = *imp.student_info.borrow() {
                let snapshot = form.snapshot();
                info.nis.set_label(&snapshot.nis);
                info.nisn.set_label(&snapshot.nisn);
                info.kelas.set_label(snapshot.class_label());
                info.container.set_visible(!snapshot.is_blank());
            }
        }

        imp.syncing.set(false);
        self.update_controls();
    }

    fn update_controls(&self) {
        let imp = self.imp();
        let (can_submit, submitting) = match imp.form.borrow().as_ref() {
            Some(form) => (form.can_submit(), form.is_submitting()),
            None => return,
        };

        if let Some(ref btn) = *imp.btn_submit.borrow() {
            btn.set_sensitive(can_submit);
            btn.set_label(if submitting { "Menyimpan..." } else { "Kirim Data" });
        }
    }

    fn submit(&self) {
        let imp = self.imp();
        let Some(api) = imp.api.borrow().clone() else { return };

        let begun = match imp.form.borrow_mut().as_mut() {
            Some(form) => form.begin_submit(),
            None => return,
        };
        let payload = match begun {
            Ok(payload) => payload,
            Err(blocked) => {
                if let Some(handlers) = self.handlers() {
                    (handlers.show_toast)(&blocked.to_string());
                }
                self.update_controls();
                return;
            }
        };
        self.update_controls();

        let (tx, rx) = async_channel::bounded::<Result<SubmitResponse, ApiError>>(1);
        std::thread::spawn(move || {
            let result = api.submit(&payload);
            let _ = tx.send_blocking(result);
        });

        glib::spawn_future_local(glib::clone!(
            #[weak(rename_to = view)] self,
            async move {
                if let Ok(result) = rx.recv().await {
                    view.on_submit_finished(result);
                }
            }
        ));
    }

    fn on_submit_finished(&self, result: Result<SubmitResponse, ApiError>) {
        let imp = self.imp();
        let outcome = match imp.form.borrow_mut().as_mut() {
            Some(form) => form.finish_submit(result),
            None => return,
        };

        if outcome.redirect().is_some() {
            if let Some(ref photo) = *imp.photo.borrow() {
                photo.reset();
            }
        }
        self.sync_from_form();

        let Some(handlers) = self.handlers() else { return };
        (handlers.show_notice)(outcome.notice());

        if let Some(redirect) = outcome.redirect() {
            info!("Returning to {} in {:?}", redirect.route, redirect.after);
            let navigate = handlers.navigate.clone();
            glib::timeout_add_local_once(redirect.after, move || navigate(redirect.route));
        }
    }
}
