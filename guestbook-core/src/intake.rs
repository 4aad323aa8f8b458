//! Visitor intake form controller.
//!
//! One controller serves both visitor categories. A [`FormKind`] decides the
//! field set, whether the student directory lookup applies and which role
//! discriminator is sent with the submission.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use thiserror::Error;

use crate::api::{ApiError, GuestbookApi, SubmitResponse};
use crate::capture::CapturedImage;
use crate::model::{EntityId, Selection, StudentSnapshot};
use crate::navigation::Route;
use crate::reference::ReferenceData;
use crate::resolver::resolve_student;

pub const SAVED_MESSAGE: &str = "Data berhasil disimpan!";
pub const TRANSPORT_FAILURE_MESSAGE: &str = "Terjadi kesalahan saat menyimpan data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    /// Parent or guardian of a student.
    #[default]
    Parent,
    /// Any other visitor.
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Nama,
    Instansi,
    Kontak,
    Alamat,
    Keperluan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectField {
    Staff,
    Student,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextFieldSpec {
    pub field: TextField,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub multiline: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectFieldSpec {
    pub field: SelectField,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub loading_placeholder: &'static str,
}

/// One row of a form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormItem {
    Text(TextFieldSpec),
    Select(SelectFieldSpec),
    /// Read-only student details.
    StudentInfo,
}

const STAFF_SELECT: FormItem = FormItem::Select(SelectFieldSpec {
    field: SelectField::Staff,
    label: "Bertemu Dengan",
    placeholder: "Pilih pegawai yang ingin ditemui",
    loading_placeholder: "Memuat data pegawai...",
});

const CONTACT: FormItem = FormItem::Text(TextFieldSpec {
    field: TextField::Kontak,
    label: "Nomor Handphone",
    placeholder: "Contoh: 081234567890",
    multiline: false,
});

const PURPOSE: FormItem = FormItem::Text(TextFieldSpec {
    field: TextField::Keperluan,
    label: "Keperluan",
    placeholder: "Tuliskan keperluan Anda dengan jelas...",
    multiline: true,
});

const PARENT_LAYOUT: &[FormItem] = &[
    FormItem::Select(SelectFieldSpec {
        field: SelectField::Student,
        label: "Orang Tua dari Siswa",
        placeholder: "Cari dengan NIS atau nama siswa...",
        loading_placeholder: "Memuat data siswa...",
    }),
    FormItem::StudentInfo,
    FormItem::Text(TextFieldSpec {
        field: TextField::Nama,
        label: "Nama Orang Tua / Wali Yang Hadir",
        placeholder: "Masukkan nama lengkap",
        multiline: false,
    }),
    CONTACT,
    FormItem::Text(TextFieldSpec {
        field: TextField::Alamat,
        label: "Alamat",
        placeholder: "Masukkan alamat lengkap",
        multiline: true,
    }),
    STAFF_SELECT,
    PURPOSE,
];

const GENERAL_LAYOUT: &[FormItem] = &[
    FormItem::Text(TextFieldSpec {
        field: TextField::Nama,
        label: "Nama Lengkap",
        placeholder: "Nama lengkap Anda",
        multiline: false,
    }),
    CONTACT,
    FormItem::Text(TextFieldSpec {
        field: TextField::Instansi,
        label: "Asal Instansi",
        placeholder: "Nama instansi",
        multiline: false,
    }),
    FormItem::Text(TextFieldSpec {
        field: TextField::Alamat,
        label: "Alamat Instansi",
        placeholder: "Alamat lengkap instansi",
        multiline: true,
    }),
    STAFF_SELECT,
    PURPOSE,
];

impl FormKind {
    pub const ALL: [FormKind; 2] = [FormKind::Parent, FormKind::General];

    /// Category discriminator sent as `role`.
    pub fn role(self) -> &'static str {
        match self {
            FormKind::Parent => "ortu",
            FormKind::General => "umum",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            FormKind::Parent => "Orang Tua",
            FormKind::General => "Tamu Umum",
        }
    }

    pub fn has_student_lookup(self) -> bool {
        matches!(self, FormKind::Parent)
    }

    pub fn layout(self) -> &'static [FormItem] {
        match self {
            FormKind::Parent => PARENT_LAYOUT,
            FormKind::General => GENERAL_LAYOUT,
        }
    }

    pub fn has_text_field(self, field: TextField) -> bool {
        self.layout()
            .iter()
            .any(|item| matches!(item, FormItem::Text(spec) if spec.field == field))
    }

    pub fn has_select_field(self, field: SelectField) -> bool {
        self.layout()
            .iter()
            .any(|item| matches!(item, FormItem::Select(spec) if spec.field == field))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub nama: String,
    pub instansi: String,
    pub kontak: String,
    pub alamat: String,
    pub keperluan: String,
    pub id_pegawai: Selection,
    pub idsiswa: Selection,
    pub foto_tamu: Option<CapturedImage>,
}

impl FormState {
    pub fn text(&self, field: TextField) -> &str {
        match field {
            TextField::Nama => &self.nama,
            TextField::Instansi => &self.instansi,
            TextField::Kontak => &self.kontak,
            TextField::Alamat => &self.alamat,
            TextField::Keperluan => &self.keperluan,
        }
    }

    fn text_mut(&mut self, field: TextField) -> &mut String {
        match field {
            TextField::Nama => &mut self.nama,
            TextField::Instansi => &mut self.instansi,
            TextField::Kontak => &mut self.kontak,
            TextField::Alamat => &mut self.alamat,
            TextField::Keperluan => &mut self.keperluan,
        }
    }

    pub fn selection(&self, field: SelectField) -> &Selection {
        match field {
            SelectField::Staff => &self.id_pegawai,
            SelectField::Student => &self.idsiswa,
        }
    }
}

/// JSON body of `POST /guestbook/store`.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionPayload {
    pub nama: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instansi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idsiswa: Option<Selection>,
    pub kontak: String,
    pub alamat: String,
    pub id_pegawai: Selection,
    pub keperluan: String,
    #[serde(serialize_with = "serialize_photo")]
    pub foto_tamu: Option<CapturedImage>,
    pub role: &'static str,
}

fn serialize_photo<S: Serializer>(
    photo: &Option<CapturedImage>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match photo {
        Some(image) => image.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Loading,
    Ready,
}

/// Why the submit trigger is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitBlocked {
    #[error("Data sedang dikirim")]
    AlreadySubmitting,
    #[error("Data pegawai dan siswa masih dimuat")]
    ReferenceDataLoading,
    #[error("Foto belum diambil")]
    MissingPhoto,
    #[error("{0} wajib diisi")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// Message shown to the visitor after a submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn success() -> Self {
        Self { kind: NoticeKind::Success, message: SAVED_MESSAGE.to_string() }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Failure, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub route: Route,
    pub after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored; the form has been reset.
    Saved { notice: Notice, redirect: Redirect },
    /// The server refused the entry. Form state is untouched.
    Rejected { notice: Notice },
    /// The request did not complete. Form state is untouched.
    Failed { notice: Notice },
}

impl SubmitOutcome {
    pub fn notice(&self) -> &Notice {
        match self {
            SubmitOutcome::Saved { notice, .. }
            | SubmitOutcome::Rejected { notice }
            | SubmitOutcome::Failed { notice } => notice,
        }
    }

    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            SubmitOutcome::Saved { redirect, .. } => Some(*redirect),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct IntakeForm {
    kind: FormKind,
    state: FormState,
    snapshot: StudentSnapshot,
    reference: ReferenceData,
    load_state: LoadState,
    submitting: bool,
    redirect_delay: Duration,
}

impl IntakeForm {
    pub fn new(kind: FormKind, redirect_delay: Duration) -> Self {
        Self {
            kind,
            state: FormState::default(),
            snapshot: StudentSnapshot::blank(),
            reference: ReferenceData::empty(),
            load_state: LoadState::Loading,
            submitting: false,
            redirect_delay,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn snapshot(&self) -> &StudentSnapshot {
        &self.snapshot
    }

    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn set_text(&mut self, field: TextField, value: impl Into<String>) {
        if !self.kind.has_text_field(field) {
            warn!("{:?} form has no {:?} field", self.kind, field);
            return;
        }
        *self.state.text_mut(field) = value.into();
    }

    /// Store the selected id, or clear the selection with `None`.
    pub fn select(&mut self, field: SelectField, id: Option<EntityId>) {
        if !self.kind.has_select_field(field) {
            warn!("{:?} form has no {:?} select", self.kind, field);
            return;
        }

        match field {
            SelectField::Staff => self.state.id_pegawai = Selection(id),
            SelectField::Student => {
                self.state.idsiswa = Selection(id);
                self.refresh_student();
            }
        }
    }

    pub fn set_photo(&mut self, photo: Option<CapturedImage>) {
        debug!("Photo {}", if photo.is_some() { "set" } else { "cleared" });
        self.state.foto_tamu = photo;
    }

    /// Finish the loading phase with the normalized option lists.
    pub fn apply_reference_data(&mut self, data: ReferenceData) {
        self.reference = data;
        self.load_state = LoadState::Ready;
        if self.kind.has_student_lookup() {
            self.refresh_student();
        }
    }

    /// Re-derive the snapshot and drop the per-visit contact details.
    fn refresh_student(&mut self) {
        self.snapshot = resolve_student(&self.reference, self.state.idsiswa.id());
        self.state.kontak.clear();
        self.state.alamat.clear();
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && self.state.foto_tamu.is_some() && !self.is_loading()
    }

    pub fn payload(&self) -> SubmissionPayload {
        let state = &self.state;
        SubmissionPayload {
            nama: state.nama.clone(),
            instansi: self
                .kind
                .has_text_field(TextField::Instansi)
                .then(|| state.instansi.clone()),
            idsiswa: self
                .kind
                .has_select_field(SelectField::Student)
                .then(|| state.idsiswa.clone()),
            kontak: state.kontak.clone(),
            alamat: state.alamat.clone(),
            id_pegawai: state.id_pegawai.clone(),
            keperluan: state.keperluan.clone(),
            foto_tamu: state.foto_tamu.clone(),
            role: self.kind.role(),
        }
    }

    /// First required field left empty, in display order.
    pub fn missing_field(&self) -> Option<&'static str> {
        self.kind.layout().iter().find_map(|item| match item {
            FormItem::Text(spec) if self.state.text(spec.field).trim().is_empty() => {
                Some(spec.label)
            }
            FormItem::Select(spec) if self.state.selection(spec.field).is_empty() => {
                Some(spec.label)
            }
            _ => None,
        })
    }

    /// Check the gates and enter the submitting phase.
    pub fn begin_submit(&mut self) -> Result<SubmissionPayload, SubmitBlocked> {
        if self.submitting {
            return Err(SubmitBlocked::AlreadySubmitting);
        }
        if self.is_loading() {
            return Err(SubmitBlocked::ReferenceDataLoading);
        }
        if self.state.foto_tamu.is_none() {
            return Err(SubmitBlocked::MissingPhoto);
        }
        if let Some(label) = self.missing_field() {
            return Err(SubmitBlocked::MissingField(label));
        }

        self.submitting = true;
        Ok(self.payload())
    }

    /// Apply the result of the submission request. Always leaves the
    /// submitting phase.
    pub fn finish_submit(&mut self, result: Result<SubmitResponse, ApiError>) -> SubmitOutcome {
        if !self.submitting {
            debug!("Submission result arrived outside the submitting phase");
        }

        let outcome = match result {
            Ok(response) if response.success => {
                info!("Guestbook entry saved ({})", self.kind.role());
                self.reset();
                SubmitOutcome::Saved {
                    notice: Notice::success(),
                    redirect: Redirect { route: Route::Landing, after: self.redirect_delay },
                }
            }
            Ok(response) => {
                warn!("Guestbook entry rejected: {:?}", response.message);
                SubmitOutcome::Rejected { notice: rejection_notice(response.message.as_deref()) }
            }
            Err(e) => match e.server_message() {
                Some(message) => {
                    warn!("Guestbook entry rejected: {}", e);
                    SubmitOutcome::Rejected { notice: rejection_notice(Some(message)) }
                }
                None => {
                    error!("Error submitting form: {}", e);
                    SubmitOutcome::Failed { notice: Notice::failure(TRANSPORT_FAILURE_MESSAGE) }
                }
            },
        };

        self.submitting = false;
        outcome
    }

    /// Run a whole submission against `api` on the calling thread.
    pub fn submit_with(&mut self, api: &dyn GuestbookApi) -> Result<SubmitOutcome, SubmitBlocked> {
        let payload = self.begin_submit()?;
        let result = api.submit(&payload);
        Ok(self.finish_submit(result))
    }

    /// Back to empty fields. Loaded reference data is kept.
    pub fn reset(&mut self) {
        self.state = FormState::default();
        self.snapshot = StudentSnapshot::blank();
    }
}

fn rejection_notice(message: Option<&str>) -> Notice {
    match message.filter(|m| !m.is_empty()) {
        Some(message) => Notice::failure(format!("Gagal menyimpan data: {}", message)),
        None => Notice::failure("Gagal menyimpan data."),
    }
}
