//! Visitor intake workflow for the school guestbook kiosk.
//!
//! Everything here is UI-toolkit agnostic: the `guestbook` application wires
//! these types to GTK widgets and an OpenCV camera.

pub mod api;
pub mod capture;
pub mod config;
pub mod intake;
pub mod model;
pub mod navigation;
pub mod reference;
pub mod resolver;

pub use api::{ApiError, GuestbookApi, HttpGuestbookApi, SubmitResponse};
pub use capture::{CaptureError, CaptureState, CapturedImage, Frame, PhotoCapture};
pub use config::{ConfigError, GuestbookConfig};
pub use intake::{
    FormItem, FormKind, IntakeForm, Notice, NoticeKind, SelectField, SubmitBlocked, SubmitOutcome,
    TextField,
};
pub use model::{DirectoryOption, EntityId, Selection, StudentOption, StudentSnapshot};
pub use navigation::{Navigator, Route};
pub use reference::{load_reference_data, ReferenceData};
