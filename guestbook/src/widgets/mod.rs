pub mod intake_form;
pub mod photo_capture;
