//! Photo capture state machine.
//!
//! The camera device itself lives in the application; this module only
//! tracks which state the capture widget is in and turns a raw frame into
//! the JPEG still that is submitted with the form.

use base64::{engine::general_purpose, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use log::{debug, info, warn};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::CameraConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera is not streaming")]
    NotLive,
    #[error("no photo has been captured")]
    NotCaptured,
    #[error("camera unavailable: {0}")]
    Device(String),
    #[error("invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
    #[error("failed to encode photo: {0}")]
    Encode(String),
}

/// A raw RGB frame as read from the camera.
#[derive(Debug, Clone)]
pub struct Frame {
    pub rgb_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// The buffer holds exactly `width * height` RGB pixels.
    pub fn validate(&self) -> Result<(), CaptureError> {
        let expected = self.expected_len();
        if self.rgb_data.len() != expected || expected == 0 {
            return Err(CaptureError::InvalidFrame {
                expected,
                actual: self.rgb_data.len(),
            });
        }
        Ok(())
    }

    /// Horizontally flipped copy, matching a mirrored preview. Only
    /// meaningful for a frame that passes [`Frame::validate`].
    pub fn mirrored(&self) -> Frame {
        let row_len = self.width as usize * 3;
        if row_len == 0 {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.rgb_data.len());
        for row in self.rgb_data.chunks_exact(row_len) {
            for px in row.chunks_exact(3).rev() {
                data.extend_from_slice(px);
            }
        }
        Frame {
            rgb_data: data,
            width: self.width,
            height: self.height,
        }
    }
}

/// An encoded still frame. Serializes as a `data:` URL, the form the
/// backend stores in `foto_tamu`.
#[derive(Clone, PartialEq, Eq)]
pub struct CapturedImage {
    jpeg: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl CapturedImage {
    pub fn encode(frame: &Frame, quality: u8) -> Result<Self, CaptureError> {
        frame.validate()?;

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
            .encode(&frame.rgb_data, frame.width, frame.height, ExtendedColorType::Rgb8)
            .map_err(|e| CaptureError::Encode(e.to_string()))?;

        debug!("Encoded {}x{} photo ({} bytes)", frame.width, frame.height, jpeg.len());
        Ok(Self {
            jpeg: jpeg.into(),
            width: frame.width,
            height: frame.height,
        })
    }

    pub fn jpeg_bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(&self.jpeg)
        )
    }
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("jpeg_len", &self.jpeg.len())
            .finish()
    }
}

impl Serialize for CapturedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data_url())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    AwaitingDevice,
    /// Terminal until the widget is recreated.
    Error(String),
    Live,
    Captured(CapturedImage),
}

pub type PhotoCallback = Box<dyn FnMut(Option<&CapturedImage>)>;

pub struct PhotoCapture {
    state: CaptureState,
    /// Set when the device is lost while a photo is held; retake then
    /// lands in `Error` instead of a preview that will never update.
    lost_device: Option<String>,
    mirrored: bool,
    jpeg_quality: u8,
    on_change: Option<PhotoCallback>,
}

impl fmt::Debug for PhotoCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoCapture")
            .field("state", &self.state)
            .field("lost_device", &self.lost_device)
            .field("mirrored", &self.mirrored)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("has_callback", &self.on_change.is_some())
            .finish()
    }
}

impl PhotoCapture {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            state: CaptureState::AwaitingDevice,
            lost_device: None,
            mirrored: config.mirrored,
            jpeg_quality: config.jpeg_quality,
            on_change: None,
        }
    }

    /// Register the callback invoked with the photo on capture and with
    /// `None` on retake.
    pub fn connect_changed(&mut self, callback: PhotoCallback) {
        self.on_change = Some(callback);
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        match &self.state {
            CaptureState::Captured(image) => Some(image),
            _ => None,
        }
    }

    pub fn can_capture(&self) -> bool {
        self.state == CaptureState::Live
    }

    pub fn can_retake(&self) -> bool {
        matches!(self.state, CaptureState::Captured(_))
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// The device delivered its first frame.
    pub fn device_ready(&mut self) {
        match self.state {
            CaptureState::AwaitingDevice => {
                info!("Camera ready");
                self.state = CaptureState::Live;
            }
            _ => debug!("Ignoring device ready in state {:?}", self.state),
        }
    }

    /// The device could not be opened, or stopped delivering frames.
    /// A held photo survives until it is retaken.
    pub fn device_failed(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        match self.state {
            CaptureState::AwaitingDevice | CaptureState::Live => {
                warn!("Camera unavailable: {}", reason);
                self.state = CaptureState::Error(reason);
            }
            CaptureState::Captured(_) => {
                warn!("Camera lost while a photo is held: {}", reason);
                self.lost_device = Some(reason);
            }
            CaptureState::Error(_) => debug!("Ignoring repeated device failure: {}", reason),
        }
    }

    /// Freeze `frame` as the visitor photo.
    pub fn capture(&mut self, frame: &Frame) -> Result<&CapturedImage, CaptureError> {
        match &self.state {
            CaptureState::Live => {}
            CaptureState::Error(reason) => return Err(CaptureError::Device(reason.clone())),
            _ => return Err(CaptureError::NotLive),
        }

        frame.validate()?;
        let image = if self.mirrored {
            CapturedImage::encode(&frame.mirrored(), self.jpeg_quality)?
        } else {
            CapturedImage::encode(frame, self.jpeg_quality)?
        };

        info!("Photo captured");
        if let Some(callback) = self.on_change.as_mut() {
            callback(Some(&image));
        }
        self.state = CaptureState::Captured(image);
        self.image().ok_or(CaptureError::NotCaptured)
    }

    /// Drop the held photo and go back to the live preview.
    pub fn retake(&mut self) -> Result<(), CaptureError> {
        if !self.can_retake() {
            return Err(CaptureError::NotCaptured);
        }

        self.state = match self.lost_device.take() {
            Some(reason) => CaptureState::Error(reason),
            None => CaptureState::Live,
        };
        if let Some(callback) = self.on_change.as_mut() {
            callback(None);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn frame(width: u32, height: u32) -> Frame {
        let mut rgb_data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                rgb_data.extend_from_slice(&[(x * 40) as u8, (y * 40) as u8, 128]);
            }
        }
        Frame { rgb_data, width, height }
    }

    fn live_capture() -> PhotoCapture {
        let mut capture = PhotoCapture::new(&CameraConfig::default());
        capture.device_ready();
        capture
    }

    #[test]
    fn capture_is_disabled_until_device_is_ready() {
        let mut capture = PhotoCapture::new(&CameraConfig::default());
        assert_eq!(capture.state(), &CaptureState::AwaitingDevice);
        assert!(!capture.can_capture());
        assert_eq!(capture.capture(&frame(4, 4)).unwrap_err(), CaptureError::NotLive);

        capture.device_ready();
        assert!(capture.can_capture());
    }

    #[test]
    fn device_error_is_terminal() {
        let mut capture = PhotoCapture::new(&CameraConfig::default());
        capture.device_failed("permission denied");
        assert_eq!(capture.state(), &CaptureState::Error("permission denied".to_string()));

        capture.device_ready();
        assert!(!capture.can_capture());
        assert!(matches!(capture.capture(&frame(4, 4)), Err(CaptureError::Device(_))));
    }

    #[test]
    fn capture_then_retake_cycles_through_states() {
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
        let mut capture = live_capture();
        let log = seen.clone();
        capture.connect_changed(Box::new(move |image| log.borrow_mut().push(image.is_some())));

        capture.capture(&frame(4, 4)).expect("capture");
        assert!(capture.image().is_some());
        assert!(!capture.can_capture());
        assert_eq!(capture.capture(&frame(4, 4)).unwrap_err(), CaptureError::NotLive);

        capture.retake().expect("retake");
        assert!(capture.image().is_none());
        assert!(capture.can_capture());

        capture.capture(&frame(4, 4)).expect("second capture");
        assert!(!capture.can_capture());

        assert_eq!(*seen.borrow(), vec![true, false, true]);
    }

    #[test]
    fn retake_without_photo_is_rejected() {
        let mut capture = live_capture();
        assert_eq!(capture.retake().unwrap_err(), CaptureError::NotCaptured);
        assert_eq!(capture.state(), &CaptureState::Live);
    }

    #[test]
    fn mismatched_frame_is_rejected_without_state_change() {
        let mut capture = live_capture();
        let bad = Frame { rgb_data: vec![0; 5], width: 2, height: 2 };
        assert!(matches!(
            capture.capture(&bad),
            Err(CaptureError::InvalidFrame { expected: 12, actual: 5 })
        ));
        assert!(capture.can_capture());
    }

    #[test]
    fn truncated_frame_reports_its_real_length() {
        let mut capture = live_capture();
        assert!(capture.is_mirrored());
        let truncated = Frame { rgb_data: vec![0; 14], width: 2, height: 3 };
        assert_eq!(
            capture.capture(&truncated).unwrap_err(),
            CaptureError::InvalidFrame { expected: 18, actual: 14 }
        );
        let empty = Frame { rgb_data: Vec::new(), width: 0, height: 4 };
        assert_eq!(
            capture.capture(&empty).unwrap_err(),
            CaptureError::InvalidFrame { expected: 0, actual: 0 }
        );
        assert_eq!(capture.state(), &CaptureState::Live);
    }

    #[test]
    fn losing_the_device_while_live_disables_capture() {
        let mut capture = live_capture();
        capture.device_failed("read timeout");
        assert_eq!(capture.state(), &CaptureState::Error("read timeout".to_string()));
        assert!(!capture.can_capture());
        assert!(matches!(capture.capture(&frame(4, 4)), Err(CaptureError::Device(_))));
    }

    #[test]
    fn held_photo_survives_device_loss_until_retake() {
        let mut capture = live_capture();
        capture.capture(&frame(4, 4)).expect("capture");

        capture.device_failed("unplugged");
        assert!(capture.image().is_some());

        capture.retake().expect("retake");
        assert_eq!(capture.state(), &CaptureState::Error("unplugged".to_string()));
        assert!(!capture.can_capture());
    }

    #[test]
    fn captured_image_is_a_jpeg_data_url() {
        let mut capture = live_capture();
        let image = capture.capture(&frame(8, 6)).expect("capture").clone();

        assert_eq!(&image.jpeg_bytes()[..2], &[0xFF, 0xD8]);
        assert_eq!(image.dimensions(), (8, 6));
        assert!(image.data_url().starts_with("data:image/jpeg;base64,/9j/"));
        assert_eq!(
            serde_json::to_value(&image).unwrap(),
            serde_json::Value::String(image.data_url())
        );
    }

    #[test]
    fn mirroring_flips_each_row() {
        let f = Frame {
            rgb_data: vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4],
            width: 2,
            height: 2,
        };
        assert_eq!(f.mirrored().rgb_data, vec![2, 2, 2, 1, 1, 1, 4, 4, 4, 3, 3, 3]);
    }
}
