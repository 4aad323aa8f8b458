use anyhow::{bail, Context, Result};
use guestbook_core::config::CameraConfig;
use guestbook_core::Frame;
use log::{debug, info, warn};
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_V4L2};
use std::fs;
use std::time::Duration;

/// ~20fps preview
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

/// A stream stopped moments ago may still hold the device.
const OPEN_ATTEMPTS: u32 = 3;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub enum CameraEvent {
    Frame(Frame),
    Failed(String),
}

pub struct Camera {
    cap: VideoCapture,
}

impl Camera {
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let device_id = config.device_id;
        info!("Opening camera {} ({})", device_id, Self::device_name(device_id));

        let mut cap = VideoCapture::new(device_id, CAP_V4L2)
            .with_context(|| format!("Failed to open camera {}", device_id))?;

        if !cap.is_opened().unwrap_or(false) {
            bail!("Camera {} not opened", device_id);
        }

        cap.set(videoio::CAP_PROP_FRAME_WIDTH, config.frame_width as f64).ok();
        cap.set(videoio::CAP_PROP_FRAME_HEIGHT, config.frame_height as f64).ok();
        cap.set(videoio::CAP_PROP_FPS, 30.0).ok();

        Ok(Self { cap })
    }

    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut mat = opencv::core::Mat::default();
        self.cap.read(&mut mat).context("Failed to read frame")?;

        if mat.empty() {
            bail!("Empty frame");
        }

        let mut rgb_mat = opencv::core::Mat::default();
        opencv::imgproc::cvt_color(&mat, &mut rgb_mat, opencv::imgproc::COLOR_BGR2RGB, 0)
            .context("Color conversion failed")?;

        let width = rgb_mat.cols() as u32;
        let height = rgb_mat.rows() as u32;
        let data = rgb_mat
            .data_bytes()
            .context("Failed to get frame data")?
            .to_vec();

        Ok(Frame {
            rgb_data: data,
            width,
            height,
        })
    }

    fn device_name(device_id: i32) -> String {
        let path = format!("/sys/class/video4linux/video{}/name", device_id);
        fs::read_to_string(&path)
            .unwrap_or_else(|_| format!("video{}", device_id))
            .trim()
            .to_string()
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        let _ = self.cap.release();
    }
}

/// Stream frames from the configured camera on a worker thread. The
/// worker stops once the receiver is dropped.
pub fn start_stream(config: &CameraConfig) -> async_channel::Receiver<CameraEvent> {
    let (tx, rx) = async_channel::bounded::<CameraEvent>(2);
    let config = config.clone();

    std::thread::spawn(move || {
        let mut camera = match open_with_retry(&config) {
            Ok(camera) => camera,
            Err(e) => {
                warn!("{:#}", e);
                let _ = tx.send_blocking(CameraEvent::Failed(format!("{:#}", e)));
                return;
            }
        };

        loop {
            match camera.read_frame() {
                Ok(frame) => {
                    if tx.send_blocking(CameraEvent::Frame(frame)).is_err() {
                        break;
                    }
                    std::thread::sleep(FRAME_INTERVAL);
                }
                Err(e) => {
                    warn!("{:#}", e);
                    let _ = tx.send_blocking(CameraEvent::Failed(format!("{:#}", e)));
                    break;
                }
            }
        }
        debug!("Camera stream stopped");
    });

    rx
}

fn open_with_retry(config: &CameraConfig) -> Result<Camera> {
    let mut attempt = 1;
    loop {
        match Camera::open(config) {
            Ok(camera) => return Ok(camera),
            Err(e) if attempt < OPEN_ATTEMPTS => {
                debug!("Camera open attempt {} failed: {:#}", attempt, e);
                attempt += 1;
                std::thread::sleep(OPEN_RETRY_DELAY);
            }
            Err(e) => return Err(e),
        }
    }
}
