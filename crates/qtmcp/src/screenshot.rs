/*!
Screenshot capture (§4.6). The shim hands back already-PNG-encoded bytes from Qt's
own `QPixmap::save`, so `image` is only needed for the one mode that requires
resampling: capture-window-logical, which downscales by the device pixel ratio so
image pixels map 1:1 to logical coordinates on HiDPI displays.
*/

use crate::error::{ProbeError, ProbeResult};
use crate::ffi::{self, Handle};
use base64::Engine;
use image::imageops::FilterType;
use image::ImageFormat;

pub fn capture_widget(handle: Handle) -> ProbeResult<String> {
  encode(ffi::capture_widget_png(handle))
}

pub fn capture_window(handle: Handle) -> ProbeResult<String> {
  encode(ffi::capture_window_png(handle))
}

pub fn capture_region(handle: Handle, x: f64, y: f64, w: f64, h: f64) -> ProbeResult<String> {
  encode(ffi::capture_region_png(handle, x, y, w, h))
}

pub fn capture_screen(handle: Handle) -> ProbeResult<String> {
  encode(ffi::capture_screen_png(handle))
}

/// Captures the window, then downscales by `device_pixel_ratio` so the decoded
/// image's dimensions equal the window's logical (not device) size (§4.6, and
/// scenario 6 in §8).
pub fn capture_window_logical(handle: Handle) -> ProbeResult<String> {
  let png_bytes = ffi::capture_window_png(handle);
  let dpr = ffi::device_pixel_ratio(handle);
  if (dpr - 1.0).abs() < f64::EPSILON {
    return encode(png_bytes);
  }

  let decoded = image::load_from_memory_with_format(&png_bytes, ImageFormat::Png)
    .map_err(|e| ProbeError::CaptureError { reason: e.to_string() })?;
  let (device_w, device_h) = (decoded.width(), decoded.height());
  let logical_w = (f64::from(device_w) / dpr).round().max(1.0) as u32;
  let logical_h = (f64::from(device_h) / dpr).round().max(1.0) as u32;
  let resized = decoded.resize_exact(logical_w, logical_h, FilterType::Lanczos3);

  let mut out = Vec::new();
  resized
    .write_to(&mut std::io::Cursor::new(&mut out), ImageFormat::Png)
    .map_err(|e| ProbeError::CaptureError { reason: e.to_string() })?;
  encode(out)
}

fn encode(png_bytes: Vec<u8>) -> ProbeResult<String> {
  if png_bytes.is_empty() {
    return Err(ProbeError::CaptureError {
      reason: "capture produced no image data".to_string(),
    });
  }
  Ok(base64::engine::general_purpose::STANDARD.encode(png_bytes))
}
