//! Capture-widget adapters.
//!
//! GPS, camera, and signature pads are platform widgets. The core only needs the value
//! they produce, so each is a small trait that a platform implements. `Ok(None)` means
//! the user dismissed the widget; errors are reported to the user but never abort the
//! wizard, and the target field stays as it was.

use std::fmt;
use std::str::FromStr;

/// Field paths the captured values are merged into.
pub const LATITUDE_PATH: &str = "endereco.latitude";
pub const LONGITUDE_PATH: &str = "endereco.longitude";
pub const PHOTO_PATH: &str = "fotoOcorrencia";
pub const SIGNATURE_PATH: &str = "assinaturaDigital";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("permissão negada pelo usuário ou pelo sistema")]
    PermissionDenied,
    #[error("recurso indisponível neste dispositivo")]
    Unavailable,
    #[error("falha na captura: {0}")]
    Failed(String),
}

/// Which widget a capture came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureKind {
    Location,
    Photo,
    Signature,
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureKind::Location => "localização",
            CaptureKind::Photo => "foto",
            CaptureKind::Signature => "assinatura",
        })
    }
}

/// A WGS84 position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// # Errors
    ///
    /// Returns [`CaptureError::Failed`] when either value is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CaptureError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CaptureError::Failed(format!(
                "coordinates out of range: {latitude}, {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl FromStr for Coordinates {
    type Err = CaptureError;

    /// Parses `"<lat>,<lon>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| CaptureError::Failed(format!("expected 'lat,lon', got '{s}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .map_err(|_| CaptureError::Failed(format!("'{}' is not a number", v.trim())))
        };
        Self::new(parse(lat)?, parse(lon)?)
    }
}

pub trait LocationCapture {
    fn capture_location(&mut self) -> Result<Option<Coordinates>, CaptureError>;
}

pub trait PhotoCapture {
    /// Returns a reference to the stored photo (path, URL or platform handle).
    fn capture_photo(&mut self) -> Result<Option<String>, CaptureError>;
}

pub trait SignatureCapture {
    /// Returns the signature as an image data URL (`data:image/...;base64,...`).
    fn capture_signature(&mut self) -> Result<Option<String>, CaptureError>;
}

/// Checks that `value` is an image data URL.
pub fn ensure_image_data_url(value: &str) -> Result<(), CaptureError> {
    if value.starts_with("data:image/") && value.contains(";base64,") {
        Ok(())
    } else {
        Err(CaptureError::Failed(
            "signature is not an image data URL".into(),
        ))
    }
}
