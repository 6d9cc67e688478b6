use crate::{
    assets::photo::SourcePhoto,
    foundation::core::{Point, Size},
    foundation::error::{AnchorFailure, PhotoslotError, PhotoslotResult},
    template::model::AnchorMode,
};

const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// Result reported by an external subject-detection step, keyed to the template's anchor mode.
pub enum RawDetection {
    /// A subject feature was found.
    Found {
        /// Feature point X in source-photo pixels.
        x: f64,
        /// Feature point Y in source-photo pixels.
        y: f64,
        /// Linear feature size (e.g. face height) in source pixels, when the backend reports one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        feature_size: Option<f64>,
        /// Backend confidence in `[0, 1]`, when reported.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confidence: Option<f64>,
    },
    /// The backend found nothing.
    NotFound,
}

impl RawDetection {
    /// A detection with a point and feature size and no confidence score.
    pub fn found(x: f64, y: f64, feature_size: f64) -> Self {
        Self::Found {
            x,
            y,
            feature_size: Some(feature_size),
            confidence: None,
        }
    }

    /// Derive the detection for `mode` from face landmarks.
    ///
    /// `eyes` uses the eye line (estimated a quarter face above center when the
    /// backend has no eye keypoints); `shoulders` sits one face height below the
    /// face center. The feature size is always the face height. Modes that do
    /// not consume detections yield [`RawDetection::NotFound`].
    pub fn from_landmarks(landmarks: &FaceLandmarks, mode: AnchorMode) -> Self {
        let FaceLandmarks {
            center_x,
            center_y,
            eye_y,
            face_height,
            confidence,
        } = *landmarks;
        let y = match mode {
            AnchorMode::FaceCenter => center_y,
            AnchorMode::Eyes => eye_y.unwrap_or(center_y - face_height / 4.0),
            AnchorMode::Shoulders => center_y + face_height,
            AnchorMode::BboxCenter | AnchorMode::None => return Self::NotFound,
        };
        Self::Found {
            x: center_x,
            y,
            feature_size: Some(face_height),
            confidence: Some(confidence),
        }
    }

    /// Shift the detection point, e.g. after cropping the photo it was measured on.
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        match self {
            Self::Found {
                x,
                y,
                feature_size,
                confidence,
            } => Self::Found {
                x: x + dx,
                y: y + dy,
                feature_size,
                confidence,
            },
            Self::NotFound => Self::NotFound,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Face landmarks in absolute source-photo pixels.
pub struct FaceLandmarks {
    /// Face center X.
    pub center_x: f64,
    /// Face center Y.
    pub center_y: f64,
    /// Average eye Y, when the backend reports eye keypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eye_y: Option<f64>,
    /// Face bounding-box height.
    pub face_height: f64,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// Normalized anchor for one source photo.
pub enum AnchorObservation {
    /// A feature point with a linear size used to derive scale.
    Feature {
        /// Anchor point in source pixels.
        point: Point,
        /// Linear feature size in source pixels; always > 0.
        feature_size: f64,
        /// Source photo dimensions.
        photo_size: Size,
    },
    /// No anchor: cover the slot with the whole photo, centered.
    FitToSlot {
        /// Source photo dimensions.
        photo_size: Size,
    },
}

impl AnchorObservation {
    /// Source photo dimensions.
    pub fn photo_size(&self) -> Size {
        match *self {
            Self::Feature { photo_size, .. } | Self::FitToSlot { photo_size } => photo_size,
        }
    }

    /// The same observation for a horizontally mirrored photo.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Feature {
                point,
                feature_size,
                photo_size,
            } => Self::Feature {
                point: Point::new(photo_size.width - point.x, point.y),
                feature_size,
                photo_size,
            },
            Self::FitToSlot { .. } => self,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case", rename_all_fields = "camelCase")]
/// What to do when a detection has a point but no feature size.
pub enum FeatureSizeFallback {
    /// Fail with [`AnchorFailure::MissingFeatureSize`].
    #[default]
    Reject,
    /// Use a fixed fraction of the photo height as the feature size.
    PhotoHeightRatio {
        /// Fraction of photo height, > 0.
        ratio: f64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
/// Anchor resolution settings.
pub struct AnchorSettings {
    /// A reported confidence must be strictly above this; detections at or
    /// below it are treated as missing.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Policy for detections without a feature size.
    #[serde(default)]
    pub missing_feature_size: FeatureSizeFallback,
}

impl Default for AnchorSettings {
    fn default() -> Self {
        Self {
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            missing_feature_size: FeatureSizeFallback::Reject,
        }
    }
}

impl AnchorSettings {
    /// Validate thresholds and ratios.
    pub fn validate(&self) -> PhotoslotResult<()> {
        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PhotoslotError::config(
                "minConfidence must be finite and within [0, 1]",
            ));
        }
        if let FeatureSizeFallback::PhotoHeightRatio { ratio } = self.missing_feature_size
            && (!ratio.is_finite() || ratio <= 0.0)
        {
            return Err(PhotoslotError::config(
                "missingFeatureSize ratio must be finite and > 0",
            ));
        }
        Ok(())
    }
}

fn default_min_confidence() -> f64 {
    DEFAULT_MIN_CONFIDENCE
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Caller's explicit choice for photos whose required detection is missing.
pub enum DetectionFallback {
    /// Surface [`AnchorFailure::NoDetection`].
    #[default]
    Fail,
    /// Retry with `bbox_center`.
    BboxCenter,
}

/// Normalize a detection into an [`AnchorObservation`] for `mode`.
///
/// Never substitutes a different mode: a missing detection for a
/// detection-driven mode is reported as [`AnchorFailure::NoDetection`].
pub fn resolve(
    mode: AnchorMode,
    detection: &RawDetection,
    photo: &SourcePhoto,
    settings: &AnchorSettings,
) -> Result<AnchorObservation, AnchorFailure> {
    match mode {
        AnchorMode::BboxCenter => Ok(bbox_observation(photo)),
        _ => resolve_for_frame(mode, detection, photo.size(), settings),
    }
}

/// [`resolve`] for a photo known only by its dimensions.
///
/// The photo is treated as opaque, so `bbox_center` anchors on the frame center.
pub fn resolve_for_frame(
    mode: AnchorMode,
    detection: &RawDetection,
    photo_size: Size,
    settings: &AnchorSettings,
) -> Result<AnchorObservation, AnchorFailure> {
    match mode {
        m if m.requires_detection() => resolve_detected(mode, detection, photo_size, settings),
        AnchorMode::BboxCenter => Ok(AnchorObservation::Feature {
            point: photo_size.to_rect().center(),
            feature_size: photo_size.height,
            photo_size,
        }),
        _ => Ok(AnchorObservation::FitToSlot { photo_size }),
    }
}

/// [`resolve`], then apply the caller's explicit fallback for missing detections.
pub fn resolve_with_fallback(
    mode: AnchorMode,
    detection: &RawDetection,
    photo: &SourcePhoto,
    settings: &AnchorSettings,
    fallback: DetectionFallback,
) -> Result<AnchorObservation, AnchorFailure> {
    match resolve(mode, detection, photo, settings) {
        Err(AnchorFailure::NoDetection { mode }) if fallback == DetectionFallback::BboxCenter => {
            tracing::warn!(%mode, "no detection, falling back to bbox_center");
            Ok(bbox_observation(photo))
        }
        other => other,
    }
}

fn resolve_detected(
    mode: AnchorMode,
    detection: &RawDetection,
    photo_size: Size,
    settings: &AnchorSettings,
) -> Result<AnchorObservation, AnchorFailure> {
    let RawDetection::Found {
        x,
        y,
        feature_size,
        confidence,
    } = *detection
    else {
        return Err(AnchorFailure::NoDetection { mode });
    };

    if !x.is_finite() || !y.is_finite() {
        return Err(AnchorFailure::InvalidDetection(format!(
            "point ({x}, {y}) is not finite"
        )));
    }
    if let Some(c) = confidence {
        if !c.is_finite() {
            return Err(AnchorFailure::InvalidDetection(format!(
                "confidence {c} is not finite"
            )));
        }
        if c <= settings.min_confidence {
            tracing::debug!(%mode, confidence = c, threshold = settings.min_confidence, "detection at or below confidence threshold");
            return Err(AnchorFailure::NoDetection { mode });
        }
    }

    let feature_size = match feature_size {
        Some(fs) if fs.is_finite() && fs > 0.0 => fs,
        Some(fs) => {
            return Err(AnchorFailure::InvalidDetection(format!(
                "feature size {fs} must be finite and > 0"
            )));
        }
        None => match settings.missing_feature_size {
            FeatureSizeFallback::Reject => return Err(AnchorFailure::MissingFeatureSize { mode }),
            FeatureSizeFallback::PhotoHeightRatio { ratio } => ratio * photo_size.height,
        },
    };

    Ok(AnchorObservation::Feature {
        point: Point::new(x, y),
        feature_size,
        photo_size,
    })
}

fn bbox_observation(photo: &SourcePhoto) -> AnchorObservation {
    let bounds = photo.content_bounds().to_rect();
    AnchorObservation::Feature {
        point: bounds.center(),
        feature_size: bounds.height(),
        photo_size: photo.size(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/anchor/resolver.rs"]
mod tests;
