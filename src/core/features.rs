//! Gaze feature extraction from a single landmark frame.
//!
//! Each eye's iris center is expressed in coordinates local to that eye's
//! contour bounding box. Head position and scale in the image drop out,
//! leaving only where the iris sits inside the eye. The same extractor backs
//! live inference and training capture, so both see identical features.

use crate::source::types::{LandmarkFrame, LandmarkPoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of values in a feature vector.
pub const FEATURE_LEN: usize = 4;

/// Spans below this are treated as a collapsed bounding box.
pub const MIN_SPAN: f64 = 1e-9;

/// Denominator floor used by [`DegeneratePolicy::Epsilon`].
pub const SPAN_EPSILON: f64 = 1e-6;

/// MediaPipe Face Mesh indices (with iris refinement enabled).
pub mod mediapipe {
    /// Left eye contour: outer corner, upper lid, inner corner, lower lid
    pub const LEFT_EYE_CONTOUR: [usize; 8] = [33, 160, 159, 158, 133, 153, 145, 144];
    /// Extra lower-lid points for the left eye
    pub const LEFT_EYE_LOWER_LID: [usize; 2] = [163, 7];
    /// Left iris center
    pub const LEFT_IRIS_CENTER: usize = 468;

    /// Right eye contour: inner corner, upper lid, outer corner, lower lid
    pub const RIGHT_EYE_CONTOUR: [usize; 8] = [362, 385, 386, 387, 263, 373, 374, 380];
    /// Extra lower-lid points for the right eye
    pub const RIGHT_EYE_LOWER_LID: [usize; 2] = [390, 249];
    /// Right iris center
    pub const RIGHT_IRIS_CENTER: usize = 473;

    /// Points produced with `refineLandmarks` enabled
    pub const REFINED_LANDMARK_COUNT: usize = 478;
}

/// Which eye a region describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeSide {
    Left,
    Right,
}

impl std::fmt::Display for EyeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EyeSide::Left => write!(f, "left"),
            EyeSide::Right => write!(f, "right"),
        }
    }
}

/// Bounding-box axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
        }
    }
}

/// Which contour points to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeProfile {
    /// 8 points around the eye opening
    #[default]
    Contour,
    /// Contour plus 2 extra lower-lid points
    ContourWithLowerLid,
}

/// Landmark indices describing one eye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRegion {
    /// Ordered eye-contour indices
    pub contour: Vec<usize>,
    /// Iris-center index
    pub iris_center: usize,
}

impl EyeRegion {
    /// Region from contour indices and the iris center index.
    pub fn new(contour: Vec<usize>, iris_center: usize) -> Self {
        Self {
            contour,
            iris_center,
        }
    }

    /// Default left-eye region for a profile.
    pub fn left(profile: EyeProfile) -> Self {
        let mut contour = mediapipe::LEFT_EYE_CONTOUR.to_vec();
        if profile == EyeProfile::ContourWithLowerLid {
            contour.extend_from_slice(&mediapipe::LEFT_EYE_LOWER_LID);
        }
        Self::new(contour, mediapipe::LEFT_IRIS_CENTER)
    }

    /// Default right-eye region for a profile.
    pub fn right(profile: EyeProfile) -> Self {
        let mut contour = mediapipe::RIGHT_EYE_CONTOUR.to_vec();
        if profile == EyeProfile::ContourWithLowerLid {
            contour.extend_from_slice(&mediapipe::RIGHT_EYE_LOWER_LID);
        }
        Self::new(contour, mediapipe::RIGHT_IRIS_CENTER)
    }

    /// Highest landmark index this region reads.
    pub fn max_index(&self) -> usize {
        self.contour
            .iter()
            .copied()
            .chain(std::iter::once(self.iris_center))
            .max()
            .unwrap_or(self.iris_center)
    }
}

/// Both eye regions, in feature order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeRegions {
    /// Region behind `left_x` and `left_y`
    pub left: EyeRegion,
    /// Region behind `right_x` and `right_y`
    pub right: EyeRegion,
}

impl EyeRegions {
    /// MediaPipe indices for both eyes under `profile`.
    pub fn for_profile(profile: EyeProfile) -> Self {
        Self {
            left: EyeRegion::left(profile),
            right: EyeRegion::right(profile),
        }
    }

    /// Regions paired with their side, in output order.
    pub fn iter(&self) -> impl Iterator<Item = (EyeSide, &EyeRegion)> {
        [(EyeSide::Left, &self.left), (EyeSide::Right, &self.right)].into_iter()
    }

    /// Minimum frame length these regions need.
    pub fn required_landmarks(&self) -> usize {
        self.left.max_index().max(self.right.max_index()) + 1
    }
}

impl Default for EyeRegions {
    fn default() -> Self {
        Self::for_profile(EyeProfile::default())
    }
}

/// What to do when an eye's bounding box collapses on one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Refuse the frame with [`FeatureUnavailable::DegenerateBox`]
    #[default]
    Skip,
    /// Clamp the denominator to [`SPAN_EPSILON`]
    Epsilon,
}

/// Why no feature vector could be produced for a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureUnavailable {
    #[error("landmark {index} missing (frame has {len} points)")]
    MissingLandmark { index: usize, len: usize },
    #[error("{region} eye region has no contour points")]
    EmptyContour { region: EyeSide },
    #[error("{region} eye bounding box has zero {axis} extent")]
    DegenerateBox { region: EyeSide, axis: Axis },
    #[error("non-finite value in {region} eye")]
    NonFinite { region: EyeSide },
}

/// Pose-normalized gaze descriptor `[leftX, leftY, rightX, rightY]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f64; FEATURE_LEN]);

impl FeatureVector {
    /// Wrap values in `[left_x, left_y, right_x, right_y]` order.
    pub fn new(values: [f64; FEATURE_LEN]) -> Self {
        Self(values)
    }

    /// Horizontal iris position in the left eye box.
    pub fn left_x(&self) -> f64 {
        self.0[0]
    }

    /// Vertical iris position in the left eye box.
    pub fn left_y(&self) -> f64 {
        self.0[1]
    }

    /// Horizontal iris position in the right eye box.
    pub fn right_x(&self) -> f64 {
        self.0[2]
    }

    /// Vertical iris position in the right eye box.
    pub fn right_y(&self) -> f64 {
        self.0[3]
    }

    /// Values in model input order.
    pub fn as_array(&self) -> &[f64; FEATURE_LEN] {
        &self.0
    }

    /// Values in model input order, as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Whether every value is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<[f64; FEATURE_LEN]> for FeatureVector {
    fn from(values: [f64; FEATURE_LEN]) -> Self {
        Self(values)
    }
}

/// Axis-aligned bounding box of a point set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Smallest contour x
    pub min_x: f64,
    /// Largest contour x
    pub max_x: f64,
    /// Smallest contour y
    pub min_y: f64,
    /// Largest contour y
    pub max_y: f64,
}

impl BoundingBox {
    /// Bounding box of the given points, or `None` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a LandmarkPoint>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => BoundingBox {
                    min_x: p.x,
                    max_x: p.x,
                    min_y: p.y,
                    max_y: p.y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(p.x),
                    max_x: b.max_x.max(p.x),
                    min_y: b.min_y.min(p.y),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    /// Horizontal span; zero for a collapsed box.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical span; zero for a collapsed box.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Turns landmark frames into feature vectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureExtractor {
    regions: EyeRegions,
    policy: DegeneratePolicy,
}

impl FeatureExtractor {
    /// Extractor over `regions` that handles collapsed boxes per `policy`.
    pub fn new(regions: EyeRegions, policy: DegeneratePolicy) -> Self {
        Self { regions, policy }
    }

    /// Landmark indices in use.
    pub fn regions(&self) -> &EyeRegions {
        &self.regions
    }

    /// Collapsed-box handling in use.
    pub fn policy(&self) -> DegeneratePolicy {
        self.policy
    }

    /// Compute the feature vector for one frame.
    pub fn extract(&self, frame: &LandmarkFrame) -> Result<FeatureVector, FeatureUnavailable> {
        let mut values = [0.0; FEATURE_LEN];

        for (slot, (side, region)) in self.regions.iter().enumerate() {
            let [x, y] = self.normalize_eye(frame, side, region)?;
            values[slot * 2] = x;
            values[slot * 2 + 1] = y;
        }

        Ok(FeatureVector(values))
    }

    /// Iris position inside one eye's bounding box.
    fn normalize_eye(
        &self,
        frame: &LandmarkFrame,
        side: EyeSide,
        region: &EyeRegion,
    ) -> Result<[f64; 2], FeatureUnavailable> {
        if region.contour.is_empty() {
            return Err(FeatureUnavailable::EmptyContour { region: side });
        }

        let contour = region
            .contour
            .iter()
            .map(|&index| lookup(frame, index))
            .collect::<Result<Vec<_>, _>>()?;
        let iris = lookup(frame, region.iris_center)?;

        if !iris.is_finite() || contour.iter().any(|p| !p.is_finite()) {
            return Err(FeatureUnavailable::NonFinite { region: side });
        }

        let bounds = BoundingBox::from_points(contour)
            .ok_or(FeatureUnavailable::EmptyContour { region: side })?;

        let width = self.denominator(bounds.width(), side, Axis::X)?;
        let height = self.denominator(bounds.height(), side, Axis::Y)?;

        let x = (iris.x - bounds.min_x) / width;
        let y = (iris.y - bounds.min_y) / height;

        if !x.is_finite() || !y.is_finite() {
            return Err(FeatureUnavailable::NonFinite { region: side });
        }

        Ok([x, y])
    }

    fn denominator(&self, span: f64, side: EyeSide, axis: Axis) -> Result<f64, FeatureUnavailable> {
        match self.policy {
            DegeneratePolicy::Skip if span < MIN_SPAN => {
                Err(FeatureUnavailable::DegenerateBox { region: side, axis })
            }
            DegeneratePolicy::Skip => Ok(span),
            DegeneratePolicy::Epsilon => Ok(span.max(SPAN_EPSILON)),
        }
    }
}

fn lookup(frame: &LandmarkFrame, index: usize) -> Result<&LandmarkPoint, FeatureUnavailable> {
    frame.point(index).ok_or(FeatureUnavailable::MissingLandmark {
        index,
        len: frame.len(),
    })
}
