//! Frame-loop interface shared by live inference and labeling.

use crate::core::features::{FeatureExtractor, FeatureUnavailable};
use crate::core::labeling::LabelingSession;
use crate::core::scoring::Scorer;
use crate::core::windowing::{ClassifyError, Decision, TemporalClassifier, WindowSummary};
use crate::source::types::LandmarkFrame;

/// What a pipeline did with one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// Frame scored; the window is not full yet
    Accumulating { filled: usize, capacity: usize },
    /// A window completed
    Decided(Decision),
    /// No decision can be made for this frame
    Unavailable(Unavailable),
    /// Frame had no usable gaze features
    Skipped(FeatureUnavailable),
    /// Frame kept as the labeling candidate
    Stored,
    /// Frame ignored because a capture is pending
    Dropped,
}

/// Why live inference produced no decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// No scoring model is loaded
    NoModel,
    /// The scorer failed or returned an unusable score
    ScoringFailed(String),
}

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Unavailable::NoModel => write!(f, "no scoring model loaded"),
            Unavailable::ScoringFailed(reason) => write!(f, "scoring failed: {reason}"),
        }
    }
}

/// A consumer of landmark frames.
pub trait GazePipeline {
    fn extractor(&self) -> &FeatureExtractor;

    fn on_frame(&mut self, frame: LandmarkFrame) -> PipelineEvent;
}

/// Live attention classification.
#[derive(Debug)]
pub struct LiveInference {
    classifier: TemporalClassifier,
}

impl LiveInference {
    /// Run `classifier` on every frame.
    pub fn new(classifier: TemporalClassifier) -> Self {
        Self { classifier }
    }

    /// The underlying classifier.
    pub fn classifier(&self) -> &TemporalClassifier {
        &self.classifier
    }

    /// Load or replace the scoring model.
    pub fn set_scorer(&mut self, scorer: Box<dyn Scorer>) {
        self.classifier.set_scorer(scorer);
    }

    /// Summary of the most recent completed window.
    pub fn last_window(&self) -> Option<&WindowSummary> {
        self.classifier.last_window()
    }
}

impl GazePipeline for LiveInference {
    fn extractor(&self) -> &FeatureExtractor {
        self.classifier.extractor()
    }

    fn on_frame(&mut self, frame: LandmarkFrame) -> PipelineEvent {
        match self.classifier.submit(&frame) {
            Ok(Some(decision)) => PipelineEvent::Decided(decision),
            Ok(None) => {
                let history = self.classifier.history();
                PipelineEvent::Accumulating {
                    filled: history.len(),
                    capacity: history.capacity(),
                }
            }
            Err(ClassifyError::Feature(reason)) => PipelineEvent::Skipped(reason),
            Err(ClassifyError::ClassifierUnavailable) => {
                PipelineEvent::Unavailable(Unavailable::NoModel)
            }
            Err(ClassifyError::Scoring(e)) => {
                PipelineEvent::Unavailable(Unavailable::ScoringFailed(e.to_string()))
            }
        }
    }
}

impl GazePipeline for LabelingSession {
    fn extractor(&self) -> &FeatureExtractor {
        LabelingSession::extractor(self)
    }

    fn on_frame(&mut self, frame: LandmarkFrame) -> PipelineEvent {
        if LabelingSession::on_frame(self, frame) {
            PipelineEvent::Stored
        } else {
            PipelineEvent::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dataset::Label;
    use crate::core::features::test_support::synthetic_frame;
    use crate::core::features::FeatureVector;
    use crate::core::scoring::FnScorer;

    const LEFT_BOX: [f64; 4] = [0.30, 0.40, 0.40, 0.44];
    const RIGHT_BOX: [f64; 4] = [0.55, 0.65, 0.41, 0.45];

    fn frame(gaze_x: f64) -> LandmarkFrame {
        synthetic_frame((LEFT_BOX, [gaze_x, 0.5]), (RIGHT_BOX, [gaze_x, 0.5]))
    }

    fn off_center() -> Box<dyn Scorer> {
        Box::new(FnScorer::new("off-center", |f: &FeatureVector| {
            ((f.left_x() - 0.5).abs() * 2.0).min(1.0)
        }))
    }

    /// Drive any pipeline with the same loop.
    fn run(pipeline: &mut dyn GazePipeline, frames: Vec<LandmarkFrame>) -> Vec<PipelineEvent> {
        frames.into_iter().map(|f| pipeline.on_frame(f)).collect()
    }

    #[test]
    fn test_live_inference_events() {
        let classifier =
            TemporalClassifier::new(FeatureExtractor::default(), 3).with_scorer(off_center());
        let mut live = LiveInference::new(classifier);

        let events = run(&mut live, vec![frame(0.1), frame(0.05), frame(0.9)]);
        assert_eq!(
            events,
            vec![
                PipelineEvent::Accumulating {
                    filled: 1,
                    capacity: 3
                },
                PipelineEvent::Accumulating {
                    filled: 2,
                    capacity: 3
                },
                PipelineEvent::Decided(Decision::Distracted),
            ]
        );
        assert!(live.last_window().is_some());
    }

    #[test]
    fn test_live_inference_without_model() {
        let mut live = LiveInference::new(TemporalClassifier::new(FeatureExtractor::default(), 2));
        assert_eq!(
            live.on_frame(frame(0.5)),
            PipelineEvent::Unavailable(Unavailable::NoModel)
        );

        live.set_scorer(off_center());
        assert!(matches!(
            live.on_frame(frame(0.5)),
            PipelineEvent::Accumulating { filled: 1, .. }
        ));
    }

    #[test]
    fn test_live_inference_reports_scoring_failure() {
        let nan = FnScorer::new("nan", |_: &FeatureVector| f64::NAN);
        let classifier =
            TemporalClassifier::new(FeatureExtractor::default(), 2).with_scorer(Box::new(nan));
        let mut live = LiveInference::new(classifier);

        let event = live.on_frame(frame(0.5));
        assert!(matches!(
            &event,
            PipelineEvent::Unavailable(Unavailable::ScoringFailed(_))
        ));
        assert!(live.classifier().history().is_empty());
        if let PipelineEvent::Unavailable(reason) = event {
            assert!(reason.to_string().starts_with("scoring failed"));
        }
    }

    #[test]
    fn test_live_inference_skips_unusable_frames() {
        let classifier =
            TemporalClassifier::new(FeatureExtractor::default(), 2).with_scorer(off_center());
        let mut live = LiveInference::new(classifier);

        let truncated = LandmarkFrame::new(frame(0.5).landmarks[..100].to_vec());
        assert!(matches!(
            live.on_frame(truncated),
            PipelineEvent::Skipped(FeatureUnavailable::MissingLandmark { .. })
        ));
        assert!(live.classifier().history().is_empty());
    }

    #[test]
    fn test_labeling_session_events() {
        let mut session = LabelingSession::new(FeatureExtractor::default());

        assert_eq!(session_events(&mut session), vec![PipelineEvent::Stored]);
        session.capture();
        assert_eq!(session_events(&mut session), vec![PipelineEvent::Dropped]);
        assert!(session.label(Label::Focused).is_recorded());
        assert_eq!(session_events(&mut session), vec![PipelineEvent::Stored]);
    }

    fn session_events(session: &mut LabelingSession) -> Vec<PipelineEvent> {
        run(session, vec![frame(0.4)])
    }
}
