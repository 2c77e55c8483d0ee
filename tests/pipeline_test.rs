//! End-to-end tests: JSON-lines input through extraction, classification
//! and labeling to an exported dataset.

use gaze_focus_agent::core::features::mediapipe;
use gaze_focus_agent::core::{
    Dataset, Decision, DegeneratePolicy, EyeRegions, FeatureExtractor, FeatureUnavailable,
    FeatureVector, FnScorer, GazePipeline, Label, LabelOutcome, LabelingSession, LiveInference,
    PipelineEvent, SessionState, TemporalClassifier, WindowMode,
};
use gaze_focus_agent::source::{parse_events, FrameReader, InputEvent, InputSource, SourceError};
use gaze_focus_agent::{LandmarkFrame, LandmarkPoint};
use std::io::Write;
use std::time::Duration;

const LEFT_BOX: (f64, f64, f64, f64) = (0.30, 0.40, 0.40, 0.44);
const RIGHT_BOX: (f64, f64, f64, f64) = (0.58, 0.68, 0.41, 0.45);

/// Both irises at eye-local `(gx, gy)`.
fn frame(gx: f64, gy: f64) -> LandmarkFrame {
    let mut points = vec![LandmarkPoint::new(0.5, 0.5); mediapipe::REFINED_LANDMARK_COUNT];
    let regions = EyeRegions::default();

    for (region, (min_x, max_x, min_y, max_y)) in [(&regions.left, LEFT_BOX), (&regions.right, RIGHT_BOX)] {
        for (i, &index) in region.contour.iter().enumerate() {
            points[index] = match i {
                0 => LandmarkPoint::new(min_x, min_y),
                1 => LandmarkPoint::new(max_x, max_y),
                _ => LandmarkPoint::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            };
        }
        points[region.iris_center] =
            LandmarkPoint::new(min_x + gx * (max_x - min_x), min_y + gy * (max_y - min_y));
    }

    LandmarkFrame::new(points)
}

fn frame_line(gx: f64, gy: f64) -> String {
    serde_json::to_string(&InputEvent::Frame(frame(gx, gy))).unwrap()
}

fn off_center_scorer() -> FnScorer<impl Fn(&FeatureVector) -> f64> {
    FnScorer::new("off-center", |f: &FeatureVector| {
        ((f.left_x() - 0.5).abs() * 2.0).min(1.0)
    })
}

#[test]
fn test_extracted_features_match_iris_position() {
    let features = FeatureExtractor::default().extract(&frame(0.25, 0.75)).unwrap();

    for (actual, expected) in features.as_slice().iter().zip([0.25, 0.75, 0.25, 0.75]) {
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }
}

#[test]
fn test_classification_over_parsed_stream() {
    let mut input = Vec::new();
    for _ in 0..4 {
        input.push(frame_line(0.45, 0.5));
    }
    input.push(r#"{"type":"no_face"}"#.to_string());
    for _ in 0..4 {
        input.push(frame_line(0.95, 0.5));
    }

    let classifier = TemporalClassifier::new(FeatureExtractor::default(), 4)
        .with_scorer(Box::new(off_center_scorer()));
    let mut live = LiveInference::new(classifier);

    let decisions: Vec<Decision> = parse_events(&input.join("\n"))
        .into_iter()
        .filter_map(|event| match event.unwrap() {
            InputEvent::Frame(f) => match live.on_frame(f) {
                PipelineEvent::Decided(d) => Some(d),
                _ => None,
            },
            _ => None,
        })
        .collect();

    assert_eq!(decisions, vec![Decision::Focused, Decision::Distracted]);
}

#[test]
fn test_sliding_window_decides_every_frame() {
    let classifier = TemporalClassifier::new(FeatureExtractor::default(), 3)
        .with_mode(WindowMode::Sliding)
        .with_scorer(Box::new(off_center_scorer()));
    let mut live = LiveInference::new(classifier);

    let events: Vec<PipelineEvent> = [0.5, 0.5, 0.5, 1.0, 1.0, 1.0]
        .iter()
        .map(|&gx| live.on_frame(frame(gx, 0.5)))
        .collect();

    assert!(matches!(events[1], PipelineEvent::Accumulating { filled: 2, capacity: 3 }));
    assert_eq!(events[2], PipelineEvent::Decided(Decision::Focused));
    // Scores [0, 0, 1] then [0, 1, 1]
    assert_eq!(events[3], PipelineEvent::Decided(Decision::Focused));
    assert_eq!(events[4], PipelineEvent::Decided(Decision::Distracted));
    assert_eq!(events[5], PipelineEvent::Decided(Decision::Distracted));
}

#[test]
fn test_degenerate_eye_policy() {
    let mut collapsed = frame(0.5, 0.5);
    let regions = EyeRegions::default();
    for &index in &regions.left.contour {
        collapsed.landmarks[index].y = 0.42;
    }
    collapsed.landmarks[regions.left.iris_center].y = 0.42;

    let skip = FeatureExtractor::default();
    assert!(matches!(
        skip.extract(&collapsed),
        Err(FeatureUnavailable::DegenerateBox { .. })
    ));

    let epsilon = FeatureExtractor::new(regions, DegeneratePolicy::Epsilon);
    let features = epsilon.extract(&collapsed).unwrap();
    assert!(features.is_finite());
    assert_eq!(features.left_y(), 0.0);
}

#[test]
fn test_labeling_session_from_file_to_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("session.jsonl");
    let lines = [
        r#"{"type":"capture"}"#.to_string(),
        r#"{"type":"label","label":"focused"}"#.to_string(),
        r#"{"type":"discard"}"#.to_string(),
        frame_line(0.5, 0.5),
        r#"{"type":"capture"}"#.to_string(),
        frame_line(0.9, 0.9),
        r#"{"type":"label","label":"focused"}"#.to_string(),
        "this is not json".to_string(),
        String::new(),
        frame_line(0.1, 0.2),
        r#"{"type":"capture"}"#.to_string(),
        r#"{"type":"label","label":"distracted"}"#.to_string(),
        r#"{"type":"label","label":"distracted"}"#.to_string(),
        r#"{"type":"export"}"#.to_string(),
    ];
    {
        let mut file = std::fs::File::create(&input_path).unwrap();
        writeln!(file, "{}", lines.join("\n")).unwrap();
    }

    let mut reader = FrameReader::new(InputSource::File(input_path));
    reader.start().unwrap();

    let mut session = LabelingSession::new(FeatureExtractor::default());
    let mut outcomes = Vec::new();
    let mut malformed = 0;
    let export_path = dir.path().join("out").join("dataset.json");

    loop {
        let message = match reader.receiver().recv_timeout(Duration::from_secs(5)) {
            Ok(message) => message,
            Err(_) => break,
        };
        match message {
            Ok(InputEvent::Frame(f)) => {
                GazePipeline::on_frame(&mut session, f);
            }
            Ok(InputEvent::Capture) => {
                session.capture();
            }
            Ok(InputEvent::Label { label }) => outcomes.push(session.label(label)),
            Ok(InputEvent::Discard) => {
                session.discard();
            }
            Ok(InputEvent::Export) => session.dataset().export(&export_path).unwrap(),
            Ok(InputEvent::NoFace) => {}
            Err(SourceError::Malformed { line, .. }) => {
                assert_eq!(line, 8);
                malformed += 1;
            }
            Err(e) => panic!("unexpected error {e}"),
        }
    }

    assert_eq!(malformed, 1);
    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[0], LabelOutcome::NoActiveCapture);
    assert!(outcomes[1].is_recorded());
    assert!(outcomes[2].is_recorded());
    assert_eq!(outcomes[3], LabelOutcome::NotCaptured);
    assert_eq!(session.state(), SessionState::Live);

    let exported = Dataset::load(&export_path).unwrap();
    assert_eq!(exported.len(), 2);
    assert_eq!(exported.records()[0].label, Label::Focused);
    // The frame arriving during capture was dropped
    assert!((exported.records()[0].features.left_x() - 0.5).abs() < 1e-9);
    assert_eq!(exported.records()[1].label, Label::Distracted);
    assert!((exported.records()[1].features.right_y() - 0.2).abs() < 1e-9);
    assert_eq!(exported.counts().total(), session.counts().total());
}

#[test]
fn test_combined_datasets_keep_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();

    for (i, (gx, label)) in [(0.2, Label::Distracted), (0.5, Label::Focused)].into_iter().enumerate() {
        let mut session = LabelingSession::new(FeatureExtractor::default());
        GazePipeline::on_frame(&mut session, frame(gx, 0.5));
        session.capture();
        session.label(label);

        let path = dir.path().join(format!("part{i}.json"));
        session.dataset().export(&path).unwrap();
        paths.push(path);
    }

    let combined = Dataset::combine(paths.iter().map(|p| Dataset::load(p).unwrap()));
    let labels: Vec<Label> = combined.records().iter().map(|r| r.label).collect();
    assert_eq!(labels, vec![Label::Distracted, Label::Focused]);
}
