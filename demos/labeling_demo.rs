//! Demonstration of the gaze focus pipeline on synthetic landmarks.
//!
//! This example shows how to:
//! 1. Build landmark frames the way a face-mesh detector would
//! 2. Classify them with a windowed scorer
//! 3. Label captured frames and export a training dataset
//!
//! Run with: cargo run --example labeling_demo

use gaze_focus_agent::{
    core::{
        features::mediapipe, Decision, EyeRegions, FeatureExtractor, FeatureVector, FnScorer,
        GazePipeline, Label, LabelingSession, LiveInference, PipelineEvent, TemporalClassifier,
    },
    transparency::{Counter, TransparencyLog},
    LandmarkFrame, LandmarkPoint, PRIVACY_DECLARATION,
};

/// A frame with both irises at `gaze` (eye-local, 0..1) plus a little jitter.
fn synthetic_frame(gaze: (f64, f64), jitter: f64, timestamp_ms: u64) -> LandmarkFrame {
    let mut points = vec![LandmarkPoint::new(0.5, 0.5); mediapipe::REFINED_LANDMARK_COUNT];
    let regions = EyeRegions::default();

    for (region, left_x) in [(&regions.left, 0.30), (&regions.right, 0.58)] {
        let (min_x, max_x, min_y, max_y) = (left_x, left_x + 0.10, 0.40, 0.44);
        let count = region.contour.len() as f64;
        for (i, &index) in region.contour.iter().enumerate() {
            // Points on an ellipse around the eye opening
            let angle = std::f64::consts::TAU * i as f64 / count;
            points[index] = LandmarkPoint::new(
                (min_x + max_x) / 2.0 + angle.cos() * (max_x - min_x) / 2.0,
                (min_y + max_y) / 2.0 + angle.sin() * (max_y - min_y) / 2.0,
            );
        }
        points[region.iris_center] = LandmarkPoint::new(
            min_x + (gaze.0 + jitter) * (max_x - min_x),
            min_y + gaze.1 * (max_y - min_y),
        );
    }

    LandmarkFrame::new(points).with_timestamp(timestamp_ms)
}

fn main() {
    println!("Gaze Focus Agent - Labeling Demo");
    println!("================================");
    println!("{PRIVACY_DECLARATION}");

    let log = TransparencyLog::new();

    // Stand-in for a trained model: distraction grows with horizontal offset
    let scorer = FnScorer::new("horizontal-offset", |f: &FeatureVector| {
        let offset = ((f.left_x() - 0.5).abs() + (f.right_x() - 0.5).abs()) / 2.0;
        (offset * 4.0).min(1.0)
    });
    let classifier =
        TemporalClassifier::new(FeatureExtractor::default(), 10).with_scorer(Box::new(scorer));
    let mut live = LiveInference::new(classifier);

    println!("Live classification (10-frame windows):");
    let looks = [(0.5, 0.5), (0.5, 0.5), (0.9, 0.5), (0.1, 0.6), (0.5, 0.45)];
    let mut ts = 0;
    for (segment, &gaze) in looks.iter().enumerate() {
        for i in 0..10 {
            let jitter = if i % 2 == 0 { 0.02 } else { -0.02 };
            ts += 33;
            log.record(Counter::FramesReceived);
            if let PipelineEvent::Decided(decision) = live.on_frame(synthetic_frame(gaze, jitter, ts)) {
                log.record(match decision {
                    Decision::Focused => Counter::DecisionsFocused,
                    Decision::Distracted => Counter::DecisionsDistracted,
                });
                let mean = live.last_window().map(|w| w.mean_score).unwrap_or_default();
                println!("  segment {segment}: gaze {gaze:?} -> {decision} (mean {mean:.2})");
            }
        }
    }
    println!();

    println!("Labeling session:");
    let mut session = LabelingSession::new(FeatureExtractor::default());
    let prompts = [
        ((0.5, 0.5), Label::Focused),
        ((0.85, 0.5), Label::Distracted),
        ((0.48, 0.52), Label::Focused),
        ((0.1, 0.3), Label::Distracted),
    ];
    for (gaze, label) in prompts {
        ts += 33;
        log.record(Counter::FramesReceived);
        GazePipeline::on_frame(&mut session, synthetic_frame(gaze, 0.0, ts));
        session.capture();
        let outcome = session.label(label);
        if outcome.is_recorded() {
            log.record(Counter::RecordsLabeled);
        }
        println!("  gaze {gaze:?} labeled {label}: {outcome:?}");
    }

    let path = std::env::temp_dir().join("gaze_focus_demo_dataset.json");
    match session.dataset().export(&path) {
        Ok(()) => {
            log.record(Counter::DatasetsExported);
            println!();
            println!("Exported {} records to {}", session.dataset().len(), path.display());
        }
        Err(e) => eprintln!("Error exporting dataset: {e}"),
    }

    println!();
    println!("{}", log.summary());
}
