use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crackscan::pipeline::list_survey_images;
use crackscan::vision::{analyze_severity, InputTensor};
use crackscan::{
    BatchOrchestrator, BatchState, Classification, ClassifierState, HistoryStore, Inspector,
    Result, Settings,
};

fn settings_in(dir: &Path) -> Settings {
    Settings {
        history_path: dir.join("history.json"),
        overlay_dir: dir.join("overlays"),
        model_path: dir.join("missing_model.onnx"),
        ..Settings::default()
    }
}

fn fixed_score(score: f32) -> ClassifierState {
    ClassifierState::Ready(Arc::new(move |_: &InputTensor| -> Result<f32> { Ok(score) }))
}

fn gray_photo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(224, 224, image::Rgb([128, 128, 128]))
        .save(&path)
        .unwrap();
    path
}

fn cracked_photo(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbImage::from_fn(320, 240, |x, y| {
        // Dark diagonal band on light concrete
        let d = (x as i32 - y as i32 - 40).abs();
        if d < 4 {
            image::Rgb([20, 20, 20])
        } else {
            image::Rgb([190, 185, 180])
        }
    });
    img.save(&path).unwrap();
    path
}

#[test]
fn predictor_unavailable_reports_unknown_and_skips_history() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let photo = cracked_photo(dir.path(), "photo.jpg");

    let inspector = Inspector::from_settings(&settings);
    assert!(!inspector.predictor_status().is_ready());

    let record = inspector.analyze(&photo);
    assert_eq!(record.classification, Classification::Unknown);
    assert_eq!(record.confidence, 0.0);
    assert_eq!(record.severity_description(), "N/A");
    assert_eq!(record.geo_tag, "N/A");
    assert!(record.overlay_image.is_none());
    assert!(!settings.history_path.exists());
}

#[test]
fn solid_gray_photo_has_no_severity_and_unchanged_overlay() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let photo = gray_photo(dir.path(), "gray.png");

    let inspector = Inspector::new(
        fixed_score(0.1),
        HistoryStore::open(&settings.history_path),
        &settings,
    );
    let record = inspector.analyze(&photo);

    assert_eq!(record.classification, Classification::Safe);
    assert_eq!(record.max_feature_width_px, 0);
    assert_eq!(record.severity_label, None);
    assert_eq!(record.severity_description(), "N/A");

    let source = image::open(&photo).unwrap().to_rgb8();
    assert_eq!(record.overlay_image.as_ref(), Some(&source));
}

#[test]
fn cracked_photo_gets_a_severity_and_history_entry() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let photo = cracked_photo(dir.path(), "wall.png");

    let inspector = Inspector::new(
        fixed_score(0.875),
        HistoryStore::open(&settings.history_path),
        &settings,
    );
    let record = inspector.analyze(&photo);

    assert_eq!(record.classification, Classification::Crack);
    assert!(record.max_feature_width_px > 0);
    assert!(record.severity_label.is_some());
    assert_eq!(
        record.overlay_image.as_ref().map(|o| o.dimensions()),
        Some((320, 240))
    );

    let fields = record.report_fields();
    assert_eq!(fields.filename, "wall.png");
    assert_eq!(fields.confidence_percent(), 87);

    let reopened = HistoryStore::open(&settings.history_path);
    assert_eq!(reopened.len(), 1);
    assert_eq!(reopened.entries()[0].file, "wall.png");
    assert_eq!(reopened.entries()[0].result, Classification::Crack);
    assert_eq!(reopened.entries()[0].confidence, 0.875);
}

#[test]
fn severity_is_deterministic_for_the_same_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let photo = cracked_photo(dir.path(), "same.png");

    let first = analyze_severity(&photo).unwrap();
    let second = analyze_severity(&photo).unwrap();
    assert_eq!(first.max_feature_width_px, second.max_feature_width_px);
    assert_eq!(first.overlay, second.overlay);
}

#[test]
fn history_round_trip_through_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let names = ["one.png", "two.png", "three.png", "four.png"];
    let photos: Vec<PathBuf> = names.iter().map(|n| gray_photo(dir.path(), n)).collect();

    let scores = [0.875f32, 0.25, 0.625, 0.5];
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let classifier = move |_: &InputTensor| -> Result<f32> {
        Ok(scores[counter.fetch_add(1, Ordering::SeqCst)])
    };

    let inspector = Inspector::new(
        ClassifierState::Ready(Arc::new(classifier)),
        HistoryStore::open(&settings.history_path),
        &settings,
    );
    for photo in &photos {
        inspector.analyze(photo);
    }

    let reloaded = HistoryStore::open(&settings.history_path);
    let files: Vec<&str> = reloaded.entries().iter().map(|e| e.file.as_str()).collect();
    assert_eq!(files, vec!["four.png", "three.png", "two.png", "one.png"]);

    let results: Vec<Classification> = reloaded.entries().iter().map(|e| e.result).collect();
    assert_eq!(
        results,
        vec![
            Classification::Safe,
            Classification::Crack,
            Classification::Safe,
            Classification::Crack
        ]
    );
    assert_eq!(reloaded.entries()[1].confidence, 0.625);
    assert_eq!(reloaded.entries(), inspector.history_entries().as_slice());
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn batch_with_corrupt_middle_file_keeps_going() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());

    let first = cracked_photo(dir.path(), "a.png");
    let corrupt = dir.path().join("b.jpg");
    std::fs::write(&corrupt, b"\xFF\xD8 truncated jpeg").unwrap();
    let third = gray_photo(dir.path(), "c.png");
    let paths = vec![first, corrupt, third];

    let inspector = Inspector::new(
        fixed_score(0.7),
        HistoryStore::open(&settings.history_path),
        &settings,
    );
    let mut batch = BatchOrchestrator::new(&inspector);

    let mut completed = Vec::new();
    let summary = batch.run(&paths, |p| {
        assert_eq!(p.crack_count + p.safe_count + p.unknown_count, p.completed);
        completed.push(p.completed);
    });

    assert_eq!(summary.processed(), 3);
    assert_eq!(summary.items()[0].filename, "a.png");
    assert_eq!(summary.items()[1].result, Classification::Unknown);
    assert_eq!(summary.items()[1].confidence, 0.0);
    assert_eq!(summary.items()[2].filename, "c.png");
    assert_eq!(summary.unknown_count(), 1);
    assert_eq!(summary.crack_count(), 2);
    assert_eq!(completed, vec![1, 2, 3]);
    assert_eq!(batch.state(), BatchState::Completed);

    // Batch mode never writes the scan log
    assert!(!settings.history_path.exists());
}

#[test]
fn survey_listing_feeds_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings_in(dir.path());
    let survey = dir.path().join("survey");
    std::fs::create_dir(&survey).unwrap();
    gray_photo(&survey, "b.png");
    gray_photo(&survey, "a.bmp");
    std::fs::write(survey.join("flight.log"), b"telemetry").unwrap();

    let paths = list_survey_images(&survey, true).unwrap();
    assert_eq!(paths.len(), 2);

    let inspector = Inspector::new(
        fixed_score(0.3),
        HistoryStore::open(&settings.history_path),
        &settings,
    );
    let mut batch = BatchOrchestrator::new(&inspector);
    let summary = batch.run(&paths, |_| {});

    let rows = summary.report_rows();
    assert_eq!(rows[0].filename, "a.bmp");
    assert_eq!(rows[1].filename, "b.png");
    assert_eq!(summary.safe_count(), 2);
}
