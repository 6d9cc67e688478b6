use super::*;
use crate::{
    anchor::resolver::FeatureSizeFallback,
    foundation::core::Point,
    template::model::AnchorMode,
};

fn two_slot_template(mode: &str) -> Arc<Template> {
    Arc::new(
        Template::from_json(
            &serde_json::json!({
                "templateId": "pair",
                "canvasWidth": 40,
                "canvasHeight": 20,
                "anchorMode": mode,
                "desiredFaceRatio": 0.5,
                "minZoom": 0.25,
                "maxZoom": 4.0,
                "slots": [
                    { "slotId": "right", "x": 20, "y": 0, "width": 20, "height": 20, "zIndex": 1,
                      "anchor": { "targetX": 10, "targetY": 10 } },
                    { "slotId": "left", "x": 0, "y": 0, "width": 20, "height": 20,
                      "anchor": { "targetX": 10, "targetY": 10 } }
                ]
            })
            .to_string(),
        )
        .unwrap(),
    )
}

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> SourcePhoto {
    SourcePhoto::from_rgba8(w, h, rgba.repeat((w * h) as usize)).unwrap()
}

#[test]
fn default_assignment_follows_paint_order() {
    let request = CompositeRequest::new(two_slot_template("none"))
        .with_photo(PhotoInput::new(solid(10, 10, [255, 0, 0, 255])))
        .with_photo(PhotoInput::new(solid(10, 10, [0, 0, 255, 255])));
    assert_eq!(request.slot_photo_pairs().unwrap(), vec![(1, 0), (0, 1)]);

    let out = compose(&request, &EngineSettings::default()).unwrap();
    assert_eq!((out.width, out.height), (40, 20));
    assert_eq!(out.raster.pixel(5, 5), [255, 0, 0, 255]);
    assert_eq!(out.raster.pixel(30, 5), [0, 0, 255, 255]);
}

#[test]
fn explicit_assignment_and_empty_slots() {
    let request = CompositeRequest::new(two_slot_template("none"))
        .with_photo(PhotoInput::new(solid(10, 10, [0, 255, 0, 255])))
        .assign("right", 0);
    let out = compose(&request, &EngineSettings::default()).unwrap();
    assert_eq!(out.raster.pixel(5, 5), [255, 255, 255, 255]);
    assert_eq!(out.raster.pixel(30, 5), [0, 255, 0, 255]);
    assert_eq!(out.placements.len(), 1);
}

#[test]
fn bad_assignments_are_config_errors() {
    let base = CompositeRequest::new(two_slot_template("none"))
        .with_photo(PhotoInput::new(solid(4, 4, [0, 0, 0, 255])));

    let err = base.clone().assign("missing", 0).slot_photo_pairs().unwrap_err();
    assert!(matches!(err, PhotoslotError::ConfigInvalid(_)));

    let err = base.clone().assign("left", 3).slot_photo_pairs().unwrap_err();
    assert!(matches!(err, PhotoslotError::ConfigInvalid(_)));

    let err = base
        .assign("left", 0)
        .assign("left", 0)
        .slot_photo_pairs()
        .unwrap_err();
    assert!(matches!(err, PhotoslotError::ConfigInvalid(_)));
}

#[test]
fn missing_detection_fails_whole_request_unless_fallback_chosen() {
    let template = two_slot_template("face_center");
    let ok = PhotoInput::new(solid(10, 10, [1, 2, 3, 255]))
        .with_detection(RawDetection::found(5.0, 5.0, 5.0));
    let missing = PhotoInput::new(solid(10, 10, [1, 2, 3, 255]));

    let request = CompositeRequest::new(Arc::clone(&template))
        .with_photo(ok.clone())
        .with_photo(missing.clone());
    let err = compose(&request, &EngineSettings::default()).unwrap_err();
    assert!(err.is_no_detection());

    let request = CompositeRequest::new(template)
        .with_photo(ok)
        .with_photo(missing.with_fallback(DetectionFallback::BboxCenter));
    assert!(compose(&request, &EngineSettings::default()).is_ok());
}

#[test]
fn preview_matches_compose_placement() {
    let template = two_slot_template("face_center");
    let input = PhotoInput::new(solid(30, 30, [9, 9, 9, 255]))
        .with_detection(RawDetection::found(12.0, 8.0, 6.0));
    let preview = preview_placement(
        &template,
        "right",
        &input,
        &AnchorSettings::default(),
    )
    .unwrap();

    let request = CompositeRequest::new(Arc::clone(&template))
        .with_photo(input)
        .assign("right", 0);
    let out = compose(&request, &EngineSettings::default()).unwrap();
    assert_eq!(out.placements, vec![preview.clone()]);

    let landed = preview.map_point(Point::new(12.0, 8.0));
    assert!((landed.x - 30.0).abs() < 1e-6 && (landed.y - 10.0).abs() < 1e-6);
}

#[test]
fn mirrored_preview_uses_flipped_anchor() {
    let template = two_slot_template("face_center");
    let input = PhotoInput::new(solid(30, 30, [9, 9, 9, 255]))
        .with_detection(RawDetection::found(12.0, 15.0, 10.0))
        .with_mirror(true);
    let p = preview_placement(&template, "left", &input, &AnchorSettings::default()).unwrap();
    // Mirrored anchor x is 18; scale is 1.
    assert!((p.scale - 1.0).abs() < 1e-12);
    assert!((p.translate.x - (10.0 - 18.0)).abs() < 1e-9);
}

#[test]
fn place_observation_rejects_unknown_slot() {
    let template = two_slot_template("bbox_center");
    let obs = AnchorObservation::FitToSlot {
        photo_size: crate::foundation::core::Size::new(10.0, 10.0),
    };
    assert!(place_observation(&template, "nope", &obs).is_err());
    assert!(place_observation(&template, "left", &obs).is_ok());
    assert_eq!(template.anchor_mode, AnchorMode::BboxCenter);
}

#[test]
fn settings_defaults_and_validation() {
    let s = EngineSettings::from_json("{}").unwrap();
    assert_eq!(s, EngineSettings::default());
    assert_eq!(s.background_rgba, [255, 255, 255, 255]);
    assert_eq!(s.anchor.min_confidence, 0.5);
    assert_eq!(s.max_supersample, SampleOptions::default().max_supersample);

    let s = EngineSettings::from_json(
        r#"{"anchor":{"minConfidence":0.7,"missingFeatureSize":{"policy":"photo_height_ratio","ratio":0.2}},"threads":2}"#,
    )
    .unwrap();
    assert_eq!(s.anchor.min_confidence, 0.7);
    assert_eq!(
        s.anchor.missing_feature_size,
        FeatureSizeFallback::PhotoHeightRatio { ratio: 0.2 }
    );
    assert_eq!(s.threads, Some(2));

    assert!(EngineSettings::from_json(r#"{"maxSupersample":0}"#).is_err());
    assert!(EngineSettings::from_json(r#"{"threads":0}"#).is_err());
}

#[test]
fn batch_results_keep_input_order() {
    let template = two_slot_template("none");
    let colors = [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]];
    let requests: Vec<_> = colors
        .iter()
        .map(|&c| {
            CompositeRequest::new(Arc::clone(&template))
                .with_photo(PhotoInput::new(solid(8, 8, c)))
        })
        .collect();
    let settings = EngineSettings {
        threads: Some(2),
        ..EngineSettings::default()
    };
    let results = compose_batch(&requests, &settings).unwrap();
    assert_eq!(results.len(), 3);
    for (res, color) in results.into_iter().zip(colors) {
        assert_eq!(res.unwrap().raster.pixel(5, 5), color);
    }
}

#[test]
fn template_type_decides_ratioless_scale() {
    let place = |template_type: &str| {
        let template = Template::from_json(
            &serde_json::json!({
                "templateId": template_type,
                "canvasWidth": 400,
                "canvasHeight": 400,
                "anchorMode": "face_center",
                "templateType": template_type,
                "slots": [{ "slotId": "main", "x": 0, "y": 0, "width": 400, "height": 400 }]
            })
            .to_string(),
        )
        .unwrap();
        let obs = AnchorObservation::Feature {
            point: Point::new(300.0, 200.0),
            feature_size: 120.0,
            photo_size: crate::foundation::core::Size::new(600.0, 600.0),
        };
        place_observation(&template, "main", &obs).unwrap()
    };

    let sticker = place("sticker");
    let frame = place("frame");
    assert!((sticker.scale - 0.6).abs() < 1e-12, "{}", sticker.scale);
    assert!((frame.scale - 400.0 / 600.0).abs() < 1e-12, "{}", frame.scale);
    assert!(frame.full_coverage);
    assert!(!sticker.full_coverage);
}
