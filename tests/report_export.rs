use ball_tracker::config::TrackerConfig;
use ball_tracker::detect::{Detection, ScriptedBackend};
use ball_tracker::output::{FanoutSink, FrameDirWriter, FrameFormat, ObservationLog, ThreadedSink};
use ball_tracker::report::{report_stem, TrackingReport, TRACKING_TARGET};
use ball_tracker::{command_channel, MemorySource, Pipeline, PipelineConfig, StopReason};

#[test]
fn zero_detection_report_omits_metric_blocks() {
    let mut pipeline = Pipeline::new(PipelineConfig::default(), ScriptedBackend::new()).unwrap();
    let (_controller, rx) = command_channel();
    let mut log = ObservationLog::new();
    let mut source = MemorySource::blank(3, 8, 8).unwrap();

    let session = pipeline.run(&mut source, &mut log, &rx).unwrap();
    let report = TrackingReport::new("memory", "scripted", None, &session, log.into_observations());

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["metadata"]["total_detections"], 0);
    assert_eq!(value["metadata"]["tracking_target"], TRACKING_TARGET);
    assert_eq!(value["session"]["stop_reason"], "end_of_stream");
    assert_eq!(value["summary"]["total_frames"], 3);
    assert!(value["summary"].get("confidence").is_none());
    assert!(value["summary"].get("speed").is_none());
    assert!(value["session"].get("nominal_fps").is_none());
    assert_eq!(value["trajectory"].as_array().map(Vec::len), Some(0));
}

#[test]
fn report_round_trips_through_disk() {
    let backend = ScriptedBackend::new()
        .with_frame(0, vec![Detection::at(10.0, 20.0, 0.8)])
        .with_frame(1, vec![Detection::at(13.0, 24.0, 0.6)]);
    let mut pipeline = Pipeline::new(PipelineConfig::for_video(25.0), backend).unwrap();
    let (_controller, rx) = command_channel();
    let mut log = ObservationLog::new();
    let mut source = MemorySource::blank(2, 8, 8).unwrap().with_fps(25.0);

    let session = pipeline.run(&mut source, &mut log, &rx).unwrap();
    let report = TrackingReport::new(
        "clips/serve.mp4",
        "scripted",
        Some(25.0),
        &session,
        log.into_observations(),
    );

    let dir = tempfile::tempdir().unwrap();
    let path = report
        .write_to_dir(dir.path().join("nested"), &report_stem("clips/serve.mp4"))
        .unwrap();
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("serve_ball_data.json")
    );

    let loaded = TrackingReport::read(&path).unwrap();
    assert_eq!(loaded.metadata.total_detections, 2);
    assert_eq!(loaded.trajectory.len(), 2);
    assert_eq!(loaded.trajectory[1].speed, Some(125.0));
    assert_eq!(loaded.summary, report.summary);
    assert_eq!(loaded.session.nominal_fps, Some(25.0));
}

#[test]
fn stub_session_writes_frames_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = TrackerConfig::load_from(None).unwrap();
    cfg.tracking.max_frames = Some(30);
    cfg.output.dir = dir.path().to_path_buf();

    let mut source = cfg.open_source().unwrap();
    let detector = cfg.build_detector().unwrap();
    let detector_name = detector.name();
    let nominal_fps = source.nominal_fps();
    let mut pipeline = Pipeline::new(cfg.pipeline_config(nominal_fps), detector).unwrap();
    let (_controller, rx) = command_channel();

    let stem = report_stem(&cfg.source.uri);
    let frames_dir = dir.path().join(format!("{}_frames", stem));
    let writer = FrameDirWriter::new(&frames_dir, FrameFormat::Png)
        .unwrap()
        .with_total_frames(Some(30));
    let mut frames = ThreadedSink::spawn(writer, 4).unwrap();
    let mut log = ObservationLog::new();

    let session = {
        let mut sinks = FanoutSink::new().with(&mut log).with(&mut frames);
        pipeline.run(&mut source, &mut sinks, &rx).unwrap()
    };
    assert_eq!(session.stop_reason, StopReason::FrameLimit);
    assert_eq!(session.summary.total_frames, 30);
    assert!(session.summary.detections > 0);

    let written = frames.into_inner().expect("frame writer finished");
    assert_eq!(written.written(), 30);
    let first = image::open(frames_dir.join("frame_000000.png")).unwrap();
    assert_eq!((first.width(), first.height()), (640, 480));

    let report = TrackingReport::new(
        &cfg.source.uri,
        detector_name,
        nominal_fps,
        &session,
        log.into_observations(),
    );
    let path = report.write_to_dir(&cfg.output.dir, &stem).unwrap();
    let loaded = TrackingReport::read(path).unwrap();
    assert_eq!(loaded.metadata.detector, "color");
    assert_eq!(loaded.metadata.total_detections as u64, session.summary.detections);
    assert_eq!(loaded.session.stop_reason, "frame_limit");
}
