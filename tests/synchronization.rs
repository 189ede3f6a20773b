use approx::assert_relative_eq;
use fusion_odometry::{
    Estimate, Estimator, FeatureSets, Fusion, ImuMeasured, PointCloud, ScanInfo, Stream,
    SyncError,
    estimator::{ImuStep, PreintegratedEstimator, ScanFrame},
    frame::Framed,
    fusion::{Config, JoinPolicy, Message, Phase},
};
use nalgebra::{IsometryMatrix3, Vector3};

type TestT = f64;

const GRAVITY: TestT = 9.81;

/// Records every call and lands exactly where it is told to.
#[derive(Debug, Default)]
struct Recorder {
    time: TestT,
    steps: Vec<(TestT, TestT)>,
    scans: Vec<TestT>,
    /// `acc.x` of the latest and of the closing sample handed with each scan.
    handed: Vec<(TestT, TestT)>,
}

impl Estimator<TestT> for Recorder {
    fn time(&self) -> TestT {
        self.time
    }

    fn process_imu(&mut self, step: ImuStep<'_, TestT>) {
        self.steps.push((step.dt, step.timestamp));
        self.time = step.timestamp;
    }

    fn process_scan(&mut self, frame: ScanFrame<'_, TestT>) -> Estimate<TestT> {
        self.scans.push(frame.timestamp);
        self.handed.push((frame.last_imu.acc.x, frame.closing_imu.acc.x));
        self.time = frame.timestamp;
        Estimate {
            timestamp: frame.timestamp,
            pose: Framed::new(IsometryMatrix3::identity()),
            velocity: Vector3::zeros(),
            features: FeatureSets::default(),
        }
    }
}

fn still() -> ImuMeasured<TestT> {
    ImuMeasured::new(0.0, 0.0, GRAVITY, 0.0, 0.0, 0.0)
}

/// A sample carrying its own timestamp in `acc.x`.
fn tagged(timestamp: TestT) -> ImuMeasured<TestT> {
    ImuMeasured::new(timestamp, 0.0, GRAVITY, 0.0, 0.0, 0.0)
}

fn push_scan_set<E: Estimator<TestT>>(
    fusion: &mut Fusion<TestT, E>,
    timestamp: TestT,
) -> Vec<fusion_odometry::FusionOutput<TestT>> {
    let mut outputs = fusion
        .push_scan(timestamp, PointCloud::new())
        .expect("first after join never fails");
    outputs.extend(
        fusion
            .push_scan_info(timestamp, ScanInfo::default())
            .expect("first after join never fails"),
    );
    outputs.extend(
        fusion
            .push_outlier(timestamp, PointCloud::new())
            .expect("first after join never fails"),
    );
    outputs
}

/// A driver initialized on a scan at 0.90, its estimator time at 0.90.
fn initialized(config: &Config) -> Fusion<TestT, Recorder> {
    let mut fusion = Fusion::new(config, Recorder::default());
    assert!(fusion.push_imu(0.90, still()).expect("no scan yet").is_empty());
    assert_eq!(fusion.phase(), Phase::Uninitialized);

    let outputs = push_scan_set(&mut fusion, 0.90);
    assert_eq!(outputs.len(), 1);
    assert_eq!(fusion.phase(), Phase::Tracking);
    assert_eq!(fusion.estimator().time, 0.90);
    fusion
}

#[test]
fn test_steps_land_on_scan_time() {
    let mut fusion = initialized(&Config::default());

    assert!(fusion.push_imu(0.95, still()).expect("ok").is_empty());
    assert!(push_scan_set(&mut fusion, 1.00).is_empty());
    assert_eq!(fusion.estimator().time, 0.90);

    let outputs = fusion.push_imu(1.05, still()).expect("ok");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].odometry.timestamp, 1.00);

    let recorder = fusion.estimator();
    assert_eq!(recorder.time, 1.00);
    assert_eq!(recorder.scans, [0.90, 1.00]);
    assert_eq!(recorder.steps.len(), 2);
    assert_relative_eq!(recorder.steps[0].0, 0.05, epsilon = 1e-12);
    assert_eq!(recorder.steps[0].1, 0.95);
    assert_relative_eq!(recorder.steps[1].0, 0.05, epsilon = 1e-12);
    assert_eq!(recorder.steps[1].1, 1.00);

    // the sample past the scan stays for the next interval
    let buffered = fusion.buffered();
    assert_eq!(buffered.imu, 1);
    assert_eq!(buffered.scan, 0);
    assert_eq!(buffered.scan_info, 0);
    assert_eq!(buffered.outlier, 0);
}

#[test]
fn test_inertial_lag_defers_scan() {
    let mut fusion = initialized(&Config::default());

    fusion.push_imu(0.95, still()).expect("ok");
    let before = fusion.buffered();
    let outputs = push_scan_set(&mut fusion, 1.00);

    assert!(outputs.is_empty());
    assert_eq!(fusion.estimator().time, 0.90);
    assert!(fusion.estimator().steps.is_empty());
    assert_eq!(fusion.buffered().imu, before.imu);
    assert_eq!(fusion.buffered().scan, before.scan + 1);
}

#[test]
fn test_backlog_is_drained_in_order() {
    let mut fusion = initialized(&Config::default());

    push_scan_set(&mut fusion, 1.00);
    push_scan_set(&mut fusion, 1.10);
    let outputs = [0.95, 1.00, 1.05, 1.10, 1.15]
        .into_iter()
        .flat_map(|timestamp| fusion.push_imu(timestamp, still()).expect("ok"))
        .collect::<Vec<_>>();

    let timestamps = outputs
        .iter()
        .map(|output| output.odometry.timestamp)
        .collect::<Vec<_>>();
    assert_eq!(timestamps, [1.00, 1.10]);
    assert_eq!(fusion.stats().count(), 2);
    assert_eq!(fusion.estimator().scans, [0.90, 1.00, 1.10]);
}

#[test]
fn test_scan_receives_latest_and_closing_imu() {
    let mut fusion = Fusion::new(&Config::default(), Recorder::default());
    fusion.push_imu(0.90, tagged(0.90)).expect("ok");
    assert_eq!(push_scan_set(&mut fusion, 0.90).len(), 1);

    [0.95, 1.00, 1.05, 1.10, 1.15]
        .into_iter()
        .for_each(|timestamp| {
            assert!(fusion.push_imu(timestamp, tagged(timestamp)).expect("ok").is_empty());
        });
    assert_eq!(push_scan_set(&mut fusion, 1.00).len(), 1);
    assert_eq!(push_scan_set(&mut fusion, 1.10).len(), 1);

    let recorder = fusion.estimator();
    assert_eq!(recorder.scans, [0.90, 1.00, 1.10]);
    assert_eq!(recorder.handed, [(0.90, 0.90), (1.15, 1.00), (1.15, 1.10)]);
}

#[test]
fn test_inertial_lag_keeps_interval() {
    let mut fusion = Fusion::<TestT, PreintegratedEstimator<TestT>>::from_config(&Config::default());
    fusion.push_imu(0.0, still()).expect("ok");
    assert_eq!(push_scan_set(&mut fusion, 0.0).len(), 1);

    let measured = still();
    [0.01, 0.02, 0.03].into_iter().for_each(|timestamp| {
        fusion.estimator_mut().process_imu(ImuStep {
            dt: 0.01,
            timestamp,
            measured: &measured,
        });
    });
    fusion.push_imu(0.05, still()).expect("ok");

    let before = fusion
        .estimator()
        .interval()
        .cloned()
        .expect("interval opened on the first scan");
    assert_eq!(before.len(), 3);

    assert!(push_scan_set(&mut fusion, 0.10).is_empty());

    let estimator = fusion.estimator();
    let after = estimator.interval().expect("interval kept");
    assert_eq!(estimator.time(), 0.03);
    assert_eq!(after.len(), before.len());
    assert_eq!(after.relative_motion(), before.relative_motion());
    assert_eq!(
        after.error_state_transition().0,
        before.error_state_transition().0
    );
    assert_eq!(
        after.error_state_covariance().0,
        before.error_state_covariance().0
    );

    let buffered = fusion.buffered();
    assert_eq!(buffered.imu, 1);
    assert_eq!(buffered.scan, 1);
    assert_eq!(buffered.scan_info, 1);
    assert_eq!(buffered.outlier, 1);
}

#[test]
fn test_initialization_snaps_to_latest() {
    let mut fusion = Fusion::new(&Config::default(), Recorder::default());
    fusion.push_imu(0.80, still()).expect("ok");
    fusion.push_scan(0.50, PointCloud::new()).expect("ok");
    fusion.push_scan(0.70, PointCloud::new()).expect("ok");
    fusion.push_scan_info(0.70, ScanInfo::default()).expect("ok");
    let outputs = fusion.push_outlier(0.70, PointCloud::new()).expect("ok");

    assert_eq!(outputs.len(), 1);
    assert_eq!(fusion.estimator().scans, [0.70]);
    assert_eq!(fusion.buffered().scan, 0);
    assert_eq!(fusion.buffered().imu, 1);
}

#[test]
fn test_window_join_reports_mismatch() {
    let config = Config {
        join: JoinPolicy::Window { tolerance: 0.01 },
        ..Default::default()
    };
    let mut fusion = initialized(&config);

    fusion.push_imu(1.05, still()).expect("ok");
    fusion.push_scan(1.00, PointCloud::new()).expect("ok");
    fusion.push_outlier(1.00, PointCloud::new()).expect("ok");

    // the info for 1.00 never arrives, the next one is past the window
    let error = fusion
        .push_scan_info(1.10, ScanInfo::default())
        .expect_err("info is too late");
    assert_eq!(
        error,
        SyncError::StreamMismatch {
            stream: Stream::ScanInfo,
            scan_time: 1.00,
            nearest: Some(1.10),
        }
    );
    assert_eq!(fusion.estimator().time, 0.90);

    assert_eq!(fusion.skip_scan(), Some(1.00));
    assert_eq!(fusion.buffered().scan, 0);
    assert_eq!(fusion.buffered().scan_info, 1);
}

#[test]
fn test_window_join_waits_for_pending_companion() {
    let config = Config {
        join: JoinPolicy::Window { tolerance: 0.01 },
        ..Default::default()
    };
    let mut fusion = initialized(&config);

    fusion.push_imu(1.05, still()).expect("ok");
    fusion.push_scan(1.00, PointCloud::new()).expect("ok");
    assert!(fusion.push_outlier(1.00, PointCloud::new()).expect("ok").is_empty());

    let outputs = fusion
        .push_scan_info(1.005, ScanInfo::default())
        .expect("inside the window");
    assert_eq!(outputs.len(), 1);
    assert_eq!(fusion.estimator().time, 1.00);
}

#[test]
fn test_window_join_skips_stale_companion() {
    let config = Config {
        join: JoinPolicy::Window { tolerance: 0.05 },
        ..Default::default()
    };
    let mut fusion = initialized(&config);

    // arrives after the driver already moved past it
    assert!(fusion.push_scan_info(0.89, ScanInfo::default()).expect("ok").is_empty());
    assert!(push_scan_set(&mut fusion, 0.93).is_empty());
    assert_eq!(fusion.estimator().time, 0.90);

    let outputs = fusion.push_imu(0.95, still()).expect("ok");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].odometry.timestamp, 0.93);
    assert_eq!(fusion.estimator().time, 0.93);
    assert_eq!(fusion.buffered().scan_info, 0);
}

#[test]
fn test_preintegrated_estimator_holds_still() {
    let mut fusion = Fusion::<TestT, PreintegratedEstimator<TestT>>::from_config(&Config::default());
    fusion.push_imu(0.0, still()).expect("ok");
    push_scan_set(&mut fusion, 0.0);

    let mut outputs = Vec::new();
    let tick = |i: usize| i as TestT * 0.01;
    for scan in 1..=5 {
        for i in (scan - 1) * 10 + 1..=scan * 10 {
            outputs.extend(fusion.push_imu(tick(i), still()).expect("ok"));
        }
        outputs.extend(push_scan_set(&mut fusion, tick(scan * 10)));
    }

    assert_eq!(outputs.len(), 5);
    outputs.iter().for_each(|output| {
        assert_relative_eq!(output.odometry.position, Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(output.velocity, Vector3::zeros(), epsilon = 1e-9);
    });
}

#[test]
fn test_channel_funnel() {
    let fusion = Fusion::new(&Config::default(), Recorder::default());
    let handle = fusion.spawn(64).expect("thread spawns");

    let producer = handle.sender.clone();
    let messages = [
        Message::Imu((0.90, still()).into()),
        Message::Scan((0.90, PointCloud::new()).into()),
        Message::ScanInfo((0.90, ScanInfo::default()).into()),
        Message::Outlier((0.90, PointCloud::new()).into()),
        Message::Imu((0.95, still()).into()),
        Message::Scan((1.00, PointCloud::new()).into()),
        Message::ScanInfo((1.00, ScanInfo::default()).into()),
        Message::Outlier((1.00, PointCloud::new()).into()),
        Message::Imu((1.05, still()).into()),
    ];
    std::thread::spawn(move || {
        messages
            .into_iter()
            .for_each(|message| producer.send(message).expect("driver alive"));
    })
    .join()
    .expect("producer finishes");
    drop(handle.sender);

    let timestamps = handle
        .outputs
        .iter()
        .map(|output| output.odometry.timestamp)
        .collect::<Vec<_>>();
    assert_eq!(timestamps, [0.90, 1.00]);

    let fusion = handle.join.join().expect("driver finishes");
    assert_eq!(fusion.estimator().time, 1.00);
}

#[test]
fn test_channel_funnel_continues_after_skipped_scan() {
    let config = Config {
        join: JoinPolicy::Window { tolerance: 0.01 },
        ..Default::default()
    };
    let handle = Fusion::new(&config, Recorder::default())
        .spawn(64)
        .expect("thread spawns");

    [
        Message::Imu((0.90, still()).into()),
        Message::Scan((0.90, PointCloud::new()).into()),
        Message::ScanInfo((0.90, ScanInfo::default()).into()),
        Message::Outlier((0.90, PointCloud::new()).into()),
        Message::Imu((1.15, still()).into()),
        Message::Scan((1.00, PointCloud::new()).into()),
        Message::Outlier((1.00, PointCloud::new()).into()),
        Message::Scan((1.10, PointCloud::new()).into()),
        Message::Outlier((1.10, PointCloud::new()).into()),
        // no info for 1.00, the one for 1.10 is the last message
        Message::ScanInfo((1.10, ScanInfo::default()).into()),
    ]
    .into_iter()
    .for_each(|message| handle.sender.send(message).expect("driver alive"));
    drop(handle.sender);

    let timestamps = handle
        .outputs
        .iter()
        .map(|output| output.odometry.timestamp)
        .collect::<Vec<_>>();
    assert_eq!(timestamps, [0.90, 1.10]);

    let fusion = handle.join.join().expect("driver finishes");
    assert_eq!(fusion.estimator().scans, [0.90, 1.10]);
    assert_eq!(fusion.estimator().time, 1.10);
}
