use fusion_odometry::{
    Fusion, ImuMeasured, LidarPoint, PointCloud, ScanInfo,
    fusion::{Config, Message},
    measurement::Stamped,
};
use itertools::Itertools;
use nalgebra::Point3;

const IMU_RATE: usize = 100;
const SCAN_EVERY: usize = 10;

fn fake_scan(points: usize) -> (PointCloud<f64>, ScanInfo<f64>) {
    let scan = (0..points)
        .map(|_| {
            LidarPoint::new(
                Point3::new(
                    rand::random_range(-20.0..20.0),
                    rand::random_range(-20.0..20.0),
                    rand::random_range(-1.5..3.0),
                ),
                rand::random_range(0.0..1.0),
            )
        })
        .collect_vec();
    let info = ScanInfo {
        ground_flag: scan.iter().map(|point| point.position.z < -1.0).collect(),
        range: scan.iter().map(|point| point.position.coords.norm()).collect(),
        ..Default::default()
    };
    (scan, info)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let handle = Fusion::<f64, _>::from_config(&config).spawn(64)?;

    let imu_sender = handle.sender.clone();
    let imu = std::thread::spawn(move || {
        (0..5 * IMU_RATE)
            .map(|i| i as f64 / IMU_RATE as f64)
            .map(|t| {
                let noise = rand::random_range(-0.01..0.01);
                let measured = ImuMeasured::new(0.2, 0.0, 9.81 + noise, 0.0, 0.0, 0.05);
                Message::Imu(Stamped::new(t, measured))
            })
            .try_for_each(|message| imu_sender.send(message))
    });

    let scan_sender = handle.sender.clone();
    let scans = std::thread::spawn(move || {
        (0..5 * IMU_RATE)
            .step_by(SCAN_EVERY)
            .map(|i| i as f64 / IMU_RATE as f64)
            .flat_map(|t| {
                let (scan, info) = fake_scan(256);
                [
                    Message::Outlier(Stamped::new(t, PointCloud::new())),
                    Message::ScanInfo(Stamped::new(t, info)),
                    Message::Scan(Stamped::new(t, scan)),
                ]
            })
            .try_for_each(|message| scan_sender.send(message))
    });
    drop(handle.sender);

    for output in handle.outputs.iter() {
        let odometry = output.odometry;
        println!(
            "{:.2} {} -> {}: position {:?}, {} surface / {} corner points",
            odometry.timestamp,
            odometry.parent_frame,
            odometry.child_frame,
            odometry.position.as_slice(),
            output.features.surface.len(),
            output.features.corner.len(),
        );
    }

    imu.join().map_err(|_| "imu producer panicked")??;
    scans.join().map_err(|_| "scan producer panicked")??;
    let fusion = handle.join.join().map_err(|_| "fusion panicked")?;
    println!("mean duration per scan {:?}", fusion.stats().mean());
    Ok(())
}
