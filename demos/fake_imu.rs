use std::pin::pin;

use fusion_odometry::{ImuBias, ImuMeasured, Preintegration, preintegration::NoiseConfig};
use smol::stream::StreamExt;

fn main() {
    env_logger::init();

    let interval = 0.2;
    let fake_imu = smol::stream::unfold((), async |_| {
        smol::Timer::after(std::time::Duration::from_secs_f64(interval)).await;
        let next = rand::random_range(-0.01..0.01);
        Some((next, ()))
    })
    .map(|x| ImuMeasured::new(0., 0., 9.81 + x, 0., 0., 0.));

    smol::block_on(async move {
        let mut fake_imu = pin!(fake_imu);
        let Some(anchor) = fake_imu.next().await else {
            return;
        };

        let mut preintegration =
            Preintegration::new(anchor, ImuBias::default(), &NoiseConfig::default());
        fake_imu
            .for_each(move |measured| {
                preintegration.append(interval, measured);
                dbg!(&preintegration.relative_motion().delta_v);
            })
            .await;
    });
}
