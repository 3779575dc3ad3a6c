use abzcore::common::speed::SpeedEstimator;
use abzcore::prelude::*;
use abzcore::std::get_sim_source;
use embassy_time::{Duration, Instant, Ticker};

const SAMPLE_HZ: u32 = 10_000;

fn load_config() -> AbzConfig {
    match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(path).expect("Failed to read config file");
            serde_json::from_str(&raw).expect("Failed to parse config file")
        }
        None => AbzConfig::default(),
    }
}

#[tokio::main]
async fn main() {
    let config = load_config();
    println!("QEO generate ABZ signal with hardware provide position");

    // simulated rotation published into the shared slot, read back by the
    // generator: the loopback route of the demo
    let source = get_sim_source(0.5);
    tokio::spawn(source.publish_position(SAMPLE_HZ as u64 * 2));

    let mut qeo = Qeo::new(
        StaticPosition {
            invert: false,
            offset: 0,
        },
        config,
    )
    .expect("config QEO abz failed");

    println!("qeiv2 abz encoder example");
    let mut qei = QeiCounter::new(QeiConfig {
        phase_max: config.resolution_lines * 4,
        z_count_mode: ZCountMode::OnPhaseMax,
        z_init: 100,
        phase_init: 500,
    })
    .expect("config QEI failed");
    let mut speed = SpeedEstimator::new(qei.absolute_position(), SAMPLE_HZ);

    for _ in 0..10 {
        let window = Instant::now();
        let mut ticker = Ticker::every(Duration::from_hz(SAMPLE_HZ as u64));
        while window.elapsed().as_millis() < 3000 {
            let sample = qeo.tick();
            qei.tick_sample(&sample);
            speed.tick(qei.absolute_position());
            ticker.next().await;
        }
        println!(
            "z: {:#x}, phase: {}, speed: {} counts/s",
            qei.z_cnt(),
            qei.phase_cnt(),
            speed.speed()
        );
    }
}
