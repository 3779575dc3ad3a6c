use abzcore::prelude::*;
use defmt_or_log::info;

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
    println!("QEO generate ABZ signal with software inject position");

    let mut generator = AbzGenerator::new(config).expect("config QEO abz failed");
    let line = POSITION_SPAN / config.resolution_lines as u64;
    // one line per period at the frequency cap, injected 16 lines at a time
    let period_us = (1_000_000 / config.max_frequency_hz as u64).max(1);

    // two full revolutions
    let positions = (0..config.resolution_lines as u64 * 2)
        .step_by(16)
        .map(move |i| i * line % POSITION_SPAN);
    abzcore::std::replay(&mut generator, positions, period_us * 16, |sample| {
        info!(
            "A={} B={} Z={} rev={}",
            sample.a, sample.b, sample.z, sample.revolution
        );
    })
    .await
    .expect("injected position out of range");

    // park the output back at zero before injection stops
    let parked = generator.advance(0).expect("in range");
    println!(
        "replayed {} revolutions, parked at sub-state {}",
        generator.revolution(),
        parked.sub_state
    );
}
