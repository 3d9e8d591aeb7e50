use std::thread::sleep;
use std::time::Duration;

use beep_engine::{BeepEngine, EngineConfig};

const FINISH_EVENT: u32 = 0x378c;

fn main() {
    tracing_subscriber::fmt::init();

    let engine = match BeepEngine::start(EngineConfig::default()) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "beep engine did not start");
            return;
        }
    };
    tracing::info!("beep engine started");

    sleep(Duration::from_millis(500));

    engine.beep(110.0, 1.0);
    engine.beep(220.0, 1.0);
    engine.beep(440.0, 1.0);
    engine.beep(880.0, 1.0);
    engine.beep(1760.0, 1.0);
    engine.beep(12_000.0, 1.0);

    sleep(Duration::from_millis(500));

    let mut batch = engine.new_batch();
    batch.add_note(0.0, 220.0, 0.125, 1.0);
    batch.add_note(0.5, 330.0, 0.125, 1.0);
    batch.add_event(1.5, FINISH_EVENT);
    engine.submit_batch(batch);

    if engine.wait_for_event(FINISH_EVENT) {
        tracing::info!("playback finished");
    } else {
        tracing::warn!("wait_for_event returned without the event firing");
    }

    sleep(Duration::from_millis(500));

    engine.stop();
    tracing::info!("beep engine stopped");
}
