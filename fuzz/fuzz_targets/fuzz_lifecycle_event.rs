#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(event) = serde_json::from_slice::<game_command_relay::LifecycleEvent>(data) {
        let _ = event.downgrades_session();
        let _ = event.name();
    }
});
