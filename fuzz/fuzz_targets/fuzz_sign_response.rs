#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any body the trust backend returns must map to a signature or a
    // credential error, never a panic.
    if let Ok(sign) = game_command_relay::credential::interpret_sign_response(data) {
        let _ = sign.app_id.as_sdk_app_id();
        let _ = sign.app_id.to_string();
    }
});
