#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(desc) = epa_cli::ClassDescription::from_json(s) {
            if let Ok(actions) = epa_model::ActionSet::extract(&desc.class_model()) {
                let _ = desc.translator();
                let _ = desc.initial_state(&actions);
            }
        }
    }
});
