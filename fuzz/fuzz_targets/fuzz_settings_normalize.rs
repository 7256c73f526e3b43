#![no_main]

use libfuzzer_sys::fuzz_target;
use vimnav_core::Settings;
use vimnav_core::settings::MIN_HINT_CHARACTERS;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    let Ok(raw) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    // Any JSON value normalizes to usable settings.
    let settings = Settings::normalize(&raw);
    assert!(settings.scroll_step_size.is_finite() && settings.scroll_step_size > 0.0);
    assert!(settings.half_page_scroll.is_finite() && settings.half_page_scroll > 0.0);
    assert!(settings.smooth_scroll_duration_ms.is_finite() && settings.smooth_scroll_duration_ms >= 0.0);
    assert!(settings.hint_characters.chars().count() >= MIN_HINT_CHARACTERS);

    // Normalization is idempotent through the wire form.
    let wire = serde_json::to_value(&settings).expect("settings serialize");
    assert_eq!(Settings::normalize(&wire), settings);

    // Merging a patch never panics and stays normalized.
    let merged = settings.merged(&raw);
    assert!(merged.hint_characters.chars().count() >= MIN_HINT_CHARACTERS);
});
