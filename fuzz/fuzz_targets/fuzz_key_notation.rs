#![no_main]

use libfuzzer_sys::fuzz_target;
use vimnav_core::KeySequence;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 1024 {
        return;
    }

    // Parsing never panics and never yields more keys than characters.
    let seq = KeySequence::parse(text);
    assert!(seq.len() <= text.chars().count());
    assert_eq!(seq.is_empty(), text.is_empty());

    // Display writes a form that parses back to the same sequence.
    let printed = seq.to_string();
    assert_eq!(KeySequence::parse(&printed), seq, "round trip via {printed:?}");
});
