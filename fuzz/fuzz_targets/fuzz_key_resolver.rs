#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vimnav_core::keybinding::SEQUENCE_TIMEOUT;
use vimnav_core::{Key, KeyMappings, KeySequenceResolver, NamedKey, Resolution, Scheduler};
use web_time::{Duration, Instant};

#[derive(Debug, Arbitrary)]
enum Op {
    /// Printable ASCII key.
    Char(u8),
    Escape,
    /// Advance the clock by this many milliseconds.
    Wait(u16),
    Reset,
}

fuzz_target!(|ops: Vec<Op>| {
    if ops.len() > 512 {
        return;
    }
    let mut now = Instant::now();
    let mut sched = Scheduler::new(now);
    let mut resolver = KeySequenceResolver::new(&KeyMappings::default());

    for op in ops {
        match op {
            Op::Char(b) => {
                let key = Key::Char(char::from(b' ' + b % 95));
                let resolution = resolver.feed(key, &mut sched);
                match resolution {
                    // A pending buffer always has exactly one live timer.
                    Resolution::Prefix => {
                        assert!(resolver.is_pending());
                        assert!(resolver.timer().is_some_and(|id| sched.has_timer(id)));
                    }
                    Resolution::Exact(_) | Resolution::None => {
                        assert!(!resolver.is_pending());
                        assert!(resolver.timer().is_none());
                    }
                }
            }
            Op::Escape => {
                let _ = resolver.feed(Key::Named(NamedKey::Escape), &mut sched);
            }
            Op::Wait(ms) => {
                now += Duration::from_millis(u64::from(ms));
                for (id, _) in sched.advance(now) {
                    resolver.on_timeout(id);
                }
                if u64::from(ms) >= SEQUENCE_TIMEOUT.as_millis() as u64 {
                    assert!(!resolver.is_pending(), "prefix survived its timeout");
                }
            }
            Op::Reset => {
                resolver.reset(&mut sched);
                assert!(!resolver.is_pending());
            }
        }
        assert!(resolver.buffer().len() <= 2, "default bindings are at most two keys");
    }
});
