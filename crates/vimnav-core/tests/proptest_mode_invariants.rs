//! Property-based tests for mode transitions.
//!
//! 1. Setting the current mode is silent
//! 2. Listeners see exactly the real transitions, in order
//! 3. Every listener observes the same history

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use vimnav_core::mode::{Mode, ModeManager};

fn mode_strategy() -> impl Strategy<Value = Mode> {
    prop::sample::select(vec![Mode::Normal, Mode::Insert, Mode::Hints, Mode::Search])
}

proptest! {
    #[test]
    fn listeners_see_only_real_transitions(
        modes in prop::collection::vec(mode_strategy(), 0..40),
    ) {
        let mut manager = ModeManager::new();
        let first: Rc<RefCell<Vec<(Mode, Mode)>>> = Rc::default();
        let second: Rc<RefCell<Vec<(Mode, Mode)>>> = Rc::default();
        let sink = Rc::clone(&first);
        let _a = manager.on_mode_change(move |new, old| sink.borrow_mut().push((new, old)));
        let sink = Rc::clone(&second);
        let _b = manager.on_mode_change(move |new, old| sink.borrow_mut().push((new, old)));

        let mut expected = Vec::new();
        let mut current = Mode::Normal;
        for mode in modes {
            let changed = manager.set_mode(mode);
            prop_assert_eq!(changed, mode != current);
            if changed {
                expected.push((mode, current));
                current = mode;
            }
            prop_assert_eq!(manager.mode(), current);
        }

        prop_assert_eq!(&*first.borrow(), &expected);
        prop_assert_eq!(&*second.borrow(), &expected);
    }
}

#[test]
fn unsubscribed_listener_goes_quiet() {
    let mut manager = ModeManager::new();
    let seen: Rc<RefCell<usize>> = Rc::default();
    let sink = Rc::clone(&seen);
    let sub = manager.on_mode_change(move |_, _| *sink.borrow_mut() += 1);

    manager.set_mode(Mode::Insert);
    sub.unsubscribe();
    manager.set_mode(Mode::Normal);
    assert_eq!(*seen.borrow(), 1);
    assert_eq!(manager.listener_count(), 0);
}
