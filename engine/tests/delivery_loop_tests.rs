use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use kinetic_engine::scheduler::DISPLAY_REFRESH;
use kinetic_engine::{
    Delivery, FrameSlot, Landmark, LandmarkFrame, LandmarkSource, Scheduler, ScriptedDelivery, ScriptedSource,
    SourceError, TaskControl,
};
use proptest::prelude::*;

fn pose(at_ms: u64, x: f32) -> ScriptedDelivery {
    ScriptedDelivery {
        at_ms,
        delivery: Delivery::pose(LandmarkFrame::new(vec![Landmark::new(x, 0.5)])),
    }
}

fn wire(source: &mut ScriptedSource) -> FrameSlot<LandmarkFrame> {
    let slot = FrameSlot::new();
    let publisher = slot.clone();
    source
        .subscribe(Box::new(move |delivery| {
            if let Delivery::Pose { frame: Some(frame) } = delivery {
                publisher.publish(frame);
            }
        }))
        .expect("scripted source subscribes");
    slot
}

#[test]
fn render_tick_sees_only_the_newest_frame() {
    // three frames land inside one display refresh
    let mut source = ScriptedSource::new(vec![pose(1, 0.1), pose(5, 0.2), pose(9, 0.3), pose(40, 0.4)]);
    let slot = wire(&mut source);

    let mut sched = Scheduler::new();
    let render = sched.schedule_repeating("render", DISPLAY_REFRESH);
    let seen = Rc::new(RefCell::new(Vec::new()));

    for step in 1..=3u32 {
        let until = DISPLAY_REFRESH * step;
        source.pump(until);
        let seen = Rc::clone(&seen);
        let slot = slot.clone();
        sched.run_until(until, move |fired| {
            assert_eq!(fired.task, render);
            if let Some(frame) = slot.take() {
                seen.borrow_mut().push(frame.get(0).map(|lm| lm.x));
            }
            TaskControl::Reschedule
        });
    }

    assert_eq!(*seen.borrow(), vec![Some(0.3), Some(0.4)]);
    assert_eq!(slot.published(), 4);
    assert_eq!(slot.dropped(), 2);
}

#[test]
fn failing_source_reports_permission_denied() {
    let mut source = ScriptedSource::failing(SourceError::PermissionDenied);
    let err = source.subscribe(Box::new(|_| {})).expect_err("denied");
    assert_eq!(err, SourceError::PermissionDenied);
    assert_eq!(source.pump(Duration::from_secs(5)), 0);
}

#[test]
fn second_subscription_is_rejected() {
    let mut source = ScriptedSource::new(vec![pose(0, 0.5)]);
    let _slot = wire(&mut source);
    let err = source.subscribe(Box::new(|_| {})).expect_err("already subscribed");
    assert_eq!(err, SourceError::AlreadySubscribed);
}

#[test]
fn scripts_load_from_json() {
    let text = r#"[
        {"at_ms": 20, "delivery": {"kind": "hands", "hands": [[{"x": 0.5, "y": 0.5}]]}},
        {"at_ms": 10, "delivery": {"kind": "pose", "frame": null}}
    ]"#;
    let mut source = ScriptedSource::from_json(text).expect("script parses");
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&kinds);
    source
        .subscribe(Box::new(move |delivery| {
            sink.borrow_mut().push(matches!(delivery, Delivery::Hands { .. }));
        }))
        .expect("subscribe");

    assert_eq!(source.pump(Duration::from_millis(30)), 2);
    assert_eq!(*kinds.borrow(), vec![false, true]);
    assert!(source.is_exhausted());
}

proptest! {
    #[test]
    fn timer_stream_fires_once_per_period(secs in 0u64..120, refreshes in 0u32..600) {
        let mut sched = Scheduler::new();
        let timer = sched.schedule_repeating("timer", Duration::from_secs(1));
        let render = sched.schedule_repeating("render", DISPLAY_REFRESH);
        let mut timer_runs = 0u64;
        let mut render_runs = 0u32;
        let until = Duration::from_secs(secs).max(DISPLAY_REFRESH * refreshes);
        sched.run_until(until, |fired| {
            if fired.task == timer {
                timer_runs += 1;
            } else if fired.task == render {
                render_runs += 1;
            }
            TaskControl::Reschedule
        });
        prop_assert_eq!(timer_runs, until.as_secs());
        prop_assert_eq!(u128::from(render_runs), until.as_micros() / DISPLAY_REFRESH.as_micros());
    }
}
