//! # Tween 测试
//!
//! 聚合状态机、播放控制和事件顺序。

use std::cell::RefCell;
use std::rc::Rc;

use super::*;
use crate::easing::EasingFunction;
use crate::event::Event;
use crate::target::PropertyBag;
use crate::tween_data::TweenDataState;
use crate::value::{NumberOp, ValueOp};

// -------------------------------------------------------------------------
// 辅助函数
// -------------------------------------------------------------------------

fn sprite(x: f64) -> Rc<PropertyBag> {
    Rc::new(PropertyBag::new().with("x", x).with("y", 0.0))
}

/// 已初始化并开始播放的 Tween
fn playing(builder: TweenBuilder) -> Tween {
    let mut tween = builder.build().unwrap();
    assert!(tween.init());
    let _ = tween.play();
    assert_eq!(tween.state(), TweenState::Playing);
    tween
}

/// 记录事件的文字描述
fn record(tween: &mut Tween, kinds: &[TweenEventKind]) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for &kind in kinds {
        let sink = log.clone();
        tween.on(kind, move |event: &TweenEvent| {
            let text = match event.unit() {
                Some(unit) => format!("{:?} {}={}", event.kind(), unit.key, unit.current),
                None => format!("{:?}", event.kind()),
            };
            sink.borrow_mut().push(text.to_lowercase());
        });
    }
    log
}

fn count(log: &Rc<RefCell<Vec<String>>>, prefix: &str) -> usize {
    log.borrow().iter().filter(|e| e.starts_with(prefix)).count()
}

// -------------------------------------------------------------------------
// 完成与进度
// -------------------------------------------------------------------------

#[test]
fn test_completion_after_exact_duration() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));

    for _ in 0..3 {
        assert!(!tween.update(0.0, 250.0));
    }
    assert!(tween.update(0.0, 250.0));
    assert_eq!(tween.state(), TweenState::PendingRemove);
    assert_eq!(s.get("x"), Some(100.0));
    assert_eq!(tween.total_progress(), 1.0);

    // PendingRemove 之后始终请求移除
    assert!(tween.update(0.0, 250.0));
}

#[test]
fn test_progress_is_monotonic() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));

    let mut last = 0.0;
    while !tween.update(0.0, 16.0) {
        let progress = tween.data()[0].progress();
        assert!(progress >= last);
        last = progress;
    }
    assert_eq!(tween.data()[0].progress(), 1.0);
}

#[test]
fn test_duration_is_longest_unit() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .property("y", Prop::new(10.0).duration(300.0).delay(50.0))
        .looping(2)
        .loop_delay(100.0)
        .complete_delay(40.0)
        .build()
        .unwrap();
    tween.init();

    assert_eq!(tween.duration(), 1000.0);
    assert_eq!(tween.start_delay(), 0.0);
    assert_eq!(tween.total_duration(), 1000.0 * 3.0 + 100.0 * 2.0 + 40.0);
}

#[test]
fn test_use_frames_ignores_delta() {
    let s = sprite(0.0);
    let mut tween = playing(
        Tween::builder()
            .target(&s)
            .property("x", 10.0)
            .duration(10.0)
            .use_frames(true),
    );

    tween.update(0.0, 1000.0);
    assert_eq!(s.get("x"), Some(1.0));
}

#[test]
fn test_time_scale_multiplies_delta() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0).time_scale(2.0));
    tween.set_global_time_scale(0.5);

    tween.update(0.0, 250.0);
    assert_eq!(s.get("x"), Some(25.0));
}

// -------------------------------------------------------------------------
// 延迟、循环、完成延迟
// -------------------------------------------------------------------------

#[test]
fn test_start_event_waits_for_shortest_delay() {
    let a = sprite(0.0);
    let b = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&a)
        .target(&b)
        .delay(NumberOp::Stagger {
            start: 100.0,
            each: 100.0,
        })
        .property("x", 100.0)
        .build()
        .unwrap();
    let log = record(&mut tween, &[TweenEventKind::Start]);
    tween.init();
    let _ = tween.play();

    tween.update(0.0, 60.0);
    assert!(!tween.has_started());
    tween.update(0.0, 60.0);
    assert!(tween.has_started());
    assert_eq!(count(&log, "start"), 1);

    tween.update(0.0, 60.0);
    assert_eq!(count(&log, "start"), 1);
    // 第一个目标已越过 delay，第二个还在等待
    assert!(a.get("x").unwrap() > 0.0);
    assert_eq!(b.get("x"), Some(0.0));
}

#[test]
fn test_loop_restarts_all_units() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", ValueOp::FromTo { from: 0.0, to: 100.0 })
        .duration(100.0)
        .looping(1)
        .build()
        .unwrap();
    let log = record(&mut tween, &[TweenEventKind::Loop, TweenEventKind::Complete]);
    tween.init();
    let _ = tween.play();

    assert!(!tween.update(0.0, 50.0));
    assert!(!tween.update(0.0, 50.0));
    assert_eq!(count(&log, "loop"), 1);
    assert_eq!(tween.loop_counter(), 0);

    assert!(!tween.update(0.0, 50.0));
    assert_eq!(s.get("x"), Some(50.0));
    assert!(tween.update(0.0, 50.0));
    assert_eq!(*log.borrow(), vec!["loop", "complete"]);
}

#[test]
fn test_loop_delay_defers_loop_event() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .duration(100.0)
        .looping(1)
        .loop_delay(100.0)
        .build()
        .unwrap();
    let log = record(&mut tween, &[TweenEventKind::Loop]);
    tween.init();
    let _ = tween.play();

    tween.update(0.0, 100.0);
    assert_eq!(tween.state(), TweenState::LoopDelay);
    assert_eq!(count(&log, "loop"), 0);

    tween.update(0.0, 50.0);
    assert_eq!(tween.state(), TweenState::LoopDelay);

    // 多出的 25ms 交给单元
    tween.update(0.0, 75.0);
    assert_eq!(tween.state(), TweenState::Playing);
    assert_eq!(count(&log, "loop"), 1);
    assert!((tween.data()[0].elapsed() - 25.0).abs() < 1e-9);
}

#[test]
fn test_complete_delay() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .duration(100.0)
        .complete_delay(100.0)
        .build()
        .unwrap();
    let log = record(&mut tween, &[TweenEventKind::Complete]);
    tween.init();
    let _ = tween.play();

    assert!(!tween.update(0.0, 100.0));
    assert_eq!(tween.state(), TweenState::CompleteDelay);
    assert_eq!(count(&log, "complete"), 0);

    assert!(!tween.update(0.0, 50.0));
    assert!(tween.update(0.0, 50.0));
    assert_eq!(count(&log, "complete"), 1);
}

#[test]
fn test_event_order_snapshot() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .duration(100.0)
        .yoyo(true)
        .looping(1)
        .build()
        .unwrap();
    let log = record(
        &mut tween,
        &[
            TweenEventKind::Start,
            TweenEventKind::Update,
            TweenEventKind::Yoyo,
            TweenEventKind::Repeat,
            TweenEventKind::Loop,
            TweenEventKind::Complete,
        ],
    );
    tween.init();
    let _ = tween.play();

    while !tween.update(0.0, 50.0) {}

    let events = log.borrow().clone();
    insta::assert_yaml_snapshot!(events, @r"
    - start
    - update x=50
    - yoyo x=100
    - update x=100
    - update x=50
    - update x=0
    - loop
    - update x=50
    - yoyo x=100
    - update x=100
    - update x=50
    - update x=0
    - complete
    ");
}

// -------------------------------------------------------------------------
// seek
// -------------------------------------------------------------------------

#[test]
fn test_seek_is_idempotent() {
    let a = sprite(0.0);
    let b = sprite(10.0);
    let mut tween = playing(
        Tween::builder()
            .target(&a)
            .target(&b)
            .property("x", ValueOp::Add(50.0))
            .ease(EasingFunction::EaseInOutSine)
            .yoyo(true),
    );

    tween.seek(0.37, DEFAULT_SEEK_STEP).unwrap();
    let first: Vec<u64> = tween.data().iter().map(|u| u.current().to_bits()).collect();
    let first_x = (a.get("x"), b.get("x"));

    tween.seek(0.37, DEFAULT_SEEK_STEP).unwrap();
    let second: Vec<u64> = tween.data().iter().map(|u| u.current().to_bits()).collect();

    assert_eq!(first, second);
    assert_eq!(first_x, (a.get("x"), b.get("x")));
    assert!(tween.total_progress() >= 0.37);
    assert!(!tween.is_seeking());
}

#[test]
fn test_seek_suppresses_events() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    let log = record(
        &mut tween,
        &[
            TweenEventKind::Start,
            TweenEventKind::Update,
            TweenEventKind::Complete,
        ],
    );

    tween.seek(1.0, DEFAULT_SEEK_STEP).unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(s.get("x"), Some(100.0));
    // 越过终点后 seek 在移除请求处停止
    assert_eq!(tween.state(), TweenState::PendingRemove);
}

#[test]
fn test_seek_rejects_invalid_arguments() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));

    assert_eq!(
        tween.seek(0.5, 0.0),
        Err(TweenError::InvalidSeekStep { step: 0.0 })
    );
    assert!(tween.seek(0.5, f64::INFINITY).is_err());
    assert!(matches!(
        tween.seek(f64::NAN, 16.6),
        Err(TweenError::InvalidSeekPosition { .. })
    ));
}

#[test]
fn test_seek_before_first_render_reads_target() {
    let s = sprite(40.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", ValueOp::Add(10.0)));

    tween.seek(0.0, DEFAULT_SEEK_STEP).unwrap();
    // 尚未渲染的单元不写入目标
    assert_eq!(s.get("x"), Some(40.0));

    tween.update(0.0, 500.0);
    assert_eq!(tween.data()[0].start(), 40.0);
    assert_eq!(s.get("x"), Some(45.0));
}

#[test]
fn test_seek_past_loop_boundary() {
    let s = sprite(0.0);
    let mut tween = playing(
        Tween::builder()
            .target(&s)
            .property("x", ValueOp::FromTo { from: 0.0, to: 100.0 })
            .duration(1000.0)
            .looping(1),
    );
    assert_eq!(tween.total_duration(), 2000.0);

    tween.seek(0.75, 100.0).unwrap();
    // 第一轮结束后进入第二轮的中点
    assert_eq!(tween.state(), TweenState::Playing);
    assert_eq!(tween.loop_counter(), 0);
    assert_eq!(tween.elapsed(), 500.0);
    assert_eq!(tween.data()[0].state(), TweenDataState::PlayingForward);
    assert_eq!(tween.data()[0].current(), 50.0);
    assert_eq!(s.get("x"), Some(50.0));

    // 回到第一轮
    tween.seek(0.25, 100.0).unwrap();
    assert_eq!(tween.loop_counter(), 1);
    assert_eq!(tween.data()[0].current(), 50.0);
    assert_eq!(tween.total_elapsed(), 500.0);
}

#[test]
fn test_seek_inside_unit_delay() {
    let s = sprite(20.0);
    let mut tween = playing(
        Tween::builder()
            .target(&s)
            .property("x", 100.0)
            .delay(500.0)
            .duration(1000.0),
    );
    assert_eq!(tween.total_duration(), 1500.0);

    tween.seek(0.2, 100.0).unwrap();
    assert_eq!(tween.data()[0].state(), TweenDataState::Delay);
    assert_eq!(tween.data()[0].elapsed(), 200.0);
    assert_eq!(s.get("x"), Some(20.0));

    // 越过 delay 后多出的 400ms 计入播放
    tween.seek(0.6, 100.0).unwrap();
    assert_eq!(tween.data()[0].state(), TweenDataState::PlayingForward);
    assert_eq!(tween.data()[0].start(), 20.0);
    assert!((tween.data()[0].current() - 52.0).abs() < 1e-9);
    assert!((s.get("x").unwrap() - 52.0).abs() < 1e-9);

    // 已渲染的单元 seek 回 delay 内时恢复起始值
    tween.seek(0.2, 100.0).unwrap();
    assert_eq!(tween.data()[0].state(), TweenDataState::Delay);
    assert_eq!(tween.data()[0].current(), 20.0);
    assert_eq!(s.get("x"), Some(20.0));
}

// -------------------------------------------------------------------------
// 播放控制
// -------------------------------------------------------------------------

#[test]
fn test_play_is_noop_while_playing() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    tween.update(0.0, 500.0);

    assert_eq!(tween.play(), ManagerAction::None);
    assert_eq!(s.get("x"), Some(50.0));
}

#[test]
fn test_play_from_created_initialises() {
    let s = sprite(0.0);
    let mut tween = Tween::builder().target(&s).property("x", 100.0).build().unwrap();

    assert_eq!(tween.play(), ManagerAction::None);
    assert_eq!(tween.state(), TweenState::Playing);
    assert_eq!(tween.duration(), 1000.0);
}

#[test]
fn test_pause_and_resume() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    tween.update(0.0, 100.0);

    tween.pause();
    assert!(tween.is_paused());
    assert!(!tween.update(0.0, 500.0));
    assert_eq!(s.get("x"), Some(10.0));

    assert_eq!(tween.resume(), ManagerAction::None);
    tween.update(0.0, 100.0);
    assert_eq!(s.get("x"), Some(20.0));
}

#[test]
fn test_paused_tween_waits_in_pending() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .paused(true)
        .build()
        .unwrap();

    assert!(!tween.init());
    assert_eq!(tween.state(), TweenState::PendingAdd);
    assert_eq!(tween.play(), ManagerAction::MakeActive);
    assert!(!tween.is_paused());
}

#[test]
fn test_stop_fires_stop_and_drops_listeners() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    let log = record(&mut tween, &[TweenEventKind::Stop, TweenEventKind::Update]);

    let callback_hits = Rc::new(RefCell::new(0));
    let hits = callback_hits.clone();
    tween.set_callback(TweenEventKind::Complete, move |_| *hits.borrow_mut() += 1);

    tween.update(0.0, 100.0);
    assert_eq!(tween.stop(None), ManagerAction::None);
    assert_eq!(*log.borrow(), vec!["update x=10", "stop"]);
    assert_eq!(tween.state(), TweenState::PendingRemove);
    assert!(tween.update(0.0, 100.0));

    // 回调槽不受 stop 影响
    tween.complete(0.0);
    assert_eq!(*callback_hits.borrow(), 1);
}

#[test]
fn test_stop_with_reset_seeks_first() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    tween.update(0.0, 900.0);

    let _ = tween.stop(Some(0.5));
    let x = s.get("x").unwrap();
    assert!((50.0..50.0 + 1.7).contains(&x), "x = {x}");
}

#[test]
fn test_stop_before_activation_asks_for_removal() {
    let s = sprite(0.0);
    let mut tween = Tween::builder().target(&s).property("x", 1.0).build().unwrap();
    tween.init();
    assert_eq!(tween.stop(None), ManagerAction::Remove);
}

#[test]
fn test_restart() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    tween.update(0.0, 600.0);

    assert_eq!(tween.restart(), ManagerAction::None);
    assert_eq!(tween.state(), TweenState::Playing);
    assert_eq!(s.get("x"), Some(0.0));
    assert_eq!(tween.total_progress(), 0.0);

    tween.update(0.0, 1000.0);
    assert_eq!(tween.state(), TweenState::PendingRemove);
    assert_eq!(tween.restart(), ManagerAction::Reset);

    tween.reset_to_start(DEFAULT_SEEK_STEP);
    assert_eq!(tween.state(), TweenState::Playing);
    assert_eq!(s.get("x"), Some(0.0));
}

#[test]
fn test_replay_waits_for_delay_again() {
    let s = sprite(0.0);
    let mut tween = Tween::builder()
        .target(&s)
        .property("x", 100.0)
        .delay(500.0)
        .duration(100.0)
        .build()
        .unwrap();
    let log = record(&mut tween, &[TweenEventKind::Start]);
    tween.init();
    let _ = tween.play();

    assert!(tween.update(0.0, 600.0));
    assert_eq!(tween.state(), TweenState::PendingRemove);
    assert_eq!(count(&log, "start"), 1);

    assert_eq!(tween.play(), ManagerAction::MakeActive);
    assert!(!tween.has_started());
    assert_eq!(tween.start_delay(), 500.0);

    tween.update(0.0, 16.0);
    assert_eq!(count(&log, "start"), 1);
    tween.update(0.0, 500.0);
    assert!(tween.has_started());
    assert_eq!(count(&log, "start"), 2);
}

#[test]
fn test_complete_with_delay() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));

    tween.complete(200.0);
    assert_eq!(tween.state(), TweenState::CompleteDelay);
    assert!(!tween.update(0.0, 100.0));
    assert!(tween.update(0.0, 100.0));
}

#[test]
fn test_update_to_retargets_matching_units() {
    let s = sprite(0.0);
    let mut tween = playing(
        Tween::builder()
            .target(&s)
            .property("x", 100.0)
            .property("y", 100.0),
    );
    tween.update(0.0, 500.0);

    tween.update_to("x", 300.0, false);
    tween.update(0.0, 500.0);
    assert_eq!(s.get("x"), Some(300.0));
    assert_eq!(s.get("y"), Some(100.0));
}

#[test]
fn test_targets_and_values() {
    let a = sprite(0.0);
    let b = sprite(0.0);
    let other = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&a).target(&b).property("x", 100.0));

    assert!(tween.has_target(&TargetRef::new(&a)));
    assert!(!tween.has_target(&TargetRef::new(&other)));

    tween.update(0.0, 250.0);
    assert_eq!(tween.get_value(1), Some(25.0));
    assert_eq!(tween.get_value(2), None);
}

#[test]
fn test_released_target_completes_early() {
    let a = sprite(0.0);
    let b = sprite(0.0);
    let mut tween = playing(
        Tween::builder()
            .target(&a)
            .target(&b)
            .property("x", Prop::new(100.0).duration(100.0)),
    );
    tween.update(0.0, 50.0);

    tween.release_target(&TargetRef::new(&b));
    drop(a);
    assert!(tween.update(0.0, 10.0));
    assert_eq!(b.get("x"), Some(50.0));
}

#[test]
fn test_destroy() {
    let s = sprite(0.0);
    let mut tween = playing(Tween::builder().target(&s).property("x", 100.0));
    tween.destroy();

    assert_eq!(tween.state(), TweenState::Destroyed);
    assert!(tween.data().is_empty());
    assert!(tween.targets().is_empty());
    assert!(tween.update(0.0, 16.0));
}
