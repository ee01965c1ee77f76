//! # Timeline 模块
//!
//! 把多个 Tween 按偏移排成一条时间线。
//!
//! ## 偏移
//!
//! - `Sequential`: 紧接在上一个 Tween 结束之后
//! - `Absolute(t)`: 从时间线起点算起的绝对时间
//! - `Relative(d)`: 相对上一个 Tween 的结束时间（`"+=500"`、`"-=200"`），不早于 0
//!
//! 子 Tween 的 `calculated_offset` 在 `calc_duration` 中求得，播放时子 Tween
//! 先在 `OffsetDelay` 状态等待自己的偏移。时间缩放只在时间线这一层生效一次。

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::debug;

use crate::error::{TweenError, TweenResult};
use crate::event::{EventDispatcher, TimelineEvent, TimelineEventKind};
use crate::manager::ManagerAction;
use crate::state::{CountdownNotice, TweenState, resolve_count};
use crate::target::TargetRef;
use crate::tween::Tween;

static NEXT_TIMELINE_ID: AtomicU64 = AtomicU64::new(1);

/// Timeline 唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TimelineId(u64);

impl TimelineId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn next() -> Self {
        Self(NEXT_TIMELINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timeline#{}", self.0)
    }
}

/// Tween 在 Timeline 中的起始偏移
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimelineOffset {
    /// 接在上一个 Tween 之后
    #[default]
    Sequential,
    /// 绝对时间
    Absolute(f64),
    /// 相对上一个 Tween 的结束时间
    Relative(f64),
}

impl TimelineOffset {
    /// 解析偏移表达式：`"500"`、`"+=500"`、`"-=200"`
    pub fn parse(expr: &str) -> TweenResult<Self> {
        let trimmed = expr.trim();
        let invalid = || TweenError::InvalidOffset {
            expr: expr.to_string(),
        };

        let (sign, rest) = if let Some(rest) = trimmed.strip_prefix("+=") {
            (Some(1.0), rest)
        } else if let Some(rest) = trimmed.strip_prefix("-=") {
            (Some(-1.0), rest)
        } else {
            (None, trimmed)
        };

        let n: f64 = rest.trim().parse().map_err(|_| invalid())?;
        if !n.is_finite() {
            return Err(invalid());
        }

        Ok(match sign {
            Some(sign) => TimelineOffset::Relative(sign * n),
            None => TimelineOffset::Absolute(n),
        })
    }

    /// 根据上一个 Tween 的结束时间求实际偏移
    pub fn resolve(self, previous_end: f64) -> f64 {
        match self {
            TimelineOffset::Sequential => previous_end,
            TimelineOffset::Absolute(t) => t.max(0.0),
            TimelineOffset::Relative(d) => (previous_end + d).max(0.0),
        }
    }
}

/// 时间线
pub struct Timeline {
    id: TimelineId,
    tweens: Vec<Tween>,
    state: TweenState,

    paused: bool,
    use_frames: bool,
    time_scale: f64,
    global_time_scale: f64,

    elapsed: f64,
    progress: f64,
    total_elapsed: f64,
    total_progress: f64,
    duration: f64,
    total_duration: f64,

    loop_count: i64,
    loop_counter: u64,
    loop_delay: f64,
    complete_delay: f64,
    countdown: f64,
    persist: bool,

    dispatcher: EventDispatcher<TimelineEvent>,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("tweens", &self.tweens.len())
            .field("total_progress", &self.total_progress)
            .finish()
    }
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            id: TimelineId::next(),
            tweens: Vec::new(),
            state: TweenState::Created,
            paused: false,
            use_frames: false,
            time_scale: 1.0,
            global_time_scale: 1.0,
            elapsed: 0.0,
            progress: 0.0,
            total_elapsed: 0.0,
            total_progress: 0.0,
            duration: 0.0,
            total_duration: 0.0,
            loop_count: 0,
            loop_counter: 0,
            loop_delay: 0.0,
            complete_delay: 0.0,
            countdown: 0.0,
            persist: false,
            dispatcher: EventDispatcher::new(),
        }
    }

    pub fn with_loop(mut self, count: i64) -> Self {
        self.loop_count = count;
        self
    }

    pub fn with_loop_delay(mut self, delay: f64) -> Self {
        self.loop_delay = delay;
        self
    }

    pub fn with_complete_delay(mut self, delay: f64) -> Self {
        self.complete_delay = delay;
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn with_use_frames(mut self, use_frames: bool) -> Self {
        self.use_frames = use_frames;
        self
    }

    pub fn with_time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale;
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// 追加子 Tween
    pub fn add(&mut self, mut tween: Tween) -> &mut Self {
        tween.attach_to_timeline();
        self.tweens.push(tween);
        self
    }

    pub fn on(&mut self, kind: TimelineEventKind, listener: impl FnMut(&TimelineEvent) + 'static) {
        self.dispatcher.on(kind, listener);
    }

    pub fn set_callback(
        &mut self,
        kind: TimelineEventKind,
        callback: impl FnMut(&TimelineEvent) + 'static,
    ) {
        self.dispatcher.set_callback(kind, callback);
    }

    fn dispatch(&mut self, kind: TimelineEventKind) {
        let event = TimelineEvent {
            timeline: self.id,
            kind,
        };
        self.dispatcher.dispatch(&event);
    }

    // ========== 生命周期 ==========

    /// 初始化子 Tween 并计算时长，暂停时返回 false
    pub fn init(&mut self) -> bool {
        self.calc_duration();
        self.zero_progress();

        if self.paused {
            self.state = TweenState::PendingAdd;
            return false;
        }
        self.state = TweenState::Init;
        true
    }

    /// 求每个子 Tween 的偏移和整条时间线的时长
    pub fn calc_duration(&mut self) {
        let mut previous_end = 0.0;
        let mut duration: f64 = 0.0;

        for tween in &mut self.tweens {
            tween.init();
            let offset = tween.offset().resolve(previous_end);
            tween.set_calculated_offset(offset);

            previous_end = offset + tween.total_duration();
            duration = duration.max(previous_end);
        }

        self.duration = duration;
        self.loop_counter = resolve_count(self.loop_count);
        let loops = self.loop_counter as f64;
        self.total_duration =
            self.duration * (loops + 1.0) + self.loop_delay * loops + self.complete_delay;
    }

    fn zero_progress(&mut self) {
        self.elapsed = 0.0;
        self.progress = 0.0;
        self.total_elapsed = 0.0;
        self.total_progress = 0.0;
    }

    fn reset_tweens(&mut self, from_loop: bool) {
        for tween in &mut self.tweens {
            tween.play_in_timeline(from_loop);
        }
    }

    /// 开始播放
    pub fn play(&mut self) -> ManagerAction {
        if self.paused {
            self.paused = false;
            return ManagerAction::MakeActive;
        }

        match self.state {
            TweenState::Playing | TweenState::PendingAdd | TweenState::Destroyed => {
                ManagerAction::None
            }
            TweenState::PendingRemove | TweenState::Removed => {
                self.calc_duration();
                self.start();
                ManagerAction::MakeActive
            }
            TweenState::Created => {
                self.calc_duration();
                self.start();
                ManagerAction::None
            }
            _ => {
                self.start();
                ManagerAction::None
            }
        }
    }

    fn start(&mut self) {
        self.zero_progress();
        self.loop_counter = resolve_count(self.loop_count);
        self.reset_tweens(false);
        self.state = TweenState::Playing;
        debug!(timeline = %self.id, tweens = self.tweens.len(), "开始播放");
        self.dispatch(TimelineEventKind::Start);
    }

    /// 推进一帧，返回 true 表示请求管理器移除
    pub fn update(&mut self, time: f64, delta: f64) -> bool {
        if self.state.is_pending_remove() {
            return true;
        }
        if self.paused {
            return false;
        }

        let mut delta = if self.use_frames {
            self.global_time_scale
        } else {
            delta * self.global_time_scale
        };
        delta *= self.time_scale;

        self.elapsed += delta;
        self.progress = (self.elapsed / self.duration).min(1.0);
        self.total_elapsed += delta;
        self.total_progress = (self.total_elapsed / self.total_duration).min(1.0);

        if let Some(transition) = self.state.countdown_transition() {
            self.countdown -= delta;
            if self.countdown > 0.0 {
                return false;
            }

            delta = -self.countdown;
            self.countdown = 0.0;
            self.state = transition.next;

            match transition.notice {
                Some(CountdownNotice::Loop) => self.dispatch(TimelineEventKind::Loop),
                Some(CountdownNotice::Complete) => self.dispatch(TimelineEventKind::Complete),
                None => {}
            }
        }

        if self.state == TweenState::Playing {
            let mut running = 0;
            for tween in &mut self.tweens {
                if !tween.update(time, delta) {
                    running += 1;
                }
            }

            self.dispatch(TimelineEventKind::Update);

            if running == 0 {
                self.next_state();
            }
        }

        self.state == TweenState::PendingRemove
    }

    fn next_state(&mut self) {
        if self.loop_counter > 0 {
            self.elapsed = 0.0;
            self.progress = 0.0;
            self.loop_counter -= 1;
            self.reset_tweens(true);

            if self.loop_delay > 0.0 {
                self.countdown = self.loop_delay;
                self.state = TweenState::LoopDelay;
            } else {
                self.state = TweenState::Playing;
                self.dispatch(TimelineEventKind::Loop);
            }
            debug!(timeline = %self.id, remaining = self.loop_counter, "开始新一轮循环");
        } else if self.complete_delay > 0.0 {
            self.countdown = self.complete_delay;
            self.state = TweenState::CompleteDelay;
        } else {
            self.state = TweenState::PendingRemove;
            debug!(timeline = %self.id, "完成");
            self.dispatch(TimelineEventKind::Complete);
        }
    }

    pub fn pause(&mut self) {
        if !matches!(
            self.state,
            TweenState::PendingRemove | TweenState::Removed | TweenState::Destroyed
        ) {
            self.paused = true;
        }
    }

    pub fn resume(&mut self) -> ManagerAction {
        if !self.paused {
            return ManagerAction::None;
        }
        self.paused = false;
        if self.state == TweenState::PendingAdd {
            ManagerAction::MakeActive
        } else {
            ManagerAction::None
        }
    }

    /// 停止，下一次 update 时请求移除
    pub fn stop(&mut self) -> ManagerAction {
        let action = match self.state {
            TweenState::Removed | TweenState::Destroyed => return ManagerAction::None,
            TweenState::Created | TweenState::Init | TweenState::PendingAdd => {
                ManagerAction::Remove
            }
            _ => ManagerAction::None,
        };
        self.state = TweenState::PendingRemove;
        debug!(timeline = %self.id, "停止");
        action
    }

    pub fn destroy(&mut self) {
        for tween in &mut self.tweens {
            tween.destroy();
        }
        self.tweens.clear();
        self.dispatcher.clear();
        self.state = TweenState::Destroyed;
    }

    // ========== 查询方法 ==========

    pub fn id(&self) -> TimelineId {
        self.id
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TweenState) {
        self.state = state;
    }

    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    pub fn tween_mut(&mut self, index: usize) -> Option<&mut Tween> {
        self.tweens.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.tweens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tweens.is_empty()
    }

    pub fn has_target(&self, target: &TargetRef) -> bool {
        self.tweens.iter().any(|tween| tween.has_target(target))
    }

    pub fn is_playing(&self) -> bool {
        !self.paused && self.state == TweenState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn total_progress(&self) -> f64 {
        self.total_progress
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    pub(crate) fn set_global_time_scale(&mut self, scale: f64) {
        self.global_time_scale = scale;
    }

    pub fn persist(&self) -> bool {
        self.persist
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::target::PropertyBag;

    fn sprite() -> Rc<PropertyBag> {
        Rc::new(PropertyBag::new().with("x", 0.0).with("y", 0.0))
    }

    fn tween(target: &Rc<PropertyBag>, key: &str, duration: f64, offset: TimelineOffset) -> Tween {
        Tween::builder()
            .target(target)
            .property(key, 100.0)
            .duration(duration)
            .offset(offset)
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(TimelineOffset::parse("500"), Ok(TimelineOffset::Absolute(500.0)));
        assert_eq!(TimelineOffset::parse("+=250"), Ok(TimelineOffset::Relative(250.0)));
        assert_eq!(TimelineOffset::parse(" -= 100 "), Ok(TimelineOffset::Relative(-100.0)));
        assert!(matches!(
            TimelineOffset::parse("*=2"),
            Err(TweenError::InvalidOffset { .. })
        ));
        assert!(TimelineOffset::parse("").is_err());
    }

    #[test]
    fn test_calculated_offsets() {
        let s = sprite();
        let mut timeline = Timeline::new();
        timeline
            .add(tween(&s, "x", 500.0, TimelineOffset::Sequential))
            .add(tween(&s, "y", 300.0, TimelineOffset::Sequential))
            .add(tween(&s, "x", 200.0, TimelineOffset::Relative(-400.0)))
            .add(tween(&s, "y", 100.0, TimelineOffset::Absolute(50.0)));
        timeline.init();

        let offsets: Vec<f64> = timeline.tweens().iter().map(Tween::calculated_offset).collect();
        assert_eq!(offsets, vec![0.0, 500.0, 400.0, 50.0]);
        assert_eq!(timeline.duration(), 800.0);
        assert!(timeline.tweens().iter().all(Tween::parent_is_timeline));
    }

    #[test]
    fn test_relative_offset_clamped_at_zero() {
        assert_eq!(TimelineOffset::Relative(-300.0).resolve(100.0), 0.0);
        assert_eq!(TimelineOffset::Absolute(-5.0).resolve(100.0), 0.0);
    }

    #[test]
    fn test_children_play_in_sequence() {
        let s = sprite();
        let mut timeline = Timeline::new();
        timeline
            .add(tween(&s, "x", 100.0, TimelineOffset::Sequential))
            .add(tween(&s, "y", 100.0, TimelineOffset::Sequential));
        assert!(timeline.init());
        let _ = timeline.play();

        assert_eq!(timeline.tweens()[1].state(), TweenState::OffsetDelay);

        assert!(!timeline.update(0.0, 50.0));
        assert_eq!(s.get("x"), Some(50.0));
        assert_eq!(s.get("y"), Some(0.0));

        assert!(!timeline.update(0.0, 100.0));
        assert_eq!(s.get("x"), Some(100.0));
        assert_eq!(s.get("y"), Some(50.0));

        assert!(timeline.update(0.0, 50.0));
        assert_eq!(s.get("y"), Some(100.0));
        assert_eq!(timeline.state(), TweenState::PendingRemove);
    }

    #[test]
    fn test_timeline_events_and_loop() {
        let s = sprite();
        let mut timeline = Timeline::new().with_loop(1);
        timeline.add(tween(&s, "x", 100.0, TimelineOffset::Sequential));

        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            TimelineEventKind::Start,
            TimelineEventKind::Loop,
            TimelineEventKind::Complete,
        ] {
            let sink = log.clone();
            timeline.on(kind, move |event| sink.borrow_mut().push(event.kind));
        }

        timeline.init();
        let _ = timeline.play();
        let mut ticks = 0;
        while !timeline.update(0.0, 25.0) {
            ticks += 1;
        }

        assert_eq!(ticks, 7);
        assert_eq!(
            *log.borrow(),
            vec![
                TimelineEventKind::Start,
                TimelineEventKind::Loop,
                TimelineEventKind::Complete
            ]
        );
    }

    #[test]
    fn test_time_scale_applied_once() {
        let s = sprite();
        let mut timeline = Timeline::new().with_time_scale(2.0);
        timeline.add(tween(&s, "x", 100.0, TimelineOffset::Sequential));
        timeline.init();
        let _ = timeline.play();

        timeline.update(0.0, 25.0);
        assert_eq!(s.get("x"), Some(50.0));
    }

    #[test]
    fn test_pause_stop_destroy() {
        let s = sprite();
        let mut timeline = Timeline::new();
        timeline.add(tween(&s, "x", 100.0, TimelineOffset::Sequential));
        timeline.init();
        let _ = timeline.play();

        timeline.pause();
        assert!(!timeline.update(0.0, 50.0));
        assert_eq!(s.get("x"), Some(0.0));
        let _ = timeline.resume();

        assert!(timeline.has_target(&TargetRef::new(&s)));
        assert_eq!(timeline.stop(), ManagerAction::None);
        assert!(timeline.update(0.0, 50.0));

        timeline.destroy();
        assert!(timeline.is_empty());
        assert_eq!(timeline.state(), TweenState::Destroyed);
    }
}
