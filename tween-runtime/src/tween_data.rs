//! # TweenData 模块
//!
//! 单个 (目标, 属性) 的插值状态机。
//!
//! ## 状态转移
//!
//! ```text
//! Delay ──► PendingRender ──► PlayingForward ──┬─► HoldDelay ──┐
//!                                ▲             │               ▼
//!                                │             └──────► (到达终点)
//!                          RepeatDelay ◄──── repeat ◄────┤
//!                                                 yoyo ──► PlayingBackward ──► (回到起点)
//!                                                                      其余 ──► Complete
//! ```
//!
//! 每段播放结束时多出的时间（overflow）会带入下一段，
//! 跨段时既不丢时间也不重复计时。

use std::rc::Rc;

use tracing::{debug, trace};

use crate::easing::Ease;
use crate::event::TweenEventKind;
use crate::state::resolve_count;
use crate::target::{Animatable, TargetRef};
use crate::value::{GenContext, NumberOp, ValueGenerators, ValueOp};

/// duration 的下限，保证计算进度时不会除以 0
pub const MIN_DURATION: f64 = 0.001;

/// TweenData 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenDataState {
    /// 等待首次渲染：求起止值并写入起始值
    PendingRender,
    /// 起始延迟
    Delay,
    /// 正向播放
    PlayingForward,
    /// 反向播放（yoyo）
    PlayingBackward,
    /// 到达终点后的停留
    HoldDelay,
    /// 两次重复之间的等待
    RepeatDelay,
    /// 已完成
    Complete,
}

/// 时间参数生成器组
#[derive(Debug, Clone)]
pub struct TimingOps {
    pub delay: NumberOp,
    pub duration: NumberOp,
    pub hold: NumberOp,
    pub repeat: NumberOp,
    pub repeat_delay: NumberOp,
}

impl Default for TimingOps {
    fn default() -> Self {
        Self {
            delay: NumberOp::Fixed(0.0),
            duration: NumberOp::Fixed(1000.0),
            hold: NumberOp::Fixed(0.0),
            repeat: NumberOp::Fixed(0.0),
            repeat_delay: NumberOp::Fixed(0.0),
        }
    }
}

/// 已合并默认值的属性配置
#[derive(Debug, Clone)]
pub struct PropertySpec {
    pub value: ValueOp,
    pub timing: TimingOps,
    pub ease: Ease,
    pub yoyo: bool,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl PropertySpec {
    /// 使用默认时间参数创建
    pub fn new(value: impl Into<ValueOp>) -> Self {
        Self {
            value: value.into(),
            timing: TimingOps::default(),
            ease: Ease::default(),
            yoyo: false,
            flip_x: false,
            flip_y: false,
        }
    }

    pub fn with_delay(mut self, delay: impl Into<NumberOp>) -> Self {
        self.timing.delay = delay.into();
        self
    }

    pub fn with_duration(mut self, duration: impl Into<NumberOp>) -> Self {
        self.timing.duration = duration.into();
        self
    }

    pub fn with_hold(mut self, hold: impl Into<NumberOp>) -> Self {
        self.timing.hold = hold.into();
        self
    }

    /// 设置重复次数，-1 表示无限
    pub fn with_repeat(mut self, repeat: i64) -> Self {
        self.timing.repeat = NumberOp::Fixed(repeat as f64);
        self
    }

    pub fn with_repeat_delay(mut self, repeat_delay: impl Into<NumberOp>) -> Self {
        self.timing.repeat_delay = repeat_delay.into();
        self
    }

    pub fn with_ease(mut self, ease: impl Into<Ease>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn with_yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }
}

/// 事件回调：`(事件种类, 触发事件的 TweenData)`
pub type UnitEmit<'a> = dyn FnMut(TweenEventKind, &TweenData) + 'a;

/// 单属性插值单元
#[derive(Debug)]
pub struct TweenData {
    target: TargetRef,
    key: Rc<str>,
    index: usize,
    total_targets: usize,
    ease: Ease,
    timing: TimingOps,
    values: ValueGenerators,

    start: f64,
    end: f64,
    current: f64,
    previous: f64,

    delay: f64,
    duration: f64,
    hold: f64,
    repeat: i64,
    repeat_delay: f64,
    repeat_counter: u64,

    elapsed: f64,
    progress: f64,
    t1: f64,
    t2: f64,
    total_duration: f64,

    yoyo: bool,
    flip_x: bool,
    flip_y: bool,
    state: TweenDataState,
    /// 是否已经求过起止值
    rendered: bool,
}

impl TweenData {
    /// 创建单元（尚未初始化，需调用 `init`）
    pub fn new(
        target: TargetRef,
        key: impl Into<Rc<str>>,
        index: usize,
        total_targets: usize,
        spec: PropertySpec,
    ) -> Self {
        Self {
            target,
            key: key.into(),
            index,
            total_targets,
            ease: spec.ease,
            timing: spec.timing,
            values: spec.value.into_generators(),
            start: 0.0,
            end: 0.0,
            current: 0.0,
            previous: 0.0,
            delay: 0.0,
            duration: MIN_DURATION,
            hold: 0.0,
            repeat: 0,
            repeat_delay: 0.0,
            repeat_counter: 0,
            elapsed: 0.0,
            progress: 0.0,
            t1: 0.0,
            t2: 0.0,
            total_duration: 0.0,
            yoyo: spec.yoyo,
            flip_x: spec.flip_x,
            flip_y: spec.flip_y,
            state: TweenDataState::PendingRender,
            rendered: false,
        }
    }

    fn context<'a>(&'a self, target: &'a dyn Animatable, value: f64) -> GenContext<'a> {
        GenContext {
            target,
            key: &self.key,
            value,
            index: self.index,
            total_targets: self.total_targets,
        }
    }

    /// 重新求 delay/duration/hold/repeat/repeatDelay
    ///
    /// 目标已失效时保留上一次的值。
    pub fn resolve_timing(&mut self) {
        let Some(target) = self.target.upgrade() else {
            return;
        };
        let ctx = self.context(&*target, 0.0);
        let delay = self.timing.delay.resolve(&ctx);
        let duration = self.timing.duration.resolve(&ctx);
        let hold = self.timing.hold.resolve(&ctx);
        let repeat = self.timing.repeat.resolve(&ctx);
        let repeat_delay = self.timing.repeat_delay.resolve(&ctx);

        self.delay = delay;
        self.duration = duration.max(MIN_DURATION);
        self.hold = hold;
        self.repeat = repeat as i64;
        self.repeat_delay = repeat_delay;
    }

    /// 初始化：求时间参数并进入首个状态
    pub fn init(&mut self) {
        self.resolve_timing();
        self.reset(false);
    }

    /// 重置播放进度
    ///
    /// `from_loop` 为 true 时表示 Tween 开始新一轮循环：
    /// 直接用生成器重新求起止值并进入正向播放，
    /// 否则回到 `PendingRender` 等待下一次推进时再读取目标的当前值。
    pub fn reset(&mut self, from_loop: bool) {
        self.progress = 0.0;
        self.elapsed = 0.0;
        self.repeat_counter = resolve_count(self.repeat);

        if from_loop {
            if let Some(target) = self.target.upgrade() {
                let start = (self.values.start)(&self.context(&*target, self.start));
                let end = (self.values.end)(&self.context(&*target, start));
                self.start = start;
                self.end = end;
            }
            self.current = self.start;
            self.state = TweenDataState::PlayingForward;
        } else {
            self.state = TweenDataState::PendingRender;
        }

        if self.delay > 0.0 {
            self.elapsed = self.delay;
            self.state = TweenDataState::Delay;
        }

        self.apply_active_value();
    }

    /// seek 前的重置：重新求时间参数，已渲染过的单元回到起始值
    pub fn reset_for_seek(&mut self) {
        self.progress = 0.0;
        self.elapsed = 0.0;
        self.resolve_timing();
        self.repeat_counter = resolve_count(self.repeat);

        if self.rendered {
            self.current = self.start;
            self.state = TweenDataState::PlayingForward;
            if let Some(target) = self.target.upgrade() {
                target.set_property(&self.key, self.current);
            }
        } else {
            self.state = TweenDataState::PendingRender;
        }

        if self.delay > 0.0 {
            self.elapsed = self.delay;
            self.state = TweenDataState::Delay;
        }

        self.apply_active_value();
    }

    fn apply_active_value(&self) {
        let Some(active) = &self.values.active else {
            return;
        };
        if let Some(target) = self.target.upgrade() {
            let value = active(&self.context(&*target, self.start));
            target.set_property(&self.key, value);
        }
    }

    /// 计算 t1/t2/totalDuration，返回 totalDuration
    pub fn calc_duration(&mut self) -> f64 {
        self.t1 = self.duration + self.hold;
        if self.yoyo {
            self.t1 += self.duration;
        }
        self.t2 = self.t1 + self.repeat_delay;
        self.total_duration = self.delay + self.t1 + self.t2 * resolve_count(self.repeat) as f64;
        self.total_duration
    }

    /// 推进 `delta` 时间
    ///
    /// # 返回
    /// - `true`: 仍在运行
    /// - `false`: 已完成
    pub fn advance(&mut self, delta: f64, emit: &mut UnitEmit<'_>) -> bool {
        if self.state == TweenDataState::Complete {
            return false;
        }
        // 任何状态下目标失效都立即完成，包括各种等待状态
        if !self.target.is_alive() {
            debug!(key = %self.key, index = self.index, state = ?self.state, "目标已释放，单元完成");
            self.state = TweenDataState::Complete;
            return false;
        }

        match self.state {
            TweenDataState::PlayingForward | TweenDataState::PlayingBackward => {
                self.step_playing(delta, emit);
            }
            TweenDataState::Delay => {
                self.elapsed -= delta;
                if self.elapsed <= 0.0 {
                    // 超出的时间算作播放时间
                    self.elapsed = self.elapsed.abs();
                    self.state = TweenDataState::PendingRender;
                    return self.advance(0.0, emit);
                }
            }
            TweenDataState::PendingRender => {
                if self.render_start() {
                    self.state = TweenDataState::PlayingForward;
                    self.step_playing(delta, emit);
                } else {
                    self.state = TweenDataState::Complete;
                }
            }
            TweenDataState::HoldDelay => {
                self.elapsed -= delta;
                if self.elapsed <= 0.0 {
                    let diff = self.elapsed.abs();
                    self.state = match self.target.upgrade() {
                        Some(target) => self.state_from_end(&*target, diff, emit),
                        None => TweenDataState::Complete,
                    };
                }
            }
            TweenDataState::RepeatDelay => {
                self.elapsed -= delta;
                if self.elapsed <= 0.0 {
                    self.elapsed = self.elapsed.abs();
                    self.state = TweenDataState::PlayingForward;
                    emit(TweenEventKind::Repeat, self);
                }
            }
            TweenDataState::Complete => {}
        }

        self.state != TweenDataState::Complete
    }

    /// 求起止值并写入起始值，目标已失效时返回 false
    fn render_start(&mut self) -> bool {
        let Some(target) = self.target.upgrade() else {
            debug!(key = %self.key, index = self.index, "目标已释放，跳过渲染");
            return false;
        };
        let current = target.get_property(&self.key).unwrap_or(self.current);
        let start = (self.values.start)(&self.context(&*target, current));
        let end = (self.values.end)(&self.context(&*target, start));

        self.start = start;
        self.end = end;
        self.current = start;
        self.rendered = true;
        target.set_property(&self.key, start);
        true
    }

    fn step_playing(&mut self, delta: f64, emit: &mut UnitEmit<'_>) {
        let Some(target) = self.target.upgrade() else {
            self.state = TweenDataState::Complete;
            return;
        };

        let mut elapsed = self.elapsed + delta;
        let mut diff = 0.0;
        if elapsed > self.duration {
            diff = elapsed - self.duration;
            elapsed = self.duration;
        }

        let forward = self.state == TweenDataState::PlayingForward;
        let progress = elapsed / self.duration;

        self.elapsed = elapsed;
        self.progress = progress;
        self.previous = self.current;

        if progress >= 1.0 {
            if forward {
                self.current = self.end;
                target.set_property(&self.key, self.end);

                if self.hold > 0.0 {
                    self.elapsed = self.hold - diff;
                    self.state = TweenDataState::HoldDelay;
                } else {
                    self.state = self.state_from_end(&*target, diff, emit);
                }
            } else {
                self.current = self.start;
                target.set_property(&self.key, self.start);
                self.state = self.state_from_start(&*target, diff, emit);
            }
        } else {
            let v = if forward {
                self.ease.apply(progress)
            } else {
                self.ease.apply(1.0 - progress)
            };
            self.current = self.start + (self.end - self.start) * v;
            target.set_property(&self.key, self.current);
        }

        emit(TweenEventKind::Update, self);
    }

    /// 正向播放结束后的转移
    fn state_from_end(
        &mut self,
        target: &dyn Animatable,
        diff: f64,
        emit: &mut UnitEmit<'_>,
    ) -> TweenDataState {
        if self.yoyo {
            self.elapsed = diff;
            self.progress = diff / self.duration;
            self.toggle_flips(target);
            emit(TweenEventKind::Yoyo, self);

            // 每次反向都允许生成新的起始值
            self.start = (self.values.start)(&self.context(target, self.start));
            trace!(key = %self.key, index = self.index, "yoyo");
            return TweenDataState::PlayingBackward;
        }

        if self.repeat_counter > 0 {
            self.repeat_counter -= 1;
            self.elapsed = diff;
            self.progress = diff / self.duration;
            self.toggle_flips(target);

            let start = (self.values.start)(&self.context(target, self.start));
            let end = (self.values.end)(&self.context(target, start));
            self.start = start;
            self.end = end;

            return self.enter_repeat(target, diff, emit);
        }

        TweenDataState::Complete
    }

    /// 反向播放结束后的转移
    fn state_from_start(
        &mut self,
        target: &dyn Animatable,
        diff: f64,
        emit: &mut UnitEmit<'_>,
    ) -> TweenDataState {
        if self.repeat_counter > 0 {
            self.repeat_counter -= 1;
            self.elapsed = diff;
            self.progress = diff / self.duration;
            self.toggle_flips(target);

            self.end = (self.values.end)(&self.context(target, self.start));

            return self.enter_repeat(target, diff, emit);
        }

        TweenDataState::Complete
    }

    fn enter_repeat(
        &mut self,
        target: &dyn Animatable,
        diff: f64,
        emit: &mut UnitEmit<'_>,
    ) -> TweenDataState {
        if self.repeat_delay > 0.0 {
            self.elapsed = self.repeat_delay - diff;
            self.current = self.start;
            target.set_property(&self.key, self.current);
            TweenDataState::RepeatDelay
        } else {
            emit(TweenEventKind::Repeat, self);
            TweenDataState::PlayingForward
        }
    }

    fn toggle_flips(&self, target: &dyn Animatable) {
        if self.flip_x {
            target.toggle_flip_x();
        }
        if self.flip_y {
            target.toggle_flip_y();
        }
    }

    /// 运行中改写结束值，可选把起始值设为当前值
    pub fn retarget(&mut self, end: f64, start_to_current: bool) {
        self.end = end;
        if start_to_current {
            self.start = self.current;
        }
    }

    /// 断开与目标的关联，下一次推进时单元直接完成
    pub fn clear_target(&mut self) {
        self.target = TargetRef::detached();
    }

    // ========== 查询方法 ==========

    pub fn target(&self) -> &TargetRef {
        &self.target
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn key_rc(&self) -> Rc<str> {
        self.key.clone()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> TweenDataState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != TweenDataState::Complete
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn hold(&self) -> f64 {
        self.hold
    }

    pub fn repeat(&self) -> i64 {
        self.repeat
    }

    pub fn repeat_delay(&self) -> f64 {
        self.repeat_delay
    }

    pub fn repeat_counter(&self) -> u64 {
        self.repeat_counter
    }

    pub fn t1(&self) -> f64 {
        self.t1
    }

    pub fn t2(&self) -> f64 {
        self.t2
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn yoyo(&self) -> bool {
        self.yoyo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UNBOUNDED_COUNT;
    use crate::target::PropertyBag;

    fn bag(x: f64) -> Rc<PropertyBag> {
        Rc::new(PropertyBag::new().with("x", x))
    }

    fn unit(target: &Rc<PropertyBag>, spec: PropertySpec) -> TweenData {
        let mut data = TweenData::new(TargetRef::new(target), "x", 0, 1, spec);
        data.init();
        data.calc_duration();
        data
    }

    /// 记录事件种类
    fn recorder() -> (
        Rc<std::cell::RefCell<Vec<TweenEventKind>>>,
        impl FnMut(TweenEventKind, &TweenData),
    ) {
        let log = Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = log.clone();
        (log, move |kind, _: &TweenData| sink.borrow_mut().push(kind))
    }

    #[test]
    fn test_linear_end_to_end() {
        let target = bag(0.0);
        let mut data = unit(&target, PropertySpec::new(ValueOp::FromTo { from: 0.0, to: 100.0 }));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        assert!(data.advance(500.0, &mut emit));
        assert_eq!(data.current(), 50.0);
        assert_eq!(data.state(), TweenDataState::PlayingForward);
        assert_eq!(target.get("x"), Some(50.0));

        assert!(!data.advance(500.0, &mut emit));
        assert_eq!(data.current(), 100.0);
        assert_eq!(data.state(), TweenDataState::Complete);

        // 完成后不再变化
        assert!(!data.advance(500.0, &mut emit));
        assert_eq!(data.current(), 100.0);
        assert_eq!(target.get("x"), Some(100.0));
    }

    #[test]
    fn test_start_read_from_target() {
        let target = bag(20.0);
        let mut data = unit(&target, PropertySpec::new(ValueOp::Add(10.0)));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.advance(0.0, &mut emit);
        assert_eq!(data.start(), 20.0);
        assert_eq!(data.end(), 30.0);
    }

    #[test]
    fn test_repeat_delay_scenario() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0)
            .with_repeat(1)
            .with_repeat_delay(200.0);
        let mut data = unit(&target, spec);
        let (log, mut emit) = recorder();

        data.advance(1000.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::RepeatDelay);
        assert_eq!(data.elapsed(), 200.0);
        assert_eq!(data.repeat_counter(), 0);
        // 等待期间目标回到起始值
        assert_eq!(target.get("x"), Some(0.0));

        data.advance(200.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::PlayingForward);
        assert!(data.elapsed().abs() < 1e-9);

        let repeats = log
            .borrow()
            .iter()
            .filter(|k| **k == TweenEventKind::Repeat)
            .count();
        assert_eq!(repeats, 1);
    }

    #[test]
    fn test_duration_composition() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0)
            .with_duration(1000.0)
            .with_hold(200.0)
            .with_yoyo(true)
            .with_repeat(2)
            .with_repeat_delay(100.0)
            .with_delay(50.0);
        let data = unit(&target, spec);

        assert_eq!(data.t1(), 2200.0);
        assert_eq!(data.t2(), 2300.0);
        assert_eq!(data.total_duration(), 50.0 + 6800.0);
    }

    #[test]
    fn test_duration_floor() {
        let target = bag(0.0);
        let data = unit(&target, PropertySpec::new(1.0).with_duration(0.0));
        assert_eq!(data.duration(), MIN_DURATION);
    }

    #[test]
    fn test_delay_overflow_carries_into_playback() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0).with_delay(100.0);
        let mut data = unit(&target, spec);
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        assert_eq!(data.state(), TweenDataState::Delay);
        data.advance(60.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::Delay);

        // 越过 delay 40ms，多出的 60ms 直接计入播放
        data.advance(100.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::PlayingForward);
        assert!((data.elapsed() - 60.0).abs() < 1e-9);
        assert!((data.current() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_hold_then_yoyo() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0).with_hold(100.0).with_yoyo(true);
        let mut data = unit(&target, spec);
        let (log, mut emit) = recorder();

        data.advance(1000.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::HoldDelay);
        assert_eq!(data.elapsed(), 100.0);

        data.advance(150.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::PlayingBackward);
        assert_eq!(data.elapsed(), 50.0);
        assert!(log.borrow().contains(&TweenEventKind::Yoyo));

        data.advance(450.0, &mut emit);
        assert!((data.current() - 50.0).abs() < 1e-9);

        assert!(!data.advance(500.0, &mut emit));
        assert_eq!(data.current(), 0.0);
        assert_eq!(target.get("x"), Some(0.0));
    }

    #[test]
    fn test_yoyo_symmetry() {
        let target = bag(0.0);
        let spec = PropertySpec::new(ValueOp::FromTo { from: 0.0, to: 80.0 }).with_yoyo(true);
        let mut data = unit(&target, spec);
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.advance(250.0, &mut emit);
        let forward_at_quarter = data.current();

        data.advance(750.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::PlayingBackward);

        // 反向进度 0.75 对应正向进度 0.25
        data.advance(750.0, &mut emit);
        assert!((data.current() - forward_at_quarter).abs() < 1e-9);
    }

    #[test]
    fn test_yoyo_with_repeat_flips_target() {
        let target = bag(0.0);
        let spec = PropertySpec::new(10.0)
            .with_yoyo(true)
            .with_repeat(1)
            .with_flip(true, false);
        let mut data = unit(&target, spec);
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.advance(1000.0, &mut emit);
        assert!(target.flip_x());
        data.advance(1000.0, &mut emit);
        // 回到起点后开始重复，再次翻转
        assert!(!target.flip_x());
        assert_eq!(data.state(), TweenDataState::PlayingForward);
        assert_eq!(data.repeat_counter(), 0);
    }

    #[test]
    fn test_infinite_repeat_never_completes() {
        let target = bag(0.0);
        let spec = PropertySpec::new(1.0).with_duration(10.0).with_repeat(-1);
        let mut data = unit(&target, spec);
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        assert_eq!(data.repeat_counter(), UNBOUNDED_COUNT);
        for _ in 0..10_000 {
            assert!(data.advance(7.0, &mut emit));
        }
        assert!(data.repeat_counter() < UNBOUNDED_COUNT);
        assert_ne!(data.state(), TweenDataState::Complete);
    }

    #[test]
    fn test_target_dropped_completes() {
        let target = bag(0.0);
        let mut data = unit(&target, PropertySpec::new(100.0));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        assert!(data.advance(100.0, &mut emit));
        drop(target);
        assert!(!data.advance(100.0, &mut emit));
        assert_eq!(data.state(), TweenDataState::Complete);
    }

    #[test]
    fn test_target_dropped_during_delay() {
        let target = bag(0.0);
        let mut data = unit(&target, PropertySpec::new(100.0).with_delay(10_000.0));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        assert!(data.advance(16.0, &mut emit));
        assert_eq!(data.state(), TweenDataState::Delay);

        drop(target);
        assert!(!data.advance(16.0, &mut emit));
        assert_eq!(data.state(), TweenDataState::Complete);
    }

    #[test]
    fn test_target_dropped_during_repeat_delay() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0)
            .with_repeat(1)
            .with_repeat_delay(10_000.0);
        let mut data = unit(&target, spec);
        let (log, mut emit) = recorder();

        assert!(data.advance(1000.0, &mut emit));
        assert_eq!(data.state(), TweenDataState::RepeatDelay);

        drop(target);
        assert!(!data.advance(16.0, &mut emit));
        assert_eq!(data.state(), TweenDataState::Complete);
        assert!(!log.borrow().contains(&TweenEventKind::Repeat));
    }

    #[test]
    fn test_hold_then_repeat_delay() {
        let target = bag(0.0);
        let spec = PropertySpec::new(100.0)
            .with_hold(100.0)
            .with_repeat(1)
            .with_repeat_delay(200.0);
        let mut data = unit(&target, spec);
        let (log, mut emit) = recorder();

        data.advance(1000.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::HoldDelay);
        assert_eq!(target.get("x"), Some(100.0));

        // hold 超出 50ms，从 repeatDelay 中扣除
        data.advance(150.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::RepeatDelay);
        assert_eq!(data.elapsed(), 150.0);
        assert_eq!(data.repeat_counter(), 0);
        assert_eq!(data.current(), 0.0);
        assert_eq!(target.get("x"), Some(0.0));
        assert!(!log.borrow().contains(&TweenEventKind::Repeat));

        data.advance(150.0, &mut emit);
        assert_eq!(data.state(), TweenDataState::PlayingForward);
        assert_eq!(data.elapsed(), 0.0);
        assert!(log.borrow().contains(&TweenEventKind::Repeat));

        data.advance(500.0, &mut emit);
        assert_eq!(data.current(), 50.0);
    }

    #[test]
    fn test_flip_y_toggles_on_yoyo_and_repeat() {
        let target = bag(0.0);
        let spec = PropertySpec::new(10.0)
            .with_yoyo(true)
            .with_repeat(1)
            .with_flip(false, true);
        let mut data = unit(&target, spec);
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.advance(1000.0, &mut emit);
        assert!(target.flip_y());
        assert!(!target.flip_x());
        assert_eq!(data.state(), TweenDataState::PlayingBackward);

        data.advance(1000.0, &mut emit);
        assert!(!target.flip_y());
        assert_eq!(data.state(), TweenDataState::PlayingForward);

        data.advance(1000.0, &mut emit);
        assert!(target.flip_y());
    }

    #[test]
    fn test_cleared_target_completes_before_render() {
        let target = bag(0.0);
        let mut data = unit(&target, PropertySpec::new(100.0));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.clear_target();
        assert!(!data.advance(16.0, &mut emit));
        assert_eq!(target.get("x"), Some(0.0));
    }

    #[test]
    fn test_active_value_applied_on_init() {
        let target = bag(0.0);
        let gens = ValueGenerators {
            active: Some(Rc::new(|_: &GenContext<'_>| 42.0)),
            ..ValueOp::To(100.0).into_generators()
        };
        let _data = unit(&target, PropertySpec::new(ValueOp::Custom(gens)).with_delay(100.0));
        assert_eq!(target.get("x"), Some(42.0));
    }

    #[test]
    fn test_retarget() {
        let target = bag(0.0);
        let mut data = unit(&target, PropertySpec::new(100.0));
        let mut emit = |_: TweenEventKind, _: &TweenData| {};

        data.advance(500.0, &mut emit);
        data.retarget(200.0, true);
        assert_eq!(data.start(), 50.0);
        assert_eq!(data.end(), 200.0);

        data.advance(500.0, &mut emit);
        assert_eq!(target.get("x"), Some(200.0));
    }
}
