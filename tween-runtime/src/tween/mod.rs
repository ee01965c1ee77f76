//! # Tween 模块
//!
//! 聚合状态机：把多个 `TweenData` 组织成一次播放，负责起始延迟、
//! 循环、完成延迟和播放控制（play/seek/stop/restart/complete）。
//!
//! ## 状态
//!
//! ```text
//! Created ──init──► Init ──play──► Playing ──(全部单元完成)──► nextState
//!                                     ▲                           │
//!                                     │    ┌── loop > 0 ──────────┤
//!                              LoopDelay ◄─┘                      │
//!                                            CompleteDelay ◄── completeDelay > 0
//!                                                  │              │
//!                                                  ▼              ▼
//!                                            PendingRemove ──(管理器)──► Removed
//! ```
//!
//! ## 与管理器的协作
//!
//! Tween 不持有管理器引用。需要管理器配合的控制操作返回 `ManagerAction`，
//! 由 `TweenManager` 负责执行；独立使用时可以忽略该返回值。

mod builder;

#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::debug;

pub use builder::{Prop, TweenBuilder};
pub(crate) use builder::TweenOptions;

use crate::error::{TweenError, TweenResult};
use crate::event::{EventDispatcher, TweenEvent, TweenEventKind, UnitEvent};
use crate::manager::ManagerAction;
use crate::state::{CountdownNotice, TweenState, resolve_count};
use crate::target::TargetRef;
use crate::timeline::TimelineOffset;
use crate::tween_data::TweenData;

/// seek 默认步长（约 60fps 的一帧）
pub const DEFAULT_SEEK_STEP: f64 = 16.6;

static NEXT_TWEEN_ID: AtomicU64 = AtomicU64::new(1);

/// Tween 唯一标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TweenId(u64);

impl TweenId {
    /// 创建新的 Tween ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// 分配下一个全局唯一 ID
    pub(crate) fn next() -> Self {
        Self(NEXT_TWEEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// 获取 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TweenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tween#{}", self.0)
    }
}

/// 补间动画
pub struct Tween {
    id: TweenId,
    targets: Vec<TargetRef>,
    data: Vec<TweenData>,
    state: TweenState,

    paused: bool,
    is_seeking: bool,
    has_started: bool,
    use_frames: bool,
    time_scale: f64,
    /// 管理器（或 Timeline）下发的全局时间缩放
    global_time_scale: f64,

    elapsed: f64,
    progress: f64,
    total_elapsed: f64,
    total_progress: f64,

    duration: f64,
    total_duration: f64,
    start_delay: f64,

    loop_count: i64,
    loop_counter: u64,
    loop_delay: f64,
    complete_delay: f64,
    /// LoopDelay/OffsetDelay/CompleteDelay 共用的倒计时
    countdown: f64,

    offset: TimelineOffset,
    calculated_offset: f64,
    parent_is_timeline: bool,
    persist: bool,

    dispatcher: EventDispatcher<TweenEvent>,
}

impl fmt::Debug for Tween {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tween")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("targets", &self.targets.len())
            .field("data", &self.data.len())
            .field("paused", &self.paused)
            .field("total_progress", &self.total_progress)
            .finish()
    }
}

impl Tween {
    /// 创建构建器
    pub fn builder() -> TweenBuilder {
        TweenBuilder::new()
    }

    pub(crate) fn from_parts(
        targets: Vec<TargetRef>,
        data: Vec<TweenData>,
        options: TweenOptions,
    ) -> Self {
        Self {
            id: TweenId::next(),
            targets,
            data,
            state: TweenState::Created,
            paused: options.paused,
            is_seeking: false,
            has_started: false,
            use_frames: options.use_frames,
            time_scale: options.time_scale,
            global_time_scale: 1.0,
            elapsed: 0.0,
            progress: 0.0,
            total_elapsed: 0.0,
            total_progress: 0.0,
            duration: 0.0,
            total_duration: 0.0,
            start_delay: 0.0,
            loop_count: options.loop_count,
            loop_counter: 0,
            loop_delay: options.loop_delay,
            complete_delay: options.complete_delay,
            countdown: 0.0,
            offset: options.offset,
            calculated_offset: 0.0,
            parent_is_timeline: false,
            persist: options.persist,
            dispatcher: options.dispatcher,
        }
    }

    // ========== 事件 ==========

    /// 注册监听器
    pub fn on(&mut self, kind: TweenEventKind, listener: impl FnMut(&TweenEvent) + 'static) {
        self.dispatcher.on(kind, listener);
    }

    /// 设置回调槽（每种事件一个，在监听器之后调用）
    pub fn set_callback(
        &mut self,
        kind: TweenEventKind,
        callback: impl FnMut(&TweenEvent) + 'static,
    ) {
        self.dispatcher.set_callback(kind, callback);
    }

    pub fn clear_callback(&mut self, kind: TweenEventKind) {
        self.dispatcher.clear_callback(kind);
    }

    /// seek 期间不分发任何事件
    fn dispatch(&mut self, event: TweenEvent) {
        if !self.is_seeking {
            self.dispatcher.dispatch(&event);
        }
    }

    // ========== 生命周期 ==========

    /// 初始化：求每个单元的时间参数并计算总时长
    ///
    /// # 返回
    /// - `true`: 可以开始播放
    /// - `false`: Tween 处于暂停状态，应留在管理器的 pending 列表
    pub fn init(&mut self) -> bool {
        for unit in &mut self.data {
            unit.init();
        }
        self.calc_duration();
        self.zero_progress();

        if self.paused && !self.parent_is_timeline {
            self.state = TweenState::PendingAdd;
            return false;
        }

        self.state = TweenState::Init;
        true
    }

    /// 重新计算总时长
    pub fn calc_duration(&mut self) {
        let mut max_duration: f64 = 0.0;
        for unit in &mut self.data {
            max_duration = max_duration.max(unit.calc_duration());
        }

        self.duration = max_duration;
        self.start_delay = self.min_unit_delay();
        self.loop_counter = resolve_count(self.loop_count);

        let loops = self.loop_counter as f64;
        self.total_duration =
            self.duration * (loops + 1.0) + self.loop_delay * loops + self.complete_delay;
    }

    /// 所有单元中最短的 delay，决定 Start 事件的时刻
    fn min_unit_delay(&self) -> f64 {
        self.data
            .iter()
            .map(TweenData::delay)
            .reduce(f64::min)
            .unwrap_or(0.0)
    }

    /// 重置所有单元
    ///
    /// `from_loop` 为 true 时单元直接用生成器求新的起止值（循环或 Timeline 循环），
    /// 否则等待下一次推进时读取目标的当前值。
    pub fn reset_tween_data(&mut self, from_loop: bool) {
        for unit in &mut self.data {
            unit.reset(from_loop);
        }
    }

    fn zero_progress(&mut self) {
        self.elapsed = 0.0;
        self.progress = 0.0;
        self.total_elapsed = 0.0;
        self.total_progress = 0.0;
    }

    /// 推进一帧
    ///
    /// # 返回
    /// - `true`: 请求管理器移除
    /// - `false`: 保留在活动列表
    pub fn update(&mut self, _time: f64, delta: f64) -> bool {
        if self.state.is_pending_remove() {
            return true;
        }
        if self.paused && !self.is_seeking {
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
                Some(CountdownNotice::Loop) => self.dispatch(TweenEvent::Loop(self.id)),
                Some(CountdownNotice::Complete) => {
                    debug!(tween = %self.id, "完成");
                    self.dispatch(TweenEvent::Complete(self.id));
                }
                None => {}
            }
        }

        if self.state == TweenState::Playing {
            self.update_playing(delta);
        }

        self.state == TweenState::PendingRemove
    }

    fn update_playing(&mut self, delta: f64) {
        if !self.has_started && !self.is_seeking {
            self.start_delay -= delta;
            if self.start_delay <= 0.0 {
                self.has_started = true;
                self.dispatch(TweenEvent::Start(self.id));
            }
        }

        let id = self.id;
        let seeking = self.is_seeking;
        let data = &mut self.data;
        let dispatcher = &mut self.dispatcher;

        let mut emit = |kind: TweenEventKind, unit: &TweenData| {
            if !seeking {
                dispatcher.dispatch(&unit_event(id, kind, unit));
            }
        };

        let mut still_running = false;
        for unit in data.iter_mut() {
            if unit.advance(delta, &mut emit) {
                still_running = true;
            }
        }

        if !still_running {
            self.next_state();
        }
    }

    /// 当前一轮播放结束后的转移
    fn next_state(&mut self) {
        if self.loop_counter > 0 {
            self.elapsed = 0.0;
            self.progress = 0.0;
            self.loop_counter -= 1;
            self.reset_tween_data(true);

            if self.loop_delay > 0.0 {
                self.countdown = self.loop_delay;
                self.state = TweenState::LoopDelay;
            } else {
                self.state = TweenState::Playing;
                self.dispatch(TweenEvent::Loop(self.id));
            }
            debug!(tween = %self.id, remaining = self.loop_counter, "开始新一轮循环");
        } else if self.complete_delay > 0.0 {
            self.countdown = self.complete_delay;
            self.state = TweenState::CompleteDelay;
        } else {
            self.state = TweenState::PendingRemove;
            debug!(tween = %self.id, "完成");
            self.dispatch(TweenEvent::Complete(self.id));
        }
    }

    // ========== 播放控制 ==========

    /// 开始播放
    ///
    /// 暂停中的 Tween 只解除暂停，并请求管理器重新激活。
    pub fn play(&mut self) -> ManagerAction {
        if self.paused {
            self.paused = false;
            return ManagerAction::MakeActive;
        }

        match self.state {
            TweenState::Playing | TweenState::PendingAdd | TweenState::Destroyed => {
                ManagerAction::None
            }
            TweenState::PendingRemove | TweenState::Removed if !self.parent_is_timeline => {
                self.start_playback(false);
                ManagerAction::MakeActive
            }
            TweenState::Created => {
                self.init();
                self.start_playback(false);
                ManagerAction::None
            }
            _ => {
                self.start_playback(false);
                ManagerAction::None
            }
        }
    }

    /// 由 Timeline 启动（或在 Timeline 循环时重新启动）
    pub(crate) fn play_in_timeline(&mut self, reset_from_loop: bool) {
        self.paused = false;
        self.start_playback(reset_from_loop);
    }

    fn start_playback(&mut self, reset_from_loop: bool) {
        self.reset_tween_data(reset_from_loop);
        self.zero_progress();
        self.has_started = false;
        self.start_delay = self.min_unit_delay();
        self.loop_counter = resolve_count(self.loop_count);

        if self.parent_is_timeline && self.calculated_offset > 0.0 {
            self.countdown = self.calculated_offset;
            self.state = TweenState::OffsetDelay;
        } else {
            self.state = TweenState::Playing;
        }
    }

    /// 暂停（保留在活动列表中空转）
    pub fn pause(&mut self) {
        if !matches!(
            self.state,
            TweenState::PendingRemove | TweenState::Removed | TweenState::Destroyed
        ) {
            self.paused = true;
        }
    }

    /// 恢复播放
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

    /// 跳到指定总进度
    ///
    /// 从头以 `step` 为步长反复调用 `update`，直到 `total_progress >= to`，
    /// 期间不分发事件。精度受 `step` 限制。
    ///
    /// 步数约为 `total_duration / step`：无限循环的 Tween 实际上会一直推进到
    /// `UNBOUNDED_COUNT` 次循环，调用方需要自行避免或选用足够大的步长。
    pub fn seek(&mut self, to: f64, step: f64) -> TweenResult<()> {
        if !step.is_finite() || step <= 0.0 {
            return Err(TweenError::InvalidSeekStep { step });
        }
        if !to.is_finite() {
            return Err(TweenError::InvalidSeekPosition { position: to });
        }
        self.replay_to(to, step);
        Ok(())
    }

    fn replay_to(&mut self, to: f64, step: f64) {
        if self.state == TweenState::Destroyed {
            return;
        }
        let to = to.clamp(0.0, 1.0);

        self.zero_progress();
        for unit in &mut self.data {
            unit.reset_for_seek();
        }
        self.calc_duration();

        self.state = TweenState::Playing;
        self.is_seeking = true;
        debug!(tween = %self.id, to, step, "seek");

        while self.total_progress < to {
            if self.update(0.0, step) {
                break;
            }
        }

        self.is_seeking = false;
    }

    /// 从头开始播放
    pub fn restart(&mut self) -> ManagerAction {
        self.zero_progress();

        match self.state {
            TweenState::Playing => {
                self.replay_to(0.0, DEFAULT_SEEK_STEP);
                ManagerAction::None
            }
            TweenState::Removed => {
                self.replay_to(0.0, DEFAULT_SEEK_STEP);
                ManagerAction::MakeActive
            }
            TweenState::PendingRemove => ManagerAction::Reset,
            _ => self.play(),
        }
    }

    /// 管理器执行 `Reset` 时调用：回到起点并进入 Playing
    pub(crate) fn reset_to_start(&mut self, step: f64) {
        self.replay_to(0.0, step);
        self.state = TweenState::Playing;
    }

    /// 停止
    ///
    /// 正在播放且给出 `reset_to` 时先 seek 到该进度。
    /// 分发 stop 事件后移除所有监听器（回调槽保留），进入 `PendingRemove`。
    pub fn stop(&mut self, reset_to: Option<f64>) -> ManagerAction {
        if self.state == TweenState::Playing
            && let Some(position) = reset_to
        {
            self.replay_to(position, DEFAULT_SEEK_STEP);
        }

        if matches!(self.state, TweenState::Removed | TweenState::Destroyed) {
            return ManagerAction::None;
        }

        // 从未进入活动列表的 Tween 不会再被 update，需要管理器直接移除
        let action = match self.state {
            TweenState::Created | TweenState::Init | TweenState::PendingAdd => {
                ManagerAction::Remove
            }
            _ => ManagerAction::None,
        };

        self.dispatch(TweenEvent::Stop(self.id));
        self.dispatcher.remove_all_listeners();
        self.state = TweenState::PendingRemove;
        debug!(tween = %self.id, "停止");

        action
    }

    /// 立即（或延迟 `delay` 后）完成
    pub fn complete(&mut self, delay: f64) {
        if delay > 0.0 {
            self.countdown = delay;
            self.state = TweenState::CompleteDelay;
        } else {
            self.state = TweenState::PendingRemove;
            debug!(tween = %self.id, "完成");
            self.dispatch(TweenEvent::Complete(self.id));
        }
    }

    /// 改写所有 `key` 属性单元的结束值
    ///
    /// 不影响时长和进度；`start_to_current` 为 true 时起始值改为当前值。
    pub fn update_to(&mut self, key: &str, value: f64, start_to_current: bool) {
        for unit in self.data.iter_mut().filter(|unit| unit.key() == key) {
            unit.retarget(value, start_to_current);
        }
    }

    /// 断开某个目标，它的单元在下一次推进时直接完成
    pub fn release_target(&mut self, target: &TargetRef) {
        for unit in &mut self.data {
            if unit.target().same_target(target) {
                unit.clear_target();
            }
        }
    }

    /// 销毁，之后不可再使用
    pub fn destroy(&mut self) {
        self.data.clear();
        self.targets.clear();
        self.dispatcher.clear();
        self.state = TweenState::Destroyed;
        debug!(tween = %self.id, "销毁");
    }

    // ========== 查询方法 ==========

    pub fn id(&self) -> TweenId {
        self.id
    }

    pub fn state(&self) -> TweenState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TweenState) {
        self.state = state;
    }

    pub fn targets(&self) -> &[TargetRef] {
        &self.targets
    }

    /// 是否包含目标
    pub fn has_target(&self, target: &TargetRef) -> bool {
        self.targets.iter().any(|t| t.same_target(target))
    }

    /// 所有单元（按创建顺序）
    pub fn data(&self) -> &[TweenData] {
        &self.data
    }

    /// 第 `index` 个单元的当前值
    pub fn get_value(&self, index: usize) -> Option<f64> {
        self.data.get(index).map(TweenData::current)
    }

    pub fn is_playing(&self) -> bool {
        !self.paused && self.state == TweenState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_seeking(&self) -> bool {
        self.is_seeking
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    pub fn total_progress(&self) -> f64 {
        self.total_progress
    }

    /// 最长单元的 totalDuration
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// 包含循环和完成延迟的总时长
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn start_delay(&self) -> f64 {
        self.start_delay
    }

    pub fn loop_counter(&self) -> u64 {
        self.loop_counter
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

    pub fn use_frames(&self) -> bool {
        self.use_frames
    }

    pub fn persist(&self) -> bool {
        self.persist
    }

    pub fn offset(&self) -> TimelineOffset {
        self.offset
    }

    pub fn calculated_offset(&self) -> f64 {
        self.calculated_offset
    }

    pub(crate) fn set_calculated_offset(&mut self, offset: f64) {
        self.calculated_offset = offset;
    }

    pub fn parent_is_timeline(&self) -> bool {
        self.parent_is_timeline
    }

    pub(crate) fn attach_to_timeline(&mut self) {
        self.parent_is_timeline = true;
    }
}

fn unit_event(tween: TweenId, kind: TweenEventKind, unit: &TweenData) -> TweenEvent {
    let payload = UnitEvent {
        tween,
        key: unit.key_rc(),
        index: unit.index(),
        target: unit.target().clone(),
        current: unit.current(),
        previous: unit.previous(),
    };
    match kind {
        TweenEventKind::Yoyo => TweenEvent::Yoyo(payload),
        TweenEventKind::Repeat => TweenEvent::Repeat(payload),
        _ => TweenEvent::Update(payload),
    }
}
