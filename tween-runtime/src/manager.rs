//! # Manager 模块
//!
//! Tween/Timeline 管理器。
//!
//! ## 列表
//!
//! - `add_queue`: 下一次 `pre_update` 时初始化并加入活动列表
//! - `pending`: 暂停中创建的条目，等待 `play`/`resume`
//! - `active`: 每帧调用 `update`
//! - `destroy_queue`: `update` 返回 true 的条目，下一次 `pre_update` 时移除
//!
//! ```rust,ignore
//! let mut manager = TweenManager::new();
//! let builder = manager.builder().target(&sprite).property("x", 100.0);
//! let id = manager.create(builder)?;
//! loop {
//!     manager.step(now, 16.0);
//! }
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::config::{EngineConfig, TweenDefaults};
use crate::error::{TweenError, TweenResult};
use crate::state::TweenState;
use crate::target::TargetRef;
use crate::timeline::{Timeline, TimelineId};
use crate::tween::{DEFAULT_SEEK_STEP, Tween, TweenBuilder, TweenId};

/// 控制操作要求管理器执行的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerAction {
    /// 无需处理
    None,
    /// 重新加入活动列表
    MakeActive,
    /// 回到起点并重新激活
    Reset,
    /// 立即移除
    Remove,
}

/// 管理器中条目的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackHandle {
    Tween(TweenId),
    Timeline(TimelineId),
}

impl fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackHandle::Tween(id) => write!(f, "{}", id),
            PlaybackHandle::Timeline(id) => write!(f, "{}", id),
        }
    }
}

impl From<TweenId> for PlaybackHandle {
    fn from(id: TweenId) -> Self {
        Self::Tween(id)
    }
}

impl From<TimelineId> for PlaybackHandle {
    fn from(id: TimelineId) -> Self {
        Self::Timeline(id)
    }
}

/// 管理器驱动 Tween 和 Timeline 的统一接口
trait Playback {
    fn init(&mut self) -> bool;
    fn play(&mut self) -> ManagerAction;
    fn update(&mut self, time: f64, delta: f64) -> bool;
    fn state(&self) -> TweenState;
    fn set_state(&mut self, state: TweenState);
    fn set_global_time_scale(&mut self, scale: f64);
    fn pause(&mut self);
    fn resume(&mut self) -> ManagerAction;
    fn stop(&mut self) -> ManagerAction;
    fn has_target(&self, target: &TargetRef) -> bool;
    fn persist(&self) -> bool;
    fn destroy(&mut self);
}

impl Playback for Tween {
    fn init(&mut self) -> bool {
        Tween::init(self)
    }

    fn play(&mut self) -> ManagerAction {
        Tween::play(self)
    }

    fn update(&mut self, time: f64, delta: f64) -> bool {
        Tween::update(self, time, delta)
    }

    fn state(&self) -> TweenState {
        Tween::state(self)
    }

    fn set_state(&mut self, state: TweenState) {
        Tween::set_state(self, state)
    }

    fn set_global_time_scale(&mut self, scale: f64) {
        Tween::set_global_time_scale(self, scale)
    }

    fn pause(&mut self) {
        Tween::pause(self)
    }

    fn resume(&mut self) -> ManagerAction {
        Tween::resume(self)
    }

    fn stop(&mut self) -> ManagerAction {
        Tween::stop(self, None)
    }

    fn has_target(&self, target: &TargetRef) -> bool {
        Tween::has_target(self, target)
    }

    fn persist(&self) -> bool {
        Tween::persist(self)
    }

    fn destroy(&mut self) {
        Tween::destroy(self)
    }
}

impl Playback for Timeline {
    fn init(&mut self) -> bool {
        Timeline::init(self)
    }

    fn play(&mut self) -> ManagerAction {
        Timeline::play(self)
    }

    fn update(&mut self, time: f64, delta: f64) -> bool {
        Timeline::update(self, time, delta)
    }

    fn state(&self) -> TweenState {
        Timeline::state(self)
    }

    fn set_state(&mut self, state: TweenState) {
        Timeline::set_state(self, state)
    }

    fn set_global_time_scale(&mut self, scale: f64) {
        Timeline::set_global_time_scale(self, scale)
    }

    fn pause(&mut self) {
        Timeline::pause(self)
    }

    fn resume(&mut self) -> ManagerAction {
        Timeline::resume(self)
    }

    fn stop(&mut self) -> ManagerAction {
        Timeline::stop(self)
    }

    fn has_target(&self, target: &TargetRef) -> bool {
        Timeline::has_target(self, target)
    }

    fn persist(&self) -> bool {
        Timeline::persist(self)
    }

    fn destroy(&mut self) {
        Timeline::destroy(self)
    }
}

/// Tween 管理器
///
/// 拥有所有加入的 Tween/Timeline，按句柄访问。
pub struct TweenManager {
    tweens: HashMap<TweenId, Tween>,
    timelines: HashMap<TimelineId, Timeline>,
    add_queue: Vec<PlaybackHandle>,
    pending: Vec<PlaybackHandle>,
    active: Vec<PlaybackHandle>,
    destroy_queue: Vec<PlaybackHandle>,
    /// 全局时间缩放
    time_scale: f64,
    seek_step: f64,
    defaults: TweenDefaults,
}

impl Default for TweenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TweenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenManager")
            .field("tweens", &self.tweens.len())
            .field("timelines", &self.timelines.len())
            .field("active", &self.active.len())
            .field("pending", &self.pending.len())
            .field("time_scale", &self.time_scale)
            .finish()
    }
}

impl TweenManager {
    pub fn new() -> Self {
        Self {
            tweens: HashMap::new(),
            timelines: HashMap::new(),
            add_queue: Vec::new(),
            pending: Vec::new(),
            active: Vec::new(),
            destroy_queue: Vec::new(),
            time_scale: 1.0,
            seek_step: DEFAULT_SEEK_STEP,
            defaults: TweenDefaults::default(),
        }
    }

    /// 从引擎配置创建
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            time_scale: config.time_scale,
            seek_step: config.seek_step,
            defaults: config.defaults.clone(),
            ..Self::new()
        }
    }

    /// 以管理器默认值为起点的构建器
    pub fn builder(&self) -> TweenBuilder {
        TweenBuilder::with_defaults(&self.defaults)
    }

    // ========== 加入 ==========

    /// 加入 Tween，下一次 `pre_update` 时开始播放
    pub fn add_tween(&mut self, mut tween: Tween) -> TweenId {
        let id = tween.id();
        tween.set_state(TweenState::PendingAdd);
        self.tweens.insert(id, tween);
        self.add_queue.push(PlaybackHandle::Tween(id));
        debug!(tween = %id, "加入管理器");
        id
    }

    /// 构建并加入 Tween
    pub fn create(&mut self, builder: TweenBuilder) -> TweenResult<TweenId> {
        let tween = builder.build()?;
        Ok(self.add_tween(tween))
    }

    pub fn add_timeline(&mut self, mut timeline: Timeline) -> TimelineId {
        let id = timeline.id();
        timeline.set_state(TweenState::PendingAdd);
        self.timelines.insert(id, timeline);
        self.add_queue.push(PlaybackHandle::Timeline(id));
        debug!(timeline = %id, "加入管理器");
        id
    }

    // ========== 访问 ==========

    pub fn tween(&self, id: TweenId) -> Option<&Tween> {
        self.tweens.get(&id)
    }

    pub fn tween_mut(&mut self, id: TweenId) -> Option<&mut Tween> {
        self.tweens.get_mut(&id)
    }

    pub fn timeline(&self, id: TimelineId) -> Option<&Timeline> {
        self.timelines.get(&id)
    }

    pub fn timeline_mut(&mut self, id: TimelineId) -> Option<&mut Timeline> {
        self.timelines.get_mut(&id)
    }

    pub fn contains(&self, handle: PlaybackHandle) -> bool {
        self.entry(handle).is_some()
    }

    fn entry(&self, handle: PlaybackHandle) -> Option<&dyn Playback> {
        match handle {
            PlaybackHandle::Tween(id) => self.tweens.get(&id).map(|t| t as &dyn Playback),
            PlaybackHandle::Timeline(id) => self.timelines.get(&id).map(|t| t as &dyn Playback),
        }
    }

    fn entry_mut(&mut self, handle: PlaybackHandle) -> Option<&mut dyn Playback> {
        match handle {
            PlaybackHandle::Tween(id) => self
                .tweens
                .get_mut(&id)
                .map(|t| t as &mut dyn Playback),
            PlaybackHandle::Timeline(id) => self
                .timelines
                .get_mut(&id)
                .map(|t| t as &mut dyn Playback),
        }
    }

    fn require_mut(&mut self, handle: PlaybackHandle) -> TweenResult<&mut dyn Playback> {
        self.entry_mut(handle).ok_or_else(|| TweenError::NotFound {
            handle: handle.to_string(),
        })
    }

    // ========== 帧循环 ==========

    /// 处理移除队列和加入队列
    pub fn pre_update(&mut self) {
        for handle in std::mem::take(&mut self.destroy_queue) {
            let finished = self
                .entry(handle)
                .is_some_and(|entry| entry.state().is_pending_remove());
            if finished {
                self.remove(handle);
            }
        }

        for handle in std::mem::take(&mut self.add_queue) {
            let Some(entry) = self.entry_mut(handle) else {
                continue;
            };
            if entry.state() != TweenState::PendingAdd {
                continue;
            }

            if entry.init() {
                let action = entry.play();
                self.active.push(handle);
                self.apply_action(handle, action);
            } else {
                self.pending.push(handle);
            }
        }
    }

    /// 推进活动列表中的所有条目
    pub fn update(&mut self, time: f64, delta: f64) {
        let scale = self.time_scale;
        for i in 0..self.active.len() {
            let handle = self.active[i];
            let Some(entry) = self.entry_mut(handle) else {
                continue;
            };
            entry.set_global_time_scale(scale);
            if entry.update(time, delta) && !self.destroy_queue.contains(&handle) {
                self.destroy_queue.push(handle);
            }
        }
    }

    /// 一帧：`pre_update` + `update`
    pub fn step(&mut self, time: f64, delta: f64) {
        self.pre_update();
        self.update(time, delta);
    }

    // ========== 列表维护 ==========

    /// 执行控制操作返回的动作
    pub fn apply_action(&mut self, handle: PlaybackHandle, action: ManagerAction) {
        match action {
            ManagerAction::None => {}
            ManagerAction::MakeActive => self.make_active(handle),
            ManagerAction::Reset => match handle {
                PlaybackHandle::Tween(id) => self.reset(id),
                PlaybackHandle::Timeline(_) => self.make_active(handle),
            },
            ManagerAction::Remove => self.remove(handle),
        }
    }

    /// 放回加入队列
    pub fn make_active(&mut self, handle: PlaybackHandle) {
        if !self.contains(handle) {
            return;
        }
        self.destroy_queue.retain(|h| *h != handle);
        if self.add_queue.contains(&handle) || self.active.contains(&handle) {
            return;
        }

        self.pending.retain(|h| *h != handle);
        self.add_queue.push(handle);
        if let Some(entry) = self.entry_mut(handle) {
            entry.set_state(TweenState::PendingAdd);
        }
    }

    /// 从所有列表移除；非持久条目同时销毁
    pub fn remove(&mut self, handle: PlaybackHandle) {
        self.add_queue.retain(|h| *h != handle);
        self.pending.retain(|h| *h != handle);
        self.active.retain(|h| *h != handle);
        self.destroy_queue.retain(|h| *h != handle);

        let Some(entry) = self.entry_mut(handle) else {
            return;
        };
        entry.set_state(TweenState::Removed);

        if !entry.persist() {
            entry.destroy();
            match handle {
                PlaybackHandle::Tween(id) => {
                    self.tweens.remove(&id);
                }
                PlaybackHandle::Timeline(id) => {
                    self.timelines.remove(&id);
                }
            }
        }
        debug!(%handle, "移出管理器");
    }

    /// 让 Tween 回到起点并留在活动列表
    pub fn reset(&mut self, id: TweenId) {
        let step = self.seek_step;
        let Some(tween) = self.tweens.get_mut(&id) else {
            return;
        };
        tween.reset_to_start(step);

        let handle = PlaybackHandle::Tween(id);
        self.destroy_queue.retain(|h| *h != handle);
        self.add_queue.retain(|h| *h != handle);
        self.pending.retain(|h| *h != handle);
        if !self.active.contains(&handle) {
            self.active.push(handle);
        }
    }

    // ========== 播放控制 ==========

    pub fn play(&mut self, handle: impl Into<PlaybackHandle>) -> TweenResult<()> {
        let handle = handle.into();
        let action = self.require_mut(handle)?.play();
        self.apply_action(handle, action);
        Ok(())
    }

    pub fn pause(&mut self, handle: impl Into<PlaybackHandle>) -> TweenResult<()> {
        self.require_mut(handle.into())?.pause();
        Ok(())
    }

    pub fn resume(&mut self, handle: impl Into<PlaybackHandle>) -> TweenResult<()> {
        let handle = handle.into();
        let action = self.require_mut(handle)?.resume();
        self.apply_action(handle, action);
        Ok(())
    }

    pub fn stop(&mut self, handle: impl Into<PlaybackHandle>) -> TweenResult<()> {
        let handle = handle.into();
        let action = self.require_mut(handle)?.stop();
        self.apply_action(handle, action);
        Ok(())
    }

    pub fn restart(&mut self, id: TweenId) -> TweenResult<()> {
        let action = self.require_tween(id)?.restart();
        self.apply_action(PlaybackHandle::Tween(id), action);
        Ok(())
    }

    pub fn complete(&mut self, id: TweenId, delay: f64) -> TweenResult<()> {
        self.require_tween(id)?.complete(delay);
        Ok(())
    }

    /// 以配置的步长 seek
    pub fn seek(&mut self, id: TweenId, progress: f64) -> TweenResult<()> {
        let step = self.seek_step;
        self.require_tween(id)?.seek(progress, step)
    }

    fn require_tween(&mut self, id: TweenId) -> TweenResult<&mut Tween> {
        self.tweens.get_mut(&id).ok_or_else(|| TweenError::NotFound {
            handle: id.to_string(),
        })
    }

    // ========== 按目标查询 ==========

    fn tracked(&self) -> impl Iterator<Item = PlaybackHandle> + '_ {
        self.active
            .iter()
            .chain(&self.pending)
            .chain(&self.add_queue)
            .copied()
    }

    /// 所有作用于 `target` 的条目（活动、pending、待加入）
    pub fn get_tweens_of(&self, target: &TargetRef) -> Vec<PlaybackHandle> {
        self.tracked()
            .filter(|handle| {
                self.entry(*handle)
                    .is_some_and(|entry| entry.has_target(target))
            })
            .collect()
    }

    /// 是否有正在播放的条目作用于 `target`
    pub fn is_tweening(&self, target: &TargetRef) -> bool {
        self.active.iter().any(|handle| {
            self.entry(*handle).is_some_and(|entry| {
                entry.state() == TweenState::Playing && entry.has_target(target)
            })
        })
    }

    /// 移除所有作用于 `target` 的条目
    pub fn kill_tweens_of(&mut self, target: &TargetRef) {
        for handle in self.get_tweens_of(target) {
            self.remove(handle);
        }
    }

    /// 销毁全部条目（包括持久条目）
    pub fn kill_all(&mut self) {
        for tween in self.tweens.values_mut() {
            tween.destroy();
        }
        for timeline in self.timelines.values_mut() {
            timeline.destroy();
        }
        self.tweens.clear();
        self.timelines.clear();
        self.add_queue.clear();
        self.pending.clear();
        self.active.clear();
        self.destroy_queue.clear();
        debug!("清空管理器");
    }

    pub fn pause_all(&mut self) {
        for handle in self.active.clone() {
            if let Some(entry) = self.entry_mut(handle) {
                entry.pause();
            }
        }
    }

    pub fn resume_all(&mut self) {
        for handle in self.active.clone() {
            if let Some(entry) = self.entry_mut(handle) {
                let action = entry.resume();
                self.apply_action(handle, action);
            }
        }
    }

    // ========== 查询方法 ==========

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale;
    }

    pub fn seek_step(&self) -> f64 {
        self.seek_step
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn queued_count(&self) -> usize {
        self.add_queue.len()
    }

    /// 管理器持有的条目总数
    pub fn len(&self) -> usize {
        self.tweens.len() + self.timelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 活动列表为空且没有待加入的条目
    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.add_queue.is_empty()
    }
}
