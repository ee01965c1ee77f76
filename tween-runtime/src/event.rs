//! # Event 模块
//!
//! Tween/Timeline 通知分发。
//!
//! 每种事件有两类接收者，按顺序投递：
//! 1. 通过 `on` 注册的监听器（注册顺序）
//! 2. 通过 `set_callback` 设置的回调槽（每种事件至多一个）
//!
//! `stop` 会清空监听器，回调槽保留。seek 期间不投递任何事件，
//! 这一规则由 Tween 在调用 `dispatch` 前检查。

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use serde::Serialize;

use crate::target::TargetRef;
use crate::timeline::TimelineId;
use crate::tween::TweenId;

/// 可分发的事件
pub trait Event {
    /// 事件种类
    type Kind: Copy + Eq + Hash + fmt::Debug;

    /// 获取事件种类
    fn kind(&self) -> Self::Kind;
}

/// 事件接收者
pub type Listener<E> = Box<dyn FnMut(&E)>;

/// 事件分发器
pub struct EventDispatcher<E: Event> {
    listeners: Vec<(E::Kind, Listener<E>)>,
    callbacks: HashMap<E::Kind, Listener<E>>,
}

impl<E: Event> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            callbacks: HashMap::new(),
        }
    }
}

impl<E: Event> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listeners.len())
            .field("callbacks", &self.callbacks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<E: Event> EventDispatcher<E> {
    /// 创建空的分发器
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器
    pub fn on(&mut self, kind: E::Kind, listener: impl FnMut(&E) + 'static) {
        self.listeners.push((kind, Box::new(listener)));
    }

    /// 设置回调槽（覆盖旧回调）
    pub fn set_callback(&mut self, kind: E::Kind, callback: impl FnMut(&E) + 'static) {
        self.callbacks.insert(kind, Box::new(callback));
    }

    /// 清除回调槽
    pub fn clear_callback(&mut self, kind: E::Kind) {
        self.callbacks.remove(&kind);
    }

    /// 分发事件
    pub fn dispatch(&mut self, event: &E) {
        let kind = event.kind();
        for (_, listener) in self.listeners.iter_mut().filter(|(k, _)| *k == kind) {
            listener(event);
        }
        if let Some(callback) = self.callbacks.get_mut(&kind) {
            callback(event);
        }
    }

    /// 移除所有监听器（保留回调槽）
    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    /// 移除所有监听器和回调
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.callbacks.clear();
    }

    /// 监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// Tween 事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TweenEventKind {
    /// 越过 startDelay 后首次开始
    Start,
    /// 某个属性写入了新值
    Update,
    /// 某个属性开始反向播放
    Yoyo,
    /// 某个属性开始新一轮重复
    Repeat,
    /// 整个 Tween 开始新一轮循环
    Loop,
    /// 整个 Tween 完成
    Complete,
    /// 被 stop 中止
    Stop,
}

/// 单个属性（TweenData）相关的事件数据
#[derive(Debug, Clone)]
pub struct UnitEvent {
    /// 所属 Tween
    pub tween: TweenId,
    /// 属性名
    pub key: Rc<str>,
    /// 目标在 Tween 目标列表中的索引
    pub index: usize,
    /// 目标对象
    pub target: TargetRef,
    /// 当前值
    pub current: f64,
    /// 上一次写入前的值
    pub previous: f64,
}

/// Tween 事件
#[derive(Debug, Clone)]
pub enum TweenEvent {
    Start(TweenId),
    Update(UnitEvent),
    Yoyo(UnitEvent),
    Repeat(UnitEvent),
    Loop(TweenId),
    Complete(TweenId),
    Stop(TweenId),
}

impl TweenEvent {
    /// 单属性事件的数据
    pub fn unit(&self) -> Option<&UnitEvent> {
        match self {
            TweenEvent::Update(unit) | TweenEvent::Yoyo(unit) | TweenEvent::Repeat(unit) => {
                Some(unit)
            }
            _ => None,
        }
    }
}

impl Event for TweenEvent {
    type Kind = TweenEventKind;

    fn kind(&self) -> TweenEventKind {
        match self {
            TweenEvent::Start(_) => TweenEventKind::Start,
            TweenEvent::Update(_) => TweenEventKind::Update,
            TweenEvent::Yoyo(_) => TweenEventKind::Yoyo,
            TweenEvent::Repeat(_) => TweenEventKind::Repeat,
            TweenEvent::Loop(_) => TweenEventKind::Loop,
            TweenEvent::Complete(_) => TweenEventKind::Complete,
            TweenEvent::Stop(_) => TweenEventKind::Stop,
        }
    }
}

/// Timeline 事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Start,
    Update,
    Loop,
    Complete,
}

/// Timeline 事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineEvent {
    pub timeline: TimelineId,
    pub kind: TimelineEventKind,
}

impl Event for TimelineEvent {
    type Kind = TimelineEventKind;

    fn kind(&self) -> TimelineEventKind {
        self.kind
    }
}
