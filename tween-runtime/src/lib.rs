//! # Tween Runtime
//!
//! 逐帧驱动的属性补间引擎。
//!
//! ## 架构概述
//!
//! `tween-runtime` 不依赖任何渲染或窗口系统。宿主每帧调用一次
//! [`TweenManager::step`]，引擎把插值结果写回实现了 [`Animatable`] 的目标对象：
//!
//! ```text
//! Host                          TweenManager
//!   │                              │
//!   │──── step(time, delta) ──────►│ pre_update: 移除完成项 / 激活新加入项
//!   │                              │ update: 推进每个活动 Tween/Timeline
//!   │◄─── Animatable::set_value ───│
//!   │◄─── TweenEvent 回调 ─────────│
//! ```
//!
//! ## 核心类型
//!
//! - [`TweenData`]：单个目标上单个属性的状态机
//! - [`Tween`]：一组 TweenData 的聚合，负责整体循环与事件
//! - [`Timeline`]：按偏移排布多个 Tween
//! - [`TweenManager`]：活动列表与生命周期管理
//! - [`Scenario`]：JSON 描述的场景
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::rc::Rc;
//! use tween_runtime::{EasingFunction, PropertyBag, TweenManager};
//!
//! let sprite = Rc::new(PropertyBag::new().with("x", 0.0));
//! let mut manager = TweenManager::new();
//! let builder = manager
//!     .builder()
//!     .target(&sprite)
//!     .property("x", 100.0)
//!     .duration(500.0)
//!     .ease(EasingFunction::EaseOutQuad);
//! manager.create(builder)?;
//!
//! loop {
//!     manager.step(now, 16.6);
//!     draw(sprite.get("x"));
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`tween_data`]：单属性状态机
//! - [`tween`]：Tween 与构建器
//! - [`timeline`]：Timeline
//! - [`manager`]：TweenManager
//! - [`easing`] / [`value`]：缓动函数与数值生成
//! - [`target`]：目标对象抽象
//! - [`event`]：事件分发
//! - [`config`] / [`scenario`]：配置与场景文件

pub mod config;
pub mod easing;
pub mod error;
pub mod event;
pub mod manager;
pub mod scenario;
pub mod state;
pub mod target;
pub mod timeline;
pub mod tween;
pub mod tween_data;
pub mod value;

// 重导出核心类型
pub use config::{EngineConfig, TweenDefaults};
pub use easing::{Ease, EasingFunction};
pub use error::{ConfigError, TweenError, TweenResult};
pub use event::{
    Event, EventDispatcher, TimelineEvent, TimelineEventKind, TweenEvent, TweenEventKind,
    UnitEvent,
};
pub use manager::{ManagerAction, PlaybackHandle, TweenManager};
pub use scenario::{Scenario, ScenarioInstance};
pub use state::{TweenState, UNBOUNDED_COUNT, resolve_count};
pub use target::{Animatable, PropertyBag, TargetRef};
pub use timeline::{Timeline, TimelineId, TimelineOffset};
pub use tween::{DEFAULT_SEEK_STEP, Prop, Tween, TweenBuilder, TweenId};
pub use tween_data::{MIN_DURATION, PropertySpec, TimingOps, TweenData, TweenDataState};
pub use value::{GenContext, NumberOp, ValueOp};

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_public_api_accessible() {
        let sprite = Rc::new(PropertyBag::new().with("x", 0.0));
        let mut manager = TweenManager::new();

        let builder = manager
            .builder()
            .target(&sprite)
            .property("x", ValueOp::Add(10.0))
            .duration(100.0);
        let id = manager.create(builder).unwrap();

        manager.step(0.0, 50.0);
        assert_eq!(sprite.get("x"), Some(5.0));
        assert_eq!(
            manager.tween(id).map(Tween::state),
            Some(TweenState::Playing)
        );

        let _offset = TimelineOffset::parse("+=10").unwrap();
        let _handle = PlaybackHandle::from(id);
        assert_eq!(resolve_count(-1), UNBOUNDED_COUNT);
    }
}
