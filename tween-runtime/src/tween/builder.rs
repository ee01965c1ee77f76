//! Tween 构建器

use std::rc::Rc;

use crate::config::TweenDefaults;
use crate::easing::Ease;
use crate::error::{TweenError, TweenResult};
use crate::event::{EventDispatcher, TweenEvent, TweenEventKind};
use crate::target::{Animatable, TargetRef};
use crate::timeline::TimelineOffset;
use crate::tween_data::{PropertySpec, TimingOps, TweenData};
use crate::value::{NumberOp, ValueOp};

use super::Tween;

/// 单个属性的配置，未设置的字段沿用 Tween 级别的值
#[derive(Debug, Clone)]
pub struct Prop {
    value: ValueOp,
    delay: Option<NumberOp>,
    duration: Option<NumberOp>,
    hold: Option<NumberOp>,
    repeat: Option<NumberOp>,
    repeat_delay: Option<NumberOp>,
    ease: Option<Ease>,
    yoyo: Option<bool>,
    flip_x: Option<bool>,
    flip_y: Option<bool>,
}

impl Prop {
    pub fn new(value: impl Into<ValueOp>) -> Self {
        Self {
            value: value.into(),
            delay: None,
            duration: None,
            hold: None,
            repeat: None,
            repeat_delay: None,
            ease: None,
            yoyo: None,
            flip_x: None,
            flip_y: None,
        }
    }

    pub fn delay(mut self, delay: impl Into<NumberOp>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    pub fn duration(mut self, duration: impl Into<NumberOp>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    pub fn hold(mut self, hold: impl Into<NumberOp>) -> Self {
        self.hold = Some(hold.into());
        self
    }

    /// 重复次数，-1 表示无限
    pub fn repeat(mut self, repeat: i64) -> Self {
        self.repeat = Some(NumberOp::Fixed(repeat as f64));
        self
    }

    pub fn repeat_delay(mut self, repeat_delay: impl Into<NumberOp>) -> Self {
        self.repeat_delay = Some(repeat_delay.into());
        self
    }

    pub fn ease(mut self, ease: impl Into<Ease>) -> Self {
        self.ease = Some(ease.into());
        self
    }

    pub fn yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = Some(yoyo);
        self
    }

    pub fn flip_x(mut self, flip_x: bool) -> Self {
        self.flip_x = Some(flip_x);
        self
    }

    pub fn flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = Some(flip_y);
        self
    }

    /// 合并 Tween 级别的值
    fn resolve(&self, base: &TweenBuilder) -> PropertySpec {
        PropertySpec {
            value: self.value.clone(),
            timing: TimingOps {
                delay: self.delay.clone().unwrap_or_else(|| base.timing.delay.clone()),
                duration: self
                    .duration
                    .clone()
                    .unwrap_or_else(|| base.timing.duration.clone()),
                hold: self.hold.clone().unwrap_or_else(|| base.timing.hold.clone()),
                repeat: self.repeat.clone().unwrap_or_else(|| base.timing.repeat.clone()),
                repeat_delay: self
                    .repeat_delay
                    .clone()
                    .unwrap_or_else(|| base.timing.repeat_delay.clone()),
            },
            ease: self.ease.clone().unwrap_or_else(|| base.ease.clone()),
            yoyo: self.yoyo.unwrap_or(base.yoyo),
            flip_x: self.flip_x.unwrap_or(base.flip_x),
            flip_y: self.flip_y.unwrap_or(base.flip_y),
        }
    }
}

impl From<f64> for Prop {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<ValueOp> for Prop {
    fn from(value: ValueOp) -> Self {
        Self::new(value)
    }
}

/// 构建器交给 Tween 的聚合级参数
pub(crate) struct TweenOptions {
    pub loop_count: i64,
    pub loop_delay: f64,
    pub complete_delay: f64,
    pub paused: bool,
    pub use_frames: bool,
    pub time_scale: f64,
    pub persist: bool,
    pub offset: TimelineOffset,
    pub dispatcher: EventDispatcher<TweenEvent>,
}

/// Tween 构建器
///
/// ```rust,ignore
/// let tween = Tween::builder()
///     .target(&sprite)
///     .property("x", 100.0)
///     .property("alpha", Prop::new(ValueOp::FromTo { from: 0.0, to: 1.0 }).duration(300.0))
///     .ease(EasingFunction::EaseOutQuad)
///     .build()?;
/// ```
pub struct TweenBuilder {
    targets: Vec<TargetRef>,
    props: Vec<(Rc<str>, Prop)>,
    timing: TimingOps,
    ease: Ease,
    yoyo: bool,
    flip_x: bool,
    flip_y: bool,
    loop_count: i64,
    loop_delay: f64,
    complete_delay: f64,
    paused: bool,
    use_frames: bool,
    time_scale: f64,
    persist: bool,
    offset: TimelineOffset,
    dispatcher: EventDispatcher<TweenEvent>,
}

impl Default for TweenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TweenBuilder {
    pub fn new() -> Self {
        Self::with_defaults(&TweenDefaults::default())
    }

    /// 以配置中的默认值为起点
    pub fn with_defaults(defaults: &TweenDefaults) -> Self {
        Self {
            targets: Vec::new(),
            props: Vec::new(),
            timing: TimingOps {
                delay: NumberOp::Fixed(defaults.delay),
                duration: NumberOp::Fixed(defaults.duration),
                hold: NumberOp::Fixed(defaults.hold),
                repeat: NumberOp::Fixed(defaults.repeat as f64),
                repeat_delay: NumberOp::Fixed(defaults.repeat_delay),
            },
            ease: defaults.ease.into(),
            yoyo: defaults.yoyo,
            flip_x: defaults.flip_x,
            flip_y: defaults.flip_y,
            loop_count: defaults.loop_count,
            loop_delay: defaults.loop_delay,
            complete_delay: defaults.complete_delay,
            paused: false,
            use_frames: defaults.use_frames,
            time_scale: 1.0,
            persist: defaults.persist,
            offset: TimelineOffset::Sequential,
            dispatcher: EventDispatcher::new(),
        }
    }

    // ========== 目标与属性 ==========

    pub fn target<T: Animatable>(mut self, target: &Rc<T>) -> Self {
        self.targets.push(TargetRef::new(target));
        self
    }

    pub fn target_ref(mut self, target: TargetRef) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = TargetRef>) -> Self {
        self.targets.extend(targets);
        self
    }

    /// 添加动画属性（同名属性按添加顺序各自生成单元）
    pub fn property(mut self, key: &str, prop: impl Into<Prop>) -> Self {
        self.props.push((Rc::from(key), prop.into()));
        self
    }

    // ========== 时间参数 ==========

    pub fn delay(mut self, delay: impl Into<NumberOp>) -> Self {
        self.timing.delay = delay.into();
        self
    }

    pub fn duration(mut self, duration: impl Into<NumberOp>) -> Self {
        self.timing.duration = duration.into();
        self
    }

    pub fn hold(mut self, hold: impl Into<NumberOp>) -> Self {
        self.timing.hold = hold.into();
        self
    }

    /// 每个属性的重复次数，-1 表示无限
    pub fn repeat(mut self, repeat: i64) -> Self {
        self.timing.repeat = NumberOp::Fixed(repeat as f64);
        self
    }

    pub fn repeat_delay(mut self, repeat_delay: impl Into<NumberOp>) -> Self {
        self.timing.repeat_delay = repeat_delay.into();
        self
    }

    pub fn ease(mut self, ease: impl Into<Ease>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn yoyo(mut self, yoyo: bool) -> Self {
        self.yoyo = yoyo;
        self
    }

    pub fn flip_x(mut self, flip_x: bool) -> Self {
        self.flip_x = flip_x;
        self
    }

    pub fn flip_y(mut self, flip_y: bool) -> Self {
        self.flip_y = flip_y;
        self
    }

    // ========== 聚合参数 ==========

    /// 整体循环次数，-1 表示无限
    pub fn looping(mut self, count: i64) -> Self {
        self.loop_count = count;
        self
    }

    pub fn loop_delay(mut self, delay: f64) -> Self {
        self.loop_delay = delay;
        self
    }

    pub fn complete_delay(mut self, delay: f64) -> Self {
        self.complete_delay = delay;
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// 按帧计时：每次 update 固定推进 1
    pub fn use_frames(mut self, use_frames: bool) -> Self {
        self.use_frames = use_frames;
        self
    }

    pub fn time_scale(mut self, scale: f64) -> Self {
        self.time_scale = scale;
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// 在 Timeline 中的起始偏移
    pub fn offset(mut self, offset: TimelineOffset) -> Self {
        self.offset = offset;
        self
    }

    // ========== 事件 ==========

    pub fn on(mut self, kind: TweenEventKind, listener: impl FnMut(&TweenEvent) + 'static) -> Self {
        self.dispatcher.on(kind, listener);
        self
    }

    pub fn callback(
        mut self,
        kind: TweenEventKind,
        callback: impl FnMut(&TweenEvent) + 'static,
    ) -> Self {
        self.dispatcher.set_callback(kind, callback);
        self
    }

    /// 构建 Tween
    ///
    /// 单元按“属性在外、目标在内”的顺序创建。
    pub fn build(self) -> TweenResult<Tween> {
        if self.targets.is_empty() {
            return Err(TweenError::NoTargets);
        }
        if self.props.is_empty() {
            return Err(TweenError::NoProperties);
        }

        for (index, target) in self.targets.iter().enumerate() {
            let object = target
                .upgrade()
                .ok_or(TweenError::TargetDropped { index })?;
            for (key, _) in &self.props {
                if object.get_property(key).is_none() {
                    return Err(TweenError::UnknownProperty {
                        index,
                        key: key.to_string(),
                    });
                }
            }
        }

        let total = self.targets.len();
        let mut data = Vec::with_capacity(self.props.len() * total);
        for (key, prop) in &self.props {
            let spec = prop.resolve(&self);
            for (index, target) in self.targets.iter().enumerate() {
                data.push(TweenData::new(
                    target.clone(),
                    key.clone(),
                    index,
                    total,
                    spec.clone(),
                ));
            }
        }

        let options = TweenOptions {
            loop_count: self.loop_count,
            loop_delay: self.loop_delay,
            complete_delay: self.complete_delay,
            paused: self.paused,
            use_frames: self.use_frames,
            time_scale: self.time_scale,
            persist: self.persist,
            offset: self.offset,
            dispatcher: self.dispatcher,
        };

        Ok(Tween::from_parts(self.targets, data, options))
    }
}
