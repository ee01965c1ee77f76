//! # Scenario 模块
//!
//! 声明式场景：用 JSON 描述目标对象、Tween 和 Timeline，再一次性加入管理器。
//!
//! ```json
//! {
//!   "targets": { "hero": { "x": 0, "alpha": 1 } },
//!   "tweens": [
//!     {
//!       "targets": ["hero"],
//!       "props": { "x": "+=100", "alpha": { "value": 0, "duration": 300 } },
//!       "ease": "ease_out_quad",
//!       "yoyo": true
//!     }
//!   ],
//!   "timelines": [
//!     { "loop": 1, "tweens": [ { "targets": ["hero"], "props": { "x": 0 }, "offset": "+=200" } ] }
//!   ]
//! }
//! ```
//!
//! 同一个 Tween 中的属性按声明顺序创建单元。

use std::collections::BTreeMap;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::easing::EasingFunction;
use crate::error::{TweenError, TweenResult};
use crate::manager::TweenManager;
use crate::target::PropertyBag;
use crate::timeline::{Timeline, TimelineId, TimelineOffset};
use crate::tween::{Prop, TweenBuilder, TweenId};
use crate::value::{NumberOp, ValueOp};

/// 属性值：数字、表达式字符串或固定起止值
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValueExpr {
    Number(f64),
    Expr(String),
    FromTo { from: f64, to: f64 },
}

impl ValueExpr {
    pub fn to_op(&self) -> TweenResult<ValueOp> {
        match self {
            ValueExpr::Number(v) => Ok(ValueOp::To(*v)),
            ValueExpr::Expr(expr) => ValueOp::parse(expr),
            ValueExpr::FromTo { from, to } => Ok(ValueOp::FromTo {
                from: *from,
                to: *to,
            }),
        }
    }
}

/// 时间参数：固定值或按目标索引错开
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TimingExpr {
    Fixed(f64),
    Stagger {
        stagger: f64,
        #[serde(default)]
        start: f64,
    },
}

impl TimingExpr {
    pub fn to_op(self) -> NumberOp {
        match self {
            TimingExpr::Fixed(v) => NumberOp::Fixed(v),
            TimingExpr::Stagger { stagger, start } => NumberOp::Stagger {
                start,
                each: stagger,
            },
        }
    }
}

/// 单个属性的配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PropConfig {
    /// 只给出值
    Value(ValueExpr),
    /// 带覆盖参数
    Detailed(PropDetail),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PropDetail {
    pub value: ValueExpr,
    pub duration: Option<TimingExpr>,
    pub delay: Option<TimingExpr>,
    pub hold: Option<TimingExpr>,
    pub repeat: Option<i64>,
    pub repeat_delay: Option<TimingExpr>,
    pub ease: Option<EasingFunction>,
    pub yoyo: Option<bool>,
    pub flip_x: Option<bool>,
    pub flip_y: Option<bool>,
}

impl PropConfig {
    fn to_prop(&self) -> TweenResult<Prop> {
        let detail = match self {
            PropConfig::Value(value) => return Ok(Prop::new(value.to_op()?)),
            PropConfig::Detailed(detail) => detail,
        };

        let mut prop = Prop::new(detail.value.to_op()?);
        if let Some(duration) = detail.duration {
            prop = prop.duration(duration.to_op());
        }
        if let Some(delay) = detail.delay {
            prop = prop.delay(delay.to_op());
        }
        if let Some(hold) = detail.hold {
            prop = prop.hold(hold.to_op());
        }
        if let Some(repeat) = detail.repeat {
            prop = prop.repeat(repeat);
        }
        if let Some(repeat_delay) = detail.repeat_delay {
            prop = prop.repeat_delay(repeat_delay.to_op());
        }
        if let Some(ease) = detail.ease {
            prop = prop.ease(ease);
        }
        if let Some(yoyo) = detail.yoyo {
            prop = prop.yoyo(yoyo);
        }
        if let Some(flip_x) = detail.flip_x {
            prop = prop.flip_x(flip_x);
        }
        if let Some(flip_y) = detail.flip_y {
            prop = prop.flip_y(flip_y);
        }
        Ok(prop)
    }
}

/// Timeline 偏移：绝对时间或 `"+=n"`/`"-=n"`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OffsetConfig {
    Absolute(f64),
    Expr(String),
}

impl OffsetConfig {
    pub fn to_offset(&self) -> TweenResult<TimelineOffset> {
        match self {
            OffsetConfig::Absolute(t) => Ok(TimelineOffset::Absolute(*t)),
            OffsetConfig::Expr(expr) => TimelineOffset::parse(expr),
        }
    }
}

/// Tween 配置，未给出的字段使用管理器默认值
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TweenConfig {
    pub targets: Vec<String>,
    pub props: IndexMap<String, PropConfig>,
    pub duration: Option<TimingExpr>,
    pub delay: Option<TimingExpr>,
    pub hold: Option<TimingExpr>,
    pub repeat: Option<i64>,
    pub repeat_delay: Option<TimingExpr>,
    pub ease: Option<EasingFunction>,
    pub yoyo: Option<bool>,
    pub flip_x: Option<bool>,
    pub flip_y: Option<bool>,
    #[serde(rename = "loop")]
    pub loop_count: Option<i64>,
    pub loop_delay: Option<f64>,
    pub complete_delay: Option<f64>,
    #[serde(default)]
    pub paused: bool,
    pub use_frames: Option<bool>,
    pub time_scale: Option<f64>,
    pub persist: Option<bool>,
    /// 只在 Timeline 中有意义
    pub offset: Option<OffsetConfig>,
}

/// Timeline 配置
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TimelineConfig {
    pub tweens: Vec<TweenConfig>,
    #[serde(default, rename = "loop")]
    pub loop_count: i64,
    #[serde(default)]
    pub loop_delay: f64,
    #[serde(default)]
    pub complete_delay: f64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub use_frames: bool,
    pub time_scale: Option<f64>,
    #[serde(default)]
    pub persist: bool,
}

/// 场景
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Scenario {
    /// 目标名 -> 属性初始值
    pub targets: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub tweens: Vec<TweenConfig>,
    #[serde(default)]
    pub timelines: Vec<TimelineConfig>,
}

/// `Scenario::instantiate` 的结果
#[derive(Debug)]
pub struct ScenarioInstance {
    /// 目标对象（由调用方持有，管理器只保存弱引用）
    pub targets: BTreeMap<String, Rc<PropertyBag>>,
    pub tweens: Vec<TweenId>,
    pub timelines: Vec<TimelineId>,
}

impl ScenarioInstance {
    /// 所有目标属性的当前值，键为 `目标.属性`
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.targets
            .iter()
            .flat_map(|(name, bag)| {
                bag.snapshot()
                    .into_iter()
                    .map(move |(key, value)| (format!("{}.{}", name, key), value))
            })
            .collect()
    }
}

impl Scenario {
    /// 解析 JSON
    pub fn from_json(json: &str) -> TweenResult<Self> {
        serde_json::from_str(json).map_err(|e| TweenError::InvalidScenario {
            message: e.to_string(),
        })
    }

    /// 在一个临时管理器中完整构建一遍，检查目标、属性和表达式
    pub fn validate(&self) -> TweenResult<()> {
        let mut manager = TweenManager::new();
        self.instantiate(&mut manager).map(|_| ())
    }

    /// 创建目标对象并把所有 Tween/Timeline 加入管理器
    pub fn instantiate(&self, manager: &mut TweenManager) -> TweenResult<ScenarioInstance> {
        let targets: BTreeMap<String, Rc<PropertyBag>> = self
            .targets
            .iter()
            .map(|(name, props)| {
                let bag: PropertyBag = props.iter().map(|(k, v)| (k.clone(), *v)).collect();
                (name.clone(), Rc::new(bag))
            })
            .collect();

        let mut tweens = Vec::with_capacity(self.tweens.len());
        for config in &self.tweens {
            let builder = tween_builder(config, &targets, manager)?;
            tweens.push(manager.create(builder)?);
        }

        let mut timelines = Vec::with_capacity(self.timelines.len());
        for config in &self.timelines {
            let mut timeline = Timeline::new()
                .with_loop(config.loop_count)
                .with_loop_delay(config.loop_delay)
                .with_complete_delay(config.complete_delay)
                .with_paused(config.paused)
                .with_use_frames(config.use_frames)
                .with_time_scale(config.time_scale.unwrap_or(1.0))
                .with_persist(config.persist);
            for tween in &config.tweens {
                timeline.add(tween_builder(tween, &targets, manager)?.build()?);
            }
            timelines.push(manager.add_timeline(timeline));
        }

        debug!(
            targets = targets.len(),
            tweens = tweens.len(),
            timelines = timelines.len(),
            "场景已加载"
        );

        Ok(ScenarioInstance {
            targets,
            tweens,
            timelines,
        })
    }
}

fn tween_builder(
    config: &TweenConfig,
    targets: &BTreeMap<String, Rc<PropertyBag>>,
    manager: &TweenManager,
) -> TweenResult<TweenBuilder> {
    let mut builder = manager.builder();

    for name in &config.targets {
        let bag = targets
            .get(name)
            .ok_or_else(|| TweenError::UnknownTarget { name: name.clone() })?;
        builder = builder.target(bag);
    }
    for (key, prop) in &config.props {
        builder = builder.property(key, prop.to_prop()?);
    }

    if let Some(duration) = config.duration {
        builder = builder.duration(duration.to_op());
    }
    if let Some(delay) = config.delay {
        builder = builder.delay(delay.to_op());
    }
    if let Some(hold) = config.hold {
        builder = builder.hold(hold.to_op());
    }
    if let Some(repeat) = config.repeat {
        builder = builder.repeat(repeat);
    }
    if let Some(repeat_delay) = config.repeat_delay {
        builder = builder.repeat_delay(repeat_delay.to_op());
    }
    if let Some(ease) = config.ease {
        builder = builder.ease(ease);
    }
    if let Some(yoyo) = config.yoyo {
        builder = builder.yoyo(yoyo);
    }
    if let Some(flip_x) = config.flip_x {
        builder = builder.flip_x(flip_x);
    }
    if let Some(flip_y) = config.flip_y {
        builder = builder.flip_y(flip_y);
    }
    if let Some(count) = config.loop_count {
        builder = builder.looping(count);
    }
    if let Some(delay) = config.loop_delay {
        builder = builder.loop_delay(delay);
    }
    if let Some(delay) = config.complete_delay {
        builder = builder.complete_delay(delay);
    }
    if let Some(use_frames) = config.use_frames {
        builder = builder.use_frames(use_frames);
    }
    if let Some(scale) = config.time_scale {
        builder = builder.time_scale(scale);
    }
    if let Some(persist) = config.persist {
        builder = builder.persist(persist);
    }
    if let Some(offset) = &config.offset {
        builder = builder.offset(offset.to_offset()?);
    }

    Ok(builder.paused(config.paused))
}
