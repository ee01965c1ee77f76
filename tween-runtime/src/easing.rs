//! # Easing 模块
//!
//! 缓动函数库，把线性进度映射为缓动后的进度。
//!
//! 输入总是先限制在 `[0, 1]`；输出不做限制，`Back`/`Elastic` 类曲线会越界。

use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// 线性（匀速）
    #[default]
    Linear,
    /// 同 `EaseInCubic`
    EaseIn,
    /// 同 `EaseOutCubic`
    EaseOut,
    /// 同 `EaseInOutCubic`
    EaseInOut,
    /// 二次缓入
    EaseInQuad,
    /// 二次缓出
    EaseOutQuad,
    /// 二次缓入缓出
    EaseInOutQuad,
    /// 三次缓入
    EaseInCubic,
    /// 三次缓出
    EaseOutCubic,
    /// 三次缓入缓出
    EaseInOutCubic,
    /// 正弦缓入
    EaseInSine,
    /// 正弦缓出
    EaseOutSine,
    /// 正弦缓入缓出
    EaseInOutSine,
    /// 回弹缓入（起点处先反向）
    EaseInBack,
    /// 回弹缓出（终点处越过再返回）
    EaseOutBack,
    /// 弹性缓出
    EaseOutElastic,
    /// 弹跳缓出
    EaseOutBounce,
}

impl EasingFunction {
    /// 全部内置曲线
    pub const ALL: [EasingFunction; 17] = [
        EasingFunction::Linear,
        EasingFunction::EaseIn,
        EasingFunction::EaseOut,
        EasingFunction::EaseInOut,
        EasingFunction::EaseInQuad,
        EasingFunction::EaseOutQuad,
        EasingFunction::EaseInOutQuad,
        EasingFunction::EaseInCubic,
        EasingFunction::EaseOutCubic,
        EasingFunction::EaseInOutCubic,
        EasingFunction::EaseInSine,
        EasingFunction::EaseOutSine,
        EasingFunction::EaseInOutSine,
        EasingFunction::EaseInBack,
        EasingFunction::EaseOutBack,
        EasingFunction::EaseOutElastic,
        EasingFunction::EaseOutBounce,
    ];

    /// 计算缓动值，`t` 先限制到 `[0, 1]`
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);

        match self {
            EasingFunction::Linear => t,
            // 未注明阶数的 In/Out 系列按三次处理
            EasingFunction::EaseIn | EasingFunction::EaseInCubic => cubic(t),
            EasingFunction::EaseOut | EasingFunction::EaseOutCubic => mirror(cubic, t),
            EasingFunction::EaseInOut | EasingFunction::EaseInOutCubic => symmetric(cubic, t),
            EasingFunction::EaseInQuad => quad(t),
            EasingFunction::EaseOutQuad => mirror(quad, t),
            EasingFunction::EaseInOutQuad => symmetric(quad, t),
            EasingFunction::EaseInSine => sine(t),
            EasingFunction::EaseOutSine => (t * PI / 2.0).sin(),
            EasingFunction::EaseInOutSine => (1.0 - (PI * t).cos()) / 2.0,
            EasingFunction::EaseInBack => back(t),
            EasingFunction::EaseOutBack => mirror(back, t),
            EasingFunction::EaseOutElastic => elastic_out(t),
            EasingFunction::EaseOutBounce => bounce_out(t),
        }
    }
}

fn quad(t: f64) -> f64 {
    t * t
}

fn cubic(t: f64) -> f64 {
    t * t * t
}

fn sine(t: f64) -> f64 {
    1.0 - (t * PI / 2.0).cos()
}

/// 起点处先反向再加速
fn back(t: f64) -> f64 {
    const OVERSHOOT: f64 = 1.70158;
    (OVERSHOOT + 1.0) * t * t * t - OVERSHOOT * t * t
}

/// 由缓入曲线得到缓出曲线
fn mirror(ease_in: fn(f64) -> f64, t: f64) -> f64 {
    1.0 - ease_in(1.0 - t)
}

/// 前半段缓入，后半段缓出
fn symmetric(ease_in: fn(f64) -> f64, t: f64) -> f64 {
    if t < 0.5 {
        ease_in(2.0 * t) / 2.0
    } else {
        1.0 - ease_in(2.0 - 2.0 * t) / 2.0
    }
}

fn elastic_out(t: f64) -> f64 {
    if t <= 0.0 || t >= 1.0 {
        return t;
    }
    let period = (2.0 * PI) / 3.0;
    2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * period).sin() + 1.0
}

/// 四段抛物线
fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;

    let (shift, floor) = if t < 1.0 / D {
        (0.0, 0.0)
    } else if t < 2.0 / D {
        (1.5, 0.75)
    } else if t < 2.5 / D {
        (2.25, 0.9375)
    } else {
        (2.625, 0.984375)
    };
    let t = t - shift / D;
    N * t * t + floor
}

/// TweenData 使用的缓动曲线
///
/// 内置曲线或调用方提供的任意纯函数 `progress -> eased`。
#[derive(Clone)]
pub enum Ease {
    /// 内置曲线
    Named(EasingFunction),
    /// 自定义曲线
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl Ease {
    /// 线性曲线
    pub fn linear() -> Self {
        Self::Named(EasingFunction::Linear)
    }

    /// 从闭包创建自定义曲线
    pub fn custom(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Self::Custom(Rc::new(f))
    }

    /// 计算缓动值
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Ease::Named(easing) => easing.apply(t),
            Ease::Custom(f) => f(t),
        }
    }
}

impl Default for Ease {
    fn default() -> Self {
        Self::linear()
    }
}

impl From<EasingFunction> for Ease {
    fn from(easing: EasingFunction) -> Self {
        Self::Named(easing)
    }
}

impl fmt::Debug for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ease::Named(easing) => write!(f, "Ease::{:?}", easing),
            Ease::Custom(_) => f.write_str("Ease::Custom(..)"),
        }
    }
}
