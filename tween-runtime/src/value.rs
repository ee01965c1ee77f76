//! # Value 模块
//!
//! 数值生成器：TweenData 的起止值和时间参数都通过生成器求得。
//!
//! - `NumberOp`: delay/duration/hold/repeat/repeatDelay 的生成器
//! - `ValueOp`: 起止值的声明方式，构建时转换为 `ValueGenerators`
//!
//! 生成器可以有状态或依赖目标索引，所以引擎在 init、loop、seek 时会重新调用，
//! 而不是缓存第一次的结果。生成器必须返回有限数，引擎不做校验。

use std::fmt;
use std::rc::Rc;

use crate::error::{TweenError, TweenResult};
use crate::target::Animatable;

/// 生成器闭包
pub type ValueFn = Rc<dyn Fn(&GenContext<'_>) -> f64>;

/// 生成器调用上下文
pub struct GenContext<'a> {
    /// 目标对象
    pub target: &'a dyn Animatable,
    /// 属性名
    pub key: &'a str,
    /// 输入值：起始值生成器拿到的是属性当前值（或上一轮起始值），
    /// 结束值生成器拿到的是刚求得的起始值，时间生成器固定为 0
    pub value: f64,
    /// 目标在 Tween 目标列表中的索引
    pub index: usize,
    /// 目标总数
    pub total_targets: usize,
}

/// 时间参数生成器
#[derive(Clone)]
pub enum NumberOp {
    /// 固定值
    Fixed(f64),
    /// 按目标索引错开：`start + index * each`
    Stagger { start: f64, each: f64 },
    /// 自定义
    Func(ValueFn),
}

impl NumberOp {
    /// 从闭包创建
    pub fn func(f: impl Fn(&GenContext<'_>) -> f64 + 'static) -> Self {
        Self::Func(Rc::new(f))
    }

    /// 求值
    pub fn resolve(&self, ctx: &GenContext<'_>) -> f64 {
        match self {
            NumberOp::Fixed(v) => *v,
            NumberOp::Stagger { start, each } => start + ctx.index as f64 * each,
            NumberOp::Func(f) => f(ctx),
        }
    }
}

impl From<f64> for NumberOp {
    fn from(value: f64) -> Self {
        Self::Fixed(value)
    }
}

impl fmt::Debug for NumberOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberOp::Fixed(v) => write!(f, "Fixed({})", v),
            NumberOp::Stagger { start, each } => write!(f, "Stagger({} + i * {})", start, each),
            NumberOp::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// 起始值/结束值/激活值生成器组
#[derive(Clone)]
pub struct ValueGenerators {
    /// 起始值
    pub start: ValueFn,
    /// 结束值（输入为起始值）
    pub end: ValueFn,
    /// 激活值：init 时立即写入目标，与起始值无关
    pub active: Option<ValueFn>,
}

impl ValueGenerators {
    /// 起始值沿用输入值，结束值由 `end` 计算
    pub fn with_end(end: impl Fn(&GenContext<'_>) -> f64 + 'static) -> Self {
        Self {
            start: Rc::new(|ctx: &GenContext<'_>| ctx.value),
            end: Rc::new(end),
            active: None,
        }
    }
}

impl fmt::Debug for ValueGenerators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueGenerators")
            .field("active", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

/// 属性值的声明方式
#[derive(Clone)]
pub enum ValueOp {
    /// 从当前值过渡到绝对值
    To(f64),
    /// 结束值 = 起始值 + n（`"+=n"`）
    Add(f64),
    /// 结束值 = 起始值 - n（`"-=n"`）
    Sub(f64),
    /// 结束值 = 起始值 * n（`"*=n"`）
    Mul(f64),
    /// 结束值 = 起始值 / n（`"/=n"`）
    Div(f64),
    /// 固定起止值
    FromTo { from: f64, to: f64 },
    /// 结束值由闭包计算，起始值沿用当前值
    Func(ValueFn),
    /// 完全自定义
    Custom(ValueGenerators),
}

impl ValueOp {
    /// 解析数值表达式
    ///
    /// 支持 `"100"`、`"+=100"`、`"-=10"`、`"*=2"`、`"/=4"`。
    pub fn parse(expr: &str) -> TweenResult<Self> {
        let trimmed = expr.trim();
        let invalid = |message: &str| TweenError::InvalidValueExpression {
            expr: expr.to_string(),
            message: message.to_string(),
        };

        let (op, rest) = match trimmed.get(..2) {
            Some(prefix @ ("+=" | "-=" | "*=" | "/=")) => (Some(prefix), &trimmed[2..]),
            _ => (None, trimmed),
        };

        let n: f64 = rest
            .trim()
            .parse()
            .map_err(|_| invalid("不是合法的数字"))?;
        if !n.is_finite() {
            return Err(invalid("数值必须是有限数"));
        }

        Ok(match op {
            Some("+=") => ValueOp::Add(n),
            Some("-=") => ValueOp::Sub(n),
            Some("*=") => ValueOp::Mul(n),
            Some("/=") => {
                if n == 0.0 {
                    return Err(invalid("除数不能为 0"));
                }
                ValueOp::Div(n)
            }
            _ => ValueOp::To(n),
        })
    }

    /// 从闭包创建
    pub fn func(f: impl Fn(&GenContext<'_>) -> f64 + 'static) -> Self {
        Self::Func(Rc::new(f))
    }

    /// 转换为生成器组
    pub fn into_generators(self) -> ValueGenerators {
        match self {
            ValueOp::To(v) => ValueGenerators::with_end(move |_| v),
            ValueOp::Add(n) => ValueGenerators::with_end(move |ctx| ctx.value + n),
            ValueOp::Sub(n) => ValueGenerators::with_end(move |ctx| ctx.value - n),
            ValueOp::Mul(n) => ValueGenerators::with_end(move |ctx| ctx.value * n),
            ValueOp::Div(n) => ValueGenerators::with_end(move |ctx| ctx.value / n),
            ValueOp::FromTo { from, to } => ValueGenerators {
                start: Rc::new(move |_: &GenContext<'_>| from),
                end: Rc::new(move |_: &GenContext<'_>| to),
                active: None,
            },
            ValueOp::Func(end) => ValueGenerators {
                start: Rc::new(|ctx: &GenContext<'_>| ctx.value),
                end,
                active: None,
            },
            ValueOp::Custom(generators) => generators,
        }
    }
}

impl From<f64> for ValueOp {
    fn from(value: f64) -> Self {
        Self::To(value)
    }
}

impl fmt::Debug for ValueOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueOp::To(v) => write!(f, "To({})", v),
            ValueOp::Add(v) => write!(f, "Add({})", v),
            ValueOp::Sub(v) => write!(f, "Sub({})", v),
            ValueOp::Mul(v) => write!(f, "Mul({})", v),
            ValueOp::Div(v) => write!(f, "Div({})", v),
            ValueOp::FromTo { from, to } => write!(f, "FromTo({} -> {})", from, to),
            ValueOp::Func(_) => f.write_str("Func(..)"),
            ValueOp::Custom(g) => write!(f, "Custom({:?})", g),
        }
    }
}
