//! # Target 模块
//!
//! 动画目标接口。
//!
//! ## 核心概念
//!
//! - `Animatable`: 可动画对象接口，引擎通过属性名读写 f64 属性
//! - `TargetRef`: 引擎持有的弱引用句柄，目标被释放后自动失效
//! - `PropertyBag`: 基于属性表的简单 `Animatable` 实现
//!
//! ## 所有权
//!
//! 目标对象不归引擎所有。调用方持有 `Rc<T>`，Tween 只保存 `Weak`：
//! 调用方释放对象后，相应的 TweenData 在下一次推进时直接完成，
//! 不会出现悬垂引用。

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// 可动画对象接口
///
/// 对象通过实现此 trait 暴露可被 Tween 驱动的数值属性。
/// 方法接收 `&self`，实现方使用内部可变性（`Cell`/`RefCell`）。
///
/// ## 实现示例
///
/// ```rust,ignore
/// struct Sprite {
///     x: Cell<f64>,
///     alpha: Cell<f64>,
/// }
///
/// impl Animatable for Sprite {
///     fn get_property(&self, key: &str) -> Option<f64> {
///         match key {
///             "x" => Some(self.x.get()),
///             "alpha" => Some(self.alpha.get()),
///             _ => None,
///         }
///     }
///
///     fn set_property(&self, key: &str, value: f64) -> bool {
///         match key {
///             "x" => { self.x.set(value); true }
///             "alpha" => { self.alpha.set(value); true }
///             _ => false,
///         }
///     }
/// }
/// ```
pub trait Animatable: 'static {
    /// 获取属性的当前值
    ///
    /// # 返回
    /// - `Some(value)`: 属性存在
    /// - `None`: 属性不存在
    fn get_property(&self, key: &str) -> Option<f64>;

    /// 设置属性的新值
    ///
    /// # 返回
    /// - `true`: 设置成功
    /// - `false`: 属性不存在或设置失败
    fn set_property(&self, key: &str, value: f64) -> bool;

    /// 水平翻转（yoyo/repeat 时由 `flip_x` 触发）
    fn toggle_flip_x(&self) {}

    /// 垂直翻转（yoyo/repeat 时由 `flip_y` 触发）
    fn toggle_flip_y(&self) {}
}

/// 目标对象的弱引用句柄
#[derive(Clone)]
pub struct TargetRef {
    inner: Weak<dyn Animatable>,
}

impl TargetRef {
    /// 从调用方持有的 `Rc` 创建句柄
    pub fn new<T: Animatable>(target: &Rc<T>) -> Self {
        let target: Rc<dyn Animatable> = target.clone();
        Self {
            inner: Rc::downgrade(&target),
        }
    }

    /// 不指向任何对象的句柄
    pub fn detached() -> Self {
        let inner: Weak<dyn Animatable> = Weak::<PropertyBag>::new();
        Self { inner }
    }

    /// 尝试获取目标对象
    ///
    /// 目标已被释放时返回 `None`。
    pub fn upgrade(&self) -> Option<Rc<dyn Animatable>> {
        self.inner.upgrade()
    }

    /// 目标是否仍然存在
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// 是否指向同一个对象
    pub fn same_target(&self, other: &TargetRef) -> bool {
        std::ptr::addr_eq(self.inner.as_ptr(), other.inner.as_ptr())
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRef")
            .field("ptr", &(self.inner.as_ptr() as *const ()))
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// 属性表目标
///
/// 只接受创建时声明过的属性，写入未知属性返回 `false`。
#[derive(Debug, Default)]
pub struct PropertyBag {
    values: RefCell<BTreeMap<String, f64>>,
    flip_x: Cell<bool>,
    flip_y: Cell<bool>,
}

impl PropertyBag {
    /// 创建空属性表
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明属性及其初始值
    pub fn with(self, key: impl Into<String>, value: f64) -> Self {
        self.values.borrow_mut().insert(key.into(), value);
        self
    }

    /// 读取属性
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.borrow().get(key).copied()
    }

    /// 当前所有属性的快照
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values.borrow().clone()
    }

    /// 水平翻转状态
    pub fn flip_x(&self) -> bool {
        self.flip_x.get()
    }

    /// 垂直翻转状态
    pub fn flip_y(&self) -> bool {
        self.flip_y.get()
    }
}

impl FromIterator<(String, f64)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: RefCell::new(iter.into_iter().collect()),
            ..Self::default()
        }
    }
}

impl Animatable for PropertyBag {
    fn get_property(&self, key: &str) -> Option<f64> {
        self.get(key)
    }

    fn set_property(&self, key: &str, value: f64) -> bool {
        match self.values.borrow_mut().get_mut(key) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn toggle_flip_x(&self) {
        self.flip_x.set(!self.flip_x.get());
    }

    fn toggle_flip_y(&self) {
        self.flip_y.set(!self.flip_y.get());
    }
}
