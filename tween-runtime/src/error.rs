//! # Error 模块
//!
//! 定义 tween-runtime 中使用的错误类型。
//!
//! 正常的逐帧推进不会产生错误：目标对象消失时对应的 TweenData 直接完成。
//! 这里的错误只出现在构建、解析、seek 参数校验和管理器句柄查找这些边界上。

use thiserror::Error;

/// 构建/控制错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TweenError {
    /// Tween 没有任何目标
    #[error("Tween 至少需要一个目标对象")]
    NoTargets,

    /// Tween 没有任何属性
    #[error("Tween 至少需要一个动画属性")]
    NoProperties,

    /// 构建时目标对象已被释放
    #[error("第 {index} 个目标对象已被释放")]
    TargetDropped { index: usize },

    /// 目标对象不存在该属性
    #[error("第 {index} 个目标对象没有属性 '{key}'")]
    UnknownProperty { index: usize, key: String },

    /// 无法解析的数值表达式
    #[error("无效的数值表达式 '{expr}'：{message}")]
    InvalidValueExpression { expr: String, message: String },

    /// 无法解析的 Timeline 偏移
    #[error("无效的 Timeline 偏移 '{expr}'")]
    InvalidOffset { expr: String },

    /// 无效的 seek 步长
    #[error("seek 步长必须是大于 0 的有限数，实际为 {step}")]
    InvalidSeekStep { step: f64 },

    /// 无效的 seek 位置
    #[error("seek 位置必须是有限数，实际为 {position}")]
    InvalidSeekPosition { position: f64 },

    /// 场景文件解析失败
    #[error("场景解析失败: {message}")]
    InvalidScenario { message: String },

    /// 场景引用了未定义的目标
    #[error("场景引用了未定义的目标 '{name}'")]
    UnknownTarget { name: String },

    /// 管理器中找不到对应的 Tween/Timeline
    #[error("找不到 {handle}")]
    NotFound { handle: String },
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),

    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
}

/// Result 类型别名
pub type TweenResult<T> = Result<T, TweenError>;
