//! # Config 模块
//!
//! 引擎配置：全局时间缩放、seek 步长，以及新建 Tween 的默认参数。
//!
//! ## 配置优先级
//!
//! 1. 构建器上显式设置的值（最高）
//! 2. 配置文件中的 `defaults`
//! 3. 内置默认值（最低）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::easing::EasingFunction;
use crate::error::ConfigError;
use crate::tween::DEFAULT_SEEK_STEP;

/// 引擎配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// 管理器的全局时间缩放
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// `TweenManager::seek` 使用的步长（毫秒）
    #[serde(default = "default_seek_step")]
    pub seek_step: f64,

    /// 新建 Tween 的默认参数
    #[serde(default)]
    pub defaults: TweenDefaults,
}

/// Tween 默认参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TweenDefaults {
    #[serde(default = "default_duration")]
    pub duration: f64,
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub hold: f64,
    /// 每个属性的重复次数，-1 表示无限
    #[serde(default)]
    pub repeat: i64,
    #[serde(default)]
    pub repeat_delay: f64,
    #[serde(default)]
    pub ease: EasingFunction,
    #[serde(default)]
    pub yoyo: bool,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
    /// 整体循环次数，-1 表示无限
    #[serde(default, rename = "loop")]
    pub loop_count: i64,
    #[serde(default)]
    pub loop_delay: f64,
    #[serde(default)]
    pub complete_delay: f64,
    #[serde(default)]
    pub use_frames: bool,
    /// 移除后是否保留（可 restart）
    #[serde(default)]
    pub persist: bool,
}

fn default_time_scale() -> f64 {
    1.0
}

fn default_seek_step() -> f64 {
    DEFAULT_SEEK_STEP
}

fn default_duration() -> f64 {
    1000.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_scale: default_time_scale(),
            seek_step: default_seek_step(),
            defaults: TweenDefaults::default(),
        }
    }
}

impl Default for TweenDefaults {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            delay: 0.0,
            hold: 0.0,
            repeat: 0,
            repeat_delay: 0.0,
            ease: EasingFunction::Linear,
            yoyo: false,
            flip_x: false,
            flip_y: false,
            loop_count: 0,
            loop_delay: 0.0,
            complete_delay: 0.0,
            use_frames: false,
            persist: false,
        }
    }
}

impl EngineConfig {
    /// 从文件加载配置
    ///
    /// 文件不存在、无法读取或无法解析时使用默认配置。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::from_json(&content) {
                Ok(config) => {
                    debug!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::SerializationFailed(e.to_string()))
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "time_scale 必须是不小于 0 的有限数".to_string(),
            ));
        }

        if !self.seek_step.is_finite() || self.seek_step <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "seek_step 必须大于 0".to_string(),
            ));
        }

        let d = &self.defaults;
        if !d.duration.is_finite() || d.duration <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "默认 duration 必须大于 0".to_string(),
            ));
        }

        let delays = [
            ("delay", d.delay),
            ("hold", d.hold),
            ("repeat_delay", d.repeat_delay),
            ("loop_delay", d.loop_delay),
            ("complete_delay", d.complete_delay),
        ];
        for (name, value) in delays {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "默认 {} 不能为负数",
                    name
                )));
            }
        }

        Ok(())
    }
}
