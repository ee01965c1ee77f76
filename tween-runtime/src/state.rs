//! # State 模块
//!
//! Tween/Timeline 共用的聚合状态，以及倒计时状态的转移表。

/// 表示"无限"的重复/循环计数
///
/// `repeat = -1` 或 `loop = -1` 会被换成这个有限大数，
/// 这样有限和无限两种情况共用同一套递减逻辑。
pub const UNBOUNDED_COUNT: u64 = 999_999_999_999;

/// 把用户输入的重复/循环次数换成内部计数，负数表示无限
pub fn resolve_count(count: i64) -> u64 {
    if count < 0 {
        UNBOUNDED_COUNT
    } else {
        count as u64
    }
}

/// 聚合状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TweenState {
    /// 已创建，尚未初始化
    #[default]
    Created,
    /// 已初始化，尚未播放
    Init,
    /// 等待管理器下一次 `pre_update` 加入活动列表
    PendingAdd,
    /// 正在播放
    Playing,
    /// 两轮循环之间的等待
    LoopDelay,
    /// 在 Timeline 中等待自己的起始偏移
    OffsetDelay,
    /// 播放完成后、发出完成事件前的等待
    CompleteDelay,
    /// 等待管理器移除
    PendingRemove,
    /// 已从管理器移除
    Removed,
    /// 已销毁，不可再使用
    Destroyed,
}

/// 倒计时结束时触发的通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownNotice {
    Loop,
    Complete,
}

/// 倒计时状态的转移
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTransition {
    /// 倒计时结束后进入的状态
    pub next: TweenState,
    /// 倒计时结束时发出的通知
    pub notice: Option<CountdownNotice>,
}

impl TweenState {
    /// 倒计时状态的转移表，非倒计时状态返回 `None`
    pub fn countdown_transition(self) -> Option<CountdownTransition> {
        let (next, notice) = match self {
            TweenState::LoopDelay => (TweenState::Playing, Some(CountdownNotice::Loop)),
            TweenState::OffsetDelay => (TweenState::Playing, None),
            TweenState::CompleteDelay => {
                (TweenState::PendingRemove, Some(CountdownNotice::Complete))
            }
            _ => return None,
        };
        Some(CountdownTransition { next, notice })
    }

    /// 管理器需要移除
    pub fn is_pending_remove(self) -> bool {
        matches!(self, TweenState::PendingRemove | TweenState::Destroyed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_count() {
        assert_eq!(resolve_count(0), 0);
        assert_eq!(resolve_count(3), 3);
        assert_eq!(resolve_count(-1), UNBOUNDED_COUNT);
    }

    #[test]
    fn test_countdown_table() {
        let t = TweenState::LoopDelay.countdown_transition().unwrap();
        assert_eq!(t.next, TweenState::Playing);
        assert_eq!(t.notice, Some(CountdownNotice::Loop));

        let t = TweenState::OffsetDelay.countdown_transition().unwrap();
        assert_eq!(t.next, TweenState::Playing);
        assert_eq!(t.notice, None);

        let t = TweenState::CompleteDelay.countdown_transition().unwrap();
        assert_eq!(t.next, TweenState::PendingRemove);
        assert_eq!(t.notice, Some(CountdownNotice::Complete));

        assert!(TweenState::Playing.countdown_transition().is_none());
        assert!(TweenState::PendingRemove.countdown_transition().is_none());
    }
}
