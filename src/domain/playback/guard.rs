//! 请求去重守卫

/// 单会话内最多一个进行中的合成请求
///
/// 发出请求时置位，收到响应（成功或失败）或会话关闭时清除
#[derive(Debug, Default)]
pub struct RequestGuard {
    held: bool,
}

impl RequestGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试置位，已置位时返回 false
    pub fn try_acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        true
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}
