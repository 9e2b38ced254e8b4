//! 渲染输出边界
//!
//! 核心只产出每个 tick 的 [`Renderable`] 快照，提交到宿主环境由实现
//! [`RenderSink`] 的外部协作者负责。

use crate::core::error::SinkResult;
use crate::particles::Renderable;

/// 接收每个 tick 的粒子快照
pub trait RenderSink {
    /// 提交一帧。返回错误时宿主记录日志并继续下一个 tick。
    fn submit(&mut self, frame: &[Renderable]) -> SinkResult<()>;
}

/// 丢弃所有帧
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn submit(&mut self, _frame: &[Renderable]) -> SinkResult<()> {
        Ok(())
    }
}

/// 保存最近一帧并统计提交次数
#[derive(Debug, Default, Clone)]
pub struct FrameRecorder {
    pub last_frame: Vec<Renderable>,
    pub frames: u64,
}

impl RenderSink for FrameRecorder {
    fn submit(&mut self, frame: &[Renderable]) -> SinkResult<()> {
        self.last_frame.clear();
        self.last_frame.extend_from_slice(frame);
        self.frames += 1;
        Ok(())
    }
}
