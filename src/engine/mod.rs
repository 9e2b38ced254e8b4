//! 宿主驱动
//!
//! - `host` - 固定节拍的轮询循环，隔离单个 tick 的错误
//! - `sink` - 渲染输出边界

pub mod host;
pub mod sink;

pub use host::{FireworkHost, TickReport};
pub use sink::{FrameRecorder, NullSink, RenderSink};
