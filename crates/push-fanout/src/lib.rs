//! 推送扇出引擎
//!
//! 根据逻辑接收者（单个用户或群组）解析设备推送令牌，生成通知正文，
//! 按成员独立调用推送提供方，并把每个接收者的结果汇总成一次调用的结果。
//! 单个接收者失败不会中断整批投递。

pub mod directory;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod model;
pub mod notifier;
pub mod templates;

pub use directory::{GroupDirectory, MemoryDirectory, UserDirectory};
pub use dispatcher::{DeliveryReport, Dispatcher};
pub use engine::{FanoutEngine, FanoutOptions};
pub use error::{ErrorKind, FanoutError};
pub use model::{
    AttachmentNotification, AttachmentReceipt, BatchResult, DirectNotification, DispatchOutcome,
    Group, GroupNotification, NotificationRequest, User,
};
pub use notifier::{Notifier, PushMessage};
pub use templates::BodyTemplater;
