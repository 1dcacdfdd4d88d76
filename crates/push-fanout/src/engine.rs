//! 扇出调度引擎
//!
//! 单聊与群组共用同一条流水线：解析接收者 → 生成正文 → 逐个发送 → 汇总。
//! 群组成员的"解析 + 发送"彼此独立，以有上限的并发执行，完成顺序不作保证。
//! 整个调用受截止时间约束：到期后不再启动新的发送，返回已完成部分的结果。

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use push_shared::config::FanoutConfig;
use push_shared::observability::metrics;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::directory::{GroupDirectory, UserDirectory};
use crate::dispatcher::Dispatcher;
use crate::error::{ErrorKind, FanoutError, Result};
use crate::model::{
    AttachmentNotification, AttachmentReceipt, BatchResult, DirectNotification, DispatchOutcome,
    Group, GroupNotification, NotificationRequest, User,
};
use crate::templates::{self, BodyTemplater, CHAT_MESSAGE_TYPE, GROUP_MESSAGE_TYPE};

/// 扇出参数
#[derive(Debug, Clone, Copy)]
pub struct FanoutOptions {
    /// 同时进行的成员发送数上限
    pub max_concurrency: usize,
    /// 单次调度的默认截止时长
    pub deadline: Duration,
}

impl Default for FanoutOptions {
    fn default() -> Self {
        Self::from(&FanoutConfig::default())
    }
}

impl From<&FanoutConfig> for FanoutOptions {
    fn from(config: &FanoutConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            deadline: Duration::from_millis(config.deadline_ms),
        }
    }
}

/// 扇出调度引擎
///
/// 目录和推送能力都通过构造函数注入，便于测试替身替换。
#[derive(Clone)]
pub struct FanoutEngine {
    users: Arc<dyn UserDirectory>,
    groups: Arc<dyn GroupDirectory>,
    dispatcher: Dispatcher,
    options: FanoutOptions,
}

impl FanoutEngine {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        groups: Arc<dyn GroupDirectory>,
        dispatcher: Dispatcher,
        options: FanoutOptions,
    ) -> Self {
        Self {
            users,
            groups,
            dispatcher,
            options,
        }
    }

    pub fn options(&self) -> FanoutOptions {
        self.options
    }

    /// 统一入口：按请求类型路由到单聊或群组流水线
    pub async fn dispatch(&self, request: &NotificationRequest) -> Result<BatchResult> {
        let result = match request {
            NotificationRequest::Direct(direct) => self.dispatch_direct(direct).await,
            NotificationRequest::Group(group) => self.dispatch_group(group).await,
        };

        match &result {
            Ok(batch) => metrics::record_fanout(request.target(), "completed", batch.outcomes.len()),
            Err(e) => metrics::record_fanout(
                request.target(),
                e.kind().map(|k| k.as_str()).unwrap_or("error"),
                0,
            ),
        }

        result
    }

    /// 直接向设备令牌发送，不经过目录
    pub async fn notify_token(&self, token: &str, title: &str, body: &str) -> bool {
        self.dispatcher
            .send(token, title, body, CHAT_MESSAGE_TYPE)
            .await
    }

    /// 单聊调度
    ///
    /// 接收者不存在或没有令牌时直接返回错误，不会发起任何推送。
    #[instrument(skip_all, fields(recipient_id = %request.recipient_id))]
    pub async fn dispatch_direct(&self, request: &DirectNotification) -> Result<BatchResult> {
        if request.recipient_id.trim().is_empty() {
            return Err(FanoutError::missing("recipientId"));
        }

        let user = self
            .lookup_user(&request.recipient_id)
            .await
            .ok_or_else(|| FanoutError::RecipientNotFound {
                recipient_id: request.recipient_id.clone(),
            })?;

        let token = user.push_token().ok_or_else(|| FanoutError::NoDeviceToken {
            recipient_id: request.recipient_id.clone(),
        })?;

        let body = BodyTemplater::resolve(request.body.as_deref(), request.message_type.as_deref());
        let message_type = request.message_type.as_deref().unwrap_or(CHAT_MESSAGE_TYPE);

        let report = self
            .dispatcher
            .deliver(token, &request.title, &body, message_type)
            .await;

        Ok(BatchResult::direct(DispatchOutcome::delivered(
            &request.recipient_id,
            report,
        )))
    }

    /// 群组调度，截止时间取默认配置
    pub async fn dispatch_group(&self, request: &GroupNotification) -> Result<BatchResult> {
        self.dispatch_group_until(request, Instant::now() + self.options.deadline)
            .await
    }

    /// 群组调度，调用方指定截止时间
    ///
    /// 群组存在即视为整体成功；成员缺失、没有令牌或提供方失败只记录在各自的结果中。
    /// 到达截止时间后未完成的成员发送被放弃，结果只包含已完成的成员。
    #[instrument(skip_all, fields(group_id = %request.group_id, sender_id = %request.sender_id))]
    pub async fn dispatch_group_until(
        &self,
        request: &GroupNotification,
        deadline: Instant,
    ) -> Result<BatchResult> {
        if request.group_id.trim().is_empty() {
            return Err(FanoutError::missing("groupId"));
        }

        let group = self
            .lookup_group(&request.group_id)
            .await
            .ok_or_else(|| FanoutError::GroupNotFound {
                group_id: request.group_id.clone(),
            })?;

        let receivers = group.receivers_excluding(&request.sender_id);
        if receivers.is_empty() {
            info!("群组中除发送者外没有其他成员");
            return Ok(BatchResult::group(Vec::new()));
        }

        let title = templates::group_title(request.group_name.as_deref(), group.name.as_deref());
        let text = BodyTemplater::resolve(request.body.as_deref(), request.message_type.as_deref());
        let body = templates::group_body(
            templates::sender_display_name(request.sender_name.as_deref()),
            &text,
        );

        let expected = receivers.len();
        let outcomes = self
            .fan_out(receivers, &title, &body, GROUP_MESSAGE_TYPE, deadline)
            .await;

        let result = BatchResult::group(outcomes);
        info!(
            receivers = expected,
            completed = result.outcomes.len(),
            sent = result.sent_count(),
            "群组通知处理完成"
        );

        Ok(result)
    }

    /// 附件上传后的通知
    ///
    /// 接收者必须存在；没有令牌时不推送，但上传本身仍视为成功。
    #[instrument(skip_all, fields(receiver_id = %request.receiver_id))]
    pub async fn dispatch_attachment(
        &self,
        request: &AttachmentNotification,
    ) -> Result<AttachmentReceipt> {
        if request.receiver_id.trim().is_empty() {
            return Err(FanoutError::missing("receiverId"));
        }

        let user = self
            .lookup_user(&request.receiver_id)
            .await
            .ok_or_else(|| FanoutError::RecipientNotFound {
                recipient_id: request.receiver_id.clone(),
            })?;

        let outcome = match user.push_token() {
            Some(token) => {
                let body = BodyTemplater::resolve(None, request.message_type.as_deref());
                let message_type = request.message_type.as_deref().unwrap_or(CHAT_MESSAGE_TYPE);
                let report = self
                    .dispatcher
                    .deliver(token, templates::ATTACHMENT_TITLE, &body, message_type)
                    .await;
                DispatchOutcome::delivered(&request.receiver_id, report)
            }
            None => {
                info!("接收者没有推送令牌，跳过附件通知");
                DispatchOutcome::unreachable(&request.receiver_id, ErrorKind::NoDeviceToken)
            }
        };

        Ok(AttachmentReceipt {
            file_ref: request.file_ref.clone(),
            notified: outcome.sent,
            outcome,
        })
    }

    /// 以有上限的并发向每个接收者发送，截止时间到达后停止收集
    async fn fan_out(
        &self,
        receivers: Vec<String>,
        title: &str,
        body: &str,
        message_type: &str,
        deadline: Instant,
    ) -> Vec<DispatchOutcome> {
        let expected = receivers.len();
        let mut pending = stream::iter(receivers)
            .map(|member_id| self.deliver_to_member(member_id, title, body, message_type))
            .buffer_unordered(self.options.max_concurrency.max(1));

        let mut outcomes = Vec::with_capacity(expected);
        let timeout = tokio::time::sleep_until(deadline);
        tokio::pin!(timeout);

        // 截止时间优先检查：到期后不再轮询 pending，也就不会启动新的发送
        loop {
            tokio::select! {
                biased;
                _ = &mut timeout => {
                    warn!(
                        expected,
                        completed = outcomes.len(),
                        "群组扇出到达截止时间，返回部分结果"
                    );
                    break;
                }
                next = pending.next() => match next {
                    Some(outcome) => outcomes.push(outcome),
                    None => break,
                },
            }
        }

        outcomes
    }

    /// 解析单个成员并发送；任何一步失败只影响该成员
    async fn deliver_to_member(
        &self,
        member_id: String,
        title: &str,
        body: &str,
        message_type: &str,
    ) -> DispatchOutcome {
        let Some(user) = self.lookup_user(&member_id).await else {
            return DispatchOutcome::unreachable(member_id, ErrorKind::RecipientNotFound);
        };

        let Some(token) = user.push_token() else {
            return DispatchOutcome::unreachable(member_id, ErrorKind::NoDeviceToken);
        };

        let report = self.dispatcher.deliver(token, title, body, message_type).await;
        DispatchOutcome::delivered(member_id, report)
    }

    /// 目录传输失败与不存在同等对待，仅额外记录告警
    async fn lookup_user(&self, id: &str) -> Option<User> {
        match self.users.get_user(id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user_id = %id, error = %e, "用户目录查询失败，按不存在处理");
                None
            }
        }
    }

    async fn lookup_group(&self, id: &str) -> Option<Group> {
        match self.groups.get_group(id).await {
            Ok(group) => group,
            Err(e) => {
                warn!(group_id = %id, error = %e, "群组目录查询失败，按不存在处理");
                None
            }
        }
    }
}
