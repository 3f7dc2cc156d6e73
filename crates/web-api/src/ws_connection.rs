use std::sync::Arc;

use application::{ChatBroker, SinkId, Subscriber};
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{IncomingMessage, RoomId, SenderRole};
use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::state::AppState;

/// 连接订阅的目标
#[derive(Debug, Clone, Copy)]
enum Subscription {
    /// 聊天室参与者，入站文本以 `role` 身份发送到房间
    Room { room_id: RoomId, role: SenderRole },
    /// 客服面板通知流，入站文本被忽略
    Notifications,
}

/// WebSocket 连接管理器
///
/// 封装单个 WebSocket 连接的所有状态和逻辑，包括：
/// - 出站：中转核心投递到本连接队列的负载，由发送任务写入 socket
/// - 入站：解析客户端消息并交给中转核心
/// - 资源清理：无论连接如何结束都会取消订阅
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    subscriber: Subscriber,
    outbound: mpsc::UnboundedReceiver<String>,
    guard: SubscriptionGuard,
}

impl WebSocketConnection {
    /// 聊天室连接（客户或客服）。房间不存在时直接关闭连接。
    pub async fn serve_room(mut socket: WebSocket, state: AppState, room_id: String, role: SenderRole) {
        let room_id = match room_id.parse::<RoomId>() {
            Ok(room_id) => room_id,
            Err(_) => {
                tracing::error!(room_id = %room_id, "Chat room not found");
                let _ = socket.send(WsMessage::Close(None)).await;
                return;
            }
        };

        let (subscriber, outbound) = Subscriber::channel();
        if let Err(err) = state.broker.subscribe(room_id, &subscriber).await {
            tracing::error!(room_id = %room_id, error = %err, "Chat room not found");
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }

        let subscription = Subscription::Room { room_id, role };
        tracing::info!(room_id = %room_id, sink_id = %subscriber.id, %role, "WebSocket 连接已建立");

        Self::new(socket, state, subscriber, outbound, subscription)
            .run()
            .await;
    }

    /// 客服面板通知连接
    pub async fn serve_notifications(socket: WebSocket, state: AppState) {
        let (subscriber, outbound) = Subscriber::channel();
        if let Err(err) = state.broker.subscribe_notifications(&subscriber).await {
            tracing::error!(error = %err, "Failed to subscribe notifications");
            return;
        }

        tracing::info!(sink_id = %subscriber.id, "通知 WebSocket 连接已建立");
        Self::new(socket, state, subscriber, outbound, Subscription::Notifications)
            .run()
            .await;
    }

    fn new(
        socket: WebSocket,
        state: AppState,
        subscriber: Subscriber,
        outbound: mpsc::UnboundedReceiver<String>,
        subscription: Subscription,
    ) -> Self {
        let guard = SubscriptionGuard::new(state.broker.clone(), subscriber.id, subscription);
        Self {
            socket,
            state,
            subscriber,
            outbound,
            guard,
        }
    }

    /// 运行 WebSocket 连接的主循环，任一方向结束即视为连接断开
    async fn run(self) {
        let Self {
            socket,
            state,
            subscriber,
            mut outbound,
            guard,
        } = self;
        let sink_id = subscriber.id;
        let subscription = guard.subscription;

        let (mut sender, mut incoming) = socket.split();

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(payload) = outbound.recv() => {
                        if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                            tracing::warn!(sink_id = %sink_id, "Failed to send text message");
                            break;
                        }
                    }
                    Some(cmd) = cmd_rx.recv() => {
                        match cmd {
                            WsCommand::SendPong(data) => {
                                if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                                    tracing::warn!(sink_id = %sink_id, "Failed to send pong message");
                                    break;
                                }
                            }
                        }
                    }
                    else => break,
                }
            }
            tracing::debug!(sink_id = %sink_id, "WebSocket发送任务结束");
        });

        // 接收任务：处理来自WebSocket客户端的消息
        let recv = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                if Self::handle_incoming(&state, sink_id, subscription, message, &cmd_tx)
                    .await
                    .is_err()
                {
                    break;
                }
            }
            tracing::debug!(sink_id = %sink_id, "WebSocket接收任务结束");
        });

        // 连接 future 被取消时随之中止，避免房间已退订后仍有入站消息写入
        let mut tasks = ConnectionTasks { send, recv };

        // 等待任意一个任务完成（连接断开）
        tokio::select! {
            _ = &mut tasks.send => {}
            _ = &mut tasks.recv => {}
        }

        drop(tasks);
        guard.release().await;

        tracing::info!(sink_id = %sink_id, "WebSocket连接已断开，订阅已清理");
    }

    /// 处理来自客户端的消息
    ///
    /// 返回 `Err` 表示应结束连接。
    async fn handle_incoming(
        state: &AppState,
        sink_id: SinkId,
        subscription: Option<Subscription>,
        message: WsMessage,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => {
                tracing::debug!(sink_id = %sink_id, "WebSocket收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                if cmd_tx
                    .send(WsCommand::SendPong(data.to_vec()))
                    .await
                    .is_err()
                {
                    tracing::warn!(sink_id = %sink_id, "Failed to send pong command");
                    return Err(());
                }
            }
            WsMessage::Pong(_) | WsMessage::Binary(_) => {}
            WsMessage::Text(text) => {
                if let Some(Subscription::Room { room_id, role }) = subscription {
                    return Self::forward_text(state, sink_id, room_id, role, text.as_str()).await;
                }
            }
        }
        Ok(())
    }

    /// 解析入站文本并发送到聊天室。无效 JSON 只记录日志，不断开连接。
    async fn forward_text(
        state: &AppState,
        sink_id: SinkId,
        room_id: RoomId,
        role: SenderRole,
        text: &str,
    ) -> Result<(), ()> {
        let incoming = match IncomingMessage::parse(text) {
            Ok(incoming) => incoming,
            Err(err) => {
                tracing::error!(
                    room_id = %room_id,
                    sink_id = %sink_id,
                    error = %err,
                    data = %text,
                    "Invalid JSON"
                );
                return Ok(());
            }
        };

        match state.broker.send(room_id, incoming.into_message(role)).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_room_not_found() => {
                tracing::warn!(room_id = %room_id, sink_id = %sink_id, "聊天室已回收，关闭连接");
                Err(())
            }
            Err(err) => {
                tracing::error!(room_id = %room_id, error = %err, "Failed to send message");
                Ok(())
            }
        }
    }
}

/// 连接的读写任务，被丢弃时一并中止
struct ConnectionTasks {
    send: JoinHandle<()>,
    recv: JoinHandle<()>,
}

impl Drop for ConnectionTasks {
    fn drop(&mut self) {
        self.send.abort();
        self.recv.abort();
    }
}

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Vec<u8>),
}

/// 连接结束时取消订阅。
///
/// 正常路径调用 [`SubscriptionGuard::release`]；连接 future 被取消时由 `Drop`
/// 在当前运行时上派生清理任务。
struct SubscriptionGuard {
    broker: Arc<ChatBroker>,
    sink_id: SinkId,
    subscription: Option<Subscription>,
}

impl SubscriptionGuard {
    fn new(broker: Arc<ChatBroker>, sink_id: SinkId, subscription: Subscription) -> Self {
        Self {
            broker,
            sink_id,
            subscription: Some(subscription),
        }
    }

    async fn release(mut self) {
        if let Some(subscription) = self.subscription.take() {
            cleanup(&self.broker, self.sink_id, subscription).await;
        }
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        let broker = self.broker.clone();
        let sink_id = self.sink_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { cleanup(&broker, sink_id, subscription).await });
            }
            Err(_) => {
                tracing::warn!(sink_id = %sink_id, "No runtime available, subscription not cleaned up");
            }
        }
    }
}

async fn cleanup(broker: &ChatBroker, sink_id: SinkId, subscription: Subscription) {
    match subscription {
        Subscription::Room { room_id, .. } => {
            if let Err(err) = broker.unsubscribe(room_id, sink_id).await {
                // 房间可能已被回收
                tracing::debug!(room_id = %room_id, sink_id = %sink_id, error = %err, "Unsubscribe skipped");
            }
        }
        Subscription::Notifications => broker.unsubscribe_notifications(sink_id).await,
    }
}
