use async_trait::async_trait;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Something that accepts a request and eventually answers it.
#[async_trait]
pub trait CommandSink {
    type Request;
    type Response;

    async fn command(&self, request: Self::Request) -> Self::Response;
}

/// A long-running unit of work. Tasks are started by the binary and run until
/// their work is done or the cancellation token fires.
#[async_trait]
pub trait Task {
    fn name(&self) -> &'static str;

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()>;
}

pub type Command<Req, Res> = (Req, oneshot::Sender<anyhow::Result<Res>>);
pub type ChannelCommandSink<Req, Res> = flume::Sender<Command<Req, Res>>;
pub type ChannelCommandSource<Req, Res> = flume::Receiver<Command<Req, Res>>;

#[async_trait]
impl<Req: Send, Res: Send> CommandSink for ChannelCommandSink<Req, Res> {
    type Request = Req;
    type Response = anyhow::Result<Res>;

    async fn command(&self, request: Self::Request) -> Self::Response {
        let (tx, rx) = oneshot::channel();
        if self.send_async((request, tx)).await.is_err() {
            anyhow::bail!("could not send command: receiving task has stopped");
        }
        rx.await
            .map_err(|_| anyhow::anyhow!("receiving task dropped the command without answering"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn command_round_trips_through_channel() {
        let (tx, rx): (ChannelCommandSink<u32, u32>, ChannelCommandSource<u32, u32>) =
            flume::bounded(4);

        tokio::spawn(async move {
            while let Ok((req, ret_tx)) = rx.recv_async().await {
                let _ = ret_tx.send(Ok(req * 2));
            }
        });

        assert_eq!(tx.command(21).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn command_fails_when_receiver_is_gone() {
        let (tx, rx): (ChannelCommandSink<u32, u32>, ChannelCommandSource<u32, u32>) =
            flume::bounded(4);
        drop(rx);

        assert!(tx.command(1).await.is_err());
    }

    #[tokio::test]
    async fn command_fails_when_reply_is_dropped() {
        let (tx, rx): (ChannelCommandSink<u32, u32>, ChannelCommandSource<u32, u32>) =
            flume::bounded(4);

        tokio::spawn(async move {
            if let Ok((_, ret_tx)) = rx.recv_async().await {
                drop(ret_tx);
            }
        });

        assert!(tx.command(1).await.is_err());
    }
}
