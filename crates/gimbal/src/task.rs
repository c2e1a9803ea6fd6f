use async_trait::async_trait;
use gl_client::{ChannelCommandSink, ChannelCommandSource, Task};
use tokio::{select, sync::watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    GimbalCommand, GimbalConfig, GimbalController, GimbalSnapshot, Interpreter, InterpreterConfig,
};

#[derive(Debug, Clone)]
pub enum GimbalRequest {
    /// A command built directly from operator input. Always applied, with
    /// clamping.
    Manual(GimbalCommand),

    /// Text that came back from the LLM, plus what the operator originally
    /// typed.
    Interpret {
        reply: String,
        utterance: Option<String>,
    },

    Status,
}

pub type GimbalResponse = GimbalSnapshot;

pub struct GimbalTask {
    controller: GimbalController,
    interpreter: Interpreter,
    cmd_tx: ChannelCommandSink<GimbalRequest, GimbalResponse>,
    cmd_rx: ChannelCommandSource<GimbalRequest, GimbalResponse>,
}

pub fn create_task(
    config: GimbalConfig,
    interpreter_config: InterpreterConfig,
) -> anyhow::Result<GimbalTask> {
    let (cmd_tx, cmd_rx) = flume::bounded(256);

    if config.default_speed < crate::SPEED_MIN || config.default_speed > crate::SPEED_MAX {
        warn!(
            "default speed {} is outside {}..={}, clamping",
            config.default_speed,
            crate::SPEED_MIN,
            crate::SPEED_MAX
        );
    }

    let (controller, _) = GimbalController::new(&config);
    let interpreter = Interpreter::new(interpreter_config, config.limits);

    Ok(GimbalTask {
        controller,
        interpreter,
        cmd_tx,
        cmd_rx,
    })
}

impl GimbalTask {
    pub fn cmd(&self) -> ChannelCommandSink<GimbalRequest, GimbalResponse> {
        self.cmd_tx.clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<GimbalSnapshot> {
        self.controller.subscribe()
    }
}

fn handle(
    controller: &mut GimbalController,
    interpreter: &Interpreter,
    request: GimbalRequest,
) -> anyhow::Result<GimbalResponse> {
    match request {
        GimbalRequest::Manual(command) => {
            info!("manual command: {}", command);
            Ok(controller.apply(&command))
        }
        GimbalRequest::Interpret { reply, utterance } => {
            let interpretation = interpreter.interpret(&reply, utterance.as_deref())?;
            info!(
                "interpreted {:?} as {} (speed {:?})",
                reply, interpretation.command, interpretation.speed
            );
            Ok(controller.apply_interpretation(interpreter, &interpretation)?)
        }
        GimbalRequest::Status => Ok(controller.snapshot()),
    }
}

#[async_trait]
impl Task for GimbalTask {
    fn name(&self) -> &'static str {
        "gimbal"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self {
            mut controller,
            interpreter,
            cmd_rx,
            cmd_tx,
        } = *self;

        // only outside senders should keep the loop alive
        drop(cmd_tx);

        let loop_fut = async {
            while let Ok((request, ret_tx)) = cmd_rx.recv_async().await {
                debug!("gimbal request: {:?}", request);

                let result = handle(&mut controller, &interpreter, request);

                if ret_tx.send(result).is_err() {
                    debug!("requester went away before the gimbal answered");
                }
            }

            Ok::<_, anyhow::Error>(())
        };

        select! {
          _ = cancel.cancelled() => {}
          res = loop_fut => { res? }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use gl_client::CommandSink;

    use super::*;
    use crate::{InterpretError, MotionStatus, PanDirection};

    fn start() -> (
        ChannelCommandSink<GimbalRequest, GimbalResponse>,
        watch::Receiver<GimbalSnapshot>,
        CancellationToken,
    ) {
        let task = create_task(GimbalConfig::default(), InterpreterConfig::default()).unwrap();
        let cmd = task.cmd();
        let snapshots = task.snapshots();
        let cancel = CancellationToken::new();

        tokio::spawn(Box::new(task).run(cancel.clone()));

        (cmd, snapshots, cancel)
    }

    #[tokio::test]
    async fn manual_and_interpreted_requests_apply_in_order() {
        let (cmd, snapshots, cancel) = start();

        cmd.command(GimbalRequest::Manual(GimbalCommand::Pan {
            degrees: 30.0,
            direction: PanDirection::Right,
        }))
        .await
        .unwrap();

        let snapshot = cmd
            .command(GimbalRequest::Interpret {
                reply: r#"{"action":"pan","value":-10}"#.into(),
                utterance: Some("pan left 10".into()),
            })
            .await
            .unwrap();

        assert_eq!(snapshot.state.pan_degrees(), 20.0);
        assert_eq!(snapshot.status, MotionStatus::Moving);
        assert_eq!(snapshots.borrow().sequence, snapshot.sequence);

        let status = cmd.command(GimbalRequest::Status).await.unwrap();
        assert_eq!(status.sequence, snapshot.sequence);

        cancel.cancel();
    }

    #[tokio::test]
    async fn interpretation_errors_come_back_typed() {
        let (cmd, _snapshots, cancel) = start();

        let err = cmd
            .command(GimbalRequest::Interpret {
                reply: "asdkjf".into(),
                utterance: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InterpretError>(),
            Some(InterpretError::Unrecognized(_))
        ));

        let err = cmd
            .command(GimbalRequest::Interpret {
                reply: "tilt up 100".into(),
                utterance: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<InterpretError>(),
            Some(InterpretError::OutOfRangeRequest { .. })
        ));

        cancel.cancel();
    }

    #[tokio::test]
    async fn task_stops_when_cancelled() {
        let task = create_task(GimbalConfig::default(), InterpreterConfig::default()).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

        cancel.cancel();

        handle.await.unwrap().unwrap();
    }
}
