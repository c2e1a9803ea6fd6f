use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use gl_client::Task;
use gl_gimbal::GimbalSnapshot;
use tokio::{
    fs::{File, OpenOptions},
    io::AsyncWriteExt,
    select,
    sync::watch,
    time::interval,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{DisplayPose, FeedConfig};

pub struct FeedTask {
    config: FeedConfig,
    snapshot_rx: watch::Receiver<GimbalSnapshot>,
}

pub fn create_task(
    config: FeedConfig,
    snapshot_rx: watch::Receiver<GimbalSnapshot>,
) -> anyhow::Result<FeedTask> {
    if config.tick_ms == 0 {
        anyhow::bail!("feed tick interval must be at least 1 ms");
    }

    Ok(FeedTask {
        config,
        snapshot_rx,
    })
}

/// Drawing side of the gimbal: keeps a displayed pose that follows the
/// commanded one and reports it.
struct Feed {
    pose: DisplayPose,
    target: GimbalSnapshot,

    // the last time the pose was advanced
    last_tick: Option<Instant>,

    // the last time we reported the pose to the user
    last_report: Option<Instant>,

    report_interval: Duration,
    recorder: Option<File>,
}

impl Feed {
    async fn record(&mut self) -> anyhow::Result<()> {
        if let Some(file) = &mut self.recorder {
            let mut line =
                serde_json::to_vec(&self.target).context("failed to serialize snapshot")?;
            line.push(b'\n');
            file.write_all(&line)
                .await
                .context("failed to write snapshot")?;
            file.flush().await.context("failed to flush snapshot")?;
        }
        Ok(())
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = self
            .last_tick
            .map_or_else(Duration::default, |last_tick| now - last_tick);
        self.last_tick = Some(now);

        if !self.pose.advance(&self.target, elapsed) {
            return;
        }

        let settled = self.pose.settled_on(&self.target);

        if settled
            || self.last_report.map_or(true, |last_report| {
                now - last_report > self.report_interval
            })
        {
            self.last_report = Some(now);
            info!(
                "displayed pose: pan {:.2}°, tilt {:.2}°{}",
                self.pose.pan,
                self.pose.tilt,
                if settled { " (settled)" } else { "" }
            );
        }
    }
}

#[async_trait]
impl Task for FeedTask {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn run(self: Box<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let Self {
            config,
            mut snapshot_rx,
        } = *self;

        let recorder = match &config.record {
            Some(path) => {
                debug!("recording snapshots to {:?}", path);
                Some(
                    OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(path)
                        .await
                        .with_context(|| format!("failed to open {:?}", path))?,
                )
            }
            None => None,
        };

        let target = snapshot_rx.borrow().clone();

        let mut feed = Feed {
            pose: DisplayPose::new(target.state.pan_degrees(), target.state.tilt_degrees()),
            target,
            last_tick: None,
            last_report: None,
            report_interval: Duration::from_millis(config.report_interval_ms),
            recorder,
        };

        let loop_fut = async {
            let mut int = interval(Duration::from_millis(config.tick_ms));
            let mut gimbal_alive = true;

            loop {
                select! {
                    changed = snapshot_rx.changed(), if gimbal_alive => {
                        if changed.is_err() {
                            debug!("gimbal stopped publishing, animating last snapshot");
                            gimbal_alive = false;
                            continue;
                        }

                        feed.target = snapshot_rx.borrow().clone();
                        feed.pose.observe(&feed.target);
                        if let Err(err) = feed.record().await {
                            warn!("{:?}", err);
                        }
                    }
                    _ = int.tick() => feed.tick(),
                }
            }

            #[allow(unreachable_code)]
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
    use gl_gimbal::{GimbalCommand, GimbalConfig, GimbalController, PanDirection};

    use super::*;

    #[test]
    fn zero_tick_is_rejected() {
        let (_, rx) = GimbalController::new(&GimbalConfig::default());
        let config = FeedConfig {
            tick_ms: 0,
            ..Default::default()
        };
        assert!(create_task(config, rx).is_err());
    }

    #[tokio::test]
    async fn records_each_snapshot_as_json_line() {
        let path = std::env::temp_dir().join(format!(
            "gl-feed-{}-{}.jsonl",
            std::process::id(),
            chrono::Local::now().timestamp_nanos()
        ));

        let (mut controller, rx) = GimbalController::new(&GimbalConfig::default());
        let config = FeedConfig {
            record: Some(path.clone()),
            ..Default::default()
        };
        let task = create_task(config, rx).unwrap();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Box::new(task).run(cancel.clone()));

        // give the task a moment to open the file and subscribe
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.apply(&GimbalCommand::Pan {
            degrees: 20.0,
            direction: PanDirection::Left,
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.apply(&GimbalCommand::Stop);
        tokio::time::sleep(Duration::from_millis(50)).await;

        cancel.cancel();
        handle.await.unwrap().unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2, "{}", text);
        assert_eq!(lines[0]["state"]["pan_degrees"], -20.0);
        assert_eq!(lines[1]["last_command"]["action"], "stop");
    }
}
