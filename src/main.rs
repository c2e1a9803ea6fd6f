use anyhow::Context;
use clap::Parser;
use gl_client::Task;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::{
    cli::interactive::{run_interactive_cli, run_script},
    config::GimbalLlmConfig,
    session::Session,
};

#[macro_use]
extern crate tracing;

mod cli;
mod config;
mod session;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // setup colorful backtraces
    color_backtrace::install();

    let mut targets = Targets::new().with_default(LevelFilter::INFO);

    if let Ok(directives) = std::env::var("RUST_LOG") {
        for directive in directives.split(',').filter(|d| !d.is_empty()) {
            if let Some((target, level)) = directive.split_once('=') {
                targets = targets.with_target(
                    target,
                    level.parse::<LevelFilter>().context("invalid log level")?,
                );
            } else {
                targets = targets.with_default(
                    directive
                        .parse::<LevelFilter>()
                        .context("invalid log level")?,
                );
            }
        }
    }

    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::hourly("logs", "gimbal-llm"));

    let reg = tracing_subscriber::registry();

    #[cfg(tokio_unstable)]
    let reg = reg.with(console_subscriber::spawn());

    reg
        // writer that outputs to console
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(targets),
        )
        // writer that outputs to files
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(Targets::new().with_targets(vec![
                    ("gimbal_llm", LevelFilter::DEBUG),
                    ("gl_gimbal", LevelFilter::DEBUG),
                    ("gl_llm", LevelFilter::DEBUG),
                    ("gl_feed", LevelFilter::DEBUG),
                ])),
        )
        .init();

    let main_args: cli::args::MainArgs = cli::args::MainArgs::parse();

    debug!("reading config from {:?}", &main_args.config);
    let mut config = GimbalLlmConfig::read_from_path(main_args.config.clone())
        .context("failed to read config")?;

    if main_args.offline {
        config.llm.provider = gl_llm::LlmProvider::Offline;
    }

    run_tasks(config, main_args).await
}

async fn run_tasks(config: GimbalLlmConfig, args: cli::args::MainArgs) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    ctrlc::set_handler({
        let cancellation_token = cancellation_token.clone();
        move || {
            info!("received interrupt, shutting down");
            cancellation_token.cancel();
        }
    })
    .context("could not set ctrl+c handler")?;

    let mut tasks = Vec::<Box<dyn Task>>::new();

    debug!("initializing gimbal task");
    let manual_step = config.gimbal.manual_step;
    let gimbal_task = gl_gimbal::create_task(config.gimbal, config.interpreter)
        .context("failed to initialize gimbal task")?;
    let gimbal_cmd_tx = gimbal_task.cmd();
    let snapshot_rx = gimbal_task.snapshots();
    tasks.push(Box::new(gimbal_task));

    debug!("initializing feed task");
    let feed_task =
        gl_feed::create_task(config.feed, snapshot_rx).context("failed to initialize feed task")?;
    tasks.push(Box::new(feed_task));

    let gateway = gl_llm::connect(&config.llm).context("failed to initialize llm gateway")?;
    let mut session = Session::new(
        gateway,
        config.llm.system_prompt(),
        gimbal_cmd_tx,
        manual_step,
    );

    if let Err(err) = session.probe().await {
        warn!("{}; requests will fail until it is reachable", err);
    }

    let mut join_set = JoinSet::new();

    match args.script {
        Some(path) => {
            info!("running script {:?}", path);
            join_set.spawn(run_script(session, path, cancellation_token.clone()));
        }
        None => {
            join_set.spawn(run_interactive_cli(session, cancellation_token.clone()));
        }
    }

    for task in tasks {
        debug!("starting {} task", task.name());
        join_set.spawn(task.run(cancellation_token.clone()));
    }

    while let Some(res) = join_set.join_next().await {
        // if task panicked, then will be Some(Err)
        // if task terminated w/ error, then will be Some(Ok(Err))
        // need to propagate errors in both cases

        match res {
            Err(err) => {
                cancellation_token.cancel();
                return Err(err).context("task failed");
            }
            Ok(Err(err)) => {
                cancellation_token.cancel();
                return Err(err).context("task terminated with error");
            }
            _ => {
                debug!("exited task");
            }
        }
    }

    Ok(())
}
