//! Demo binary: simulated workers reporting through the coalescing
//! dispatcher, rendered as terminal progress lines.

mod config;
mod logging;
mod render;

use std::path::Path;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use progress_core::{TaskOptions, TaskRegistry};
use progress_dispatch::{ChannelSink, Controller, SinkCall, ThreadTimer, WorkerExecutor};
use progress_logging::progress_info;

fn main() -> Result<()> {
    logging::initialize(logging::LogDestination::Both);

    let cli_config = match std::env::args().nth(1) {
        Some(path) => config::load_or_default(Path::new(&path)),
        None => config::CliConfig::default(),
    };
    progress_info!("Starting with {:?}", cli_config);

    let registry = Arc::new(TaskRegistry::new(Arc::new(WorkerExecutor::new())));
    let timer = Arc::new(ThreadTimer::new());
    let controller = Controller::new(cli_config.to_dispatch(), registry, timer);
    let (sink_tx, sink_rx) = mpsc::channel();
    controller.set_sink(Arc::new(ChannelSink::new(sink_tx)));

    let workers = spawn_demo_workers(&controller);

    // Render until every worker is done and the last finish has flushed.
    let mut selected = None;
    loop {
        match sink_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(SinkCall::SelectedUpdate(event)) => selected = Some(event.task().id()),
            Ok(SinkCall::Update(event)) => {
                let is_selected = selected == Some(event.task().id());
                println!("{}", render::format_event(&event, is_selected));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let workers_done = workers.iter().all(|worker| worker.is_finished());
                if workers_done && controller.registry().task_count() == 0 {
                    break;
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    for worker in workers {
        let _ = worker.join();
    }
    controller.shutdown();
    progress_info!("All demo tasks finished");
    Ok(())
}

fn spawn_demo_workers(controller: &Controller) -> Vec<thread::JoinHandle<()>> {
    let mut workers = Vec::new();

    // A determinate, user-initiated task reporting a steady percentage.
    let indexer = controller.clone();
    workers.push(thread::spawn(move || {
        let options = TaskOptions {
            user_initiated: true,
            ..indexer.task_options()
        };
        let task = indexer.begin_task("indexing files", options);
        for step in 0..=10u32 {
            indexer.report_progress(
                &task,
                Some(format!("file batch {step}/10")),
                Some(step * 40),
                Some(f64::from(step) / 10.0),
                Some((10 - step) * 2),
            );
            thread::sleep(Duration::from_millis(150));
        }
        indexer.report_finish(&task);
    }));

    // A task that turns indeterminate, dozes off, then wakes up to finish.
    let poller = controller.clone();
    workers.push(thread::spawn(move || {
        let task = poller.begin_task("contacting server", poller.task_options());
        thread::sleep(Duration::from_millis(700));
        poller.report_switch_to_indeterminate(&task);
        thread::sleep(Duration::from_millis(400));
        poller.report_silent(&task, Some("waiting for response".to_string()));
        thread::sleep(Duration::from_millis(800));
        poller.report_progress(&task, Some("response received".to_string()), None, None, None);
        thread::sleep(Duration::from_millis(200));
        poller.report_finish(&task);
    }));

    // Starts and finishes inside the grace period: must never be rendered.
    let blink = controller.clone();
    workers.push(thread::spawn(move || {
        let task = blink.begin_task("blink", blink.task_options());
        thread::sleep(Duration::from_millis(50));
        blink.report_finish(&task);
    }));

    workers
}
