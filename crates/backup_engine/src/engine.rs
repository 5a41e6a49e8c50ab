use std::sync::{mpsc, Arc};
use std::thread;

use backup_logging::backup_error;

use crate::progress::ChannelProgressSink;
use crate::runner::BackupRunner;
use crate::tree::PageRecord;
use crate::BackupEvent;

enum BackupCommand {
    Start {
        selected: Vec<PageRecord>,
        all_pages: Vec<PageRecord>,
    },
}

/// Runs backups on a background tokio runtime and streams their events.
///
/// Each started backup emits any number of [`BackupEvent::Progress`] followed
/// by exactly one [`BackupEvent::Completed`].
pub struct BackupHandle {
    cmd_tx: mpsc::Sender<BackupCommand>,
    event_rx: mpsc::Receiver<BackupEvent>,
}

impl BackupHandle {
    pub fn new(runner: BackupRunner) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runner = Arc::new(runner);

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    backup_error!("Failed to start backup runtime: {}", err);
                    while cmd_rx.recv().is_ok() {
                        let _ = event_tx.send(BackupEvent::Completed(Err(format!(
                            "backup runtime unavailable: {err}"
                        ))));
                    }
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let runner = runner.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    handle_command(runner.as_ref(), command, event_tx).await;
                });
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self, selected: Vec<PageRecord>, all_pages: Vec<PageRecord>) {
        let _ = self.cmd_tx.send(BackupCommand::Start {
            selected,
            all_pages,
        });
    }

    pub fn try_recv(&self) -> Option<BackupEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Block until the next event arrives.
    pub fn recv(&self) -> Option<BackupEvent> {
        self.event_rx.recv().ok()
    }
}

async fn handle_command(
    runner: &BackupRunner,
    command: BackupCommand,
    event_tx: mpsc::Sender<BackupEvent>,
) {
    match command {
        BackupCommand::Start {
            selected,
            all_pages,
        } => {
            let sink = ChannelProgressSink::new(event_tx.clone());
            let result = runner
                .run_backup(&selected, &all_pages, &sink)
                .await
                .map_err(|err| err.to_string());
            let _ = event_tx.send(BackupEvent::Completed(result));
        }
    }
}
