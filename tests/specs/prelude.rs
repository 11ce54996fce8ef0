//! Shared fixture for the spec suite.

use pilot_core::{ApprovalDecision, ApprovalScope, FakeClock, TaskId};
use pilot_daemon::{HostService, StatePaths};
use pilot_engine::FakeToolHost;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub struct Specs {
    pub _dir: TempDir,
    pub paths: StatePaths,
    pub workspace: PathBuf,
    pub clock: FakeClock,
    pub service: HostService<FakeClock>,
}

pub fn specs() -> Specs {
    let dir = TempDir::new().unwrap();
    let paths = StatePaths::under(dir.path().join("state"));
    let workspace = dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();

    let clock = FakeClock::new();
    clock.set_epoch_ms(1_767_009_600_000);

    let service = HostService::open(
        paths.clone(),
        workspace.clone(),
        Arc::new(FakeToolHost::new()),
        clock.clone(),
    )
    .unwrap();

    Specs {
        paths,
        workspace,
        clock,
        service,
        _dir: dir,
    }
}

pub fn reopen(specs: &Specs) -> HostService<FakeClock> {
    HostService::open(
        specs.paths.clone(),
        specs.workspace.clone(),
        Arc::new(FakeToolHost::new()),
        specs.clock.clone(),
    )
    .unwrap()
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Drive a blocked future while resolving every approval that appears with
/// the given decision.
pub async fn drive_resolving_approvals<F, T>(
    specs: &Specs,
    future: F,
    decision: ApprovalDecision,
) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::pin!(future);
    loop {
        tokio::select! {
            biased;
            result = &mut future => return result,
            _ = tokio::task::yield_now() => {
                let mut pending = specs.service.approvals().pending_ids();
                if let Some(id) = pending.pop() {
                    specs
                        .service
                        .resolve_approval(&id, decision, ApprovalScope::Once, None)
                        .unwrap();
                }
            }
        }
    }
}

/// Event type names for one task, in append order.
pub fn event_names(specs: &Specs, task_id: &TaskId) -> Vec<String> {
    specs
        .service
        .events_for_task(task_id)
        .unwrap()
        .iter()
        .map(|e| e.type_name().to_string())
        .collect()
}
