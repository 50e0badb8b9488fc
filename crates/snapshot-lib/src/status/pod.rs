//! Pod display status
//!
//! Mirrors the precedence `kubectl get pods` applies when printing the STATUS
//! column. Rules are evaluated in order, later rules overriding earlier ones:
//!
//! 1. raw phase
//! 2. scheduling gates
//! 3. first failing or pending init container
//! 4. main container states (skipped while initializing)
//! 5. `Completed` with a still running sidecar
//! 6. deletion timestamp

use k8s_openapi::api::core::v1::{
    ContainerStateTerminated, ContainerStatus, Pod, PodCondition,
};
use serde::{Deserialize, Serialize};

const PLACEHOLDER_INIT_REASON: &str = "PodInitializing";
const NODE_LOST_REASON: &str = "NodeLost";

/// Last terminated state surfaced from a container's `lastState`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastState {
    /// Always `Terminated`
    pub last_state: String,
    pub last_state_reason: Option<String>,
    pub last_state_exit_code: i32,
    /// Unix seconds
    pub last_state_started_at: Option<i64>,
    /// Unix seconds
    pub last_state_finished_at: Option<i64>,
}

/// Derived pod state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodState {
    /// Number of containers declared in the pod spec
    pub containers: usize,
    pub ready_containers: usize,
    pub restarts: i64,
    pub status: String,
    pub last_state: Option<LastState>,
}

/// How a terminated container ended
enum Termination<'a> {
    Reason(&'a str),
    Signal(i32),
    ExitCode(i32),
}

impl<'a> Termination<'a> {
    fn of(terminated: &'a ContainerStateTerminated) -> Self {
        match terminated.reason.as_deref().filter(|r| !r.is_empty()) {
            Some(reason) => Termination::Reason(reason),
            None => match terminated.signal.unwrap_or(0) {
                0 => Termination::ExitCode(terminated.exit_code),
                signal => Termination::Signal(signal),
            },
        }
    }

    fn init_status(&self) -> String {
        match self {
            Termination::Reason(reason) => format!("Init:{reason}"),
            Termination::Signal(signal) => format!("Init.Signal:{signal}"),
            Termination::ExitCode(code) => format!("Init.ExitCode:{code}"),
        }
    }

    fn status(&self) -> String {
        match self {
            Termination::Reason(reason) => reason.to_string(),
            Termination::Signal(signal) => format!("Signal:{signal}"),
            Termination::ExitCode(code) => format!("ExitCode:{code}"),
        }
    }
}

/// Result of scanning init containers
enum InitPass {
    /// Every reported init container terminated with exit code 0
    Done,
    /// An init container is still pending or failed
    Initializing { status: String, restarts: i64 },
}

/// Result of scanning main containers
struct MainPass {
    status: String,
    restarts: i64,
    ready_containers: usize,
    has_running: bool,
    last_state: Option<LastState>,
}

/// Derive display status, restart count and readiness for a pod
pub fn resolve_pod(pod: &Pod) -> PodState {
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();

    let conditions = status
        .and_then(|s| s.conditions.as_deref())
        .unwrap_or_default();
    let init_statuses = status
        .and_then(|s| s.init_container_statuses.as_deref())
        .unwrap_or_default();
    let container_statuses = status
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();

    let containers = spec.map(|s| s.containers.len()).unwrap_or(0);
    let declared_init = spec
        .and_then(|s| s.init_containers.as_ref())
        .map(Vec::len)
        .unwrap_or(0);

    let mut display = status
        .and_then(|s| s.phase.clone())
        .unwrap_or_default();

    if conditions.iter().any(is_scheduling_gated) {
        display = "SchedulingGated".to_string();
    }

    let mut state = match init_pass(init_statuses, declared_init) {
        InitPass::Initializing { status, restarts } => PodState {
            containers,
            ready_containers: 0,
            restarts,
            status,
            last_state: None,
        },
        InitPass::Done => {
            let main = main_pass(container_statuses, display);
            let status = resolve_completed(main.status, main.has_running, conditions);
            PodState {
                containers,
                ready_containers: main.ready_containers,
                restarts: main.restarts,
                status,
                last_state: main.last_state,
            }
        }
    };

    if pod.metadata.deletion_timestamp.is_some() {
        let node_lost = status.and_then(|s| s.reason.as_deref()) == Some(NODE_LOST_REASON);
        state.status = if node_lost { "Unknown" } else { "Terminating" }.to_string();
    }

    state
}

fn is_scheduling_gated(condition: &PodCondition) -> bool {
    condition.type_ == "PodScheduled" && condition.reason.as_deref() == Some("SchedulingGated")
}

fn init_pass(statuses: &[ContainerStatus], declared: usize) -> InitPass {
    let mut restarts = 0i64;

    for (index, cs) in statuses.iter().enumerate() {
        restarts += i64::from(cs.restart_count);

        let state = cs.state.as_ref();
        let terminated = state.and_then(|s| s.terminated.as_ref());
        let waiting_reason = state
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_deref())
            .filter(|r| !r.is_empty());

        let status = match (terminated, waiting_reason) {
            (Some(t), _) if t.exit_code == 0 => continue,
            (Some(t), _) => Termination::of(t).init_status(),
            (None, Some(reason)) if reason != PLACEHOLDER_INIT_REASON => format!("Init:{reason}"),
            _ => format!("Init:({index}/{declared})"),
        };

        return InitPass::Initializing { status, restarts };
    }

    InitPass::Done
}

fn main_pass(statuses: &[ContainerStatus], baseline: String) -> MainPass {
    let mut pass = MainPass {
        status: baseline,
        restarts: 0,
        ready_containers: 0,
        has_running: false,
        last_state: None,
    };

    for cs in statuses {
        if let Some(last) = cs.last_state.as_ref().and_then(|s| s.terminated.as_ref()) {
            pass.last_state = Some(LastState {
                last_state: "Terminated".to_string(),
                last_state_reason: last.reason.clone(),
                last_state_exit_code: last.exit_code,
                last_state_started_at: last.started_at.as_ref().map(|t| t.0.timestamp()),
                last_state_finished_at: last.finished_at.as_ref().map(|t| t.0.timestamp()),
            });
        }

        pass.restarts += i64::from(cs.restart_count);

        let state = cs.state.as_ref();
        let waiting_reason = state
            .and_then(|s| s.waiting.as_ref())
            .and_then(|w| w.reason.as_deref())
            .filter(|r| !r.is_empty());
        let terminated = state.and_then(|s| s.terminated.as_ref());
        let running = state.and_then(|s| s.running.as_ref()).is_some();

        if let Some(reason) = waiting_reason {
            pass.status = reason.to_string();
        } else if let Some(t) = terminated {
            pass.status = Termination::of(t).status();
        } else if cs.ready && running {
            pass.has_running = true;
            pass.ready_containers += 1;
        }
    }

    pass
}

/// A `Completed` pod with a running container is a finished workload next
/// to a live sidecar; report it by pod readiness instead.
fn resolve_completed(status: String, has_running: bool, conditions: &[PodCondition]) -> String {
    if status != "Completed" || !has_running {
        return status;
    }

    let ready = conditions
        .iter()
        .any(|c| c.type_ == "Ready" && c.status == "True");

    if ready { "Running" } else { "NotReady" }.to_string()
}
