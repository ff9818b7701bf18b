//! Where attack commands are sent.

use std::sync::Arc;

use crate::supervisor::{ProcessId, ProcessObserver, ProcessRequest, ProcessSupervisor};

/// Launches and kills commands on behalf of the attack loop.
///
/// Completion is reported out of band as
/// [`ProcessEvent`](crate::supervisor::ProcessEvent)s carrying the returned id.
pub trait CommandExecutor: Send {
    /// Start `request` and return its id.
    fn execute(&mut self, request: ProcessRequest) -> ProcessId;

    /// Kill the process group of `id`. `false` if it was not running.
    fn kill(&mut self, id: ProcessId) -> bool;
}

/// Runs commands on a [`ProcessSupervisor`], reporting to one observer.
pub struct SupervisorExecutor {
    supervisor: ProcessSupervisor,
    observer: Arc<dyn ProcessObserver>,
}

impl SupervisorExecutor {
    /// Wrap `supervisor`; every command reports to `observer`.
    pub fn new(supervisor: ProcessSupervisor, observer: Arc<dyn ProcessObserver>) -> Self {
        Self {
            supervisor,
            observer,
        }
    }
}

impl CommandExecutor for SupervisorExecutor {
    fn execute(&mut self, request: ProcessRequest) -> ProcessId {
        let handle = self.supervisor.run(request, Arc::clone(&self.observer));
        handle.id()
    }

    fn kill(&mut self, id: ProcessId) -> bool {
        self.supervisor.kill(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::ProcessEvent;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_supervisor_executor_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProcessEvent>();
        let mut executor = SupervisorExecutor::new(ProcessSupervisor::new(), Arc::new(tx));

        let id = executor.execute(ProcessRequest::new("echo ready"));

        loop {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.id(), id);
            if let ProcessEvent::Completed { code, .. } = event {
                assert_eq!(code, 0);
                break;
            }
        }
        assert!(!executor.kill(id));
    }
}
