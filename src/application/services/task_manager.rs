//! Background task manager - owns jobs modules start

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::application::errors::{BotError, StartupError};

pub struct TaskManager {
    runtime: Handle,
    tasks: Mutex<Vec<(String, JoinHandle<()>)>>,
    running: AtomicBool,
}

impl TaskManager {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        }
    }

    /// Bind to the runtime the caller is executing on
    pub fn try_current() -> Result<Self, StartupError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| StartupError::component("threadmanager", e.to_string()))
    }

    /// Start a named background job; refused once stopped
    pub fn spawn<F>(&self, name: impl Into<String>, job: F) -> Result<(), BotError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.is_running() {
            return Err(BotError::Internal("task manager stopped".to_string()));
        }
        let name = name.into();
        let handle = self.runtime.spawn(job);

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|(_, h)| !h.is_finished());
        tracing::debug!(task = %name, "Spawned background task");
        tasks.push((name, handle));
        Ok(())
    }

    /// Abort every job and refuse new ones
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
        for (name, handle) in tasks {
            if !handle.is_finished() {
                tracing::debug!(task = %name, "Aborting background task");
                handle.abort();
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Jobs still in flight
    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, h)| !h.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stop_aborts_and_refuses_new_jobs() {
        let manager = TaskManager::try_current().unwrap();
        manager
            .spawn("sleeper", async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
            .unwrap();
        assert_eq!(manager.active(), 1);

        manager.stop();
        assert!(!manager.is_running());
        assert_eq!(manager.active(), 0);
        assert!(manager.spawn("late", async {}).is_err());
    }

    #[test]
    fn test_requires_runtime() {
        assert!(TaskManager::try_current().is_err());
    }
}
