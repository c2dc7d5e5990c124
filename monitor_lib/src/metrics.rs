//! Process metrics in `name value` line format, ready to serve from `/metricz`

use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sysinfo::{Pid, System};

/// Samples the current process on every render.
///
/// ```no_run
/// use monitor_lib::{ProcessMetrics, Registry};
///
/// let registry = Registry::new();
/// let metrics = ProcessMetrics::new();
/// registry.set_metrics(move || metrics.render());
/// ```
#[derive(Clone)]
pub struct ProcessMetrics {
    system: Arc<Mutex<System>>,
    pid: Pid,
    started_at: DateTime<Utc>,
}

impl ProcessMetrics {
    pub fn new() -> Self {
        let pid = Pid::from(std::process::id() as usize);
        let mut system = System::new();
        system.refresh_process(pid);

        Self {
            system: Arc::new(Mutex::new(system)),
            pid,
            started_at: Utc::now(),
        }
    }

    pub fn render(&self) -> String {
        let mut body = String::new();

        {
            let mut system = self.system.lock();
            if system.refresh_process(self.pid) {
                if let Some(process) = system.process(self.pid) {
                    push_line(&mut body, "process_resident_memory_bytes", process.memory());
                    push_line(&mut body, "process_virtual_memory_bytes", process.virtual_memory());
                    push_line(&mut body, "process_cpu_usage_percent", process.cpu_usage());
                    push_line(&mut body, "process_start_time_seconds", process.start_time());
                }
            }
        }

        let uptime = Utc::now().signed_duration_since(self.started_at);
        push_line(&mut body, "process_uptime_seconds", uptime.num_seconds().max(0));

        body
    }
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn push_line(body: &mut String, name: &str, value: impl Display) {
    body.push_str(name);
    body.push(' ');
    body.push_str(&value.to_string());
    body.push('\n');
}
