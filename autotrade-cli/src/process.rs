use std::thread;
use std::time::Duration;
use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, info};

pub fn process_running(system: &mut System, name: &str) -> bool {
    system.refresh_processes(ProcessesToUpdate::All, true);
    let wanted = name.to_lowercase();
    system
        .processes()
        .values()
        .any(|process| process.name().to_string_lossy().to_lowercase() == wanted)
}

/// Blocks until a process called `name` is running.
pub fn wait_for_process(name: &str, interval: Duration) {
    let mut system = System::new();
    if process_running(&mut system, name) {
        return;
    }
    info!("Waiting for process '{}'", name);
    while !process_running(&mut system, name) {
        debug!("'{}' not running yet", name);
        thread::sleep(interval);
    }
    info!("Process '{}' is running", name);
}
