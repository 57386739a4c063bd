use std::thread;
use std::time::Duration;

pub fn backoff(attempts: u32) {
    thread::sleep(Duration::from_millis(50 * attempts as u64));
}
