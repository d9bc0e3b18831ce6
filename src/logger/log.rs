use crate::logger::severity::LogSeverity;
use crate::logger::time::now;

pub fn log(msg: &str, severity: LogSeverity) {
    println!("[{}] {} {}", severity, now(), msg);
}
