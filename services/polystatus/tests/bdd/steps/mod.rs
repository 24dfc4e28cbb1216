//! BDD step definitions for the polystatus service

pub mod channel_steps;
pub mod monitor_steps;
pub mod notification_steps;
pub mod push_steps;
pub mod scheduler_steps;

use polystatus::monitor::MonitorStatus;

pub fn parse_status(s: &str) -> MonitorStatus {
    match s {
        "PENDING" => MonitorStatus::Pending,
        "UP" => MonitorStatus::Up,
        "DOWN" => MonitorStatus::Down,
        "MAINTENANCE" => MonitorStatus::Maintenance,
        other => panic!("Unknown status: {}", other),
    }
}
