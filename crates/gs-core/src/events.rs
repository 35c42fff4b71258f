// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Notifications from the environment that owns the guests

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{Entry, GuestId};

/// Guest lifecycle notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum GuestEvent {
    Enable {
        vm_name: String,
        container_name: String,
    },
    Disable {
        vm_name: String,
        container_name: String,
    },
    Share {
        vm_name: String,
        entries: Vec<Entry>,
    },
    Unshare {
        vm_name: String,
        entries: Vec<Entry>,
    },
}

impl GuestEvent {
    pub fn enable(guest: &GuestId) -> Self {
        GuestEvent::Enable {
            vm_name: guest.vm_name.clone(),
            container_name: guest.container_name.clone(),
        }
    }

    pub fn disable(guest: &GuestId) -> Self {
        GuestEvent::Disable {
            vm_name: guest.vm_name.clone(),
            container_name: guest.container_name.clone(),
        }
    }

    pub fn vm_name(&self) -> &str {
        match self {
            GuestEvent::Enable { vm_name, .. }
            | GuestEvent::Disable { vm_name, .. }
            | GuestEvent::Share { vm_name, .. }
            | GuestEvent::Unshare { vm_name, .. } => vm_name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GuestEvent::Enable { .. } => "enable",
            GuestEvent::Disable { .. } => "disable",
            GuestEvent::Share { .. } => "share",
            GuestEvent::Unshare { .. } => "unshare",
        }
    }
}

pub type EventSender = mpsc::Sender<GuestEvent>;
pub type EventReceiver = mpsc::Receiver<GuestEvent>;

/// Bounded channel carrying guest events in delivery order
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let event: GuestEvent = serde_json::from_str(
            r#"{"event": "share", "vm_name": "termina",
                "entries": [{"path": "/MyFiles/Downloads", "kind": "directory", "filesystem_root": "/MyFiles"}]}"#,
        )
        .unwrap();
        assert_eq!(event.kind(), "share");
        assert_eq!(event.vm_name(), "termina");
        match event {
            GuestEvent::Share { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].full_path().to_string(), "/Downloads");
            }
            other => panic!("unexpected event {other:?}"),
        }

        let enable = GuestEvent::enable(&GuestId::default_guest());
        let json = serde_json::to_value(&enable).unwrap();
        assert_eq!(json["event"], "enable");
        assert_eq!(json["container_name"], "penguin");
    }
}
