//! Passcode lock in front of settings changes.
//!
//! This only keeps casual hands off the connection settings on a shared
//! device. The passcode sits in plain text in the local config file and is
//! compared as-is; it is not a security boundary.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

pub struct SettingsLock {
    passcode: Option<String>,
    unlocked: AtomicBool,
}

impl SettingsLock {
    /// Empty or missing passcodes disable the lock.
    pub fn new(passcode: Option<String>) -> Self {
        let passcode = passcode
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(p) = &passcode {
            if !p.chars().all(|c| c.is_ascii_digit()) {
                warn!("Settings passcode contains non-digit characters");
            }
        }
        Self {
            passcode,
            unlocked: AtomicBool::new(false),
        }
    }

    pub fn has_passcode(&self) -> bool {
        self.passcode.is_some()
    }

    pub fn is_unlocked(&self) -> bool {
        self.passcode.is_none() || self.unlocked.load(Ordering::SeqCst)
    }

    /// Returns whether the lock is open after the attempt.
    pub fn unlock(&self, input: &str) -> bool {
        let Some(passcode) = &self.passcode else {
            return true;
        };
        let ok = input.trim() == passcode;
        if ok {
            info!("Settings unlocked");
            self.unlocked.store(true, Ordering::SeqCst);
        } else {
            warn!("Wrong settings passcode");
        }
        ok
    }

    pub fn lock(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }
}
