//! Scripted enumeration source
//!
//! Each call to [`PortEnumerator::list_detailed_ports`] consumes the next
//! scripted step. Once the script runs dry the last step repeats, so a
//! watch loop sees a steady state rather than an error.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use baud_detect::{DetectError, PortEnumerator, RawPortDescriptor};
use tracing::trace;

use crate::port::VirtualPort;

/// One scripted enumeration result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Report these ports
    Ports(Vec<RawPortDescriptor>),
    /// Fail with this message
    Failure(String),
}

impl ScriptStep {
    fn replay(&self) -> Result<Vec<RawPortDescriptor>, DetectError> {
        match self {
            ScriptStep::Ports(ports) => Ok(ports.clone()),
            ScriptStep::Failure(message) => Err(DetectError::EnumerationFailed(message.clone())),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    pending: VecDeque<ScriptStep>,
    last: Option<ScriptStep>,
    calls: usize,
}

/// Enumeration source that replays a script
///
/// Clones share the same script, so a test can keep a handle for scripting
/// and inspection while a scanner owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEnumerator {
    script: Arc<Mutex<Script>>,
}

impl ScriptedEnumerator {
    /// Create an enumerator with an empty script (reports no ports)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an enumerator that reports the given ports in sequence
    pub fn from_steps(steps: impl IntoIterator<Item = Vec<VirtualPort>>) -> Self {
        let enumerator = Self::new();
        for ports in steps {
            enumerator.push_ports(ports.iter().map(VirtualPort::build).collect());
        }
        enumerator
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a successful enumeration
    pub fn push_ports(&self, ports: Vec<RawPortDescriptor>) {
        self.lock().pending.push_back(ScriptStep::Ports(ports));
    }

    /// Queue a failed enumeration
    pub fn push_failure(&self, message: impl Into<String>) {
        self.lock()
            .pending
            .push_back(ScriptStep::Failure(message.into()));
    }

    /// Number of enumeration calls made so far
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Number of scripted steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock().pending.len()
    }
}

impl PortEnumerator for ScriptedEnumerator {
    fn list_detailed_ports(&self) -> Result<Vec<RawPortDescriptor>, DetectError> {
        let mut script = self.lock();
        script.calls += 1;

        if let Some(step) = script.pending.pop_front() {
            script.last = Some(step);
        }
        trace!("Scripted enumeration call {}", script.calls);

        match &script.last {
            Some(step) => step.replay(),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_script_reports_no_ports() {
        let enumerator = ScriptedEnumerator::new();
        assert!(enumerator.list_detailed_ports().unwrap().is_empty());
        assert_eq!(enumerator.calls(), 1);
    }

    #[test]
    fn test_last_step_repeats() {
        let enumerator = ScriptedEnumerator::from_steps(vec![
            vec![VirtualPort::native("/dev/ttyS0")],
            vec![
                VirtualPort::native("/dev/ttyS0"),
                VirtualPort::usb("/dev/ttyUSB0", 0x0403, 0x6001),
            ],
        ]);

        assert_eq!(enumerator.list_detailed_ports().unwrap().len(), 1);
        assert_eq!(enumerator.list_detailed_ports().unwrap().len(), 2);
        assert_eq!(enumerator.list_detailed_ports().unwrap().len(), 2);
        assert_eq!(enumerator.remaining(), 0);
    }

    #[test]
    fn test_failure_step() {
        let enumerator = ScriptedEnumerator::new();
        enumerator.push_failure("driver unloaded");

        let err = enumerator.list_detailed_ports().unwrap_err();
        assert!(matches!(err, DetectError::EnumerationFailed(ref m) if m == "driver unloaded"));
    }

    #[test]
    fn test_clones_share_script() {
        let enumerator = ScriptedEnumerator::new();
        let clone = enumerator.clone();

        enumerator.push_ports(vec![VirtualPort::native("COM1").build()]);

        assert_eq!(clone.list_detailed_ports().unwrap().len(), 1);
        assert_eq!(enumerator.calls(), 1);
    }

    proptest! {
        #[test]
        fn every_call_is_counted(n in 1usize..20) {
            let enumerator = ScriptedEnumerator::new();
            for _ in 0..n {
                let _ = enumerator.list_detailed_ports();
            }
            prop_assert_eq!(enumerator.calls(), n);
        }
    }
}
