//! Evaluation through the system libwrap (`hosts_ctl(3)`).
//!
//! libwrap keeps global state, so calls are serialised.

use std::ffi::{CString, c_char, c_int};
use std::sync::Mutex;

use netgate_config::pattern::AccessQuery;
use netgate_config::policy::PolicyDecision;

use super::{AccessError, AccessEvaluator};

#[link(name = "wrap")]
unsafe extern "C" {
    fn hosts_ctl(
        daemon: *const c_char,
        name: *const c_char,
        addr: *const c_char,
        user: *const c_char,
    ) -> c_int;
}

// libwrap expects the program to define the syslog priorities it logs with.
#[unsafe(no_mangle)]
#[allow(non_upper_case_globals)]
static mut allow_severity: c_int = libc::LOG_INFO;

#[unsafe(no_mangle)]
#[allow(non_upper_case_globals)]
static mut deny_severity: c_int = libc::LOG_WARNING;

static HOSTS_CTL: Mutex<()> = Mutex::new(());

/// Evaluator that defers to the libwrap policy files.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibwrapEvaluator;

impl LibwrapEvaluator {
    pub fn new() -> Self {
        Self
    }
}

fn c_arg(value: &str, what: &'static str) -> Result<CString, AccessError> {
    CString::new(value).map_err(|_| AccessError::InvalidArgument(what))
}

impl AccessEvaluator for LibwrapEvaluator {
    fn name(&self) -> &str {
        "libwrap"
    }

    fn evaluate(&self, query: &AccessQuery<'_>) -> Result<PolicyDecision, AccessError> {
        let daemon = c_arg(query.daemon, "daemon name")?;
        let host = c_arg(query.client_host, "client host")?;
        let addr = c_arg(query.client_addr, "client address")?;
        let user = c_arg(query.client_user, "client user")?;

        let _guard = HOSTS_CTL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // SAFETY: all four pointers are valid NUL-terminated strings that
        // outlive the call; libwrap does not retain them.
        let rc = unsafe {
            hosts_ctl(
                daemon.as_ptr(),
                host.as_ptr(),
                addr.as_ptr(),
                user.as_ptr(),
            )
        };

        Ok(if rc != 0 {
            PolicyDecision::Allowed
        } else {
            PolicyDecision::Denied
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nul_argument_is_rejected() {
        let query = AccessQuery::new("sshd", "bad\0host", "192.0.2.1", "alice");
        assert!(matches!(
            LibwrapEvaluator::new().evaluate(&query),
            Err(AccessError::InvalidArgument("client host"))
        ));
    }
}
