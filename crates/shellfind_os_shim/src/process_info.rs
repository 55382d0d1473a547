use crate::{
    Pid,
    Shim,
};

/// Represents the interface to identity information about the currently running process.
#[derive(Debug, Clone, Default)]
pub struct ProcessInfo(inner::Inner);

mod inner {
    use super::*;

    #[derive(Debug, Clone, Default)]
    pub(super) enum Inner {
        #[default]
        Real,
        Fake(Pid),
    }
}

impl ProcessInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new fake implementation that reports `pid` as the process id of the currently
    /// running process.
    pub fn new_fake(pid: Pid) -> Self {
        Self(inner::Inner::Fake(pid))
    }

    /// Returns the [Pid] of the currently running process.
    pub fn current_pid(&self) -> Pid {
        use inner::Inner;
        match &self.0 {
            Inner::Real => current(),
            Inner::Fake(pid) => *pid,
        }
    }
}

impl Shim for ProcessInfo {
    fn is_real(&self) -> bool {
        matches!(self.0, inner::Inner::Real)
    }
}

#[cfg(unix)]
fn current() -> Pid {
    nix::unistd::getpid().into()
}

#[cfg(windows)]
fn current() -> Pid {
    Pid::from(std::process::id())
}
