use shellfind_os_shim::ProcessLister;

use super::{
    ProcessRecord,
    ProcessSnapshot,
};

pub(super) fn capture(lister: &ProcessLister) -> ProcessSnapshot {
    lister
        .system_processes()
        .into_iter()
        // Processes without a parent hang off pid 0, which never appears in the table.
        .map(|process| ProcessRecord::new(process.pid, process.ppid.unwrap_or_default(), process.cmd))
        .collect()
}

#[cfg(test)]
mod tests {
    use shellfind_os_shim::{
        Pid,
        SystemProcess,
    };

    use super::*;

    #[test]
    fn test_kernel_threads_keep_their_parent_link() {
        let lister = ProcessLister::from_system_processes(vec![
            SystemProcess {
                pid: Pid::from(2),
                ppid: None,
                cmd: vec![],
            },
            SystemProcess {
                pid: Pid::from(3),
                ppid: Some(Pid::from(2)),
                cmd: vec![],
            },
        ]);
        let snapshot = capture(&lister);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get(Pid::from(2)).unwrap().ppid(), Pid::from(0));
        assert_eq!(snapshot.get(Pid::from(3)).unwrap().ppid(), Pid::from(2));
        assert!(snapshot.get(Pid::from(3)).unwrap().args().is_empty());
    }
}
