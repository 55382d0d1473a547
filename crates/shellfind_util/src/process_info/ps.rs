use std::borrow::Cow;

use shellfind_os_shim::{
    PS_PROGRAM,
    Pid,
    ProcessLister,
};
use tracing::trace;

use super::{
    ProcessRecord,
    ProcessSnapshot,
};
use crate::SnapshotError;

pub(super) fn capture(lister: &ProcessLister) -> Result<ProcessSnapshot, SnapshotError> {
    let output = lister.ps_listing().map_err(|source| SnapshotError::Spawn {
        program: PS_PROGRAM,
        source,
    })?;

    if !output.success() {
        return Err(SnapshotError::ExitStatus {
            program: PS_PROGRAM,
            code: output.code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    let listing = String::from_utf8(output.stdout).map_err(|source| SnapshotError::Decode {
        program: PS_PROGRAM,
        source,
    })?;

    Ok(parse_ps_listing(&listing))
}

/// Parses `pid ppid args` lines into a snapshot.
///
/// Lines that do not have all three columns, whose ids are not integers, or whose command line
/// cannot be tokenized are skipped. When a pid appears twice the later line wins.
pub fn parse_ps_listing(listing: &str) -> ProcessSnapshot {
    let mut snapshot = ProcessSnapshot::new();
    for line in listing.lines() {
        match parse_line(line) {
            Some(record) => snapshot.insert(record),
            None => trace!(line, "skipping process listing line"),
        }
    }
    snapshot
}

fn parse_line(line: &str) -> Option<ProcessRecord> {
    let (pid, ppid, command_line) = split_columns(line)?;
    let pid = pid.parse::<Pid>().ok()?;
    let ppid = ppid.parse::<Pid>().ok()?;
    let args = shlex::split(&escape_comment_markers(command_line))?;
    Some(ProcessRecord::new(pid, ppid, args))
}

/// Escapes a `#` that starts an unquoted word. `shlex` would otherwise read it as a comment and
/// drop the rest of the command line, while a process's arguments have no comments.
fn escape_comment_markers(command_line: &str) -> Cow<'_, str> {
    if !command_line.contains('#') {
        return Cow::Borrowed(command_line);
    }

    let mut escaped = String::with_capacity(command_line.len() + 1);
    let mut quote = None;
    let mut word_start = true;
    let mut chars = command_line.chars();
    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (None, '#') if word_start => escaped.push('\\'),
            (None | Some('"'), '\\') => {
                escaped.push(ch);
                escaped.extend(chars.next());
                word_start = false;
                continue;
            },
            (None, '\'' | '"') => quote = Some(ch),
            (Some(open), _) if ch == open => quote = None,
            _ => {},
        }
        escaped.push(ch);
        word_start = quote.is_none() && ch.is_whitespace();
    }
    Cow::Owned(escaped)
}

/// Splits off the first two whitespace separated columns, leaving the rest of the line intact.
fn split_columns(line: &str) -> Option<(&str, &str, &str)> {
    let (pid, rest) = line.trim_start().split_once(char::is_whitespace)?;
    let (ppid, command_line) = rest.trim_start().split_once(char::is_whitespace)?;
    let command_line = command_line.trim();
    if command_line.is_empty() {
        return None;
    }
    Some((pid, ppid, command_line))
}

#[cfg(test)]
mod tests {
    use std::io;

    use indoc::indoc;

    use super::*;

    fn args(record: &ProcessRecord) -> Vec<&str> {
        record.args().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_parse_full_command_line() {
        let snapshot = parse_ps_listing("123 1 /usr/bin/env python3 -u script.py");
        let record = snapshot.get(Pid::from(123)).unwrap();
        assert_eq!(record.pid(), Pid::from(123));
        assert_eq!(record.ppid(), Pid::from(1));
        assert_eq!(args(record), ["/usr/bin/env", "python3", "-u", "script.py"]);
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let snapshot = parse_ps_listing(indoc! {"
            PID PPID
            10 1
            11 1 bash
            12
        "});
        assert_eq!(snapshot.len(), 1);
        assert_eq!(args(snapshot.get(Pid::from(11)).unwrap()), ["bash"]);
    }

    #[test]
    fn test_padded_columns() {
        let snapshot = parse_ps_listing("    1     0 /sbin/launchd\n  812   811 -zsh\n");
        assert_eq!(args(snapshot.get(Pid::from(1)).unwrap()), ["/sbin/launchd"]);
        let login = snapshot.get(Pid::from(812)).unwrap();
        assert_eq!(login.ppid(), Pid::from(811));
        assert_eq!(args(login), ["-zsh"]);
    }

    #[test]
    fn test_header_and_non_numeric_ids_are_skipped() {
        let snapshot = parse_ps_listing(indoc! {"
            PID PPID COMMAND
            abc 1 bash
            20 xyz bash
            21 1 fish
        "});
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(Pid::from(21)).is_some());
    }

    #[test]
    fn test_quotes_and_escapes_are_honored() {
        let snapshot = parse_ps_listing(r#"30 1 python -c "print('a b')" my\ file.py"#);
        assert_eq!(args(snapshot.get(Pid::from(30)).unwrap()), [
            "python",
            "-c",
            "print('a b')",
            "my file.py"
        ]);
    }

    #[test]
    fn test_hash_words_are_arguments() {
        let snapshot = parse_ps_listing(indoc! {r##"
            10 1 vim #notes.txt
            11 1 #x
            12 1 sh -c 'echo #x' a#b "#c" \#d
        "##});
        assert_eq!(args(snapshot.get(Pid::from(10)).unwrap()), ["vim", "#notes.txt"]);
        assert_eq!(args(snapshot.get(Pid::from(11)).unwrap()), ["#x"]);
        assert_eq!(args(snapshot.get(Pid::from(12)).unwrap()), [
            "sh", "-c", "echo #x", "a#b", "#c", "#d"
        ]);
    }

    #[test]
    fn test_escape_comment_markers() {
        assert!(matches!(escape_comment_markers("zsh -l"), Cow::Borrowed("zsh -l")));
        assert_eq!(escape_comment_markers("#x"), r"\#x");
        assert_eq!(escape_comment_markers("vim #a b#c"), r"vim \#a b#c");
        assert_eq!(escape_comment_markers(r#"echo '#a' "x #b" \#c"#), r#"echo '#a' "x #b" \#c"#);
        assert_eq!(escape_comment_markers("a\t#b"), "a\t\\#b");
    }

    #[test]
    fn test_unbalanced_quote_skips_line() {
        let snapshot = parse_ps_listing("40 1 sh -c \"echo\n41 1 zsh\n");
        assert!(snapshot.get(Pid::from(40)).is_none());
        assert!(snapshot.get(Pid::from(41)).is_some());
    }

    #[test]
    fn test_duplicate_pid_last_line_wins() {
        let snapshot = parse_ps_listing("50 1 bash\n50 2 fish\n");
        assert_eq!(snapshot.len(), 1);
        let record = snapshot.get(Pid::from(50)).unwrap();
        assert_eq!(record.ppid(), Pid::from(2));
        assert_eq!(args(record), ["fish"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let snapshot = parse_ps_listing("\r\n60 1 tcsh\r\n\n");
        assert_eq!(args(snapshot.get(Pid::from(60)).unwrap()), ["tcsh"]);
    }

    #[test]
    fn test_capture_spawn_error() {
        let lister = ProcessLister::from_spawn_error(io::ErrorKind::PermissionDenied, "denied");
        let err = capture(&lister).unwrap_err();
        assert!(matches!(err, SnapshotError::Spawn { program: "ps", ref source } if source.kind() == io::ErrorKind::PermissionDenied));
        assert_eq!(lister.invocations(), 1);
    }

    #[test]
    fn test_capture_non_zero_exit() {
        let lister = ProcessLister::from_ps_failure(Some(1), "ps: unknown option\n");
        match capture(&lister).unwrap_err() {
            SnapshotError::ExitStatus { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "ps: unknown option");
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(lister.invocations(), 1);
    }

    #[test]
    fn test_capture_invalid_utf8() {
        let lister = ProcessLister::from_ps_output(b"1 0 /bin/\xff\xfe\n");
        assert!(matches!(capture(&lister).unwrap_err(), SnapshotError::Decode { .. }));
    }
}
