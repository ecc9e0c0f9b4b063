//! Stand-in Ghostscript executables for tests.
//!
//! Written once per test binary so no test execs a script another thread is
//! still writing.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::OnceLock;
use tempfile::TempDir;

/// Writes its own argument list, one per line, to `-sOutputFile`. Exits 2 if
/// the input does not end in `.pdf`.
pub const ECHO_ARGS: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
  esac
  input="$arg"
done
case "$input" in
  *.pdf) ;;
  *) echo "input has no .pdf extension: $input" >&2; exit 2 ;;
esac
printf '%s\n' "$@" > "$out"
"#;

pub const FAILING: &str = r#"#!/bin/sh
echo "Unrecoverable error, exit code 1" >&2
exit 1
"#;

pub const SILENT_FAILURE: &str = "#!/bin/sh\nexit 3\n";

pub const EMPTY_OUTPUT: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
  esac
done
: > "$out"
"#;

pub const NO_OUTPUT: &str = "#!/bin/sh\nexit 0\n";

pub const HANGING: &str = "#!/bin/sh\nexec sleep 30\n";

pub const VERSION: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "10.02.1"
  exit 0
fi
exit 1
"#;

const TOOLS: [(&str, &str); 7] = [
    ("echo-args", ECHO_ARGS),
    ("failing", FAILING),
    ("silent-failure", SILENT_FAILURE),
    ("empty-output", EMPTY_OUTPUT),
    ("no-output", NO_OUTPUT),
    ("hanging", HANGING),
    ("version", VERSION),
];

fn tools_dir() -> &'static TempDir {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, script) in TOOLS {
            let path = dir.path().join(name);
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
}

/// Path of the named stand-in tool.
pub fn fake_tool(name: &str) -> PathBuf {
    let path = tools_dir().path().join(name);
    assert!(path.exists(), "unknown fake tool {name}");
    path
}
