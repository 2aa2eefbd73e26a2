use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes a fake external program into `dir` and marks it executable.
pub fn write_executable(dir: &Path, name: &str, script: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    #[cfg(unix)]
    {
        perms.set_mode(0o755);
    }
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A three-phase script producing a fixed three-column schema and two fixed
/// rows per task. The setup phase checks that the config document made it to
/// disk; the finish phase leaves a `finished` marker next to `setup.yml`.
pub const FIXED_ROWS_SCRIPT: &str = r#"#!/bin/sh
case "$1" in
  setup)
    grep -q 'greeting: hello' "$2" || exit 3
    cat > "$3" <<'EOF'
columns:
  - {name: id, type: long}
  - {name: ok, type: boolean}
  - {name: ts, type: timestamp, format: "%Y-%m-%dT%H:%M:%SZ"}
tasks: 2
EOF
    ;;
  run)
    printf '42,Yes,2024-01-01T00:00:00Z\n7,no,2024-02-02T10:20:30Z\n' > "$3"
    ;;
  finish)
    touch "$(dirname "$2")/finished"
    ;;
esac
"#;
