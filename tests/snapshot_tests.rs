use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a .pl0 file with the plum CLI and return (stdout, stderr, exit_code)
fn run_plum_file(path: &Path, extra_args: &[&str], stdin: &str) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_plum"));
    cmd.arg("run");
    cmd.arg(path);
    for arg in extra_args {
        cmd.arg(arg);
    }
    // Keep a stray plum.toml in the working directory out of the picture.
    cmd.current_dir(path.parent().unwrap_or(Path::new(".")));
    cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());

    let mut child = cmd.spawn().expect("failed to execute plum");
    let _ = child.stdin.take().unwrap().write_all(stdin.as_bytes());
    let output = child.wait_with_output().expect("failed to wait for plum");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn read_expected(path: &Path) -> Option<String> {
    path.exists().then(|| {
        fs::read_to_string(path).unwrap_or_else(|e| panic!("Failed to read {:?}: {}", path, e))
    })
}

/// Run a single snapshot test
fn run_snapshot_test(test_path: &Path) {
    let base_path = test_path.with_extension("");

    // Check for .args file with extra CLI arguments
    let mut extra_args = Vec::new();
    if let Some(args_content) = read_expected(&base_path.with_extension("args")) {
        for arg in args_content.lines() {
            let arg = arg.trim();
            if !arg.is_empty() && !arg.starts_with('#') {
                extra_args.push(arg.to_string());
            }
        }
    }
    let stdin = read_expected(&base_path.with_extension("stdin")).unwrap_or_default();

    let extra_args_refs: Vec<&str> = extra_args.iter().map(|s| s.as_str()).collect();
    let (actual_stdout, actual_stderr, actual_exitcode) =
        run_plum_file(test_path, &extra_args_refs, &stdin);

    // Check stdout (exact match)
    if let Some(expected_stdout) = read_expected(&base_path.with_extension("stdout")) {
        assert_eq!(
            actual_stdout, expected_stdout,
            "stdout mismatch for {:?}\n--- expected ---\n{}\n--- actual ---\n{}",
            test_path, expected_stdout, actual_stdout
        );
    }

    // Check stderr (partial match - expected must be contained in actual)
    if let Some(expected_stderr) = read_expected(&base_path.with_extension("stderr")) {
        assert!(
            actual_stderr.contains(expected_stderr.trim_end()),
            "stderr mismatch for {:?}\n--- expected (substring) ---\n{}\n--- actual ---\n{}",
            test_path, expected_stderr, actual_stderr
        );
    }

    // Check exit code (default: 0)
    let expected_exitcode = read_expected(&base_path.with_extension("exitcode"))
        .map(|text| {
            text.trim()
                .parse::<i32>()
                .unwrap_or_else(|e| panic!("Invalid exitcode for {:?}: {}", test_path, e))
        })
        .unwrap_or(0);

    assert_eq!(
        actual_exitcode, expected_exitcode,
        "exit code mismatch for {:?}: expected {}, got {}\nstderr:\n{}",
        test_path, expected_exitcode, actual_exitcode, actual_stderr
    );
}

/// Discover and run all .pl0 tests in a directory
fn run_snapshot_dir(dir: &str) {
    let dir_path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
        .join(dir);

    if !dir_path.exists() {
        return;
    }

    let mut entries: Vec<_> = fs::read_dir(&dir_path)
        .unwrap_or_else(|e| panic!("Failed to read {:?}: {}", dir_path, e))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "pl0"))
        .collect();
    entries.sort();

    assert!(!entries.is_empty(), "no snapshot tests in {:?}", dir_path);
    for path in entries {
        run_snapshot_test(&path);
    }
}

#[test]
fn snapshot_basic() {
    run_snapshot_dir("basic");
}

#[test]
fn snapshot_errors() {
    run_snapshot_dir("errors");
}

#[test]
fn snapshot_listings() {
    run_snapshot_dir("listings");
}
