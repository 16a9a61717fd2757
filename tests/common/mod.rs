//! A stand-in C++ toolchain: a shell script that "compiles" `main.cpp` into
//! a shell script echoing every `print("...")` statement of `main()`.
#![allow(dead_code)]

use std::path::Path;

use dsl2cpp::config::{EngineConfig, StderrPolicy};

const FAKE_COMPILER: &str = r#"src="$1"
out="$3"
if grep -q 'print("compile-error")' "$src"; then
    echo "main.cpp:12: error: 'frobnicate' was not declared in this scope" >&2
    exit 1
fi
if grep -q 'print("build-hang")' "$src"; then
    exec sleep 30
fi
{
    echo '#!/bin/sh'
    sed -n 's/^    print("\(.*\)");$/echo "\1"/p' "$src"
    if grep -q 'print("runtime-stderr")' "$src"; then echo 'echo "careful" >&2'; fi
    if grep -q 'print("crash")' "$src"; then echo 'echo "bad column" >&2; exit 3'; fi
    if grep -q 'print("hang")' "$src"; then echo 'exec sleep 30'; fi
    echo 'exit 0'
} > "$out"
chmod +x "$out"
"#;

/// Config whose toolchain is `sh <fake compiler>`, rooted under `dir`.
pub fn fake_config(dir: &Path) -> EngineConfig {
    let compiler = dir.join("fake-cxx.sh");
    std::fs::write(&compiler, FAKE_COMPILER).unwrap();

    let mut config = EngineConfig {
        workspace_root: dir.join("workspaces"),
        stderr_policy: StderrPolicy::Fail,
        ..EngineConfig::default()
    };
    config.toolchain.compiler = "sh".into();
    config.toolchain.flags = vec![compiler.to_string_lossy().into_owned()];
    config.limits.build_timeout_secs = 10;
    config.limits.run_timeout_secs = 10;
    config
}

/// Entries left under the workspace root.
pub fn leftover_workspaces(config: &EngineConfig) -> usize {
    match std::fs::read_dir(&config.workspace_root) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
