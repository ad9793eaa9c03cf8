use std::process::Command;

fn sp_oncall(args: &[&str], envs: &[(&str, &str)]) -> std::process::Output {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sp-oncall"));
    cmd.args(args)
        .current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("RUST_LOG")
        .env_remove("SP_ONCALL_MAX_RETRIES")
        .env_remove("SP_ONCALL_MODULE_LEVELS");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    cmd.output().expect("failed to run sp-oncall binary")
}

#[test]
fn help_lists_subcommands_and_flags() {
    let out = sp_oncall(&["--help"], &[]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("sp-oncall"));
    assert!(stdout.contains("tools"));
    assert!(stdout.contains("loggers"));
    assert!(stdout.contains("repl"));
    assert!(stdout.contains("--max-retries"));
    assert!(stdout.contains("--plans-dir"));
}

#[test]
fn missing_query_exits_with_usage_error() {
    let out = sp_oncall(&[], &[]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("provide a query"));
}

#[test]
fn invalid_max_retries_env_fails() {
    let out = sp_oncall(&["check", "R1"], &[("SP_ONCALL_MAX_RETRIES", "many")]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("SP_ONCALL_MAX_RETRIES"));
}

#[test]
fn loggers_reflect_module_levels() {
    let out = sp_oncall(
        &["loggers"],
        &[("SP_ONCALL_MODULE_LEVELS", "sp_oncall.nodes.executor=debug")],
    );
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("global level: info"));
    let executor = stdout
        .lines()
        .find(|l| l.starts_with("oncall::nodes::executor "))
        .expect("executor target listed");
    assert!(executor.trim_end().ends_with("debug"));
}

#[test]
fn tools_without_mcp_config_fails() {
    let out = sp_oncall(&["tools"], &[("SP_ONCALL_MCP_CONFIG", "missing_mcp_config.json")]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("mcp config"));
}
