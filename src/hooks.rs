//! Pre and post generation hook processing.
//! Runs the scripts a manifest declares under `hooks`, passing resolved
//! variables through the child environment and enforcing a timeout.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::{Error, Result};
use crate::kind::{HookCwd, KindProfile, Toolchain};
use crate::manifest::Manifest;
use crate::variables::ResolvedVariables;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Directories a hook can be started in.
#[derive(Debug, Clone)]
pub struct HookDirs {
    pub template_root: PathBuf,
    pub output_dir: PathBuf,
    pub project_dir: PathBuf,
}

impl HookDirs {
    fn resolve(&self, cwd: HookCwd) -> &Path {
        match cwd {
            HookCwd::TemplateRoot => &self.template_root,
            HookCwd::OutputDir => &self.output_dir,
            HookCwd::ProjectDir => &self.project_dir,
        }
    }
}

/// Captured output of a finished script.
#[derive(Debug, Clone, Default)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Builds the variables a hook sees on top of the inherited environment.
///
/// Every resolved variable becomes `<PREFIX><NAME>`; `OUTPUT_DIR`,
/// `PROJECT_DIR` and the kind's fixed entries are added last.
pub fn build_hook_env(
    profile: &KindProfile,
    variables: &ResolvedVariables,
    dirs: &HookDirs,
) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = variables
        .iter()
        .map(|(key, value)| (format!("{}{}", profile.env_prefix, key.to_uppercase()), value.to_string()))
        .collect();

    for fixed in profile.fixed_env {
        let value = variables
            .get(fixed.variable)
            .map(|v| v.to_string())
            .unwrap_or_else(|| fixed.fallback.to_string());
        env.push((fixed.key.to_string(), value));
    }

    env.push(("OUTPUT_DIR".to_string(), dirs.output_dir.display().to_string()));
    env.push(("PROJECT_DIR".to_string(), dirs.project_dir.display().to_string()));
    env
}

/// Runs the hook declared under `hook_name`, if any.
///
/// A missing declaration or missing script is not an error. Whether the
/// returned error aborts generation is the caller's decision.
///
/// # Errors
/// * `Error::HookError` if the script exits with a non-zero status
/// * `Error::HookTimeoutError` if it outlives its timeout
pub fn run_hook(
    manifest: &Manifest,
    profile: &KindProfile,
    hook_name: &str,
    variables: &ResolvedVariables,
    dirs: &HookDirs,
) -> Result<()> {
    let Some(hook) = manifest.hooks.get(hook_name) else {
        debug!("No '{}' hook declared", hook_name);
        return Ok(());
    };

    let script_path = dirs.template_root.join(&hook.script);
    if !script_path.exists() {
        warn!("{} hook script not found: {}", profile.display_name, script_path.display());
        return Ok(());
    }

    let description =
        hook.description.clone().unwrap_or_else(|| format!("Running {hook_name} hook"));
    info!("{}...", description);

    let policy = profile.hook_policy(hook_name);
    let timeout = Duration::from_secs(hook.timeout.unwrap_or(policy.timeout_secs));
    let env = build_hook_env(profile, variables, dirs);
    let output = run_script(hook_name, &script_path, &env, dirs.resolve(policy.cwd), timeout)?;

    if !output.stdout.trim().is_empty() {
        println!("{}", output.stdout.trim());
    }
    Ok(())
}

/// Runs `script_path` with bash, killing it once `timeout` elapses.
pub fn run_script(
    hook_name: &str,
    script_path: &Path,
    env: &[(String, String)],
    working_dir: &Path,
    timeout: Duration,
) -> Result<ScriptOutput> {
    debug!("Executing {} in {}", script_path.display(), working_dir.display());

    let mut child = Command::new("bash")
        .arg(script_path)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::HookError {
            hook: hook_name.to_string(),
            message: format!("failed to start {}: {e}", script_path.display()),
        })?;

    let deadline = Instant::now() + timeout;
    let timed_out =
        || Error::HookTimeoutError { hook: hook_name.to_string(), seconds: timeout.as_secs() };

    let stdout_rx = drain(child.stdout.take());
    let stderr_rx = drain(child.stderr.take());

    let Some(status) = wait_until(&mut child, deadline)? else {
        return Err(timed_out());
    };

    // A background child of the script may keep the pipes open past the script's exit.
    // Its readers stay detached once the deadline passes.
    let (Some(stdout), Some(stderr)) =
        (collect_until(&stdout_rx, deadline), collect_until(&stderr_rx, deadline))
    else {
        warn!("Hook '{}' exited but its output is still held open", hook_name);
        return Err(timed_out());
    };
    let output = ScriptOutput { stdout, stderr };

    if !status.success() {
        let message = match output.stderr.trim() {
            "" => format!("exited with {status}"),
            stderr => stderr.to_string(),
        };
        return Err(Error::HookError { hook: hook_name.to_string(), message });
    }

    Ok(output)
}

/// Checks that the kind's external toolchain answers within its timeout.
///
/// # Errors
/// * `Error::ToolchainMissingError` if it cannot be started, fails or hangs
pub fn check_toolchain(toolchain: &Toolchain) -> Result<()> {
    let missing = || Error::ToolchainMissingError { tool: toolchain.tool.to_string() };

    let mut child = Command::new(toolchain.program)
        .args(toolchain.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            debug!("Could not start {}: {}", toolchain.program, e);
            missing()
        })?;

    let deadline = Instant::now() + Duration::from_secs(toolchain.timeout_secs);
    match wait_until(&mut child, deadline)? {
        Some(status) if status.success() => Ok(()),
        _ => Err(missing()),
    }
}

/// Polls `child` until it exits. Returns `None` after killing it once `deadline` passes.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Reads a stream to its end on a separate thread.
fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_string(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Waits for a drained stream until `deadline`. `None` means the stream is still open.
fn collect_until(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(output) => Some(output),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}
