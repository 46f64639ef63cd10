//! The EXEC command: fetch the file's bytes via an internal READ, then
//! run each non-empty line that isn't a Markdown code fence through the
//! interpreter, streaming stdout back. Disabled unless `--enable-exec`
//! is set, and confined to a small allowlist rather than a raw shell.

use std::process::Stdio;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::bridge;
use crate::registry::SsDescriptor;

/// Commands EXEC is permitted to run. A raw shell would let a file's
/// owner run anything as the name server process; this keeps the blast
/// radius to read-only inspection commands.
const ALLOWLIST: &[&str] = &["echo", "cat", "ls", "wc"];

pub async fn exec_file<W>(desc: &SsDescriptor, user: &str, pass: &str, filename: &str, out: &mut W)
where
    W: AsyncWrite + Unpin,
{
    let contents = match bridge::forward_and_collect(desc, user, pass, &format!("READ {filename}")).await {
        Ok(text) => text,
        Err(e) => {
            let _ = out.write_all(format!("ERROR: could not read '{filename}' for exec: {e}\n").as_bytes()).await;
            return;
        }
    };

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("```") {
            continue;
        }
        run_line(line, out).await;
    }
}

async fn run_line<W>(line: &str, out: &mut W)
where
    W: AsyncWrite + Unpin,
{
    let mut parts = line.split_whitespace();
    let Some(program) = parts.next() else { return };
    let args: Vec<&str> = parts.collect();

    if !ALLOWLIST.contains(&program) {
        let _ = out.write_all(format!("ERROR: '{program}' is not permitted under EXEC\n").as_bytes()).await;
        return;
    }

    tracing::warn!(program, line, "executing EXEC-sourced command");

    let output = Command::new(program).args(&args).stdin(Stdio::null()).output().await;
    match output {
        Ok(output) => {
            let _ = out.write_all(&output.stdout).await;
            let _ = out.write_all(&output.stderr).await;
        }
        Err(e) => {
            let _ = out.write_all(format!("ERROR: failed to run '{program}': {e}\n").as_bytes()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_command_outside_allowlist() {
        let mut out = Vec::new();
        run_line("rm -rf /", &mut out).await;
        assert!(String::from_utf8_lossy(&out).contains("not permitted"));
    }

    #[tokio::test]
    async fn runs_echo_from_allowlist() {
        let mut out = Vec::new();
        run_line("echo hello", &mut out).await;
        assert_eq!(String::from_utf8_lossy(&out).trim(), "hello");
    }
}
