//! Interactive session: read a query, run the workflow, print the report, repeat.
//!
//! One [`OncallSession`] serves the whole loop, so every answer can build on the
//! reports and insights of the earlier ones.

use std::io::Write;

use oncall::{OncallRuntime, OncallSession};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::RunError;

fn is_quit_command(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    matches!(lower.as_str(), "quit" | "exit" | "/quit")
}

/// Runs until EOF or a quit command. A failed query is reported and the loop continues.
pub async fn run_repl<R, W>(runtime: &OncallRuntime, input: R, out: &mut W) -> Result<(), RunError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = OncallSession::new(runtime)?;
    let mut lines = input.lines();

    loop {
        write!(out, "sp-oncall> ")?;
        out.flush()?;

        let line = match lines.next_line().await? {
            None => break,
            Some(s) if s.trim().is_empty() => continue,
            Some(s) if is_quit_command(&s) => break,
            Some(s) => s,
        };

        match session.ask(line.trim()).await {
            Ok(report) => writeln!(out, "{}\n", report)?,
            Err(e) => writeln!(out, "error: {}\n", e)?,
        }
    }

    writeln!(
        out,
        "Bye. {} investigation session(s) in history.",
        session.history().len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::tests::mock_runtime;

    #[test]
    fn quit_commands() {
        assert!(is_quit_command("quit"));
        assert!(is_quit_command(" EXIT "));
        assert!(is_quit_command("/quit"));
        assert!(!is_quit_command("check R1"));
    }

    /// **Scenario**: Two queries share one session; blank lines are skipped and `quit` stops.
    #[tokio::test]
    async fn repl_keeps_history_across_queries() {
        let runtime = mock_runtime("REPORT: all quiet");
        let input: &[u8] = b"check R1\n\n   \ncheck R2\nquit\ncheck R3\n";
        let mut out = Vec::new();
        run_repl(&runtime, input, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("REPORT: all quiet").count(), 2);
        assert!(text.ends_with("Bye. 2 investigation session(s) in history.\n"));
    }

    /// **Scenario**: EOF without input ends the loop cleanly.
    #[tokio::test]
    async fn repl_eof_exits() {
        let runtime = mock_runtime("REPORT");
        let mut out = Vec::new();
        run_repl(&runtime, &b""[..], &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Bye. 0 investigation session(s)"));
    }
}
