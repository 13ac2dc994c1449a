// shellmark-core/src/bin/marker_probe.rs
//
// Pipe a shell session's output through this to see the markers it carries:
//
//     shellmark 2>/dev/null | marker_probe
//
// Prompt text and command output pass through to stdout untouched; every
// decoded OSC event is printed to stderr as one JSON line.

use anyhow::{Context, Result};
use shellmark_core::term::OscParser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    eprintln!("[marker_probe] reading stdin… (Ctrl+D to finish)");

    let mut stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut parser = OscParser::new();
    let mut buf = [0u8; 4096];
    let mut seen = 0usize;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\n[marker_probe] Ctrl+C received, exiting…");
                break;
            }

            n = stdin.read(&mut buf) => {
                let n = n.context("stdin read failed")?;
                if n == 0 {
                    break;
                }

                let bytes = &buf[..n];
                if stdout.write_all(bytes).await.is_ok() {
                    let _ = stdout.flush().await;
                }

                for event in parser.feed(bytes) {
                    seen += 1;
                    let line = serde_json::to_string(&event).context("encode event")?;
                    eprintln!("{line}");
                }
            }
        }
    }

    eprintln!("[marker_probe] {seen} OSC event(s)");
    Ok(())
}
