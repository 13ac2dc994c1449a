use anyhow::{Context, Result};
use shellmark_core::{install, FeatureSet, ProcessEnv};
use shellmark_shell::{util, ExecMode, Repl, ShellConfig};
use tokio::io::BufReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    util::init_tracing();
    util::install_panic_hook();

    // Consumed here, before any command runs, so children never see it.
    let features = FeatureSet::from_env(&mut ProcessEnv);

    let config = ShellConfig::load().context("failed to load shellmark config")?;
    let mut repl = Repl::new(&config, std::io::stdout(), ExecMode::Inherit);

    let outcome = install(repl.host_mut(), features.as_ref());
    tracing::debug!(?outcome, "shell integration");

    let stdin = BufReader::new(tokio::io::stdin());
    let code = repl.run(stdin).await?;

    std::process::exit(code);
}
