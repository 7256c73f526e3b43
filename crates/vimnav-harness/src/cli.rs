#![forbid(unsafe_code)]

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use vimnav_runtime::RuntimeConfig;
use vimnav_runtime::config::load_settings_file;
use vimnav_runtime::logging::init_tracing;

use crate::driver::Driver;
use crate::error::{HarnessError, Result};
use crate::fake_page::FakePage;
use crate::script::parse_script;

#[derive(Debug, Parser)]
#[command(
    name = "vimnav-script",
    about = "Replay a key script against a fake page and print the trace as JSON lines",
    version
)]
pub struct Cli {
    /// Script file, or `-` for stdin.
    pub script: PathBuf,

    /// Settings file (.json or .toml). Overrides VIMNAV_SETTINGS.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// URL of the fake page.
    #[arg(long, default_value = "https://example.com/")]
    pub url: String,

    /// Number of links on the fake page.
    #[arg(long, default_value_t = 20)]
    pub links: usize,

    /// Searchable page text, replacing the demo text.
    #[arg(long)]
    pub text: Option<String>,

    /// Tracing filter. Overrides VIMNAV_LOG.
    #[arg(long)]
    pub log: Option<String>,
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    let mut config = RuntimeConfig::from_env();
    if let Some(filter) = &cli.log {
        config = config.with_log_filter(filter.clone());
    }
    init_tracing(&config.log_filter);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_with(&cli, &config, &mut out)
}

/// Run `cli` with an explicit config and output sink.
pub fn run_with<W: Write>(cli: &Cli, config: &RuntimeConfig, out: &mut W) -> Result<()> {
    let source = read_script(&cli.script)?;
    let steps = parse_script(&source)?;

    let settings = match &cli.settings {
        Some(path) => load_settings_file(path)?,
        None => config.load_settings()?,
    };

    let mut page = FakePage::demo(cli.links);
    if let Some(text) = &cli.text {
        page = page.with_text(text.clone());
    }

    let mut driver = Driver::new(settings, &cli.url, page);
    for record in driver.run(&steps) {
        serde_json::to_writer(&mut *out, &record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    let read = if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source).map(|_| source)
    } else {
        std::fs::read_to_string(path)
    };
    read.map_err(|source| HarnessError::ReadScript {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tempfile::tempdir;

    fn cli(script: PathBuf) -> Cli {
        Cli::parse_from(["vimnav-script", script.to_str().unwrap()])
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = cli(PathBuf::from("-"));
        assert_eq!(cli.url, "https://example.com/");
        assert_eq!(cli.links, 20);
        assert!(cli.settings.is_none());
    }

    #[test]
    fn prints_one_json_object_per_line() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("scroll.vns");
        std::fs::write(&script, "# instant scroll\nkeys G\n").unwrap();

        let mut out = Vec::new();
        run_with(&cli(script), &RuntimeConfig::default(), &mut out).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["call"], "mode_indicator");
        assert_eq!(lines[1]["event"], "key");
        assert_eq!(lines[1]["key"], "G");
        assert_eq!(lines[1]["disposition"], "consumed");
        assert_eq!(lines[2]["call"], "scroll_to");
    }

    #[test]
    fn settings_flag_wins_over_config() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("s.vns");
        std::fs::write(&script, "keys j\n").unwrap();
        let settings = dir.path().join("vimnav.toml");
        std::fs::write(&settings, "smoothScroll = false\nscrollStepSize = 40\n").unwrap();

        let mut cli = cli(script);
        cli.settings = Some(settings);
        let config = RuntimeConfig::default().with_settings_path("/nonexistent/vimnav.json");

        let mut out = Vec::new();
        run_with(&cli, &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(r#""call":"scroll_by","dx":0.0,"dy":40.0"#), "{text}");
    }

    #[test]
    fn missing_script_is_a_read_error() {
        let err = run_with(
            &cli(PathBuf::from("/nonexistent/script.vns")),
            &RuntimeConfig::default(),
            &mut Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(err, HarnessError::ReadScript { .. }));
        assert_eq!(err.exit_code(), 2);
    }
}
