use clap::{Parser, Subcommand};
use kura_config::KuraConfig;
use std::path::PathBuf;

/// Sentiment analysis and fact checking for Kenyan election content.
#[derive(Debug, Parser)]
#[command(name = "kura", version, about)]
pub struct Cli {
    /// YAML config file. Defaults to the platform config dir when present.
    #[arg(long, short, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Gemini API key; overrides `upstream.api_key`.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name; overrides `upstream.model`.
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report whether the upstream model is configured.
    Status,
    /// Analyze one or more posts; prints a JSON array in input order.
    Analyze {
        #[arg(required = true, value_parser = non_blank)]
        texts: Vec<String>,
    },
    /// Fact-check a single claim; prints a JSON object.
    Verify {
        #[arg(value_parser = non_blank)]
        claim: String,
    },
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, cfg: &mut KuraConfig) {
        if let Some(key) = &self.api_key {
            cfg.upstream.api_key = Some(key.clone());
        }
        if let Some(model) = &self.model {
            cfg.upstream.model = model.clone();
        }
    }
}

fn non_blank(raw: &str) -> Result<String, String> {
    if raw.trim().is_empty() {
        Err("must not be empty".to_string())
    } else {
        Ok(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("kura").chain(args.iter().copied()))
    }

    #[test]
    fn analyze_accepts_several_texts_in_order() {
        let cli = parse(&["analyze", "first post", "second post"]).unwrap();
        match cli.command {
            Command::Analyze { texts } => assert_eq!(texts, vec!["first post", "second post"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn blank_arguments_are_rejected() {
        assert!(parse(&["verify", "   "]).is_err());
        assert!(parse(&["analyze", "ok", ""]).is_err());
        assert!(parse(&["analyze"]).is_err());
    }

    #[test]
    fn global_flags_override_config() {
        temp_env::with_var_unset("GEMINI_API_KEY", || {
            let cli = parse(&["status", "--model", "gemini-2.5-pro", "--api-key", "k"]).unwrap();
            let mut cfg = KuraConfig::default();
            cli.apply_overrides(&mut cfg);
            assert_eq!(cfg.upstream.model, "gemini-2.5-pro");
            assert_eq!(cfg.upstream.credential(), Some("k"));
        });
    }

    #[test]
    fn api_key_falls_back_to_environment() {
        temp_env::with_var("GEMINI_API_KEY", Some("from-env"), || {
            let cli = parse(&["status"]).unwrap();
            assert_eq!(cli.api_key.as_deref(), Some("from-env"));
        });
    }

    #[test]
    fn absent_flags_keep_config_values() {
        temp_env::with_var_unset("GEMINI_API_KEY", || {
            let cli = parse(&["verify", "claim"]).unwrap();
            let mut cfg = KuraConfig::default();
            cfg.upstream.model = "from-file".into();
            cli.apply_overrides(&mut cfg);
            assert_eq!(cfg.upstream.model, "from-file");
            assert_eq!(cfg.upstream.api_key, None);
        });
    }
}
