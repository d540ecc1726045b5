use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wmgate_common::{ConfigPatch, DEFAULT_CONFIG_PATH, ModePreference};

#[derive(Debug, Parser)]
#[command(name = "wmgate", version, about = "OpenAI- and Google-style APIs over a web model")]
pub(crate) struct Cli {
    #[arg(long, env = "WMGATE_CONFIG", default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub(crate) config: PathBuf,
    #[arg(long, env = "WMGATE_HOST", global = true)]
    pub(crate) host: Option<String>,
    #[arg(long, env = "WMGATE_PORT", global = true)]
    pub(crate) port: Option<u16>,
    /// auto, webai or native-api
    #[arg(long, env = "WMGATE_MODE", global = true)]
    pub(crate) mode: Option<ModePreference>,
    /// gemini-web or openai-web
    #[arg(long, env = "WMGATE_PROVIDER", global = true)]
    pub(crate) provider: Option<String>,
    #[arg(long, global = true)]
    pub(crate) model: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub(crate) enum Command {
    /// Run the gateway until interrupted (default).
    Serve,
    /// Probe providers and print the runtime state as JSON.
    Status,
    /// Write a default configuration file.
    InitConfig {
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Overrides layered over the file on every load.
    pub(crate) fn patch(&self) -> ConfigPatch {
        ConfigPatch {
            host: self.host.clone(),
            port: self.port,
            default_mode: self.mode,
            active_provider: self.provider.clone(),
            default_model: self.model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_become_a_patch() {
        let cli = Cli::try_parse_from([
            "wmgate",
            "--config",
            "/tmp/gw.json",
            "status",
            "--port",
            "8080",
            "--mode",
            "native-api",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Command::Status));
        assert_eq!(cli.config, PathBuf::from("/tmp/gw.json"));
        let patch = cli.patch();
        assert_eq!(patch.port, Some(8080));
        assert_eq!(patch.default_mode, Some(ModePreference::NativeApi));
        assert_eq!(patch.host, None);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["wmgate", "--mode", "turbo"]).is_err());
    }

    #[test]
    fn init_config_takes_force() {
        let cli = Cli::try_parse_from(["wmgate", "init-config", "--force"]).unwrap();
        assert_eq!(cli.command, Some(Command::InitConfig { force: true }));
    }
}
