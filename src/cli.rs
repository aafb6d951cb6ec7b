//! Command-line flags layered over the config file

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "kiosk-daemon", version, about = "Face-triggered listen-and-repeat kiosk")]
pub struct Cli {
    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Serial device driving the relay
    #[arg(long)]
    pub serial_port: Option<PathBuf>,

    /// Phrase file, one phrase per line
    #[arg(long)]
    pub phrases: Option<PathBuf>,

    /// Run without the serial relay
    #[arg(long)]
    pub no_hardware: bool,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.serial_port {
            config.hardware.port = port.clone();
        }
        if let Some(path) = &self.phrases {
            config.phrases.path = path.clone();
        }
        if self.no_hardware {
            config.hardware.enabled = false;
        }
    }
}
