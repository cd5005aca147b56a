use std::path::PathBuf;

use clap::Parser;
use rigbridge::prelude::BridgeSettings;

#[derive(Debug, Parser, Clone)]
#[command(name = "bridge")]
#[command(about = "Write live OSC/MIDI control input into a timeline")]
pub struct Cli {
    /// Settings file (YAML). Defaults to the platform config dir.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Control mapping file (JSON or YAML).
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    #[arg(long)]
    pub osc_port: Option<u16>,

    /// Name of the MIDI input port to read control changes from.
    #[arg(long)]
    pub midi_port: Option<String>,

    #[arg(long)]
    pub rate_limit_ms: Option<u64>,

    #[arg(long)]
    pub fps: Option<f32>,

    /// Run for N cycles, then export and exit.
    #[arg(long)]
    pub cycles: Option<u32>,

    /// Wait N cycles before the bridge starts dispatching.
    #[arg(long)]
    pub delay: Option<u32>,

    /// Reload the mapping file when it changes.
    #[arg(long)]
    pub watch: bool,

    #[arg(long)]
    pub list_midi_ports: bool,
}

impl Cli {
    /// Layers command line values over `settings`.
    pub fn apply(&self, settings: &mut BridgeSettings) {
        if let Some(mapping) = &self.mapping {
            settings.mapping = Some(mapping.clone());
        }
        if let Some(port) = self.osc_port {
            settings.osc.port = port;
        }
        if let Some(port) = &self.midi_port {
            settings.midi.port = Some(port.clone());
        }
        if let Some(ms) = self.rate_limit_ms {
            settings.rate_limit_ms = ms;
        }
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if self.watch {
            settings.watch_mapping = true;
        }
    }
}
