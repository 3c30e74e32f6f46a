//! The `-d -l -r -s -m -p` CLI surface, plus the `MIDIPORT` environment
//! fallback used when `-p` is omitted.

use clap::Parser;

use rme_core::{Result, RmeError};

/// Default multicast destination used by `-m`.
pub const MULTICAST_SEND_ADDR: &str = "udp!224.0.0.1!8222";

#[derive(Parser, Debug)]
#[command(name = "rme_app", about = "OSC<->SysEx control bridge for RME-family audio interfaces")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Disable level meter forwarding.
    #[arg(short = 'l', long = "no-level-meters")]
    pub no_level_meters: bool,

    /// OSC receive address (`udp!<host>!<port>`); its port is the local bind port.
    #[arg(short = 'r', long = "recv", default_value = "udp!127.0.0.1!7222")]
    pub recv_addr: String,

    /// OSC send address (`udp!<host>!<port>`), used unless `-m` is given.
    #[arg(short = 's', long = "send", default_value = "udp!127.0.0.1!8222")]
    pub send_addr: String,

    /// Send notifications to the multicast address instead of `-s`.
    #[arg(short = 'm', long = "multicast")]
    pub multicast: bool,

    /// MIDI port name (case-insensitive substring) or numeric index. Falls
    /// back to the `MIDIPORT` environment variable.
    #[arg(short = 'p', long = "port")]
    pub midi_port: Option<String>,
}

impl Cli {
    pub fn resolve_midi_port(&self) -> Result<String> {
        self.midi_port.clone().or_else(|| std::env::var("MIDIPORT").ok()).ok_or_else(|| {
            RmeError::config("Cli::resolve_midi_port", "device is not specified; pass -p or set MIDIPORT")
        })
    }

    pub fn send_addr(&self) -> &str {
        if self.multicast { MULTICAST_SEND_ADDR } else { &self.send_addr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_port_wins_over_the_environment() {
        let cli = Cli { debug: false, no_level_meters: false, recv_addr: String::new(), send_addr: String::new(), multicast: false, midi_port: Some("Fireface".to_string()) };
        assert_eq!(cli.resolve_midi_port().unwrap(), "Fireface");
    }

    #[test]
    fn multicast_flag_overrides_the_send_address() {
        let cli = Cli { debug: false, no_level_meters: false, recv_addr: String::new(), send_addr: "udp!127.0.0.1!9000".to_string(), multicast: true, midi_port: None };
        assert_eq!(cli.send_addr(), MULTICAST_SEND_ADDR);
    }
}
