use std::error::Error;

use clap::Parser;
use rigbridge::prelude::*;

mod cli;
use cli::Cli;

type Transports = Vec<Box<dyn TransportAdapter>>;
type AppBridge = Bridge<Transports, MemoryTimeline>;

fn main() {
    init_logger();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("{}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    if cli.list_midi_ports {
        return list_midi_ports();
    }

    let mut settings = match &cli.settings {
        Some(path) => BridgeSettings::load(path)?,
        None => BridgeSettings::load_default()?,
    };
    cli.apply(&mut settings);

    let mapping_path = settings
        .mapping
        .clone()
        .ok_or("No mapping file given (--mapping or `mapping` setting)")?;
    let (mapping, skipped) = MappingTable::from_path(&mapping_path)?;
    for err in &skipped {
        warn!("{}", err);
    }

    let dispatcher =
        BridgeDispatcher::new(mapping, settings.dispatcher_settings());
    let mut bridge = Bridge::new(
        open_transports(&settings)?,
        settings.open_timeline(),
        dispatcher,
    );
    if settings.watch_mapping {
        bridge = bridge.with_watcher(MappingWatcher::new(&mapping_path)?);
    }

    let mut source = ClockSource::new(settings.fps);
    let mut scheduler = CycleScheduler::<AppBridge>::new();

    if let Some(delay) = cli.delay {
        scheduler.wait_n_cycles_then_run(
            move |_: &mut AppBridge, _| {
                info!("Waited {} cycles, starting bridge", delay);
            },
            delay,
        )?;
        run_until_idle(&mut source, &mut scheduler, &mut bridge);
    }

    match cli.cycles {
        Some(n) => {
            scheduler.register_for_n_cycles(
                |bridge: &mut AppBridge, _| {
                    bridge.cycle();
                },
                n,
                Some(Box::new(|bridge: &mut AppBridge, _| {
                    match bridge.export() {
                        Ok(path) => info!("Exported to {}", path.display()),
                        Err(e) => error!("Export failed: {}", e),
                    }
                })),
            )?;
        }
        None => {
            scheduler.register(|bridge: &mut AppBridge, _| {
                bridge.cycle();
            });
        }
    }

    let cycles = run_until_idle(&mut source, &mut scheduler, &mut bridge);
    info!("Bridge stopped after {} cycles", cycles);

    Ok(())
}

fn open_transports(
    settings: &BridgeSettings,
) -> Result<Transports, Box<dyn Error>> {
    let mut transports: Transports =
        vec![Box::new(OscTransport::bind(settings.osc.port)?)];

    #[cfg(feature = "midi")]
    if let Some(port) = &settings.midi.port {
        transports.push(Box::new(MidiTransport::connect(port)?));
    }

    #[cfg(not(feature = "midi"))]
    if settings.midi.port.is_some() {
        warn!("Built without MIDI support, ignoring MIDI port setting");
    }

    Ok(transports)
}

#[cfg(feature = "midi")]
fn list_midi_ports() -> Result<(), Box<dyn Error>> {
    let ports = rigbridge::io::midi::list_input_ports()?;
    println!("\nAvailable MIDI input ports:");
    for (i, name) in ports {
        println!("{}: {}", i, name);
    }
    Ok(())
}

#[cfg(not(feature = "midi"))]
fn list_midi_ports() -> Result<(), Box<dyn Error>> {
    Err("Built without MIDI support".into())
}
