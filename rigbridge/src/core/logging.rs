use env_logger::{Builder, Env};
use log::{Level, LevelFilter};
use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

pub use log::{debug, error, info, trace, warn};

const DEFAULT_FILTER: &str = "rigbridge=info,bridge=info";

/// Dependencies that chatter at info on every file event or packet.
const QUIET_MODULES: &[&str] = &["notify", "nannou_osc", "midir"];

/// Crate names dropped from the module tag.
const OWN_CRATES: &[&str] = &["rigbridge::", "bridge::"];

pub fn init_logger() {
    init_logger_with(DEFAULT_FILTER);
}

/// Like [`init_logger`] but with a caller-chosen fallback filter used
/// when `RUST_LOG` is unset. Later calls are no-ops.
pub fn init_logger_with(default_filter: &str) {
    let mut builder =
        Builder::from_env(Env::default().default_filter_or(default_filter));
    for module in QUIET_MODULES {
        builder.filter_module(module, LevelFilter::Warn);
    }

    builder.format(|_buf, record| {
        let writer = BufferWriter::stdout(ColorChoice::Auto);
        let mut buffer = writer.buffer();
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(level_color(record.level())));

        buffer.set_color(&spec)?;
        let module = short_module(record.module_path().unwrap_or("?"));
        write!(buffer, "[{:<5}][{}]", record.level(), module)?;
        buffer.reset()?;
        writeln!(buffer, " {}", record.args())?;
        writer.print(&buffer)?;
        Ok(())
    });

    let _ = builder.try_init();
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Cyan,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// `rigbridge::control::dispatcher` -> `control::dispatcher`. Paths from
/// other crates and crate roots are left alone.
fn short_module(path: &str) -> &str {
    OWN_CRATES
        .iter()
        .find_map(|prefix| path.strip_prefix(prefix))
        .unwrap_or(path)
}
