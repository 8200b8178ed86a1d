//! Tempredict firmware: main entry point.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                    │
//! │   Esp32Board / SimBoard            LogEventSink           │
//! │   (Hal + WatchdogHal + AnalogPort) (EventSink)            │
//! │                                                           │
//! │  ───────────── Port Trait Boundary ────────────────────   │
//! │                                                           │
//! │   Gpio · Timer · Watchdog · InterruptTable                │
//! │   ┌───────────────────────────────────────────────────┐   │
//! │   │  ControlLoop: Debouncer · PredictionTask · LinReg │   │
//! │   └───────────────────────────────────────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! After setup the main task does nothing but service the watchdog. On the
//! host the same loop runs against [`SimBoard`], driven in real time by a
//! second thread.
//!
//! [`SimBoard`]: tempredict::adapters::sim::SimBoard
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info};

use tempredict::adapters::log_sink::LogEventSink;
use tempredict::app::control::{ControlLoop, Peripherals};
use tempredict::app::ports::{AnalogPort, Hal, WatchdogHal};
use tempredict::config::SystemConfig;

type Node<H> = ControlLoop<'static, H, H, H, LogEventSink>;

/// Build the peripherals on `board` and run setup, leaving the watchdog
/// unarmed. Devices live until the next reset.
fn bring_up<H>(board: &'static H, config: &SystemConfig) -> tempredict::Result<Node<H>>
where
    H: Hal + WatchdogHal + AnalogPort,
{
    let peripherals: &'static Peripherals<'static, H> =
        Box::leak(Box::new(Peripherals::new(board, config)?));
    ControlLoop::setup(peripherals, board, board, LogEventSink::new(), config)
}

fn banner() {
    info!("╔══════════════════════════════════════╗");
    info!("║  Tempredict v{}                   ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
}

// ── ESP32 ─────────────────────────────────────────────────────

/// Every caller runs before `arm`, so the watchdog is off and the board
/// stays halted with the error LED state intact.
#[cfg(target_os = "espidf")]
#[allow(clippy::empty_loop)]
fn halt() -> ! {
    loop {}
}

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    use tempredict::adapters::esp32::{install_vectors, Esp32Board};

    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    banner();

    // ── 2. Board ──────────────────────────────────────────────
    let board: &'static Esp32Board = match Esp32Board::new() {
        Ok(board) => Box::leak(Box::new(board)),
        Err(e) => {
            error!("board init failed: {}, halting", e);
            halt()
        }
    };

    // ── 3. Setup ──────────────────────────────────────────────
    let config = SystemConfig::default();
    let control: &'static Node<Esp32Board> = match bring_up(board, &config) {
        Ok(control) => Box::leak(Box::new(control)),
        Err(e) => {
            error!("setup failed: {}, halting", e);
            halt()
        }
    };
    if let Err(e) = install_vectors(board, control.vectors()) {
        error!("interrupt install failed: {}, halting", e);
        halt()
    }
    if let Err(e) = control.arm() {
        error!("watchdog arm failed: {}, halting", e);
        halt()
    }

    // ── 4. Superloop ──────────────────────────────────────────
    control.run()
}

// ── Host simulator ────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
fn load_config() -> Result<SystemConfig> {
    use anyhow::Context;

    let Some(path) = std::env::args().nth(1) else {
        info!("config: using defaults");
        return Ok(SystemConfig::default());
    };
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = SystemConfig::from_json(&text)
        .map_err(tempredict::Error::from)
        .with_context(|| format!("parsing {path}"))?;
    info!("config: loaded {}", path);
    Ok(config)
}

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    use tempredict::adapters::sim::{run_realtime, SimBoard, SimScript};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    banner();

    let config = load_config()?;
    let board: &'static SimBoard = Box::leak(Box::new(SimBoard::new()));
    let script = SimScript::new(
        tempredict::app::ports::PinId::new(config.button_pin).map_err(tempredict::Error::from)?,
        config.temp_sensor_channel,
    );
    board.set_duty(config.temp_sensor_channel, script.base_duty);

    // A watchdog reset reboots the node on the same board; a setup error
    // exits where the board would halt.
    loop {
        let boot = board.resets();
        let control = bring_up(board, &config).inspect_err(|e| error!("setup failed: {}", e))?;
        control.arm()?;

        std::thread::scope(|s| {
            s.spawn(|| run_realtime(board, control.vectors(), &script));
            while board.resets() == boot {
                control.service();
            }
        });
        log::warn!("sim: watchdog reset at {:?} ms, rebooting", board.last_reset_ms());
    }
}
