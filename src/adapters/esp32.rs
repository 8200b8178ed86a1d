//! ESP32-S3 board adapter.
//!
//! Implements the [`Hal`], [`WatchdogHal`] and [`AnalogPort`] ports on top
//! of the raw ESP-IDF APIs:
//!
//! | Port concept          | ESP-IDF mechanism                              |
//! |-----------------------|------------------------------------------------|
//! | pin-change interrupt  | per-pin GPIO ISR, `GPIO_INTR_ANYEDGE`          |
//! | pin / port mask       | software masks applied via `gpio_intr_enable`  |
//! | counter tick          | one 1 ms periodic `esp_timer`                  |
//! | watchdog              | Task Watchdog Timer (TWDT)                     |
//! | analog input          | ADC1 oneshot, 12 bit                           |
//!
//! The GPIO ISR only latches the pin into [`PENDING_PINS`]. Handlers are
//! dispatched from the tick callback, which runs in the `esp_timer` task,
//! so every handler (including ADC reads) executes in one task context
//! and never inside a hardware ISR.

use core::ffi::c_void;
use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicPtr, AtomicU8, AtomicU32, Ordering};
use std::sync::OnceLock;

use esp_idf_svc::sys::*;
use log::{info, warn};

use crate::app::ports::{
    AnalogPort, Circuit, Direction, Hal, IoPort, IrqSource, PinId, Vector, WatchdogHal,
};
use crate::drivers::timer::{CircuitRegistry, TICK_MS};
use crate::drivers::watchdog::Timeout;
use crate::interrupts::InterruptTable;
use crate::pins;

const ADC_FULL_SCALE: f64 = 4095.0;
const ADC_CHANNELS: u8 = 8;

/// Pins whose level changed since the last tick. Written from the GPIO ISR.
static PENDING_PINS: AtomicU32 = AtomicU32::new(0);

/// Board and vector table, published once by [`install_vectors`].
static DISPATCH: OnceLock<(&'static Esp32Board, &'static InterruptTable<'static>)> =
    OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    IsrService(i32),
    Adc(i32),
    TickTimer(i32),
    AlreadyInstalled,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsrService(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
            Self::Adc(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::TickTimer(rc) => write!(f, "tick timer start failed (rc={rc})"),
            Self::AlreadyInstalled => write!(f, "interrupt vectors already installed"),
        }
    }
}

impl core::error::Error for BoardError {}

pub struct Esp32Board {
    circuits: CircuitRegistry,
    pin_mask: AtomicU32,
    port_mask: AtomicU8,
    timer_mask: AtomicU8,
    adc: AtomicPtr<adc_oneshot_unit_ctx_t>,
    wdt_running: AtomicBool,
    wdt_timeout_ms: AtomicU32,
}

impl Esp32Board {
    /// Install the GPIO ISR service and bring up ADC1.
    pub fn new() -> Result<Self, BoardError> {
        // SAFETY: ESP_ERR_INVALID_STATE means the service is already
        // installed, which is fine.
        let ret = unsafe { gpio_install_isr_service(0) };
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(BoardError::IsrService(ret));
        }

        let mut adc: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        // SAFETY: called once at boot from the main task.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut adc) };
        if ret != ESP_OK {
            return Err(BoardError::Adc(ret));
        }
        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        for channel in (0..ADC_CHANNELS).filter_map(pins::esp32_adc1_channel) {
            // SAFETY: `adc` was just created.
            let ret = unsafe { adc_oneshot_config_channel(adc, channel, &chan_cfg) };
            if ret != ESP_OK {
                return Err(BoardError::Adc(ret));
            }
        }
        info!("esp32: GPIO ISR service and ADC1 ready");

        Ok(Self {
            circuits: CircuitRegistry::new(),
            pin_mask: AtomicU32::new(0),
            port_mask: AtomicU8::new(0),
            timer_mask: AtomicU8::new(0),
            adc: AtomicPtr::new(adc),
            wdt_running: AtomicBool::new(false),
            wdt_timeout_ms: AtomicU32::new(0),
        })
    }

    fn armed(&self, pin: PinId) -> bool {
        self.pin_mask.load(Ordering::Acquire) & (1 << pin.index()) != 0
            && self.port_mask.load(Ordering::Acquire) & pin.port().mask() != 0
    }

    /// Push the software masks for `pin` down to the GPIO interrupt enable.
    fn apply_mask(&self, pin: PinId) {
        let gpio = pins::esp32_gpio(pin);
        // SAFETY: enabling/disabling a GPIO interrupt is a register write.
        unsafe {
            if self.armed(pin) {
                gpio_intr_enable(gpio);
            } else {
                gpio_intr_disable(gpio);
            }
        }
    }

    fn apply_port(&self, port: IoPort) {
        for n in 0..PinId::COUNT as u8 {
            if let Ok(pin) = PinId::new(n) {
                if pin.port() == port {
                    self.apply_mask(pin);
                }
            }
        }
    }

    fn configure_watchdog(&self, timeout_ms: u32, trigger_panic: bool) {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic,
        };
        // SAFETY: TWDT reconfiguration is allowed at any time after boot.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("esp32: TWDT reconfigure returned {}", ret);
        }
    }

    /// One tick: deliver latched pin changes, then counter ticks.
    fn tick(&self, vectors: &InterruptTable<'_>) {
        let pending = PENDING_PINS.swap(0, Ordering::AcqRel);
        if pending != 0 {
            for n in 0..PinId::COUNT as u8 {
                let Ok(pin) = PinId::new(n) else { continue };
                if pending & (1 << n) != 0 && self.armed(pin) {
                    vectors.dispatch(Vector::PinChange(pin));
                }
            }
        }
        let timers = self.timer_mask.load(Ordering::Acquire);
        for circuit in Circuit::ALL {
            if timers & circuit.mask() != 0 {
                vectors.dispatch(Vector::TimerTick(circuit));
            }
        }
    }
}

impl Hal for Esp32Board {
    fn configure(&self, pin: PinId, direction: Direction) {
        let gpio = pins::esp32_gpio(pin);
        let (mode, pull_up, intr) = match direction {
            Direction::Output => (
                gpio_mode_t_GPIO_MODE_OUTPUT,
                gpio_pullup_t_GPIO_PULLUP_DISABLE,
                gpio_int_type_t_GPIO_INTR_DISABLE,
            ),
            Direction::Input => (
                gpio_mode_t_GPIO_MODE_INPUT,
                gpio_pullup_t_GPIO_PULLUP_DISABLE,
                gpio_int_type_t_GPIO_INTR_ANYEDGE,
            ),
            Direction::InputPullup => (
                gpio_mode_t_GPIO_MODE_INPUT,
                gpio_pullup_t_GPIO_PULLUP_ENABLE,
                gpio_int_type_t_GPIO_INTR_ANYEDGE,
            ),
        };
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode,
            pull_up_en: pull_up,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: intr,
            ..Default::default()
        };
        // SAFETY: `gpio` comes from the board pin map; the ISR argument is
        // the logical pin number, not a pointer.
        unsafe {
            let ret = gpio_config(&cfg);
            if ret != ESP_OK {
                warn!("esp32: gpio_config({}) returned {}", gpio, ret);
            }
            if direction.is_input() {
                gpio_isr_handler_add(gpio, Some(pin_change_isr), pin.index() as *mut c_void);
            } else {
                gpio_set_level(gpio, 0);
            }
        }
        self.apply_mask(pin);
    }

    fn read(&self, pin: PinId) -> bool {
        // SAFETY: register read on a configured pin.
        (unsafe { gpio_get_level(pins::esp32_gpio(pin)) }) != 0
    }

    fn write(&self, pin: PinId, high: bool) {
        // SAFETY: register write on a configured output.
        unsafe {
            gpio_set_level(pins::esp32_gpio(pin), u32::from(high));
        }
    }

    fn enable_interrupt(&self, source: IrqSource) {
        match source {
            IrqSource::Pin(pin) => {
                self.pin_mask.fetch_or(1 << pin.index(), Ordering::AcqRel);
                self.apply_mask(pin);
            }
            IrqSource::Port(port) => {
                self.port_mask.fetch_or(port.mask(), Ordering::AcqRel);
                self.apply_port(port);
            }
            IrqSource::Timer(circuit) => {
                self.timer_mask.fetch_or(circuit.mask(), Ordering::AcqRel);
            }
        }
    }

    fn disable_interrupt(&self, source: IrqSource) {
        match source {
            IrqSource::Pin(pin) => {
                self.pin_mask.fetch_and(!(1 << pin.index()), Ordering::AcqRel);
                self.apply_mask(pin);
            }
            IrqSource::Port(port) => {
                self.port_mask.fetch_and(!port.mask(), Ordering::AcqRel);
                self.apply_port(port);
            }
            IrqSource::Timer(circuit) => {
                self.timer_mask.fetch_and(!circuit.mask(), Ordering::AcqRel);
            }
        }
    }

    fn circuits(&self) -> &CircuitRegistry {
        &self.circuits
    }
}

impl WatchdogHal for Esp32Board {
    fn is_running(&self) -> bool {
        self.wdt_running.load(Ordering::Acquire)
    }

    fn start(&self, timeout: Timeout) {
        self.wdt_timeout_ms.store(timeout.as_ms(), Ordering::Release);
        // Without panic the TWDT only reports the starving task.
        self.configure_watchdog(timeout.as_ms(), false);
        // SAFETY: subscribes the calling (main) task.
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        if ret != ESP_OK {
            warn!("esp32: TWDT subscribe returned {}", ret);
        }
        self.wdt_running.store(true, Ordering::Release);
    }

    fn enable_system_reset(&self) {
        self.configure_watchdog(self.wdt_timeout_ms.load(Ordering::Acquire), true);
    }

    fn feed(&self) {
        // SAFETY: resets the calling task's TWDT entry.
        unsafe {
            esp_task_wdt_reset();
        }
    }
}

impl AnalogPort for Esp32Board {
    fn duty_cycle(&self, channel: u8) -> f64 {
        let Some(channel) = pins::esp32_adc1_channel(channel) else {
            return 0.0;
        };
        let mut raw: i32 = 0;
        // SAFETY: the handle was created in `new` and is never freed.
        let ret = unsafe { adc_oneshot_read(self.adc.load(Ordering::Acquire), channel, &mut raw) };
        if ret != ESP_OK {
            return 0.0;
        }
        f64::from(raw.max(0)) / ADC_FULL_SCALE
    }
}

// ── Interrupt plumbing ────────────────────────────────────────

unsafe extern "C" fn pin_change_isr(arg: *mut c_void) {
    PENDING_PINS.fetch_or(1 << (arg as usize as u32 & 0x1f), Ordering::AcqRel);
}

unsafe extern "C" fn tick_cb(_arg: *mut c_void) {
    if let Some((board, vectors)) = DISPATCH.get() {
        board.tick(vectors);
    }
}

/// Publish the vector table and start the 1 ms tick. Call once, after
/// setup has filled the table.
pub fn install_vectors(
    board: &'static Esp32Board,
    vectors: &'static InterruptTable<'static>,
) -> Result<(), BoardError> {
    DISPATCH
        .set((board, vectors))
        .map_err(|_| BoardError::AlreadyInstalled)?;

    let args = esp_timer_create_args_t {
        callback: Some(tick_cb),
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: c"tick".as_ptr(),
        skip_unhandled_events: true,
    };
    let mut handle: esp_timer_handle_t = core::ptr::null_mut();
    // SAFETY: the timer is created once and runs for the process lifetime.
    unsafe {
        let ret = esp_timer_create(&args, &mut handle);
        if ret != ESP_OK {
            return Err(BoardError::TickTimer(ret));
        }
        let ret = esp_timer_start_periodic(handle, u64::from(TICK_MS) * 1_000);
        if ret != ESP_OK {
            return Err(BoardError::TickTimer(ret));
        }
    }
    info!("esp32: {} vectors installed, {} ms tick running", vectors.len(), TICK_MS);
    Ok(())
}
