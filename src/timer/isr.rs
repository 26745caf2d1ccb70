use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

use crate::meter::Meter;
use crate::meter::accumulator::SampleChannel;
use crate::radio::{RadioLink, RadioServices};

/// A unit shared between the main loop and interrupt handlers.
pub type Shared<T> = Mutex<RefCell<Option<T>>>;

/// Creates an empty global slot.
///
/// # Example
/// ```rust
/// use powerblade_link::radio::RadioLink;
/// use powerblade_link::timer::{Shared, shared_init};
///
/// static RADIO: Shared<RadioLink> = shared_init();
/// ```
pub const fn shared_init<T>() -> Shared<T> {
    Mutex::new(RefCell::new(None))
}

/// Stores `value` in the global slot, replacing any previous instance.
pub fn shared_install<T>(global: &'static Shared<T>, value: T) {
    critical_section::with(|cs| {
        let _ = global.borrow(cs).replace(Some(value));
    });
}

/// Runs `f` on the installed instance inside a critical section.
///
/// # Returns
/// `None` if nothing was installed yet.
pub fn shared_with<T, R>(global: &'static Shared<T>, f: impl FnOnce(&mut T) -> R) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}

/// ADC conversion-complete handler for a shared metering unit.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn ADC10() {
///     global_meter_adc(&METER, channel, result);
/// }
/// ```
pub fn global_meter_adc<SEN: OutputPin, SYS: OutputPin>(
    global: &'static Shared<Meter<SEN, SYS>>,
    channel: SampleChannel,
    value: u16,
) {
    let _ = shared_with(global, |meter| meter.on_adc(channel, value));
}

/// UART receive handler for a shared metering unit.
pub fn global_meter_uart_rx<SEN: OutputPin, SYS: OutputPin>(
    global: &'static Shared<Meter<SEN, SYS>>,
    byte: u8,
) {
    let _ = shared_with(global, |meter| meter.on_uart_rx(byte));
}

/// UART transmit-ready handler for a shared metering unit.
pub fn global_meter_tx_byte<SEN: OutputPin, SYS: OutputPin>(
    global: &'static Shared<Meter<SEN, SYS>>,
) -> Option<u8> {
    shared_with(global, |meter| meter.next_tx_byte()).flatten()
}

/// Window timer handler for a shared radio unit: opens the window and loads
/// the highest-priority message, if any.
///
/// # Returns
/// `true` if a message was loaded; start the UART transmitter.
pub fn global_radio_window(global: &'static Shared<RadioLink>) -> bool {
    shared_with(global, |radio| {
        radio.open_window();
        radio.poll_transmit()
    })
    .unwrap_or(false)
}

/// UART receive handler for a shared radio unit.
pub fn global_radio_uart_rx<S: RadioServices>(
    global: &'static Shared<RadioLink>,
    byte: u8,
    services: &mut S,
) {
    let _ = shared_with(global, |radio| radio.on_uart_rx(byte, services));
}

/// UART transmit-ready handler for a shared radio unit.
pub fn global_radio_tx_byte(global: &'static Shared<RadioLink>) -> Option<u8> {
    shared_with(global, |radio| radio.next_tx_byte()).flatten()
}
