use core::convert::Infallible;

use embedded_hal::delay::DelayNs;

use crate::radio::{RadioLink, RadioServices};

/// Runs one transmit window of a polled radio unit.
///
/// Drains every byte `read` has available into the link, then opens a window
/// and writes the selected message (if any) through `write`.
///
/// # Returns
/// `Ok(true)` if a message was written.
pub fn poll_window<S, R, W, E>(
    radio: &mut RadioLink,
    services: &mut S,
    read: &mut R,
    write: &mut W,
) -> Result<bool, E>
where
    S: RadioServices,
    R: FnMut() -> nb::Result<u8, E>,
    W: FnMut(u8) -> nb::Result<(), E>,
{
    loop {
        match read() {
            Ok(byte) => radio.on_uart_rx(byte, services),
            Err(nb::Error::WouldBlock) => break,
            Err(nb::Error::Other(e)) => return Err(e),
        }
    }
    radio.open_window();
    if !radio.poll_transmit() {
        return Ok(false);
    }
    while let Some(byte) = radio.next_tx_byte() {
        nb::block!(write(byte))?;
    }
    Ok(true)
}

/// Runs a blocking loop that gives the radio unit one transmit window every
/// `period_ms` milliseconds.
///
/// This is the polling alternative to a timer interrupt for firmware where the
/// link is the only job. `read` and `write` are usually thin wrappers around
/// the HAL's non-blocking UART reads and writes.
///
/// # Example
/// ```rust,ignore
/// use powerblade_link::timer::{REPORT_PERIOD_MS, run_window_loop};
/// let mut radio = RadioLink::new(RadioConfig::default());
/// run_window_loop(&mut radio, &mut ble, &mut delay, REPORT_PERIOD_MS,
///     || uart.read(), |b| uart.write(b))?;
/// ```
///
/// # Notes
/// - Returns only if `read` or `write` fails.
pub fn run_window_loop<D, S, R, W, E>(
    radio: &mut RadioLink,
    services: &mut S,
    delay: &mut D,
    period_ms: u32,
    mut read: R,
    mut write: W,
) -> Result<Infallible, E>
where
    D: DelayNs,
    S: RadioServices,
    R: FnMut() -> nb::Result<u8, E>,
    W: FnMut(u8) -> nb::Result<(), E>,
{
    loop {
        let _ = poll_window(radio, services, &mut read, &mut write)?;
        delay.delay_ms(period_ms);
    }
}
