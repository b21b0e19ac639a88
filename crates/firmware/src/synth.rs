//! Tasks sharing the synth shield's serial link: the edge handler that receives bytes and the MIDI-thru loop that
//! drains them.

use crate::{NOTE_PLAYED, RX_ARMED, SYNTH};
use defmt::{Display2Format, info, trace, warn};
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Ticker};
use serial_synth_lib::{midi::Assembler, transport::SerialPort};
use wmidi::MidiMessage;

/// One byte time at 31.25 kbaud, rounded up.
const BYTE_PERIOD: Duration = Duration::from_micros(320);

/// Runs the receive engine on every falling edge of the link's receive line.
///
/// Spawned on the high-priority executor so a start bit is serviced while lower-priority work is mid-flight.
#[embassy_executor::task]
pub async fn receive(mut rx_edge: ExtiInput<'static>) -> ! {
    RX_ARMED.wait().await;
    info!("Synth link receiving");

    loop {
        rx_edge.wait_for_falling_edge().await;
        SYNTH.lock(|synth| {
            if let Some(synth) = synth.borrow_mut().as_mut() {
                if let Err(e) = synth.port_mut().handle_pin_change() {
                    warn!("Receive failed: {}", Display2Format(&e));
                }
            }
        });
    }
}

/// Echoes every complete message received on the link back out to the synth, and reports played notes.
#[embassy_executor::task]
pub async fn midi_thru() -> ! {
    let mut assembler = Assembler::new();
    let mut ticker = Ticker::every(BYTE_PERIOD);

    loop {
        ticker.next().await;
        SYNTH.lock(|synth| {
            let mut synth = synth.borrow_mut();
            let Some(synth) = synth.as_mut() else {
                return;
            };

            if synth.port_mut().overflow() {
                warn!("Synth link dropped bytes");
            }

            while let Some(byte) = synth.port_mut().read() {
                let Some(message) = assembler.push(byte) else {
                    continue;
                };
                trace!("Thru {=u8:x}", byte);

                // Silent note ons were already turned into note offs by the assembler
                if let MidiMessage::NoteOn(_, note, _) = message {
                    NOTE_PLAYED.signal(note);
                }
                if let Err(e) = synth.send(&message) {
                    warn!("Thru failed: {}", Display2Format(&e));
                }
            }
        });
    }
}
