//! Front-panel display task.

use crate::{NOTE_PLAYED, platform::CycleDelay};
use core::fmt::Write as _;
use defmt::{info, unwrap, warn};
use embassy_stm32::gpio::Output;
use serial_synth_lib::vfd::{Icon, Vfd};

/// The display as wired on the Zio header.
pub type Display = Vfd<Output<'static>, Output<'static>, CycleDelay>;

/// Brightness used for normal operation, of a possible 15.
const BRIGHTNESS: u8 = 8;

/// Shows a banner, then the most recent note played through the synth.
#[embassy_executor::task]
pub async fn display(mut vfd: Display) -> ! {
    unwrap!(vfd.begin(true));
    unwrap!(vfd.set_brightness(BRIGHTNESS));
    if write!(vfd, "SYNTH READY").is_err() {
        warn!("Could not draw banner");
    }
    info!("Display ready");

    loop {
        let note = NOTE_PLAYED.wait().await;

        unwrap!(vfd.set_cursor(0, 1));
        if write!(vfd, "NOTE {:<4}{:3}", note.to_str(), note as u8).is_err() {
            warn!("Could not draw note");
        }
        unwrap!(vfd.set_icon(Icon::PlayTriangle, true));
    }
}
