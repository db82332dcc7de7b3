//! Command-line arguments and live intensity input.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::models::{CustomOverride, DeviceType, IntensityLevel};
use crate::session::SessionController;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "waterlock")]
#[command(about = "Play a drying tone through the device speaker", long_about = None)]
pub struct Args {
    /// phone, tablet, laptop, wearable, earbuds or other
    #[arg(long, value_name = "DEVICE", default_value = "phone")]
    pub device: String,

    /// low, medium, high, emergency or realtime
    #[arg(long, value_name = "LEVEL", default_value = "medium")]
    pub intensity: IntensityLevel,

    /// Custom intensity percent (0-100); replaces the preset multiplier
    #[arg(long, value_name = "PERCENT", requires = "duration")]
    pub percent: Option<f64>,

    /// Custom duration; replaces the preset duration
    #[arg(long, value_name = "SECONDS", requires = "percent")]
    pub duration: Option<f64>,

    /// Settings file holding a saved override and engine options
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Store --percent/--duration in the settings file for later sessions
    #[arg(long, requires = "settings", requires = "percent")]
    pub save: bool,
}

impl Args {
    /// Device to dry; unknown names play at the `other` base frequency.
    pub fn device_type(&self) -> DeviceType {
        let device = DeviceType::from_name_or_other(&self.device);
        if device == DeviceType::Other && !self.device.trim().eq_ignore_ascii_case("other") {
            log_warn!("Unknown device '{}', using {}", self.device, device);
        }
        device
    }

    /// Override given on the command line, if any.
    pub fn custom_override(&self) -> Option<CustomOverride> {
        match (self.percent, self.duration) {
            (Some(percent), Some(duration)) => Some(CustomOverride::new(percent, duration)),
            _ => None,
        }
    }
}

/// Applies typed percentages to a realtime session until the input closes or
/// the session is no longer realtime. Closing the input leaves the session
/// running.
pub async fn drive_live_input(controller: SessionController, mut lines: UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(percent) = line.parse::<f64>() else {
            log_warn!("Not a percentage: {}", line);
            continue;
        };
        match controller.on_intensity_changed(percent).await {
            Ok(Some(hz)) => log_info!("Tone now {:.1} Hz", hz),
            Ok(None) => return,
            Err(err) => {
                log_error!("Intensity change failed: {}", err);
                return;
            }
        }
    }
    log_debug!("Live intensity input closed");
}
