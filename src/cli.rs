//! Command-line arguments and how they override the configuration file.

use crate::{
    config::Config,
    gesture::{LooseThumbsUp, StrictThumbsUp},
    session::TriggerPolicy,
};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Trigger policy selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Held strict thumbs-up
    Strict,
    /// Held loose thumbs-up
    Loose,
    /// Smile to arm
    Smile,
}

#[derive(Parser, Debug)]
#[command(name = "selfie-kiosk", author, version, about = "Gesture and emotion driven selfie kiosk", long_about = None)]
pub struct Args {
    /// Camera index to use
    #[arg(long)]
    pub cam: Option<i32>,

    /// Video file to process instead of the camera
    #[arg(short, long, conflicts_with = "cam")]
    pub video: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Trigger policy that arms the countdown
    #[arg(short, long, value_enum)]
    pub policy: Option<PolicyArg>,

    /// Directory receiving captured documents
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Run without a preview window
    #[arg(long)]
    pub headless: bool,

    /// Disable horizontal mirroring of the camera image
    #[arg(long)]
    pub no_mirror: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(cam) = self.cam {
            config.camera.index = cam;
            config.camera.video_file = None;
        }
        if let Some(video) = &self.video {
            config.camera.video_file = Some(video.clone());
        }
        if let Some(policy) = self.policy {
            let trigger = match policy {
                PolicyArg::Strict => TriggerPolicy::StrictGesture(StrictThumbsUp::default()),
                PolicyArg::Loose => TriggerPolicy::LooseGesture(LooseThumbsUp::default()),
                PolicyArg::Smile => TriggerPolicy::SmileScore,
            };
            // A policy switch brings that policy's hold tuning with it
            if config.session.trigger != trigger {
                config.session.hold = None;
            }
            config.session.trigger = trigger;
        }
        if let Some(dir) = &self.output_dir {
            config.publish.output_dir = dir.clone();
        }
        if self.headless {
            config.display.gui = false;
        }
        if self.no_mirror {
            config.camera.mirror = false;
        }
    }
}
