//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::domain::model::SessionMode;

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Managed asset identifier
    #[arg(long)]
    pub asset_id: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Edit,
    View,
}

impl From<ModeArg> for SessionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Edit => SessionMode::Edit,
            ModeArg::View => SessionMode::View,
        }
    }
}

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Media duration (HH:MM:SS.ms, MM:SS.ms, or seconds)
    #[arg(short, long)]
    pub duration: String,

    /// Simulate a managed stream instead of a direct file
    #[arg(long)]
    pub managed: bool,

    /// Previously saved trim start
    #[arg(long)]
    pub saved_start: Option<String>,

    /// Previously saved trim end
    #[arg(long)]
    pub saved_end: Option<String>,

    /// Session mode
    #[arg(long, value_enum, default_value = "edit")]
    pub mode: ModeArg,

    /// JSON script of session steps
    #[arg(short, long)]
    pub script: PathBuf,
}
