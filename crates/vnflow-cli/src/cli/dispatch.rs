use super::CliError;
use super::commands::{
    self, EpVnArgs, InoutMassArgs, R2Args, ResolutionArgs, VnVsMassArgs,
};

#[derive(clap::Subcommand)]
pub(super) enum CliCommand {
    /// Resolve subevent triplets and compute the resolution per triplet
    Resolution(ResolutionArgs),
    /// Cross-check resolution for three named detectors (-999 when undefined)
    R2(R2Args),
    /// Event-plane vn from in-plane and out-of-plane yields
    EpVn(EpVnArgs),
    /// Mean vn per invariant-mass interval
    VnVsMass(VnVsMassArgs),
    /// In-plane and out-of-plane invariant-mass distributions
    InoutMass(InoutMassArgs),
}

impl CliCommand {
    pub(super) const fn name(&self) -> &'static str {
        match self {
            Self::Resolution(_) => "resolution",
            Self::R2(_) => "r2",
            Self::EpVn(_) => "ep-vn",
            Self::VnVsMass(_) => "vn-vs-mass",
            Self::InoutMass(_) => "inout-mass",
        }
    }
}

pub(super) fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    tracing::debug!(command = command.name(), "dispatching command");
    match command {
        CliCommand::Resolution(args) => commands::run_resolution_command(args),
        CliCommand::R2(args) => commands::run_r2_command(args),
        CliCommand::EpVn(args) => commands::run_ep_vn_command(args),
        CliCommand::VnVsMass(args) => commands::run_vn_vs_mass_command(args),
        CliCommand::InoutMass(args) => commands::run_inout_mass_command(args),
    }
}
