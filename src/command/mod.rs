pub mod action;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "opgen", about = "x86 instruction decode/encode table generator")]
pub struct Command {
    #[clap(subcommand)]
    pub action: SubCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    Generate(action::generate::Action),
}
