#![allow(clippy::match_like_matches_macro)]

use action::generate::execute_generate;
use command::{Command, SubCommand};

mod action;
mod codegen;
mod command;
mod encoding;
mod error;
mod spec;
mod trie;
mod utils;

use clap::Parser;

use crate::error::Errors;

#[tokio::main]
async fn main() -> Result<(), Errors> {
    let command = Command::parse();

    match command.action {
        SubCommand::Generate(action) => {
            let result = execute_generate(action).await?;
            println!("{}", result);
        }
    }

    Ok(())
}
