//! docmine CLI: mine Word documents into a tagged, context-aware corpus.
//!
//! Splits `.docx`/`.doc` files into paragraph and table Objects, attaches
//! surrounding context, date and keyword tags, and writes a tabular corpus
//! ready for downstream embedding and retrieval.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
