use std::io::{self, Write};

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::RegionKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Quiet,
    Verbose,
}

impl OutputMode {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            OutputMode::Verbose
        } else {
            OutputMode::Quiet
        }
    }

    pub fn sink(self) -> &'static dyn ProgressSink {
        match self {
            OutputMode::Quiet => &QuietOutput,
            OutputMode::Verbose => &VerboseOutput,
        }
    }
}

pub struct VerboseOutput;

impl ProgressSink for VerboseOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({} ms)", event.message, elapsed.as_millis()),
            None => println!("{}", event.message),
        }
    }
}

pub struct QuietOutput;

impl ProgressSink for QuietOutput {
    fn event(&self, _event: ProgressEvent) {}
}

pub fn print_regions(regions: &[RegionKey]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_regions(&mut handle, regions)?;
    handle.flush()
}

pub fn write_regions<W: Write>(out: &mut W, regions: &[RegionKey]) -> io::Result<()> {
    for region in regions {
        writeln!(out, "{region}")?;
    }
    Ok(())
}
