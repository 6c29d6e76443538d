use std::fs::File;
use std::path::PathBuf;

use anyhow::*;
use log::*;
use memmap2::Mmap;
use structopt::*;

#[derive(Debug, StructOpt)]
#[structopt(name = "skiz_dump", about = "Prints everything in a .skiz file")]
struct Opt {
    /// Pass multiple times for additional verbosity (info, debug, trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbosity: usize,

    /// Prints the track as JSON (requires the `serde` feature)
    #[structopt(short, long)]
    json: bool,

    /// Only print the summary and how many of each sample there are.
    #[structopt(short = "s", long)]
    summary: bool,

    #[structopt(name("SKIZ file"))]
    skiz_path: PathBuf,
}

fn main() -> Result<()> {
    let args = Opt::from_args();

    let mut errlog = stderrlog::new();
    errlog.verbosity(args.verbosity + 1);
    errlog.init()?;

    info!("Memory mapping {:#?}", &args.skiz_path);
    let skiz_file = File::open(&args.skiz_path).context("Couldn't open .skiz file")?;
    let mapping = unsafe { Mmap::map(&skiz_file).context("Couldn't mmap .skiz file")? };

    let track = skiz::parse(&mapping)
        .with_context(|| format!("Couldn't parse {}", args.skiz_path.display()))?;

    if args.summary {
        print_summary(&track);
        Ok(())
    } else if args.json {
        print_json(&track)
    } else {
        println!("{:#?}", track);
        Ok(())
    }
}

fn print_summary(track: &skiz::SkizTrack) {
    println!("{:#?}", track.summary);

    fn count<T>(samples: &Option<Vec<T>>) -> String {
        samples
            .as_ref()
            .map_or_else(|| "missing".to_owned(), |s| s.len().to_string())
    }
    println!("events:            {}", count(&track.track_events));
    println!("nodes:             {}", count(&track.track_nodes));
    println!("segments:          {}", count(&track.track_segments));
    println!("battery readings:  {}", count(&track.battery_usage));
    println!("barometer samples: {}", count(&track.relative_altitude));
}

#[cfg(feature = "serde")]
fn print_json(track: &skiz::SkizTrack) -> Result<()> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), track)?;
    println!();
    Ok(())
}

#[cfg(not(feature = "serde"))]
fn print_json(_track: &skiz::SkizTrack) -> Result<()> {
    bail!("skiz_dump was built without the serde feature")
}
