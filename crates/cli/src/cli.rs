// standard library
use std::path::PathBuf;

// external crates
use clap::{ArgAction, Parser};

/// Reduce polarized VSANS exposures to absolute 1-D and 2-D intensity
///
/// Every JSON exposure record in FRAMES is grouped by sample and
/// configuration, scaled to absolute intensity, corrected for the analyzer
/// and polarizer efficiencies where possible, and binned into sector
/// profiles.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about, max_term_width = 100)]
pub struct Cli {
    /// Directory of JSON exposure records
    #[arg(name = "FRAMES")]
    pub frames: PathBuf,

    /// JSON reduction settings, defaults are used without one
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Directory of JSON masks drawn on exposures
    #[arg(short, long, value_name = "dir")]
    pub masks: Option<PathBuf>,

    /// JSON detector sensitivity map
    #[arg(short, long, value_name = "path")]
    pub flat_field: Option<PathBuf>,

    /// Directory for the reduced tables
    #[arg(short, long, value_name = "dir", default_value = ".")]
    pub output: PathBuf,

    /// Also write one 2-D table per panel
    #[arg(long)]
    pub per_panel: bool,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Logging level for `stderrlog`
    pub fn verbosity(&self) -> usize {
        match self.quiet {
            true => 0,
            false => 2 + self.verbose as usize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&["vsans-reduce", "frames"], 2)] // case 1
    #[case(&["vsans-reduce", "frames", "-vv"], 4)] // case 2
    #[case(&["vsans-reduce", "frames", "--quiet"], 0)] // case 3
    fn verbosity_from_flags(#[case] args: &[&str], #[case] expected: usize) {
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbosity(), expected);
    }

    #[rstest]
    fn paths_are_parsed() {
        let cli = Cli::try_parse_from([
            "vsans-reduce",
            "./frames",
            "--config",
            "reduction.json",
            "-m",
            "./masks",
            "--output",
            "./reduced",
        ])
        .unwrap();

        assert_eq!(cli.frames, PathBuf::from("./frames"));
        assert_eq!(cli.config, Some(PathBuf::from("reduction.json")));
        assert_eq!(cli.masks, Some(PathBuf::from("./masks")));
        assert!(cli.flat_field.is_none());
        assert!(!cli.per_panel);
    }

    #[rstest]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["vsans-reduce", "frames", "-q", "-v"]).is_err());
    }
}
