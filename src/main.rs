use clap::Parser;
use log::{error, info};
use numtfinder::config::{load_name_list, NumtConfig};
use numtfinder::mtdna::{doubled_query_path, write_doubled_query, MtReference};
use numtfinder::pipeline::NumtPipeline;
use std::io;
use std::path::PathBuf;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// mtDNA reference genome FASTA used for the search (first sequence only).
    #[clap(short = 'm', long, value_parser)]
    mtdna: String,

    /// The mtDNA reference is linear rather than circular.
    #[clap(long, action)]
    linear: bool,

    /// Regenerate outputs even if a previous run's results exist.
    #[clap(short = 'f', long, action)]
    force: bool,

    /// Verbosity level (0 = warnings, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Nuclear mitochondrial fragment (NUMT) post-processing of local alignment hits.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Write the double-copy linearised mtDNA query for the external search
    Mtquery {
        #[clap(flatten)]
        common: CommonOpts,

        /// Output FASTA path (default: <mtdna basename>2X.fasta)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
    /// Build NUMT fragment and block tables plus mtDNA coverage profiles from a hit table
    Run {
        #[clap(flatten)]
        common: CommonOpts,

        /// Tab-delimited local hit table (plain, .gz or .bgz BGZF)
        #[clap(short = 'i', long, value_parser)]
        hits: String,

        /// Prefix for output files
        #[clap(short = 'b', long, value_parser, default_value = "numtfinder")]
        basefile: String,

        /// Max length of gaps between fragmented local hits to merge
        #[clap(short = 'g', long, value_parser, default_value_t = 8000, allow_hyphen_values = true)]
        frag_merge: i64,

        /// Only merge fragments on the same strand
        #[clap(short = 's', long, action)]
        stranded: bool,

        /// Minimum local (NUMT fragment) alignment length
        #[clap(long, value_parser, default_value_t = 0, allow_hyphen_values = true)]
        min_frag_len: i64,

        /// mtDNA coverage fraction above which a hit is treated as the mitochondrion itself (0 disables)
        #[clap(long, value_parser, default_value_t = 0.99, allow_hyphen_values = true)]
        mt_max_cov: f64,

        /// Identity fraction above which a hit is treated as the mitochondrion itself (0 disables)
        #[clap(long, value_parser, default_value_t = 0.99, allow_hyphen_values = true)]
        mt_max_id: f64,

        /// Exclude whole sequences with hits flagged as the mitochondrion itself
        #[clap(long, value_parser, default_value_t = true, action = clap::ArgAction::Set)]
        mt_max_exclude: bool,

        /// Assembly sequence to exclude from output (repeatable)
        #[clap(short = 'x', long, value_parser)]
        exclude: Vec<String>,

        /// File of assembly sequence names to exclude (one per line)
        #[clap(long, value_parser)]
        exclude_file: Option<String>,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Mtquery { common, output } => {
            initialize_logger(common.verbose);
            let reference = MtReference::from_fasta(&common.mtdna)?;
            if common.linear {
                info!(
                    "Using {} input for mtDNA query (linear)",
                    common.mtdna
                );
                return Ok(());
            }
            let path = output
                .map(PathBuf::from)
                .unwrap_or_else(|| doubled_query_path(&common.mtdna));
            write_doubled_query(&reference, &path, common.force)?;
            println!("{}", path.display());
        }
        Args::Run {
            common,
            hits,
            basefile,
            frag_merge,
            stranded,
            min_frag_len,
            mt_max_cov,
            mt_max_id,
            mt_max_exclude,
            mut exclude,
            exclude_file,
        } => {
            initialize_logger(common.verbose);
            let reference = MtReference::from_fasta(&common.mtdna)?;

            if let Some(path) = exclude_file {
                exclude.extend(load_name_list(&path)?);
            }
            let config = NumtConfig {
                circle: !common.linear,
                frag_merge,
                stranded,
                mt_max_cov,
                mt_max_id,
                mt_max_exclude,
                min_frag_len,
                exclude,
            };

            let pipeline = NumtPipeline::new(config, &reference.name, reference.len())?;
            match pipeline.run(&hits, &basefile, common.force) {
                Ok(result) => {
                    info!(
                        "{} NUMT fragments merged into {} NUMT blocks",
                        result.fragments.len(),
                        result.blocks.len()
                    );
                }
                Err(e) => {
                    error!("NUMTFinder {} phase failed: {}", e.phase(), e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}

/// Initialize logger based on verbosity
fn initialize_logger(verbose: u8) {
    env_logger::Builder::new()
        .filter_level(match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();
}
