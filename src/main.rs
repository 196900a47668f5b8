use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use qcparse::{
    batch::{
        default_hydride_cols, resolve_table, BestModes, Couplings,
        HydrideResolver, Orientations,
    },
    crest,
    extract::{nbo, orca, respect},
    freq::ModeRange,
    table::{tabulate, Record, Table},
};

macro_rules! die {
    ($($t:tt)*) => {{
        eprintln!($($t)*);
        std::process::exit(1)
    }};
}

/// extract scalar and tensor data from quantum-chemistry output files
#[derive(Parser)]
#[command(author, about, long_about = None)]
struct Cli {
    /// Set the maximum number of threads to use. Defaults to 0, which means
    /// to use as many threads as there are CPUS.
    #[arg(short, long, default_value_t = 0, global = true)]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct FolderArgs {
    /// folder of output files
    folder: PathBuf,

    /// write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// emit pretty JSON instead of CSV
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TableArgs {
    /// hydride index table
    table: PathBuf,

    /// folder of output files
    folder: PathBuf,

    /// write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// hydride columns to process; defaults to every header containing
    /// `Hydrides`
    #[arg(long, value_delimiter = ',')]
    cols: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
    /// last electronic and Gibbs free energies per output file
    Energies(FolderArgs),

    /// HOMO/LUMO energies and gap from the last orbital section
    Gaps(FolderArgs),

    /// phosphorus shift differences against reference shieldings
    Shifts {
        #[command(flatten)]
        args: FolderArgs,

        /// TOML file overriding the built-in reference tables
        #[arg(long)]
        refs: Option<PathBuf>,
    },

    /// shielding principal values and tensor rows from relativistic outputs
    Shielding(FolderArgs),

    /// NBO second-order perturbation entries
    Nbo(FolderArgs),

    /// canonical EFG orientations for the hydrides named in a table
    Orient(TableArgs),

    /// quadrupole coupling constants for the hydrides named in a table
    Couplings {
        #[command(flatten)]
        args: TableArgs,

        /// pair each coupling constant with its asymmetry parameter
        #[arg(long)]
        eta: bool,
    },

    /// dominant vibrational-mode frequencies for the hydrides in a table
    Modes {
        #[command(flatten)]
        args: TableArgs,

        /// low edge of the IR-active window, cm**-1
        #[arg(long, default_value_t = ModeRange::default().min)]
        min: f64,

        /// high edge of the IR-active window, cm**-1
        #[arg(long, default_value_t = ModeRange::default().max)]
        max: f64,
    },

    /// build one CREST job folder per .xyz file
    CrestPrep {
        folder: PathBuf,

        /// total charge passed to xtb and crest
        #[arg(short, long)]
        charge: isize,

        /// SLURM script template replacing the built-in one
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// gather crest_best.xyz files out of finished job folders
    CrestCollect {
        crest_folder: PathBuf,
        dest: PathBuf,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    qcparse::max_threads(cli.threads);
    match cli.command {
        Command::Energies(args) => {
            let records = orca::energies(&args.folder)
                .unwrap_or_else(|e| die!("energies failed with {e}"));
            emit(&records, &args);
        }
        Command::Gaps(args) => {
            let records = orca::gaps(&args.folder)
                .unwrap_or_else(|e| die!("gaps failed with {e}"));
            emit(&records, &args);
        }
        Command::Shifts { args, refs } => {
            let config = match refs {
                Some(path) => orca::ShiftRefConfig::load(&path)
                    .unwrap_or_else(|e| die!("bad reference file: {e}")),
                None => orca::ShiftRefConfig::default(),
            };
            let records = orca::shifts(&args.folder, &config)
                .unwrap_or_else(|e| die!("shifts failed with {e}"));
            emit(&records, &args);
        }
        Command::Shielding(args) => {
            let records = respect::shieldings(&args.folder)
                .unwrap_or_else(|e| die!("shielding failed with {e}"));
            emit(&records, &args);
        }
        Command::Nbo(args) => {
            let records = nbo::all_perturbations(&args.folder)
                .unwrap_or_else(|e| die!("nbo failed with {e}"));
            emit(&records, &args);
        }
        Command::Orient(args) => run_resolver(&args, &Orientations),
        Command::Couplings { args, eta } => {
            run_resolver(&args, &Couplings { with_eta: eta })
        }
        Command::Modes { args, min, max } => {
            run_resolver(&args, &BestModes {
                range: ModeRange { min, max },
            })
        }
        Command::CrestPrep {
            folder,
            charge,
            template,
        } => {
            let template = match template {
                Some(path) => std::fs::read_to_string(&path)
                    .unwrap_or_else(|e| {
                        die!("can't read {}: {e}", path.display())
                    }),
                None => crest::DEFAULT_TEMPLATE.to_owned(),
            };
            let n = crest::prep(&folder, charge, &template)
                .unwrap_or_else(|e| die!("crest prep failed with {e}"));
            println!("prepared {n} jobs in {}", folder.display());
        }
        Command::CrestCollect { crest_folder, dest } => {
            let n = crest::collect(&crest_folder, &dest)
                .unwrap_or_else(|e| die!("crest collect failed with {e}"));
            println!("collected {n} conformers into {}", dest.display());
        }
    }
}

/// render `records` as CSV or pretty JSON and write them where `args` says
fn emit<R: Record + Serialize>(records: &[R], args: &FolderArgs) {
    let text = if args.json {
        let mut s = serde_json::to_string_pretty(records)
            .unwrap_or_else(|e| die!("JSON serialization failed with {e}"));
        s.push('\n');
        s
    } else {
        tabulate(records).to_string()
    };
    write_out(&text, args.output.as_deref());
}

fn run_resolver<R: HydrideResolver>(args: &TableArgs, resolver: &R) {
    let table = Table::load(&args.table)
        .unwrap_or_else(|e| die!("can't load {}: {e}", args.table.display()));
    let cols = if args.cols.is_empty() {
        default_hydride_cols(&table)
    } else {
        args.cols.clone()
    };
    if cols.is_empty() {
        die!("no hydride columns to process");
    }
    let resolved = resolve_table(&table, &cols, &args.folder, resolver)
        .unwrap_or_else(|e| die!("resolution failed with {e}"));
    write_out(&resolved.to_string(), args.output.as_deref());
}

fn write_out(text: &str, output: Option<&std::path::Path>) {
    match output {
        Some(path) => std::fs::write(path, text).unwrap_or_else(|e| {
            die!("can't write {}: {e}", path.display())
        }),
        None => print!("{text}"),
    }
}
