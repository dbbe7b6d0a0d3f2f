//! Symbolic model checker for flattened finite-state machine models.
//!
//! Takes an input path to a flattened model (sections for variables,
//! constraints, fairness, and properties) and verifies every property in
//! it, printing verdicts and counterexample traces.
//!

use fsm_model_checker::bmc::{parse_loopback, BmcOptions};
use fsm_model_checker::analysis::Session;
use fsm_model_checker::fsm::PartitionMethod;
use fsm_model_checker::properties::{Engine, InvarStrategy, VerificationOptions};
use fsm_model_checker::result_print::PrintOptions;
use fsm_model_checker::symbols::ordering::{read_order_file, write_order, OrderMode};

use clap::builder::PossibleValuesParser;
use clap::Parser;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

/// Structure to collect CLI arguments
#[derive(Parser)]
#[clap(
    version,
    about = "Symbolic CTL/LTL model checker for finite-state machine models."
)]
struct Arguments {
    /// Path to a flattened model file.
    model_path: String,

    /// Engine used for LTL properties.
    #[clap(short, long, default_value = "bdd", value_parser = PossibleValuesParser::new(["bdd", "bmc"]))]
    engine: String,

    /// Partitioning of the transition relation.
    #[clap(short, long, default_value = "threshold", value_parser = PossibleValuesParser::new(["monolithic", "threshold", "iwls95"]))]
    partition: String,

    /// Cluster size bound for the partitioned transition relation.
    #[clap(long, default_value_t = 1000)]
    cluster_size: usize,

    /// Strategy for invariant properties.
    #[clap(long, default_value = "forward", value_parser = PossibleValuesParser::new(["forward", "forward-backward", "induction"]))]
    invar_strategy: String,

    /// Maximum bound of bounded problems.
    #[clap(short = 'k', long, default_value_t = 10)]
    bound: u32,

    /// Loopback of bounded LTL problems: `X` (none), `*` (all), or a number.
    #[clap(short, long, default_value = "*")]
    loopback: String,

    /// Dump bounded problems in DIMACS to this template (`@k`, `@l`).
    #[clap(long)]
    dump: Option<String>,

    /// Restrict each property to its cone of influence.
    #[clap(long)]
    cone_of_influence: bool,

    /// Report on machine well-formedness (deadlocks, empty regions).
    #[clap(long)]
    check_fsm: bool,

    /// Path to a variable ordering file.
    #[clap(short, long)]
    order_file: Option<String>,

    /// Dump the resulting variable ordering to this path.
    #[clap(long)]
    write_order: Option<String>,

    /// Granularity of the dumped ordering.
    #[clap(long, default_value = "scalar", value_parser = PossibleValuesParser::new(["scalar", "bits"]))]
    write_order_mode: String,

    /// Choice of the amount of output regarding computation and results.
    #[clap(long, default_value = "full", value_parser = PossibleValuesParser::new(["none", "short", "full"]))]
    print_option: String,
}

/// Wrapper function to invoke the model checker, works with CLI arguments.
fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();

    if !Path::new(args.model_path.as_str()).is_file() {
        eprintln!("{} is not a valid file", args.model_path);
        return ExitCode::FAILURE;
    }
    let model_text = match fs::read_to_string(args.model_path.as_str()) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("cannot read {}: {err}", args.model_path);
            return ExitCode::FAILURE;
        }
    };

    let order_prefix = match &args.order_file {
        None => Vec::new(),
        Some(path) => match read_order_file(Path::new(path)) {
            Ok(names) => names,
            Err(err) => {
                eprintln!("cannot read ordering file: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let Some(loopback) = parse_loopback(&args.loopback) else {
        eprintln!("invalid loopback value \"{}\"", args.loopback);
        return ExitCode::FAILURE;
    };
    let options = VerificationOptions {
        partition: match args.partition.as_str() {
            "monolithic" => PartitionMethod::Monolithic,
            "iwls95" => PartitionMethod::Iwls95(args.cluster_size),
            _ => PartitionMethod::Threshold(args.cluster_size),
        },
        engine: if args.engine == "bmc" {
            Engine::Bmc
        } else {
            Engine::Bdd
        },
        invar_strategy: match args.invar_strategy.as_str() {
            "forward-backward" => InvarStrategy::ForwardBackward,
            "induction" => InvarStrategy::Induction,
            _ => InvarStrategy::Forward,
        },
        bmc: BmcOptions {
            bound: args.bound,
            loopback,
            dump_template: args.dump.clone(),
            must_solve: args.dump.is_none(),
            ..BmcOptions::default()
        },
        cone_of_influence: args.cone_of_influence,
    };
    let print = match args.print_option.as_str() {
        "none" => PrintOptions::NoPrint,
        "short" => PrintOptions::ShortPrint,
        _ => PrintOptions::FullPrint,
    };

    let mut session = match Session::load(&model_text, &order_prefix) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(path) = &args.write_order {
        let mode = if args.write_order_mode == "bits" {
            OrderMode::Bits
        } else {
            OrderMode::Scalar
        };
        if let Err(err) = write_order(&session.registry, Path::new(path), mode) {
            eprintln!("cannot write ordering file: {err}");
            return ExitCode::FAILURE;
        }
    }
    if args.check_fsm {
        match session.check_machine(&options) {
            Ok(report) => {
                fsm_model_checker::result_print::print_machine_report(&report);
            }
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
    }
    match session.verify_all(&options, print) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
