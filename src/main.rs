//! This crate simulates the BER-versus-SNR performance of soft demapping of the LTE modulation
//! schemes over an AWGN channel. Simulation parameters are specified on the command line, and
//! simulation results are saved to a JSON file.
//!
//! Build the executable with `cargo build --release` and then run `./target/release/softdemod -h`
//! for help on the command-line interface. Set `RUST_LOG=info` to see per-point progress.

#![warn(
    clippy::complexity,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_allocation,
    unused_import_braces,
    unused_qualifications
)]

use std::time::Instant;

use anyhow::Result;
use clap::parser::ValueSource;
use clap::{crate_name, crate_version, value_parser, Arg, ArgMatches, Command};
use log::info;
use softdemod::lte::{self, Modulation};
use softdemod::{DemapAlgo, DemapperConfig};

/// Main function
fn main() -> Result<()> {
    env_logger::init();
    let timer = Instant::now();
    let matches = command_line_parser().get_matches();
    let json_filename = &json_filename_from_matches(&matches);
    let demapper_config = demapper_config_from_matches(&matches)?;
    lte::run_awgn_sims(&all_sim_params(&matches), &demapper_config, json_filename)?;
    info!("Elapsed time: {:.3?}", timer.elapsed());
    Ok(())
}

/// Returns command line parser.
fn command_line_parser() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about("Evaluates the performance of soft demapping of LTE modulations over an AWGN channel")
        .arg(modulation_name())
        .arg(demap_algo_name())
        .arg(first_snr_db())
        .arg(snr_step_db())
        .arg(num_snr())
        .arg(num_bit_errors_min())
        .arg(num_symbols_per_run())
        .arg(num_runs_min())
        .arg(num_runs_max())
        .arg(config_filename())
        .arg(json_filename())
}

/// Returns argument for modulation name.
fn modulation_name() -> Arg {
    Arg::new("modulation_name")
        .short('m')
        .value_parser(["BPSK", "QPSK", "16QAM", "64QAM"])
        .default_value("16QAM")
        .help("Modulation name")
}

/// Returns argument for demapping algorithm name.
fn demap_algo_name() -> Arg {
    Arg::new("demap_algo_name")
        .short('a')
        .value_parser(["MaxLog", "Exact"])
        .default_value("MaxLog")
        .help("Demapping algorithm name")
}

/// Returns argument for first Es/N0 (dB).
fn first_snr_db() -> Arg {
    Arg::new("first_snr_db")
        .short('r')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("0.0")
        .help("First Es/N0 (dB)")
}

/// Returns argument for Es/N0 step (dB).
fn snr_step_db() -> Arg {
    Arg::new("snr_step_db")
        .short('p')
        .value_parser(value_parser!(f64))
        .allow_negative_numbers(true)
        .default_value("2.0")
        .help("Es/N0 step (dB)")
}

/// Returns argument for number of Es/N0 values.
fn num_snr() -> Arg {
    Arg::new("num_snr")
        .short('s')
        .value_parser(value_parser!(u32))
        .default_value("8")
        .help("Number of Es/N0 values")
}

/// Returns argument for desired minimum number of bit errors.
fn num_bit_errors_min() -> Arg {
    Arg::new("num_bit_errors_min")
        .short('e')
        .value_parser(value_parser!(u32))
        .default_value("1000")
        .help("Desired minimum number of bit errors")
}

/// Returns argument for number of symbols to be transmitted per run.
fn num_symbols_per_run() -> Arg {
    Arg::new("num_symbols_per_run")
        .short('b')
        .value_parser(value_parser!(u32))
        .default_value("10000")
        .help("Number of symbols to be transmitted per run")
}

/// Returns argument for minimum number of runs of symbols to be simulated.
fn num_runs_min() -> Arg {
    Arg::new("num_runs_min")
        .short('n')
        .value_parser(value_parser!(u32))
        .default_value("10")
        .help("Minimum number of runs of symbols to be simulated")
}

/// Returns argument for maximum number of runs of symbols to be simulated.
fn num_runs_max() -> Arg {
    Arg::new("num_runs_max")
        .short('x')
        .value_parser(value_parser!(u32))
        .default_value("100")
        .help("Maximum number of runs of symbols to be simulated")
}

/// Returns argument for name of JSON file from which demapper configuration must be read.
fn config_filename() -> Arg {
    Arg::new("config_filename")
        .short('c')
        .help("Name of JSON file with demapper configuration (defaults used if absent)")
}

/// Returns argument for name of JSON file to which results must be saved.
fn json_filename() -> Arg {
    Arg::new("json_filename")
        .short('f')
        .default_value("results.json")
        .help("Name of JSON file to which results must be saved")
}

/// Returns simulation parameters based on command-line arguments.
fn all_sim_params(matches: &ArgMatches) -> Vec<lte::SimParams> {
    let mut num_runs_min = num_runs_min_from_matches(matches);
    let mut num_runs_max = num_runs_max_from_matches(matches);
    if num_runs_min > num_runs_max {
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_min") {
            num_runs_min = num_runs_max;
        }
        if let Some(ValueSource::DefaultValue) = matches.value_source("num_runs_max") {
            num_runs_max = num_runs_min;
        }
    }
    let mut all_params = Vec::new();
    for es_over_n0_db in all_es_over_n0_db_from_matches(matches) {
        all_params.push(lte::SimParams {
            modulation: modulation_from_matches(matches),
            demap_algo: demap_algo_from_matches(matches),
            es_over_n0_db,
            num_bit_errors_min: num_bit_errors_min_from_matches(matches),
            num_symbols_per_run: num_symbols_per_run_from_matches(matches),
            num_runs_min,
            num_runs_max,
        });
    }
    all_params
}

/// Returns demapper configuration, read from file if one is given.
fn demapper_config_from_matches(matches: &ArgMatches) -> Result<DemapperConfig> {
    Ok(match matches.get_one::<String>("config_filename") {
        Some(filename) => DemapperConfig::from_json_file(filename)?,
        None => DemapperConfig::default(),
    })
}

// OK to unwrap in the `*_from_matches` functions below: the arguments they read all have default
// values.

/// Returns modulation scheme.
fn modulation_from_matches(matches: &ArgMatches) -> Modulation {
    match matches
        .get_one::<String>("modulation_name")
        .unwrap()
        .as_str()
    {
        "BPSK" => Modulation::Bpsk,
        "QPSK" => Modulation::Qpsk,
        "16QAM" => Modulation::Qam16,
        "64QAM" => Modulation::Qam64,
        _ => panic!("Invalid modulation name"),
    }
}

/// Returns demapping algorithm.
fn demap_algo_from_matches(matches: &ArgMatches) -> DemapAlgo {
    match matches
        .get_one::<String>("demap_algo_name")
        .unwrap()
        .as_str()
    {
        "MaxLog" => DemapAlgo::MaxLog,
        "Exact" => DemapAlgo::Exact,
        _ => panic!("Invalid demapping algorithm name"),
    }
}

/// Returns all Es/N0 (dB) values.
fn all_es_over_n0_db_from_matches(matches: &ArgMatches) -> Vec<f64> {
    let first_snr_db: f64 = *matches.get_one("first_snr_db").unwrap();
    let snr_step_db: f64 = *matches.get_one("snr_step_db").unwrap();
    let num_snr: u32 = *matches.get_one("num_snr").unwrap();
    (0 .. num_snr)
        .map(|n| first_snr_db + snr_step_db * f64::from(n))
        .collect()
}

/// Returns desired minimum number of bit errors.
fn num_bit_errors_min_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_bit_errors_min").unwrap()
}

/// Returns number of symbols to be transmitted per run.
fn num_symbols_per_run_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_symbols_per_run").unwrap()
}

/// Returns minimum number of runs of symbols to be simulated.
fn num_runs_min_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_runs_min").unwrap()
}

/// Returns maximum number of runs of symbols to be simulated.
fn num_runs_max_from_matches(matches: &ArgMatches) -> u32 {
    *matches.get_one("num_runs_max").unwrap()
}

/// Returns name of JSON file to which simulation results must be saved.
fn json_filename_from_matches(matches: &ArgMatches) -> String {
    matches
        .get_one::<String>("json_filename")
        .unwrap()
        .to_string()
}
