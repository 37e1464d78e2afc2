#![recursion_limit = "1024"] // for error_chain and xml!

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
extern crate atty;
extern crate cgmath;
extern crate clap;
extern crate json;
extern crate smallvec;
extern crate termcolor;
extern crate time;

#[macro_use]
mod errors;
mod cli;
mod convert;
mod logger;
mod scene;
mod skin;
mod util;

use std::process::exit;

fn main() {
    let args = cli::parse_cli_args();
    logger::init(args.log_level);

    let res = convert::main(&args);

    if let Err(e) = res {
        error!("{}", e);
        for cause in e.iter().skip(1) {
            error!("  caused by: {}", cause);
        }

        if e.is_user_error() {
            println!();
            cli::print_usage();
        } else {
            error!("conversion failed");
        }
        exit(1);
    }
}
