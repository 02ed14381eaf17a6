use std::process::exit;

use structopt::StructOpt;

use prism_cli::cli::{run, Opt};

pub fn main() {
    let opt = Opt::from_args();

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}] {}", record.level(), message))
        })
        .level(opt.log_level())
        .chain(std::io::stderr())
        .apply()
        .unwrap();

    exit(match run(opt.command) {
        Err(e) => {
            println!("Error: {}", e);
            1
        }
        _ => 0,
    })
}
