//! cxx-mangle CLI
//!
//! Prints the Itanium-mangled suffix for a C++ parameter list:
//!
//! ```text
//! $ cxx-mangle int, char
//! _Zic
//! $ echo 'std::string const&' | cxx-mangle
//! _ZRKNSt7__cxx1112basic_stringIcSt11char_traitsIcESaIcEEE
//! ```

use clap::Parser;
use cxx_mangle::{logging, ResolverConfig};
use std::io::{self, Read};
use std::process;

#[derive(Parser)]
#[command(name = "cxx-mangle")]
#[command(about = "Mangle a C++ parameter list by asking the compiler (CXX, default g++)", version)]
struct Cli {
    /// Parameter types, joined with spaces. Read from stdin when omitted.
    #[arg(value_name = "TYPE", trailing_var_arg = true, allow_hyphen_values = true)]
    types: Vec<String>,
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    let signature = match read_signature(cli.types) {
        Ok(signature) => signature,
        Err(e) => {
            eprintln!("Error reading parameter list from stdin: {}", e);
            process::exit(1);
        }
    };

    let config = match ResolverConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let mut resolver = config.resolver();
    match resolver.resolve(&config.compiler, &signature) {
        Ok(suffix) => println!("{}", suffix),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn read_signature(types: Vec<String>) -> io::Result<String> {
    if !types.is_empty() {
        return Ok(types.join(" "));
    }

    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}
