#[macro_use]
extern crate clap;

#[macro_use]
extern crate log;

use std::error::Error;
use std::fs;
use std::io::{self, Read};
use std::process;

use clap::{Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use xmlrpc_codec::xmlrpc::charset;
use xmlrpc_codec::{Codec, Config, Request, Value};

fn main() {
    let matches = Command::new("xrpc")
        .version(crate_version!())
        .author("Damien Lecan <dev@dlecan.com>")
        .about("Inspect and build XML-RPC documents")
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::Count).global(true).help("Verbose mode"))
        .subcommand_required(true)
        .subcommand(
            Command::new("parse")
                .about("Print the method name, params or fault of a document")
                .arg(Arg::new("file").help("Document to read, stdin if omitted").index(1))
                .arg(
                    Arg::new("latin1")
                        .long("latin1")
                        .action(ArgAction::SetTrue)
                        .help("Accept documents declared as ISO-8859-1"),
                ),
        )
        .subcommand(
            Command::new("call")
                .about("Print a <methodCall>, typing each argument by its look")
                .arg(Arg::new("method").required(true).index(1))
                .arg(Arg::new("args").index(2).num_args(0..).help("int, double, true/false, or a string")),
        )
        .get_matches();

    // Init logging to DEBUG only if user required it
    let mut logger = env_logger::Builder::from_default_env();
    if matches.get_count("verbose") > 0 {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let outcome = match matches.subcommand() {
        Some(("parse", sub)) => parse(sub),
        Some(("call", sub)) => call(sub),
        _ => Ok(()),
    };

    if let Err(err) = outcome {
        eprintln!("xrpc: {}", err);
        process::exit(1);
    }
}

fn parse(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let input = match matches.get_one::<String>("file") {
        Some(path) => {
            debug!("Reading {}", path);
            fs::read(path)?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    let mut config = Config::default();
    if matches.get_flag("latin1") {
        config = config.with_charset_reader(charset::latin1);
    }

    let doc = Codec::new(config).parse(&input)?;
    if let Some(fault) = doc.fault() {
        println!("fault {}: {}", fault.code, fault.message);
        return Ok(());
    }
    if let Some(ref name) = doc.method_name {
        println!("method: {}", name);
    }
    for (i, param) in doc.params.iter().enumerate() {
        println!("param {} ({}): {}", i, param.kind(), param);
    }
    Ok(())
}

fn call(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let method = matches.get_one::<String>("method").map(String::as_str).unwrap_or_default();
    let mut request = Request::new(method);
    if let Some(args) = matches.get_many::<String>("args") {
        for arg in args {
            let value = infer(arg);
            debug!("arg {:?} as {}", arg, value.kind());
            request = request.value(value);
        }
    }
    println!("{}", request.finalize().body);
    Ok(())
}

fn infer(arg: &str) -> Value {
    if let Ok(n) = arg.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(n) = arg.parse::<f64>() {
        if arg.chars().any(|c| c.is_ascii_digit()) {
            return Value::Double(n);
        }
    }
    match arg {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(arg.to_string()),
    }
}
