use std::{env, fs, io::Read, process};

use rproto::{Error, VM};

fn main() {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
        .unwrap();

    let args: Vec<String> = env::args().collect();
    let src = match args.get(1) {
        Some(path) => fs::read_to_string(path).unwrap_or_else(|err| {
            eprintln!("Could not read '{}': {}", path, err);
            process::exit(74);
        }),
        None => {
            let mut src = String::new();
            if let Err(err) = std::io::stdin().read_to_string(&mut src) {
                eprintln!("Could not read stdin: {}", err);
                process::exit(74);
            }
            src
        }
    };

    let mut vm = VM::default();
    match vm.interpret(&src) {
        Ok(stack) => {
            for v in stack {
                log::info!("left on stack: {}", vm.render(v));
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            let code = match err {
                Error::Scan(_) | Error::Parse(_) => 65,
                Error::Runtime(_) => 70,
            };
            process::exit(code);
        }
    }
}
