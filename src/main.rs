use std::io;
use std::process::ExitCode;

use microshell::config::{Config, ConfigLoader};
use microshell::io::Streams;
use microshell::{logging, Shell};

/// Optional `key=value` file overriding the defaults in `Config`.
const CONFIG_ENV: &str = "MICROSHELL_CONFIG";

fn load_config() -> Config {
    let Some(path) = std::env::var_os(CONFIG_ENV) else {
        return ConfigLoader::default_config();
    };
    ConfigLoader::load_from_file(&path).unwrap_or_else(|e| {
        eprintln!("microshell: {}: {}", path.to_string_lossy(), e);
        ConfigLoader::default_config()
    })
}

fn main() -> ExitCode {
    logging::init();
    let mut shell = Shell::interactive(load_config());

    let (mut out, mut err) = (io::stdout(), io::stderr());
    let mut streams = Streams::new(&mut out, &mut err);
    let status = shell.run(io::stdin().lock(), &mut streams);

    ExitCode::from(u8::try_from(status).unwrap_or(1))
}
