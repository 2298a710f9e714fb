use std::path::PathBuf;

use live_tui::{config, RunOptions};

const HELP: &str = "LIVE-TUI - A live-stream mockup with floating comments in the terminal.

  --version, -V        Show version and exit
  --help,    -h        Show this help message
  --config <path>      Read configuration from <path>
  --data <path>        Load stream data from a JSON file
  --print-config       Print the effective configuration as YAML and exit

Keys: i comment · l like · f follow · space play/pause · q quit";

fn main() {
    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(Some(opts)) => opts,
        Ok(None) => return,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = live_tui::run(opts) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

/// Returns `None` when a flag was handled and the app should not start.
fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<RunOptions>, String> {
    let mut opts = RunOptions::default();
    let mut print_config = false;
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("LIVE-TUI {}", live_tui::VERSION);
                return Ok(None);
            }
            "--help" | "-h" => {
                println!("{HELP}");
                return Ok(None);
            }
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                opts.config_file = Some(PathBuf::from(path));
            }
            "--data" => {
                let path = args.next().ok_or("--data needs a path")?;
                opts.data_file = Some(PathBuf::from(path));
            }
            "--print-config" => print_config = true,
            other => return Err(format!("unknown argument '{other}' (see --help)")),
        }
    }

    if print_config {
        let printed = config::load(config::LoadOptions {
            config_file: opts.config_file,
            env_prefix: None,
        })
        .and_then(|cfg| config::to_yaml(&cfg));
        match printed {
            Ok(yaml) => print!("{yaml}"),
            Err(err) => {
                eprintln!("error: {err:?}");
                std::process::exit(1);
            }
        }
        return Ok(None);
    }

    Ok(Some(opts))
}
