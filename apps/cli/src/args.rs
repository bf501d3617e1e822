use std::env;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Command {
    Serve {
        port: Option<u16>,
    },
    Sync {
        input: PathBuf,
        server: Option<String>,
        token: Option<String>,
    },
    TokenMint {
        user: String,
        label: Option<String>,
        expires_days: Option<i64>,
    },
    TokenRevoke {
        token: String,
    },
}

pub fn parse_args() -> Result<Command, String> {
    let mut args = env::args().skip(1);
    let command = args.next().ok_or_else(|| "missing command".to_string())?;

    match command.as_str() {
        "serve" => {
            let mut port = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--port" => {
                        let value = args
                            .next()
                            .ok_or_else(|| "missing value for --port".to_string())?;
                        port = Some(
                            value
                                .parse::<u16>()
                                .map_err(|_| format!("invalid port value: {value}"))?,
                        );
                    }
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            Ok(Command::Serve { port })
        }
        "sync" => {
            let mut input = None;
            let mut server = None;
            let mut token = None;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--input" => {
                        let value = args
                            .next()
                            .ok_or_else(|| "missing value for --input".to_string())?;
                        input = Some(PathBuf::from(value));
                    }
                    "--server" => {
                        server = Some(
                            args.next()
                                .ok_or_else(|| "missing value for --server".to_string())?,
                        );
                    }
                    "--token" => {
                        token = Some(
                            args.next()
                                .ok_or_else(|| "missing value for --token".to_string())?,
                        );
                    }
                    other => return Err(format!("unknown argument: {other}")),
                }
            }
            let input = input.ok_or_else(|| "sync requires --input <file>".to_string())?;
            Ok(Command::Sync {
                input,
                server,
                token,
            })
        }
        "token" => {
            let action = args
                .next()
                .ok_or_else(|| "token requires an action (mint or revoke)".to_string())?;
            match action.as_str() {
                "mint" => {
                    let mut user = None;
                    let mut label = None;
                    let mut expires_days = None;
                    while let Some(arg) = args.next() {
                        match arg.as_str() {
                            "--user" => {
                                user = Some(
                                    args.next()
                                        .ok_or_else(|| "missing value for --user".to_string())?,
                                );
                            }
                            "--label" => {
                                label = Some(
                                    args.next()
                                        .ok_or_else(|| "missing value for --label".to_string())?,
                                );
                            }
                            "--expires-days" => {
                                let value = args.next().ok_or_else(|| {
                                    "missing value for --expires-days".to_string()
                                })?;
                                expires_days = Some(value.parse::<i64>().map_err(|_| {
                                    format!("invalid --expires-days value: {value}")
                                })?);
                            }
                            other => return Err(format!("unknown argument: {other}")),
                        }
                    }
                    let user =
                        user.ok_or_else(|| "token mint requires --user <id>".to_string())?;
                    Ok(Command::TokenMint {
                        user,
                        label,
                        expires_days,
                    })
                }
                "revoke" => {
                    let token = args
                        .next()
                        .ok_or_else(|| "token revoke requires a token value".to_string())?;
                    Ok(Command::TokenRevoke { token })
                }
                other => Err(format!("unknown token action: {other}")),
            }
        }
        "--help" | "-h" => {
            print_help();
            std::process::exit(0);
        }
        other => Err(format!("unknown command: {other}")),
    }
}

pub fn print_help() {
    println!(
        "usagegraph CLI\n\n\
Usage:\n  usagegraph serve [--port <port>]\n  usagegraph sync --input <events.json> [--server <url>] [--token <token>]\n  usagegraph token mint --user <id> [--label <label>] [--expires-days <n>]\n  usagegraph token revoke <token>\n\n\
Options:\n  --port <port>       Override the configured port for this run only\n  --input <file>      JSON file with raw usage events to aggregate and sync\n  --server <url>      Override the configured server URL\n  --token <token>     Override the configured bearer token\n  --expires-days <n>  Token lifetime in days (omit for no expiry)\n  -h, --help          Show this help message\n"
    );
}
