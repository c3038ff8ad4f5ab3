//! The interactive shell loop.
//!
//! Reads one line at a time from stdin, shell-splits it, dispatches the
//! resulting command against an [`AccountSession`], and prints either the
//! result or a recoverable error message — nothing here is fatal except a
//! handle that the broker itself rejects at connect time.

use tokio::io::{AsyncBufReadExt, BufReader};
use veilfs_client::AccountSession;

use crate::commands::{self, HELP_TEXT};
use crate::config::CliConfig;
use crate::error::{CliError, Result};

/// Prompt for and read the account handle from stdin when it wasn't
/// supplied via `--handle`/`VEILFS_HANDLE`.
async fn read_handle(stdin: &mut (impl AsyncBufReadExt + Unpin)) -> Result<String> {
    println!("Your veilfs account handle:");
    let mut line = String::new();
    stdin.read_line(&mut line).await?;
    Ok(line.trim().to_string())
}

pub async fn run(config: CliConfig) -> Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());

    let handle = match config.handle {
        Some(h) => h,
        None => read_handle(&mut stdin).await?,
    };

    if handle.len() != 128 {
        println!(
            "This handle isn't 128 characters long, please make sure you use the correct handle!"
        );
        return Err(CliError::InvalidHandle(format!("{} chars, expected 128", handle.len())));
    }

    let session = AccountSession::connect(&handle, config.client).await.map_err(|err| {
        if err.is_invalid_handle() {
            CliError::InvalidHandle(err.to_string())
        } else {
            CliError::Client(err)
        }
    })?;

    println!(
        "Thank you for logging in. Feel free to interact now with the veilfs cli.\n\
         If you need help just type 'help' or '?'"
    );
    println!("{HELP_TEXT}");

    run_command_loop(&session, &mut stdin).await;
    Ok(())
}

/// Drains stdin until EOF, dispatching each non-blank line. A parse or
/// command error is printed and the loop continues, the same recovery
/// applied uniformly around every command's dispatch.
async fn run_command_loop(session: &AccountSession, stdin: &mut (impl AsyncBufReadExt + Unpin)) {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = match stdin.read_line(&mut line).await {
            Ok(n) => n,
            Err(err) => {
                println!("Error: {err}");
                continue;
            }
        };
        if bytes_read == 0 {
            break; // EOF
        }

        match commands::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                if let Err(err) = commands::dispatch(session, command).await {
                    println!("Error: {err}");
                }
            }
            Err(err) => println!("Error: {err}"),
        }
    }
}
