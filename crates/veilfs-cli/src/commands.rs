//! Command parsing and dispatch for the interactive shell.
//!
//! Supports `upload`, `download`, `delete`, `move`, `createFolder`, `dir`,
//! and `help`/`?`. Unknown verbs print a notice and the loop continues
//! rather than treating an unrecognized command as fatal.

use veilfs_client::AccountSession;

use crate::error::{CliError, Result};

/// One parsed command line, ready to dispatch against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload { local_path: String, opacity_path: String },
    Download { handle: String, dest_dir: String },
    Delete { opacity_path: String, handle: String },
    Move { from_path: String, handle: String, to_path: String },
    CreateFolder { opacity_path: String },
    Dir { opacity_path: String },
    Help,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\nUsage:\n\
Important fact about veilfs's pathing system: the root folder is \"/\", so a\n\
subdirectory's path looks like \"/subdir\".\n\n\
upload <path to file> <opacity folder to save to>\n\
download <file handle> <local directory to save to>\n\
delete <opacity folder path> <file or folder handle>\n\
move <opacity folder path> <file or folder handle> <destination folder path>\n\
createFolder <opacity folder path>\n\
dir <opacity folder path>\n";

/// Split `line` on whitespace with shell-style quoting and classify it
/// into a [`Command`].
pub fn parse(line: &str) -> Result<Option<Command>> {
    let words = shlex::split(line).ok_or_else(|| CliError::Usage("unbalanced quotes".to_string()))?;
    let Some(verb) = words.first() else {
        return Ok(None);
    };

    let command = match verb.as_str() {
        "help" | "?" => Command::Help,
        "upload" => {
            if words.len() != 3 {
                return Err(CliError::Usage(
                    "upload <path to file> <opacity folder to save to>".to_string(),
                ));
            }
            Command::Upload { local_path: words[1].clone(), opacity_path: words[2].clone() }
        }
        "download" => {
            if words.len() != 3 {
                return Err(CliError::Usage("download <file handle> <local directory>".to_string()));
            }
            Command::Download { handle: words[1].clone(), dest_dir: words[2].clone() }
        }
        "delete" => {
            if words.len() != 3 {
                return Err(CliError::Usage("delete <opacity path> <handle>".to_string()));
            }
            Command::Delete { opacity_path: words[1].clone(), handle: words[2].clone() }
        }
        "move" => {
            if words.len() != 4 {
                return Err(CliError::Usage("move <from path> <handle> <to path>".to_string()));
            }
            Command::Move { from_path: words[1].clone(), handle: words[2].clone(), to_path: words[3].clone() }
        }
        "createFolder" => {
            if words.len() != 2 {
                return Err(CliError::Usage("createFolder <opacity path>".to_string()));
            }
            Command::CreateFolder { opacity_path: words[1].clone() }
        }
        "dir" => {
            if words.len() != 2 {
                return Err(CliError::Usage("please provide the folder path".to_string()));
            }
            Command::Dir { opacity_path: words[1].clone() }
        }
        other => Command::Unknown(other.to_string()),
    };
    Ok(Some(command))
}

/// Run one parsed command against `session`, printing its result directly
/// to stdout from within the matching arm.
pub async fn dispatch(session: &AccountSession, command: Command) -> Result<()> {
    match command {
        Command::Help => println!("{HELP_TEXT}"),
        Command::Unknown(verb) => println!("unrecognized command: {verb}"),
        Command::Upload { local_path, opacity_path } => {
            if session.upload(&local_path, &opacity_path).await? {
                println!("-------");
            } else {
                println!("a file named like that already exists in {opacity_path}, skipped");
            }
        }
        Command::Download { handle, dest_dir } => {
            let path = session.download(&handle, &dest_dir).await?;
            println!("downloaded to {}", path.display());
        }
        Command::Delete { opacity_path, handle } => {
            session.delete(&opacity_path, &handle).await?;
            println!("deleted");
        }
        Command::Move { from_path, handle, to_path } => {
            session.move_item(&from_path, &handle, &to_path).await?;
            println!("moved");
        }
        Command::CreateFolder { opacity_path } => {
            let entry = session.create_folder(&opacity_path).await?;
            println!("created folder {} ({})", entry.name, entry.handle);
        }
        Command::Dir { opacity_path } => {
            let view = session.get_folder_data(&opacity_path).await?;
            print_listing(&view.metadata);
        }
    }
    Ok(())
}

fn print_listing(metadata: &veilfs_core::FolderMetaData) {
    for folder in &metadata.folders {
        println!("[dir]  {}\t{}", folder.name, folder.handle);
    }
    for file in &metadata.files {
        let size = file.latest().map(|v| v.size).unwrap_or(0);
        let handle = file.latest().map(|v| v.handle.as_str()).unwrap_or("");
        println!("       {}\t{}\t{} bytes", file.name, handle, size);
    }
    if metadata.folders.is_empty() && metadata.files.is_empty() {
        println!("(empty)");
    }
}
