//! Line oriented terminal session.
//!
//! Reads one command per line, applies it to the [`SubnetStore`] and prints the
//! result. Quoted arguments keep their spaces: `label 10.0.0.0/8 "core dc1"`.

use crate::config::Config;
use crate::error::{Result, SubnetError};
use crate::models::{parse_addr, parse_mask_len, Ipv4};
use crate::output::{render_table, render_tree};
use crate::store::{Outcome, SubnetStore};
use colored::Colorize;
use regex::Regex;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::OnceLock;

pub const USAGE: &str = "Usage: subnet-splitter <IP address> <mask length>\n       subnet-splitter <IP address>/<mask length>";

const HELP: &str = "\
Commands:
  init <cidr>              start a new tree
  divide <cidr>            split a block in two
  join <cidr>              merge the two halves of a block
  collapse <cidr>          drop everything below a block
  label <cidr> [labels..]  replace the labels of a block
  list                     table of the current subnets
  tree                     every block, indented
  save [file]              write the tree to a JSON file
  load [file]              read a tree from a JSON file
  reset                    forget the current tree
  help                     this text
  quit                     leave";

/// Regex for splitting command lines while preserving quoted substrings.
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r#"'([^']*)'\s*|"([^"]*)"\s*|([^'"\s]+)\s*"#).expect("Invalid Regex")
    })
}

fn split_and_strip(input: &str) -> Vec<&str> {
    get_command_regex()
        .find_iter(input)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_matches('\'').trim_matches('"'))
        .collect()
}

/// A parsed session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init(Ipv4),
    Divide(Ipv4),
    Join(Ipv4),
    Collapse(Ipv4),
    Label(Ipv4, Vec<String>),
    List,
    Tree,
    Save(Option<PathBuf>),
    Load(Option<PathBuf>),
    Reset,
    Help,
    Quit,
}

/// Read a block from `a.b.c.d/n` or `a.b.c.d n`. Returns the block and the unused arguments.
fn parse_target<'a>(args: &'a [&'a str]) -> Result<(Ipv4, &'a [&'a str])> {
    match args {
        [cidr, rest @ ..] if cidr.contains('/') => Ok((Ipv4::new(cidr)?, rest)),
        [addr, mask, rest @ ..] => Ok((
            Ipv4::from_parts(parse_addr(addr)?, parse_mask_len(mask)?)?,
            rest,
        )),
        _ => Err(SubnetError::Command("expected a block as <address>/<mask length>".to_string())),
    }
}

fn single_target(name: &str, args: &[&str]) -> Result<Ipv4> {
    let (cidr, rest) = parse_target(args)?;
    if !rest.is_empty() {
        return Err(SubnetError::Command(format!("{name} takes one block, got extra {rest:?}")));
    }
    Ok(cidr)
}

fn optional_path(args: &[&str]) -> Result<Option<PathBuf>> {
    match args {
        [] => Ok(None),
        [path] => Ok(Some(PathBuf::from(path))),
        _ => Err(SubnetError::Command("expected at most one file name".to_string())),
    }
}

/// Parse one input line. Blank lines and `#` comments give `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let words = split_and_strip(line);
    let Some((name, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "init" => Command::Init(single_target(name, args)?),
        "divide" | "d" => Command::Divide(single_target(name, args)?),
        "join" | "j" => Command::Join(single_target(name, args)?),
        "collapse" => Command::Collapse(single_target(name, args)?),
        "label" => {
            let (cidr, labels) = parse_target(args)?;
            Command::Label(cidr, labels.iter().map(|s| s.to_string()).collect())
        }
        "list" | "ls" => Command::List,
        "tree" => Command::Tree,
        "save" | "s" => Command::Save(optional_path(args)?),
        "load" | "l" => Command::Load(optional_path(args)?),
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(SubnetError::Command(format!("unknown command {other:?}"))),
    };
    Ok(Some(command))
}

/// Parse the program arguments into the root block.
pub fn parse_args(args: &[String]) -> Result<Ipv4> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    single_target("subnet-splitter", &args)
}

/// Result of executing a command.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

fn outcome_text(
    store: &SubnetStore,
    cidr: Ipv4,
    outcome: Outcome,
    unchanged: &str,
) -> Result<String> {
    match outcome {
        Outcome::Changed => Ok(render_table(&store.list()?)),
        Outcome::Unchanged => Ok(format!("{cidr} {unchanged}")),
        Outcome::NotFound => Ok(format!("{cidr} is not in the tree")),
    }
}

/// Apply a command to the store and describe the result.
pub fn execute(store: &SubnetStore, config: &Config, command: Command) -> Result<Reply> {
    log::debug!("execute {command:?}");
    let text = match command {
        Command::Init(cidr) => {
            let root = store.initialize(cidr.bits(), cidr.mask)?;
            format!("Initialized {root}\n{}", render_table(&store.list()?))
        }
        Command::Divide(cidr) => {
            let outcome = store.divide(cidr.bits(), cidr.mask)?;
            outcome_text(store, cidr, outcome, "cannot be divided further")?
        }
        Command::Join(cidr) => {
            let outcome = store.join(cidr.bits(), cidr.mask)?;
            outcome_text(store, cidr, outcome, "is not divided")?
        }
        Command::Collapse(cidr) => {
            let outcome = store.collapse(cidr.bits(), cidr.mask)?;
            outcome_text(store, cidr, outcome, "is not divided")?
        }
        Command::Label(cidr, labels) => match store.set_labels(cidr.bits(), cidr.mask, labels)? {
            Outcome::Changed => format!("Labels updated for {cidr}"),
            Outcome::Unchanged => format!("Labels unchanged for {cidr}"),
            Outcome::NotFound => format!("{cidr} is not in the tree"),
        },
        Command::List => render_table(&store.list()?),
        Command::Tree => render_tree(&store.snapshot()?)?,
        Command::Save(path) => {
            let path = path.unwrap_or_else(|| config.save_file.clone());
            store.save(&path)?;
            format!("Saved to {}", path.display())
        }
        Command::Load(path) => {
            let path = path.unwrap_or_else(|| config.save_file.clone());
            let root = store.load(&path)?;
            format!(
                "Loaded {root} from {}\n{}",
                path.display(),
                render_table(&store.list()?)
            )
        }
        Command::Reset => {
            store.reset();
            "Tree reset, use init <cidr> to start again".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

/// Read commands from `input` until it ends or `quit` is entered.
///
/// Command failures are printed and the session continues; only I/O errors on
/// the streams end it.
pub fn run_session<R, W>(
    store: &SubnetStore,
    config: &Config,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: BufRead,
    W: Write,
{
    if let Ok(rows) = store.list() {
        write!(output, "{}", render_table(&rows))?;
    }
    writeln!(output, "Type {} for a list of commands.", "help".bold())?;

    let mut lines = input.lines();
    loop {
        write!(output, "{} ", "subnets>".green())?;
        output.flush()?;
        let Some(line) = lines.next() else {
            writeln!(output)?;
            break;
        };
        let line = line?;

        let reply = parse_command(&line).and_then(|command| match command {
            Some(command) => execute(store, config, command).map(Some),
            None => Ok(None),
        });
        match reply {
            Ok(Some(Reply::Quit)) => break,
            Ok(Some(Reply::Text(text))) => writeln!(output, "{}", text.trim_end())?,
            Ok(None) => {}
            Err(err) => {
                log::warn!("{line:?} failed: {err}");
                writeln!(output, "{} {err}", "error:".red())?;
            }
        }
    }
    log::info!("Session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(text: &str) -> Ipv4 {
        Ipv4::new(text).unwrap()
    }

    #[test]
    fn test_split_and_strip_complex() {
        let input = "label 10.0.0.0/8 'World War'  \"fail\" Rust";
        let expected = vec!["label", "10.0.0.0/8", "World War", "fail", "Rust"];
        assert_eq!(split_and_strip(input), expected);
    }

    #[test]
    fn test_split_and_strip_nospaces() {
        assert_eq!(split_and_strip("NoSpacesHere"), vec!["NoSpacesHere"]);
    }

    #[test]
    fn test_split_and_strip_empty_quotes() {
        let expected = vec!["Empty", "", "Single", "Quotes"];
        assert_eq!(split_and_strip("Empty '' Single Quotes"), expected);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("divide 10.2.0.0/16").unwrap(),
            Some(Command::Divide(cidr("10.2.0.0/16")))
        );
        assert_eq!(
            parse_command("  JOIN 10.2.0.0 17 ").unwrap(),
            Some(Command::Join(cidr("10.2.0.0/17")))
        );
        assert_eq!(
            parse_command("label 10.2.0.0/17 'office floor 2' printers").unwrap(),
            Some(Command::Label(
                cidr("10.2.0.0/17"),
                vec!["office floor 2".to_string(), "printers".to_string()]
            ))
        );
        assert_eq!(
            parse_command("label 10.2.0.0/17").unwrap(),
            Some(Command::Label(cidr("10.2.0.0/17"), vec![]))
        );
        assert_eq!(parse_command("save").unwrap(), Some(Command::Save(None)));
        assert_eq!(
            parse_command("load plan.json").unwrap(),
            Some(Command::Load(Some(PathBuf::from("plan.json"))))
        );
        assert_eq!(parse_command("q").unwrap(), Some(Command::Quit));
        assert_eq!(parse_command("").unwrap(), None);
        assert_eq!(parse_command("# note").unwrap(), None);
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(matches!(parse_command("frobnicate"), Err(SubnetError::Command(_))));
        assert!(matches!(parse_command("divide"), Err(SubnetError::Command(_))));
        assert!(matches!(
            parse_command("divide 10.2.0/16"),
            Err(SubnetError::InvalidAddress(_))
        ));
        assert!(matches!(
            parse_command("divide 10.2.0.0/33"),
            Err(SubnetError::InvalidMaskLength(_))
        ));
        assert!(parse_command("divide 10.2.0.0/16 extra").is_err());
        assert!(parse_command("save a.json b.json").is_err());
    }

    #[test]
    fn test_parse_args() {
        let args = vec!["10.2.0.0".to_string(), "16".to_string()];
        assert_eq!(parse_args(&args).unwrap(), cidr("10.2.0.0/16"));
        let args = vec!["192.168.1.0/31".to_string()];
        assert_eq!(parse_args(&args).unwrap(), cidr("192.168.1.0/31"));
        assert!(parse_args(&[]).is_err());
        assert!(parse_args(&["300.1.1.1".to_string(), "8".to_string()]).is_err());
    }

    #[test]
    fn test_execute_divide_messages() {
        let store = SubnetStore::new();
        let config = Config::default();
        execute(&store, &config, Command::Init(cidr("192.168.1.0/31"))).unwrap();

        let reply = execute(&store, &config, Command::Divide(cidr("192.168.1.0/31"))).unwrap();
        match reply {
            Reply::Text(text) => {
                assert!(text.contains("192.168.1.0/32"));
                assert!(text.contains("192.168.1.1/32"));
            }
            Reply::Quit => panic!("unexpected quit"),
        }

        let reply = execute(&store, &config, Command::Divide(cidr("192.168.1.1/32"))).unwrap();
        assert_eq!(
            reply,
            Reply::Text("192.168.1.1/32 cannot be divided further".to_string())
        );
        let reply = execute(&store, &config, Command::Join(cidr("10.0.0.0/8"))).unwrap();
        assert_eq!(reply, Reply::Text("10.0.0.0/8 is not in the tree".to_string()));
        assert_eq!(
            execute(&store, &config, Command::Quit).unwrap(),
            Reply::Quit
        );
    }

    #[test]
    fn test_run_session() {
        let store = SubnetStore::new();
        store.initialize(0x0a020000, 16).unwrap();
        let config = Config::default();
        let input = "divide 10.2.0.0/16\nbogus\nlist\nquit\ndivide 10.2.0.0/17\n";
        let mut output = Vec::new();

        run_session(&store, &config, input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("10.2.128.0/17"));
        assert!(text.contains("unknown command"));
        // quit stops before the last line
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
