//! Line commands understood by the terminal client.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Edit(usize),
    Save(String),
    Cancel,
    Done(usize),
    Remove(usize),
    Answer(bool),
    Theme,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  add <text>    create a task
  edit <n>      open task n for editing
  save <text>   save the task being edited under a new name
  cancel        close the editor without saving
  done <n>      flip the done flag of task n
  rm <n>        delete task n (asks y/n)
  theme         switch between light and dark
  list          show the tasks
  help          show this text
  quit          exit";

/// Parses one input line. Task numbers are 1-based as printed by `list`.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb.to_ascii_lowercase().as_str() {
        "add" => Ok(Command::Add(rest.to_string())),
        "edit" => parse_index(rest).map(Command::Edit),
        "save" => Ok(Command::Save(rest.to_string())),
        "cancel" => Ok(Command::Cancel),
        "done" => parse_index(rest).map(Command::Done),
        "rm" | "delete" => parse_index(rest).map(Command::Remove),
        "y" | "yes" => Ok(Command::Answer(true)),
        "n" | "no" => Ok(Command::Answer(false)),
        "theme" => Ok(Command::Theme),
        "list" | "ls" => Ok(Command::List),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        "" => Err("type `help` for the list of commands".to_string()),
        other => Err(format!("unknown command '{other}', type `help`")),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("expected a task number, got '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_commands_keeping_inner_spacing() {
        assert_eq!(
            parse_command("add Buy  milk"),
            Ok(Command::Add("Buy  milk".to_string()))
        );
        assert_eq!(parse_command("add"), Ok(Command::Add(String::new())));
        assert_eq!(
            parse_command("  save Walk the dog "),
            Ok(Command::Save("Walk the dog".to_string()))
        );
    }

    #[test]
    fn task_numbers_are_one_based() {
        assert_eq!(parse_command("edit 1"), Ok(Command::Edit(0)));
        assert_eq!(parse_command("done 3"), Ok(Command::Done(2)));
        assert_eq!(parse_command("rm 2"), Ok(Command::Remove(1)));
        assert!(parse_command("rm 0").is_err());
        assert!(parse_command("done x").is_err());
    }

    #[test]
    fn answers_and_bare_verbs() {
        assert_eq!(parse_command("Y"), Ok(Command::Answer(true)));
        assert_eq!(parse_command("no"), Ok(Command::Answer(false)));
        assert_eq!(parse_command("theme"), Ok(Command::Theme));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert!(parse_command("").is_err());
        assert!(parse_command("frobnicate").is_err());
    }
}
