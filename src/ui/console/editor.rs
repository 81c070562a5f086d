use crate::ui::command::{
    BREAKPOINTS_COMMAND, BREAKPOINTS_COMMAND_SHORT, BREAK_COMMAND, BREAK_COMMAND_SHORT,
    HELP_COMMAND, HELP_COMMAND_SHORT, MEMORY_COMMAND, QUIT_COMMAND, QUIT_COMMAND_SHORT,
    REGISTERS_COMMAND, REGISTER_COMMAND, RESUME_COMMAND, RESUME_COMMAND_SHORT,
    STEP_INTO_COMMAND, STEP_INTO_COMMAND_SHORT, STEP_OVER_COMMAND, STEP_OVER_COMMAND_SHORT,
    STEP_RETURN_COMMAND, SUSPEND_COMMAND, SUSPEND_COMMAND_SHORT, WHERE_COMMAND,
};
use crossterm::style::{Color, Stylize};
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::HistoryHinter;
use rustyline::history::MemHistory;
use rustyline::{CompletionType, Config, Context, Editor};
use rustyline_derive::{Helper, Hinter, Validator};
use std::borrow::Cow;
use std::borrow::Cow::{Borrowed, Owned};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use trie_rs::{Trie, TrieBuilder};

struct CommandHint {
    short: Option<String>,
    long: String,
    subcommands: Vec<String>,
}

impl CommandHint {
    fn display_with_short(&self) -> String {
        match self.short {
            Some(ref short) if self.long.starts_with(short.as_str()) => format!(
                "{}{}",
                short.clone().bold().underlined(),
                &self.long[short.len()..]
            ),
            Some(ref short) => format!("{}|{}", &self.long, short.clone().bold().underlined()),
            None => self.long.clone(),
        }
    }
}

impl From<&str> for CommandHint {
    fn from(value: &str) -> Self {
        CommandHint {
            short: None,
            long: value.to_string(),
            subcommands: vec![],
        }
    }
}

impl From<(&str, &str)> for CommandHint {
    fn from((short, long): (&str, &str)) -> Self {
        CommandHint {
            short: Some(short.to_string()),
            long: long.to_string(),
            subcommands: vec![],
        }
    }
}

pub struct CommandCompleter {
    commands: Vec<CommandHint>,
    command_hints: Trie<u8>,
    subcommand_hints: HashMap<String, Trie<u8>>,
    files: Vec<String>,
    file_hints: Trie<u8>,
}

fn build_trie<'a>(words: impl IntoIterator<Item = &'a str>) -> Trie<u8> {
    let mut builder = TrieBuilder::new();
    words.into_iter().for_each(|word| builder.push(word));
    builder.build()
}

fn variants(trie: &Trie<u8>, prefix: &str) -> Vec<String> {
    trie.predictive_search(prefix)
        .iter()
        .map(|var| String::from_utf8_lossy(var.as_slice()).into_owned())
        .collect()
}

impl CommandCompleter {
    fn new(commands: impl IntoIterator<Item = CommandHint>) -> Self {
        let commands: Vec<CommandHint> = commands.into_iter().collect();
        let subcommand_hints = commands
            .iter()
            .filter(|cmd| !cmd.subcommands.is_empty())
            .flat_map(|cmd| {
                let trie = || build_trie(cmd.subcommands.iter().map(String::as_str));
                let mut hints = vec![(cmd.long.clone(), trie())];
                if let Some(ref short) = cmd.short {
                    hints.push((short.clone(), trie()));
                }
                hints
            })
            .collect();

        Self {
            command_hints: build_trie(commands.iter().map(|cmd| cmd.long.as_str())),
            commands,
            subcommand_hints,
            files: vec![],
            file_hints: TrieBuilder::new().build(),
        }
    }

    /// Add source file names suggested for `break` command.
    pub fn add_file_hints(&mut self, files: impl IntoIterator<Item = String>) {
        for file in files {
            if !self.files.contains(&file) {
                self.files.push(file);
            }
        }
        self.file_hints = build_trie(self.files.iter().map(String::as_str));
    }

    fn complete_line(&self, line: &str) -> (usize, Vec<Pair>) {
        if let Some((cmd, arg)) = line.split_once(char::is_whitespace) {
            let arg = arg.trim_start();
            let pos = line.len() - arg.len();

            if cmd == BREAK_COMMAND || cmd == BREAK_COMMAND_SHORT {
                let pairs = variants(&self.file_hints, arg)
                    .into_iter()
                    .map(|file| Pair {
                        replacement: format!("{file}:"),
                        display: file,
                    })
                    .collect();
                return (pos, pairs);
            }

            if let Some(subcommands) = self.subcommand_hints.get(cmd) {
                let last = arg.rsplit(char::is_whitespace).next().unwrap_or_default();
                let pairs = variants(subcommands, last)
                    .into_iter()
                    .map(|sub| Pair {
                        display: sub.clone(),
                        replacement: sub,
                    })
                    .collect();
                return (line.len() - last.len(), pairs);
            }
            return (pos, vec![]);
        }

        let pairs = variants(&self.command_hints, line)
            .into_iter()
            .filter_map(|long| self.commands.iter().find(|cmd| cmd.long == long))
            .map(|cmd| Pair {
                display: cmd.display_with_short(),
                replacement: cmd.long.clone(),
            })
            .collect();
        (0, pairs)
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        Ok(self.complete_line(&line[..pos]))
    }
}

#[derive(Helper, Hinter, Validator)]
pub struct RLHelper {
    pub completer: Arc<Mutex<CommandCompleter>>,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
    pub colored_prompt: String,
}

impl Completer for RLHelper {
    type Candidate = <CommandCompleter as Completer>::Candidate;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Self::Candidate>)> {
        self.completer.lock().unwrap().complete(line, pos, ctx)
    }
}

impl Highlighter for RLHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        default: bool,
    ) -> Cow<'b, str> {
        if default {
            Borrowed(&self.colored_prompt)
        } else {
            Borrowed(prompt)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(format!("{}", hint.with(Color::Grey)))
    }
}

fn command_hints() -> Vec<CommandHint> {
    vec![
        (RESUME_COMMAND_SHORT, RESUME_COMMAND).into(),
        (SUSPEND_COMMAND_SHORT, SUSPEND_COMMAND).into(),
        (STEP_INTO_COMMAND_SHORT, STEP_INTO_COMMAND).into(),
        (STEP_OVER_COMMAND_SHORT, STEP_OVER_COMMAND).into(),
        STEP_RETURN_COMMAND.into(),
        (BREAK_COMMAND_SHORT, BREAK_COMMAND).into(),
        (BREAKPOINTS_COMMAND_SHORT, BREAKPOINTS_COMMAND).into(),
        CommandHint {
            short: None,
            long: REGISTERS_COMMAND.to_string(),
            subcommands: ["s", "v", "int", "fp"].map(ToString::to_string).to_vec(),
        },
        CommandHint {
            short: None,
            long: REGISTER_COMMAND.to_string(),
            subcommands: ["int", "fp"].map(ToString::to_string).to_vec(),
        },
        MEMORY_COMMAND.into(),
        WHERE_COMMAND.into(),
        (HELP_COMMAND_SHORT, HELP_COMMAND).into(),
        (QUIT_COMMAND_SHORT, QUIT_COMMAND).into(),
    ]
}

pub fn create_editor(promt: &str) -> anyhow::Result<Editor<RLHelper, MemHistory>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .build();

    let h = RLHelper {
        completer: Arc::new(Mutex::new(CommandCompleter::new(command_hints()))),
        hinter: HistoryHinter {},
        colored_prompt: format!("{}", promt.with(Color::DarkGreen)),
    };

    let mut editor = Editor::with_history(config, MemHistory::new())?;
    editor.set_helper(Some(h));
    Ok(editor)
}
