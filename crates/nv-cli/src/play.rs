use std::io::{self, BufRead, Write};
use std::path::Path;

use nv_core::{NarrationError, GO_BACK_UNDERFLOW};
use nv_runtime::Narration;
use serde_json::Value;

use crate::{
    describe_boundary, load_narration_from_state_for_story, map_play_io, run_to_boundary,
    save_narration_state, submit_input, BoundaryEvent, BoundaryResult, LineCommandAction,
    LineCommandContext, LoadedStory,
};

const COMMANDS_HELP: &str = "commands: :help :save :load :back :quit";

pub(crate) async fn run_play_line_mode(
    state_file: &str,
    story: &LoadedStory,
    narration: &mut Narration,
) -> Result<i32, NarrationError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(state_file, story, narration, &mut reader, &mut writer).await
}

pub(crate) async fn run_play_line_mode_with_io(
    state_file: &str,
    story: &LoadedStory,
    narration: &mut Narration,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, NarrationError> {
    writeln!(writer, "{}", story.title).map_err(map_play_io)?;
    writeln!(writer, "{}", COMMANDS_HELP).map_err(map_play_io)?;
    let context = LineCommandContext { state_file, story };

    let mut boundary = run_to_boundary(narration, 0).await?;
    'boundary: loop {
        render_play_boundary(&boundary, writer)?;
        if boundary.event == BoundaryEvent::End {
            return Ok(0);
        }

        let since = narration.step_counter();
        loop {
            let Some(raw) = prompt_input_from("> ", reader, writer)? else {
                return Ok(0);
            };
            let mut lines = Vec::new();
            let action =
                handle_line_cmd(raw.as_str(), &context, narration, &mut |line: String| {
                    lines.push(line)
                })?;
            for line in lines {
                writeln!(writer, "{}", line).map_err(map_play_io)?;
            }
            match action {
                LineCommandAction::Continue => continue,
                LineCommandAction::RefreshBoundary => {
                    boundary = describe_boundary(narration);
                    continue 'boundary;
                }
                LineCommandAction::Quit => return Ok(0),
                LineCommandAction::NotHandled => {}
            }

            match boundary.event {
                BoundaryEvent::Line => {
                    narration.go_next(&Value::Null, None).await?;
                }
                BoundaryEvent::Choices => {
                    let offered = raw
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|index| boundary.choices.iter().any(|(at, _)| at == index));
                    let Some(index) = offered else {
                        writeln!(writer, "pick one of the listed numbers").map_err(map_play_io)?;
                        continue;
                    };
                    narration.select_choice(index, &Value::Null).await?;
                }
                BoundaryEvent::Input => submit_input(narration, &raw).await?,
                BoundaryEvent::End => return Ok(0),
            }
            break;
        }
        boundary = run_to_boundary(narration, since).await?;
    }
}

pub(crate) fn render_play_boundary(
    boundary: &BoundaryResult,
    writer: &mut dyn Write,
) -> Result<(), NarrationError> {
    writeln!(writer).map_err(map_play_io)?;
    if let Some(text) = &boundary.text {
        match &boundary.speaker {
            Some(speaker) => writeln!(writer, "{}: {}", speaker, text),
            None => writeln!(writer, "{}", text),
        }
        .map_err(map_play_io)?;
    }
    for (index, text) in &boundary.choices {
        writeln!(writer, "  [{}] {}", index, text).map_err(map_play_io)?;
    }
    if let Some(default) = &boundary.input_default {
        let shown = match default {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        writeln!(writer, "(default: {})", shown).map_err(map_play_io)?;
    }
    if boundary.event == BoundaryEvent::End {
        writeln!(writer, "[END]").map_err(map_play_io)?;
    }
    Ok(())
}

pub(crate) fn handle_line_cmd(
    raw: &str,
    context: &LineCommandContext<'_>,
    narration: &mut Narration,
    emit: &mut dyn FnMut(String),
) -> Result<LineCommandAction, NarrationError> {
    match raw {
        ":help" => {
            emit(COMMANDS_HELP.to_string());
            Ok(LineCommandAction::Continue)
        }
        ":save" => {
            save_narration_state(Path::new(context.state_file), narration, &context.story.id)?;
            emit(format!("saved: {}", context.state_file));
            Ok(LineCommandAction::Continue)
        }
        ":load" => {
            let resumed =
                load_narration_from_state_for_story(Path::new(context.state_file), context.story)?;
            *narration = resumed;
            emit(format!("loaded: {}", context.state_file));
            Ok(LineCommandAction::RefreshBoundary)
        }
        ":back" => match narration.go_back(|path| tracing::debug!(path, "restored path"), 1) {
            Ok(()) => {
                emit("went back".to_string());
                Ok(LineCommandAction::RefreshBoundary)
            }
            Err(error) if error.code == GO_BACK_UNDERFLOW => {
                emit("nothing to go back to".to_string());
                Ok(LineCommandAction::Continue)
            }
            Err(error) => Err(error),
        },
        ":quit" => {
            emit("bye".to_string());
            Ok(LineCommandAction::Quit)
        }
        _ => Ok(LineCommandAction::NotHandled),
    }
}

/// Reads one line. `None` once the reader is exhausted.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, NarrationError> {
    write!(writer, "{}", prefix).map_err(map_play_io)?;
    writer.flush().map_err(map_play_io)?;
    let mut input = String::new();
    let read = reader.read_line(&mut input).map_err(map_play_io)?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
