use nv_core::{NarrationError, NarrationState};
use nv_runtime::Narration;
use serde_json::Value;

use crate::{json_string, BoundaryEvent, BoundaryResult};

/// Steps that show nothing are skipped automatically; a story looping
/// through that many of them in a row is treated as stuck.
const MAX_SILENT_STEPS: usize = 10_000;

/// Advances until the player has something to read or answer. A line counts
/// only if it was recorded at or after `since`.
pub(crate) async fn run_to_boundary(
    narration: &mut Narration,
    since: u64,
) -> Result<BoundaryResult, NarrationError> {
    let mut since = since;
    for _ in 0..MAX_SILENT_STEPS {
        if narration.state() != NarrationState::Running {
            return Ok(describe_boundary(narration));
        }
        let shown = narration
            .history()
            .last()
            .filter(|entry| entry.index >= since)
            .is_some_and(|entry| entry.dialogue.is_some());
        if shown {
            return Ok(describe_boundary(narration));
        }
        since = narration.step_counter();
        narration.go_next(&Value::Null, None).await?;
    }

    Err(NarrationError::new(
        "CLI_STORY_STUCK",
        format!(
            "Story ran {} steps without showing anything.",
            MAX_SILENT_STEPS
        ),
    ))
}

/// What the player sees right now, without advancing.
pub(crate) fn describe_boundary(narration: &Narration) -> BoundaryResult {
    let dialogue = narration.dialogue();
    let (text, speaker) = match dialogue {
        Some(dialogue) => (Some(dialogue.text), dialogue.character),
        None => (None, None),
    };
    let event = match narration.state() {
        NarrationState::AwaitingChoice => BoundaryEvent::Choices,
        NarrationState::AwaitingInput => BoundaryEvent::Input,
        NarrationState::Running => BoundaryEvent::Line,
        NarrationState::Idle | NarrationState::Ended | NarrationState::Halted => {
            BoundaryEvent::End
        }
    };
    let choices = if event == BoundaryEvent::Choices {
        narration
            .choice_menu_options()
            .into_iter()
            .map(|choice| (choice.index, choice.option.text))
            .collect()
    } else {
        Vec::new()
    };
    let input_default = if event == BoundaryEvent::Input {
        narration
            .input_request()
            .and_then(|request| request.default_value)
    } else {
        None
    };

    BoundaryResult {
        event,
        text: if event == BoundaryEvent::End { None } else { text },
        speaker: if event == BoundaryEvent::End { None } else { speaker },
        choices,
        input_default,
    }
}

pub(crate) fn render_boundary(boundary: &BoundaryResult, state_out: Option<&str>) -> Vec<String> {
    let mut lines = vec!["RESULT:OK".to_string()];
    lines.push(
        match boundary.event {
            BoundaryEvent::Line => "EVENT:LINE",
            BoundaryEvent::Choices => "EVENT:CHOICES",
            BoundaryEvent::Input => "EVENT:INPUT",
            BoundaryEvent::End => "EVENT:END",
        }
        .to_string(),
    );
    if let Some(speaker) = &boundary.speaker {
        lines.push(format!("SPEAKER_JSON:{}", json_string(speaker)));
    }
    if let Some(text) = &boundary.text {
        lines.push(format!("TEXT_JSON:{}", json_string(text)));
    }
    for (index, text) in &boundary.choices {
        lines.push(format!("CHOICE:{}|{}", index, json_string(text)));
    }
    if let Some(default) = &boundary.input_default {
        lines.push(format!("INPUT_DEFAULT_JSON:{}", default));
    }
    lines.push(format!("STATE_OUT:{}", state_out.unwrap_or("NONE")));
    lines
}

pub(crate) fn emit_boundary(boundary: BoundaryResult, state_out: Option<String>) {
    for line in render_boundary(&boundary, state_out.as_deref()) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod boundary_runner_tests {
    use super::*;
    use crate::cli_test_support::*;
    use crate::{create_narration_for_story, load_story_by_path};

    #[tokio::test]
    async fn demo_story_stops_at_the_first_line() {
        let story = load_story_by_path(&demo_story_path()).expect("demo story should load");
        let mut narration = create_narration_for_story(&story, None, Some(1))
            .await
            .expect("narration should start");
        let boundary = run_to_boundary(&mut narration, 0)
            .await
            .expect("boundary should be reached");
        assert_eq!(boundary.event, BoundaryEvent::Line);
        assert_eq!(boundary.speaker.as_deref(), Some("Innkeeper"));
        assert!(boundary.text.is_some());
    }

    #[tokio::test]
    async fn silent_steps_are_skipped_until_the_menu() {
        let story = load_story_by_path(&demo_story_path()).expect("demo story should load");
        let mut narration = create_narration_for_story(&story, None, Some(1))
            .await
            .expect("narration should start");
        let mut boundary = run_to_boundary(&mut narration, 0)
            .await
            .expect("first line");
        while boundary.event == BoundaryEvent::Line {
            let since = narration.step_counter();
            narration
                .go_next(&Value::Null, None)
                .await
                .expect("go_next should pass");
            boundary = run_to_boundary(&mut narration, since)
                .await
                .expect("next boundary");
        }
        assert_eq!(boundary.event, BoundaryEvent::Choices);
        assert_eq!(boundary.choices.len(), 3);
    }

    #[test]
    fn render_boundary_prints_the_agent_protocol() {
        let boundary = BoundaryResult {
            event: BoundaryEvent::Choices,
            text: Some("Pick one".to_string()),
            speaker: None,
            choices: vec![(0, "Left".to_string()), (2, "Right".to_string())],
            input_default: None,
        };
        let lines = render_boundary(&boundary, Some("/tmp/state.json"));
        assert_eq!(
            lines,
            vec![
                "RESULT:OK",
                "EVENT:CHOICES",
                "TEXT_JSON:\"Pick one\"",
                "CHOICE:0|\"Left\"",
                "CHOICE:2|\"Right\"",
                "STATE_OUT:/tmp/state.json",
            ]
        );
    }
}
