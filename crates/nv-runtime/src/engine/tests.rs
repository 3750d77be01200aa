use std::cell::{Cell, RefCell};
use std::rc::Rc;

use nv_core::{CHOICE_INDEX, HALTED, LABEL_NOT_FOUND, NO_OPEN_LABEL_AT_END, STEP_FAILED};
use serde_json::json;

use super::runtime_test_support::*;
use super::*;

fn dialogue_text(narration: &Narration) -> Option<String> {
    narration.dialogue().map(|dialogue| dialogue.text)
}

#[tokio::test]
async fn call_then_go_next_visits_steps_in_order() {
    let mut narration =
        narration_with_game_end(vec![label("start", vec![say("one"), say("two"), say("three")])]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("one"));
    assert_eq!(narration.state(), NarrationState::Running);

    for expected in ["two", "three"] {
        narration
            .go_next(&props(), None)
            .await
            .expect("go_next should pass");
        assert_eq!(dialogue_text(&narration).as_deref(), Some(expected));
    }

    let visited = narration
        .history()
        .iter()
        .map(|entry| entry.label_step_index)
        .collect::<Vec<_>>();
    assert_eq!(visited, vec![Some(0), Some(1), Some(2)]);
    let indices = narration
        .history()
        .iter()
        .map(|entry| entry.index)
        .collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[tokio::test]
async fn call_unknown_label_fails_without_touching_the_stack() {
    let mut narration = narration_with(vec![label("start", vec![say("a")])]);
    let error = narration
        .call_label("missing", &props())
        .await
        .expect_err("unknown label should fail");
    assert_eq!(error.code, LABEL_NOT_FOUND);
    assert!(narration.opened_labels().is_empty());
    assert!(narration.history().is_empty());
}

#[tokio::test]
async fn jump_label_leaves_a_single_open_label() {
    let mut narration = narration_with(vec![
        label("start", vec![say("a")]),
        label("side", vec![say("b")]),
        label("finale", vec![say("c")]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call start");
    narration
        .call_label("side", &props())
        .await
        .expect("call side");
    assert_eq!(narration.opened_labels().len(), 2);

    narration
        .jump_label("finale", &props())
        .await
        .expect("jump should pass");
    assert_eq!(narration.opened_labels().len(), 1);
    assert_eq!(narration.current_label(), Some(&LabelId::from("finale")));

    let error = narration
        .jump_label("nowhere", &props())
        .await
        .expect_err("jump to unknown label should fail");
    assert_eq!(error.code, LABEL_NOT_FOUND);
    assert_eq!(narration.current_label(), Some(&LabelId::from("finale")));
}

#[tokio::test]
async fn call_outcome_is_tail_chained_and_returns_to_the_caller() {
    let mut narration = narration_with(vec![
        label("start", vec![call_step("side"), say("back")]),
        label("side", vec![say("inside")]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("inside"));
    assert_eq!(narration.opened_labels().len(), 2);
    assert_eq!(narration.history().len(), 1);
    assert_eq!(
        narration.history()[0].current_label,
        Some(LabelId::from("side"))
    );

    narration
        .go_next(&props(), None)
        .await
        .expect("go_next should return to the caller");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("back"));
    assert_eq!(narration.opened_labels().len(), 1);
    assert_eq!(narration.current_step_index(), Some(1));
    assert!(narration.is_label_already_completed("side"));
}

#[tokio::test]
async fn close_label_outcome_continues_with_the_caller() {
    let close = step_fn("close", |_ctx, _props| Ok(StepOutcome::CloseLabel));
    let mut narration = narration_with(vec![
        label("start", vec![call_step("side"), say("after")]),
        label("side", vec![close, say("never")]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("after"));
    assert_eq!(narration.opened_labels().len(), 1);
    assert_eq!(narration.history().len(), 1);
}

#[tokio::test]
async fn step_value_is_returned_to_the_caller() {
    let answer = step_fn("answer", |_ctx, _props| Ok(StepOutcome::Value(json!(42))));
    let mut narration = narration_with(vec![label("start", vec![answer])]);
    let value = narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(value, Some(json!(42)));
}

#[tokio::test]
async fn props_reach_the_step() {
    let echo = step_fn("echo", |ctx, props| {
        ctx.storage_mut().set_variable("seen", props.clone());
        Ok(StepOutcome::Continue)
    });
    let mut narration = narration_with(vec![label("start", vec![echo])]);
    narration
        .call_label("start", &json!({"mood": "calm"}))
        .await
        .expect("call should pass");
    assert_eq!(
        narration.storage().get_variable("seen"),
        Some(json!({"mood": "calm"}))
    );
}

#[tokio::test]
async fn finishing_the_last_label_ends_the_game() {
    let mut narration = narration_with_game_end(vec![label("a", vec![say("d1"), say("d2")])]);
    narration.call_label("a", &props()).await.expect("call a");
    narration
        .go_next(&props(), None)
        .await
        .expect("go_next to d2");
    narration
        .go_next(&props(), None)
        .await
        .expect("go_next past the end");

    assert_eq!(narration.state(), NarrationState::Ended);
    assert_eq!(
        narration.storage().get_variable("game_over"),
        Some(json!(true))
    );
    assert_eq!(narration.history().len(), 3);
    assert!(narration
        .history()
        .last()
        .expect("end entry")
        .current_label
        .is_none());
    assert!(narration.is_label_already_completed("a"));
}

#[tokio::test]
async fn game_end_hook_can_jump_back_to_a_title_label() {
    let mut narration = Narration::new(
        NarrationOptions {
            labels: vec![
                label("story", vec![say("the end")]),
                label("title", vec![say("press start")]),
            ]
            .into_iter()
            .collect(),
            ..NarrationOptions::default()
        }
        .with_game_end(|_ctx, _props| StepOutcome::jump("title")),
    );
    narration
        .call_label("story", &props())
        .await
        .expect("call story");
    narration
        .go_next(&props(), None)
        .await
        .expect("game end should jump to the title");
    assert_eq!(narration.current_label(), Some(&LabelId::from("title")));
    assert_eq!(dialogue_text(&narration).as_deref(), Some("press start"));
    assert_eq!(narration.state(), NarrationState::Running);
}

#[tokio::test]
async fn closing_without_game_end_hook_halts() {
    let mut narration = narration_with(vec![label("a", vec![say("only")])]);
    narration.call_label("a", &props()).await.expect("call a");
    let error = narration
        .go_next(&props(), None)
        .await
        .expect_err("closing the last label should fail");
    assert_eq!(error.code, NO_OPEN_LABEL_AT_END);
    assert_eq!(narration.state(), NarrationState::Halted);

    let error = narration
        .go_next(&props(), None)
        .await
        .expect_err("halted narration should refuse to advance");
    assert_eq!(error.code, HALTED);

    narration
        .call_label("a", &props())
        .await
        .expect("calling a label should recover");
    assert_eq!(narration.state(), NarrationState::Running);
}

#[tokio::test]
async fn go_next_with_choice_records_the_index_on_the_next_entry() {
    let mut narration = narration_with(vec![label(
        "start",
        vec![
            say("hi"),
            menu(vec![
                ChoiceOption::close("Left"),
                ChoiceOption::close("Right"),
            ]),
            say("after"),
        ],
    )]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    narration.go_next(&props(), None).await.expect("to menu");
    assert_eq!(narration.state(), NarrationState::AwaitingChoice);
    assert_eq!(narration.choice_menu_options().len(), 2);

    let blocked = narration
        .go_next(&props(), None)
        .await
        .expect("blocked go_next is not an error");
    assert!(blocked.is_none());
    assert_eq!(narration.current_step_index(), Some(1));
    assert_eq!(narration.history().len(), 2);

    narration
        .go_next(&props(), Some(1))
        .await
        .expect("go_next with a choice should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("after"));
    assert!(narration.choice_menu_options().is_empty());

    let history = narration.history();
    assert_eq!(history.len(), 3);
    assert_eq!(history[1].choices.as_ref().map(Vec::len), Some(2));
    assert!(history[1].dialogue.is_none());
    assert_eq!(history[2].choice_index_made, Some(1));

    let transcript = narration.narrative_history();
    let menu_entry = transcript
        .iter()
        .find(|entry| entry.choices.is_some())
        .expect("menu should appear in the transcript");
    assert!(menu_entry.player_made_choice);
    let responses = menu_entry
        .choices
        .as_ref()
        .expect("choices")
        .iter()
        .map(|choice| choice.is_response)
        .collect::<Vec<_>>();
    assert_eq!(responses, vec![false, true]);
}

#[tokio::test]
async fn go_next_with_unknown_choice_index_is_rejected() {
    let mut narration = narration_with(vec![label(
        "start",
        vec![menu(vec![ChoiceOption::close("Only")]), say("after")],
    )]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let error = narration
        .go_next(&props(), Some(3))
        .await
        .expect_err("index out of menu should fail");
    assert_eq!(error.code, CHOICE_INDEX);
    assert_eq!(narration.state(), NarrationState::AwaitingChoice);
    assert!(narration.choices_made().is_empty());
}

#[tokio::test]
async fn select_choice_follows_the_option_target() {
    let mut narration = narration_with(vec![
        label(
            "start",
            vec![menu(vec![
                ChoiceOption::jump("Left", "left"),
                ChoiceOption::call("Right", "right"),
            ])],
        ),
        label("left", vec![say("went left")]),
        label("right", vec![say("went right")]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    narration
        .select_choice(1, &props())
        .await
        .expect("select should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("went right"));
    assert_eq!(narration.opened_labels().len(), 2);
    assert_eq!(
        narration
            .history()
            .last()
            .expect("entry after the choice")
            .choice_index_made,
        Some(1)
    );
}

#[tokio::test]
async fn select_close_choice_returns_to_the_caller() {
    let mut narration = narration_with(vec![
        label("start", vec![call_step("shop"), say("outside")]),
        label("shop", vec![menu(vec![ChoiceOption::close("Leave")])]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(narration.state(), NarrationState::AwaitingChoice);
    narration
        .select_choice(0, &props())
        .await
        .expect("close should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("outside"));
    assert_eq!(narration.opened_labels().len(), 1);
}

#[tokio::test]
async fn select_choice_to_unregistered_label_changes_nothing() {
    let mut narration = narration_with(vec![label(
        "start",
        vec![menu(vec![ChoiceOption::jump("Broken", "missing")])],
    )]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let error = narration
        .select_choice(0, &props())
        .await
        .expect_err("missing target should fail");
    assert_eq!(error.code, LABEL_NOT_FOUND);
    assert_eq!(narration.choice_menu_options().len(), 1);
    assert!(narration.choices_made().is_empty());
}

fn boom() -> Arc<dyn Step> {
    step_fn("boom", |_ctx, _props| Err(NarrationError::new("BOOM", "boom")))
}

#[tokio::test]
async fn choice_whose_target_fails_stays_on_offer() {
    let mut narration = narration_with(vec![
        label(
            "start",
            vec![menu(vec![
                ChoiceOption::jump("Broken", "broken"),
                ChoiceOption::jump("Fine", "fine"),
            ])],
        ),
        label("broken", vec![boom()]),
        label("fine", vec![say("ok")]),
    ]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let error = narration
        .select_choice(0, &props())
        .await
        .expect_err("failing target should surface");
    assert_eq!(error.code, STEP_FAILED);
    assert_eq!(narration.state(), NarrationState::AwaitingChoice);
    assert_eq!(narration.choice_menu_options().len(), 2);
    assert!(narration.choices_made().is_empty());
    assert_eq!(narration.opened_labels().len(), 1);
    assert_eq!(narration.history().len(), 1);
    assert!(narration.label_progress("broken").is_none());

    narration
        .select_choice(1, &props())
        .await
        .expect("second pick should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("ok"));
    assert_eq!(
        narration.history().last().expect("entry").choice_index_made,
        Some(1)
    );
    assert_eq!(narration.choices_made().len(), 1);
}

#[tokio::test]
async fn go_next_choice_is_not_consumed_when_the_next_step_fails() {
    let mut narration = narration_with(vec![label(
        "start",
        vec![menu(vec![ChoiceOption::close("Onward")]), boom()],
    )]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let error = narration
        .go_next(&props(), Some(0))
        .await
        .expect_err("failing step should surface");
    assert_eq!(error.code, STEP_FAILED);
    assert_eq!(narration.current_step_index(), Some(0));
    assert_eq!(narration.choice_menu_options().len(), 1);
    assert!(narration.choices_made().is_empty());
    assert_eq!(narration.step_counter(), 1);
}

#[tokio::test]
async fn input_request_blocks_until_a_value_is_supplied() {
    let ask = step_fn("ask:name", |ctx, _props| {
        ctx.request_input(InputRequest {
            kind: Some("string".to_string()),
            default_value: None,
        });
        Ok(StepOutcome::Continue)
    });
    let greet = step_fn("greet", |ctx, _props| {
        let name = ctx
            .input_value()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_default();
        ctx.set_dialogue(Some(Dialogue::new(format!("Hello {}", name))));
        Ok(StepOutcome::Continue)
    });
    let mut narration = narration_with(vec![label("start", vec![ask, greet])]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!(narration.state(), NarrationState::AwaitingInput);
    narration
        .go_next(&props(), None)
        .await
        .expect("blocked go_next is not an error");
    assert_eq!(narration.current_step_index(), Some(0));

    narration.set_input_value(json!("Ann"));
    narration
        .go_next(&props(), None)
        .await
        .expect("go_next should pass");
    assert_eq!(dialogue_text(&narration).as_deref(), Some("Hello Ann"));
    assert_eq!(
        narration.history().last().expect("entry").input_value,
        Some(json!("Ann"))
    );
}

#[tokio::test]
async fn step_error_is_reported_and_the_stack_stays_put() {
    let failing = step_fn("boom", |_ctx, _props| {
        Err(NarrationError::new("TEST_BOOM", "the step blew up"))
    });
    let reported = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reported);
    let mut narration = Narration::new(
        NarrationOptions {
            labels: vec![label("start", vec![say("a"), failing])]
                .into_iter()
                .collect(),
            ..NarrationOptions::default()
        }
        .with_step_error(move |error, _props| sink.borrow_mut().push(error.code.clone())),
    );
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let error = narration
        .go_next(&props(), None)
        .await
        .expect_err("failing step should surface");
    assert_eq!(error.code, STEP_FAILED);
    assert!(error.message.contains("TEST_BOOM"));
    assert_eq!(narration.current_step_index(), Some(1));
    assert_eq!(narration.history().len(), 1);
    assert_eq!(*reported.borrow(), vec![STEP_FAILED.to_string()]);
}

#[tokio::test]
async fn label_hooks_fire_around_steps() {
    let starts = Rc::new(Cell::new(0));
    let loads = Rc::new(Cell::new(0));
    let ends = Rc::new(Cell::new(0));
    let (s, l, e) = (Rc::clone(&starts), Rc::clone(&loads), Rc::clone(&ends));
    let hooked = Label::new("start", vec![say("a"), say("b")])
        .on_step_start(move |_ctx, _index| s.set(s.get() + 1))
        .on_load_step(move |_ctx, _index| l.set(l.get() + 1))
        .on_step_end(move |_ctx, _index| e.set(e.get() + 1));
    let mut narration = narration_with(vec![hooked]);

    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    assert_eq!((starts.get(), loads.get(), ends.get()), (1, 1, 0));
    narration
        .go_next(&props(), None)
        .await
        .expect("go_next should pass");
    assert_eq!((starts.get(), loads.get(), ends.get()), (2, 1, 1));
}

#[tokio::test]
async fn go_next_without_open_label_is_a_no_op() {
    let mut narration = narration_with(vec![label("start", vec![say("a")])]);
    let result = narration
        .go_next(&props(), None)
        .await
        .expect("go_next on idle narration is not an error");
    assert!(result.is_none());
    assert_eq!(narration.state(), NarrationState::Idle);
}

#[tokio::test]
async fn debug_output_summarises_the_narration() {
    let mut narration = narration_with(vec![label("start", vec![say("a"), say("b")])]);
    narration
        .call_label("start", &props())
        .await
        .expect("call should pass");
    let rendered = format!("{:?}", narration);
    assert!(rendered.starts_with("Narration {"));
    assert!(rendered.contains("labels: 1"));
    assert!(rendered.contains("history: 1"));
    assert!(rendered.contains("state: Running"));

    let failed: Result<Narration, NarrationError> = Err(NarrationError::new("X", "x"));
    assert_eq!(failed.expect_err("err should unwrap").code, "X");
}
