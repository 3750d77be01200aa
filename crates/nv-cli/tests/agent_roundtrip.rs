use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn demo_story() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("demos")
        .join("tavern")
}

fn state_path(name: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("nv-cli-agent-{}-{}.json", name, nanos))
        .to_string_lossy()
        .to_string()
}

fn run_agent(args: &[&str]) -> (bool, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_nv-cli"))
        .arg("agent")
        .args(args)
        .output()
        .expect("agent command should run");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).to_string(),
    )
}

fn step(args: &[&str]) -> String {
    let (ok, stdout) = run_agent(args);
    assert!(ok, "agent {:?} failed:\n{}", args, stdout);
    assert!(stdout.starts_with("RESULT:OK\n"), "unexpected output:\n{}", stdout);
    stdout
}

#[test]
fn agent_walks_the_tavern_to_the_end() {
    let story = demo_story();
    let s1 = state_path("walk-1");
    let s2 = state_path("walk-2");
    let s3 = state_path("walk-3");
    let s4 = state_path("walk-4");
    let s5 = state_path("walk-5");
    let s6 = state_path("walk-6");

    let out = step(&[
        "start",
        "--story",
        story.to_str().expect("path should be utf-8"),
        "--seed",
        "3",
        "--state-out",
        &s1,
    ]);
    assert!(out.contains("EVENT:LINE"));
    assert!(out.contains("SPEAKER_JSON:\"Innkeeper\""));
    assert!(out.contains("TEXT_JSON:\"Welcome to the Crooked Lantern, traveler.\""));
    assert!(out.contains(&format!("STATE_OUT:{}", s1)));

    let out = step(&["next", "--state-in", &s1, "--state-out", &s2]);
    assert!(out.contains("TEXT_JSON:\"Rain is coming. Best stay the night.\""));

    let out = step(&["next", "--state-in", &s2, "--state-out", &s3]);
    assert!(out.contains("EVENT:CHOICES"));
    assert!(out.contains("TEXT_JSON:\"What will you do?\""));
    assert!(out.contains("CHOICE:0|\"Order a drink\""));
    assert!(out.contains("CHOICE:2|\"Head upstairs\""));

    let out = step(&["choose", "--state-in", &s3, "--choice", "2", "--state-out", &s4]);
    assert!(out.contains("EVENT:INPUT"));
    assert!(out.contains("INPUT_DEFAULT_JSON:\"Traveler\""));

    let out = step(&["input", "--state-in", &s4, "--text", "Ada", "--state-out", &s5]);
    assert!(out.contains("EVENT:LINE"));
    assert!(out.contains("TEXT_JSON:\"Sleep well, Ada.\""));

    let out = step(&["next", "--state-in", &s5, "--state-out", &s6]);
    assert!(out.contains("EVENT:END"));
    assert!(!out.contains("TEXT_JSON:"));
    assert!(out.contains(&format!("STATE_OUT:{}", s6)));
}

#[test]
fn agent_back_returns_to_the_pending_input() {
    let story = demo_story();
    let s1 = state_path("back-1");
    let s2 = state_path("back-2");
    let s3 = state_path("back-3");
    let s4 = state_path("back-4");
    let s5 = state_path("back-5");
    let s6 = state_path("back-6");

    step(&[
        "start",
        "--story",
        story.to_str().expect("path should be utf-8"),
        "--state-out",
        &s1,
    ]);
    step(&["next", "--state-in", &s1, "--state-out", &s2]);
    step(&["next", "--state-in", &s2, "--state-out", &s3]);
    step(&["choose", "--state-in", &s3, "--choice", "2", "--state-out", &s4]);
    step(&["input", "--state-in", &s4, "--text", "Ada", "--state-out", &s5]);

    let out = step(&["back", "--state-in", &s5, "--state-out", &s6]);
    assert!(out.contains("EVENT:INPUT"));
    assert!(out.contains("TEXT_JSON:\"Sign the guest book. What name do you go by?\""));

    let transcript = step(&["transcript", "--state-in", &s5]);
    let entries = transcript
        .lines()
        .filter_map(|line| line.strip_prefix("TRANSCRIPT_JSON:"))
        .map(|json| serde_json::from_str::<serde_json::Value>(json).expect("transcript json"))
        .collect::<Vec<_>>();
    let menu = entries
        .iter()
        .find(|entry| entry.get("choices").is_some())
        .expect("menu should be in the transcript");
    assert_eq!(menu["playerMadeChoice"], serde_json::json!(true));
    assert_eq!(menu["choices"][2]["isResponse"], serde_json::json!(true));
    assert_eq!(
        entries
            .last()
            .and_then(|entry| entry["dialogue"]["text"].as_str()),
        Some("Sleep well, Ada.")
    );
}

#[test]
fn agent_rejects_input_when_none_is_requested() {
    let story = demo_story();
    let s1 = state_path("reject-1");
    let s2 = state_path("reject-2");
    step(&[
        "start",
        "--story",
        story.to_str().expect("path should be utf-8"),
        "--state-out",
        &s1,
    ]);

    let (ok, stdout) = run_agent(&["input", "--state-in", &s1, "--text", "Ada", "--state-out", &s2]);
    assert!(!ok);
    assert!(stdout.contains("RESULT:ERROR"));
    assert!(stdout.contains("ERROR_CODE:CLI_INPUT_UNEXPECTED"));

    let (ok, stdout) = run_agent(&["choose", "--state-in", &s1, "--choice", "0", "--state-out", &s2]);
    assert!(!ok);
    assert!(stdout.contains("ERROR_CODE:NARRATION_CHOICE_INDEX"));
}
