mod stub;

use predicates::prelude::*;
use stub::{OpenAiStub, StubArticle, WikiStub, modules_output, quiz_output, stub_env};

fn journeygen(wiki: &WikiStub, openai: &OpenAiStub) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("journeygen");
    cmd.env_remove("RUST_LOG").env_remove("JOURNEYGEN_LOG_FORMAT");
    for (key, value) in stub_env(wiki, openai) {
        cmd.env(key, value);
    }
    cmd
}

#[test]
fn generate_prints_curriculum_json() -> anyhow::Result<()> {
    let wiki = WikiStub::spawn(vec![StubArticle::new(
        "Photosynthesis",
        "Photosynthesis converts light energy into chemical energy.",
    )]);
    let openai = OpenAiStub::spawn(vec![modules_output("Light", 1, 3), modules_output("Light", 4, 1)]);

    let output = journeygen(&wiki, &openai)
        .args([
            "generate",
            "--reference",
            "https://en.wikipedia.org/wiki/Photosynthesis",
            "--count",
            "4",
            "--title",
            "Plants and Light",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let body: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(body["curriculum"]["title"], "Plants and Light");
    assert_eq!(body["actualCount"], 4);
    assert_eq!(body["termination"], "complete");
    assert_eq!(openai.prompts().len(), 2);
    Ok(())
}

#[test]
fn generate_writes_out_file_and_respects_force() -> anyhow::Result<()> {
    let wiki = WikiStub::spawn(vec![StubArticle::new("Tide", "Tides rise and fall.")]);
    let openai = OpenAiStub::spawn(vec![
        modules_output("Tide", 1, 2),
        modules_output("Tide", 1, 2),
    ]);
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("journey.json");
    let out_arg = out.to_string_lossy().into_owned();
    let args = [
        "generate",
        "--reference",
        "https://en.wikipedia.org/wiki/Tide",
        "--count",
        "2",
        "--out",
        out_arg.as_str(),
    ];

    journeygen(&wiki, &openai).args(args).assert().success();
    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(written["actualCount"], 2);

    journeygen(&wiki, &openai)
        .args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("output already exists"));

    journeygen(&wiki, &openai)
        .args(args)
        .arg("--force")
        .assert()
        .success();
    Ok(())
}

#[test]
fn generate_rejects_malformed_reference() {
    let wiki = WikiStub::spawn(Vec::new());
    let openai = OpenAiStub::spawn(Vec::new());

    journeygen(&wiki, &openai)
        .args(["generate", "--reference", "https://example.com/Tide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "invalid reference (expected https://<lang>.wikipedia.org/wiki/<Title>): https://example.com/Tide",
        ));
    assert!(openai.prompts().is_empty());
}

#[test]
fn generate_without_modules_fails() {
    let wiki = WikiStub::spawn(vec![StubArticle::new("Tide", "Tides rise and fall.")]);
    let openai = OpenAiStub::spawn(vec!["Nothing to say.".to_owned()]);

    journeygen(&wiki, &openai)
        .args(["generate", "--reference", "https://en.wikipedia.org/wiki/Tide"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to generate modules"));
}

#[test]
fn quiz_prints_questions() -> anyhow::Result<()> {
    let wiki = WikiStub::spawn(Vec::new());
    let openai = OpenAiStub::spawn(vec![quiz_output(5)]);

    let output = journeygen(&wiki, &openai)
        .args(["quiz", "--topic", "Volcanoes"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let body: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(body["questions"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[test]
fn rust_log_debug_emits_parsed_cli_to_stderr() {
    let wiki = WikiStub::spawn(Vec::new());
    let openai = OpenAiStub::spawn(vec![quiz_output(5)]);

    journeygen(&wiki, &openai)
        .env("RUST_LOG", "debug")
        .args(["quiz", "--topic", "Volcanoes"])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
}
