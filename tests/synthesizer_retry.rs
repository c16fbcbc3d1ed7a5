// tests/synthesizer_retry.rs
mod common;

use std::time::Duration;

use common::{item, valid_answer, ScriptedGenerator, DATE};
use feed_thread_relay::ai::Generation;
use feed_thread_relay::config::{AiSettings, ThreadRules};
use feed_thread_relay::synth::{Synthesis, ThreadRequest, ThreadSynthesizer};

fn synthesizer(generator: std::sync::Arc<ScriptedGenerator>) -> ThreadSynthesizer {
    ThreadSynthesizer::new(generator, ThreadRules::default(), &AiSettings::default())
}

#[tokio::test(start_paused = true)]
async fn three_unparsable_answers_exhaust_with_two_delays() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::texts(&["not json", "still {not json", "nope"]);
    let synth = synthesizer(generator.clone());

    let start = tokio::time::Instant::now();
    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;

    assert_eq!(out, Synthesis::Exhausted);
    assert_eq!(generator.calls(), 3);
    // 2s between attempts, none after the last one.
    assert_eq!(start.elapsed(), Duration::from_secs(4));
    let times = generator.call_times.lock().unwrap().clone();
    assert_eq!(times[1] - times[0], Duration::from_secs(2));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn first_good_answer_stops_retrying() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::new(vec![
        Err(anyhow::anyhow!("connection reset")),
        Ok(Generation::text(valid_answer(&it, 3))),
        Ok(Generation::text(valid_answer(&it, 3))),
    ]);
    let synth = synthesizer(generator.clone());

    let start = tokio::time::Instant::now();
    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;

    let Synthesis::Thread(thread) = out else {
        panic!("expected a thread");
    };
    assert_eq!(thread.len(), 3);
    assert_eq!(generator.calls(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn first_segment_without_title_is_rejected_and_retried() {
    let it = item("p1", "Sparse Mixtures");
    let bad = serde_json::json!({
        "twitter_thread": [
            format!("오늘의 AI 논문 ({DATE}): something else\n\n{} (1/2)", it.link),
            "Wrap-up. #AI #ML #논문요약 (2/2)"
        ]
    })
    .to_string();
    let generator = ScriptedGenerator::new(vec![
        Ok(Generation::text(bad)),
        Ok(Generation::text(valid_answer(&it, 2))),
    ]);
    let synth = synthesizer(generator.clone());

    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;

    assert!(matches!(out, Synthesis::Thread(_)));
    assert_eq!(generator.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn contract_violations_alone_exhaust_attempts() {
    let it = item("p1", "Sparse Mixtures");
    let no_link = serde_json::json!({
        "twitter_thread": [format!("오늘의 AI 논문 ({DATE}): Sparse Mixtures #AI #ML #논문요약 (1/1)")]
    })
    .to_string();
    let generator = ScriptedGenerator::texts(&[no_link.as_str(), no_link.as_str(), no_link.as_str()]);
    let synth = synthesizer(generator.clone());

    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;
    assert_eq!(out, Synthesis::Exhausted);
    assert_eq!(generator.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn blocked_and_empty_answers_are_soft_failures() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::new(vec![
        Ok(Generation::blocked("SAFETY")),
        Ok(Generation::text("   ")),
        Ok(Generation::text(format!(
            "Here you go:\n```json\n{}\n```",
            valid_answer(&it, 2)
        ))),
    ]);
    let synth = synthesizer(generator.clone());

    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;
    assert!(matches!(out, Synthesis::Thread(_)));
    assert_eq!(generator.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn object_without_thread_means_nothing_to_say() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::texts(&[r#"{"twitter_thread": []}"#]);
    let synth = synthesizer(generator.clone());

    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;
    assert_eq!(out, Synthesis::NothingToSay);
    assert_eq!(generator.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_is_configurable() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::texts(&[]);
    let synth = synthesizer(generator.clone()).with_retry(5, Duration::from_millis(500));

    let start = tokio::time::Instant::now();
    let out = synth
        .synthesize(&ThreadRequest::new(&it, "abstract", DATE))
        .await;
    assert_eq!(out, Synthesis::Exhausted);
    assert_eq!(generator.calls(), 5);
    assert_eq!(start.elapsed(), Duration::from_millis(2000));
}

#[tokio::test(start_paused = true)]
async fn prompt_carries_item_and_date() {
    let it = item("p1", "Sparse Mixtures");
    let generator = ScriptedGenerator::texts(&[r#"{"twitter_thread": null}"#]);
    let synth = synthesizer(generator.clone());
    synth
        .synthesize(&ThreadRequest::new(&it, "the abstract body", DATE))
        .await;

    let prompts = generator.prompts.lock().unwrap();
    assert!(prompts[0].contains("Sparse Mixtures"));
    assert!(prompts[0].contains(&it.link));
    assert!(prompts[0].contains(DATE));
    assert!(prompts[0].contains("the abstract body"));
}
