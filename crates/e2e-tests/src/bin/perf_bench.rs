use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use e2e_tests::{create_conversation, BASE_TS};
use flow_analysis::{
    analyze_circularity, coherence_score, depth_score, progression_score,
    ConversationFlowAnalyzer, TopicExtractor, TransitionBuilder,
};
use flow_types::{Message, MessageRole};

const SMALL_MESSAGE_COUNT: usize = 60;
const MEDIUM_MESSAGE_COUNT: usize = 600;
const DEFAULT_ITERATIONS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "Conversation flow analysis benchmark harness")]
struct Args {
    #[arg(long, value_enum, default_value = "small")]
    tier: DatasetTier,
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
    #[arg(long, default_value = "crates/e2e-tests/benchmarks")]
    out_dir: PathBuf,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum DatasetTier {
    Small,
    Medium,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StepMetrics {
    p50_ms: f64,
    p90_ms: f64,
    p99_ms: f64,
    samples: usize,
    p50_messages_per_sec: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BenchmarkOutput {
    tier: DatasetTier,
    iterations: usize,
    messages: usize,
    generated_at: String,
    steps: BTreeMap<String, StepMetrics>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    fs::create_dir_all(&args.out_dir).map_err(|e| format!("Failed to create out dir: {e}"))?;

    let analyzer = ConversationFlowAnalyzer::default();
    let extractor = TopicExtractor::default();
    let builder = TransitionBuilder::default();
    let mut durations: HashMap<String, Vec<f64>> = HashMap::new();
    let mut message_count = 0;

    for iteration in 0..args.iterations {
        let messages = synthetic_messages(args.tier, iteration);
        message_count = messages.len();
        let conversation = create_conversation(&format!("perf-{}", tier_label(args.tier)));

        let start = Instant::now();
        let topics = extractor.extract_topics(&messages);
        record(&mut durations, "extract_topics", start);

        let start = Instant::now();
        let transitions = builder.build_transitions(&topics);
        record(&mut durations, "build_transitions", start);

        let start = Instant::now();
        let _ = analyze_circularity(&topics, &transitions);
        record(&mut durations, "circularity", start);

        let start = Instant::now();
        let _ = depth_score(&messages, &topics);
        let _ = coherence_score(&topics, &transitions);
        let _ = progression_score(&topics, &transitions);
        record(&mut durations, "scoring", start);

        let start = Instant::now();
        analyzer
            .analyze_flow(&conversation, &messages)
            .await
            .map_err(|e| format!("Analysis failed: {e}"))?;
        record(&mut durations, "analyze_flow", start);
    }

    let output = BenchmarkOutput {
        tier: args.tier,
        iterations: args.iterations,
        messages: message_count,
        generated_at: Utc::now().to_rfc3339(),
        steps: build_metrics(&durations, message_count),
    };

    let json = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    let table = render_table(&output);
    write_outputs(&args.out_dir, &json, &table)?;
    println!("{table}");
    Ok(())
}

fn record(durations: &mut HashMap<String, Vec<f64>>, step: &str, start: Instant) {
    durations
        .entry(step.to_string())
        .or_default()
        .push(start.elapsed().as_secs_f64() * 1000.0);
}

fn synthetic_messages(tier: DatasetTier, iteration: usize) -> Vec<Message> {
    let count = match tier {
        DatasetTier::Small => SMALL_MESSAGE_COUNT,
        DatasetTier::Medium => MEDIUM_MESSAGE_COUNT,
    };
    let mut rng = StdRng::seed_from_u64(1337 + iteration as u64);

    let subjects = [
        "rust ownership rules",
        "async runtime scheduling",
        "strongly connected components",
        "topic transition graphs",
        "sqlite write ahead logging",
        "serde derive attributes",
    ];
    let openers = ["What is", "How does", "Why do", "When should"];

    let mut ts_ms = BASE_TS;
    (0..count)
        .map(|i| {
            ts_ms += rng.random_range(1_000..90_000_i64);
            let timestamp: DateTime<Utc> = Utc.timestamp_millis_opt(ts_ms).unwrap();
            let subject = subjects[rng.random_range(0..subjects.len())];
            let (role, text) = if i % 2 == 0 {
                let opener = openers[rng.random_range(0..openers.len())];
                (MessageRole::User, format!("{opener} {subject} work?"))
            } else {
                let detail = rng.random_range(1..1000);
                (
                    MessageRole::Assistant,
                    format!("Consider {subject} with detail {detail} and measure again."),
                )
            };
            let ulid = ulid::Ulid::from_parts(ts_ms as u64, rng.random());
            Message::new("perf", role, text, timestamp).with_id(ulid.to_string())
        })
        .collect()
}

fn build_metrics(
    durations: &HashMap<String, Vec<f64>>,
    message_count: usize,
) -> BTreeMap<String, StepMetrics> {
    let mut steps = BTreeMap::new();
    for (step, samples) in durations {
        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let p50 = percentile(&sorted, 50.0);
        steps.insert(
            step.clone(),
            StepMetrics {
                p50_ms: p50,
                p90_ms: percentile(&sorted, 90.0),
                p99_ms: percentile(&sorted, 99.0),
                samples: samples.len(),
                p50_messages_per_sec: messages_per_second(message_count, p50),
            },
        );
    }
    steps
}

fn messages_per_second(count: usize, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 0.0;
    }
    count as f64 / (duration_ms / 1000.0)
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

fn render_table(output: &BenchmarkOutput) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "Benchmark Results (tier={}, iterations={}, messages={})",
        tier_label(output.tier),
        output.iterations,
        output.messages
    ));
    lines.push("step\tp50_ms\tp90_ms\tp99_ms\tmsgs_per_sec".to_string());

    for (step, metrics) in &output.steps {
        lines.push(format!(
            "{}\t{:.3}\t{:.3}\t{:.3}\t{:.0}",
            step, metrics.p50_ms, metrics.p90_ms, metrics.p99_ms, metrics.p50_messages_per_sec
        ));
    }
    lines.join("\n")
}

fn write_outputs(out_dir: &Path, json: &str, table: &str) -> Result<(), String> {
    fs::write(out_dir.join("latest.json"), json).map_err(|e| e.to_string())?;
    fs::write(out_dir.join("latest.txt"), table).map_err(|e| e.to_string())?;
    Ok(())
}

fn tier_label(tier: DatasetTier) -> &'static str {
    match tier {
        DatasetTier::Small => "small",
        DatasetTier::Medium => "medium",
    }
}
