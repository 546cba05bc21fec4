use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use betsmart_terminal::api_football::parse_response_json;
use betsmart_terminal::odds::{NormalizeOptions, analyze_odds};

fn sample_odds(fixtures: usize, bookmakers: usize) -> Vec<Value> {
    (0..fixtures)
        .map(|i| {
            let books: Vec<Value> = (0..bookmakers)
                .map(|b| {
                    json!({
                        "name": format!("Book{b}"),
                        "bets": [
                            {"name": "Match Winner", "values": [
                                {"value": "Home", "odd": "1.80"},
                                {"value": "Draw", "odd": "3.40"},
                                {"value": "Away", "odd": "4.20"}
                            ]},
                            {"name": "Goals Over/Under", "values": [
                                {"value": "Over 2.5", "odd": "1.90"},
                                {"value": "Under 2.5", "odd": "1.90"}
                            ]},
                            {"name": "Draw No Bet", "values": [
                                {"value": "Home", "odd": "1.35"},
                                {"value": "Away", "odd": "3.10"}
                            ]}
                        ]
                    })
                })
                .collect();
            json!({
                "league": {"name": "Bench League"},
                "fixture": {"id": i, "timestamp": 1781191800 + (i as i64) * 900},
                "teams": {"home": {"name": format!("Home {i}")}, "away": {"name": format!("Away {i}")}},
                "bookmakers": books
            })
        })
        .collect()
}

fn bench_analyze_odds(c: &mut Criterion) {
    let raw = sample_odds(200, 12);
    let opts = NormalizeOptions::default();
    c.bench_function("analyze_odds_200x12", |b| {
        b.iter(|| {
            let rows = analyze_odds(black_box(&raw), &opts);
            black_box(rows.len());
        })
    });
}

fn bench_parse_response(c: &mut Criterion) {
    let body = json!({"errors": [], "response": sample_odds(200, 12)}).to_string();
    c.bench_function("parse_odds_response", |b| {
        b.iter(|| {
            let out = parse_response_json(black_box(&body));
            black_box(out.len());
        })
    });
}

criterion_group!(benches, bench_analyze_odds, bench_parse_response);
criterion_main!(benches);
