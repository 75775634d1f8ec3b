use criterion::{black_box, criterion_group, criterion_main, Criterion};
use chrono::Utc;
use goal_match_engine::{
    ranking::{Ranker, WeightedRanker},
    ContactMethod, GoalCard, GoalType, NewGoalCard, SkillLevel, Vibe,
};
use uuid::Uuid;

const SKILLS: [SkillLevel; 3] = [SkillLevel::Beginner, SkillLevel::Intermediate, SkillLevel::Advanced];
const VIBES: [Vibe; 3] = [Vibe::Casual, Vibe::Focused, Vibe::Intense];
const TAGS: [&str; 6] = ["rust", "api", "react", "python", "sql", "wasm"];

fn new_card() -> NewGoalCard {
    NewGoalCard {
        goal_type: GoalType::Build,
        skill_level: SkillLevel::Intermediate,
        vibe: Vibe::Focused,
        tech_tags: vec!["rust".to_string(), "api".to_string()],
        description: "Benchmark card".to_string(),
        contact_method: ContactMethod::Discord,
        contact_handle: "bench".to_string(),
        email: None,
        timezone: Some("GMT+1".to_string()),
        availability: Some(vec!["MON_EVENING".to_string(), "SAT_MORNING".to_string()]),
    }
}

fn create_test_candidates(count: usize) -> Vec<GoalCard> {
    (0..count)
        .map(|i| {
            let card = NewGoalCard {
                goal_type: GoalType::Build,
                skill_level: SKILLS[i % 3],
                vibe: VIBES[i % 3],
                tech_tags: vec![TAGS[i % 6].to_string(), TAGS[(i + 1) % 6].to_string()],
                description: format!("Candidate {}", i),
                contact_method: ContactMethod::Telegram,
                contact_handle: format!("user{}", i),
                email: None,
                timezone: Some(format!("UTC{:+}", (i % 12) as i32 - 6)),
                availability: Some(vec!["MON_EVENING".to_string()]),
            };
            GoalCard::from_new(Uuid::new_v4(), format!("owner{}", i), Utc::now(), card)
        })
        .collect()
}

fn bench_weighted_ranking(c: &mut Criterion) {
    let ranker = WeightedRanker::default();
    let card = new_card();

    let candidates_10 = create_test_candidates(10);
    let candidates_50 = create_test_candidates(50);
    let candidates_100 = create_test_candidates(100);

    c.bench_function("weighted_rank_10", |b| {
        b.iter(|| black_box(ranker.rank(&card, &candidates_10)));
    });

    c.bench_function("weighted_rank_50", |b| {
        b.iter(|| black_box(ranker.rank(&card, &candidates_50)));
    });

    c.bench_function("weighted_rank_100", |b| {
        b.iter(|| black_box(ranker.rank(&card, &candidates_100)));
    });
}

fn bench_timezone_parsing(c: &mut Criterion) {
    c.bench_function("parse_timezone_offset", |b| {
        b.iter(|| {
            black_box(goal_match_engine::ranking::parse_timezone_offset(Some(black_box(
                "Europe/Berlin (GMT+01:00)",
            ))))
        });
    });
}

criterion_group!(benches, bench_weighted_ranking, bench_timezone_parsing);
criterion_main!(benches);
