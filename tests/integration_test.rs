use chrono::{Duration, Utc};
use goal_match_engine::ranking::{Ranker, WeightedRanker};
use goal_match_engine::store::{CardFilter, CardStore, PageRequest, SqliteCardStore};
use goal_match_engine::{
    ContactMethod, GoalCard, GoalType, MatchEngine, MatchEngineError, MatchOptions, NewGoalCard,
    SkillLevel, Vibe,
};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn card(handle: &str, skill: SkillLevel, vibe: Vibe, tags: &[&str]) -> NewGoalCard {
    NewGoalCard {
        goal_type: GoalType::Build,
        skill_level: skill,
        vibe,
        tech_tags: tags.iter().map(|t| t.to_string()).collect(),
        description: format!("{} is looking for a partner", handle),
        contact_method: ContactMethod::Discord,
        contact_handle: handle.to_string(),
        email: None,
        timezone: None,
        availability: None,
    }
}

#[tokio::test]
async fn test_reference_match_is_returned() {
    let engine = MatchEngine::new(":memory:").await.unwrap();

    engine
        .submit_card("u1", card("crab", SkillLevel::Beginner, Vibe::Focused, &["rust"]))
        .await
        .unwrap();

    let submitted = engine
        .submit_card("u2", card("ferris", SkillLevel::Intermediate, Vibe::Focused, &["rust", "api"]))
        .await
        .unwrap();

    let matches = &submitted.matches.matches;
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].card.contact_handle, "crab");
    assert_eq!(matches[0].match_score, 34);
    assert_eq!(submitted.matches.ranking_method, "weighted");
}

#[test]
fn test_weak_overlap_is_excluded() {
    let ranker = WeightedRanker::default();

    let mut new_card = card("ferris", SkillLevel::Intermediate, Vibe::Focused, &["rust"]);
    new_card.goal_type = GoalType::Learn;
    new_card.timezone = Some("GMT+1".to_string());

    // Only the shared tag scores: unknown skill, other vibe and goal, no timezone
    let candidate = GoalCard::from_new(
        Uuid::new_v4(),
        "u1",
        Utc::now(),
        card("crab", SkillLevel::Unknown, Vibe::Casual, &["rust", "go"]),
    );

    assert_eq!(goal_match_engine::ranking::score(&new_card, &candidate), 10);
    assert!(ranker.rank(&new_card, &[candidate]).is_empty());
}

#[tokio::test]
async fn test_matches_are_capped_and_sorted() {
    let engine = MatchEngine::new(":memory:").await.unwrap();

    let pool = [
        ("a", SkillLevel::Intermediate, vec!["rust"]),
        ("b", SkillLevel::Intermediate, vec!["rust", "api"]),
        ("c", SkillLevel::Beginner, vec!["rust"]),
        ("d", SkillLevel::Advanced, vec!["api"]),
        ("e", SkillLevel::Intermediate, vec!["go"]),
        ("f", SkillLevel::Beginner, vec!["rust", "api", "sql"]),
        ("g", SkillLevel::Advanced, vec!["python"]),
    ];
    for (i, (handle, skill, tags)) in pool.iter().enumerate() {
        engine
            .submit_card(&format!("user-{i}"), card(handle, *skill, Vibe::Focused, tags))
            .await
            .unwrap();
    }

    let response = engine
        .find_matches(&card("me", SkillLevel::Intermediate, Vibe::Focused, &["rust", "api"]))
        .await;

    assert_eq!(response.candidate_pool_size, 7);
    assert_eq!(response.matches.len(), 5);

    let scores: Vec<u32> = response.matches.iter().map(|m| m.match_score).collect();
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(scores, sorted);

    // b: 15 + 10 + 5 + 20 + 5 + 1
    assert_eq!(response.matches[0].card.contact_handle, "b");
    assert_eq!(response.best_score(), Some(56));
    assert!(response.matches.iter().all(|m| m.match_score > 12));
}

#[tokio::test]
async fn test_own_card_is_not_a_match() {
    let engine = MatchEngine::new(":memory:").await.unwrap();
    let mine = card("ferris", SkillLevel::Intermediate, Vibe::Focused, &["rust"]);

    let submitted = engine.submit_card("u1", mine.clone()).await.unwrap();
    assert_eq!(submitted.matches.candidate_pool_size, 1);
    assert!(submitted.matches.is_empty());

    // Same card posted again by someone else is still treated as a duplicate
    let again = engine.submit_card("u2", mine).await.unwrap();
    assert!(again.matches.is_empty());
}

#[tokio::test]
async fn test_custom_options() {
    let store = Arc::new(SqliteCardStore::new(":memory:").await.unwrap());
    let options = MatchOptions {
        min_score: 40,
        max_results: 1,
        ..MatchOptions::default()
    };
    let engine = MatchEngine::with_store(store.clone(), options);

    store
        .insert("u1", &card("crab", SkillLevel::Beginner, Vibe::Focused, &["rust"]), Utc::now())
        .await
        .unwrap();
    store
        .insert("u2", &card("twin", SkillLevel::Intermediate, Vibe::Focused, &["rust"]), Utc::now())
        .await
        .unwrap();

    let response = engine
        .find_matches(&card("me", SkillLevel::Intermediate, Vibe::Focused, &["rust"]))
        .await;

    // twin: 15 + 10 + 5 + 10 + 5 + 1 = 46, crab: 8 + 10 + 5 + 10 + 5 + 1 = 39
    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].card.contact_handle, "twin");
}

#[tokio::test]
async fn test_relist_returns_card_to_pool() {
    let engine = MatchEngine::new(":memory:").await.unwrap();
    let now = Utc::now();

    let old = engine
        .submit_card_at(
            "owner",
            card("crab", SkillLevel::Intermediate, Vibe::Focused, &["rust"]),
            now - Duration::days(30),
        )
        .await
        .unwrap()
        .card;

    let probe = card("ferris", SkillLevel::Intermediate, Vibe::Focused, &["rust", "cli"]);
    assert!(engine.find_matches_at(&probe, now).await.is_empty());

    let token = assert_ok!(engine.issue_relist_token(old.id, "owner").await);
    assert_ok!(engine.relist_at(&token.token, now).await);

    let response = engine.find_matches_at(&probe, now).await;
    assert_eq!(response.matches.len(), 1);
    assert_eq!(response.matches[0].card.id, old.id);

    let reused = assert_err!(engine.relist_at(&token.token, now).await);
    assert!(matches!(reused, MatchEngineError::InvalidRelistToken));
}

#[tokio::test]
async fn test_listing_and_stats() {
    let engine = MatchEngine::new(":memory:").await.unwrap();

    for i in 0..3 {
        engine
            .submit_card("u1", card(&format!("h{i}"), SkillLevel::Beginner, Vibe::Casual, &["rust"]))
            .await
            .unwrap();
    }
    engine
        .submit_card("u2", card("py", SkillLevel::Advanced, Vibe::Intense, &["python"]))
        .await
        .unwrap();

    let filter = CardFilter {
        tech_tag: Some("rust".to_string()),
        ..Default::default()
    };
    let page = engine.list_cards(&filter, &PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.has_next());

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_cards, 4);
    assert_eq!(stats.active_cards, 4);
    assert_eq!(stats.relist_tokens, 0);
}

#[tokio::test]
async fn test_invalid_cards_are_rejected() {
    let engine = MatchEngine::new(":memory:").await.unwrap();

    let mut too_long = card("crab", SkillLevel::Beginner, Vibe::Casual, &["rust"]);
    too_long.description = "x".repeat(151);
    let err = assert_err!(engine.submit_card("u1", too_long).await);
    assert!(matches!(err, MatchEngineError::Validation(_)));

    let too_many = card("crab", SkillLevel::Beginner, Vibe::Casual, &["a", "b", "c", "d", "e", "f"]);
    assert_err!(engine.submit_card("u1", too_many).await);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_cards, 0);
}
