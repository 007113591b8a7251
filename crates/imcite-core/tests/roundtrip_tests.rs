//! Snapshot export and stream-fold round-trips

mod common;

use common::{s2_paper, with_author, work, FakePrimary, FakeSecondary};
use imcite_core::{EngineConfig, GraphMirror, GraphSession, Snapshot};
use imcite_domain::{AuthorRecord, AuthorshipRecord, InstitutionRecord, RelationshipTag};

fn scenario() -> (FakePrimary, FakeSecondary) {
    let mut primary = FakePrimary::default();
    let mut secondary = FakeSecondary::default();

    // Master with an affiliated author, to exercise institution tables
    let mut master = work("W0", Some("10.1/master"), "Master Paper");
    master.keywords = vec!["citations".to_string(), "graphs".to_string()];
    master.authorships.push(AuthorshipRecord {
        author: AuthorRecord {
            openalex_author_id: Some("A0".to_string()),
            orcid: Some("0000-0002-1825-0097".to_string()),
            display_name: "Grace Hopper".to_string(),
            ..Default::default()
        },
        position: 0,
        is_corresponding: true,
        raw_author_name: Some("Hopper, Grace".to_string()),
        institutions: vec![InstitutionRecord {
            openalex_institution_id: Some("I1".to_string()),
            ror_id: Some("02mhbdp94".to_string()),
            display_name: "Example University".to_string(),
            country_code: Some("US".to_string()),
            institution_type: Some("education".to_string()),
        }],
    });
    primary.add_work(master);

    for n in 1..=4 {
        let mut citing = with_author(
            work(&format!("W{}", n), Some(&format!("10.1/c{}", n)), &format!("Citing {}", n)),
            &format!("A{}", n),
            "John Smith",
        );
        citing.referenced_works.push("W0".to_string());
        citing.referenced_works.push("WX".to_string());
        primary.add_citing("W0", citing);
    }
    primary.add_work(work("WX", Some("10.1/shared"), "Shared Reference"));

    secondary.add_links(
        "10.1/master",
        vec![s2_paper("s2new", Some("10.1/new"), "Secondary Citation", &["J. Smith"])],
        vec![],
    );
    primary.add_work(with_author(
        work("W99", Some("10.1/new"), "Secondary Citation"),
        "A9",
        "Jay Smith",
    ));

    (primary, secondary)
}

#[tokio::test]
async fn test_snapshot_counts_match_in_memory_counts() {
    common::init_tracing();
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    session.extend().await.unwrap();

    let counts = session.state().counts();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.counts(), counts);

    // Child tables are consistent with the entities they hang off
    let tag_rows: usize = session
        .state()
        .papers
        .values()
        .map(|p| p.relationship_tags.len())
        .sum();
    assert_eq!(snapshot.relationship_tags.len(), tag_rows);

    let keyword_rows: usize = session
        .state()
        .papers
        .values()
        .map(|p| p.keywords.len())
        .sum();
    assert_eq!(snapshot.keywords.len(), keyword_rows);

    let institution_links: usize = session
        .state()
        .authorships
        .values()
        .map(|a| a.institution_uids.len())
        .sum();
    assert_eq!(snapshot.authorship_institutions.len(), institution_links);
    assert!(institution_links > 0);
}

#[tokio::test]
async fn test_snapshot_survives_serialization() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();

    let snapshot = session.snapshot();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.counts(), snapshot.counts());
    assert_eq!(restored.master_paper, snapshot.master_paper);
}

#[tokio::test]
async fn test_folding_the_stream_rebuilds_the_graph() {
    let (primary, secondary) = scenario();
    let (mut session, messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    session.extend().await.unwrap();

    let counts = session.state().counts();
    session.shutdown().await;

    let mut mirror = GraphMirror::new();
    let mut rx = messages;
    while let Some(message) = rx.recv().await {
        mirror.apply(&message);
    }

    assert_eq!(mirror.counts(), counts);
    assert!(mirror.last_error.is_none());

    // Tags survived the fold
    let master_uid = mirror.external_ids.get("openalex:W0").unwrap();
    let first_degree = mirror
        .papers
        .values()
        .filter(|p| p.relationship_tags.contains(&RelationshipTag::FirstDegree))
        .count();
    assert!(first_degree >= 4);
    assert!(!mirror.papers[master_uid].is_stub);
}

#[tokio::test]
async fn test_fold_handles_reset_mid_stream() {
    let (primary, secondary) = scenario();
    let (mut session, messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    session.reset();
    session.shutdown().await;

    let mut mirror = GraphMirror::new();
    let mut rx = messages;
    while let Some(message) = rx.recv().await {
        mirror.apply(&message);
    }
    // Everything before the reset is discarded
    assert_eq!(mirror.counts().papers, 0);
}
