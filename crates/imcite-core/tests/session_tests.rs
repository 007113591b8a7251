//! End-to-end session tests over fake providers

mod common;

use common::{s2_paper, with_author, work, FakePrimary, FakeSecondary};
use imcite_core::{EngineConfig, GraphSession, SessionPhase};
use imcite_domain::{IdNamespace, RelationshipTag, RelationshipType};

/// Master W0 cited by W1..W10. Four citing papers share reference WX, two
/// share WY, three share related work WR. The secondary provider adds one
/// duplicate citation (same DOI as W1), one citation of its own, and one
/// reference.
fn scenario() -> (FakePrimary, FakeSecondary) {
    let mut primary = FakePrimary::default();
    let mut secondary = FakeSecondary::default();

    let master = with_author(
        work("W0", Some("10.1/master"), "Master Paper"),
        "A0",
        "Grace Hopper",
    );
    primary.add_work(master);

    for n in 1..=10 {
        let mut citing = with_author(
            work(&format!("W{}", n), Some(&format!("10.1/c{}", n)), &format!("Citing {}", n)),
            &format!("A{}", n),
            "John Smith",
        );
        citing.referenced_works.push("W0".to_string());
        if n <= 4 {
            citing.referenced_works.push("WX".to_string());
        }
        if n <= 2 {
            citing.referenced_works.push("WY".to_string());
        }
        if n <= 3 {
            citing.related_works.push("WR".to_string());
        }
        // The provider knows the citing works directly too; the
        // reconciliation batch resolves them by DOI
        primary.add_work(citing.clone());
        primary.add_citing("W0", citing);
    }

    primary.add_work(work("WX", Some("10.1/shared"), "Shared Reference"));
    primary.add_work(work("WY", None, "Rare Reference"));
    primary.add_work(work("WR", None, "Related Work"));

    secondary.add_links(
        "10.1/master",
        vec![
            s2_paper("s2c1", Some("10.1/c1"), "Citing 1", &["J. Smith"]),
            s2_paper("s2new", Some("10.1/new"), "Secondary Only Citation", &["M. Rivera"]),
        ],
        vec![s2_paper("s2ref", None, "Secondary Reference", &[])],
    );

    // Known to the primary provider under a different native id; used by
    // reconciliation (via DOI) and stub hydration
    primary.add_work(with_author(
        work("W99", Some("10.1/new"), "Secondary Only Citation"),
        "A77",
        "Maria Rivera",
    ));

    (primary, secondary)
}

#[tokio::test]
async fn test_load_reaches_active_with_first_degree_graph() {
    common::init_tracing();
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());

    session.load("W0").await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Active);

    let state = session.state();
    let master_uid = state.index.find(IdNamespace::OpenAlex, "W0").unwrap().clone();
    assert_eq!(state.master_paper.as_ref(), Some(&master_uid));
    assert!(!state.papers[&master_uid].is_stub);

    // Ten first-degree papers, each tagged and linked to the master
    let first_degree: Vec<_> = state
        .papers
        .values()
        .filter(|p| p.relationship_tags.contains(&RelationshipTag::FirstDegree))
        .collect();
    assert_eq!(first_degree.len(), 11); // W1..W10 plus the secondary-only citation

    let cites_master = state
        .relationships
        .values()
        .filter(|r| {
            r.relationship_type == RelationshipType::Cites
                && r.target_short_uid == master_uid
        })
        .count();
    assert_eq!(cites_master, 11);
}

#[tokio::test]
async fn test_shared_references_promote_at_threshold() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();

    let state = session.state();

    // WX shared by 4 citing papers: promoted as a tagged stub
    let wx_uid = state
        .index
        .find(IdNamespace::OpenAlex, "WX")
        .expect("WX should be promoted")
        .clone();
    let wx = &state.papers[&wx_uid];
    assert!(wx.is_stub);
    assert!(wx
        .relationship_tags
        .contains(&RelationshipTag::ReferencedByFirstDegree));

    // WR related for 3 citing papers: promoted with the similar tag
    let wr_uid = state
        .index
        .find(IdNamespace::OpenAlex, "WR")
        .expect("WR should be promoted")
        .clone();
    assert!(state.papers[&wr_uid]
        .relationship_tags
        .contains(&RelationshipTag::Similar));

    // WY shared by only 2: discarded
    assert!(state.index.find(IdNamespace::OpenAlex, "WY").is_none());

    // Both stubs hang off the master via similar edges
    let master_uid = state.index.find(IdNamespace::OpenAlex, "W0").unwrap();
    let similar_from_master = state
        .relationships
        .values()
        .filter(|r| {
            r.relationship_type == RelationshipType::Similar
                && r.source_short_uid == *master_uid
        })
        .count();
    assert_eq!(similar_from_master, 2);
}

#[tokio::test]
async fn test_cross_provider_deduplicates_by_doi() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();

    let state = session.state();
    let master_uid = state.index.find(IdNamespace::OpenAlex, "W0").unwrap().clone();

    // The duplicate citation resolved onto W1 instead of minting a paper
    let w1_uid = state.index.find(IdNamespace::OpenAlex, "W1").unwrap();
    assert_eq!(state.index.find(IdNamespace::SemanticScholar, "s2c1"), Some(w1_uid));

    // The duplicate edge was a silent no-op: one cites edge from W1
    let w1_edges = state
        .relationships
        .values()
        .filter(|r| r.source_short_uid == *w1_uid && r.target_short_uid == master_uid)
        .count();
    assert_eq!(w1_edges, 1);

    // The secondary-only reference is a stub with a master -> reference edge
    let ref_uid = state
        .index
        .find(IdNamespace::SemanticScholar, "s2ref")
        .expect("secondary reference should exist")
        .clone();
    assert!(state.papers[&ref_uid].is_stub);
    assert!(state
        .relationships
        .values()
        .any(|r| r.source_short_uid == master_uid
            && r.target_short_uid == ref_uid
            && r.relationship_type == RelationshipType::Cites));
}

#[tokio::test]
async fn test_reconciliation_merges_stub_authors() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();

    let state = session.state();

    // "J. Smith" from the secondary provider merged into the canonical
    // John Smith already known under a primary author id
    assert!(!state.authors.values().any(|a| a.clean_name == "J. Smith"));

    // "M. Rivera" matched A77 via the reconciliation batch: the stub won
    // the identity, absorbed the canonical name, and left stub status
    let a77_uid = state
        .index
        .find(IdNamespace::OpenAlexAuthor, "A77")
        .expect("A77 should be indexed")
        .clone();
    let rivera = &state.authors[&a77_uid];
    assert_eq!(rivera.clean_name, "Maria Rivera");
    assert!(!rivera.is_stub);

    // At most one surviving author per primary author id
    for n in 0..=10 {
        let id = format!("A{}", n);
        if let Some(uid) = state.index.find(IdNamespace::OpenAlexAuthor, &id) {
            assert!(state.authors.contains_key(uid), "dangling index entry for {}", id);
        }
    }
}

#[tokio::test]
async fn test_extend_adds_confirmed_second_degree_edges() {
    let (mut primary, secondary) = scenario();

    let mut w20 = work("W20", Some("10.1/d20"), "Second Degree");
    w20.referenced_works.push("W1".to_string());
    primary.add_citing("W1", w20);

    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    session.extend().await.unwrap();
    assert_eq!(session.phase(), SessionPhase::Active);

    let state = session.state();
    let w20_uid = state.index.find(IdNamespace::OpenAlex, "W20").unwrap().clone();
    let w1_uid = state.index.find(IdNamespace::OpenAlex, "W1").unwrap().clone();

    let w20_paper = &state.papers[&w20_uid];
    assert!(!w20_paper.is_stub);
    assert!(w20_paper
        .relationship_tags
        .contains(&RelationshipTag::SecondDegree));

    assert!(state
        .relationships
        .values()
        .any(|r| r.source_short_uid == w20_uid
            && r.target_short_uid == w1_uid
            && r.relationship_type == RelationshipType::Cites));
}

#[tokio::test]
async fn test_extend_hydrates_remaining_stubs() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    session.extend().await.unwrap();

    let state = session.state();

    // Promoted stubs hydrate by native id
    let wx_uid = state.index.find(IdNamespace::OpenAlex, "WX").unwrap();
    assert!(!state.papers[wx_uid].is_stub);

    // The secondary-only citation hydrates via the DOI batch and picks up
    // its primary-provider id on the way
    let new_uid = state
        .index
        .find(IdNamespace::SemanticScholar, "s2new")
        .unwrap();
    assert!(!state.papers[new_uid].is_stub);
    assert_eq!(state.index.find(IdNamespace::OpenAlex, "W99"), Some(new_uid));

    // The reference with no resolvable identifier stays a stub
    let ref_uid = state.index.find(IdNamespace::SemanticScholar, "s2ref").unwrap();
    assert!(state.papers[ref_uid].is_stub);
}

#[tokio::test]
async fn test_extend_requires_active_session() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());

    let err = session.extend().await.unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(session.phase(), SessionPhase::Idle);
}

#[tokio::test]
async fn test_fatal_first_degree_failure_enters_error_state() {
    let mut primary = FakePrimary::default();
    primary.add_work(work("W0", Some("10.1/master"), "Master Paper"));
    primary.fail_citing = true;

    let (mut session, messages) =
        GraphSession::new(primary, FakeSecondary::default(), EngineConfig::default());

    let err = session.load("W0").await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.phase(), SessionPhase::Error);

    // The master paper ingested before the failure is retained
    assert_eq!(session.state().papers.len(), 1);

    session.shutdown().await;
    let mut rx = messages;
    let mut fatal_message = None;
    while let Some(message) = rx.recv().await {
        if let imcite_core::StreamMessage::FatalError { message } = message {
            fatal_message = Some(message);
        }
    }
    let fatal_message = fatal_message.expect("a fatal error message must be streamed");
    assert!(!fatal_message.is_empty());
}

#[tokio::test]
async fn test_master_not_found_is_fatal() {
    let (mut session, _messages) = GraphSession::new(
        FakePrimary::default(),
        FakeSecondary::default(),
        EngineConfig::default(),
    );

    let err = session.load("W404").await.unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(session.phase(), SessionPhase::Error);
}

#[tokio::test]
async fn test_search_master_returns_candidates() {
    let (primary, secondary) = scenario();
    let (session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());

    let results = session.search_master("master").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].openalex_id.as_deref(), Some("W0"));
}

#[tokio::test]
async fn test_reset_discards_state() {
    let (primary, secondary) = scenario();
    let (mut session, _messages) = GraphSession::new(primary, secondary, EngineConfig::default());
    session.load("W0").await.unwrap();
    assert!(!session.state().papers.is_empty());

    session.reset();
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.state().papers.is_empty());
    assert_eq!(session.state().counts().external_ids, 0);
}
