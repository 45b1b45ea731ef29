//! Integration test: full runs of the Second Punic War fixture through the
//! orchestrator, with mocked model calls and catalogs.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chronicle_common::{Config, GenerationContext, Seed, Stage};
use chronicle_pipeline::testing::{
    second_punic_war, second_punic_war_seed, test_deps, MockEventCatalog, MockSubmitter,
};
use chronicle_pipeline::{MemoryReportSink, Orchestrator, PipelineDeps, PipelineError, RunEvent};

fn scripted() -> (Arc<MockSubmitter>, Arc<MemoryReportSink>, Orchestrator) {
    let submitter = Arc::new(MockSubmitter::from_fixture(&second_punic_war()));
    let sink = Arc::new(MemoryReportSink::new());
    let orchestrator = Orchestrator::new(test_deps(submitter.clone(), sink.clone()));
    (submitter, sink, orchestrator)
}

#[tokio::test]
async fn full_run_reaches_complete_with_every_output() {
    let (submitter, _sink, orchestrator) = scripted();

    let output = orchestrator
        .run(second_punic_war_seed())
        .await
        .expect("fixture run succeeds");

    let ctx = &output.context;
    assert_eq!(ctx.stage, Stage::Complete);
    assert!(ctx.research.is_some());
    assert!(ctx.skeleton.is_some());
    assert!(ctx.narrative.is_some());
    assert!(ctx.enrichment.is_some());
    assert!(ctx.seo.is_some());

    let stages: Vec<Stage> = submitter.prompts().iter().map(|p| p.stage).collect();
    assert_eq!(stages, Stage::PHASES.to_vec());
    assert_eq!(output.report.phases_completed, 6);
    assert_eq!(output.report.model_calls, 6);
}

#[tokio::test]
async fn one_event_per_skeleton_event_in_order() {
    let (_submitter, _sink, orchestrator) = scripted();
    let output = orchestrator.run(second_punic_war_seed()).await.unwrap();

    let events = output.context.events.as_ref().unwrap();
    let slugs: Vec<&str> = events.iter().map(|e| e.slug.as_str()).collect();
    assert_eq!(
        slugs,
        vec![
            "siege-of-saguntum",
            "crossing-of-the-alps",
            "battle-of-cannae",
            "battle-of-the-metaurus",
            "battle-of-zama",
        ]
    );

    // Substring-matched draft keeps the skeleton title.
    assert_eq!(events[0].title, "Siege of Saguntum");
    assert_eq!(events[0].significance, "The casus belli.");

    // No draft for the Metaurus: built from the skeleton alone.
    let metaurus = &events[3];
    assert_eq!(metaurus.summary, "Hasdrubal's relief army is destroyed in Italy.");
    assert!(metaurus.significance.is_empty());
    assert_eq!(output.report.event_fallbacks, 1);

    assert_eq!(events[2].theme_id.as_deref(), Some("hannibals-strategy"));
    assert_eq!(events[4].theme_id.as_deref(), Some("roman-resilience"));
}

#[tokio::test]
async fn links_are_validated_against_run_slugs() {
    let (_submitter, sink, orchestrator) = scripted();
    let output = orchestrator.run(second_punic_war_seed()).await.unwrap();

    let accepted: Vec<&str> = output
        .links
        .accepted
        .iter()
        .map(|l| l.event_slug.as_str())
        .collect();
    assert_eq!(
        accepted,
        vec!["crossing-of-the-alps", "battle-of-cannae", "battle-of-zama"]
    );

    let reasons: Vec<String> = output
        .links
        .rejected
        .iter()
        .map(|r| r.reason.to_string())
        .collect();
    assert_eq!(
        reasons,
        vec![
            "\"Hannibal's Oath\" does not occur verbatim in the paragraph".to_string(),
            "event slug \"battle-of-trasimene\" is not a persisted event".to_string(),
        ]
    );
    assert_eq!(output.report.links_accepted, 3);
    assert_eq!(output.report.links_rejected, 2);

    let rejected_events = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, RunEvent::LinkRejected { .. }))
        .count();
    assert_eq!(rejected_events, 2);
}

#[tokio::test]
async fn persisted_catalog_slugs_take_part_in_link_validation() {
    let submitter = Arc::new(MockSubmitter::from_fixture(&second_punic_war()));
    let deps = PipelineDeps::builder()
        .submitter(submitter)
        .events(Arc::new(
            MockEventCatalog::new()
                .with_event("Battle of Cannae", "cannae-216-bce")
                .with_slug("battle-of-trasimene"),
        ))
        .config(Config::without_delay())
        .build();

    let output = Orchestrator::new(deps)
        .run(second_punic_war_seed())
        .await
        .unwrap();

    let events = output.context.events.as_ref().unwrap();
    assert_eq!(events[2].slug, "cannae-216-bce");

    let accepted: Vec<&str> = output
        .links
        .accepted
        .iter()
        .map(|l| l.event_slug.as_str())
        .collect();
    assert_eq!(
        accepted,
        vec!["crossing-of-the-alps", "battle-of-trasimene", "battle-of-zama"]
    );
    assert!(output
        .links
        .rejected
        .iter()
        .any(|r| r.link.event_slug == "battle-of-cannae"));
}

#[tokio::test]
async fn failing_event_catalog_degrades_to_run_slugs() {
    let submitter = Arc::new(MockSubmitter::from_fixture(&second_punic_war()));
    let sink = Arc::new(MemoryReportSink::new());
    let deps = PipelineDeps::builder()
        .submitter(submitter)
        .events(Arc::new(MockEventCatalog::failing()))
        .sink(sink.clone())
        .config(Config::without_delay())
        .build();

    let output = Orchestrator::new(deps)
        .run(second_punic_war_seed())
        .await
        .expect("catalog failures do not abort the run");

    let events = output.context.events.as_ref().unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events[2].slug, "battle-of-cannae");

    let accepted: Vec<&str> = output
        .links
        .accepted
        .iter()
        .map(|l| l.event_slug.as_str())
        .collect();
    assert_eq!(
        accepted,
        vec!["crossing-of-the-alps", "battle-of-cannae", "battle-of-zama"]
    );
    assert_eq!(output.report.links_rejected, 2);

    // One slug lookup per skeleton event, plus the persisted-slug listing.
    assert_eq!(output.report.lookups_failed, 6);
    let failed: Vec<&'static str> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RunEvent::LookupFailed { what, .. } => Some(what),
            _ => None,
        })
        .collect();
    assert_eq!(failed.last(), Some(&"persisted slugs"));
    assert!(failed[..5].iter().all(|what| *what == "event slug"));
}

#[tokio::test]
async fn narrative_without_skeleton_is_a_precondition_failure() {
    let (submitter, _sink, orchestrator) = scripted();
    let mut ctx = GenerationContext::new(second_punic_war_seed());
    let before = ctx.clone();

    let err = orchestrator
        .run_phase(Stage::Narrative, &mut ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Precondition {
            phase: Stage::Narrative,
            missing: "skeleton"
        }
    ));
    assert_eq!(
        err.to_string(),
        "narrative phase requires skeleton, which is not in the context"
    );
    assert_eq!(ctx, before);
    assert!(submitter.prompts().is_empty());
}

#[tokio::test]
async fn transport_failure_aborts_without_later_phases() {
    let submitter = Arc::new(MockSubmitter::from_fixture(&second_punic_war()).fail_on(Stage::Narrative));
    let sink = Arc::new(MemoryReportSink::new());
    let orchestrator = Orchestrator::new(test_deps(submitter.clone(), sink.clone()));

    let err = orchestrator
        .run(second_punic_war_seed())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Transport {
            phase: Stage::Narrative,
            ..
        }
    ));
    assert_eq!(submitter.calls_for(Stage::Narrative), 1);
    assert_eq!(submitter.calls_for(Stage::Events), 0);
    assert_eq!(submitter.calls_for(Stage::Seo), 0);

    let completed: Vec<Stage> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            RunEvent::PhaseCompleted { stage, .. } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![Stage::Research, Stage::Skeleton]);
}

#[tokio::test]
async fn cancelled_run_stops_before_the_next_phase() {
    let submitter = Arc::new(MockSubmitter::from_fixture(&second_punic_war()));
    let deps = PipelineDeps::builder()
        .submitter(submitter.clone())
        .config(Config::without_delay())
        .cancelled(Arc::new(AtomicBool::new(true)))
        .build();

    let err = Orchestrator::new(deps)
        .run(second_punic_war_seed())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Cancelled {
            phase: Stage::Research
        }
    ));
    assert!(submitter.prompts().is_empty());
}

#[tokio::test]
async fn invalid_seed_never_calls_the_model() {
    let (submitter, _sink, orchestrator) = scripted();

    let err = orchestrator
        .run(Seed::new("Second Punic War", -201, -218))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidSeed(_)));
    assert!(submitter.prompts().is_empty());
}

#[tokio::test]
async fn event_prompts_are_chunked() {
    let submitter = Arc::new(
        MockSubmitter::new()
            .on(Stage::Research, second_response(Stage::Research))
            .on(Stage::Skeleton, second_response(Stage::Skeleton))
            .on(Stage::Narrative, second_response(Stage::Narrative))
            .on(Stage::Events, second_response(Stage::Events))
            .on(Stage::Events, r#"{"events": []}"#)
            .on(Stage::Events, "[]")
            .on(Stage::Enrichment, second_response(Stage::Enrichment))
            .on(Stage::Seo, second_response(Stage::Seo)),
    );
    let config = Config {
        events_chunk_size: 2,
        ..Config::without_delay()
    };
    let deps = PipelineDeps::builder()
        .submitter(submitter.clone())
        .config(config)
        .build();

    let output = Orchestrator::new(deps)
        .run(second_punic_war_seed())
        .await
        .unwrap();

    assert_eq!(submitter.calls_for(Stage::Events), 3);
    assert_eq!(output.context.events.as_ref().unwrap().len(), 5);
    assert_eq!(output.report.model_calls, 8);
}

fn second_response(stage: Stage) -> String {
    let fixture = second_punic_war();
    chronicle_pipeline::replay::response_text(&fixture.responses[&stage][0])
}
