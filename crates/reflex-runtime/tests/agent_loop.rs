//! End-to-end agent loop behavior, driven by a deterministic step
//! clock and scripted probe reactors.

mod common;

use common::{probe_config, probe_config_with_limit, probe_factory, Journal, Probe};
use reflex_runtime::{Agent, AgentError};
use reflex_types::ErrorCode;

fn ordered(journal: &Journal, earlier: &str, later: &str) {
    let a = journal
        .position(earlier)
        .unwrap_or_else(|| panic!("missing journal entry '{earlier}'"));
    let b = journal
        .position(later)
        .unwrap_or_else(|| panic!("missing journal entry '{later}'"));
    assert!(
        a < b,
        "'{earlier}' (#{a}) must precede '{later}' (#{b}); journal: {:#?}",
        journal.entries()
    );
}

#[tokio::test]
async fn pipeline_synchronizes_in_dependency_order() {
    let journal = Journal::new();
    let alpha = Probe::new("alpha", &journal).owns("clock").publishes("clock");
    let beta = Probe::new("beta", &journal)
        .observes("clock")
        .owns("out")
        .publishes("out");

    // Configured upside down on purpose; priority must reorder.
    let config = probe_config(5, &["beta", "alpha"]);
    let factory = probe_factory(vec![alpha, beta]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");

    let order = agent.priority_order();
    assert_eq!(order[0].as_str(), "alpha");
    assert_eq!(order[1].as_str(), "beta");

    agent.run().await.expect("clean run");

    // Per tick: alpha syncs, beta hears alpha's fact, beta syncs.
    for tick in 0..=5u64 {
        ordered(&journal, &format!("sync alpha@{tick}"), &format!("sync beta@{tick}"));
        ordered(
            &journal,
            &format!("sync alpha@{tick}"),
            &format!("notify beta clock=Status:{tick}"),
        );
        ordered(
            &journal,
            &format!("notify beta clock=Status:{tick}"),
            &format!("sync beta@{tick}"),
        );
        // Exactly one synchronize per reactor per tick.
        assert_eq!(journal.count_of(&format!("sync alpha@{tick}")), 1);
        assert_eq!(journal.count_of(&format!("sync beta@{tick}")), 1);
    }

    // One timing sample per executed tick.
    let ticks: Vec<_> = agent.monitor().history().iter().map(|s| s.tick).collect();
    assert_eq!(ticks, vec![0, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn dependency_cycle_fails_before_any_tick() {
    let journal = Journal::new();
    let x = Probe::new("x", &journal).owns("x_tl").observes("y_tl");
    let y = Probe::new("y", &journal).owns("y_tl").observes("x_tl");

    let config = probe_config(5, &["x", "y"]);
    let factory = probe_factory(vec![x, y]);
    let err = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .err()
        .expect("cycle must be fatal");

    assert_eq!(err.code(), "CONFIG_DEPENDENCY_CYCLE");
    assert!(journal.entries().is_empty(), "no tick may have run");
}

#[tokio::test]
async fn goal_request_and_recall_round_trip() {
    let journal = Journal::new();
    let alpha = Probe::new("alpha", &journal).owns("nav").publishes("nav");
    let beta = Probe::new("beta", &journal)
        .observes("nav")
        .requests("nav", 3)
        .recalls_at(7);

    let config = probe_config(8, &["alpha", "beta"]);
    let factory = probe_factory(vec![alpha, beta]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");
    agent.run().await.expect("clean run");

    // The owner's handler ran inside the requester's call.
    ordered(&journal, "request_attempt beta@3", "accept alpha Reach");
    ordered(&journal, "accept alpha Reach", "request_sent beta@3");

    // The goal was pending from tick 4 up to the recall at tick 7.
    assert!(journal.contains("pending alpha@4=1"));
    assert!(journal.contains("pending alpha@7=1"));
    ordered(&journal, "recall_sent beta@7", "sync alpha@8");
    assert!(journal.contains("recall_received alpha"));

    // After the recall the owner no longer considers it.
    assert!(!journal.contains("pending alpha@8=1"));
}

#[tokio::test]
async fn goal_on_unknown_timeline_is_discarded_not_fatal() {
    let journal = Journal::new();
    let alpha = Probe::new("alpha", &journal).owns("nav");
    let beta = Probe::new("beta", &journal).observes("nav").requests("ghost", 2);

    let config = probe_config(4, &["alpha", "beta"]);
    let factory = probe_factory(vec![alpha, beta]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");
    agent.run().await.expect("routing errors are not fatal");

    assert!(journal.contains("request_failed beta@2"));
    assert!(journal.contains("sync beta@4"), "loop kept running");
}

#[tokio::test]
async fn mid_tick_publication_is_buffered_to_next_tick() {
    let journal = Journal::new();
    let alpha = Probe::new("alpha", &journal).owns("burst").bursts_at(2, "burst");
    let beta = Probe::new("beta", &journal).observes("burst");

    let config = probe_config(4, &["alpha", "beta"]);
    let factory = probe_factory(vec![alpha, beta]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");
    agent.run().await.expect("clean run");

    // Published from a resume slice at tick 2, heard at tick 3 before
    // anyone synchronizes.
    ordered(&journal, "sync beta@2", "resume alpha@2");
    ordered(&journal, "resume alpha@2", "notify beta burst=Burst:2");
    ordered(&journal, "notify beta burst=Burst:2", "sync alpha@3");
    ordered(&journal, "notify beta burst=Burst:2", "sync beta@3");
}

#[tokio::test]
async fn repeated_sync_failures_escalate_at_the_limit() {
    let journal = Journal::new();
    let flaky = Probe::new("flaky", &journal).failing_sync();

    let config = probe_config_with_limit(10, &["flaky"], 2);
    let factory = probe_factory(vec![flaky]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");

    let err = agent.run().await.expect_err("must escalate");
    let AgentError::ReactorEscalation { reactor, failures } = err;
    assert_eq!(reactor.as_str(), "flaky");
    assert_eq!(failures, 2);

    // One failed attempt per tick until the limit.
    assert_eq!(journal.count_of("sync flaky@0"), 1);
    assert_eq!(journal.count_of("sync flaky@1"), 1);
    assert!(!journal.contains("sync flaky@2"));
}

#[tokio::test]
async fn priority_ties_keep_configuration_order() {
    let journal = Journal::new();
    // a <- b <- c is a chain; d is independent.
    let a = Probe::new("a", &journal).owns("a_tl");
    let b = Probe::new("b", &journal).observes("a_tl").owns("b_tl");
    let c = Probe::new("c", &journal).observes("b_tl").owns("c_tl");
    let d = Probe::new("d", &journal).owns("d_tl");

    let config = probe_config(1, &["c", "d", "b", "a"]);
    let factory = probe_factory(vec![a, b, c, d]);
    let agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");

    let order: Vec<_> = agent
        .priority_order()
        .iter()
        .map(|n| n.as_str().to_string())
        .collect();
    // Priorities: d=0, a=0, b=1, c=2; ties keep config order (d before a).
    assert_eq!(order, vec!["d", "a", "b", "c"]);
}

#[tokio::test]
async fn per_tick_stats_count_slices() {
    let journal = Journal::new();
    let alpha = Probe::new("alpha", &journal).owns("clock").publishes("clock");

    let config = probe_config(3, &["alpha"]);
    let factory = probe_factory(vec![alpha]);
    let mut agent = Agent::with_clock(&config, &factory, config.clock.build().expect("clock"))
        .expect("valid agent");
    agent.run().await.expect("clean run");

    // Counters are per tick; after the run they describe the last tick.
    let stats = agent.stats_of("alpha").expect("known reactor");
    assert_eq!(stats.sync_count, 1);
    assert_eq!(stats.search_count, 0);
}
