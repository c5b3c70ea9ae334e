mod common;

use common::{Bound, Instance, Outcome, Rel, rat};
use lra_simplex::lra::config::SimplexConfig;
use lra_simplex::lra::conflict::{Conflict, FnSink};
use lra_simplex::lra::delta_rational::DeltaRational;
use lra_simplex::lra::problem::{Problem, Verdict};
use lra_simplex::lra::simplex::{PivotLimit, SearchOutcome, SimplexDecisionProcedure};
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn verdicts(problem: &Problem, config: SimplexConfig) -> Vec<bool> {
    let results = problem.run(config);
    for result in &results {
        assert!(problem.verify(result), "{result:?} failed verification");
    }
    results.iter().map(|r| r.is_sat()).collect()
}

fn chain() -> Instance {
    Instance {
        originals: 4,
        rows: vec![vec![1, -1, 0, 0], vec![0, 1, -1, 0], vec![0, 0, 1, -1]],
        bounds: vec![
            Bound { var: 4, rel: Rel::Ge, constant: 1 },
            Bound { var: 5, rel: Rel::Ge, constant: 1 },
            Bound { var: 6, rel: Rel::Ge, constant: 1 },
            Bound { var: 3, rel: Rel::Ge, constant: 0 },
            Bound { var: 0, rel: Rel::Le, constant: 3 },
        ],
    }
}

#[test]
fn test_contradictory_bounds_on_one_variable() {
    let mut simplex = SimplexDecisionProcedure::new(Vec::<Conflict<&str>>::new());
    assert!(!simplex.assert_lower(0, DeltaRational::from_integer(2), "x >= 2"));
    assert!(simplex.assert_upper(0, DeltaRational::from_integer(1), "x <= 1"));

    let conflict = &simplex.sink()[0];
    assert_eq!(conflict.len(), 2);
    assert!(conflict.tokens().contains(&"x >= 2"));
    assert!(conflict.tokens().contains(&"x <= 1"));
    assert_eq!(simplex.observer().assert_upper_conflicts, 1);
}

#[test]
fn test_sum_of_non_negatives_cannot_be_negative() {
    let mut reported = Vec::new();
    {
        let mut simplex = SimplexDecisionProcedure::new(FnSink(|c: Conflict<&'static str>| {
            reported.push(c.into_tokens());
        }));
        simplex.add_row(2, vec![(0, rat(1)), (1, rat(1))]);
        assert!(!simplex.assert_lower(0, DeltaRational::zero(), "x >= 0"));
        assert!(!simplex.assert_lower(1, DeltaRational::zero(), "y >= 0"));
        assert!(simplex.update_inconsistent_vars().is_none());
        assert!(!simplex.assert_upper(2, DeltaRational::from_integer(-1), "z <= -1"));
        assert!(simplex.update_inconsistent_vars().is_some());
        assert_eq!(simplex.check_invariants(), Ok(()));
    }

    assert_eq!(reported.len(), 1);
    let mut tokens = reported.remove(0);
    tokens.sort_unstable();
    assert_eq!(tokens, vec!["x >= 0", "y >= 0", "z <= -1"]);
}

#[test]
fn test_degenerate_chain_terminates_under_blands_rule() {
    let instance = chain();
    let config = SimplexConfig {
        heuristic_iteration_limit: Some(0),
        ..SimplexConfig::default()
    };
    let (outcome, simplex) = instance.solve(config);
    assert_eq!(outcome, Outcome::Sat);
    assert!(instance.satisfied_by(&simplex, instance.bounds.len()));
    assert_eq!(simplex.check_invariants(), Ok(()));
    assert!(simplex.observer().anti_cycle_switches > 0);
}

#[test]
fn test_tightened_chain_is_infeasible() {
    let mut instance = chain();
    instance.bounds.push(Bound {
        var: 0,
        rel: Rel::Lt,
        constant: 3,
    });
    let (outcome, _) = instance.solve(SimplexConfig::default());
    let Outcome::Unsat(tokens) = outcome else {
        panic!("expected a conflict");
    };
    assert!(tokens.contains(&5));
    assert!(!instance.feasible(&tokens));
}

#[test]
fn test_budgeted_search_resumes_to_the_same_verdict() {
    let instance = chain();
    let config = SimplexConfig {
        heuristic_iteration_limit: Some(0),
        ..SimplexConfig::default()
    };
    let mut simplex = instance.build(config);
    for i in 0..instance.bounds.len() {
        assert_eq!(instance.assert(&mut simplex, i), None);
    }

    let mut interruptions = 0;
    let outcome = loop {
        match simplex.update_inconsistent_vars_with_budget(&mut PivotLimit::new(1)) {
            SearchOutcome::Interrupted => {
                interruptions += 1;
                assert_eq!(simplex.check_invariants(), Ok(()));
                assert!(interruptions < 1000, "search does not make progress");
            }
            outcome => break outcome,
        }
    };
    assert_eq!(outcome, SearchOutcome::Sat);
    assert!(interruptions > 0);
    assert!(instance.satisfied_by(&simplex, instance.bounds.len()));
}

#[test]
fn test_heuristic_stage_hands_over_to_blands_rule() {
    let instance = chain();
    let config = SimplexConfig {
        heuristic_iteration_limit: Some(1),
        ..SimplexConfig::default()
    };
    let mut simplex = instance.build(config);
    for i in 0..instance.bounds.len() {
        assert_eq!(instance.assert(&mut simplex, i), None);
    }

    assert_eq!(simplex.update_inconsistent_vars(), None);
    assert_eq!(simplex.observer().anti_cycle_switches, 1);
    assert!(simplex.observer().pivots > 1);
    assert!(instance.satisfied_by(&simplex, instance.bounds.len()));
    assert_eq!(simplex.check_invariants(), Ok(()));
}

#[test]
fn test_small_budgets_still_reach_blands_rule() {
    let instance = chain();
    let config = SimplexConfig {
        heuristic_iteration_limit: Some(2),
        ..SimplexConfig::default()
    };
    let mut simplex = instance.build(config);
    for i in 0..instance.bounds.len() {
        assert_eq!(instance.assert(&mut simplex, i), None);
    }

    let mut calls = 0;
    let outcome = loop {
        calls += 1;
        assert!(calls < 1000, "search does not make progress");
        match simplex.update_inconsistent_vars_with_budget(&mut PivotLimit::new(1)) {
            SearchOutcome::Interrupted => {}
            outcome => break outcome,
        }
    };
    assert_eq!(outcome, SearchOutcome::Sat);
    assert_eq!(simplex.observer().anti_cycle_switches, 1);
    assert!(instance.satisfied_by(&simplex, instance.bounds.len()));
}

#[test]
fn test_push_pop_round_trip() {
    let instance = chain();
    let (outcome, mut simplex) = instance.solve(SimplexConfig::default());
    assert_eq!(outcome, Outcome::Sat);
    simplex.commit_assignment_changes();

    simplex.push();
    assert!(!simplex.assert_upper(0, DeltaRational::strictly_below(rat(3)), 99));
    assert!(simplex.update_inconsistent_vars().is_some());

    simplex.revert_assignment_changes();
    simplex.pop();
    assert_eq!(simplex.model().upper_bound(0), Some(&DeltaRational::from_integer(3)));
    assert_eq!(simplex.update_inconsistent_vars(), None);
    assert!(instance.satisfied_by(&simplex, instance.bounds.len()));
}

#[test]
fn test_triangle_file() {
    let problem = Problem::parse_file(data("triangle.lra")).expect("parse");
    assert_eq!(verdicts(&problem, SimplexConfig::default()), vec![true, false]);

    let results = problem.run(SimplexConfig::default());
    let Verdict::Unsat(conflict) = &results[1].verdict else {
        panic!("expected a conflict");
    };
    let mut tokens = conflict.tokens().to_vec();
    tokens.sort_unstable();
    assert_eq!(tokens, vec![0, 1, 2]);
}

#[test]
fn test_chain_file() {
    let problem = Problem::parse_file(data("chain.lra")).expect("parse");
    for limit in [None, Some(0), Some(2)] {
        let config = SimplexConfig {
            heuristic_iteration_limit: limit,
            ..SimplexConfig::default()
        };
        assert_eq!(verdicts(&problem, config), vec![true, false, true]);
    }
}

#[test]
fn test_scopes_file() {
    let problem = Problem::parse_file(data("scopes.lra")).expect("parse");
    let config = SimplexConfig {
        early_conflict_scan: false,
        ..SimplexConfig::default()
    };
    assert_eq!(verdicts(&problem, config), vec![true, false, false, true]);
    assert_eq!(
        verdicts(&problem, SimplexConfig::default()),
        vec![true, false, false, true]
    );
}
