//! 引擎、可达图与有界性求解器的端到端场景。
use std::cell::RefCell;
use std::rc::Rc;

use pnbound::analysis::boundness::check_boundedness;
use pnbound::net::io::read_description;
use pnbound::net::{EngineConfig, GraphObserver, Marking, NetError, NodeKind, PetriNet};

fn m(tokens: &[u32]) -> Marking {
    Marking::new(tokens.to_vec())
}

/// 一个库所 `p`，一个无前驱、后继为 `p` 的迁移 `t`。
fn generator() -> PetriNet {
    let mut net = PetriNet::default();
    net.add_place("p").unwrap();
    net.add_transition("t").unwrap();
    net.add_arc("a", "t", "p").unwrap();
    net
}

/// p1 -> t -> p2，p1 初始一个 token。
fn pipe() -> PetriNet {
    let mut net = PetriNet::default();
    net.add_place("p1").unwrap();
    net.add_place("p2").unwrap();
    net.add_transition("t").unwrap();
    net.add_arc("a1", "p1", "t").unwrap();
    net.add_arc("a2", "t", "p2").unwrap();
    net.set_initial_tokens("p1", 1).unwrap();
    net
}

#[test]
fn generator_fires_repeatedly_when_driven_interactively() {
    let mut net = generator();
    assert!(net.trigger_transition("t").unwrap());
    assert_eq!(net.marking(), m(&[1]));
    assert!(net.trigger_transition("t").unwrap());
    assert_eq!(net.marking(), m(&[2]));
    assert!(!net.is_bounded());
}

#[test]
fn generator_is_unbounded() {
    let mut net = generator();
    let report = check_boundedness(&mut net).unwrap();

    assert_eq!(report.bounded, Some(false));
    let witness = report.witness.unwrap();
    assert_eq!(witness.path, vec!["t".to_string()]);
    assert_eq!(witness.covered, m(&[0]));
    assert_eq!(witness.covering, m(&[1]));
}

#[test]
fn pipe_is_bounded_with_two_states() {
    let mut net = pipe();
    let report = check_boundedness(&mut net).unwrap();

    assert_eq!(report.bounded, Some(true));
    assert_eq!(report.node_count, 2);
    assert_eq!(report.edge_count, 1);
    let graph = net.reachability_graph();
    assert!(graph.contains(&m(&[1, 0])));
    assert!(graph.contains(&m(&[0, 1])));
}

#[test]
fn arc_between_places_leaves_net_unchanged() {
    let mut net = pipe();
    let arcs = net.net().arcs_len();
    let err = net.add_arc("bad", "p1", "p2").unwrap_err();

    assert!(matches!(
        err,
        NetError::IllegalConnection {
            kind: NodeKind::Place,
            ..
        }
    ));
    assert_eq!(net.net().arcs_len(), arcs);
    assert!(net.net().transition("t").unwrap().is_active());
}

#[test]
fn inactive_transition_never_fires() {
    let mut net = pipe();
    net.trigger_transition("t").unwrap();
    let transition = net.net().transition("t").unwrap();
    assert!(!transition.is_active());

    let before = net.marking();
    assert!(!net.trigger_transition("t").unwrap());
    assert_eq!(net.marking(), before);
}

#[test]
fn reset_is_idempotent_after_any_firing_sequence() {
    let mut net = read_description("tests/fixtures/mutex.json")
        .unwrap()
        .build(EngineConfig::default())
        .0;
    let initial = net.marking();

    for step in ["enter1", "leave1", "enter2", "enter1", "leave2"] {
        net.trigger_transition(step).unwrap();
    }
    net.reset_places().unwrap();
    assert_eq!(net.marking(), initial);
    net.reset_places().unwrap();
    assert_eq!(net.marking(), initial);
}

#[derive(Default)]
struct EdgeCounter {
    added: Rc<RefCell<usize>>,
    active_changes: Rc<RefCell<usize>>,
}

impl GraphObserver for EdgeCounter {
    fn edge_added(&mut self, _label: &str, _from: &Marking, _to: &Marking) {
        *self.added.borrow_mut() += 1;
    }

    fn active_marking_changed(&mut self, _marking: &Marking) {
        *self.active_changes.borrow_mut() += 1;
    }
}

#[test]
fn setting_current_marking_is_silent() {
    let mut net = pipe();
    let counter = EdgeCounter::default();
    let added = counter.added.clone();
    let active_changes = counter.active_changes.clone();
    net.add_graph_observer(Box::new(counter));

    let current = net.marking();
    net.set_marking(&current).unwrap();

    assert_eq!(*added.borrow(), 0);
    assert_eq!(*active_changes.borrow(), 0);
    assert_eq!(net.reachability_graph().edge_count(), 0);
}

#[test]
fn mutex_state_space_is_explored_exhaustively() {
    let mut net = read_description("tests/fixtures/mutex.json")
        .unwrap()
        .build(EngineConfig::default())
        .0;
    let report = check_boundedness(&mut net).unwrap();

    // (idle1, idle2, lock) / (critical1, idle2) / (idle1, critical2)
    assert_eq!(report.bounded, Some(true));
    assert_eq!(report.node_count, 3);
    assert_eq!(report.edge_count, 4);
}

#[test]
fn witness_pair_is_causally_related() {
    // p0 -> t0 -> p0 + p1，另有 p1 -> t1 -> p2 消耗 p1
    let mut net = PetriNet::default();
    for place in ["p0", "p1", "p2"] {
        net.add_place(place).unwrap();
    }
    net.add_transition("t0").unwrap();
    net.add_transition("t1").unwrap();
    net.add_arc("a0", "p0", "t0").unwrap();
    net.add_arc("a1", "t0", "p0").unwrap();
    net.add_arc("a2", "t0", "p1").unwrap();
    net.add_arc("a3", "p1", "t1").unwrap();
    net.add_arc("a4", "t1", "p2").unwrap();
    net.set_initial_tokens("p0", 1).unwrap();

    let report = check_boundedness(&mut net).unwrap();
    assert_eq!(report.bounded, Some(false));

    let witness = report.witness.unwrap();
    assert!(witness.covering.strictly_covers(&witness.covered));
    assert_ne!(witness.covering, witness.covered);
    assert!(
        net.reachability_graph()
            .is_reachable(&witness.covered, &witness.covering)
    );
    assert!(!witness.path.is_empty());
}

#[test]
fn selecting_a_visited_state_round_trips_through_the_graph() {
    let mut net = pipe();
    net.trigger_transition("t").unwrap();

    net.set_active_marking(&m(&[1, 0])).unwrap();
    assert_eq!(net.marking(), m(&[1, 0]));
    assert!(net.net().transition("t").unwrap().is_active());

    assert!(matches!(
        net.set_active_marking(&m(&[3, 3])),
        Err(NetError::InvariantViolation(_))
    ));
    assert_eq!(net.marking(), m(&[1, 0]));
}

#[test]
fn long_firing_chain_is_explored_without_recursion() {
    const DEPTH: u32 = 20_000;
    let mut net = PetriNet::default();
    net.add_place("p").unwrap();
    net.add_place("q").unwrap();
    net.add_transition("t").unwrap();
    net.add_arc("a1", "p", "t").unwrap();
    net.add_arc("a2", "t", "q").unwrap();
    net.set_initial_tokens("p", DEPTH).unwrap();

    let report = check_boundedness(&mut net).unwrap();

    assert_eq!(report.bounded, Some(true));
    assert_eq!(report.node_count, DEPTH as usize + 1);
    assert_eq!(report.edge_count, DEPTH as usize);
    assert!(net.reachability_graph().contains(&m(&[0, DEPTH])));
    assert_eq!(net.marking(), m(&[DEPTH, 0]));
}
