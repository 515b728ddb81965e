//! Petri网有界性分析
//!
//! 深度优先地遍历全部可达状态，发生过程中由可达图做覆盖检查。
//! 一旦可达图判定无界立即中止，此时的迁移路径即是从初始标识到证据标识的见证序列。
use std::fmt;
use std::path::PathBuf;

use log::{debug, info};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::net::core::NetError;
use crate::net::petri_net::PetriNet;
use crate::net::structure::Marking;

/// 无界见证：发生序列以及满足 `covering >ₖ covered` 的一对标识。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnboundedWitness {
    pub path: Vec<String>,
    pub covered: Marking,
    pub covering: Marking,
}

/// 有界性检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundednessReport {
    pub file: Option<PathBuf>,
    /// 分析未完成（输入无法加载或中止）时为 `None`。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounded: Option<bool>,
    pub node_count: usize,
    pub edge_count: usize,
    pub witness: Option<UnboundedWitness>,
    /// 输入无法加载或分析中止时的错误信息。
    pub error: Option<String>,
}

impl BoundednessReport {
    pub fn failed(file: Option<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            file,
            bounded: None,
            node_count: 0,
            edge_count: 0,
            witness: None,
            error: Some(error.into()),
        }
    }
}

impl fmt::Display for BoundednessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            writeln!(f, "{}:", file.display())?;
        } else {
            writeln!(f, "Result:")?;
        }
        if let Some(error) = &self.error {
            return writeln!(f, "\terror: {}", error);
        }
        match &self.witness {
            None => {
                writeln!(f, "\tbounded: yes")?;
                writeln!(f, "\tnodes: {}", self.node_count)?;
                writeln!(f, "\tedges: {}", self.edge_count)
            }
            Some(witness) => {
                writeln!(f, "\tbounded: no")?;
                writeln!(f, "\tpath length: {}", witness.path.len())?;
                writeln!(f, "\tpath: ({})", witness.path.join(","))?;
                writeln!(f, "\tm:  {}", witness.covered)?;
                writeln!(f, "\tm': {}", witness.covering)
            }
        }
    }
}

/// 对一个引擎实例做穷举有界性分析。
///
/// 求解器独占引擎；构造时会恢复初始标识并清空可达图。
pub struct BoundednessSolver<'a> {
    net: &'a mut PetriNet,
    explored: FxHashSet<Marking>,
    path: Vec<String>,
}

impl<'a> BoundednessSolver<'a> {
    pub fn new(net: &'a mut PetriNet) -> Result<Self, NetError> {
        net.reset_places()?;
        net.init_reachability_graph();
        Ok(Self {
            net,
            explored: FxHashSet::default(),
            path: Vec::new(),
        })
    }

    pub fn solve(mut self) -> Result<BoundednessReport, NetError> {
        let bounded = self.explore()?;
        let graph = self.net.reachability_graph();

        let witness = if bounded {
            None
        } else {
            let evidence = graph.witness().ok_or_else(|| {
                NetError::InvariantViolation(
                    "search aborted without coverability evidence".to_string(),
                )
            })?;
            Some(UnboundedWitness {
                path: self.path,
                covered: evidence.covered.clone(),
                covering: evidence.covering.clone(),
            })
        };

        info!(
            "boundedness analysis finished: bounded={}, nodes={}, edges={}",
            bounded,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(BoundednessReport {
            file: None,
            bounded: Some(bounded),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            witness,
            error: None,
        })
    }

    /// 返回 `Ok(false)` 表示发现了无界证据，路径保持在命中时的状态。
    ///
    /// 用显式栈代替递归，深度只受堆内存限制。每个栈帧记录标识、
    /// 进入时可发生的迁移以及下一个待尝试的下标。
    fn explore(&mut self) -> Result<bool, NetError> {
        let root = self.net.marking();
        if !self.explored.insert(root.clone()) {
            return Ok(true);
        }
        let mut stack: Vec<(Marking, Vec<String>, usize)> =
            vec![(root, self.net.active_transition_ids(), 0)];

        while let Some((_, transitions, next)) = stack.last_mut() {
            let Some(transition) = transitions.get(*next).cloned() else {
                stack.pop();
                if let Some((parent, _, _)) = stack.last() {
                    self.net.set_marking(parent)?;
                    self.path.pop();
                }
                continue;
            };
            *next += 1;

            if !self.net.trigger_transition(&transition)? {
                return Err(NetError::InvariantViolation(format!(
                    "active transition `{}` did not fire",
                    transition
                )));
            }
            self.path.push(transition);
            if !self.net.is_bounded() {
                debug!("unbounded along ({})", self.path.join(","));
                return Ok(false);
            }

            let reached = self.net.marking();
            if self.explored.insert(reached.clone()) {
                stack.push((reached, self.net.active_transition_ids(), 0));
            } else if let Some((parent, _, _)) = stack.last() {
                self.net.set_marking(parent)?;
                self.path.pop();
            }
        }
        Ok(true)
    }
}

/// 检查Petri网是否有界的便捷函数
pub fn check_boundedness(net: &mut PetriNet) -> Result<BoundednessReport, NetError> {
    BoundednessSolver::new(net)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构建一个有界的Petri网（简单循环）
    fn build_bounded_net() -> PetriNet {
        let mut net = PetriNet::default();
        net.add_place("p0").unwrap();
        net.add_place("p1").unwrap();
        net.add_transition("t0").unwrap();
        net.add_transition("t1").unwrap();

        // p0 -> t0 -> p1 -> t1 -> p0
        net.add_arc("a0", "p0", "t0").unwrap();
        net.add_arc("a1", "t0", "p1").unwrap();
        net.add_arc("a2", "p1", "t1").unwrap();
        net.add_arc("a3", "t1", "p0").unwrap();
        net.set_initial_tokens("p0", 1).unwrap();
        net
    }

    /// 构建一个无界的Petri网（token生成器）
    fn build_unbounded_net() -> PetriNet {
        let mut net = PetriNet::default();
        net.add_place("p0").unwrap();
        net.add_place("p1").unwrap();
        net.add_transition("t0").unwrap();

        // p0 -> t0 -> p0 + p1
        net.add_arc("a0", "p0", "t0").unwrap();
        net.add_arc("a1", "t0", "p0").unwrap();
        net.add_arc("a2", "t0", "p1").unwrap();
        net.set_initial_tokens("p0", 1).unwrap();
        net
    }

    #[test]
    fn test_bounded_net() {
        let mut net = build_bounded_net();
        let report = check_boundedness(&mut net).unwrap();

        assert_eq!(report.bounded, Some(true));
        assert_eq!(report.node_count, 2);
        assert_eq!(report.edge_count, 2);
        assert!(report.witness.is_none());
    }

    #[test]
    fn test_unbounded_net() {
        let mut net = build_unbounded_net();
        let report = check_boundedness(&mut net).unwrap();

        assert_eq!(report.bounded, Some(false));
        let witness = report.witness.unwrap();
        assert_eq!(witness.path, vec!["t0".to_string()]);
        assert_eq!(witness.covered, Marking::new(vec![1, 0]));
        assert_eq!(witness.covering, Marking::new(vec![1, 1]));
    }

    #[test]
    fn solver_starts_from_initial_marking() {
        let mut net = build_bounded_net();
        net.trigger_transition("t0").unwrap();
        let report = check_boundedness(&mut net).unwrap();

        assert_eq!(report.bounded, Some(true));
        assert_eq!(net.reachability_graph().root(), &Marking::new(vec![1, 0]));
    }

    #[test]
    fn dead_net_has_single_state() {
        let mut net = PetriNet::default();
        net.add_place("p").unwrap();
        net.add_transition("t").unwrap();
        net.add_arc("a", "p", "t").unwrap();

        let report = check_boundedness(&mut net).unwrap();
        assert_eq!(report.bounded, Some(true));
        assert_eq!(report.node_count, 1);
        assert_eq!(report.edge_count, 0);
    }

    #[test]
    fn report_display() {
        let mut net = build_unbounded_net();
        let report = check_boundedness(&mut net).unwrap();
        let text = report.to_string();

        assert!(text.contains("bounded: no"));
        assert!(text.contains("path length: 1"));
        assert!(text.contains("path: (t0)"));
        assert!(text.contains("m:  (1|0)"));
        assert!(text.contains("m': (1|1)"));

        let failed = BoundednessReport::failed(Some(PathBuf::from("x.json")), "boom");
        assert_eq!(failed.to_string(), "x.json:\n\terror: boom\n");
    }

    #[test]
    fn failed_report_carries_no_verdict() {
        let failed = BoundednessReport::failed(None, "marking desynchronized");
        let json = serde_json::to_value(&failed).unwrap();

        assert!(json.get("bounded").is_none());
        assert_eq!(json["error"], "marking desynchronized");

        let mut net = build_bounded_net();
        let report = check_boundedness(&mut net).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bounded"], true);
        assert!(json["error"].is_null());
    }
}
