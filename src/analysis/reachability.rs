//! 增量构建的可达图。
//!
//! 节点是迄今观察到的互不相同的标识，边是迁移发生，以迁移 id 为标签。
//! 图是有向多重图：同一对标识之间可以存在多条标签不同的边。
//! 每新增一条边，都从目标节点沿入边做一次广度优先的反向遍历，
//! 一旦目标严格覆盖某个祖先标识，即判定网无界并记录这对标识。
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use petgraph::Direction;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{Graph, NodeIndex};
use petgraph::visit::{EdgeRef, VisitMap, Visitable};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::net::core::NetError;
use crate::net::observer::GraphObserver;
use crate::net::structure::Marking;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEdge {
    /// 迁移 id，决定边的身份。
    pub transition: String,
    /// 显示用标签（迁移名称或 id）。
    pub label: String,
}

/// 无界性证据：`covering` 可由 `covered` 到达，且严格覆盖它。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverabilityWitness {
    pub covered: Marking,
    pub covering: Marking,
}

pub struct ReachabilityGraph {
    graph: Graph<Marking, StateEdge>,
    markings: FxHashMap<Marking, NodeIndex>,
    root: NodeIndex,
    active: NodeIndex,
    witness: Option<CoverabilityWitness>,
    observers: Vec<Box<dyn GraphObserver>>,
}

impl fmt::Debug for ReachabilityGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReachabilityGraph")
            .field("nodes", &self.graph.node_count())
            .field("edges", &self.graph.edge_count())
            .field("active", &self.graph[self.active])
            .field("witness", &self.witness)
            .finish()
    }
}

impl ReachabilityGraph {
    pub fn new(root: Marking) -> Self {
        let mut graph = Graph::new();
        let index = graph.add_node(root.clone());
        let mut markings = FxHashMap::default();
        markings.insert(root, index);
        Self {
            graph,
            markings,
            root: index,
            active: index,
            witness: None,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: Box<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    /// 丢弃全部历史，以 `root` 为唯一节点重新开始。
    pub fn init(&mut self, root: Marking) {
        self.graph.clear();
        self.markings.clear();
        self.witness = None;
        let index = self.graph.add_node(root.clone());
        self.markings.insert(root, index);
        self.root = index;
        self.active = index;
        debug!("reachability graph initialized at {}", self.graph[index]);
        for observer in self.observers.iter_mut() {
            observer.initialized(&self.graph[index]);
        }
    }

    /// 记录一次发生 `old --edge_id--> new`。
    ///
    /// 边已存在时只通知"经过"，不重复添加，也不重新做覆盖检查。
    pub fn add_marking(
        &mut self,
        edge_id: &str,
        edge_label: &str,
        old: &Marking,
        new: &Marking,
    ) -> Result<(), NetError> {
        let source = self.index_of(old)?;
        let target = match self.markings.get(new) {
            Some(&index) => index,
            None => {
                let index = self.graph.add_node(new.clone());
                self.markings.insert(new.clone(), index);
                index
            }
        };

        let exists = self
            .graph
            .edges_connecting(source, target)
            .any(|edge| edge.weight().transition == edge_id);
        if !exists {
            self.graph.add_edge(
                source,
                target,
                StateEdge {
                    transition: edge_id.to_string(),
                    label: edge_label.to_string(),
                },
            );
            for observer in self.observers.iter_mut() {
                observer.edge_added(edge_label, old, new);
            }
            if self.witness.is_none() {
                self.check_unbounded(target);
            }
        }

        self.active = target;
        for observer in self.observers.iter_mut() {
            observer.edge_visited(old, edge_id);
            observer.active_marking_changed(new);
        }
        Ok(())
    }

    /// 标识因发生以外的原因（重置、强制设置）改变。`marking` 必须已是图中节点。
    pub fn marking_changed(&mut self, marking: &Marking) -> Result<(), NetError> {
        self.active = self.index_of(marking)?;
        for observer in self.observers.iter_mut() {
            observer.active_marking_changed(marking);
        }
        Ok(())
    }

    /// 校验 `marking` 是否为已知节点。
    pub fn ensure_known(&self, marking: &Marking) -> Result<(), NetError> {
        self.index_of(marking).map(|_| ())
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        self.markings.contains_key(marking)
    }

    pub fn root(&self) -> &Marking {
        &self.graph[self.root]
    }

    pub fn active_marking(&self) -> &Marking {
        &self.graph[self.active]
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_bounded(&self) -> bool {
        self.witness.is_none()
    }

    pub fn witness(&self) -> Option<&CoverabilityWitness> {
        self.witness.as_ref()
    }

    /// `marking` 的所有出边：(迁移 id, 目标标识)。
    pub fn successors(&self, marking: &Marking) -> Vec<(&str, &Marking)> {
        let Some(&index) = self.markings.get(marking) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| (edge.weight().transition.as_str(), &self.graph[edge.target()]))
            .collect()
    }

    /// `to` 是否能沿图中的边从 `from` 到达。
    pub fn is_reachable(&self, from: &Marking, to: &Marking) -> bool {
        let (Some(&from), Some(&to)) = (self.markings.get(from), self.markings.get(to)) else {
            return false;
        };
        petgraph::algo::has_path_connecting(&self.graph, from, to, None)
    }

    pub fn to_dot(&self) -> String {
        fn escape(s: &str) -> String {
            s.replace('\\', "\\\\").replace('"', "\\\"")
        }

        let witness = self.witness.as_ref();
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &self.graph,
                &[Config::EdgeNoLabel, Config::NodeNoLabel],
                &|_, edge| format!("label=\"{}\"", escape(&edge.weight().label)),
                &|_, (index, marking)| {
                    let mut attrs = format!("label=\"{}\"", marking);
                    if index == self.active {
                        attrs.push_str(", style=bold");
                    }
                    if witness.is_some_and(|w| &w.covered == marking || &w.covering == marking) {
                        attrs.push_str(", color=red");
                    }
                    attrs
                },
            )
        )
    }

    pub fn write_dot<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_dot())
    }

    fn index_of(&self, marking: &Marking) -> Result<NodeIndex, NetError> {
        self.markings.get(marking).copied().ok_or_else(|| {
            NetError::InvariantViolation(format!(
                "marking {} is not part of the reachability graph",
                marking
            ))
        })
    }

    /// 从 `start` 的直接前驱开始沿入边做 BFS，命中第一个被严格覆盖的祖先即停止。
    fn check_unbounded(&mut self, start: NodeIndex) {
        let mut visited = self.graph.visit_map();
        visited.visit(start);
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .neighbors_directed(start, Direction::Incoming)
            .collect();

        while let Some(other) = queue.pop_front() {
            if !visited.visit(other) {
                continue;
            }
            if self.graph[start].strictly_covers(&self.graph[other]) {
                debug!(
                    "{} strictly covers its ancestor {}",
                    self.graph[start], self.graph[other]
                );
                self.witness = Some(CoverabilityWitness {
                    covered: self.graph[other].clone(),
                    covering: self.graph[start].clone(),
                });
                return;
            }
            queue.extend(self.graph.neighbors_directed(other, Direction::Incoming));
        }
    }
}
