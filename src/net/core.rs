//! 网拓扑：库所/迁移/弧的注册表、token 记账与发生语义。
//!
//! 迁移 `t` 可发生当且仅当其每个前驱库所至少持有一个 token（无前驱时恒可发生）。
//! 发生时从每个前驱取走一个 token、向每个后继放入一个 token，要么全部完成，
//! 要么回滚到发生前的状态。
use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::net::ids::{ArcId, PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::observer::NetObserver;
use crate::net::structure::{Arc, ArcDirection, Marking, NodeKind, Place, Tokens, Transition};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetError {
    #[error("id `{0}` is already in use")]
    DuplicateElement(String),
    #[error("no element with id `{0}`")]
    ElementNotFound(String),
    #[error("cannot connect `{from}` to `{to}`: both are of kind {kind}")]
    IllegalConnection {
        from: String,
        to: String,
        kind: NodeKind,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// 内部记账出错（网与可达图失去同步、token 为负、计数溢出）。调用方必须放弃当前操作。
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

/// 共享命名空间中的一个条目。库所、迁移与弧的 id 互不重复。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Place(PlaceId),
    Transition(TransitionId),
    Arc(ArcId),
}

#[derive(Default)]
pub struct Net {
    places: IndexVec<PlaceId, Place>,
    transitions: IndexVec<TransitionId, Transition>,
    arcs: IndexVec<ArcId, Arc>,
    elements: FxHashMap<String, Element>,
    /// 标识分量顺序：按库所 id 字母序。
    place_order: BTreeMap<String, PlaceId>,
    observers: Vec<Box<dyn NetObserver>>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn NetObserver>) {
        self.observers.push(observer);
    }

    pub fn add_place(&mut self, id: &str) -> Result<PlaceId, NetError> {
        self.check_unused(id)?;
        let place_id = self.places.push(Place::new(id));
        self.elements.insert(id.to_string(), Element::Place(place_id));
        self.place_order.insert(id.to_string(), place_id);
        Ok(place_id)
    }

    pub fn add_transition(&mut self, id: &str) -> Result<TransitionId, NetError> {
        self.check_unused(id)?;
        let transition_id = self.transitions.push(Transition::new(id));
        self.elements
            .insert(id.to_string(), Element::Transition(transition_id));
        Ok(transition_id)
    }

    /// 添加弧。所有检查都在修改结构之前完成，失败时网保持不变。
    pub fn add_arc(&mut self, id: &str, source: &str, target: &str) -> Result<ArcId, NetError> {
        self.check_unused(id)?;
        let from = self.node(source)?;
        let to = self.node(target)?;

        let (place, transition, direction) = match (from, to) {
            (Element::Place(place), Element::Transition(transition)) => {
                (place, transition, ArcDirection::PlaceToTransition)
            }
            (Element::Transition(transition), Element::Place(place)) => {
                (place, transition, ArcDirection::TransitionToPlace)
            }
            (Element::Place(_), _) => {
                return Err(NetError::IllegalConnection {
                    from: source.to_string(),
                    to: target.to_string(),
                    kind: NodeKind::Place,
                });
            }
            _ => {
                return Err(NetError::IllegalConnection {
                    from: source.to_string(),
                    to: target.to_string(),
                    kind: NodeKind::Transition,
                });
            }
        };

        match direction {
            ArcDirection::PlaceToTransition => {
                let has_tokens = self.places[place].has_tokens();
                let entry = &mut self.transitions[transition];
                if !entry.predecessors.contains(&place) {
                    entry.predecessors.push(place);
                    self.places[place].consumers.push(transition);
                }
                entry.active &= has_tokens;
            }
            ArcDirection::TransitionToPlace => {
                let entry = &mut self.transitions[transition];
                if !entry.successors.contains(&place) {
                    entry.successors.push(place);
                }
            }
        }

        let arc_id = self.arcs.push(Arc::new(id, place, transition, direction));
        self.elements.insert(id.to_string(), Element::Arc(arc_id));
        Ok(arc_id)
    }

    pub fn set_node_name(&mut self, id: &str, name: &str) -> Result<(), NetError> {
        match self.node(id)? {
            Element::Place(place) => self.places[place].name = Some(name.to_string()),
            Element::Transition(transition) => {
                self.transitions[transition].name = Some(name.to_string())
            }
            Element::Arc(_) => unreachable!("node() never yields arcs"),
        }
        Ok(())
    }

    pub fn set_node_position(&mut self, id: &str, x: i32, y: i32) -> Result<(), NetError> {
        match self.node(id)? {
            Element::Place(place) => self.places[place].position = Some((x, y)),
            Element::Transition(transition) => self.transitions[transition].position = Some((x, y)),
            Element::Arc(_) => unreachable!("node() never yields arcs"),
        }
        Ok(())
    }

    /// 同时设置库所的初始与当前 token 数，仅用于构建或重新加载网。
    pub fn set_initial_tokens(&mut self, id: &str, tokens: Tokens) -> Result<(), NetError> {
        let place = self.place_id(id)?;
        let before = vec![(place, self.places[place].tokens)];
        self.places[place].initial_tokens = tokens;
        self.places[place].tokens = tokens;
        self.commit(before);
        Ok(())
    }

    /// 将初始 token 数加一或减一，当前 token 数同步为新的初始值。
    ///
    /// 返回 `false` 表示未作修改：未知 id、减到负数或溢出。
    pub(crate) fn adjust_initial_tokens(&mut self, id: &str, increment: bool) -> bool {
        let Ok(place) = self.place_id(id) else {
            return false;
        };
        let initial = self.places[place].initial_tokens;
        let next = if increment {
            initial.checked_add(1)
        } else {
            initial.checked_sub(1)
        };
        let Some(next) = next else {
            return false;
        };
        let before = vec![(place, self.places[place].tokens)];
        self.places[place].initial_tokens = next;
        self.places[place].tokens = next;
        self.commit(before);
        true
    }

    pub fn is_transition(&self, id: &str) -> Result<bool, NetError> {
        Ok(matches!(self.node(id)?, Element::Transition(_)))
    }

    pub fn place(&self, id: &str) -> Option<&Place> {
        match self.elements.get(id) {
            Some(&Element::Place(place)) => self.places.get(place),
            _ => None,
        }
    }

    pub fn transition(&self, id: &str) -> Option<&Transition> {
        match self.elements.get(id) {
            Some(&Element::Transition(transition)) => self.transitions.get(transition),
            _ => None,
        }
    }

    pub fn place_by_id(&self, place: PlaceId) -> &Place {
        &self.places[place]
    }

    /// 按标识分量顺序（字母序）遍历库所。
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.place_order.values().map(|&place| &self.places[place])
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.arcs.iter()
    }

    pub fn place_ids(&self) -> impl Iterator<Item = &str> {
        self.place_order.keys().map(String::as_str)
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs_len(&self) -> usize {
        self.arcs.len()
    }

    pub fn marking(&self) -> Marking {
        Marking::new(
            self.place_order
                .values()
                .map(|&place| self.places[place].tokens)
                .collect(),
        )
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::new(
            self.place_order
                .values()
                .map(|&place| self.places[place].initial_tokens)
                .collect(),
        )
    }

    pub fn is_in_initial_marking(&self) -> bool {
        self.places
            .iter()
            .all(|place| place.tokens == place.initial_tokens)
    }

    /// 将所有库所的当前 token 数强制设置为 `marking`。
    pub fn apply_marking(&mut self, marking: &Marking) -> Result<(), NetError> {
        if marking.len() != self.places_len() {
            return Err(NetError::InvalidArgument(format!(
                "marking {} has {} entries, net has {} places",
                marking,
                marking.len(),
                self.places_len()
            )));
        }
        let order: Vec<PlaceId> = self.place_order.values().copied().collect();
        let mut before = Vec::with_capacity(order.len());
        for (idx, place) in order.into_iter().enumerate() {
            before.push((place, self.places[place].tokens));
            self.places[place].tokens = marking.tokens(idx);
        }
        self.commit(before);
        Ok(())
    }

    /// 当前 token 数恢复为初始值。
    pub fn reset_tokens(&mut self) {
        let mut before = Vec::with_capacity(self.places_len());
        for (place_id, place) in self.places.iter_enumerated() {
            before.push((place_id, place.tokens));
        }
        for place in self.places.iter_mut() {
            place.tokens = place.initial_tokens;
        }
        self.commit(before);
    }

    /// 当前 token 数成为新的初始值。
    pub fn freeze_initial_tokens(&mut self) {
        for place in self.places.iter_mut() {
            place.initial_tokens = place.tokens;
        }
    }

    /// 所有初始 token 数清零，当前 token 数随之清零。
    pub fn clear_initial_tokens(&mut self) {
        for place in self.places.iter_mut() {
            place.initial_tokens = 0;
        }
        self.reset_tokens();
    }

    /// 当前可发生的迁移 id，按添加顺序。
    pub fn enabled_transitions(&self) -> Vec<String> {
        self.transitions
            .iter()
            .filter(|transition| transition.active)
            .map(|transition| transition.id.clone())
            .collect()
    }

    /// 激发迁移 `id`。
    ///
    /// `id` 不是迁移或迁移不可发生时返回 `Ok(false)` 且不做任何修改。
    pub fn fire(&mut self, id: &str) -> Result<bool, NetError> {
        let Some(&Element::Transition(transition)) = self.elements.get(id) else {
            debug!("ignoring trigger of `{}`: not a transition", id);
            return Ok(false);
        };
        if !self.transitions[transition].active {
            info!("transition `{}` is not active", id);
            return Ok(false);
        }

        let predecessors = self.transitions[transition].predecessors.clone();
        let successors = self.transitions[transition].successors.clone();

        let mut touched: Vec<PlaceId> = predecessors.iter().chain(&successors).copied().collect();
        touched.sort();
        touched.dedup();
        let before: Vec<(PlaceId, Tokens)> = touched
            .into_iter()
            .map(|place| (place, self.places[place].tokens))
            .collect();

        self.take_tokens(&predecessors)?;
        if let Err(err) = self.give_tokens(&successors) {
            self.return_tokens(&predecessors);
            return Err(err);
        }

        self.commit(before);
        Ok(true)
    }

    fn take_tokens(&mut self, places: &[PlaceId]) -> Result<(), NetError> {
        for (taken, &place) in places.iter().enumerate() {
            let slot = &mut self.places[place].tokens;
            match slot.checked_sub(1) {
                Some(rest) => *slot = rest,
                None => {
                    self.return_tokens(&places[..taken]);
                    return Err(NetError::InvariantViolation(format!(
                        "place `{}` ran out of tokens while firing",
                        self.places[place].id
                    )));
                }
            }
        }
        Ok(())
    }

    fn give_tokens(&mut self, places: &[PlaceId]) -> Result<(), NetError> {
        for (given, &place) in places.iter().enumerate() {
            let slot = &mut self.places[place].tokens;
            match slot.checked_add(1) {
                Some(more) => *slot = more,
                None => {
                    for &earlier in &places[..given] {
                        self.places[earlier].tokens -= 1;
                    }
                    return Err(NetError::InvariantViolation(format!(
                        "token count of place `{}` overflowed",
                        self.places[place].id
                    )));
                }
            }
        }
        Ok(())
    }

    // 只用于撤销刚刚取走的 token，不会溢出。
    fn return_tokens(&mut self, places: &[PlaceId]) {
        for &place in places {
            self.places[place].tokens += 1;
        }
    }

    /// 通知 token 数发生变化的库所，并重新计算受影响迁移的可发生状态。
    fn commit(&mut self, before: Vec<(PlaceId, Tokens)>) {
        let mut affected = FxHashSet::default();
        for (place_id, old) in before {
            let place = &self.places[place_id];
            if place.tokens == old {
                continue;
            }
            for observer in self.observers.iter_mut() {
                observer.tokens_changed(&place.id, place.tokens);
            }
            affected.extend(place.consumers.iter().copied());
        }

        let mut affected: Vec<TransitionId> = affected.into_iter().collect();
        affected.sort();
        for transition_id in affected {
            let active = self.transitions[transition_id]
                .predecessors
                .iter()
                .all(|&place| self.places[place].has_tokens());
            let transition = &mut self.transitions[transition_id];
            if transition.active == active {
                continue;
            }
            transition.active = active;
            for observer in self.observers.iter_mut() {
                observer.active_changed(&transition.id, active);
            }
        }
    }

    fn check_unused(&self, id: &str) -> Result<(), NetError> {
        if self.elements.contains_key(id) {
            return Err(NetError::DuplicateElement(id.to_string()));
        }
        Ok(())
    }

    /// 解析库所或迁移；弧 id 视为不存在。
    fn node(&self, id: &str) -> Result<Element, NetError> {
        match self.elements.get(id) {
            Some(element) if !matches!(element, Element::Arc(_)) => Ok(*element),
            _ => Err(NetError::ElementNotFound(id.to_string())),
        }
    }

    fn place_id(&self, id: &str) -> Result<PlaceId, NetError> {
        match self.elements.get(id) {
            Some(&Element::Place(place)) => Ok(place),
            _ => Err(NetError::ElementNotFound(id.to_string())),
        }
    }
}
