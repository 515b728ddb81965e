//! P/T 网静态结构元素：库所、迁移、弧与标识。
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::ids::{PlaceId, TransitionId};

pub type Tokens = u32;

/// 节点种类。弧只能连接不同种类的节点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Place,
    Transition,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Place => write!(f, "place"),
            NodeKind::Transition => write!(f, "transition"),
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Place {
    pub id: String,
    pub name: Option<String>,
    pub position: Option<(i32, i32)>,
    pub(crate) tokens: Tokens,
    pub(crate) initial_tokens: Tokens,
    /// 以本库所为前驱的迁移，token 数变化时需要重新计算它们的可发生状态。
    pub(crate) consumers: Vec<TransitionId>,
}

impl Place {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            position: None,
            tokens: 0,
            initial_tokens: 0,
            consumers: Vec::new(),
        }
    }

    pub fn tokens(&self) -> Tokens {
        self.tokens
    }

    pub fn initial_tokens(&self) -> Tokens {
        self.initial_tokens
    }

    pub fn has_tokens(&self) -> bool {
        self.tokens > 0
    }

    /// 视图层使用的标签，形如 `[p1] name <3>`。
    pub fn label(&self) -> String {
        format!("{} <{}>", node_label(&self.id, self.name.as_deref()), self.tokens)
    }
}

fn node_label(id: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("[{}] {}", id, name),
        None => format!("[{}]", id),
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Transition {
    pub id: String,
    pub name: Option<String>,
    pub position: Option<(i32, i32)>,
    pub(crate) predecessors: Vec<PlaceId>,
    pub(crate) successors: Vec<PlaceId>,
    pub(crate) active: bool,
}

impl Transition {
    /// 没有前驱的迁移恒可发生。
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            position: None,
            predecessors: Vec::new(),
            successors: Vec::new(),
            active: true,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn predecessors(&self) -> &[PlaceId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[PlaceId] {
        &self.successors
    }

    /// 形如 `[t1] name`，用作可达图的边标签。
    pub fn label(&self) -> String {
        node_label(&self.id, self.name.as_deref())
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.id)
            .field(&self.active)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Arc {
    pub id: String,
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
}

impl Arc {
    pub fn new(
        id: impl Into<String>,
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
    ) -> Self {
        Self {
            id: id.into(),
            place,
            transition,
            direction,
        }
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arc")
            .field("id", &self.id)
            .field("place", &self.place)
            .field("transition", &self.transition)
            .field("direction", &self.direction)
            .finish()
    }
}

/// 全局状态：按库所 id 字母序排列的 token 数向量，创建后不可变。
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marking(Vec<Tokens>);

impl Marking {
    pub fn new(tokens: Vec<Tokens>) -> Self {
        Self(tokens)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self, index: usize) -> Tokens {
        self.0[index]
    }

    pub fn iter(&self) -> impl Iterator<Item = Tokens> + '_ {
        self.0.iter().copied()
    }

    /// `self ≥ₖ other`：每个分量都不小于 `other` 的对应分量。
    pub fn covers(&self, other: &Marking) -> bool {
        matches!(
            self.partial_cmp(other),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// `self >ₖ other`：覆盖且不相等。
    pub fn strictly_covers(&self, other: &Marking) -> bool {
        self.partial_cmp(other) == Some(Ordering::Greater)
    }
}

impl From<Vec<Tokens>> for Marking {
    fn from(value: Vec<Tokens>) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marking{}", self)
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, tokens) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", tokens)?;
        }
        write!(f, ")")
    }
}

/// 覆盖偏序。长度不同或分量有增有减时不可比。
impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            if left < right {
                less = true;
            } else if left > right {
                greater = true;
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marking_displays_as_pipe_separated_tuple() {
        assert_eq!(Marking::new(vec![1, 0, 12]).to_string(), "(1|0|12)");
        assert_eq!(Marking::new(vec![]).to_string(), "()");
    }

    #[test]
    fn coverability_order() {
        let low = Marking::new(vec![0, 1]);
        let high = Marking::new(vec![1, 1]);
        let crossed = Marking::new(vec![2, 0]);

        assert!(high.strictly_covers(&low));
        assert!(high.covers(&high));
        assert!(!high.strictly_covers(&high));
        assert!(!low.covers(&high));
        assert_eq!(crossed.partial_cmp(&low), None);
        assert!(!crossed.covers(&low));
        assert_eq!(low.partial_cmp(&Marking::new(vec![0])), None);
    }

    #[test]
    fn place_label_shows_id_name_and_tokens() {
        let mut place = Place::new("p1");
        place.tokens = 3;
        assert_eq!(place.label(), "[p1] <3>");
        place.name = Some("buffer".to_string());
        assert_eq!(place.label(), "[p1] buffer <3>");
    }

    #[test]
    fn transition_without_predecessors_is_active() {
        let transition = Transition::new("t");
        assert!(transition.is_active());
        assert_eq!(transition.label(), "[t]");
    }

    #[test]
    fn transition_label_keeps_id_next_to_name() {
        let mut transition = Transition::new("t1");
        transition.name = Some("enter".to_string());
        assert_eq!(transition.label(), "[t1] enter");
    }
}
