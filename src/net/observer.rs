//! 观察者回调：视图层通过注册 trait object 接收网与可达图的变化。
//!
//! 所有方法都有空的默认实现，观察者只需覆写关心的事件。
use crate::net::structure::{Marking, Tokens};

pub trait NetObserver {
    /// 库所当前 token 数发生变化。
    fn tokens_changed(&mut self, _place: &str, _tokens: Tokens) {}

    /// 迁移可发生状态发生变化。
    fn active_changed(&mut self, _transition: &str, _active: bool) {}
}

pub trait GraphObserver {
    /// 可达图被清空，仅剩根节点 `root`。
    fn initialized(&mut self, _root: &Marking) {}

    /// 新增了一条 `from --label--> to` 的边。
    fn edge_added(&mut self, _label: &str, _from: &Marking, _to: &Marking) {}

    /// 一次发生经过了 `from` 出发、标签为 `label` 的边（无论边是否新建）。
    fn edge_visited(&mut self, _from: &Marking, _label: &str) {}

    fn active_marking_changed(&mut self, _marking: &Marking) {}
}
