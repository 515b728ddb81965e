//! Petri 网引擎：网拓扑 + 当前标识 + 一张可达图。
//!
//! 引擎保证网与可达图始终同步：每次发生都作为一条边记录到图中，
//! 其他方式（重置、强制设置、选择已访问状态）的标识变化只移动图的活动节点。
//! 结构变化和初始标识变化会把图重新初始化为以当前标识为根的单节点图。
use log::{info, warn};

use crate::analysis::reachability::ReachabilityGraph;
use crate::net::core::{Net, NetError};
use crate::net::observer::{GraphObserver, NetObserver};
use crate::net::structure::{Marking, Tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 交互发生后一旦判定无界，记录一次警告日志。
    pub continuous_boundedness_check: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            continuous_boundedness_check: true,
        }
    }
}

#[derive(Debug)]
pub struct PetriNet {
    net: Net,
    graph: ReachabilityGraph,
    config: EngineConfig,
    in_initial_state: bool,
    unbounded_warning_shown: bool,
}

impl Default for PetriNet {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl PetriNet {
    pub fn new(config: EngineConfig) -> Self {
        let net = Net::empty();
        let graph = ReachabilityGraph::new(net.marking());
        Self {
            net,
            graph,
            config,
            in_initial_state: true,
            unbounded_warning_shown: false,
        }
    }

    pub fn net(&self) -> &Net {
        &self.net
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reachability_graph(&self) -> &ReachabilityGraph {
        &self.graph
    }

    pub fn add_net_observer(&mut self, observer: Box<dyn NetObserver>) {
        self.net.add_observer(observer);
    }

    pub fn add_graph_observer(&mut self, observer: Box<dyn GraphObserver>) {
        self.graph.add_observer(observer);
    }

    pub fn add_place(&mut self, id: &str) -> Result<(), NetError> {
        self.net.add_place(id)?;
        self.init_reachability_graph();
        Ok(())
    }

    pub fn add_transition(&mut self, id: &str) -> Result<(), NetError> {
        self.net.add_transition(id)?;
        Ok(())
    }

    pub fn add_arc(&mut self, id: &str, source: &str, target: &str) -> Result<(), NetError> {
        self.net.add_arc(id, source, target)?;
        Ok(())
    }

    pub fn set_node_name(&mut self, id: &str, name: &str) -> Result<(), NetError> {
        self.net.set_node_name(id, name)
    }

    pub fn set_node_position(&mut self, id: &str, x: i32, y: i32) -> Result<(), NetError> {
        self.net.set_node_position(id, x, y)
    }

    pub fn set_initial_tokens(&mut self, id: &str, tokens: Tokens) -> Result<(), NetError> {
        self.net.set_initial_tokens(id, tokens)?;
        self.init_reachability_graph();
        Ok(())
    }

    pub fn is_transition(&self, id: &str) -> Result<bool, NetError> {
        self.net.is_transition(id)
    }

    /// 当前标识，按库所 id 字母序。
    pub fn marking(&self) -> Marking {
        self.net.marking()
    }

    /// 强制设置当前标识。`marking` 必须已是可达图中的节点，不会产生新边。
    pub fn set_marking(&mut self, marking: &Marking) -> Result<(), NetError> {
        if marking.len() != self.net.places_len() {
            return Err(NetError::InvalidArgument(format!(
                "marking {} has {} entries, net has {} places",
                marking,
                marking.len(),
                self.net.places_len()
            )));
        }
        if *marking == self.net.marking() {
            return Ok(());
        }
        self.graph.ensure_known(marking)?;
        self.net.apply_marking(marking)?;
        self.in_initial_state = self.net.is_in_initial_marking();
        self.graph.marking_changed(marking)
    }

    /// 切换到一个已访问过的标识（视图中选中可达图节点）。
    pub fn set_active_marking(&mut self, marking: &Marking) -> Result<(), NetError> {
        self.graph.ensure_known(marking)?;
        self.set_marking(marking)
    }

    /// 激发迁移并把这次发生记录到可达图。未知 id 或不可发生时返回 `Ok(false)`。
    pub fn trigger_transition(&mut self, id: &str) -> Result<bool, NetError> {
        let old = self.net.marking();
        if !self.net.fire(id)? {
            return Ok(false);
        }
        let new = self.net.marking();
        let label = self
            .net
            .transition(id)
            .map(|transition| transition.label())
            .unwrap_or_else(|| id.to_string());
        self.graph.add_marking(id, &label, &old, &new)?;
        self.in_initial_state = false;

        if self.config.continuous_boundedness_check
            && !self.unbounded_warning_shown
            && !self.graph.is_bounded()
        {
            self.unbounded_warning_shown = true;
            warn!("the net is unbounded");
        }
        Ok(true)
    }

    /// 恢复初始标识。已处于初始状态时不做任何事。
    pub fn reset_places(&mut self) -> Result<(), NetError> {
        if self.in_initial_state {
            return Ok(());
        }
        self.net.reset_tokens();
        self.in_initial_state = true;
        self.graph.marking_changed(&self.net.marking())
    }

    /// 当前标识成为新的初始标识，可达图从这里重新开始。
    pub fn set_current_marking_as_initial(&mut self) {
        self.net.freeze_initial_tokens();
        self.in_initial_state = true;
        self.graph.init(self.net.marking());
    }

    /// 恢复初始标识并清空可达图。
    pub fn init_reachability_graph(&mut self) {
        self.net.reset_tokens();
        self.in_initial_state = true;
        self.graph.init(self.net.marking());
    }

    pub fn is_in_initial_state(&self) -> bool {
        self.in_initial_state
    }

    pub fn is_bounded(&self) -> bool {
        self.graph.is_bounded()
    }

    /// 是否已经记录过本次加载以来的无界警告。
    pub fn unbounded_warning_shown(&self) -> bool {
        self.unbounded_warning_shown
    }

    pub fn active_transition_ids(&self) -> Vec<String> {
        self.net.enabled_transitions()
    }

    /// 初始 token 数加一；网回到（新的）初始状态。
    pub fn add_token(&mut self, id: &str) -> bool {
        if !self.net.adjust_initial_tokens(id, true) {
            return false;
        }
        self.init_reachability_graph();
        true
    }

    /// 初始 token 数减一；库所未知或已经为零时返回 `false`。
    pub fn remove_token(&mut self, id: &str) -> bool {
        let Some(place) = self.net.place(id) else {
            return false;
        };
        if place.initial_tokens() == 0 {
            warn!("place {} has no tokens to remove", id);
            return false;
        }
        if !self.net.adjust_initial_tokens(id, false) {
            return false;
        }
        self.init_reachability_graph();
        true
    }

    /// 清零所有初始 token 数后重新设置给定库所的 token 数（重新加载时使用）。
    pub fn reload_initial_tokens<'a, I>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = (&'a str, Tokens)>,
    {
        self.net.clear_initial_tokens();
        for (id, count) in tokens {
            if let Err(err) = self.net.set_initial_tokens(id, count) {
                warn!("skipping tokens for `{}`: {}", id, err);
            }
        }
        self.unbounded_warning_shown = false;
        self.init_reachability_graph();
        info!("reloaded initial marking {}", self.net.marking());
    }
}
