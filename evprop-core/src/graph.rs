//! Bipartite event graph over listeners and events.
//!
//! Edges point the way events travel:
//! - listener → event: the listener creates the event
//! - event → listener: the listener subscribes, labelled with its tier
//!
//! Subscriptions are stored after tier exclusion, so a listener has at most
//! one subscription edge per event, at its earliest declared tier.
//!
//! The graph borrows every name from the [`CorpusModel`] it was built from.

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{EvpropError, EvpropResult};
use crate::model::{empty_tier_map, CorpusModel, PriorityTier, TierMap};

/// A node of the event graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GraphNode<'a> {
    Listener(&'a str),
    Event(&'a str),
}

impl<'a> GraphNode<'a> {
    pub fn name(self) -> &'a str {
        match self {
            GraphNode::Listener(name) | GraphNode::Event(name) => name,
        }
    }
}

/// Edge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEdge {
    /// listener → event
    Emits,
    /// event → listener
    Subscribes(PriorityTier),
}

/// Summary counts over the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub listeners: usize,
    pub events: usize,
    pub submit_callables: usize,
    pub emit_edges: usize,
    pub subscribe_edges: usize,
    /// Events some listener subscribes to but nobody creates
    pub unproduced_events: Vec<String>,
    /// Events created but never subscribed to
    pub unconsumed_events: Vec<String>,
}

/// Query view over a [`CorpusModel`].
pub struct EventGraph<'a> {
    model: &'a CorpusModel,
    events: BTreeSet<&'a str>,
    graph: DiGraphMap<GraphNode<'a>, GraphEdge>,
}

impl<'a> EventGraph<'a> {
    pub fn build(model: &'a CorpusModel) -> Self {
        let mut graph = DiGraphMap::new();
        let events = model.events();
        for &event in &events {
            graph.add_node(GraphNode::Event(event));
        }

        for (name, listener) in &model.listeners {
            let node = graph.add_node(GraphNode::Listener(name.as_str()));
            for event in &listener.out_events {
                graph.add_edge(node, GraphNode::Event(event.as_str()), GraphEdge::Emits);
            }
            for (tier, subscribed) in listener.effective_in_events() {
                for event in subscribed {
                    graph.add_edge(GraphNode::Event(event), node, GraphEdge::Subscribes(tier));
                }
            }
        }

        Self { model, events, graph }
    }

    pub fn model(&self) -> &'a CorpusModel {
        self.model
    }

    pub fn project_name(&self) -> &'a str {
        &self.model.project_name
    }

    /// Underlying petgraph structure, for exporters.
    pub fn graph(&self) -> &DiGraphMap<GraphNode<'a>, GraphEdge> {
        &self.graph
    }

    fn listener_node(&self, name: &str) -> EvpropResult<GraphNode<'a>> {
        self.model
            .listeners
            .get_key_value(name)
            .map(|(key, _)| GraphNode::Listener(key.as_str()))
            .ok_or_else(|| EvpropError::unknown_listener(name))
    }

    fn event_node(&self, event: &str) -> Option<GraphNode<'a>> {
        self.events.get(event).copied().map(GraphNode::Event)
    }

    /// Listener names in ascending order.
    pub fn all_listeners(&self) -> Vec<&'a str> {
        self.model.listeners.keys().map(String::as_str).collect()
    }

    /// Every event mentioned by any listener, ascending.
    pub fn all_events(&self) -> Vec<&'a str> {
        self.events.iter().copied().collect()
    }

    /// Events the listener subscribes to, per tier, after tier exclusion.
    pub fn in_events(&self, listener: &str) -> EvpropResult<TierMap<Vec<&'a str>>> {
        let node = self.listener_node(listener)?;
        let mut out: TierMap<Vec<&'a str>> = empty_tier_map();
        for source in self.graph.neighbors_directed(node, Direction::Incoming) {
            if let (GraphNode::Event(event), Some(GraphEdge::Subscribes(tier))) =
                (source, self.graph.edge_weight(source, node))
            {
                out.entry(*tier).or_default().push(event);
            }
        }
        out.values_mut().for_each(|events| events.sort_unstable());
        Ok(out)
    }

    /// Events the listener creates, directly or through submit callables.
    pub fn out_events(&self, listener: &str) -> EvpropResult<Vec<&'a str>> {
        let node = self.listener_node(listener)?;
        let mut out: Vec<&'a str> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .filter_map(|n| match n {
                GraphNode::Event(event) => Some(event),
                GraphNode::Listener(_) => None,
            })
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    /// Listeners subscribed to an event, per tier. Unknown events have none.
    pub fn subscribers(&self, event: &str) -> TierMap<Vec<&'a str>> {
        let mut out: TierMap<Vec<&'a str>> = empty_tier_map();
        let Some(node) = self.event_node(event) else {
            return out;
        };
        for target in self.graph.neighbors_directed(node, Direction::Outgoing) {
            if let (GraphNode::Listener(listener), Some(GraphEdge::Subscribes(tier))) =
                (target, self.graph.edge_weight(node, target))
            {
                out.entry(*tier).or_default().push(listener);
            }
        }
        out.values_mut().for_each(|listeners| listeners.sort_unstable());
        out
    }

    /// Listeners creating an event, ascending. Unknown events have none.
    pub fn producers(&self, event: &str) -> Vec<&'a str> {
        let Some(node) = self.event_node(event) else {
            return Vec::new();
        };
        let mut out: Vec<&'a str> = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .filter_map(|n| match n {
                GraphNode::Listener(listener) => Some(listener),
                GraphNode::Event(_) => None,
            })
            .collect();
        out.sort_unstable();
        out
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            listeners: self.model.listeners.len(),
            events: self.events.len(),
            submit_callables: self.model.submit_callables.len(),
            ..GraphStats::default()
        };

        for (_, _, edge) in self.graph.all_edges() {
            match edge {
                GraphEdge::Emits => stats.emit_edges += 1,
                GraphEdge::Subscribes(_) => stats.subscribe_edges += 1,
            }
        }

        for event in &self.events {
            if self.producers(event).is_empty() {
                stats.unproduced_events.push(event.to_string());
            }
            if self.subscribers(event).values().all(Vec::is_empty) {
                stats.unconsumed_events.push(event.to_string());
            }
        }
        stats
    }
}
