//! JSON program loading.
//!
//! A program bundles everything a run needs besides its configuration:
//!
//! ```json
//! {
//!   "graph": { "nodes": ["A", "B"], "edges": [["A", "B"]], "directed": true },
//!   "labels": { "node": ["infected"] },
//!   "ipl": [["infected", "healthy"]],
//!   "facts": [
//!     { "name": "seed", "target": { "node": "B" }, "label": "infected", "bound": [1, 1] }
//!   ],
//!   "rules": [
//!     { "name": "spread", "kind": "node", "target": "infected",
//!       "clauses": [{ "kind": "node", "label": "infected", "bound": [1, 1] }],
//!       "head": { "bound": [1, 1] } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KairosResult, ProgramError};
use crate::facts::Fact;
use crate::graph::{Component, EdgeId, Graph, GraphBuilder, NodeId};
use crate::interval::Interval;
use crate::ipl::Ipl;
use crate::label::{Label, LabelSet};
use crate::reasoner::Reasoner;
use crate::reasoner::config::ReasonerConfig;
use crate::registry::NameRegistry;
use crate::rules::Rule;

fn default_directed() -> bool {
    true
}

/// A value carried by the input graph, turned into a static fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAttribute {
    pub component: Component,
    pub label: Label,
    pub bound: Interval,
}

/// Graph section of a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub edges: Vec<EdgeId>,
    /// Undirected graphs get both edge directions.
    #[serde(default = "default_directed")]
    pub directed: bool,
    /// Flip every edge.
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub attributes: Vec<GraphAttribute>,
}

impl Default for GraphSpec {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            directed: true,
            reverse: false,
            attributes: Vec::new(),
        }
    }
}

impl GraphSpec {
    pub fn build(&self) -> Graph {
        let builder = GraphBuilder::new()
            .directed(self.directed)
            .reverse(self.reverse)
            .nodes(self.nodes.iter().cloned());
        self.edges
            .iter()
            .fold(builder, |b, e| b.edge(e.source.clone(), e.target.clone()))
            .build()
    }

    /// Graph attributes as static, graph-attribute facts at `t = 0`.
    pub fn attribute_facts(&self) -> Vec<Fact> {
        self.attributes
            .iter()
            .map(|a| {
                Fact::new(
                    format!("{}-{}", a.component, a.label),
                    a.component.clone(),
                    a.label.clone(),
                    a.bound,
                )
                .static_fact()
                .from_graph_attribute()
            })
            .collect()
    }
}

/// Everything a run needs besides its [`ReasonerConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Program {
    pub graph: GraphSpec,
    pub labels: LabelSet,
    pub ipl: Ipl,
    pub facts: Vec<Fact>,
    pub rules: Vec<Rule>,
}

impl Program {
    pub fn from_json_str(s: &str) -> Result<Self, ProgramError> {
        serde_json::from_str(s).map_err(|e| ProgramError::Json {
            message: e.to_string(),
        })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProgramError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ProgramError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, ProgramError> {
        serde_json::to_string_pretty(self).map_err(|e| ProgramError::Json {
            message: e.to_string(),
        })
    }

    /// Re-create every node and label name through `registry`, so repeated
    /// names share one allocation.
    pub fn intern_names(&mut self, registry: &NameRegistry) {
        let node = |n: &mut NodeId| *n = registry.node(n.as_str());
        let label = |l: &mut Label| *l = registry.label(l.as_str());
        let component = |c: &mut Component| match c {
            Component::Node(n) => node(n),
            Component::Edge(e) => {
                node(&mut e.source);
                node(&mut e.target);
            }
        };

        self.graph.nodes.iter_mut().for_each(node);
        for e in &mut self.graph.edges {
            node(&mut e.source);
            node(&mut e.target);
        }
        for a in &mut self.graph.attributes {
            component(&mut a.component);
            label(&mut a.label);
        }
        for f in &mut self.facts {
            component(&mut f.target);
            label(&mut f.label);
        }
        for r in &mut self.rules {
            label(&mut r.target);
            r.target_criteria.iter_mut().for_each(|(l, _)| label(l));
            r.clauses.iter_mut().for_each(|c| label(&mut c.label));
            if let Some(l) = r.edge_to_add.as_mut().and_then(|e| e.label.as_mut()) {
                label(l);
            }
        }
    }

    /// Build a reasoner holding this program's graph, rules, facts and IPL.
    ///
    /// Names are interned first. Graph-attribute facts come first; declared
    /// facts follow in order.
    pub fn into_reasoner(mut self, config: ReasonerConfig) -> KairosResult<Reasoner> {
        let registry = NameRegistry::new();
        self.intern_names(&registry);
        tracing::trace!(
            labels = registry.label_count(),
            nodes = registry.node_count(),
            "names interned"
        );
        let graph = self.graph.build();
        let attribute_facts = self.graph.attribute_facts();
        let mut reasoner = Reasoner::new(graph, self.labels, config)?;
        reasoner.set_ipl(self.ipl);
        for fact in attribute_facts.into_iter().chain(self.facts) {
            reasoner.add_fact(fact)?;
        }
        for rule in self.rules {
            reasoner.add_rule(rule)?;
        }
        tracing::debug!(
            rules = reasoner.rules().len(),
            facts = reasoner.facts().len(),
            "program loaded"
        );
        Ok(reasoner)
    }
}
