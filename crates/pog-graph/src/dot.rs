//! DOT export and import.
//!
//! Export goes through petgraph's `Dot` writer with custom attribute
//! getters. Every attribute needed to rebuild the graph is written out,
//! so `from_dot(to_dot(g))` recovers the same nodes, edges and per-edge
//! sequence sets. Sequence labels and the alignment width travel as
//! `//` comments, which Graphviz ignores.

use crate::edge::Edge;
use crate::graph::PoGraph;
use crate::node::GraphNode;
use petgraph::dot::{Config, Dot};
use petgraph::stable_graph::{EdgeReference, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use pog_core::{Distribution, DotConfig, NodeId, PogError, Result, SeqId};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

type Arena = StableDiGraph<GraphNode, Edge>;

impl PoGraph {
    /// Serializes the graph as Graphviz DOT.
    ///
    /// Real nodes are filled with `config.node_color`, or
    /// `config.consensus_color` when on the consensus path. Edges are
    /// labelled with the percentage of sequences that use them and carry
    /// their insertion serial as `order`.
    pub fn to_dot(&self, config: &DotConfig) -> String {
        let total = self.sequence_count();

        let nodes = |_: &Arena, (_, node): (NodeIndex, &GraphNode)| {
            let mut attrs = vec![
                format!("id=\"{}\"", node.id),
                format!("label=\"{}\"", escape(&node.to_string())),
            ];
            if node.id.is_sentinel() {
                attrs.push("shape=box".to_string());
            } else {
                let color = if node.consensus {
                    &config.consensus_color
                } else {
                    &config.node_color
                };
                attrs.push("style=filled".to_string());
                attrs.push(format!("fillcolor=\"{}\"", escape(color)));

                let chars: Vec<String> = node
                    .seq_chars
                    .iter()
                    .map(|(s, c)| format!("{}:{}", s, c))
                    .collect();
                attrs.push(format!("seqs=\"{}\"", escape(&chars.join(","))));
            }
            if let Some(base) = node.base {
                attrs.push(format!("base=\"{}\"", escape(&base.to_string())));
            }
            if let Some(group) = &node.alignment_group {
                let ids: Vec<String> = group.iter().map(NodeId::to_string).collect();
                attrs.push(format!("group=\"{}\"", ids.join(",")));
            }
            if let (true, Some(dist)) = (config.show_distributions, &node.distribution) {
                attrs.push(format!("distribution=\"{}\"", escape(&dist.to_string())));
            }
            if node.consensus {
                attrs.push("consensus=true".to_string());
            }
            attrs.join(", ") + " "
        };

        let edges = |_: &Arena, e: EdgeReference<'_, Edge>| {
            let edge = e.weight();
            let mut attrs = vec![
                format!("label=\"{:.0}%\"", edge.support_fraction(total) * 100.0),
                format!("seqs=\"{}\"", edge),
                format!("order={}", edge.serial),
            ];
            if edge.reciprocated {
                attrs.push("reciprocated=true".to_string());
            } else {
                attrs.push("style=dashed".to_string());
            }
            if edge.consensus {
                attrs.push("consensus=true".to_string());
                attrs.push(format!("color=\"{}\"", escape(&config.consensus_color)));
                attrs.push("penwidth=2".to_string());
            }
            attrs.join(", ") + " "
        };

        let dot = Dot::with_attr_getters(
            &self.graph,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &edges,
            &nodes,
        )
        .to_string();

        let mut header = format!(
            "digraph {{\n    rankdir=\"{}\"\n    // width {}\n",
            escape(&config.rankdir),
            self.width()
        );
        for (id, label) in self.sequences() {
            header.push_str(&format!("    // sequence {} {}\n", id, label.replace('\n', " ")));
        }
        dot.replacen("digraph {\n", &header, 1)
    }

    /// Rebuilds a graph from DOT written by [`PoGraph::to_dot`].
    ///
    /// Node statements may name nodes by arena index (as exported) or by
    /// their identity; the `id` attribute wins when present.
    ///
    /// # Errors
    /// Returns `PogError::Parse` with the offending line for unknown
    /// statements, ill-formed identifiers, real nodes without sequence
    /// characters, and edges naming undeclared nodes.
    pub fn from_dot(text: &str) -> Result<Self> {
        DotParser::new()?.parse(text)
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

struct ParsedEdge {
    line: usize,
    from: String,
    to: String,
    attrs: HashMap<String, String>,
}

/// Line-oriented parser for the DOT subset `to_dot` emits.
struct DotParser {
    node: Regex,
    edge: Regex,
    attr: Regex,
    sequence: Regex,
    width: Regex,
    header: Regex,
    graph_attr: Regex,
}

impl DotParser {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PogError::Parse {
                line: 0,
                message: e.to_string(),
            })
        };
        Ok(Self {
            node: compile(r#"^("[^"]*"|[\w.]+)\s*\[(.*)\]\s*;?$"#)?,
            edge: compile(r#"^("[^"]*"|[\w.]+)\s*->\s*("[^"]*"|[\w.]+)\s*\[(.*)\]\s*;?$"#)?,
            attr: compile(r#"(\w+)\s*=\s*("(?:[^"\\]|\\.)*"|[^\s,\]]+)"#)?,
            sequence: compile(r"^//\s*sequence\s+(\S+)\s?(.*)$")?,
            width: compile(r"^//\s*width\s+(\S+)\s*$")?,
            header: compile(r"^(strict\s+)?(di)?graph\b[^{]*\{$")?,
            graph_attr: compile(r"^\w+\s*=\s*\S+\s*;?$")?,
        })
    }

    fn attributes(&self, body: &str) -> HashMap<String, String> {
        self.attr
            .captures_iter(body)
            .map(|cap| (cap[1].to_string(), unescape(unquote(&cap[2]))))
            .collect()
    }

    fn parse(&self, text: &str) -> Result<PoGraph> {
        let mut width: Option<usize> = None;
        let mut labels: BTreeMap<SeqId, String> = BTreeMap::new();
        let mut nodes: Vec<(usize, String, HashMap<String, String>)> = Vec::new();
        let mut edges: Vec<ParsedEdge> = Vec::new();

        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let stmt = raw.trim();

            if let Some(cap) = self.sequence.captures(stmt) {
                let id = parse_seq_id(&cap[1], line)?;
                labels.insert(id, cap[2].to_string());
            } else if let Some(cap) = self.width.captures(stmt) {
                let value = cap[1].parse::<usize>().map_err(|_| PogError::Parse {
                    line,
                    message: format!("invalid width '{}'", &cap[1]),
                })?;
                width = Some(value);
            } else if let Some(cap) = self.edge.captures(stmt) {
                edges.push(ParsedEdge {
                    line,
                    from: unquote(&cap[1]).to_string(),
                    to: unquote(&cap[2]).to_string(),
                    attrs: self.attributes(&cap[3]),
                });
            } else if let Some(cap) = self.node.captures(stmt) {
                nodes.push((line, unquote(&cap[1]).to_string(), self.attributes(&cap[2])));
            } else if stmt.is_empty()
                || stmt == "}"
                || stmt.starts_with("//")
                || self.header.is_match(stmt)
                || self.graph_attr.is_match(stmt)
            {
                continue;
            } else {
                return Err(PogError::Parse {
                    line,
                    message: format!("unrecognized statement '{}'", stmt),
                });
            }
        }

        let mut graph = PoGraph::new(0);
        let mut tokens: HashMap<String, NodeIndex> = HashMap::new();
        let mut max_column: Option<usize> = None;

        for (line, token, attrs) in nodes {
            let id_text = attrs.get("id").map(String::as_str).unwrap_or(&token);
            let id = parse_node_id(id_text, line)?;
            let node = build_node(id, &attrs, line)?;

            for seq in node.seq_chars.keys() {
                labels.entry(*seq).or_insert_with(|| seq.to_string());
            }
            if let Some(column) = id.column() {
                max_column = max_column.max(Some(column));
            }

            let index = if id.is_sentinel() {
                let index = graph.index_of(id)?;
                graph.graph[index].consensus = node.consensus;
                index
            } else {
                if graph.contains(id) {
                    return Err(PogError::Parse {
                        line,
                        message: format!("node {} declared twice", id),
                    });
                }
                graph.add_node(node)
            };
            tokens.insert(token, index);
        }

        // Arena slots are reused after removals, so the written order of
        // edges is not their insertion order; `order` restores it.
        let mut ordered = Vec::with_capacity(edges.len());
        for parsed in edges {
            let order = match parsed.attrs.get("order") {
                Some(text) => Some(text.parse::<u64>().map_err(|_| PogError::Parse {
                    line: parsed.line,
                    message: format!("invalid edge order '{}'", text),
                })?),
                None => None,
            };
            ordered.push((order, parsed));
        }
        ordered.sort_by_key(|(order, parsed)| (*order, parsed.line));

        for (_, parsed) in ordered {
            let line = parsed.line;
            let lookup = |token: &str| {
                tokens.get(token).copied().ok_or_else(|| PogError::Parse {
                    line,
                    message: format!("edge names undeclared node '{}'", token),
                })
            };
            let from = lookup(&parsed.from)?;
            let to = lookup(&parsed.to)?;

            let seqs = parse_seq_list(parsed.attrs.get("seqs").map(String::as_str).unwrap_or(""), line)?;
            for seq in &seqs {
                labels.entry(*seq).or_insert_with(|| seq.to_string());
            }

            let index = graph.link(from, to);
            let edge = &mut graph.graph[index];
            edge.seqs.extend(seqs);
            edge.reciprocated |= flag(&parsed.attrs, "reciprocated");
            edge.consensus |= flag(&parsed.attrs, "consensus");
        }

        for (id, label) in labels {
            graph.register_sequence(id, label)?;
        }
        graph.set_width(width.unwrap_or_else(|| max_column.map_or(0, |c| c + 1)));

        debug!(
            "parsed DOT graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

fn build_node(id: NodeId, attrs: &HashMap<String, String>, line: usize) -> Result<GraphNode> {
    let mut node = GraphNode::new(id);
    node.consensus = flag(attrs, "consensus");
    if id.is_sentinel() {
        return Ok(node);
    }

    for entry in attrs.get("seqs").map(String::as_str).unwrap_or("").split(',') {
        if entry.is_empty() {
            continue;
        }
        let (seq, c) = entry.split_once(':').ok_or_else(|| PogError::Parse {
            line,
            message: format!("malformed sequence character '{}'", entry),
        })?;
        node.seq_chars.insert(parse_seq_id(seq, line)?, single_char(c, line)?);
    }
    if node.seq_chars.is_empty() {
        return Err(PogError::Parse {
            line,
            message: format!("node {} has no sequence characters", id),
        });
    }

    if let Some(base) = attrs.get("base") {
        node.base = Some(single_char(base, line)?);
    }
    if let Some(group) = attrs.get("group") {
        let ids = group
            .split(',')
            .filter(|s| !s.is_empty())
            .map(|s| parse_node_id(s, line))
            .collect::<Result<BTreeSet<NodeId>>>()?;
        node.alignment_group = Some(ids);
    }
    if let Some(dist) = attrs.get("distribution") {
        let dist: Distribution = dist.parse().map_err(|e: PogError| PogError::Parse {
            line,
            message: e.to_string(),
        })?;
        node.distribution = Some(dist);
    }
    Ok(node)
}

fn flag(attrs: &HashMap<String, String>, key: &str) -> bool {
    attrs.get(key).map(|v| v == "true").unwrap_or(false)
}

fn single_char(text: &str, line: usize) -> Result<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(PogError::Parse {
            line,
            message: format!("expected a single character, found '{}'", text),
        }),
    }
}

fn parse_node_id(text: &str, line: usize) -> Result<NodeId> {
    text.trim().parse::<NodeId>().map_err(|_| PogError::Parse {
        line,
        message: format!("invalid node identifier '{}'", text),
    })
}

fn parse_seq_id(text: &str, line: usize) -> Result<SeqId> {
    text.trim().parse::<SeqId>().map_err(|_| PogError::Parse {
        line,
        message: format!("invalid sequence identifier '{}'", text),
    })
}

fn parse_seq_list(text: &str, line: usize) -> Result<BTreeSet<SeqId>> {
    text.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_seq_id(s, line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pog_core::{AlignedSequence, ConsensusConfig, PogConfig, Residue, TransitionRecord};

    fn make_graph(rows: &[(SeqId, &str)]) -> PoGraph {
        let rows: Vec<AlignedSequence> = rows
            .iter()
            .map(|(id, s)| AlignedSequence::new(*id, format!("seq{}", id), s))
            .collect();
        PoGraph::from_alignment(&rows).unwrap()
    }

    type EdgeSet = BTreeSet<(NodeId, NodeId, Vec<SeqId>)>;

    fn edge_set(graph: &PoGraph) -> EdgeSet {
        graph
            .edges()
            .into_iter()
            .map(|(from, to, e)| (from, to, e.seqs.iter().copied().collect()))
            .collect()
    }

    #[test]
    fn test_export_contents() {
        let mut graph = make_graph(&[(1, "AC"), (2, "AG"), (3, "A-")]);
        graph.consensus(&ConsensusConfig::default());
        let dot = graph.to_dot(&DotConfig::default());

        assert!(dot.starts_with("digraph {\n    rankdir=\"LR\"\n"));
        assert!(dot.contains("// sequence 2 seq2"));
        assert!(dot.contains("// width 2"));
        assert!(dot.contains("id=\"0\", label=\"A\""));
        assert!(dot.contains("seqs=\"1:C,2:G\""));
        assert!(dot.contains("label=\"33%\""));
        assert!(dot.contains("label=\"67%\""));
        assert!(dot.contains("label=\"100%\""));
        assert!(dot.contains("fillcolor=\"#f5b971\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn test_round_trip() {
        let mut graph = make_graph(&[(1, "AC-T"), (2, "A-GT"), (3, "ACGT"), (4, "-CG-")]);
        graph.remove_node(NodeId::Pos(2), &PogConfig::default()).unwrap();
        graph.consensus(&ConsensusConfig::default());

        let config = DotConfig::default();
        let first = graph.to_dot(&config);
        let parsed = PoGraph::from_dot(&first).unwrap();
        let second = parsed.to_dot(&config);
        let reparsed = PoGraph::from_dot(&second).unwrap();

        assert_eq!(parsed.node_ids(), graph.node_ids());
        assert_eq!(edge_set(&parsed), edge_set(&graph));
        assert_eq!(reparsed.node_ids(), graph.node_ids());
        assert_eq!(edge_set(&reparsed), edge_set(&graph));
        assert_eq!(parsed.sequences(), graph.sequences());
        assert_eq!(parsed.width(), 4);

        for id in graph.node_ids() {
            assert_eq!(parsed.get(id).unwrap().seq_chars, graph.get(id).unwrap().seq_chars);
            assert_eq!(parsed.get(id).unwrap().consensus, graph.get(id).unwrap().consensus);
        }
        for seq in [1, 2, 3, 4] {
            assert_eq!(parsed.sequence(seq, true).unwrap(), graph.sequence(seq, true).unwrap());
        }
    }

    #[test]
    fn test_round_trip_keeps_insertion_order() {
        // The bridge 0 -> 2 is the newest edge but lands in a freed slot.
        let mut graph = make_graph(&[(1, "ACG")]);
        graph.remove_node(NodeId::Pos(1), &PogConfig::default()).unwrap();

        let by_serial = |g: &PoGraph| {
            let mut edges: Vec<(u64, NodeId, NodeId)> = g
                .edges()
                .into_iter()
                .map(|(from, to, e)| (e.serial, from, to))
                .collect();
            edges.sort();
            edges.into_iter().map(|(_, from, to)| (from, to)).collect::<Vec<_>>()
        };

        let parsed = PoGraph::from_dot(&graph.to_dot(&DotConfig::default())).unwrap();
        assert_eq!(by_serial(&parsed), by_serial(&graph));
        assert_eq!(
            by_serial(&graph).last(),
            Some(&(NodeId::Pos(0), NodeId::Pos(2)))
        );
    }

    #[test]
    fn test_round_trip_inference_graph() {
        use NodeId::{End, Pos, Start};
        let records = vec![
            TransitionRecord::new(Start, Residue::Absent, [Pos(0)]),
            TransitionRecord::new(Pos(0), Residue::Base('M'), [Start, Pos(1), Pos(2)]),
            TransitionRecord::new(Pos(1), Residue::Base('K'), [Pos(0), End]),
            TransitionRecord::new(Pos(2), Residue::Base('R'), [End]),
        ];
        let mut graph = PoGraph::from_inference(&records, 7, "N7").unwrap();
        graph.set_distribution(
            graph.focus(Pos(1)).unwrap(),
            Distribution::categorical([('K', 0.9), ('R', 0.1)]),
        )
        .unwrap();

        let config = DotConfig {
            show_distributions: true,
            ..DotConfig::default()
        };
        let parsed = PoGraph::from_dot(&graph.to_dot(&config)).unwrap();

        assert!(parsed.edge(Pos(0), Pos(1)).unwrap().reciprocated);
        assert!(!parsed.edge(Pos(0), Pos(2)).unwrap().reciprocated);
        assert_eq!(parsed.get(Pos(2)).unwrap().base, Some('R'));
        assert_eq!(
            parsed.get(Pos(1)).unwrap().distribution,
            graph.get(Pos(1)).unwrap().distribution
        );
        assert_eq!(parsed.sequences().get(&7).map(String::as_str), Some("N7"));
    }

    #[test]
    fn test_parse_by_identity() {
        let text = r#"digraph {
    start [ id="start" ]
    "0" [ seqs="5:A" ]
    end [ id="end" ]
    start -> "0" [ seqs="5" ]
    "0" -> end [ seqs="5" ]
}"#;
        let graph = PoGraph::from_dot(text).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.width(), 1);
        assert_eq!(graph.sequence(5, false).unwrap(), "A");
        assert_eq!(graph.get(NodeId::Pos(0)).unwrap().base, None);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let bad_id = "digraph {\n    0 [ id=\"x1\", seqs=\"1:A\" ]\n}";
        assert!(matches!(
            PoGraph::from_dot(bad_id),
            Err(PogError::Parse { line: 2, .. })
        ));

        let bad_seq = "digraph {\n    0 [ id=\"0\", seqs=\"one:A\" ]\n}";
        assert!(matches!(
            PoGraph::from_dot(bad_seq),
            Err(PogError::Parse { line: 2, .. })
        ));

        let empty_node = "digraph {\n    0 [ id=\"0\" ]\n}";
        assert!(matches!(
            PoGraph::from_dot(empty_node),
            Err(PogError::Parse { line: 2, .. })
        ));

        let dangling = "digraph {\n    0 [ id=\"0\", seqs=\"1:A\" ]\n    0 -> 9 [ seqs=\"1\" ]\n}";
        assert!(matches!(
            PoGraph::from_dot(dangling),
            Err(PogError::Parse { line: 3, .. })
        ));

        let bad_order = "digraph {\n    0 [ id=\"0\", seqs=\"1:A\" ]\n    0 -> 0 [ seqs=\"1\", order=x ]\n}";
        assert!(matches!(
            PoGraph::from_dot(bad_order),
            Err(PogError::Parse { line: 3, .. })
        ));

        let garbage = "digraph {\n    what is this\n}";
        assert!(matches!(
            PoGraph::from_dot(garbage),
            Err(PogError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_escape_round_trip() {
        assert_eq!(unescape(&escape(r#"a"b\c"#)), r#"a"b\c"#);
        assert_eq!(unquote(r#""ab\"""#), r#"ab\""#);
        assert_eq!(unquote("plain"), "plain");
    }
}
