//! Flattened, indexable projection of the channel tree for display.
//!
//! GUI widgets cannot walk the forwarder's arena directly; they need
//! stable row/column indexing and parent/child navigation. [`TreeModel`]
//! provides that as a read-only snapshot: a flat node vector with
//! parent/child links, rebuilt atomically by [`TreeModel::rebuild`] after
//! any structural mutation of the forwarder. A generation counter lets
//! callers detect stale indices across rebuilds.
//!
//! The model also exposes the per-node enabled bit and writes toggles
//! through to the underlying entity (pushing a config update for open
//! masters).

use std::fmt;

use chanfwd_core::error::Result;

use crate::forwarder::Forwarder;
use crate::tree::{ChannelId, MasterId};

/// Number of display columns: name, rate-or-bandwidth, type, frequency.
pub const COLUMN_COUNT: usize = 4;

/// What a tree node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The invisible root.
    Root,
    /// A master channel row.
    Master(MasterId),
    /// A sub-channel row.
    Channel(ChannelId),
}

/// One node of the flattened tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// What this node stands for.
    pub kind: NodeKind,
    /// Index of the parent node; `None` for the root.
    pub parent: Option<usize>,
    /// Row of this node within its parent.
    pub index_in_parent: usize,
    /// Child node indices in display order.
    pub children: Vec<usize>,
}

/// One display cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Nothing to display.
    Empty,
    /// Free-form text.
    Text(String),
    /// A frequency or bandwidth in hertz.
    Hertz(f64),
    /// A sample rate in samples per second.
    Rate(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Hertz(v) => write!(f, "{v} Hz"),
            Cell::Rate(v) => write!(f, "{v} sps"),
        }
    }
}

/// Read-only, flattened projection of the forwarder's channel tree.
pub struct TreeModel {
    nodes: Vec<TreeNode>,
    root: usize,
    generation: u64,
}

impl TreeModel {
    /// Build a model from the forwarder's current tree.
    pub fn new(forwarder: &Forwarder) -> Self {
        let mut model = TreeModel {
            nodes: Vec::new(),
            root: 0,
            generation: 0,
        };
        model.rebuild(forwarder);
        model
    }

    /// Rebuild the projection after a structural mutation.
    ///
    /// The whole node vector is replaced in one step and the generation
    /// counter bumped; indices from before the rebuild must not be reused.
    pub fn rebuild(&mut self, forwarder: &Forwarder) {
        self.nodes.clear();
        self.nodes.push(TreeNode {
            kind: NodeKind::Root,
            parent: None,
            index_in_parent: 0,
            children: Vec::new(),
        });
        self.root = 0;

        for (master_id, _) in forwarder.tree().masters() {
            let master_idx = self.nodes.len();
            let row = self.nodes[self.root].children.len();
            self.nodes.push(TreeNode {
                kind: NodeKind::Master(master_id),
                parent: Some(self.root),
                index_in_parent: row,
                children: Vec::new(),
            });
            self.nodes[self.root].children.push(master_idx);

            for channel_id in forwarder.tree().channel_ids_of(master_id) {
                let channel_idx = self.nodes.len();
                let row = self.nodes[master_idx].children.len();
                self.nodes.push(TreeNode {
                    kind: NodeKind::Channel(channel_id),
                    parent: Some(master_idx),
                    index_in_parent: row,
                    children: Vec::new(),
                });
                self.nodes[master_idx].children.push(channel_idx);
            }
        }

        self.generation += 1;
    }

    /// Rebuild counter; bumped on every [`rebuild`](TreeModel::rebuild).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index of the root node.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Look up a node by index.
    pub fn node(&self, index: usize) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Number of child rows under a node.
    pub fn row_count(&self, index: usize) -> usize {
        self.nodes.get(index).map(|n| n.children.len()).unwrap_or(0)
    }

    /// Child node index at the given row, if any.
    pub fn child(&self, index: usize, row: usize) -> Option<usize> {
        self.nodes.get(index)?.children.get(row).copied()
    }

    /// Parent node index, `None` for the root.
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.nodes.get(index)?.parent
    }

    /// Number of display columns.
    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    /// Column header text.
    pub fn header(column: usize) -> &'static str {
        match column {
            0 => "Name",
            1 => "Rate / Bandwidth",
            2 => "Type",
            3 => "Frequency",
            _ => "",
        }
    }

    /// Display value at `(node, column)`.
    ///
    /// Master rows show their bandwidth in the rate column; channel rows
    /// show the analyzer-reported sample rate once open and the configured
    /// output rate before. Stale indices yield [`Cell::Empty`].
    pub fn cell(&self, forwarder: &Forwarder, index: usize, column: usize) -> Cell {
        let Some(node) = self.nodes.get(index) else {
            return Cell::Empty;
        };

        match node.kind {
            NodeKind::Root => Cell::Empty,
            NodeKind::Master(id) => {
                let Some(master) = forwarder.master(id) else {
                    return Cell::Empty;
                };
                match column {
                    0 => Cell::Text(master.name.clone()),
                    1 => Cell::Hertz(master.bandwidth),
                    2 => Cell::Text("multicarrier".to_string()),
                    3 => Cell::Hertz(master.frequency),
                    _ => Cell::Empty,
                }
            }
            NodeKind::Channel(id) => {
                let Some(channel) = forwarder.channel(id) else {
                    return Cell::Empty;
                };
                match column {
                    0 => Cell::Text(channel.name.clone()),
                    1 => {
                        if channel.samp_rate > 0.0 {
                            Cell::Rate(channel.samp_rate)
                        } else {
                            Cell::Rate(channel.output_rate as f64)
                        }
                    }
                    2 => Cell::Text(channel.demod.to_string()),
                    3 => {
                        let parent_freq = forwarder
                            .master(channel.parent)
                            .map(|m| m.frequency)
                            .unwrap_or(0.0);
                        Cell::Hertz(parent_freq + channel.offset)
                    }
                    _ => Cell::Empty,
                }
            }
        }
    }

    /// The node's enabled bit: the entity flag for masters, the consumer
    /// flag for channels. `None` for the root or stale indices.
    pub fn is_enabled(&self, forwarder: &Forwarder, index: usize) -> Option<bool> {
        match self.nodes.get(index)?.kind {
            NodeKind::Root => None,
            NodeKind::Master(id) => forwarder.master(id).map(|m| m.enabled),
            NodeKind::Channel(id) => forwarder.channel(id).map(|c| c.consumer.is_enabled()),
        }
    }

    /// Write an enabled toggle through to the underlying entity.
    ///
    /// Master toggles push a config update to the analyzer when the master
    /// is open; channel toggles reach the consumer's `set_enabled`.
    pub fn set_enabled(
        &self,
        forwarder: &mut Forwarder,
        index: usize,
        enabled: bool,
    ) -> Result<()> {
        let Some(node) = self.nodes.get(index) else {
            return Ok(());
        };
        match node.kind {
            NodeKind::Root => Ok(()),
            NodeKind::Master(id) => forwarder.set_master_enabled(id, enabled),
            NodeKind::Channel(id) => {
                forwarder.set_channel_enabled(id, enabled);
                Ok(())
            }
        }
    }
}
