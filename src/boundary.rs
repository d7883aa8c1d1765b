use crate::error::{Error, Result};
use crate::node::Node;

/// Whether a boundary is an open (elevation-specified) boundary or a land boundary with its
/// ADCIRC type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoundaryKind {
    #[default]
    Open,
    Land(i32),
}

/// Shape of the per-node records of a boundary, derived from its type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryLayout {
    /// Node id only.
    Plain,
    /// Node id, crest elevation and supercritical weir coefficient (codes 3, 13, 23).
    ExternalWeir,
    /// Node pair, crest elevation, subcritical and supercritical coefficients (codes 4, 24).
    InternalWeir,
    /// [`BoundaryLayout::InternalWeir`] plus pipe height, coefficient and diameter (codes 5, 25).
    InternalWeirWithPipes,
}

impl BoundaryLayout {
    pub fn from_code(code: i32) -> Self {
        match code {
            3 | 13 | 23 => Self::ExternalWeir,
            4 | 24 => Self::InternalWeir,
            5 | 25 => Self::InternalWeirWithPipes,
            _ => Self::Plain,
        }
    }

    /// Returns `true` if every record references a second node on the other side of a barrier.
    pub fn is_paired(&self) -> bool {
        matches!(self, Self::InternalWeir | Self::InternalWeirWithPipes)
    }

    /// Number of whitespace separated fields on a record line.
    pub fn field_count(&self) -> usize {
        match self {
            Self::Plain => 1,
            Self::ExternalWeir => 3,
            Self::InternalWeir => 5,
            Self::InternalWeirWithPipes => 8,
        }
    }
}

impl BoundaryKind {
    /// ADCIRC type code, `None` for open boundaries.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Open => None,
            Self::Land(code) => Some(*code),
        }
    }

    pub fn layout(&self) -> BoundaryLayout {
        match self {
            Self::Open => BoundaryLayout::Plain,
            Self::Land(code) => BoundaryLayout::from_code(*code),
        }
    }
}

/// One record of a boundary, with node indices into the mesh's node array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryNode {
    Plain {
        node: usize,
    },
    ExternalWeir {
        node: usize,
        crest_elevation: f64,
        supercritical: f64,
    },
    InternalWeir {
        node: usize,
        paired: usize,
        crest_elevation: f64,
        subcritical: f64,
        supercritical: f64,
    },
    InternalWeirWithPipes {
        node: usize,
        paired: usize,
        crest_elevation: f64,
        subcritical: f64,
        supercritical: f64,
        pipe_height: f64,
        pipe_coefficient: f64,
        pipe_diameter: f64,
    },
}

impl BoundaryNode {
    pub fn layout(&self) -> BoundaryLayout {
        match self {
            Self::Plain { .. } => BoundaryLayout::Plain,
            Self::ExternalWeir { .. } => BoundaryLayout::ExternalWeir,
            Self::InternalWeir { .. } => BoundaryLayout::InternalWeir,
            Self::InternalWeirWithPipes { .. } => BoundaryLayout::InternalWeirWithPipes,
        }
    }

    pub fn node(&self) -> usize {
        match *self {
            Self::Plain { node }
            | Self::ExternalWeir { node, .. }
            | Self::InternalWeir { node, .. }
            | Self::InternalWeirWithPipes { node, .. } => node,
        }
    }

    pub fn paired(&self) -> Option<usize> {
        match *self {
            Self::InternalWeir { paired, .. } | Self::InternalWeirWithPipes { paired, .. } => {
                Some(paired)
            }
            _ => None,
        }
    }
}

/// An ordered sequence of boundary nodes.
///
/// Attributes are stored column-wise. A column is empty unless the boundary layout carries
/// it, in which case it has exactly one entry per node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boundary {
    kind: BoundaryKind,
    nodes: Vec<usize>,
    paired: Vec<usize>,
    crest_elevation: Vec<f64>,
    subcritical: Vec<f64>,
    supercritical: Vec<f64>,
    pipe_height: Vec<f64>,
    pipe_coefficient: Vec<f64>,
    pipe_diameter: Vec<f64>,
}

impl Boundary {
    pub fn new(kind: BoundaryKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Creates an open boundary through `nodes`.
    pub fn open(nodes: Vec<usize>) -> Self {
        Self {
            kind: BoundaryKind::Open,
            nodes,
            ..Default::default()
        }
    }

    /// Creates a land boundary without per-node attributes.
    pub fn land(code: i32, nodes: Vec<usize>) -> Result<Self> {
        if BoundaryLayout::from_code(code) != BoundaryLayout::Plain {
            return Err(Error::InvalidBoundary(format!(
                "land boundary type {code} needs per-node weir attributes"
            )));
        }
        Ok(Self {
            kind: BoundaryKind::Land(code),
            nodes,
            ..Default::default()
        })
    }

    pub fn kind(&self) -> BoundaryKind {
        self.kind
    }

    pub fn layout(&self) -> BoundaryLayout {
        self.kind().layout()
    }

    pub fn is_open(&self) -> bool {
        self.kind() == BoundaryKind::Open
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of mesh nodes referenced, counting both sides of paired records.
    pub fn node_count(&self) -> usize {
        self.nodes.len() + self.paired.len()
    }

    /// Appends a record, which must match the boundary's layout.
    pub fn push(&mut self, record: BoundaryNode) -> Result<()> {
        if record.layout() != self.layout() {
            return Err(Error::InvalidBoundary(format!(
                "a {:?} record cannot be added to a {:?} boundary",
                record.layout(),
                self.layout()
            )));
        }
        match record {
            BoundaryNode::Plain { node } => self.nodes.push(node),
            BoundaryNode::ExternalWeir {
                node,
                crest_elevation,
                supercritical,
            } => {
                self.nodes.push(node);
                self.crest_elevation.push(crest_elevation);
                self.supercritical.push(supercritical);
            }
            BoundaryNode::InternalWeir {
                node,
                paired,
                crest_elevation,
                subcritical,
                supercritical,
            } => {
                self.nodes.push(node);
                self.paired.push(paired);
                self.crest_elevation.push(crest_elevation);
                self.subcritical.push(subcritical);
                self.supercritical.push(supercritical);
            }
            BoundaryNode::InternalWeirWithPipes {
                node,
                paired,
                crest_elevation,
                subcritical,
                supercritical,
                pipe_height,
                pipe_coefficient,
                pipe_diameter,
            } => {
                self.nodes.push(node);
                self.paired.push(paired);
                self.crest_elevation.push(crest_elevation);
                self.subcritical.push(subcritical);
                self.supercritical.push(supercritical);
                self.pipe_height.push(pipe_height);
                self.pipe_coefficient.push(pipe_coefficient);
                self.pipe_diameter.push(pipe_diameter);
            }
        }
        Ok(())
    }

    /// Record `i`.
    pub fn get(&self, i: usize) -> Result<BoundaryNode> {
        let node = self.node(i)?;
        Ok(match self.layout() {
            BoundaryLayout::Plain => BoundaryNode::Plain { node },
            BoundaryLayout::ExternalWeir => BoundaryNode::ExternalWeir {
                node,
                crest_elevation: self.crest_elevation[i],
                supercritical: self.supercritical[i],
            },
            BoundaryLayout::InternalWeir => BoundaryNode::InternalWeir {
                node,
                paired: self.paired[i],
                crest_elevation: self.crest_elevation[i],
                subcritical: self.subcritical[i],
                supercritical: self.supercritical[i],
            },
            BoundaryLayout::InternalWeirWithPipes => BoundaryNode::InternalWeirWithPipes {
                node,
                paired: self.paired[i],
                crest_elevation: self.crest_elevation[i],
                subcritical: self.subcritical[i],
                supercritical: self.supercritical[i],
                pipe_height: self.pipe_height[i],
                pipe_coefficient: self.pipe_coefficient[i],
                pipe_diameter: self.pipe_diameter[i],
            },
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = BoundaryNode> + '_ {
        (0..self.len()).filter_map(|i| self.get(i).ok())
    }

    /// Node indices of the records, first side only.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Node indices on the other side of paired records, empty for unpaired layouts.
    pub fn paired_nodes(&self) -> &[usize] {
        &self.paired
    }

    pub fn node(&self, i: usize) -> Result<usize> {
        column("boundary node", &self.nodes, i)
    }

    pub fn paired_node(&self, i: usize) -> Result<usize> {
        column("paired boundary node", &self.paired, i)
    }

    pub fn crest_elevation(&self, i: usize) -> Result<f64> {
        column("crest elevation", &self.crest_elevation, i)
    }

    pub fn subcritical_coefficient(&self, i: usize) -> Result<f64> {
        column("subcritical weir coefficient", &self.subcritical, i)
    }

    pub fn supercritical_coefficient(&self, i: usize) -> Result<f64> {
        column("supercritical weir coefficient", &self.supercritical, i)
    }

    pub fn pipe_height(&self, i: usize) -> Result<f64> {
        column("pipe height", &self.pipe_height, i)
    }

    pub fn pipe_coefficient(&self, i: usize) -> Result<f64> {
        column("pipe coefficient", &self.pipe_coefficient, i)
    }

    pub fn pipe_diameter(&self, i: usize) -> Result<f64> {
        column("pipe diameter", &self.pipe_diameter, i)
    }

    pub fn set_crest_elevation(&mut self, i: usize, value: f64) -> Result<()> {
        set_column("crest elevation", &mut self.crest_elevation, i, value)
    }

    pub fn set_subcritical_coefficient(&mut self, i: usize, value: f64) -> Result<()> {
        set_column(
            "subcritical weir coefficient",
            &mut self.subcritical,
            i,
            value,
        )
    }

    pub fn set_supercritical_coefficient(&mut self, i: usize, value: f64) -> Result<()> {
        set_column(
            "supercritical weir coefficient",
            &mut self.supercritical,
            i,
            value,
        )
    }

    pub fn set_pipe_height(&mut self, i: usize, value: f64) -> Result<()> {
        set_column("pipe height", &mut self.pipe_height, i, value)
    }

    pub fn set_pipe_coefficient(&mut self, i: usize, value: f64) -> Result<()> {
        set_column("pipe coefficient", &mut self.pipe_coefficient, i, value)
    }

    pub fn set_pipe_diameter(&mut self, i: usize, value: f64) -> Result<()> {
        set_column("pipe diameter", &mut self.pipe_diameter, i, value)
    }

    /// Returns `true` if `node` appears on either side of a record.
    pub(crate) fn references(&self, node: usize) -> bool {
        self.nodes.contains(&node) || self.paired.contains(&node)
    }

    /// Lowers every node index above `removed` by one.
    pub(crate) fn shift_nodes_after(&mut self, removed: usize) {
        self.nodes
            .iter_mut()
            .chain(&mut self.paired)
            .filter(|n| **n > removed)
            .for_each(|n| *n -= 1);
    }

    /// Checks that every referenced node index is below `num_nodes`.
    pub(crate) fn validate(&self, num_nodes: usize) -> Result<()> {
        match self
            .nodes
            .iter()
            .chain(&self.paired)
            .find(|&&n| n >= num_nodes)
        {
            Some(&n) => Err(Error::InvalidBoundary(format!(
                "node index {n} out of bounds (mesh has {num_nodes} nodes)"
            ))),
            None => Ok(()),
        }
    }

    /// Formats the boundary as lines of an ADCIRC ASCII mesh: a header with the record count
    /// (and type code for land boundaries) followed by one line per record.
    ///
    /// Crest elevations, weir coefficients and pipe attributes are written with four decimals,
    /// like projected node coordinates, so finer values are rounded.
    pub fn to_adcirc_lines(&self, nodes: &[Node]) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.len() + 1);
        match self.kind() {
            BoundaryKind::Open => lines.push(format!("{}", self.len())),
            BoundaryKind::Land(code) => lines.push(format!("{} {}", self.len(), code)),
        }
        lines.extend(self.iter().map(|record| format_record(&record, nodes)));
        lines
    }
}

fn format_record(record: &BoundaryNode, nodes: &[Node]) -> String {
    match *record {
        BoundaryNode::Plain { node } => format!("{:>11}", nodes[node].id),
        BoundaryNode::ExternalWeir {
            node,
            crest_elevation,
            supercritical,
        } => format!(
            "{:>11} {:>14.4} {:>14.4}",
            nodes[node].id, crest_elevation, supercritical
        ),
        BoundaryNode::InternalWeir {
            node,
            paired,
            crest_elevation,
            subcritical,
            supercritical,
        } => format!(
            "{:>11} {:>11} {:>14.4} {:>14.4} {:>14.4}",
            nodes[node].id, nodes[paired].id, crest_elevation, subcritical, supercritical
        ),
        BoundaryNode::InternalWeirWithPipes {
            node,
            paired,
            crest_elevation,
            subcritical,
            supercritical,
            pipe_height,
            pipe_coefficient,
            pipe_diameter,
        } => format!(
            "{:>11} {:>11} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4}",
            nodes[node].id,
            nodes[paired].id,
            crest_elevation,
            subcritical,
            supercritical,
            pipe_height,
            pipe_coefficient,
            pipe_diameter
        ),
    }
}

fn column<T: Copy>(what: &'static str, values: &[T], i: usize) -> Result<T> {
    values
        .get(i)
        .copied()
        .ok_or_else(|| Error::out_of_bounds(what, i, values.len()))
}

fn set_column<T>(what: &'static str, values: &mut [T], i: usize, value: T) -> Result<()> {
    let len = values.len();
    let slot = values
        .get_mut(i)
        .ok_or_else(|| Error::out_of_bounds(what, i, len))?;
    *slot = value;
    Ok(())
}
