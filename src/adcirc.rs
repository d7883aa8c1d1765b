//! ADCIRC ASCII mesh files (`fort.14`) and Aquaveo 2dm export.
//!
//! An ADCIRC mesh is laid out as:
//!
//! ```text
//! title
//! <#elements> <#nodes>
//! <id> <x> <y> <z>                      one line per node
//! <id> <#vertices> <v1> <v2> <v3> [v4]  one line per element
//! <#open boundaries>
//! <#open boundary nodes>
//! <#nodes>                              then one node id per line, per open boundary
//! <#land boundaries>
//! <#land boundary nodes>
//! <#nodes> <type>                       then one record per line, per land boundary
//! ```
//!
//! Fields after the ones listed are ignored, so trailing comments on count lines are accepted.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::boundary::{Boundary, BoundaryKind, BoundaryLayout, BoundaryNode};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::id_index::IdIndex;
use crate::mesh::Mesh;
use crate::node::Node;

/// Upper bound on the capacity reserved from a count read in the file.
const MAX_RESERVED: usize = 1 << 16;

/// Reads an ADCIRC mesh file.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Mesh> {
    let path = path.as_ref();
    let mesh = read(BufReader::new(File::open(path)?))?;
    debug!("read mesh {}", path.display());
    Ok(mesh)
}

/// Reads an ADCIRC mesh.
///
/// The mesh keeps the default geographic coordinate system since the format does not record
/// one. A file ending right after the element table yields a mesh without boundaries.
pub fn read<R: BufRead>(reader: R) -> Result<Mesh> {
    let mut lines = LineReader::new(reader);

    let title = lines.next("mesh title")?.trim_end().to_string();
    let (line, header) = lines.next_numbered("element and node counts")?;
    let fields = Fields::new(&header, line);
    let num_elements: usize = fields.get(0, "element count")?;
    let num_nodes: usize = fields.get(1, "node count")?;

    let mut nodes = Vec::with_capacity(num_nodes.min(MAX_RESERVED));
    for _ in 0..num_nodes {
        let (line, text) = lines.next_numbered("node")?;
        let fields = Fields::new(&text, line);
        nodes.push(Node::new(
            fields.get(0, "node id")?,
            fields.get(1, "x")?,
            fields.get(2, "y")?,
            fields.get(3, "z")?,
        ));
    }
    let node_index = IdIndex::build("node", nodes.iter().map(|n| n.id))?;
    let resolve = |id: usize, line: usize| {
        node_index
            .get(id)
            .ok_or_else(|| Error::parse(line, format!("unknown node id {id}")))
    };

    let mut elements = Vec::with_capacity(num_elements.min(MAX_RESERVED));
    for _ in 0..num_elements {
        let (line, text) = lines.next_numbered("element")?;
        let fields = Fields::new(&text, line);
        let id: usize = fields.get(0, "element id")?;
        let n: usize = fields.get(1, "vertex count")?;
        let vertices = (0..n)
            .map(|i| resolve(fields.get(2 + i, "element vertex")?, line))
            .collect::<Result<Vec<usize>>>()?;
        elements.push(Element::new(id, &vertices)?);
    }

    let mut mesh = Mesh::new(title, nodes, elements)?;
    debug!(
        "read {} nodes and {} elements",
        mesh.num_nodes(),
        mesh.num_elements()
    );

    let Some((line, text)) = lines.try_next()? else {
        return Ok(mesh);
    };
    let num_open: usize = Fields::new(&text, line).get(0, "open boundary count")?;
    lines.next("open boundary node count")?;
    for _ in 0..num_open {
        let (line, text) = lines.next_numbered("open boundary header")?;
        let len: usize = Fields::new(&text, line).get(0, "boundary length")?;
        let mut nodes = Vec::with_capacity(len.min(MAX_RESERVED));
        for _ in 0..len {
            let (line, text) = lines.next_numbered("open boundary node")?;
            nodes.push(resolve(Fields::new(&text, line).get(0, "node id")?, line)?);
        }
        mesh.add_open_boundary(Boundary::open(nodes))?;
    }

    let (line, text) = lines.next_numbered("land boundary count")?;
    let num_land: usize = Fields::new(&text, line).get(0, "land boundary count")?;
    lines.next("land boundary node count")?;
    for _ in 0..num_land {
        let (line, text) = lines.next_numbered("land boundary header")?;
        let fields = Fields::new(&text, line);
        let len: usize = fields.get(0, "boundary length")?;
        let code: i32 = fields.get(1, "boundary type")?;
        let mut boundary = Boundary::new(BoundaryKind::Land(code));
        for _ in 0..len {
            let (line, text) = lines.next_numbered("land boundary record")?;
            let fields = Fields::new(&text, line);
            boundary.push(read_record(boundary.layout(), &fields, &resolve)?)?;
        }
        mesh.add_land_boundary(boundary)?;
    }
    debug!(
        "read {} open and {} land boundaries",
        mesh.num_open_boundaries(),
        mesh.num_land_boundaries()
    );
    Ok(mesh)
}

fn read_record<F>(layout: BoundaryLayout, fields: &Fields, resolve: &F) -> Result<BoundaryNode>
where
    F: Fn(usize, usize) -> Result<usize>,
{
    let node = resolve(fields.get(0, "node id")?, fields.line)?;
    Ok(match layout {
        BoundaryLayout::Plain => BoundaryNode::Plain { node },
        BoundaryLayout::ExternalWeir => BoundaryNode::ExternalWeir {
            node,
            crest_elevation: fields.get(1, "crest elevation")?,
            supercritical: fields.get(2, "supercritical coefficient")?,
        },
        BoundaryLayout::InternalWeir => BoundaryNode::InternalWeir {
            node,
            paired: resolve(fields.get(1, "paired node id")?, fields.line)?,
            crest_elevation: fields.get(2, "crest elevation")?,
            subcritical: fields.get(3, "subcritical coefficient")?,
            supercritical: fields.get(4, "supercritical coefficient")?,
        },
        BoundaryLayout::InternalWeirWithPipes => BoundaryNode::InternalWeirWithPipes {
            node,
            paired: resolve(fields.get(1, "paired node id")?, fields.line)?,
            crest_elevation: fields.get(2, "crest elevation")?,
            subcritical: fields.get(3, "subcritical coefficient")?,
            supercritical: fields.get(4, "supercritical coefficient")?,
            pipe_height: fields.get(5, "pipe height")?,
            pipe_coefficient: fields.get(6, "pipe coefficient")?,
            pipe_diameter: fields.get(7, "pipe diameter")?,
        },
    })
}

/// Line iterator keeping track of the current line number.
struct LineReader<R> {
    lines: Lines<R>,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }

    /// Next line that is not blank, with its number.
    fn try_next(&mut self) -> Result<Option<(usize, String)>> {
        for text in self.lines.by_ref() {
            let text = text?;
            self.line += 1;
            if !text.trim().is_empty() {
                return Ok(Some((self.line, text)));
            }
        }
        Ok(None)
    }

    fn next_numbered(&mut self, expected: &'static str) -> Result<(usize, String)> {
        self.try_next()?.ok_or(Error::UnexpectedEof {
            line: self.line + 1,
            expected,
        })
    }

    /// Next line, blank or not.
    fn next(&mut self, expected: &'static str) -> Result<String> {
        let text = self.lines.next().ok_or(Error::UnexpectedEof {
            line: self.line + 1,
            expected,
        })??;
        self.line += 1;
        Ok(text)
    }
}

/// Whitespace separated fields of a line.
struct Fields<'a> {
    fields: Vec<&'a str>,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Self {
            fields: text.split_whitespace().collect(),
            line,
        }
    }

    fn get<T: FromStr>(&self, i: usize, what: &str) -> Result<T> {
        let field = self
            .fields
            .get(i)
            .ok_or_else(|| Error::parse(self.line, format!("missing {what}")))?;
        field
            .parse()
            .map_err(|_| Error::parse(self.line, format!("invalid {what} {field:?}")))
    }
}

/// Writes `mesh` as an ADCIRC mesh file.
pub fn save<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write(mesh, &mut writer)?;
    writer.flush()?;
    debug!("wrote mesh {}", path.display());
    Ok(())
}

/// Writes `mesh` in the ADCIRC ASCII format. Coordinates get ten decimals for geographic meshes
/// and four otherwise.
pub fn write<W: Write>(mesh: &Mesh, writer: &mut W) -> Result<()> {
    let nodes = mesh.nodes();
    writeln!(writer, "{}", mesh.title())?;
    writeln!(
        writer,
        "{:>11} {:>11}",
        mesh.num_elements(),
        mesh.num_nodes()
    )?;
    for node in nodes {
        writeln!(writer, "{}", node.to_adcirc_string(mesh.is_geographic()))?;
    }
    for element in mesh.elements() {
        writeln!(writer, "{}", element.to_adcirc_string(nodes))?;
    }

    writeln!(writer, "{}", mesh.num_open_boundaries())?;
    writeln!(writer, "{}", mesh.total_open_boundary_nodes())?;
    for boundary in mesh.open_boundaries() {
        for line in boundary.to_adcirc_lines(nodes) {
            writeln!(writer, "{line}")?;
        }
    }

    writeln!(writer, "{}", mesh.num_land_boundaries())?;
    writeln!(writer, "{}", mesh.total_land_boundary_nodes())?;
    for boundary in mesh.land_boundaries() {
        for line in boundary.to_adcirc_lines(nodes) {
            writeln!(writer, "{line}")?;
        }
    }
    Ok(())
}

/// Writes the nodes and elements of `mesh` as an Aquaveo 2dm mesh. Boundaries are not part of
/// the format and are left out.
pub fn write_2dm<W: Write>(mesh: &Mesh, writer: &mut W) -> Result<()> {
    writeln!(writer, "MESH2D")?;
    writeln!(writer, "MESHNAME \"{}\"", mesh.title())?;
    for element in mesh.elements() {
        writeln!(writer, "{}", element.to_2dm_string(mesh.nodes()))?;
    }
    for node in mesh.nodes() {
        writeln!(writer, "{}", node.to_2dm_string())?;
    }
    Ok(())
}

/// Writes `mesh` as an Aquaveo 2dm file.
pub fn save_2dm<P: AsRef<Path>>(mesh: &Mesh, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_2dm(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_relative_eq;
    use rstest::rstest;

    use super::*;
    use crate::error::ErrorCategory;

    /// Two triangles and a quadrilateral with sparse node ids, an open boundary, a plain land
    /// boundary, an external weir and an internal weir with pipes.
    const MESH: &str = "\
sample mesh
3 6 ! NE NP
10 0.0 0.0 -1.5
20 1.0 0.0 -2.0
30 1.0 1.0 -2.5
40 0.0 1.0 -3.0
50 2.0 0.0 -1.0
60 2.0 1.0 -1.25
1 3 10 20 30
2 3 10 30 40
3 4 20 50 60 30
1 = open boundaries
2 = open boundary nodes
2
10
40
3 = land boundaries
6 = land boundary nodes
2 0
20
50
1 3
60 1.5 0.9
1 5
30 40 0.5 1.0 0.8 0.25 0.6 0.3
";

    #[test]
    fn read_sample_mesh() -> anyhow::Result<()> {
        let mesh = read(Cursor::new(MESH))?;

        assert_eq!(mesh.title(), "sample mesh");
        assert_eq!((mesh.num_nodes(), mesh.num_elements()), (6, 3));
        assert!(!mesh.node_ordering_is_sequential());
        assert!(mesh.element_ordering_is_sequential());
        assert_eq!(mesh.node_index_by_id(50)?, 4);
        assert_eq!(mesh.element(2)?.nodes(), &[1, 4, 5, 2]);
        assert_relative_eq!(mesh.node(3)?.z, -3.);

        assert_eq!(mesh.open_boundaries()[0].nodes(), &[0, 3]);
        let land = mesh.land_boundaries();
        assert_eq!(land.len(), 3);
        assert_eq!(land[0].kind(), BoundaryKind::Land(0));
        assert_eq!(land[0].nodes(), &[1, 4]);
        assert_eq!(land[1].crest_elevation(0)?, 1.5);
        assert_eq!(land[2].paired_nodes(), &[3]);
        assert_eq!(land[2].pipe_diameter(0)?, 0.3);
        assert_eq!(mesh.total_land_boundary_nodes(), 5);
        Ok(())
    }

    #[test]
    fn write_then_read_back() -> anyhow::Result<()> {
        let mesh = read(Cursor::new(MESH))?;
        let mut buffer = Vec::new();

        write(&mesh, &mut buffer)?;
        let copy = read(Cursor::new(&buffer))?;

        assert_eq!(copy.title(), mesh.title());
        assert_eq!(copy.nodes(), mesh.nodes());
        assert_eq!(copy.elements(), mesh.elements());
        assert_eq!(copy.open_boundaries(), mesh.open_boundaries());
        assert_eq!(copy.land_boundaries(), mesh.land_boundaries());

        // Writing again gives the same bytes
        let mut again = Vec::new();
        write(&copy, &mut again)?;
        assert_eq!(again, buffer);
        Ok(())
    }

    #[test]
    fn written_layout() -> anyhow::Result<()> {
        let mut mesh = Mesh::grid(0., 1., 0., 1., 1, 1)?;
        mesh.set_title("grid");
        mesh.add_open_boundary(Boundary::open(vec![0, 1]))?;
        let mut buffer = Vec::new();

        write(&mesh, &mut buffer)?;
        let text = String::from_utf8(buffer)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "grid");
        assert_eq!(lines[1], "          1           4");
        assert_eq!(
            lines[2].split_whitespace().collect::<Vec<_>>(),
            ["1", "0.0000000000", "0.0000000000", "0.0000000000"]
        );
        assert_eq!(
            lines[6],
            "          1   4           1           2           4           3"
        );
        assert_eq!(
            &lines[7..],
            ["1", "2", "2", "          1", "          2", "0", "0"]
        );
        Ok(())
    }

    #[test]
    fn mesh_without_boundaries() -> anyhow::Result<()> {
        let text = "no boundaries\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 3\n";

        let mesh = read(Cursor::new(text))?;

        assert_eq!(mesh.num_elements(), 1);
        assert_eq!(mesh.num_open_boundaries(), 0);
        assert_eq!(mesh.num_land_boundaries(), 0);
        Ok(())
    }

    #[rstest]
    #[case::truncated_nodes("t\n1 3\n1 0 0 0\n2 1 0 0\n", 5)]
    #[case::bad_coordinate("t\n1 3\n1 0 0 0\n2 abc 0 0\n3 0 1 0\n1 3 1 2 3\n", 4)]
    #[case::unknown_node("t\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 9\n", 6)]
    #[case::missing_land_block("t\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 3\n0\n0\n", 9)]
    #[case::short_weir_record(
        "t\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 3\n0\n0\n1\n1\n1 13\n2 1.0\n",
        12
    )]
    #[case::huge_node_count("t\n1 1000000000000000000\n1 0 0 0\n", 4)]
    #[case::huge_element_count(
        "t\n1000000000000000000 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 3\n",
        7
    )]
    #[case::huge_vertex_count(
        "t\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 1000000000000000000 1 2 3\n",
        6
    )]
    #[case::huge_open_boundary(
        "t\n1 3\n1 0 0 0\n2 1 0 0\n3 0 1 0\n1 3 1 2 3\n1\n1\n1000000000000000000\n1\n",
        11
    )]
    fn malformed_meshes_report_the_line(#[case] text: &str, #[case] line: usize) {
        let err = read(Cursor::new(text)).unwrap_err();

        assert_eq!(err.category(), ErrorCategory::MalformedInput);
        match &err {
            Error::Parse { line: l, .. } | Error::UnexpectedEof { line: l, .. } => {
                assert_eq!(*l, line, "{err}")
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn bad_vertex_count_is_an_invalid_element() {
        let text = "t\n1 2\n1 0 0 0\n2 1 0 0\n1 2 1 2\n";

        assert!(matches!(
            read(Cursor::new(text)),
            Err(Error::InvalidElement { id: 1, .. })
        ));
    }

    #[test]
    fn duplicate_node_ids_are_rejected() {
        let text = "t\n0 2\n1 0 0 0\n1 1 0 0\n";

        assert!(matches!(
            read(Cursor::new(text)),
            Err(Error::DuplicateId {
                what: "node",
                id: 1,
            })
        ));
    }

    #[test]
    fn save_and_open_file() -> anyhow::Result<()> {
        let mesh = read(Cursor::new(MESH))?;
        let path = std::env::temp_dir().join(format!("adcmesh-{}.14", std::process::id()));

        save(&mesh, &path)?;
        let copy = open(&path);
        std::fs::remove_file(&path)?;

        assert_eq!(copy?.nodes(), mesh.nodes());
        Ok(())
    }

    #[test]
    fn export_2dm() -> anyhow::Result<()> {
        let mesh = read(Cursor::new(MESH))?;
        let mut buffer = Vec::new();

        write_2dm(&mesh, &mut buffer)?;
        let text = String::from_utf8(buffer)?;
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "MESH2D");
        assert_eq!(lines[2], "E3T 1 10 20 30 1");
        assert_eq!(lines[4], "E4Q 3 20 50 60 30 1");
        assert!(lines[5].starts_with("ND 10 "));
        assert_eq!(lines.len(), 2 + 3 + 6);
        Ok(())
    }
}
