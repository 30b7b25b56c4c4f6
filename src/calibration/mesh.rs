use std::io::Write;

use crate::error::Result;
use crate::geometry::{PixelPoint, WorldPoint};

/// Grid of pixel coordinates that images a regular real-world lattice.
///
/// Row `i`, column `j` corresponds to the ground point
/// `(j * column_spacing, i * row_spacing)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationMesh {
    rows: Vec<Vec<PixelPoint>>,
}

impl CalibrationMesh {
    pub fn new(rows: Vec<Vec<PixelPoint>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<PixelPoint>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0 || self.num_columns() == 0
    }

    /// Mesh pixels paired with their synthetic world coordinates, row-major.
    pub fn correspondences(
        &self,
        row_spacing: f64,
        column_spacing: f64,
    ) -> (Vec<PixelPoint>, Vec<WorldPoint>) {
        let mut pixels = Vec::new();
        let mut world = Vec::new();
        for (i, row) in self.rows.iter().enumerate() {
            for (j, p) in row.iter().enumerate() {
                pixels.push(*p);
                world.push(WorldPoint::new(
                    j as f64 * column_spacing,
                    i as f64 * row_spacing,
                ));
            }
        }
        (pixels, world)
    }

    /// Write the mesh as a delimited grid file:
    /// `row_id, column_id, x_pixel, y_pixel, x_world, y_world`.
    ///
    /// Returns the number of points written.
    pub fn write_grid<W: Write>(
        &self,
        mut writer: W,
        row_spacing: f64,
        column_spacing: f64,
        precision: usize,
        separator: char,
    ) -> Result<usize> {
        let s = separator;
        writeln!(writer, "row_id{s}column_id{s}x_pixel{s}y_pixel{s}x_world{s}y_world")?;

        let (pixels, world) = self.correspondences(row_spacing, column_spacing);
        let columns = self.num_columns().max(1);
        for (idx, (p, w)) in pixels.iter().zip(&world).enumerate() {
            writeln!(
                writer,
                "{}{s}{}{s}{:.prec$}{s}{:.prec$}{s}{:.prec$}{s}{:.prec$}",
                idx / columns,
                idx % columns,
                p.x,
                p.y,
                w.x,
                w.y,
                prec = precision,
            )?;
        }
        writer.flush()?;
        Ok(pixels.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mesh() -> CalibrationMesh {
        CalibrationMesh::new(vec![
            vec![PixelPoint::new(0.0, 10.0), PixelPoint::new(10.0, 10.0)],
            vec![PixelPoint::new(2.0, 5.0), PixelPoint::new(8.0, 5.0)],
        ])
    }

    #[test]
    fn test_correspondences() {
        let (pixels, world) = small_mesh().correspondences(100.0, 50.0);
        assert_eq!(pixels.len(), 4);
        assert_eq!(world[0], WorldPoint::new(0.0, 0.0));
        assert_eq!(world[1], WorldPoint::new(50.0, 0.0));
        assert_eq!(world[3], WorldPoint::new(50.0, 100.0));
        assert_eq!(pixels[2], PixelPoint::new(2.0, 5.0));
    }

    #[test]
    fn test_write_grid() {
        let mut buf = Vec::new();
        let written = small_mesh().write_grid(&mut buf, 100.0, 50.0, 1, ',').unwrap();
        assert_eq!(written, 4);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "row_id,column_id,x_pixel,y_pixel,x_world,y_world");
        assert_eq!(lines[4], "1,1,8.0,5.0,50.0,100.0");
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = CalibrationMesh::new(Vec::new());
        assert!(mesh.is_empty());
        assert_eq!(mesh.num_columns(), 0);
    }
}
