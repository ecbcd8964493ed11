//! Reading and writing cubes and masks as JSON, CSV or Parquet.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, Float32Array, Float64Array, Int32Array, Int64Array, UInt8Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{Cube, Mask, Shape};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Supported on-disk layouts, chosen by file extension.
///
/// * `.json`            – `{ "shape": [nx, ny, nz], "data": [...] }`, x fastest, `null` = NaN
/// * `.csv`             – header `x,y,z,value`, one voxel per row
/// * `.parquet` / `.pq` – columns `x`, `y`, `z` (integers) and `value`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
    Parquet,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            "parquet" | "pq" => Ok(Format::Parquet),
            other => bail!("Unsupported file extension: .{other}"),
        }
    }
}

/// Load a data cube. Voxels missing from long-format files are NaN.
pub fn load_cube(path: &Path) -> Result<Cube> {
    let (shape, values) = read_volume(path)?;
    Cube::from_vec(shape, values).with_context(|| format!("building cube from {}", path.display()))
}

/// Load a mask that must match `shape`. Voxels missing from long-format
/// files are 0.
pub fn load_mask(path: &Path, shape: Shape) -> Result<Mask> {
    let (file_shape, values) = read_volume(path)?;
    if file_shape != shape {
        bail!(
            "Mask {} has shape {file_shape}, cube has {shape}",
            path.display()
        );
    }
    let bits = values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v.is_nan() {
                Ok(0)
            } else if v.fract() == 0.0 && (0.0..=255.0).contains(&v) {
                Ok(v as u8)
            } else {
                bail!("Mask voxel {i}: {v} is not a value in 0..=255")
            }
        })
        .collect::<Result<Vec<u8>>>()?;
    Mask::from_vec(shape, bits).context("building mask")
}

/// Write `cube` in the format implied by `path`.
pub fn write_cube(path: &Path, cube: &Cube, overwrite: bool) -> Result<()> {
    write_volume(path, cube.shape(), Column::Float(cube.values()), overwrite)
}

/// Write `mask` in the format implied by `path`.
pub fn write_mask(path: &Path, mask: &Mask, overwrite: bool) -> Result<()> {
    write_volume(path, mask.shape(), Column::Bits(mask.bits()), overwrite)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Column<'a> {
    Float(&'a [f64]),
    Bits(&'a [u8]),
}

impl Column<'_> {
    fn len(&self) -> usize {
        match self {
            Column::Float(v) => v.len(),
            Column::Bits(v) => v.len(),
        }
    }
}

fn read_volume(path: &Path) -> Result<(Shape, Vec<f64>)> {
    match Format::from_path(path)? {
        Format::Json => read_json(path),
        Format::Csv => read_csv(path),
        Format::Parquet => read_parquet(path),
    }
}

fn write_volume(path: &Path, shape: Shape, column: Column<'_>, overwrite: bool) -> Result<()> {
    debug_assert_eq!(shape.len(), column.len());
    let format = Format::from_path(path)?;
    if path.exists() && !overwrite {
        bail!("Output file {} already exists", path.display());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    match format {
        Format::Json => write_json(path, shape, column),
        Format::Csv => write_csv(path, shape, column),
        Format::Parquet => write_parquet(path, shape, column),
    }
}

/// Largest volume a file may describe: 2^31 voxels, 16 GiB of `f64`.
pub const MAX_VOXELS: usize = 1 << 31;

/// Voxel count of `shape`, rejecting shapes that overflow or exceed [`MAX_VOXELS`].
fn voxel_count(shape: Shape, source: &Path) -> Result<usize> {
    match shape.checked_len() {
        Some(n) if n <= MAX_VOXELS => Ok(n),
        _ => bail!(
            "{} describes a {shape} volume, larger than {MAX_VOXELS} voxels",
            source.display()
        ),
    }
}

/// Assemble a dense volume from `(x, y, z, value)` rows.
fn assemble(voxels: Vec<(usize, usize, usize, f64)>, source: &Path) -> Result<(Shape, Vec<f64>)> {
    if voxels.is_empty() {
        bail!("{} contains no voxels", source.display());
    }
    let mut shape = Shape::new(0, 0, 0);
    for &(x, y, z, _) in &voxels {
        shape.nx = shape.nx.max(x.saturating_add(1));
        shape.ny = shape.ny.max(y.saturating_add(1));
        shape.nz = shape.nz.max(z.saturating_add(1));
    }
    let mut values = vec![f64::NAN; voxel_count(shape, source)?];
    for (x, y, z, v) in voxels {
        values[shape.index(x, y, z)] = v;
    }
    Ok((shape, values))
}

fn to_index(v: i64, axis: &str, row: usize) -> Result<usize> {
    usize::try_from(v).with_context(|| format!("Row {row}: negative {axis} coordinate {v}"))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct VolumeFile {
    shape: [usize; 3],
    data: Vec<Option<f64>>,
}

#[derive(Serialize)]
struct MaskFileRef<'a> {
    shape: [usize; 3],
    data: &'a [u8],
}

fn read_json(path: &Path) -> Result<(Shape, Vec<f64>)> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let file: VolumeFile = serde_json::from_str(&text).context("parsing JSON")?;
    let [nx, ny, nz] = file.shape;
    let shape = Shape::new(nx, ny, nz);
    let expected = voxel_count(shape, path)?;
    if file.data.len() != expected {
        bail!(
            "JSON data has {} values but shape {shape} needs {expected}",
            file.data.len()
        );
    }
    let values = file
        .data
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();
    Ok((shape, values))
}

fn write_json(path: &Path, shape: Shape, column: Column<'_>) -> Result<()> {
    let dims = [shape.nx, shape.ny, shape.nz];
    let text = match column {
        // Non-finite values have no JSON representation; they become null.
        Column::Float(values) => serde_json::to_string(&VolumeFile {
            shape: dims,
            data: values
                .iter()
                .map(|&v| v.is_finite().then_some(v))
                .collect(),
        }),
        Column::Bits(bits) => serde_json::to_string(&MaskFileRef {
            shape: dims,
            data: bits,
        }),
    }
    .context("serializing JSON")?;
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct VoxelRow<T> {
    x: i64,
    y: i64,
    z: i64,
    value: T,
}

fn read_csv(path: &Path) -> Result<(Shape, Vec<f64>)> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let mut voxels = Vec::new();
    for (row_no, result) in reader.deserialize::<VoxelRow<f64>>().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        voxels.push((
            to_index(row.x, "x", row_no)?,
            to_index(row.y, "y", row_no)?,
            to_index(row.z, "z", row_no)?,
            row.value,
        ));
    }
    assemble(voxels, path)
}

fn write_csv(path: &Path, shape: Shape, column: Column<'_>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    for i in 0..shape.len() {
        let (x, y, z) = shape.coords(i);
        let (x, y, z) = (x as i64, y as i64, z as i64);
        match column {
            Column::Float(v) => writer.serialize(VoxelRow { x, y, z, value: v[i] }),
            Column::Bits(v) => writer.serialize(VoxelRow { x, y, z, value: v[i] }),
        }
        .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

/// Load a long-format Parquet volume.
///
/// Expected schema:
/// - `x`, `y`, `z`: Int64 or Int32 voxel coordinates
/// - `value`: Float64, Float32, UInt8, Int64 or Int32; nulls read as NaN
fn read_parquet(path: &Path) -> Result<(Shape, Vec<f64>)> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut voxels = Vec::new();
    let mut row_base = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let xs = named_column(&batch, "x")?;
        let ys = named_column(&batch, "y")?;
        let zs = named_column(&batch, "z")?;
        let vs = named_column(&batch, "value")?;

        for row in 0..batch.num_rows() {
            let global = row_base + row;
            voxels.push((
                to_index(extract_int(xs, row)?, "x", global)?,
                to_index(extract_int(ys, row)?, "y", global)?,
                to_index(extract_int(zs, row)?, "z", global)?,
                extract_value(vs, row)?,
            ));
        }
        row_base += batch.num_rows();
    }

    assemble(voxels, path)
}

fn write_parquet(path: &Path, shape: Shape, column: Column<'_>) -> Result<()> {
    let n = shape.len();
    let mut xs = Vec::with_capacity(n);
    let mut ys = Vec::with_capacity(n);
    let mut zs = Vec::with_capacity(n);
    for i in 0..n {
        let (x, y, z) = shape.coords(i);
        xs.push(x as i64);
        ys.push(y as i64);
        zs.push(z as i64);
    }
    let (value_type, values): (DataType, Arc<dyn Array>) = match column {
        Column::Float(v) => (DataType::Float64, Arc::new(Float64Array::from(v.to_vec()))),
        Column::Bits(v) => (DataType::UInt8, Arc::new(UInt8Array::from(v.to_vec()))),
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("x", DataType::Int64, false),
        Field::new("y", DataType::Int64, false),
        Field::new("z", DataType::Int64, false),
        Field::new("value", value_type, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(xs)),
            Arc::new(Int64Array::from(ys)),
            Arc::new(Int64Array::from(zs)),
            values,
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

// -- Arrow helpers --

fn named_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Arc<dyn Array>> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

fn extract_int(col: &Arc<dyn Array>, row: usize) -> Result<i64> {
    if col.is_null(row) {
        bail!("Row {row}: null coordinate");
    }
    match col.data_type() {
        DataType::Int64 => Ok(col
            .as_any()
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row)),
        DataType::Int32 => Ok(col
            .as_any()
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row) as i64),
        other => bail!("Coordinate column has type {other:?}, expected Int64 or Int32"),
    }
}

fn extract_value(col: &Arc<dyn Array>, row: usize) -> Result<f64> {
    if col.is_null(row) {
        return Ok(f64::NAN);
    }
    let any = col.as_any();
    let value = match col.data_type() {
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .context("expected Float64Array")?
            .value(row),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .context("expected Float32Array")?
            .value(row) as f64,
        DataType::UInt8 => any
            .downcast_ref::<UInt8Array>()
            .context("expected UInt8Array")?
            .value(row) as f64,
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .context("expected Int64Array")?
            .value(row) as f64,
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .context("expected Int32Array")?
            .value(row) as f64,
        other => bail!("Value column has type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cube() -> Cube {
        let shape = Shape::new(3, 2, 2);
        let mut values: Vec<f64> = (0..shape.len()).map(|i| i as f64 - 5.5).collect();
        values[4] = f64::NAN;
        Cube::from_vec(shape, values).unwrap()
    }

    fn assert_same_cube(a: &Cube, b: &Cube) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.values().iter().zip(b.values()) {
            assert!(x == y || (x.is_nan() && y.is_nan()), "{x} != {y}");
        }
    }

    #[test]
    fn test_cube_files_in_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let cube = sample_cube();
        for name in ["cube.json", "cube.csv", "cube.parquet"] {
            let path = dir.path().join(name);
            write_cube(&path, &cube, false).unwrap();
            assert_same_cube(&load_cube(&path).unwrap(), &cube);
        }
    }

    #[test]
    fn test_mask_files_in_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let shape = Shape::new(2, 2, 1);
        let mask = Mask::from_vec(shape, vec![0, 1, 2, 3]).unwrap();
        for name in ["mask.json", "mask.csv", "mask.pq"] {
            let path = dir.path().join(name);
            write_mask(&path, &mask, false).unwrap();
            assert_eq!(load_mask(&path, shape).unwrap(), mask);
        }
    }

    #[test]
    fn test_mask_shape_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.json");
        write_mask(&path, &Mask::empty(Shape::new(2, 1, 1)), false).unwrap();
        assert!(load_mask(&path, Shape::new(3, 1, 1)).is_err());
    }

    #[test]
    fn test_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.json");
        let cube = sample_cube();
        write_cube(&path, &cube, false).unwrap();
        assert!(write_cube(&path, &cube, false).is_err());
        write_cube(&path, &cube, true).unwrap();
    }

    #[test]
    fn test_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out/mask.csv");
        write_mask(&path, &Mask::empty(Shape::new(1, 1, 1)), false).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_sparse_csv_fills_nan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.csv");
        std::fs::write(&path, "x,y,z,value\n0,0,0,1.5\n1,1,0,-2\n").unwrap();
        let cube = load_cube(&path).unwrap();
        assert_eq!(cube.shape(), Shape::new(2, 2, 1));
        assert_eq!(cube.get(0, 0, 0), 1.5);
        assert_eq!(cube.get(1, 1, 0), -2.0);
        assert_eq!(cube.nan_count(), 2);
    }

    #[test]
    fn test_json_length_checked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"shape": [2, 2, 1], "data": [1, 2, null]}"#).unwrap();
        assert!(load_cube(&path).is_err());
    }

    #[test]
    fn test_oversized_json_shape_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.json");
        std::fs::write(&path, r#"{"shape": [4294967296, 4294967296, 1], "data": []}"#).unwrap();
        assert!(load_cube(&path).is_err());

        std::fs::write(&path, r#"{"shape": [65536, 65536, 1], "data": []}"#).unwrap();
        let err = load_cube(&path).unwrap_err();
        assert!(err.to_string().contains("larger than"), "{err}");
    }

    #[test]
    fn test_far_csv_coordinate_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("far.csv");
        std::fs::write(&path, "x,y,z,value\n0,0,0,1\n9223372036854775806,0,0,2\n").unwrap();
        assert!(load_cube(&path).is_err());

        std::fs::write(&path, "x,y,z,value\n0,0,0,1\n70000,70000,0,2\n").unwrap();
        assert!(load_mask(&path, Shape::new(1, 1, 1)).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(load_cube(Path::new("cube.fits")).is_err());
        assert!(Format::from_path(Path::new("cube")).is_err());
        assert_eq!(Format::from_path(Path::new("a/b.PQ")).unwrap(), Format::Parquet);
    }
}
