//! Python bindings
//!
//! ```python
//! import pyarrow as pa
//! import saimin
//!
//! with saimin.BamReader("sample.bam") as reader:
//!     table = pa.ipc.open_file(reader.fetch("chr1", 0, 100_000)).read_all()
//! ```

use pyo3::exceptions::{PyFileNotFoundError, PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

use crate::{Error, ErrorKind, Reader, ReaderOptions};

fn to_py_err(err: Error) -> PyErr {
    let message = err.to_string();
    match err.kind() {
        ErrorKind::FileNotFound | ErrorKind::IndexNotFound => PyFileNotFoundError::new_err(message),
        ErrorKind::UnknownReference => PyKeyError::new_err(message),
        ErrorKind::InvalidRegion | ErrorKind::ReaderClosed => PyValueError::new_err(message),
        _ => PyIOError::new_err(message),
    }
}

/// An indexed BAM file answering region queries with Arrow IPC bytes
///
/// Args:
///     path (str): BAM file, with its index at `<path>.bai` or `<path minus .bam>.bai`
///     index (str | None): explicit index path
///     verify_checksums (bool): check the CRC32 of every BGZF block
#[pyclass(name = "BamReader", module = "saimin")]
pub struct PyBamReader {
    inner: Reader,
}

#[pymethods]
impl PyBamReader {
    #[new]
    #[pyo3(signature = (path, index=None, verify_checksums=true))]
    fn py_new(path: &str, index: Option<&str>, verify_checksums: bool) -> PyResult<Self> {
        let mut options = ReaderOptions::builder().verify_checksums(verify_checksums);
        if let Some(index) = index {
            options = options.index_path(index);
        }
        let inner = Reader::open_with(path, options.build()).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    /// Records overlapping `chrom:[start, stop)` as an Arrow IPC file
    fn fetch<'py>(
        &self,
        py: Python<'py>,
        chrom: &str,
        start: u32,
        stop: u32,
    ) -> PyResult<Bound<'py, PyBytes>> {
        let ipc = py
            .allow_threads(|| self.inner.fetch(chrom, start, stop))
            .map_err(to_py_err)?;
        Ok(PyBytes::new_bound(py, &ipc))
    }

    /// Reference names in id order
    fn references(&self) -> Vec<(String, u32)> {
        self.inner
            .references()
            .iter()
            .map(|r| (r.name.clone(), r.length))
            .collect()
    }

    fn close(&self) {
        self.inner.close();
    }

    #[getter]
    fn closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn __enter__(slf: Py<Self>) -> Py<Self> {
        slf
    }

    fn __exit__(&self, _exc_type: PyObject, _exc_value: PyObject, _traceback: PyObject) -> bool {
        self.inner.close();
        false
    }
}

#[pymodule]
fn saimin(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyBamReader>()?;
    Ok(())
}
