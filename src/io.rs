use crate::dataset::DatasetArray;
use crate::sampler::Sample;

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const NPY_MAGIC: &[u8] = b"\x93NUMPY";
const NPY_ALIGN: usize = 64;

/// Writes the sample records as a pretty printed JSON list.
pub fn write_samples_json(path: impl AsRef<Path>, samples: &[Sample]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, samples)
        .with_context(|| format!("writing samples to {}", path.display()))?;
    w.flush()?;
    log::info!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

pub fn read_samples_json(path: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let samples = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing samples from {}", path.display()))?;
    Ok(samples)
}

fn npy_header(data: &DatasetArray) -> Vec<u8> {
    let shape = if data.is_empty() {
        "(0,)".to_string()
    } else {
        format!("({}, {})", data.rows, data.cols)
    };
    let dict = format!(
        "{{'descr': '<f8', 'fortran_order': False, 'shape': {}, }}",
        shape
    );

    // magic + version + header length
    let preamble = NPY_MAGIC.len() + 2 + 2;
    let unpadded = preamble + dict.len() + 1;
    let padding = (NPY_ALIGN - unpadded % NPY_ALIGN) % NPY_ALIGN;

    let mut header = dict.into_bytes();
    header.extend(std::iter::repeat(b' ').take(padding));
    header.push(b'\n');
    header
}

/// Writes the dataset as a version 1.0 `.npy` array of little endian
/// `f64` in C order.
pub fn write_npy(path: impl AsRef<Path>, data: &DatasetArray) -> Result<()> {
    let path = path.as_ref();
    let header = npy_header(data);
    let header_len = u16::try_from(header.len()).context("npy header too long")?;

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(file);
    w.write_all(NPY_MAGIC)?;
    w.write_all(&[1, 0])?;
    w.write_all(&header_len.to_le_bytes())?;
    w.write_all(&header)?;
    if !data.is_empty() {
        for x in data.data.iter() {
            w.write_all(&x.to_le_bytes())?;
        }
    }
    w.flush().with_context(|| format!("writing {}", path.display()))?;

    log::info!(
        "Wrote {}x{} array to {}",
        data.rows,
        data.cols,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample {
            p: vec![0.0, -0.1],
            q: vec![0.0, -0.05],
            g: vec![1.0, -1.0, -1.0, 1.0],
            b: vec![-2.0, 2.0, 2.0, -2.0],
            v_init: vec![1.1, 0.9],
            theta_init: vec![3.0, -7.5],
            iterations: 4,
            v_pred: vec![1.02, 1.0],
            phi_pred: vec![0.0, -0.2],
            resd_real: vec![1e-9],
            resd_imag: vec![-2e-9],
        }
    }

    #[test]
    fn json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.json");
        let samples = vec![sample(), sample()];

        write_samples_json(&path, &samples).unwrap();
        assert_eq!(read_samples_json(&path).unwrap(), samples);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"resd_real\""));
        assert!(text.contains('\n'));
    }

    #[test]
    fn json_floats_are_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floats.json");
        let mut s = sample();
        s.v_init = vec![0.9726379472468708, 1.0 / 3.0];
        s.theta_init = vec![9.039978825343123, -0.1 - 0.2];
        s.resd_imag = vec![f64::MIN_POSITIVE, 5e-324];

        write_samples_json(&path, &[s.clone()]).unwrap();
        let back = read_samples_json(&path).unwrap();
        let bits = |v: &[f64]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&back[0].v_init), bits(&s.v_init));
        assert_eq!(bits(&back[0].theta_init), bits(&s.theta_init));
        assert_eq!(bits(&back[0].resd_imag), bits(&s.resd_imag));
    }

    #[test]
    fn npy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.npy");
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.5]];
        let data = DatasetArray::from_rows(rows).unwrap();

        write_npy(&path, &data).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        assert_eq!(&bytes[..6], NPY_MAGIC);
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % NPY_ALIGN, 0);

        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        let dict = "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }";
        assert!(header.starts_with(dict));
        assert!(header.ends_with('\n'));

        let payload = &bytes[10 + header_len..];
        assert_eq!(payload.len(), 6 * 8);
        let last = f64::from_le_bytes(payload[40..48].try_into().unwrap());
        assert_eq!(last, 6.5);
    }

    #[test]
    fn empty_npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npy");
        let data = DatasetArray::from_rows(Vec::new()).unwrap();

        write_npy(&path, &data).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len() % NPY_ALIGN, 0);
        let header = String::from_utf8_lossy(&bytes[10..]);
        assert!(header.contains("'shape': (0,)"));
    }

    #[test]
    fn missing_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_samples_json(dir.path().join("none.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("none.json"));
    }
}
