use nalgebra::DMatrix;
use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|f| dtoa(*f, FLOAT_CONFIG)).collect();
    format!("[{}]", a.join(", "))
}

fn format_complex(z: &Complex64) -> String {
    format!(
        "{}{}j{}",
        dtoa(z.re, FLOAT_CONFIG),
        if z.im.signum() < 0.0 { "-" } else { "+" },
        dtoa(z.im.abs(), FLOAT_CONFIG)
    )
}

pub fn format_rect_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_complex).collect();
    format!("[{}]", a.join(", "))
}

fn format_polar(z: &Complex64) -> String {
    format!(
        "{}\u{2220}{}\u{00B0}",
        dtoa(z.norm(), FLOAT_CONFIG),
        dtoa(z.arg().to_degrees(), FLOAT_CONFIG)
    )
}

pub fn format_polar_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_polar).collect();
    format!("[{}]", a.join(", "))
}

/// One bracketed row per line.
pub fn format_rect_mat(m: &DMatrix<Complex64>) -> String {
    let rows: Vec<String> = m
        .row_iter()
        .map(|r| format_rect_vec(&r.iter().copied().collect::<Vec<_>>()))
        .collect();
    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_complex_signs() {
        let s = format_rect_vec(&[Complex64::new(1.5, -2.0), Complex64::new(0.0, 1.0)]);
        assert!(s.starts_with("[1.5-j2, "));
        assert!(s.ends_with("+j1]"));
    }

    #[test]
    fn formats_polar_degrees() {
        let s = format_polar_vec(&[Complex64::new(0.0, 2.0)]);
        assert!(s.starts_with("[2\u{2220}"));
        assert!(s.ends_with("\u{00B0}]"));
    }
}
